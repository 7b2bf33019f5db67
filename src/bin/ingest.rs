use std::sync::Arc;

use ballots::config::IngestConfig;
use ballots::db::{self, PgStore};
use ballots::queue::AmqpProducer;
use ballots::shutdown::{PipelineSettings, ShutdownCoordinator};
use ballots::stream::{StreamAdapter, StreamSettings};
use ballots::{signal, startup};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    startup::init_tracing();

    // Missing stream credentials stop the process here.
    let config = IngestConfig::from_env()?;

    info!("dialing database");
    let pool = db::init_db(&config.common.database_url).await?;
    let store = PgStore::new(pool.clone());

    let producer = AmqpProducer::connect(&config.common.amqp_url, &config.common.topic).await?;
    let adapter = StreamAdapter::new(
        Arc::new(store),
        config.credentials.clone(),
        StreamSettings::from(&config),
    )?;

    let mut coordinator = ShutdownCoordinator::start(
        adapter,
        producer,
        PipelineSettings {
            channel_capacity: config.channel_capacity,
            watchdog_interval: config.watchdog_interval,
        },
    );
    let health = startup::spawn_db_health_check(
        pool.clone(),
        config.common.db_health_interval,
        coordinator.stop_token().child_token(),
    );
    coordinator.attach(health);
    coordinator.release_on_shutdown(pool);

    signal::shutdown_signal(false).await?;
    info!("Stopping...");
    coordinator.shutdown().await?;

    Ok(())
}
