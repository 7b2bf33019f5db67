use std::sync::Arc;

use ballots::aggregator::VoteAggregator;
use ballots::config::CounterConfig;
use ballots::db::{self, PgStore};
use ballots::queue::AmqpSubscriber;
use ballots::{signal, startup};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    startup::init_tracing();

    let config = CounterConfig::from_env()?;

    info!("Connecting to database...");
    let pool = db::init_db(&config.common.database_url).await?;
    let store = PgStore::new(pool.clone());

    info!("Connecting to queue...");
    let subscriber = AmqpSubscriber::connect(
        &config.common.amqp_url,
        &config.common.topic,
        &config.consumer_group,
    )
    .await?;

    let stop = CancellationToken::new();
    let health = startup::spawn_db_health_check(
        pool.clone(),
        config.common.db_health_interval,
        stop.child_token(),
    );

    let aggregator = VoteAggregator::new(Arc::new(store), config.flush_interval);
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        match signal::shutdown_signal(true).await {
            Ok(_) => info!("Stopping..."),
            Err(e) => error!(error = %e, "failed to listen for signals; stopping"),
        }
        signal_stop.cancel();
    });

    let result = aggregator.run(subscriber, stop.clone()).await;

    stop.cancel();
    health.wait().await?;

    match db::get_all_polls(&pool).await {
        Ok(polls) => {
            for poll in polls {
                info!(poll = %poll.title, results = ?poll.results.0, "current results");
            }
        }
        Err(e) => error!(error = %e, "failed to read poll results"),
    }

    info!("Closing database connection...");
    pool.close().await;

    result?;
    Ok(())
}
