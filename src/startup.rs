use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::db::{DbPool, pool_stats};
use crate::shutdown::TaskHandle;

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Periodically check out a connection so a dead database shows up in the
/// logs before the next flush or reconnect needs it.
pub fn spawn_db_health_check(pool: DbPool, every: Duration, stop: CancellationToken) -> TaskHandle {
    let token = stop.clone();
    TaskHandle::spawn("db health check", stop, async move {
        let mut interval = interval(every);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            match pool.acquire().await {
                Ok(conn) => {
                    drop(conn);
                    debug!("{}", pool_stats(&pool));
                }
                Err(e) => {
                    error!("Database connection health check failed: {}", e);
                }
            }
        }
    })
}
