use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::shutdown::TaskHandle;
use crate::stream::ConnectionHandle;

/// Periodically force-close the adapter's connection so it reconnects with a
/// fresh set of tracked terms. Exits without acting once `stop` is raised.
pub fn spawn(connection: ConnectionHandle, stop: CancellationToken, period: Duration) -> TaskHandle {
    TaskHandle::spawn("connection watchdog", stop.clone(), run(connection, stop, period))
}

pub async fn run(connection: ConnectionHandle, stop: CancellationToken, period: Duration) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if stop.is_cancelled() {
            break;
        }
        if connection.close() {
            info!("closed stream connection to refresh tracked terms");
        } else {
            debug!("no open stream connection to refresh");
        }
    }

    debug!("connection watchdog stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_closes_connection_each_period() {
        let connection = ConnectionHandle::new();
        let stop = CancellationToken::new();
        let handle = spawn(connection.clone(), stop.clone(), Duration::from_secs(60));

        let adapter_stop = CancellationToken::new();
        let first = connection.open(&adapter_stop);
        time::sleep(Duration::from_secs(59)).await;
        assert!(!first.is_cancelled());

        time::sleep(Duration::from_secs(2)).await;
        assert!(first.is_cancelled());

        let second = connection.open(&adapter_stop);
        time::sleep(Duration::from_secs(60)).await;
        assert!(second.is_cancelled());

        stop.cancel();
        handle.wait().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaves_connection_alone_after_stop() {
        let connection = ConnectionHandle::new();
        let stop = CancellationToken::new();
        let handle = spawn(connection.clone(), stop.clone(), Duration::from_secs(60));

        // Guard parented elsewhere so only the watchdog could cancel it.
        let guard = connection.open(&CancellationToken::new());
        stop.cancel();
        handle.wait().await.unwrap();

        time::sleep(Duration::from_secs(120)).await;
        assert!(!guard.is_cancelled());
    }
}
