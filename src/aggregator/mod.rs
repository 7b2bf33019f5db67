//! Consumes votes from the queue and periodically flushes the tally.

pub mod tally;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::TallyStore;
use crate::error::QueueError;
use crate::queue::{QueueMessage, VoteSubscriber};
use crate::shutdown::TaskHandle;

pub use tally::Tally;

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending.
    Empty,
    /// Every pending option was written and the tally settled.
    Flushed { options: usize, votes: i64 },
    /// At least one write failed; the whole tally was kept for the next cycle.
    Failed { failed: Vec<String> },
}

#[derive(Clone)]
pub struct VoteAggregator {
    tally: Arc<Tally>,
    store: Arc<dyn TallyStore>,
    flush_interval: Duration,
}

impl VoteAggregator {
    pub fn new(store: Arc<dyn TallyStore>, flush_interval: Duration) -> Self {
        Self {
            tally: Arc::new(Tally::new()),
            store,
            flush_interval,
        }
    }

    #[cfg(test)]
    pub(crate) fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Consume until `stop` is raised or the subscription ends.
    ///
    /// On stop: the flush timer is stopped, then the subscriber, then one last
    /// flush is attempted. Returns an error if the subscription ended without
    /// being asked to.
    pub async fn run<S: VoteSubscriber>(
        &self,
        mut subscriber: S,
        stop: CancellationToken,
    ) -> Result<(), QueueError> {
        let timer_stop = stop.child_token();
        let timer = {
            let aggregator = self.clone();
            let token = timer_stop.clone();
            TaskHandle::spawn("flush timer", timer_stop, async move {
                aggregator.flush_loop(token).await
            })
        };

        info!("Waiting for votes on queue...");
        let mut ended_unexpectedly = false;
        loop {
            let next = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                next = subscriber.recv() => next,
            };
            match next {
                Some(Ok(message)) => self.handle(message).await,
                Some(Err(e)) => error!(error = %e, "failed to receive vote"),
                None => {
                    warn!("vote subscription ended");
                    ended_unexpectedly = true;
                    break;
                }
            }
        }

        timer.cancel();
        if let Err(e) = timer.wait().await {
            error!(error = %e, "flush timer failed");
        }

        info!("stopping queue consumer");
        if let Err(e) = subscriber.stop().await {
            warn!(error = %e, "failed to stop queue consumer cleanly");
        }
        info!("queue consumer stopped");

        match self.flush().await {
            FlushOutcome::Failed { failed } => {
                error!(?failed, pending = ?self.tally.snapshot(), "final flush failed; pending votes lost")
            }
            outcome => debug!(?outcome, "final flush"),
        }

        if ended_unexpectedly {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }

    async fn handle(&self, message: QueueMessage) {
        match std::str::from_utf8(message.body()) {
            Ok(option) => {
                let pending = self.tally.record(option);
                trace!(option, pending, "vote counted");
            }
            Err(_) => warn!(len = message.body().len(), "skipping vote with non-UTF-8 payload"),
        }
        if let Err(e) = message.ack().await {
            warn!(error = %e, "failed to acknowledge vote");
        }
    }

    /// Flush every `flush_interval`, measured from the end of the previous
    /// attempt, until `stop` fires.
    async fn flush_loop(&self, stop: CancellationToken) {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(self.flush_interval) => {}
            }
            self.flush().await;
        }
    }

    /// Write the pending counts to the store, one increment per option.
    /// The tally is settled only if every increment succeeded.
    pub async fn flush(&self) -> FlushOutcome {
        let snapshot = self.tally.snapshot();
        if snapshot.is_empty() {
            debug!("No new votes, skipping database update");
            return FlushOutcome::Empty;
        }

        info!(counts = ?snapshot, "Updating database...");
        let mut failed = Vec::new();
        for (option, count) in &snapshot {
            if let Err(e) = self.store.increment_count(option, *count).await {
                warn!(option = %option, count, error = %e, "failed to update");
                failed.push(option.clone());
            }
        }

        if !failed.is_empty() {
            warn!(failed = failed.len(), "keeping tally for the next flush");
            return FlushOutcome::Failed { failed };
        }

        self.tally.settle(&snapshot);
        let votes: i64 = snapshot.values().sum();
        info!(options = snapshot.len(), votes, "Finished updating database");
        FlushOutcome::Flushed {
            options: snapshot.len(),
            votes,
        }
    }
}
