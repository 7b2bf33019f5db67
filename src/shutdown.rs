//! Task handles and the staged shutdown of the ingestion pipeline.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::db::DbPool;
use crate::publisher;
use crate::queue::VoteProducer;
use crate::stream::{ConnectionHandle, StreamAdapter};
use crate::vote::VoteEvent;
use crate::watchdog;

/// A spawned long-running task: an optional cancel signal plus its
/// completion. Completion can be awaited once.
pub struct TaskHandle {
    name: &'static str,
    cancel: Option<CancellationToken>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn a task that stops when `cancel` fires.
    pub fn spawn<F>(name: &'static str, cancel: CancellationToken, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            cancel: Some(cancel),
            join: tokio::spawn(task),
        }
    }

    /// Spawn a task whose end is driven by its input (e.g. a channel closing)
    /// rather than by a cancel signal.
    pub fn spawn_draining<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            cancel: None,
            join: tokio::spawn(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task to finish.
    pub async fn wait(self) -> Result<(), JoinError> {
        let result = self.join.await;
        match &result {
            Ok(()) => debug!(task = self.name, "task finished"),
            Err(e) => error!(task = self.name, error = %e, "task failed"),
        }
        result
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub channel_capacity: usize,
    pub watchdog_interval: Duration,
}

/// Owns the running ingestion tasks and stops them in dependency order.
pub struct ShutdownCoordinator {
    stop: CancellationToken,
    connection: ConnectionHandle,
    adapter: TaskHandle,
    votes: Option<mpsc::Sender<VoteEvent>>,
    publisher: TaskHandle,
    watchdog: TaskHandle,
    background: Vec<TaskHandle>,
    pool: Option<DbPool>,
}

impl ShutdownCoordinator {
    /// Wire adapter → channel → publisher and start them with the watchdog.
    pub fn start<P>(adapter: StreamAdapter, producer: P, settings: PipelineSettings) -> Self
    where
        P: VoteProducer + 'static,
    {
        let stop = CancellationToken::new();
        let (votes_tx, votes_rx) = mpsc::channel(settings.channel_capacity);
        let connection = adapter.connection();

        let publisher = publisher::spawn(producer, votes_rx);
        let adapter = adapter.spawn(stop.clone(), votes_tx.clone());
        let watchdog = watchdog::spawn(connection.clone(), stop.clone(), settings.watchdog_interval);

        Self {
            stop,
            connection,
            adapter,
            votes: Some(votes_tx),
            publisher,
            watchdog,
            background: Vec::new(),
            pool: None,
        }
    }

    /// The pipeline-wide stop signal. Background tasks should use a child.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Stop `task` together with the pipeline, after the publisher has drained.
    pub fn attach(&mut self, task: TaskHandle) {
        self.background.push(task);
    }

    /// Close `pool` as the last shutdown step.
    pub fn release_on_shutdown(&mut self, pool: DbPool) {
        self.pool = Some(pool);
    }

    /// Run the stop sequence. Every stage runs even if an earlier task
    /// panicked; the first failure is returned.
    pub async fn shutdown(mut self) -> Result<(), JoinError> {
        let mut first_error = None;

        // 1. raise the adapter's stop signal
        self.stop.cancel();
        // 2. unblock a pending stream read
        self.connection.close();
        // 3. wait for the adapter; it owns the only other sender
        info!("waiting for stream adapter to stop");
        if let Err(e) = self.adapter.wait().await {
            first_error.get_or_insert(e);
        }
        // 4. close the channel so the publisher drains and exits
        drop(self.votes.take());
        // 5. wait for the publisher
        info!("waiting for publisher to drain");
        if let Err(e) = self.publisher.wait().await {
            first_error.get_or_insert(e);
        }
        // 6. remaining tasks and collaborator resources
        self.watchdog.cancel();
        if let Err(e) = self.watchdog.wait().await {
            first_error.get_or_insert(e);
        }
        for task in self.background.drain(..) {
            task.cancel();
            if let Err(e) = task.wait().await {
                first_error.get_or_insert(e);
            }
        }
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("closed database connection");
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("pipeline stopped");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_task_handle_cancel_stops_task() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = TaskHandle::spawn("test", cancel, async move {
            token.cancelled().await;
        });

        assert!(!handle.is_finished());
        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("task should stop quickly")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn test_draining_handle_ignores_cancel() {
        let (tx, mut rx) = mpsc::channel::<u8>(1);
        let handle = TaskHandle::spawn_draining("drain", async move {
            while rx.recv().await.is_some() {}
        });

        handle.cancel();
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        drop(tx);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_reports_panics() {
        let handle = TaskHandle::spawn_draining("boom", async {
            panic!("boom");
        });
        assert_eq!(handle.name(), "boom");
        assert!(handle.wait().await.unwrap_err().is_panic());
    }
}
