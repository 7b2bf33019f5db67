use tokio::sync::mpsc;

use crate::queue::VoteProducer;
use crate::shutdown::TaskHandle;
use crate::vote::VoteEvent;

/// Start forwarding votes to the queue. The task ends once `votes` is closed
/// and every event sent before the close has been handed to the producer.
pub fn spawn<P>(producer: P, votes: mpsc::Receiver<VoteEvent>) -> TaskHandle
where
    P: VoteProducer + 'static,
{
    TaskHandle::spawn_draining("vote publisher", run(producer, votes))
}

pub async fn run<P: VoteProducer>(producer: P, mut votes: mpsc::Receiver<VoteEvent>) {
    let mut published = 0u64;
    let mut failed = 0u64;

    while let Some(vote) = votes.recv().await {
        match producer.publish(vote.payload()).await {
            Ok(()) => published += 1,
            Err(e) => {
                failed += 1;
                warn!(option = vote.option(), error = %e, "failed to publish vote");
            }
        }
    }

    info!(published, failed, "Publisher: stopping");
    if let Err(e) = producer.close().await {
        warn!(error = %e, "failed to close queue producer");
    }
    info!("Publisher: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct RecordingProducer {
        published: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<u32>>,
        reject: Option<&'static str>,
    }

    #[async_trait]
    impl VoteProducer for RecordingProducer {
        async fn publish(&self, payload: &[u8]) -> Result<(), QueueError> {
            let option = String::from_utf8(payload.to_vec()).unwrap();
            if self.reject == Some(option.as_str()) {
                return Err(QueueError::Closed);
            }
            self.published.lock().push(option);
            Ok(())
        }

        async fn close(&self) -> Result<(), QueueError> {
            *self.closed.lock() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_drains_everything_sent_before_close() {
        let producer = RecordingProducer::default();
        let (tx, rx) = mpsc::channel(8);
        for option in ["coke", "pepsi", "coke"] {
            tx.send(VoteEvent::new(option)).await.unwrap();
        }
        drop(tx);

        run(producer.clone(), rx).await;

        assert_eq!(*producer.published.lock(), vec!["coke", "pepsi", "coke"]);
        assert_eq!(*producer.closed.lock(), 1);
    }

    #[tokio::test]
    async fn test_publish_errors_do_not_stop_the_loop() {
        let producer = RecordingProducer {
            reject: Some("pepsi"),
            ..RecordingProducer::default()
        };
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn(producer.clone(), rx);

        for option in ["coke", "pepsi", "fanta"] {
            tx.send(VoteEvent::new(option)).await.unwrap();
        }
        drop(tx);
        handle.wait().await.unwrap();

        assert_eq!(*producer.published.lock(), vec!["coke", "fanta"]);
        assert_eq!(*producer.closed.lock(), 1);
    }
}
