//! FIFO job queue between submitters and worker slots.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::job::DecodeJob;

/// A job as it sits in the queue: the work plus its cancellation flag.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub(crate) job: DecodeJob,
    pub(crate) cancelled: Arc<AtomicBool>,
}

/// Receiving end of the queue, shared by all worker slots.
///
/// The mutex serializes dequeue so the next idle slot gets the next job in
/// submission order.
pub(crate) type SharedJobReceiver = Arc<Mutex<mpsc::UnboundedReceiver<QueuedJob>>>;

/// Unbounded, ordered, multi-producer queue decoupling "job submitted" from
/// "job started".
///
/// Submission never blocks; ordering is strict FIFO.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
}

impl JobQueue {
    /// Creates a queue and the shared receiver the slots will drain.
    pub(crate) fn new() -> (Self, SharedJobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, Arc::new(Mutex::new(rx)))
    }

    /// Enqueues a job. Fails only if every receiver has shut down.
    pub(crate) fn push(&self, queued: QueuedJob) -> Result<(), QueuedJob> {
        self.tx.send(queued).map_err(|err| err.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tileset::ContentKey;

    fn queued(key: &str) -> QueuedJob {
        QueuedJob {
            job: DecodeJob::new(ContentKey::new(key)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[tokio::test]
    async fn test_queue_preserves_fifo_order() {
        let (queue, rx) = JobQueue::new();

        queue.push(queued("a")).unwrap();
        queue.push(queued("b")).unwrap();
        queue.push(queued("c")).unwrap();

        let mut rx = rx.lock().await;
        assert_eq!(rx.recv().await.unwrap().job.key().as_str(), "a");
        assert_eq!(rx.recv().await.unwrap().job.key().as_str(), "b");
        assert_eq!(rx.recv().await.unwrap().job.key().as_str(), "c");
    }

    #[tokio::test]
    async fn test_push_fails_after_receiver_dropped() {
        let (queue, rx) = JobQueue::new();
        drop(rx);

        let rejected = queue.push(queued("a"));
        assert!(rejected.is_err());
    }
}
