//! The worker pool: submission, cancellation, shutdown.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::WorkerPoolConfig;
use super::handle::JobHandle;
use super::job::{DecodeJob, JobCompletion, JobOutcome};
use super::queue::{JobQueue, QueuedJob, SharedJobReceiver};
use super::slot::WorkerSlot;
use crate::content::ContentLoader;

/// Worker pool errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool no longer accepts submissions.
    #[error("worker pool is shut down")]
    Closed,
}

/// Shared counters bumped by the slots; snapshot via [`PoolStats`].
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    submitted: AtomicU64,
    decoded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decoded(&self) {
        self.decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs accepted by `submit`.
    pub submitted: u64,
    /// Jobs that produced decoded content.
    pub decoded: u64,
    /// Jobs that failed in fetch or decode.
    pub failed: u64,
    /// Jobs discarded before execution.
    pub cancelled: u64,
}

impl PoolStats {
    /// Returns the number of jobs with a terminal outcome.
    pub fn completed(&self) -> u64 {
        self.decoded + self.failed + self.cancelled
    }
}

/// Fixed-size pool of decode workers fed by a FIFO queue.
///
/// Construction spawns one slot task per configured worker and returns the
/// single-consumer completion channel alongside the pool; the control thread
/// drains that channel and applies outcomes to the cache.
///
/// Must be created within a Tokio runtime.
pub struct WorkerPool {
    queue: JobQueue,
    queue_rx: SharedJobReceiver,
    slots: Mutex<Vec<JoinHandle<()>>>,
    completion_tx: mpsc::UnboundedSender<JobCompletion>,
    counters: Arc<PoolCounters>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    worker_count: usize,
}

impl WorkerPool {
    /// Creates the pool and spawns its worker slots.
    ///
    /// Returns the pool and the receiving end of the completion channel.
    pub fn new(
        config: WorkerPoolConfig,
        loader: Arc<dyn ContentLoader>,
    ) -> (Self, mpsc::UnboundedReceiver<JobCompletion>) {
        let worker_count = config.worker_count.max(1);
        let (queue, queue_rx) = JobQueue::new();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(PoolCounters::default());
        let shutdown = CancellationToken::new();

        let slots = (0..worker_count)
            .map(|index| {
                let slot = WorkerSlot::new(
                    index,
                    Arc::clone(&loader),
                    completion_tx.clone(),
                    Arc::clone(&counters),
                    shutdown.clone(),
                );
                tokio::spawn(slot.run(Arc::clone(&queue_rx)))
            })
            .collect();

        info!(workers = worker_count, "worker pool started");

        let pool = Self {
            queue,
            queue_rx,
            slots: Mutex::new(slots),
            completion_tx,
            counters,
            shutdown,
            closed: AtomicBool::new(false),
            worker_count,
        };
        (pool, completion_rx)
    }

    /// Enqueues a decode job. Never blocks.
    ///
    /// Returns a handle identifying the job; completion arrives on the
    /// pool's completion channel, not through the handle.
    pub fn submit(&self, job: DecodeJob) -> Result<JobHandle, PoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }

        let handle = JobHandle::new(job.id(), job.key().clone());
        debug!(job_id = %job.id(), key = %job.key(), "submitting decode job");

        let queued = QueuedJob {
            job,
            cancelled: handle.cancel_flag(),
        };
        if self.queue.push(queued).is_err() {
            return Err(PoolError::Closed);
        }

        self.counters.record_submitted();
        Ok(handle)
    }

    /// Requests best-effort cancellation of a submitted job.
    ///
    /// See [`JobHandle::cancel`] for the exact semantics.
    pub fn cancel(&self, handle: &JobHandle) {
        debug!(job_id = %handle.id(), key = %handle.key(), "cancellation requested");
        handle.cancel();
    }

    /// Stops accepting submissions, lets in-flight jobs finish, and releases
    /// every worker slot.
    ///
    /// Jobs still queued when shutdown begins are resolved as
    /// [`JobOutcome::Cancelled`] so no requester waits forever.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shutdown.cancel();

        let mut slots = self.slots.lock().await;
        for slot in slots.drain(..) {
            if slot.await.is_err() {
                warn!("worker slot task aborted during shutdown");
            }
        }

        // Slots are gone; resolve whatever never started.
        let mut drained = 0usize;
        let mut rx = self.queue_rx.lock().await;
        while let Ok(queued) = rx.try_recv() {
            self.counters.record_cancelled();
            let _ = self.completion_tx.send(JobCompletion {
                job_id: queued.job.id(),
                key: queued.job.key().clone(),
                outcome: JobOutcome::Cancelled,
            });
            drained += 1;
        }

        info!(drained, "worker pool shut down");
    }

    /// Returns the number of worker slots.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns a snapshot of the pool's activity counters.
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DecodeError, DecodedContent, FetchError, FetchFuture};
    use crate::tileset::ContentKey;
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Loader that echoes the key as payload, with optional failure keys and
    /// an optional gate that holds every fetch until opened.
    struct TestLoader {
        fail_fetch: HashSet<String>,
        fail_decode: HashSet<String>,
        gate: Option<watch::Receiver<bool>>,
    }

    impl TestLoader {
        fn instant() -> Self {
            Self {
                fail_fetch: HashSet::new(),
                fail_decode: HashSet::new(),
                gate: None,
            }
        }

        fn gated(gate: watch::Receiver<bool>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::instant()
            }
        }

        fn failing_fetch(keys: &[&str]) -> Self {
            Self {
                fail_fetch: keys.iter().map(|k| k.to_string()).collect(),
                ..Self::instant()
            }
        }

        fn failing_decode(keys: &[&str]) -> Self {
            Self {
                fail_decode: keys.iter().map(|k| k.to_string()).collect(),
                ..Self::instant()
            }
        }
    }

    impl ContentLoader for TestLoader {
        fn fetch_raw<'a>(&'a self, key: &'a ContentKey) -> FetchFuture<'a> {
            let mut gate = self.gate.clone();
            Box::pin(async move {
                if let Some(gate) = gate.as_mut() {
                    while !*gate.borrow() {
                        if gate.changed().await.is_err() {
                            break;
                        }
                    }
                }
                if self.fail_fetch.contains(key.as_str()) {
                    return Err(FetchError::NotFound(key.clone()));
                }
                Ok(Bytes::copy_from_slice(key.as_str().as_bytes()))
            })
        }

        fn decode(&self, key: &ContentKey, raw: Bytes) -> Result<DecodedContent, DecodeError> {
            if self.fail_decode.contains(key.as_str()) {
                return Err(DecodeError::Malformed {
                    key: key.clone(),
                    message: "bad payload".to_string(),
                });
            }
            Ok(DecodedContent::new(raw))
        }
    }

    fn single_worker(loader: TestLoader) -> (WorkerPool, mpsc::UnboundedReceiver<JobCompletion>) {
        WorkerPool::new(
            WorkerPoolConfig::default().with_worker_count(1),
            Arc::new(loader),
        )
    }

    async fn recv_completion(rx: &mut mpsc::UnboundedReceiver<JobCompletion>) -> JobCompletion {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for completion")
            .expect("completion channel closed")
    }

    #[tokio::test]
    async fn test_submit_executes_and_delivers_completion() {
        let (pool, mut rx) = single_worker(TestLoader::instant());

        let handle = pool.submit(DecodeJob::new(ContentKey::new("a"))).unwrap();
        let completion = recv_completion(&mut rx).await;

        assert_eq!(completion.job_id, handle.id());
        assert_eq!(completion.key.as_str(), "a");
        match completion.outcome {
            JobOutcome::Decoded(content) => assert_eq!(content.data().as_ref(), b"a"),
            other => panic!("expected decoded outcome, got {:?}", other),
        }

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_worker_preserves_fifo_order() {
        let (pool, mut rx) = single_worker(TestLoader::instant());

        for key in ["a", "b", "c", "d"] {
            pool.submit(DecodeJob::new(ContentKey::new(key))).unwrap();
        }

        for expected in ["a", "b", "c", "d"] {
            let completion = recv_completion(&mut rx).await;
            assert_eq!(completion.key.as_str(), expected);
        }

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_job_does_not_disable_worker() {
        let (pool, mut rx) = single_worker(TestLoader::failing_decode(&["bad"]));

        pool.submit(DecodeJob::new(ContentKey::new("bad"))).unwrap();
        pool.submit(DecodeJob::new(ContentKey::new("good"))).unwrap();

        let first = recv_completion(&mut rx).await;
        assert!(matches!(first.outcome, JobOutcome::Failed(ref err) if err.is_decode()));

        // The same slot still processes the next job.
        let second = recv_completion(&mut rx).await;
        assert!(second.outcome.is_decoded());

        let stats = pool.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.decoded, 1);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_as_failed_outcome() {
        let (pool, mut rx) = single_worker(TestLoader::failing_fetch(&["gone"]));

        pool.submit(DecodeJob::new(ContentKey::new("gone"))).unwrap();

        let completion = recv_completion(&mut rx).await;
        assert!(matches!(completion.outcome, JobOutcome::Failed(ref err) if !err.is_decode()));

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_before_start_resolves_cancelled() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let (pool, mut rx) = single_worker(TestLoader::gated(gate_rx));

        // First job occupies the only worker; second sits in the queue.
        let _running = pool.submit(DecodeJob::new(ContentKey::new("running"))).unwrap();
        let queued = pool.submit(DecodeJob::new(ContentKey::new("queued"))).unwrap();

        pool.cancel(&queued);
        gate_tx.send(true).unwrap();

        let first = recv_completion(&mut rx).await;
        assert_eq!(first.key.as_str(), "running");
        assert!(first.outcome.is_decoded());

        let second = recv_completion(&mut rx).await;
        assert_eq!(second.key.as_str(), "queued");
        assert!(second.outcome.is_cancelled());

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_running_job_is_advisory() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let (pool, mut rx) = single_worker(TestLoader::gated(gate_rx));

        let handle = pool.submit(DecodeJob::new(ContentKey::new("a"))).unwrap();
        // Give the slot time to dequeue and block on the gate.
        tokio::time::sleep(Duration::from_millis(20)).await;

        pool.cancel(&handle);
        gate_tx.send(true).unwrap();

        // The running job finishes; the result arrives and the caller is the
        // one who discards it.
        let completion = recv_completion(&mut rx).await;
        assert!(completion.outcome.is_decoded());

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let (pool, _rx) = single_worker(TestLoader::instant());
        pool.shutdown().await;

        let rejected = pool.submit(DecodeJob::new(ContentKey::new("late")));
        assert_eq!(rejected.unwrap_err(), PoolError::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs_as_cancelled() {
        let (gate_tx, gate_rx) = watch::channel(false);
        let (pool, mut rx) = single_worker(TestLoader::gated(gate_rx));

        let _running = pool.submit(DecodeJob::new(ContentKey::new("running"))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.submit(DecodeJob::new(ContentKey::new("q1"))).unwrap();
        pool.submit(DecodeJob::new(ContentKey::new("q2"))).unwrap();

        // Begin shutdown while the first job is still in flight, then let it
        // drain. The queued jobs must never start.
        let shutdown = tokio::spawn(async move {
            pool.shutdown().await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate_tx.send(true).unwrap();
        shutdown.await.unwrap();

        let mut outcomes = Vec::new();
        while let Ok(completion) = rx.try_recv() {
            outcomes.push((completion.key.as_str().to_string(), completion.outcome));
        }

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_decoded(), "in-flight job drains normally");
        assert!(outcomes.iter().skip(1).all(|(_, o)| o.is_cancelled()));
    }

    #[tokio::test]
    async fn test_concurrent_submitters_all_complete() {
        let (pool, mut rx) = WorkerPool::new(
            WorkerPoolConfig::default().with_worker_count(2),
            Arc::new(TestLoader::instant()),
        );
        let pool = Arc::new(pool);

        let submissions: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    pool.submit(DecodeJob::new(ContentKey::new(format!("tile-{}", i))))
                })
            })
            .collect();

        let results = futures::future::join_all(submissions).await;
        assert!(results.into_iter().all(|r| r.unwrap().is_ok()));

        for _ in 0..8 {
            assert!(recv_completion(&mut rx).await.outcome.is_decoded());
        }

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_multiple_workers_complete_all_jobs() {
        let (pool, mut rx) = WorkerPool::new(
            WorkerPoolConfig::default().with_worker_count(4),
            Arc::new(TestLoader::instant()),
        );

        let total = 32;
        for i in 0..total {
            pool.submit(DecodeJob::new(ContentKey::new(format!("tile-{}", i))))
                .unwrap();
        }

        let mut seen = HashSet::new();
        for _ in 0..total {
            let completion = recv_completion(&mut rx).await;
            assert!(completion.outcome.is_decoded());
            seen.insert(completion.key.as_str().to_string());
        }
        assert_eq!(seen.len(), total);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_stats_counts_submissions() {
        let (pool, mut rx) = single_worker(TestLoader::instant());

        pool.submit(DecodeJob::new(ContentKey::new("a"))).unwrap();
        pool.submit(DecodeJob::new(ContentKey::new("b"))).unwrap();
        recv_completion(&mut rx).await;
        recv_completion(&mut rx).await;

        let stats = pool.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.decoded, 2);
        assert_eq!(stats.completed(), 2);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (pool, _rx) = single_worker(TestLoader::instant());
        pool.shutdown().await;
        pool.shutdown().await;
    }
}
