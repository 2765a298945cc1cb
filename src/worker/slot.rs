//! Worker slot execution loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::job::{DecodeJob, JobCompletion, JobOutcome};
use super::pool::PoolCounters;
use super::queue::SharedJobReceiver;
use crate::content::ContentLoader;

/// One long-lived worker execution context.
///
/// A slot runs exactly one decode job at a time: it pulls the next job from
/// the shared queue, runs fetch + decode through the loader, and delivers
/// the outcome on the completion channel. A failing job is converted into a
/// [`JobOutcome::Failed`] completion and the slot returns to the idle set -
/// one bad payload never disables a worker.
pub(crate) struct WorkerSlot {
    index: usize,
    loader: Arc<dyn ContentLoader>,
    completions: mpsc::UnboundedSender<JobCompletion>,
    counters: Arc<PoolCounters>,
    shutdown: CancellationToken,
}

impl WorkerSlot {
    pub(crate) fn new(
        index: usize,
        loader: Arc<dyn ContentLoader>,
        completions: mpsc::UnboundedSender<JobCompletion>,
        counters: Arc<PoolCounters>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            index,
            loader,
            completions,
            counters,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or the queue closes.
    ///
    /// The shutdown check happens between jobs only: an in-flight job always
    /// finishes (workers are not preemptible).
    pub(crate) async fn run(self, queue: SharedJobReceiver) {
        trace!(slot = self.index, "worker slot started");

        loop {
            let next = {
                let mut rx = queue.lock().await;
                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => None,
                    queued = rx.recv() => queued,
                }
            };

            let Some(queued) = next else { break };

            if queued.cancelled.load(Ordering::Acquire) {
                debug!(slot = self.index, job_id = %queued.job.id(), "skipping cancelled job");
                self.counters.record_cancelled();
                self.deliver(&queued.job, JobOutcome::Cancelled);
                continue;
            }

            let outcome = self.execute(&queued.job).await;
            match &outcome {
                JobOutcome::Decoded(_) => self.counters.record_decoded(),
                JobOutcome::Failed(_) => self.counters.record_failed(),
                JobOutcome::Cancelled => self.counters.record_cancelled(),
            }
            self.deliver(&queued.job, outcome);
        }

        trace!(slot = self.index, "worker slot exiting");
    }

    /// Fetch + decode, with both failure paths caught at the slot boundary.
    async fn execute(&self, job: &DecodeJob) -> JobOutcome {
        let raw = match self.loader.fetch_raw(job.key()).await {
            Ok(raw) => raw,
            Err(err) => return JobOutcome::Failed(err.into()),
        };

        match self.loader.decode(job.key(), raw) {
            Ok(content) => JobOutcome::Decoded(Arc::new(content)),
            Err(err) => JobOutcome::Failed(err.into()),
        }
    }

    fn deliver(&self, job: &DecodeJob, outcome: JobOutcome) {
        let completion = JobCompletion {
            job_id: job.id(),
            key: job.key().clone(),
            outcome,
        };
        // The receiver dropping mid-shutdown is not an error worth surfacing.
        let _ = self.completions.send(completion);
    }
}
