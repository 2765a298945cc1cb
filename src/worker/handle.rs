//! Handle to a submitted decode job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::job::JobId;
use crate::tileset::ContentKey;

/// Handle returned by [`WorkerPool::submit`](super::WorkerPool::submit).
///
/// The handle is cloneable; all clones refer to the same job. Completion is
/// not observed through the handle but through the pool's completion
/// channel - the handle exists to identify the job and to request
/// best-effort cancellation.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job_id: JobId,
    key: ContentKey,
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    pub(crate) fn new(job_id: JobId, key: ContentKey) -> Self {
        Self {
            job_id,
            key,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the id of the submitted job.
    pub fn id(&self) -> JobId {
        self.job_id
    }

    /// Returns the content key the job resolves.
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// Requests cancellation of the job.
    ///
    /// If the job has not started, it is skipped at dequeue and completes as
    /// cancelled. If it is already executing, the worker finishes normally
    /// and the caller is expected to discard the result.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Shares the cancellation flag with the queued job record.
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}
