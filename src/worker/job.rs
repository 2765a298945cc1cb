//! Decode job and completion types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::content::{ContentError, DecodedContent};
use crate::tileset::ContentKey;

/// Global counter for generating unique job ids.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a decode job.
///
/// Ids are monotonically increasing across the process, so a retried key
/// always gets a fresh id and stale completions for the old job can be told
/// apart from the retry's.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

impl JobId {
    /// Allocates the next job id.
    pub fn next() -> Self {
        Self(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the numeric value of this id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A unit of decode work: fetch the raw payload for a key, then decode it.
///
/// Jobs are created by the content cache on a cache miss and destroyed once
/// their completion has been delivered.
#[derive(Debug)]
pub struct DecodeJob {
    id: JobId,
    key: ContentKey,
}

impl DecodeJob {
    /// Creates a new job for the given content key with a fresh id.
    pub fn new(key: ContentKey) -> Self {
        Self {
            id: JobId::next(),
            key,
        }
    }

    /// Returns the job's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Returns the content key this job resolves.
    pub fn key(&self) -> &ContentKey {
        &self.key
    }
}

/// Terminal outcome of a decode job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Fetch and decode both succeeded.
    Decoded(Arc<DecodedContent>),

    /// Fetch or decode failed; the slot stays usable.
    Failed(ContentError),

    /// The job was discarded before or instead of executing.
    Cancelled,
}

impl JobOutcome {
    /// Returns true if the job produced content.
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    /// Returns true if the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Completion record delivered to the control thread.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    /// Id of the job that finished.
    pub job_id: JobId,

    /// Key the job was resolving.
    pub key: ContentKey,

    /// What happened.
    pub outcome: JobOutcome,
}
