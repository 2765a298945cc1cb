//! Cache entry states.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::content::DecodedContent;
use crate::worker::{JobId, JobOutcome};

/// What an entry currently holds: a decoded payload, or the in-flight job
/// that will produce one.
#[derive(Debug)]
pub(crate) enum EntryState {
    /// A decode job is in flight. Coalesced requesters subscribe to
    /// `notify` and all observe the same outcome.
    Pending {
        job_id: JobId,
        notify: broadcast::Sender<JobOutcome>,
    },

    /// Decoded content is resident.
    Ready { content: Arc<DecodedContent> },
}

/// One slot in the cache map.
pub(crate) struct CacheEntry {
    pub(crate) state: EntryState,
    /// Number of currently-visible tiles holding this key. While positive,
    /// the entry is ineligible for eviction.
    pub(crate) pin_count: u32,
    /// Logical clock stamp of the last request hit or pin event.
    pub(crate) last_touched: u64,
}

impl CacheEntry {
    pub(crate) fn pending(
        job_id: JobId,
        notify: broadcast::Sender<JobOutcome>,
        stamp: u64,
    ) -> Self {
        Self {
            state: EntryState::Pending { job_id, notify },
            pin_count: 0,
            last_touched: stamp,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        matches!(self.state, EntryState::Ready { .. })
    }

    pub(crate) fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Resident size contribution: pending entries hold no payload yet.
    pub(crate) fn byte_size(&self) -> usize {
        match &self.state {
            EntryState::Pending { .. } => 0,
            EntryState::Ready { content } => content.byte_size(),
        }
    }
}
