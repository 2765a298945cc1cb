//! The content cache service.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use super::config::CacheConfig;
use super::entry::{CacheEntry, EntryState};
use super::stats::CacheStats;
use crate::content::{ContentError, DecodedContent};
use crate::tileset::ContentKey;
use crate::worker::{DecodeJob, JobCompletion, JobOutcome, PoolError, WorkerPool};

/// Capacity of the per-entry waiter channel. Coalesced requesters for one
/// key are typically counted on one hand.
const WAITER_CHANNEL_CAPACITY: usize = 16;

/// Result of a cache request.
#[derive(Debug)]
pub enum RequestOutcome {
    /// The content is resident; returned synchronously.
    Ready(Arc<DecodedContent>),

    /// A decode job is in flight (newly submitted or coalesced). The ticket
    /// resolves when the job completes; the traverser drops it and polls
    /// state on the next pass instead.
    Pending(ContentTicket),
}

impl RequestOutcome {
    /// Returns the resident content, if any.
    pub fn ready(&self) -> Option<&Arc<DecodedContent>> {
        match self {
            Self::Ready(content) => Some(content),
            Self::Pending(_) => None,
        }
    }

    /// Returns true if the content was resident.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Future-like handle for one in-flight content request.
///
/// Every requester coalesced onto the same job holds a ticket subscribed to
/// the same channel, so all of them observe the same outcome.
#[derive(Debug)]
pub struct ContentTicket {
    key: ContentKey,
    rx: broadcast::Receiver<JobOutcome>,
}

impl ContentTicket {
    fn new(key: ContentKey, rx: broadcast::Receiver<JobOutcome>) -> Self {
        Self { key, rx }
    }

    /// Returns the key this ticket resolves.
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// Waits for the in-flight job's outcome.
    ///
    /// A ticket whose entry was invalidated mid-flight resolves as
    /// [`JobOutcome::Cancelled`].
    pub async fn wait(mut self) -> JobOutcome {
        loop {
            match self.rx.recv().await {
                Ok(outcome) => return outcome,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return JobOutcome::Cancelled,
            }
        }
    }
}

/// How [`ContentCache::apply_completion`] disposed of a worker outcome.
#[derive(Debug)]
pub enum CompletionDisposition {
    /// Content stored; the entry is READY.
    Stored {
        key: ContentKey,
        content: Arc<DecodedContent>,
    },

    /// The job failed; the entry was removed so a future request retries
    /// from scratch.
    Failed { key: ContentKey, error: ContentError },

    /// The job was cancelled; the entry was removed without fanfare.
    Cancelled { key: ContentKey },

    /// The completion did not match a live entry (stale job id, invalidated
    /// key) and was dropped.
    Discarded,
}

/// LRU cache of decoded tile content with request coalescing.
///
/// Owned and mutated by the control thread only; worker results enter
/// through [`apply_completion`](Self::apply_completion), which the owner
/// calls while draining the pool's completion channel. That serialization
/// is what guarantees at most one in-flight job per key.
pub struct ContentCache {
    entries: HashMap<ContentKey, CacheEntry>,
    resident_bytes: usize,
    /// Logical recency clock; stamped on request hits and pin events.
    clock: u64,
    config: CacheConfig,
    stats: CacheStats,
}

impl ContentCache {
    /// Creates an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            resident_bytes: 0,
            clock: 0,
            config,
            stats: CacheStats::default(),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Requests content for `key`.
    ///
    /// A READY entry is returned synchronously. A PENDING entry coalesces
    /// this request onto the existing job, with no new work issued. Otherwise
    /// a decode job is submitted to `pool` and a PENDING entry created.
    ///
    /// Fails only if the pool has been shut down.
    pub fn request(
        &mut self,
        key: &ContentKey,
        pool: &WorkerPool,
    ) -> Result<RequestOutcome, PoolError> {
        let stamp = self.tick();

        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_touched = stamp;
            match &entry.state {
                EntryState::Ready { content } => {
                    self.stats.hits += 1;
                    trace!(%key, "cache hit");
                    return Ok(RequestOutcome::Ready(Arc::clone(content)));
                }
                EntryState::Pending { notify, .. } => {
                    self.stats.coalesced += 1;
                    trace!(%key, "coalescing onto in-flight job");
                    return Ok(RequestOutcome::Pending(ContentTicket::new(
                        key.clone(),
                        notify.subscribe(),
                    )));
                }
            }
        }

        self.stats.misses += 1;
        let job = DecodeJob::new(key.clone());
        let job_id = job.id();
        pool.submit(job)?;

        let (notify, rx) = broadcast::channel(WAITER_CHANNEL_CAPACITY);
        self.entries
            .insert(key.clone(), CacheEntry::pending(job_id, notify, stamp));
        self.stats.entry_count = self.entries.len();
        debug!(%key, %job_id, "cache miss, decode job submitted");

        Ok(RequestOutcome::Pending(ContentTicket::new(key.clone(), rx)))
    }

    /// Applies a worker outcome to the cache.
    ///
    /// This is the single serialized READY/FAILED transition point. The
    /// completion must carry the job id recorded in the PENDING entry;
    /// anything else (a job superseded by invalidation, a key already gone)
    /// is discarded so a retry's fresh job can never be clobbered by a stale
    /// result.
    pub fn apply_completion(&mut self, completion: JobCompletion) -> CompletionDisposition {
        let matched = match self.entries.get(&completion.key) {
            Some(CacheEntry {
                state: EntryState::Pending { job_id, .. },
                ..
            }) => *job_id == completion.job_id,
            _ => false,
        };

        if !matched {
            debug!(key = %completion.key, job_id = %completion.job_id, "discarding stale completion");
            return CompletionDisposition::Discarded;
        }

        let Some(entry) = self.entries.remove(&completion.key) else {
            return CompletionDisposition::Discarded;
        };
        let EntryState::Pending { notify, .. } = entry.state else {
            return CompletionDisposition::Discarded;
        };

        match completion.outcome {
            JobOutcome::Decoded(content) => {
                let stamp = self.tick();
                self.resident_bytes += content.byte_size();
                self.entries.insert(
                    completion.key.clone(),
                    CacheEntry {
                        state: EntryState::Ready {
                            content: Arc::clone(&content),
                        },
                        pin_count: entry.pin_count,
                        last_touched: stamp,
                    },
                );
                self.refresh_stats();
                let _ = notify.send(JobOutcome::Decoded(Arc::clone(&content)));
                debug!(key = %completion.key, bytes = content.byte_size(), "content stored");
                CompletionDisposition::Stored {
                    key: completion.key,
                    content,
                }
            }
            JobOutcome::Failed(error) => {
                self.refresh_stats();
                let _ = notify.send(JobOutcome::Failed(error.clone()));
                warn!(key = %completion.key, %error, "decode job failed");
                CompletionDisposition::Failed {
                    key: completion.key,
                    error,
                }
            }
            JobOutcome::Cancelled => {
                self.refresh_stats();
                let _ = notify.send(JobOutcome::Cancelled);
                debug!(key = %completion.key, "decode job cancelled");
                CompletionDisposition::Cancelled {
                    key: completion.key,
                }
            }
        }
    }

    /// Marks `key` as held by a visible tile, protecting it from eviction.
    pub fn pin(&mut self, key: &ContentKey) {
        let stamp = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.pin_count += 1;
                entry.last_touched = stamp;
            }
            None => warn!(%key, "pin on missing cache entry"),
        }
    }

    /// Releases one pin on `key`.
    pub fn unpin(&mut self, key: &ContentKey) {
        match self.entries.get_mut(key) {
            Some(entry) if entry.pin_count > 0 => entry.pin_count -= 1,
            Some(_) => warn!(%key, "unpin on unpinned cache entry"),
            None => warn!(%key, "unpin on missing cache entry"),
        }
    }

    /// Returns the current pin count for `key` (zero if absent).
    pub fn pin_count(&self, key: &ContentKey) -> u32 {
        self.entries.get(key).map_or(0, |entry| entry.pin_count)
    }

    /// Evicts least-recently-used unpinned READY entries until the resident
    /// size fits the budget or no eviction candidate remains.
    ///
    /// Returns the evicted keys so the caller can notify observers and reset
    /// tile state. If only pinned entries remain over budget, the budget is
    /// temporarily exceeded and eviction resumes on the next pass.
    pub fn evict_if_over_budget(&mut self) -> Vec<ContentKey> {
        let mut evicted = Vec::new();

        while self.resident_bytes > self.config.max_resident_bytes {
            let victim = self
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_ready() && !entry.is_pinned())
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(key, _)| key.clone());

            let Some(key) = victim else {
                warn!(
                    resident_bytes = self.resident_bytes,
                    budget = self.config.max_resident_bytes,
                    "over budget but only pinned entries remain"
                );
                break;
            };

            if let Some(entry) = self.entries.remove(&key) {
                self.resident_bytes = self.resident_bytes.saturating_sub(entry.byte_size());
                self.stats.evictions += 1;
                debug!(%key, "evicted least-recently-used entry");
                evicted.push(key);
            }
        }

        self.refresh_stats();
        evicted
    }

    /// Forcibly drops the entry for `key`, pinned or not.
    ///
    /// An in-flight job for the key keeps running, but its completion no
    /// longer matches an entry and is discarded on arrival. Waiters holding
    /// tickets observe a cancelled outcome.
    pub fn invalidate(&mut self, key: &ContentKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.resident_bytes = self.resident_bytes.saturating_sub(entry.byte_size());
            self.refresh_stats();
            debug!(%key, pinned = entry.is_pinned(), "entry invalidated");
        }
    }

    /// Returns resident content without touching recency.
    pub fn peek(&self, key: &ContentKey) -> Option<Arc<DecodedContent>> {
        match self.entries.get(key) {
            Some(CacheEntry {
                state: EntryState::Ready { content },
                ..
            }) => Some(Arc::clone(content)),
            _ => None,
        }
    }

    /// Returns true if a READY entry exists for `key`.
    pub fn is_ready(&self, key: &ContentKey) -> bool {
        self.entries.get(key).is_some_and(CacheEntry::is_ready)
    }

    /// Returns true if any entry (pending included) exists for `key`.
    pub fn contains(&self, key: &ContentKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the resident size of READY entries in bytes.
    pub fn resident_bytes(&self) -> usize {
        self.resident_bytes
    }

    /// Returns the number of entries, pending included.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    fn refresh_stats(&mut self) {
        self.stats.resident_bytes = self.resident_bytes;
        self.stats.entry_count = self.entries.len();
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("entries", &self.entries.len())
            .field("resident_bytes", &self.resident_bytes)
            .field("budget", &self.config.max_resident_bytes)
            .finish()
    }
}
