//! Decoded content cache.
//!
//! The single authoritative map from content key to decoded payload, with
//! request coalescing and budget-bounded LRU eviction:
//!
//! ```text
//! request(k) ── hit ───► Arc<DecodedContent>          (synchronous)
//!            ── miss ──► submit DecodeJob ──► Pending entry + ticket
//!            ── pending ► subscribe to the in-flight job  (coalesced)
//! ```
//!
//! All mutation happens on the control thread; worker outcomes enter through
//! [`ContentCache::apply_completion`], the single serialized READY/FAILED
//! transition point. Recency is a logical clock stamped on request hits and
//! pin events, never wall-clock time, so eviction order is deterministic.

mod config;
mod content_cache;
mod entry;
mod stats;

pub use config::{CacheConfig, DEFAULT_MAX_RESIDENT_BYTES};
pub use content_cache::{CompletionDisposition, ContentCache, ContentTicket, RequestOutcome};
pub use stats::CacheStats;
