//! Engine-level configuration.
//!
//! One aggregate of the per-component configs, for callers that wire the
//! whole engine through [`service::TileStreamService`](crate::service). Each
//! component can also be configured and constructed individually.

use crate::cache::CacheConfig;
use crate::traversal::TraversalConfig;
use crate::worker::WorkerPoolConfig;

/// Configuration for a complete tile streaming engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Worker pool settings.
    pub worker: WorkerPoolConfig,

    /// Content cache settings.
    pub cache: CacheConfig,

    /// Traversal settings.
    pub traversal: TraversalConfig,
}

impl EngineConfig {
    /// Creates a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decode worker count.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker = self.worker.with_worker_count(count);
        self
    }

    /// Sets the cache byte budget.
    pub fn with_cache_budget(mut self, bytes: usize) -> Self {
        self.cache = self.cache.with_max_resident_bytes(bytes);
        self
    }

    /// Sets the screen-space error threshold.
    pub fn with_sse_threshold(mut self, threshold: f64) -> Self {
        self.traversal = self.traversal.with_sse_threshold(threshold);
        self
    }

    /// Sets the per-tile retry budget.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.traversal = self.traversal.with_retry_budget(budget);
        self
    }
}
