//! Cache configuration.

/// Default resident byte budget (512 MiB).
pub const DEFAULT_MAX_RESIDENT_BYTES: usize = 512 * 1024 * 1024;

/// Configuration for the content cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte budget for resident decoded content.
    ///
    /// The budget bounds READY entries after each eviction pass; it may be
    /// exceeded temporarily while every over-budget entry is pinned.
    pub max_resident_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_resident_bytes: DEFAULT_MAX_RESIDENT_BYTES,
        }
    }
}

impl CacheConfig {
    /// Sets the resident byte budget.
    pub fn with_max_resident_bytes(mut self, bytes: usize) -> Self {
        self.max_resident_bytes = bytes;
        self
    }
}
