//! Traversal configuration.

/// Default screen-space error threshold in pixels.
pub const DEFAULT_SSE_THRESHOLD: f64 = 16.0;

/// Default number of retry attempts for a tile whose content failed.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Configuration for the tileset traverser.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Screen-space error above which a visible tile refines into its
    /// children instead of rendering its own content.
    pub sse_threshold: f64,

    /// How many times a tile's failed content request is re-issued before
    /// the tile is given up on for the session.
    pub retry_budget: u32,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            sse_threshold: DEFAULT_SSE_THRESHOLD,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl TraversalConfig {
    /// Sets the screen-space error threshold.
    pub fn with_sse_threshold(mut self, threshold: f64) -> Self {
        self.sse_threshold = threshold;
        self
    }

    /// Sets the retry budget.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TraversalConfig::default();
        assert_eq!(config.sse_threshold, DEFAULT_SSE_THRESHOLD);
        assert_eq!(config.retry_budget, DEFAULT_RETRY_BUDGET);
    }

    #[test]
    fn test_config_builders() {
        let config = TraversalConfig::default()
            .with_sse_threshold(4.0)
            .with_retry_budget(1);
        assert_eq!(config.sse_threshold, 4.0);
        assert_eq!(config.retry_budget, 1);
    }
}
