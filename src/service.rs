//! High-level facade wiring the engine together.
//!
//! [`TileStreamService`] constructs the worker pool, content cache, and
//! traverser from one [`EngineConfig`] and owns them for its lifetime. There
//! is no hidden shared state: several services over independent tilesets can
//! coexist in one process, each with its own pool and cache.

use std::sync::Arc;

use tracing::info;

use crate::cache::{CacheStats, ContentCache};
use crate::config::EngineConfig;
use crate::content::{ContentLoader, DecodedContent};
use crate::tileset::{ContentKey, TileId, Tileset};
use crate::traversal::{
    NullEventSink, TileEventSink, TileRuntimeState, TilesetTraverser, ViewEvaluator, ViewState,
};
use crate::worker::{PoolStats, WorkerPool};

/// One tile streaming engine: pool + cache + traverser under a single owner.
///
/// Must be created within a Tokio runtime; the worker slots are spawned at
/// construction time.
pub struct TileStreamService {
    traverser: TilesetTraverser,
}

impl TileStreamService {
    /// Creates a service with no event subscriber.
    pub fn new(
        tileset: Arc<Tileset>,
        loader: Arc<dyn ContentLoader>,
        evaluator: Arc<dyn ViewEvaluator>,
        config: EngineConfig,
    ) -> Self {
        Self::with_event_sink(tileset, loader, evaluator, Arc::new(NullEventSink), config)
    }

    /// Creates a service delivering tile events to `events`.
    pub fn with_event_sink(
        tileset: Arc<Tileset>,
        loader: Arc<dyn ContentLoader>,
        evaluator: Arc<dyn ViewEvaluator>,
        events: Arc<dyn TileEventSink>,
        config: EngineConfig,
    ) -> Self {
        let (pool, completions) = WorkerPool::new(config.worker.clone(), loader);
        let cache = ContentCache::new(config.cache.clone());
        let traverser = TilesetTraverser::new(
            tileset,
            cache,
            pool,
            completions,
            evaluator,
            events,
            config.traversal.clone(),
        );

        info!(
            tiles = traverser.tileset().len(),
            workers = config.worker.worker_count,
            cache_budget = config.cache.max_resident_bytes,
            "tile stream service started"
        );

        Self { traverser }
    }

    /// Runs one update pass: applies finished decodes, walks the tree, and
    /// evicts over-budget content. Call once per frame or update tick.
    pub fn update(&mut self, view: &ViewState) {
        self.traverser.run_pass(view);
    }

    /// Returns resident decoded content for a tile, if any.
    pub fn content_for(&self, tile: TileId) -> Option<Arc<DecodedContent>> {
        self.traverser.content_for(tile)
    }

    /// Returns the closest ancestor of `tile` with resident content.
    pub fn fallback_for(&self, tile: TileId) -> Option<TileId> {
        self.traverser.nearest_ready_ancestor(tile)
    }

    /// Returns a tile's runtime state.
    pub fn tile_state(&self, tile: TileId) -> &TileRuntimeState {
        self.traverser.state(tile)
    }

    /// Forcibly drops cached content for a key (cache busting).
    pub fn invalidate(&mut self, key: &ContentKey) {
        self.traverser.invalidate(key);
    }

    /// Returns cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.traverser.cache_stats()
    }

    /// Returns worker pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        self.traverser.pool_stats()
    }

    /// Shuts the engine down: the pool stops accepting work, in-flight
    /// decodes drain, and the worker slots are released.
    pub async fn shutdown(self) {
        self.traverser.shutdown().await;
        info!("tile stream service shut down");
    }
}

impl std::fmt::Debug for TileStreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileStreamService")
            .field("traverser", &self.traverser)
            .finish()
    }
}
