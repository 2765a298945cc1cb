//! The per-pass tileset traverser.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::config::TraversalConfig;
use super::events::{TileEvent, TileEventSink};
use super::state::{ContentStatus, TileRuntimeState, TraversalMark};
use super::view::{TileViewMetrics, ViewEvaluator, ViewState};
use crate::cache::{CompletionDisposition, ContentCache, RequestOutcome};
use crate::content::DecodedContent;
use crate::tileset::{ContentKey, RefineMode, TileId, Tileset};
use crate::worker::{JobCompletion, PoolError, PoolStats, WorkerPool};

/// Walks the tile tree once per update tick and decides, per tile, whether
/// its content should be requested, kept, or released.
///
/// The traverser runs synchronously on the control thread. It owns the
/// content cache and the worker pool outright; worker outcomes reach it
/// through the pool's completion channel, which it drains at the start of
/// every pass. Content state is polled pass-to-pass, never awaited, so a
/// slow decode can never stall traversal.
pub struct TilesetTraverser {
    tileset: Arc<Tileset>,
    cache: ContentCache,
    pool: WorkerPool,
    completions: mpsc::UnboundedReceiver<JobCompletion>,
    evaluator: Arc<dyn ViewEvaluator>,
    events: Arc<dyn TileEventSink>,
    states: Vec<TileRuntimeState>,
    tiles_by_key: HashMap<ContentKey, Vec<TileId>>,
    /// Tiles currently holding a pin on their content key.
    pinned: HashSet<TileId>,
    pass: u64,
    config: TraversalConfig,
}

impl TilesetTraverser {
    /// Creates a traverser over `tileset`, taking ownership of the cache,
    /// pool, and the pool's completion channel.
    pub fn new(
        tileset: Arc<Tileset>,
        cache: ContentCache,
        pool: WorkerPool,
        completions: mpsc::UnboundedReceiver<JobCompletion>,
        evaluator: Arc<dyn ViewEvaluator>,
        events: Arc<dyn TileEventSink>,
        config: TraversalConfig,
    ) -> Self {
        let states = vec![TileRuntimeState::default(); tileset.len()];
        let tiles_by_key = tileset.tiles_by_key();
        Self {
            tileset,
            cache,
            pool,
            completions,
            evaluator,
            events,
            states,
            tiles_by_key,
            pinned: HashSet::new(),
            pass: 0,
            config,
        }
    }

    /// Runs one update pass against the given view.
    ///
    /// Order of operations: deliver worker outcomes, walk the tree, release
    /// pins for tiles that left the visible set, then run one eviction pass.
    pub fn run_pass(&mut self, view: &ViewState) {
        self.pass += 1;
        self.drain_completions();

        let mut retained: HashSet<TileId> = HashSet::new();

        let mut roots: Vec<(TileId, TileViewMetrics)> = self
            .tileset
            .roots()
            .iter()
            .map(|&id| (id, self.evaluator.evaluate(self.tileset.tile(id), view)))
            .collect();
        roots.sort_by(|a, b| a.1.distance.total_cmp(&b.1.distance));

        for (id, metrics) in roots {
            self.visit(id, metrics, view, &mut retained);
        }

        self.release_unretained(&retained);
        self.evict();

        trace!(
            pass = self.pass,
            pinned = self.pinned.len(),
            resident_bytes = self.cache.resident_bytes(),
            "traversal pass complete"
        );
    }

    /// Applies every queued worker outcome to the cache and tile states.
    fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions.try_recv() {
            match self.cache.apply_completion(completion) {
                CompletionDisposition::Stored { key, content } => {
                    let tiles = self.tiles_by_key.get(&key).cloned().unwrap_or_default();
                    for tile in tiles {
                        let state = &mut self.states[tile.index()];
                        if !state.content_status.is_ready() {
                            state.content_status = ContentStatus::Ready;
                            self.events.emit(TileEvent::Ready {
                                tile,
                                content: Arc::clone(&content),
                            });
                        }
                    }
                }
                CompletionDisposition::Failed { key, error } => {
                    let tiles = self.tiles_by_key.get(&key).cloned().unwrap_or_default();
                    for tile in tiles {
                        let state = &mut self.states[tile.index()];
                        state.content_status = ContentStatus::Failed;
                        state.retry_count += 1;
                        // The cache entry died with the failure, and any pin
                        // died with the entry.
                        self.pinned.remove(&tile);
                        if state.retry_count > self.config.retry_budget {
                            warn!(%tile, %key, attempts = state.retry_count, "retry budget exhausted, giving up on tile");
                        }
                    }
                    debug!(%key, %error, "tile content failed");
                }
                CompletionDisposition::Cancelled { key } => {
                    let tiles = self.tiles_by_key.get(&key).cloned().unwrap_or_default();
                    for tile in tiles {
                        let state = &mut self.states[tile.index()];
                        if state.content_status.is_pending() {
                            state.content_status = ContentStatus::Unrequested;
                        }
                        self.pinned.remove(&tile);
                    }
                }
                CompletionDisposition::Discarded => {}
            }
        }
    }

    /// Visits one tile: classify, request or release content, recurse.
    fn visit(
        &mut self,
        id: TileId,
        metrics: TileViewMetrics,
        view: &ViewState,
        retained: &mut HashSet<TileId>,
    ) {
        let tileset = Arc::clone(&self.tileset);
        let tile = tileset.tile(id);

        {
            let state = &mut self.states[id.index()];
            state.last_visited_pass = self.pass;
            state.last_screen_space_error = metrics.screen_space_error;
        }

        if !metrics.visible {
            self.states[id.index()].mark = TraversalMark::Culled;
            // Subtree pruning: children of a culled tile are culled without
            // being visited. Their pins, if any, fall out of the retained
            // set and are released at the end of the pass.
            return;
        }

        let needs_refinement =
            metrics.screen_space_error > self.config.sse_threshold && !tile.is_leaf();

        if !needs_refinement {
            self.states[id.index()].mark = TraversalMark::Visible;
            self.ensure_content(id, retained);
            return;
        }

        self.states[id.index()].mark = TraversalMark::Refining;

        if tile.refine() == RefineMode::Add {
            // Additive refinement renders the parent alongside its children,
            // so the parent's content stays requested while children load.
            self.ensure_content(id, retained);
        }

        // Closer subtrees first. This only shapes decode submission order
        // (perceived load priority), not correctness.
        let mut ordered: Vec<(TileId, TileViewMetrics)> = tile
            .children()
            .iter()
            .map(|&child| (child, self.evaluator.evaluate(tileset.tile(child), view)))
            .collect();
        ordered.sort_by(|a, b| a.1.distance.total_cmp(&b.1.distance));

        for (child, child_metrics) in ordered {
            self.visit(child, child_metrics, view, retained);
        }

        if tile.refine() == RefineMode::Replace && self.pinned.contains(&id) {
            // No-gap rule: the superseded parent keeps its content pinned
            // until every content-bearing child has reached READY.
            if self.children_ready(id) {
                trace!(tile = %id, "children ready, releasing replaced parent");
            } else {
                retained.insert(id);
            }
        }
    }

    /// Requests and pins content for a tile that should be rendered.
    fn ensure_content(&mut self, id: TileId, retained: &mut HashSet<TileId>) {
        let tileset = Arc::clone(&self.tileset);
        let Some(key) = tileset.tile(id).content_key() else {
            return;
        };

        {
            let state = &mut self.states[id.index()];
            if state.content_status.is_failed() {
                if state.retry_count > self.config.retry_budget {
                    return;
                }
                // Re-arm on the pass after the failure; the new request
                // below gets a fresh decode job.
                debug!(tile = %id, attempt = state.retry_count + 1, "re-requesting failed tile content");
                state.content_status = ContentStatus::Unrequested;
            }
        }

        if self.states[id.index()].content_status == ContentStatus::Unrequested {
            match self.cache.request(key, &self.pool) {
                Ok(RequestOutcome::Ready(content)) => {
                    self.states[id.index()].content_status = ContentStatus::Ready;
                    self.events.emit(TileEvent::Ready { tile: id, content });
                }
                Ok(RequestOutcome::Pending(_ticket)) => {
                    // Polled next pass; the cache notifies waiters, but the
                    // traverser is not one of them.
                    self.states[id.index()].content_status = ContentStatus::Pending;
                }
                Err(PoolError::Closed) => {
                    warn!(tile = %id, "content request dropped, worker pool is shut down");
                    return;
                }
            }
        }

        if !self.pinned.contains(&id) {
            self.cache.pin(key);
            self.pinned.insert(id);
        }
        retained.insert(id);
    }

    /// True if every content-bearing child of `id` has resident content.
    fn children_ready(&self, id: TileId) -> bool {
        self.tileset.tile(id).children().iter().all(|&child| {
            match self.tileset.tile(child).content_key() {
                None => true,
                Some(_) => self.states[child.index()].content_status.is_ready(),
            }
        })
    }

    /// Unpins every tile that held a pin but was not retained this pass.
    fn release_unretained(&mut self, retained: &HashSet<TileId>) {
        let released: Vec<TileId> = self.pinned.difference(retained).copied().collect();
        for id in released {
            self.pinned.remove(&id);
            if let Some(key) = self.tileset.tile(id).content_key() {
                self.cache.unpin(key);
            }
            trace!(tile = %id, "unpinned tile leaving visible set");
        }
    }

    /// Runs one eviction pass and resets state for evicted tiles.
    fn evict(&mut self) {
        for key in self.cache.evict_if_over_budget() {
            let tiles = self.tiles_by_key.get(&key).cloned().unwrap_or_default();
            for tile in tiles {
                let state = &mut self.states[tile.index()];
                if state.content_status.is_ready() {
                    state.content_status = ContentStatus::Unrequested;
                    self.events.emit(TileEvent::Evicted { tile });
                }
            }
        }
    }

    /// Forcibly drops cached content for `key` and re-arms its tiles.
    ///
    /// Any in-flight decode for the key runs to completion but its result is
    /// discarded on arrival.
    pub fn invalidate(&mut self, key: &ContentKey) {
        self.cache.invalidate(key);
        let tiles = self.tiles_by_key.get(key).cloned().unwrap_or_default();
        for tile in tiles {
            let state = &mut self.states[tile.index()];
            if !state.content_status.is_failed() {
                state.content_status = ContentStatus::Unrequested;
            }
            self.pinned.remove(&tile);
        }
    }

    /// Returns the runtime state for a tile.
    pub fn state(&self, id: TileId) -> &TileRuntimeState {
        &self.states[id.index()]
    }

    /// Returns resident content for a tile, if any.
    pub fn content_for(&self, id: TileId) -> Option<Arc<DecodedContent>> {
        let key = self.tileset.tile(id).content_key()?;
        self.cache.peek(key)
    }

    /// Walks up from `id` and returns the closest ancestor whose content is
    /// resident - the coarser fallback a renderer shows while finer content
    /// is missing or has failed.
    pub fn nearest_ready_ancestor(&self, id: TileId) -> Option<TileId> {
        self.tileset
            .ancestors(id)
            .find(|&ancestor| self.states[ancestor.index()].content_status.is_ready())
    }

    /// Returns the number of completed passes.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Returns the tileset being traversed.
    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    /// Returns a snapshot of cache statistics.
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.stats()
    }

    /// Returns a snapshot of worker pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Shuts down the worker pool, draining in-flight work.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

impl std::fmt::Debug for TilesetTraverser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TilesetTraverser")
            .field("tiles", &self.states.len())
            .field("pass", &self.pass)
            .field("pinned", &self.pinned.len())
            .finish_non_exhaustive()
    }
}
