//! Tileset traversal and refinement.
//!
//! Each update pass the [`TilesetTraverser`] walks the tile tree from its
//! roots and decides, per tile, whether it is visible, whether its detail
//! level suffices, and whether its content should be requested, kept, or
//! released. Visibility and screen-space error come from the
//! [`ViewEvaluator`] collaborator; decoded content moves through the cache
//! and worker pool the traverser owns.

mod config;
mod events;
mod state;
mod traverser;
mod view;

pub use config::{TraversalConfig, DEFAULT_RETRY_BUDGET, DEFAULT_SSE_THRESHOLD};
pub use events::{NullEventSink, TileEvent, TileEventSink, TracingEventSink};
pub use state::{ContentStatus, TileRuntimeState, TraversalMark};
pub use traverser::TilesetTraverser;
pub use view::{TileViewMetrics, ViewEvaluator, ViewState};
