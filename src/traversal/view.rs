//! View state and the visibility collaborator seam.

use crate::tileset::Tile;

/// Viewpoint snapshot for one update pass.
///
/// The core does no geometry itself; these fields are interpreted solely by
/// the [`ViewEvaluator`] supplied by the camera/viewport layer.
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Eye position in tileset coordinates.
    pub eye: [f64; 3],

    /// Vertical viewport resolution in pixels.
    pub viewport_height: f64,

    /// Projection-dependent scale applied when converting geometric error to
    /// screen-space error.
    pub sse_scale: f64,
}

impl ViewState {
    /// Creates a view state for the given eye position with unit scaling.
    pub fn new(eye: [f64; 3]) -> Self {
        Self {
            eye,
            viewport_height: 1080.0,
            sse_scale: 1.0,
        }
    }
}

/// Per-tile answer from the visibility collaborator.
#[derive(Debug, Clone, Copy)]
pub struct TileViewMetrics {
    /// Whether the tile intersects the current view.
    pub visible: bool,

    /// Screen-space error if the tile is rendered at its own detail level.
    /// Meaningless when not visible.
    pub screen_space_error: f64,

    /// Distance from the viewpoint, used to traverse closer siblings first.
    pub distance: f64,
}

impl TileViewMetrics {
    /// Metrics for a tile outside the view.
    pub fn culled() -> Self {
        Self {
            visible: false,
            screen_space_error: 0.0,
            distance: f64::MAX,
        }
    }

    /// Metrics for a visible tile.
    pub fn visible(screen_space_error: f64, distance: f64) -> Self {
        Self {
            visible: true,
            screen_space_error,
            distance,
        }
    }
}

/// Collaborator computing visibility and screen-space error for a tile.
///
/// Called once per visited tile per pass, on the control thread. The
/// implementation must return a definite answer; error handling for broken
/// camera state belongs to the caller, not this seam.
pub trait ViewEvaluator: Send + Sync + 'static {
    /// Evaluates `tile` against the current view.
    fn evaluate(&self, tile: &Tile, view: &ViewState) -> TileViewMetrics;
}
