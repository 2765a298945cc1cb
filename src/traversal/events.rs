//! Tile lifecycle events for the rendering layer.

use std::sync::Arc;

use tracing::debug;

use crate::content::DecodedContent;
use crate::tileset::TileId;

/// Event emitted by the traverser as tile content comes and goes.
#[derive(Debug, Clone)]
pub enum TileEvent {
    /// Decoded content for the tile became available.
    Ready {
        tile: TileId,
        content: Arc<DecodedContent>,
    },

    /// The tile's content was evicted from the cache.
    Evicted { tile: TileId },
}

impl TileEvent {
    /// Returns the tile the event concerns.
    pub fn tile(&self) -> TileId {
        match self {
            Self::Ready { tile, .. } => *tile,
            Self::Evicted { tile } => *tile,
        }
    }
}

/// Sink for tile events.
///
/// A rendering layer subscribes by supplying an implementation; the
/// traverser calls it synchronously on the control thread, so
/// implementations should hand work off rather than block.
pub trait TileEventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: TileEvent);
}

/// Sink that drops every event. Useful for headless operation and tests.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl TileEventSink for NullEventSink {
    fn emit(&self, _event: TileEvent) {}
}

/// Sink that logs events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl TileEventSink for TracingEventSink {
    fn emit(&self, event: TileEvent) {
        match event {
            TileEvent::Ready { tile, content } => {
                debug!(%tile, bytes = content.byte_size(), "tile ready");
            }
            TileEvent::Evicted { tile } => {
                debug!(%tile, "tile evicted");
            }
        }
    }
}
