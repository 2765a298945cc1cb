//! The tile tree data model.
//!
//! A [`Tileset`] is an arena of [`Tile`] nodes built once when the dataset is
//! parsed and immutable in topology afterwards. Parent and child references
//! are [`TileId`] indices into the arena rather than owning pointers, so the
//! tree has no reference cycles and upward walks stay cheap.

mod tile;
mod tree;

pub use tile::{ContentKey, RefineMode, Tile, TileId};
pub use tree::{AncestorIter, Tileset};
