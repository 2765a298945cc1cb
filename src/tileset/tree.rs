//! Tileset arena and construction.

use std::collections::HashMap;

use tracing::warn;

use super::tile::{ContentKey, RefineMode, Tile, TileId};

/// An arena of tiles forming one or more trees.
///
/// The tileset is built once, when the dataset's layout is parsed, and its
/// topology never changes afterwards. Tiles reference each other by
/// [`TileId`] index; the arena owns every node.
#[derive(Debug, Default)]
pub struct Tileset {
    tiles: Vec<Tile>,
    roots: Vec<TileId>,
}

impl Tileset {
    /// Creates an empty tileset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root tile and returns its id.
    pub fn add_root(
        &mut self,
        content_key: Option<ContentKey>,
        geometric_error: f64,
        refine: RefineMode,
    ) -> TileId {
        let id = TileId::new(self.tiles.len());
        self.tiles
            .push(Tile::new(id, content_key, geometric_error, refine, None));
        self.roots.push(id);
        id
    }

    /// Adds a child under `parent` and returns the child's id.
    ///
    /// A child whose geometric error exceeds its parent's is accepted but
    /// logged, since it breaks the coarse-to-fine ordering refinement relies
    /// on.
    pub fn add_child(
        &mut self,
        parent: TileId,
        content_key: Option<ContentKey>,
        geometric_error: f64,
        refine: RefineMode,
    ) -> TileId {
        let parent_error = self.tiles[parent.index()].geometric_error();
        if geometric_error > parent_error {
            warn!(
                %parent,
                parent_error,
                child_error = geometric_error,
                "child tile has larger geometric error than its parent"
            );
        }

        let id = TileId::new(self.tiles.len());
        self.tiles
            .push(Tile::new(id, content_key, geometric_error, refine, Some(parent)));
        self.tiles[parent.index()].push_child(id);
        id
    }

    /// Returns the tile with the given id.
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.index()]
    }

    /// Returns the root tile ids in insertion order.
    pub fn roots(&self) -> &[TileId] {
        &self.roots
    }

    /// Returns the number of tiles in the arena.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if the tileset holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterates over all tiles in arena order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Walks from `id` toward the root, yielding each ancestor in order.
    ///
    /// The tile itself is not yielded.
    pub fn ancestors(&self, id: TileId) -> AncestorIter<'_> {
        AncestorIter {
            tileset: self,
            next: self.tiles[id.index()].parent(),
        }
    }

    /// Builds an index from content key to the tiles bearing that key.
    ///
    /// Several tiles may share one key; their content is then fetched once
    /// and cached under a single entry.
    pub fn tiles_by_key(&self) -> HashMap<ContentKey, Vec<TileId>> {
        let mut index: HashMap<ContentKey, Vec<TileId>> = HashMap::new();
        for tile in &self.tiles {
            if let Some(key) = tile.content_key() {
                index.entry(key.clone()).or_default().push(tile.id());
            }
        }
        index
    }
}

/// Iterator over a tile's ancestors, nearest first.
pub struct AncestorIter<'a> {
    tileset: &'a Tileset,
    next: Option<TileId>,
}

impl Iterator for AncestorIter<'_> {
    type Item = TileId;

    fn next(&mut self) -> Option<TileId> {
        let current = self.next?;
        self.next = self.tileset.tile(current).parent();
        Some(current)
    }
}
