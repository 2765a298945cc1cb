//! Tile node and identifier types.

use std::fmt;

/// Index of a tile within its [`Tileset`](super::Tileset) arena.
///
/// Tile ids are stable for the lifetime of the tileset and double as the
/// non-owning parent/child references between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u32);

impl TileId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Returns the arena index of this tile.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile-{}", self.0)
    }
}

/// Key identifying a decodable content payload.
///
/// Keys can be constructed from meaningful data such as a content URI or a
/// dataset-relative path. Two tiles may share a key, in which case their
/// content is fetched and decoded once and cached under that key.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct ContentKey(String);

impl ContentKey {
    /// Creates a new content key with the given string value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the string value of this key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey({})", self.0)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a tile's content relates to its children's content when refining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefineMode {
    /// The tile's content is rendered together with its children's.
    Add,

    /// Either the tile's content or its children's is rendered, never both.
    /// The parent's content acts as a fallback until every child is ready.
    #[default]
    Replace,
}

/// A node in the tile tree.
///
/// Tiles are constructed through [`Tileset`](super::Tileset) builder methods
/// and are immutable afterwards; all mutable per-tile state lives in the
/// traverser's runtime state table, not here.
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    content_key: Option<ContentKey>,
    geometric_error: f64,
    refine: RefineMode,
    parent: Option<TileId>,
    children: Vec<TileId>,
}

impl Tile {
    pub(crate) fn new(
        id: TileId,
        content_key: Option<ContentKey>,
        geometric_error: f64,
        refine: RefineMode,
        parent: Option<TileId>,
    ) -> Self {
        Self {
            id,
            content_key,
            geometric_error,
            refine,
            parent,
            children: Vec::new(),
        }
    }

    pub(crate) fn push_child(&mut self, child: TileId) {
        self.children.push(child);
    }

    /// Returns this tile's id.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Returns the content key, or `None` for tiles with no content.
    pub fn content_key(&self) -> Option<&ContentKey> {
        self.content_key.as_ref()
    }

    /// Returns the geometric error of this tile.
    ///
    /// Non-negative, and decreases toward the leaves of the tree.
    pub fn geometric_error(&self) -> f64 {
        self.geometric_error
    }

    /// Returns the refinement mode.
    pub fn refine(&self) -> RefineMode {
        self.refine
    }

    /// Returns the parent tile id, or `None` for a root.
    pub fn parent(&self) -> Option<TileId> {
        self.parent
    }

    /// Returns the ordered list of child tile ids.
    pub fn children(&self) -> &[TileId] {
        &self.children
    }

    /// Returns true if this tile has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
