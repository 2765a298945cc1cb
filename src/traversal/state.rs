//! Per-tile runtime state.

/// Content lifecycle of a tile within request cycles.
///
/// Within one cycle the status only moves forward: `Unrequested → Pending →
/// {Ready | Failed}`. A failed tile is re-armed back to `Unrequested` on a
/// later pass while its retry budget lasts; an evicted tile likewise returns
/// to `Unrequested`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentStatus {
    /// No request has been issued (or the last result was evicted).
    #[default]
    Unrequested,

    /// A decode job is in flight.
    Pending,

    /// Decoded content is resident in the cache.
    Ready,

    /// The last request failed.
    Failed,
}

impl ContentStatus {
    /// Returns true if content is resident.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if a request is in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the last request failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Visibility classification assigned during a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraversalMark {
    /// Not reached by any pass yet.
    #[default]
    Unvisited,

    /// Outside the view; its subtree was pruned.
    Culled,

    /// In the view and rendered at its own detail level.
    Visible,

    /// In the view but refined into its children.
    Refining,
}

/// Mutable per-tile fields owned exclusively by the traverser.
///
/// Tiles themselves are immutable after tree construction; everything that
/// changes at runtime lives here, indexed by tile id.
#[derive(Debug, Clone, Default)]
pub struct TileRuntimeState {
    /// Classification from the most recent pass that reached this tile.
    pub mark: TraversalMark,

    /// Content lifecycle status.
    pub content_status: ContentStatus,

    /// Screen-space error computed the last time the tile was visited.
    pub last_screen_space_error: f64,

    /// Pass counter value when the tile was last visited.
    pub last_visited_pass: u64,

    /// Failed request attempts so far.
    pub retry_count: u32,
}

impl TileRuntimeState {
    /// Returns true if the tile was classified visible (rendered or
    /// refining) in the given pass.
    pub fn visible_in(&self, pass: u64) -> bool {
        self.last_visited_pass == pass
            && matches!(self.mark, TraversalMark::Visible | TraversalMark::Refining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = TileRuntimeState::default();
        assert_eq!(state.mark, TraversalMark::Unvisited);
        assert_eq!(state.content_status, ContentStatus::Unrequested);
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn test_status_predicates() {
        assert!(ContentStatus::Ready.is_ready());
        assert!(ContentStatus::Pending.is_pending());
        assert!(ContentStatus::Failed.is_failed());
        assert!(!ContentStatus::Unrequested.is_ready());
    }

    #[test]
    fn test_visible_in_checks_pass_and_mark() {
        let mut state = TileRuntimeState {
            mark: TraversalMark::Visible,
            last_visited_pass: 3,
            ..Default::default()
        };
        assert!(state.visible_in(3));
        assert!(!state.visible_in(4));

        state.mark = TraversalMark::Culled;
        assert!(!state.visible_in(3));
    }
}
