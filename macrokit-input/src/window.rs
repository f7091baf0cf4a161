use crate::geometry::{Position, Rect};
use serde::{Deserialize, Serialize};

/// Opaque OS window identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// A point-in-time view of one top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub title: String,
    pub rect: Rect,
}

/// Best-effort window lookup.
///
/// Implementations never treat "window not found" as an error; that is a
/// normal `None` (or `false`) result. Calls are expected to complete within
/// ordinary OS call latency.
pub trait WindowResolver: Send + Sync {
    /// Look up a window by its handle.
    fn resolve_by_handle(&self, handle: WindowId) -> Option<WindowSnapshot>;

    /// Find the first visible window whose title contains the fragment
    /// (case-insensitive).
    fn resolve_by_title(&self, fragment: &str) -> Option<WindowSnapshot>;

    /// The currently focused top-level window.
    fn focused_window(&self) -> Option<WindowSnapshot>;

    /// Raise the window, restoring it first if minimized.
    fn bring_to_front(&self, handle: WindowId) -> bool;

    /// Current pointer position in screen coordinates.
    fn cursor_position(&self) -> Option<Position>;
}

/// A resolver that never finds anything.
///
/// Useful for screen-mode recording and for platforms without a window
/// backend; every lookup degrades to screen-absolute coordinates.
pub struct NullResolver;

impl WindowResolver for NullResolver {
    fn resolve_by_handle(&self, _handle: WindowId) -> Option<WindowSnapshot> {
        None
    }

    fn resolve_by_title(&self, _fragment: &str) -> Option<WindowSnapshot> {
        None
    }

    fn focused_window(&self) -> Option<WindowSnapshot> {
        None
    }

    fn bring_to_front(&self, _handle: WindowId) -> bool {
        false
    }

    fn cursor_position(&self) -> Option<Position> {
        None
    }
}
