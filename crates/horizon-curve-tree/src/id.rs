//! Stable identifiers for tree items.

use std::fmt;

/// Identifier of an item in a [`CurveEditorTree`](crate::CurveEditorTree).
///
/// Ids are handed out in increasing order starting at 1 and are never reused
/// by the same tree, even after the item they named has been removed. This
/// makes them safe to hold onto from outside the tree: a stale id simply
/// fails to resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeItemId(u32);

impl TreeItemId {
    /// The invalid id. No item ever receives it.
    pub const INVALID: Self = Self(0);

    /// Wraps a raw id value.
    ///
    /// Useful for diagnostics and for restoring ids recorded elsewhere; the
    /// resulting id only resolves if the tree actually issued it.
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// The raw id value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` for every id other than [`TreeItemId::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The id after this one, or `None` once the id space is used up.
    pub(crate) fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for TreeItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
