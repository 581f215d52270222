//! Error types for the curve tree.

use crate::id::TreeItemId;

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors returned by fallible tree operations.
///
/// Only recoverable misuse is reported here. Contract violations such as
/// selecting an item that does not exist go through
/// [`ensure_always!`](horizon_curve_tree_core::ensure_always) instead, and
/// routine absence (expired filters, stale ids passed to lookups) is not an
/// error at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// The requested parent item is not in the tree.
    #[error("parent item {0} does not exist")]
    ParentNotFound(TreeItemId),

    /// The requested item is not in the tree.
    #[error("tree item {0} does not exist")]
    ItemNotFound(TreeItemId),

    /// Every item id has been handed out. Ids are never reused.
    #[error("tree item ids are exhausted")]
    IdsExhausted,
}
