//! Tree configuration.

/// Construction-time settings for a [`CurveEditorTree`](crate::CurveEditorTree).
///
/// # Example
///
/// ```
/// use horizon_curve_tree::{CurveEditorTree, TreeConfig};
///
/// let tree = CurveEditorTree::with_config(
///     TreeConfig::new()
///         .initial_capacity(256)
///         .compact_on_items_changed(false),
/// );
/// assert!(!tree.config().compacts_on_items_changed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    initial_capacity: usize,
    compact_on_items_changed: bool,
    refilter_on_scope_close: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            compact_on_items_changed: true,
            refilter_on_scope_close: true,
        }
    }
}

impl TreeConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items to reserve storage for up front.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Whether storage is compacted right before `items_changed` fires.
    pub fn compact_on_items_changed(mut self, enabled: bool) -> Self {
        self.compact_on_items_changed = enabled;
        self
    }

    /// Whether closing the outermost update scope re-runs the filters when
    /// items or filters changed inside it.
    ///
    /// With this disabled the owner must call
    /// [`run_filters`](crate::CurveEditorTree::run_filters) itself.
    pub fn refilter_on_scope_close(mut self, enabled: bool) -> Self {
        self.refilter_on_scope_close = enabled;
        self
    }

    /// Reserved item capacity.
    pub fn capacity(&self) -> usize {
        self.initial_capacity
    }

    /// See [`compact_on_items_changed`](Self::compact_on_items_changed).
    pub fn compacts_on_items_changed(&self) -> bool {
        self.compact_on_items_changed
    }

    /// See [`refilter_on_scope_close`](Self::refilter_on_scope_close).
    pub fn refilters_on_scope_close(&self) -> bool {
        self.refilter_on_scope_close
    }
}
