//! Filters and per-item filter state.
//!
//! A filter is any value implementing [`TreeFilter`]. The tree only keeps a
//! weak reference to each filter, so dropping the last `Arc` removes the
//! filter from consideration at the next filter run.
//!
//! Filters are grouped into passes by [`TreeFilter::filter_pass`]. Filters in
//! the same pass are OR-combined; passes run in ascending order and AND-combine,
//! since every pass after the first only reconsiders items that survived the
//! previous ones.
//!
//! Whether an item passes a filter is decided by the item's own
//! implementation ([`TreeItemImpl::passes_filter`](crate::TreeItemImpl::passes_filter)),
//! usually by downcasting the filter to a type it understands:
//!
//! ```
//! use horizon_curve_tree::{TextFilter, TreeFilter};
//!
//! fn passes(label: &str, filter: &dyn TreeFilter) -> bool {
//!     match filter.downcast_ref::<TextFilter>() {
//!         Some(text) => text.matches(label),
//!         None => false,
//!     }
//! }
//!
//! let filter = TextFilter::new("loc rot");
//! assert!(passes("Location.X", &filter));
//! assert!(!passes("Scale.Y", &filter));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::id::TreeItemId;

/// The kind of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Free-text search, see [`TextFilter`].
    Text,
    /// A filter kind registered at runtime with [`FilterType::register_custom`].
    Custom(u32),
}

static NEXT_CUSTOM_FILTER_TYPE: AtomicU32 = AtomicU32::new(0);

impl FilterType {
    /// Allocates a new, process-unique custom filter type.
    pub fn register_custom() -> Self {
        Self::Custom(NEXT_CUSTOM_FILTER_TYPE.fetch_add(1, Ordering::Relaxed))
    }
}

/// A filter applied to the items of a curve tree.
pub trait TreeFilter: Any + Send + Sync {
    /// The kind of this filter, used by
    /// [`find_filter_by_type`](crate::CurveEditorTree::find_filter_by_type).
    fn filter_type(&self) -> FilterType;

    /// The pass this filter runs in. Lower passes run first.
    fn filter_pass(&self) -> i32 {
        0
    }
}

impl dyn TreeFilter {
    /// Downcasts to a concrete filter type.
    pub fn downcast_ref<T: TreeFilter>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// Case-insensitive free-text filter.
///
/// The filter text is split on whitespace into terms. A label matches when it
/// contains any of the terms.
#[derive(Debug, Clone, Default)]
pub struct TextFilter {
    terms: Vec<String>,
    pass: i32,
}

impl TextFilter {
    /// Creates a text filter in pass 0.
    pub fn new(text: &str) -> Self {
        Self {
            terms: text.split_whitespace().map(str::to_lowercase).collect(),
            pass: 0,
        }
    }

    /// Moves the filter to another pass.
    pub fn with_pass(mut self, pass: i32) -> Self {
        self.pass = pass;
        self
    }

    /// The lowercase search terms.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Returns `true` if the filter text had no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `label` contains any of the terms.
    pub fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.terms.iter().any(|term| label.contains(term.as_str()))
    }
}

impl TreeFilter for TextFilter {
    fn filter_type(&self) -> FilterType {
        FilterType::Text
    }

    fn filter_pass(&self) -> i32 {
        self.pass
    }
}

/// Filter state of a single item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterState {
    /// Not evaluated, or filtering is disabled. Items are shown.
    #[default]
    Inactive,
    /// Evaluated and rejected. Items are hidden.
    NoMatch,
    /// Matched a filter directly.
    Match,
    /// Kept because a descendant matched.
    ImplicitParent,
    /// Kept because an ancestor matched.
    ImplicitChild,
}

impl FilterState {
    /// Anything but [`FilterState::NoMatch`].
    pub fn is_visible(self) -> bool {
        self != Self::NoMatch
    }

    /// [`FilterState::ImplicitParent`] or [`FilterState::ImplicitChild`].
    pub fn is_implicit(self) -> bool {
        matches!(self, Self::ImplicitParent | Self::ImplicitChild)
    }
}

/// Filter state of every item, as produced by the last filter run.
///
/// While the table is inactive every lookup reports
/// [`FilterState::Inactive`]. While active, items without a recorded state
/// report [`FilterState::NoMatch`].
#[derive(Debug, Clone, Default)]
pub struct FilterStates {
    states: HashMap<TreeItemId, FilterState>,
    num_matched: usize,
    num_matched_implicitly: usize,
    active: bool,
}

impl FilterStates {
    /// The state of `id`.
    pub fn get(&self, id: TreeItemId) -> FilterState {
        if !self.active {
            return FilterState::Inactive;
        }
        self.states.get(&id).copied().unwrap_or(FilterState::NoMatch)
    }

    /// Whether filtering is in effect.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of items in [`FilterState::Match`].
    pub fn num_matched(&self) -> usize {
        self.num_matched
    }

    /// Number of items kept implicitly, as parent or child of a match.
    pub fn num_matched_implicitly(&self) -> usize {
        self.num_matched_implicitly
    }

    pub(crate) fn set(&mut self, id: TreeItemId, state: FilterState) {
        if let Some(previous) = self.states.insert(id, state) {
            self.uncount(previous);
        }
        self.count(state);
    }

    pub(crate) fn reset(&mut self) {
        self.states.clear();
        self.num_matched = 0;
        self.num_matched_implicitly = 0;
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    fn count(&mut self, state: FilterState) {
        match state {
            FilterState::Match => self.num_matched += 1,
            FilterState::ImplicitParent | FilterState::ImplicitChild => self.num_matched_implicitly += 1,
            FilterState::Inactive | FilterState::NoMatch => {}
        }
    }

    fn uncount(&mut self, state: FilterState) {
        match state {
            FilterState::Match => self.num_matched -= 1,
            FilterState::ImplicitParent | FilterState::ImplicitChild => self.num_matched_implicitly -= 1,
            FilterState::Inactive | FilterState::NoMatch => {}
        }
    }
}
