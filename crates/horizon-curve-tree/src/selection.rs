//! Selection state and implicit-child expansion.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use horizon_curve_tree_core::ensure_always;

use crate::filter::{FilterState, FilterStates};
use crate::id::TreeItemId;
use crate::store::ItemStore;

/// Selection state of a single item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SelectionState {
    /// Not selected.
    #[default]
    None,
    /// Selected directly.
    Explicit,
    /// Selected because an ancestor was selected.
    ImplicitChild,
}

impl SelectionState {
    /// Anything but [`SelectionState::None`].
    pub fn is_selected(self) -> bool {
        self != Self::None
    }
}

/// Selection table. Absent ids are [`SelectionState::None`].
pub type Selection = HashMap<TreeItemId, SelectionState>;

/// Expands a direct selection into the full selection table.
///
/// Every id in `direct` becomes [`SelectionState::Explicit`]. Children of
/// processed items whose filter state is not [`FilterState::NoMatch`] become
/// [`SelectionState::ImplicitChild`], recursively. An item reachable both ways
/// stays explicit and is expanded once.
///
/// Returns the selection together with the selected ids in visiting order.
pub(crate) fn expand_selection(
    direct: Vec<TreeItemId>,
    items: &ItemStore,
    filter_states: &FilterStates,
) -> (Selection, Vec<TreeItemId>) {
    let num_direct = direct.len();
    let mut work = direct;
    let mut selection = Selection::with_capacity(work.len());
    let mut order = Vec::with_capacity(work.len());

    let mut index = 0;
    while index < work.len() {
        let id = work[index];
        let state = if index < num_direct {
            SelectionState::Explicit
        } else {
            SelectionState::ImplicitChild
        };
        index += 1;

        let Some(item) = items.get(id) else {
            ensure_always!(false, "selected tree item {id} does not exist");
            continue;
        };

        match selection.entry(id) {
            Entry::Occupied(_) => continue,
            Entry::Vacant(slot) => {
                slot.insert(state);
            }
        }
        order.push(id);

        work.extend(
            item.children()
                .iter()
                .copied()
                .filter(|child| filter_states.get(*child) != FilterState::NoMatch),
        );
    }

    (selection, order)
}
