//! The curve editor tree.
//!
//! [`CurveEditorTree`] owns the items, the weak filter list, the filter state
//! table and the selection table. All operations take `&self`; state lives
//! behind a lock that is never held while calling out to item
//! implementations, filters, sort predicates, the curve editor context, or
//! notification handlers. Handlers may therefore keep an `Arc` to the tree
//! and read from it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_curve_tree::{
//!     CurveEditor, CurveEditorTree, CurveModel, FilterState, TextFilter, TreeFilter, TreeItemImpl,
//! };
//!
//! struct Channel(&'static str);
//!
//! impl TreeItemImpl for Channel {
//!     fn create_curve_models(&self, _out: &mut Vec<Box<dyn CurveModel>>) {}
//!
//!     fn passes_filter(&self, filter: &dyn TreeFilter) -> bool {
//!         filter.downcast_ref::<TextFilter>().is_some_and(|text| text.matches(self.0))
//!     }
//! }
//!
//! let tree = CurveEditorTree::new();
//! let transform = tree.add_item_with(None, Arc::new(Channel("Transform"))).unwrap();
//! let x = tree.add_item_with(Some(transform), Arc::new(Channel("Location.X"))).unwrap();
//!
//! let filter: Arc<dyn TreeFilter> = Arc::new(TextFilter::new("location"));
//! tree.add_filter(Arc::downgrade(&filter));
//!
//! assert_eq!(tree.filter_state(x), FilterState::Match);
//! assert_eq!(tree.filter_state(transform), FilterState::ImplicitParent);
//!
//! let mut editor = CurveEditor::new();
//! tree.set_direct_selection(vec![transform], &mut editor);
//! assert!(tree.is_selected(x));
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use horizon_curve_tree_core::logging::{span_names, targets};
use horizon_curve_tree_core::{ensure_always, PerfSpan, ThreadAffinity};
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::TreeConfig;
use crate::curve::{CurveEditorContext, CurveModelId};
use crate::error::{Result, TreeError};
use crate::events::{TreeEventGuard, TreeEvents};
use crate::filter::{FilterState, FilterStates, FilterType, TreeFilter};
use crate::id::TreeItemId;
use crate::item::{self, SortPredicate, SortedChildren, TreeItem, TreeItemImpl};
use crate::selection::{self, Selection, SelectionState};
use crate::store::ItemStore;

struct TreeState {
    items: ItemStore,
    root_items: SortedChildren,
    next_id: TreeItemId,
    filters: Vec<Weak<dyn TreeFilter>>,
    filter_states: FilterStates,
    selection: Selection,
    sort_predicate: Option<SortPredicate>,
}

impl TreeState {
    fn container(&self, parent: Option<TreeItemId>) -> Option<&SortedChildren> {
        match parent {
            None => Some(&self.root_items),
            Some(id) => self.items.get(id).map(TreeItem::sorted_children),
        }
    }

    fn container_mut(&mut self, parent: Option<TreeItemId>) -> Option<&mut SortedChildren> {
        match parent {
            None => Some(&mut self.root_items),
            Some(id) => self.items.get_mut(id).map(TreeItem::children_mut),
        }
    }
}

/// A tree of curve-bearing items with filtering and selection.
pub struct CurveEditorTree {
    state: RwLock<TreeState>,
    events: TreeEvents,
    config: TreeConfig,
    affinity: ThreadAffinity,
}

static_assertions::assert_impl_all!(CurveEditorTree: Send, Sync);

impl Default for CurveEditorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CurveEditorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("CurveEditorTree")
            .field("items", &state.items.len())
            .field("roots", &state.root_items.len())
            .field("filters", &state.filters.len())
            .field("selected", &state.selection.len())
            .field("events", &self.events)
            .finish()
    }
}

impl CurveEditorTree {
    /// Creates an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    /// Creates an empty tree.
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            state: RwLock::new(TreeState {
                items: ItemStore::with_capacity(config.capacity()),
                root_items: SortedChildren::default(),
                next_id: TreeItemId::from_raw(1),
                filters: Vec::new(),
                filter_states: FilterStates::default(),
                selection: Selection::new(),
                sort_predicate: None,
            }),
            events: TreeEvents::default(),
            config,
            affinity: ThreadAffinity::current(),
        }
    }

    /// The configuration the tree was created with.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The tree's notifications.
    pub fn events(&self) -> &TreeEvents {
        &self.events
    }

    /// Opens an update scope. Notifications are deferred until the outermost
    /// scope closes.
    pub fn scoped_update(&self) -> TreeEventGuard<'_> {
        TreeEventGuard::new(self)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Adds an item under `parent`, or as a root item for `None`.
    ///
    /// The new item has no implementation yet. Attach one inside the same
    /// update scope, or use [`add_item_with`](Self::add_item_with), so the
    /// re-filter on scope close sees it.
    pub fn add_item(&self, parent: Option<TreeItemId>) -> Result<TreeItemId> {
        self.affinity.debug_check("add_item");
        let _guard = self.scoped_update();

        let mut state = self.state.write();
        let id = state.next_id;
        let Some(next_id) = id.next() else {
            drop(state);
            ensure_always!(false, "tree item ids are exhausted after {id}");
            return Err(TreeError::IdsExhausted);
        };
        match parent {
            Some(parent_id) => state
                .items
                .get_mut(parent_id)
                .ok_or(TreeError::ParentNotFound(parent_id))?
                .children_mut()
                .push(id),
            None => state.root_items.push(id),
        }
        state.items.insert(TreeItem::new(id, parent));
        state.next_id = next_id;
        drop(state);

        self.events.items_changed.bump();
        tracing::debug!(target: targets::TREE, %id, parent = ?parent, "item added");
        Ok(id)
    }

    /// Adds an item that keeps `item` alive.
    pub fn add_item_with(&self, parent: Option<TreeItemId>, item: Arc<dyn TreeItemImpl>) -> Result<TreeItemId> {
        let _guard = self.scoped_update();
        let id = self.add_item(parent)?;
        self.set_strong_item(id, item)?;
        Ok(id)
    }

    /// Adds an item that references `item` without keeping it alive.
    pub fn add_item_weak(&self, parent: Option<TreeItemId>, item: Weak<dyn TreeItemImpl>) -> Result<TreeItemId> {
        let _guard = self.scoped_update();
        let id = self.add_item(parent)?;
        self.set_weak_item(id, item)?;
        Ok(id)
    }

    /// Sets a strong item implementation on an existing item.
    ///
    /// Counts as an item change, so active filters are re-run when the
    /// outermost update scope closes.
    pub fn set_strong_item(&self, id: TreeItemId, item: Arc<dyn TreeItemImpl>) -> Result<()> {
        let _guard = self.scoped_update();
        self.state
            .write()
            .items
            .get_mut(id)
            .ok_or(TreeError::ItemNotFound(id))?
            .set_strong_item(item);
        self.events.items_changed.bump();
        Ok(())
    }

    /// Sets a weak item implementation on an existing item.
    pub fn set_weak_item(&self, id: TreeItemId, item: Weak<dyn TreeItemImpl>) -> Result<()> {
        let _guard = self.scoped_update();
        self.state
            .write()
            .items
            .get_mut(id)
            .ok_or(TreeError::ItemNotFound(id))?
            .set_weak_item(item);
        self.events.items_changed.bump();
        Ok(())
    }

    /// Removes an item and all of its descendants.
    ///
    /// The curves of every removed item are destroyed through `context`
    /// before any item is erased. Removed items also leave the selection.
    /// Unknown ids are ignored.
    pub fn remove_item(&self, id: TreeItemId, context: &mut dyn CurveEditorContext) {
        self.affinity.debug_check("remove_item");
        let _guard = self.scoped_update();

        // Pre-order: every item comes before its descendants.
        let mut doomed: Vec<(TreeItemId, Vec<CurveModelId>)> = {
            let state = self.state.read();
            if !state.items.contains(id) {
                return;
            }
            let mut doomed = Vec::new();
            let mut stack = vec![id];
            while let Some(next) = stack.pop() {
                if let Some(item) = state.items.get(next) {
                    doomed.push((next, item.curves().to_vec()));
                    stack.extend(item.children().iter().rev());
                }
            }
            doomed
        };

        for (_, curves) in &mut doomed {
            item::destroy_curves(curves, context);
        }

        let mut state = self.state.write();
        let parent = state.items.get(id).and_then(TreeItem::parent_id);
        if let Some(container) = state.container_mut(parent) {
            container.remove(id);
        }
        for (doomed_id, _) in doomed.iter().rev() {
            if state.items.remove(*doomed_id).is_some() {
                self.events.items_changed.bump();
            }
            if state.selection.remove(doomed_id).is_some() {
                self.events.selection_changed.bump();
            }
        }
        drop(state);

        tracing::debug!(target: targets::TREE, %id, removed = doomed.len(), "item removed");
    }

    /// Returns the item with the given id.
    ///
    /// The returned guard holds the tree's read lock; drop it before calling
    /// any mutating tree method.
    ///
    /// # Panics
    ///
    /// Panics if the item does not exist. Use [`find_item`](Self::find_item)
    /// when the id may be stale.
    pub fn get_item(&self, id: TreeItemId) -> MappedRwLockReadGuard<'_, TreeItem> {
        RwLockReadGuard::map(self.state.read(), |state| {
            state
                .items
                .get(id)
                .unwrap_or_else(|| panic!("tree item {id} does not exist"))
        })
    }

    /// Returns the item with the given id, if it exists.
    ///
    /// The returned guard holds the tree's read lock; drop it before calling
    /// any mutating tree method.
    pub fn find_item(&self, id: TreeItemId) -> Option<MappedRwLockReadGuard<'_, TreeItem>> {
        RwLockReadGuard::try_map(self.state.read(), |state| state.items.get(id)).ok()
    }

    /// Mutable access to an item.
    ///
    /// Curves are managed through the tree instead, see
    /// [`get_or_create_curves`](Self::get_or_create_curves).
    ///
    /// The returned guard holds the tree's write lock; drop it before calling
    /// any other tree method.
    pub fn find_item_mut(&self, id: TreeItemId) -> Option<MappedRwLockWriteGuard<'_, TreeItem>> {
        RwLockWriteGuard::try_map(self.state.write(), |state| state.items.get_mut(id)).ok()
    }

    /// Returns `true` if the item exists.
    pub fn contains(&self, id: TreeItemId) -> bool {
        self.state.read().items.contains(id)
    }

    /// Number of items in the tree.
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    /// Returns `true` if the tree has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root item ids in their current order.
    pub fn root_items(&self) -> Vec<TreeItemId> {
        self.state.read().root_items.ids().to_vec()
    }

    /// Child ids of an item in their current order.
    pub fn children(&self, id: TreeItemId) -> Result<Vec<TreeItemId>> {
        let state = self.state.read();
        let item = state.items.get(id).ok_or(TreeError::ItemNotFound(id))?;
        Ok(item.children().to_vec())
    }

    /// Ids of every item, in insertion order.
    pub fn all_item_ids(&self) -> Vec<TreeItemId> {
        self.state.read().items.iter().map(TreeItem::id).collect()
    }

    /// Number of storage slots left vacant by removals since the last compaction.
    pub fn vacant_slots(&self) -> usize {
        self.state.read().items.vacant_slots()
    }

    /// Reclaims storage left by removed items.
    ///
    /// Must not be called while an update scope is open; the tree compacts
    /// itself when the outermost scope closes after items changed.
    pub fn compact(&self) {
        if !ensure_always!(
            self.events.update_depth() == 0,
            "compact() called while {} update scope(s) are open",
            self.events.update_depth()
        ) {
            return;
        }
        let mut state = self.state.write();
        let vacant = state.items.vacant_slots();
        state.items.compact();
        if vacant > 0 {
            tracing::trace!(target: targets::TREE, vacant, "compacted item storage");
        }
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Installs the ordering used by [`sorted_children`](Self::sorted_children)
    /// and [`sort_tree_items`](Self::sort_tree_items).
    ///
    /// Without a predicate, children keep insertion order.
    pub fn set_sort_predicate<F>(&self, predicate: F)
    where
        F: Fn(&dyn TreeItemImpl, &dyn TreeItemImpl) -> Ordering + Send + Sync + 'static,
    {
        self.state.write().sort_predicate = Some(Arc::new(predicate));
    }

    /// Children of `parent` (roots for `None`), sorting them first if items
    /// were added since the last sort.
    pub fn sorted_children(&self, parent: Option<TreeItemId>) -> Result<Vec<TreeItemId>> {
        self.sort_container(parent)?;
        let state = self.state.read();
        let container = state
            .container(parent)
            .ok_or(TreeError::ItemNotFound(parent.unwrap_or_default()))?;
        Ok(container.ids().to_vec())
    }

    /// Sorts every child list that has pending additions.
    pub fn sort_tree_items(&self) {
        let dirty: Vec<Option<TreeItemId>> = {
            let state = self.state.read();
            let roots = state.root_items.requires_sort().then_some(None);
            roots
                .into_iter()
                .chain(
                    state
                        .items
                        .iter()
                        .filter(|item| item.sorted_children().requires_sort())
                        .map(|item| Some(item.id())),
                )
                .collect()
        };
        for parent in dirty {
            if let Err(error) = self.sort_container(parent) {
                tracing::debug!(target: targets::TREE, %error, "skipped sorting");
            }
        }
    }

    fn sort_container(&self, parent: Option<TreeItemId>) -> Result<()> {
        let missing = || TreeError::ItemNotFound(parent.unwrap_or_default());

        let (mut entries, predicate) = {
            let state = self.state.read();
            let container = state.container(parent).ok_or_else(missing)?;
            if !container.requires_sort() {
                return Ok(());
            }
            let entries: Vec<(TreeItemId, Option<Arc<dyn TreeItemImpl>>)> = container
                .ids()
                .iter()
                .map(|id| (*id, state.items.get(*id).and_then(TreeItem::item)))
                .collect();
            (entries, state.sort_predicate.clone())
        };

        let Some(predicate) = predicate else {
            self.state.write().container_mut(parent).ok_or_else(missing)?.mark_sorted();
            return Ok(());
        };

        entries.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) => predicate(a.as_ref(), b.as_ref()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        self.state
            .write()
            .container_mut(parent)
            .ok_or_else(missing)?
            .set_sorted(entries.into_iter().map(|(id, _)| id).collect());
        Ok(())
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Recomputes the filter state of every item.
    ///
    /// Expired filters are pruned. Live filters are grouped by pass; passes
    /// run in ascending order, the first over every item and each later one
    /// only over items that survived so far. Without live filters every item
    /// reports [`FilterState::Inactive`].
    pub fn run_filters(&self) {
        self.affinity.debug_check("run_filters");
        let _guard = self.scoped_update();
        let _perf = PerfSpan::new(span_names::FILTER_RUN);

        let (mut filter_states, passes, snapshot) = {
            let mut state = self.state.write();
            let mut filter_states = std::mem::take(&mut state.filter_states);
            filter_states.reset();
            filter_states.deactivate();

            let mut passes: BTreeMap<i32, Vec<Arc<dyn TreeFilter>>> = BTreeMap::new();
            let mut pruned = 0usize;
            for index in (0..state.filters.len()).rev() {
                match state.filters[index].upgrade() {
                    Some(filter) => passes.entry(filter.filter_pass()).or_default().push(filter),
                    None => {
                        state.filters.swap_remove(index);
                        pruned += 1;
                    }
                }
            }
            if pruned > 0 {
                tracing::debug!(target: targets::FILTER, pruned, "pruned expired filters");
            }
            let snapshot = (!passes.is_empty()).then(|| FilterSnapshot::capture(&state));
            (filter_states, passes, snapshot)
        };

        // Inactive for the first pass so every item is considered.
        if let Some(snapshot) = snapshot {
            for filters in passes.values() {
                snapshot.perform_filter_pass(&mut filter_states, filters, &snapshot.roots, FilterState::NoMatch);
                // Later passes only reconsider items that matched in some way.
                filter_states.activate();
            }
        }

        tracing::trace!(
            target: targets::FILTER,
            passes = passes.len(),
            matched = filter_states.num_matched(),
            implicit = filter_states.num_matched_implicitly(),
            "filters run"
        );
        self.state.write().filter_states = filter_states;

        self.events.items_changed.bump();
        self.events.filters_changed.bump();
    }

    /// Adds a filter. The tree only holds it weakly.
    ///
    /// Always counts as a filter change, even if the filter was already
    /// present, so the tree is re-filtered.
    pub fn add_filter(&self, filter: Weak<dyn TreeFilter>) {
        self.affinity.debug_check("add_filter");
        let _guard = self.scoped_update();
        {
            let mut state = self.state.write();
            if !state.filters.iter().any(|existing| Weak::ptr_eq(existing, &filter)) {
                state.filters.push(filter);
            }
        }
        self.events.filters_changed.bump();
    }

    /// Removes a filter. Always counts as a filter change.
    pub fn remove_filter(&self, filter: &Weak<dyn TreeFilter>) {
        self.affinity.debug_check("remove_filter");
        let _guard = self.scoped_update();
        self.state.write().filters.retain(|existing| !Weak::ptr_eq(existing, filter));
        self.events.filters_changed.bump();
    }

    /// Removes every filter.
    pub fn clear_filters(&self) {
        self.affinity.debug_check("clear_filters");
        let _guard = self.scoped_update();
        self.state.write().filters.clear();
        self.events.filters_changed.bump();
    }

    /// The filters that are still alive.
    pub fn filters(&self) -> Vec<Arc<dyn TreeFilter>> {
        self.state.read().filters.iter().filter_map(Weak::upgrade).collect()
    }

    /// The first live filter of the given type.
    pub fn find_filter_by_type(&self, filter_type: FilterType) -> Option<Arc<dyn TreeFilter>> {
        self.state
            .read()
            .filters
            .iter()
            .filter_map(Weak::upgrade)
            .find(|filter| filter.filter_type() == filter_type)
    }

    /// A copy of the filter state table from the last filter run.
    pub fn filter_states(&self) -> FilterStates {
        self.state.read().filter_states.clone()
    }

    /// The filter state of one item.
    pub fn filter_state(&self, id: TreeItemId) -> FilterState {
        self.state.read().filter_states.get(id)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Replaces the selection.
    ///
    /// `items` become [`SelectionState::Explicit`]; their children that are
    /// not filtered out become [`SelectionState::ImplicitChild`], recursively.
    /// Items that drop out of the selection lose their unpinned curves, and
    /// every selected item gets its curves created or refreshed through
    /// `context`. The selection notification fires only if the selection
    /// actually differs, regardless of order.
    ///
    /// Selecting an id that does not exist is a contract violation.
    pub fn set_direct_selection(&self, items: Vec<TreeItemId>, context: &mut dyn CurveEditorContext) {
        self.affinity.debug_check("set_direct_selection");
        let _guard = self.scoped_update();
        let _span = tracing::trace_span!(target: targets::SELECTION, "set_direct_selection", operation = span_names::SELECTION).entered();

        let (changed, mut released, mut refreshed) = {
            let mut state = self.state.write();
            let state = &mut *state;
            let (selection, order) = selection::expand_selection(items, &state.items, &state.filter_states);
            let previous = std::mem::replace(&mut state.selection, selection);

            let released: Vec<(TreeItemId, Vec<CurveModelId>)> = previous
                .keys()
                .filter(|id| !state.selection.get(*id).copied().unwrap_or_default().is_selected())
                .filter_map(|id| state.items.get(*id).map(|item| (*id, item.curves().to_vec())))
                .collect();

            let refreshed: Vec<(TreeItemId, Vec<CurveModelId>, Option<Arc<dyn TreeItemImpl>>)> = order
                .iter()
                .filter_map(|id| state.items.get(*id).map(|item| (*id, item.curves().to_vec(), item.item())))
                .collect();

            (previous != state.selection, released, refreshed)
        };

        for (_, curves) in &mut released {
            item::destroy_unpinned_curves(curves, context);
        }
        for (id, curves, implementation) in &mut refreshed {
            item::get_or_create_curves(*id, curves, implementation.as_deref(), context);
        }

        {
            let mut state = self.state.write();
            let updates = released
                .into_iter()
                .chain(refreshed.into_iter().map(|(id, curves, _)| (id, curves)));
            for (id, curves) in updates {
                if let Some(item) = state.items.get_mut(id) {
                    item.set_curves(curves);
                }
            }
        }

        if changed {
            self.events.selection_changed.bump();
        }
        tracing::debug!(target: targets::SELECTION, changed, "selection set");
    }

    /// Creates the curves of one item, or refreshes them if they already
    /// exist, and returns their ids. Unknown ids yield no curves.
    pub fn get_or_create_curves(&self, id: TreeItemId, context: &mut dyn CurveEditorContext) -> Vec<CurveModelId> {
        let snapshot = {
            let state = self.state.read();
            state.items.get(id).map(|item| (item.curves().to_vec(), item.item()))
        };
        let Some((mut curves, implementation)) = snapshot else {
            return Vec::new();
        };
        item::get_or_create_curves(id, &mut curves, implementation.as_deref(), context);
        self.write_back_curves(id, &curves);
        curves
    }

    /// Removes every curve one item created.
    pub fn destroy_curves(&self, id: TreeItemId, context: &mut dyn CurveEditorContext) {
        let Some(mut curves) = self.item_curves(id) else {
            return;
        };
        item::destroy_curves(&mut curves, context);
        self.write_back_curves(id, &curves);
    }

    /// Removes the curves of one item that the context does not report as
    /// pinned.
    pub fn destroy_unpinned_curves(&self, id: TreeItemId, context: &mut dyn CurveEditorContext) {
        let Some(mut curves) = self.item_curves(id) else {
            return;
        };
        item::destroy_unpinned_curves(&mut curves, context);
        self.write_back_curves(id, &curves);
    }

    fn item_curves(&self, id: TreeItemId) -> Option<Vec<CurveModelId>> {
        self.state.read().items.get(id).map(|item| item.curves().to_vec())
    }

    // The item may have been removed while the context ran.
    fn write_back_curves(&self, id: TreeItemId, curves: &[CurveModelId]) {
        if let Some(item) = self.state.write().items.get_mut(id) {
            item.set_curves(curves.to_vec());
        }
    }

    /// A copy of the selection table.
    pub fn selection(&self) -> Selection {
        self.state.read().selection.clone()
    }

    /// The selection state of one item.
    pub fn selection_state(&self, id: TreeItemId) -> SelectionState {
        self.state.read().selection.get(&id).copied().unwrap_or_default()
    }

    /// Returns `true` if the item is selected explicitly or implicitly.
    pub fn is_selected(&self, id: TreeItemId) -> bool {
        self.selection_state(id).is_selected()
    }
}

/// Tree topology and live item implementations, captured so a filter run can
/// call into item implementations without holding the tree lock.
struct FilterSnapshot {
    roots: Vec<TreeItemId>,
    nodes: HashMap<TreeItemId, SnapshotNode>,
}

struct SnapshotNode {
    children: Vec<TreeItemId>,
    item: Option<Arc<dyn TreeItemImpl>>,
}

impl FilterSnapshot {
    fn capture(state: &TreeState) -> Self {
        Self {
            roots: state.root_items.ids().to_vec(),
            nodes: state
                .items
                .iter()
                .map(|item| {
                    let node = SnapshotNode {
                        children: item.children().to_vec(),
                        item: item.item(),
                    };
                    (item.id(), node)
                })
                .collect(),
        }
    }

    /// Runs one pass over `ids` and their subtrees. Returns `true` if any
    /// item matched directly or implicitly as a parent.
    fn perform_filter_pass(
        &self,
        states: &mut FilterStates,
        filters: &[Arc<dyn TreeFilter>],
        ids: &[TreeItemId],
        inherited: FilterState,
    ) -> bool {
        let mut any_matched = false;

        for &id in ids {
            // Failed an earlier pass, so it cannot pass this one.
            if states.get(id) == FilterState::NoMatch {
                continue;
            }
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };

            let mut state = inherited;
            let mut child_inherited = inherited;
            if let Some(item) = &node.item {
                if filters.iter().any(|filter| item.passes_filter(filter.as_ref())) {
                    any_matched = true;
                    state = FilterState::Match;
                    child_inherited = FilterState::ImplicitChild;
                }
            }

            let matched_children = self.perform_filter_pass(states, filters, &node.children, child_inherited);
            if matched_children && state != FilterState::Match {
                any_matched = true;
                state = FilterState::ImplicitParent;
            }

            states.set(id, state);
        }

        any_matched
    }
}
