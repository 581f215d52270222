//! Tree items and the implementation capability they delegate to.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

use horizon_curve_tree_core::logging::targets;

use crate::curve::{CurveEditorContext, CurveModel, CurveModelId};
use crate::filter::TreeFilter;
use crate::id::TreeItemId;

/// Behaviour supplied by the owner of a tree item.
///
/// The tree stores a strong or weak reference to an implementation per item.
/// A weak implementation that has expired is treated like a missing one: the
/// item creates no curves and passes no filter.
pub trait TreeItemImpl: Send + Sync {
    /// Appends the curve models this item displays to `out`.
    fn create_curve_models(&self, out: &mut Vec<Box<dyn CurveModel>>);

    /// Whether this item matches `filter`.
    fn passes_filter(&self, filter: &dyn TreeFilter) -> bool;

    /// Label used in debug output.
    fn label(&self) -> Option<String> {
        None
    }
}

/// Ordering used when sorting sibling items. Items without a live
/// implementation always sort after those with one.
pub type SortPredicate = Arc<dyn Fn(&dyn TreeItemImpl, &dyn TreeItemImpl) -> Ordering + Send + Sync>;

#[derive(Clone)]
enum ItemHandle {
    Strong(Arc<dyn TreeItemImpl>),
    Weak(Weak<dyn TreeItemImpl>),
}

/// Ordered child ids with a deferred sort flag.
#[derive(Debug, Clone, Default)]
pub struct SortedChildren {
    ids: Vec<TreeItemId>,
    requires_sort: bool,
}

impl SortedChildren {
    /// The child ids in their current order.
    pub fn ids(&self) -> &[TreeItemId] {
        &self.ids
    }

    /// Whether children were added since the last sort.
    pub fn requires_sort(&self) -> bool {
        self.requires_sort
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if there are no children.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn push(&mut self, id: TreeItemId) {
        self.ids.push(id);
        self.requires_sort = true;
    }

    pub(crate) fn remove(&mut self, id: TreeItemId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|child| *child != id);
        self.ids.len() != before
    }

    /// Replaces the order. `ids` must be a permutation of the current ids.
    pub(crate) fn set_sorted(&mut self, ids: Vec<TreeItemId>) {
        debug_assert_eq!(ids.len(), self.ids.len());
        self.ids = ids;
        self.requires_sort = false;
    }

    pub(crate) fn mark_sorted(&mut self) {
        self.requires_sort = false;
    }
}

/// A node of the curve tree.
///
/// Items are created by [`CurveEditorTree::add_item`](crate::CurveEditorTree::add_item)
/// and destroyed by [`CurveEditorTree::remove_item`](crate::CurveEditorTree::remove_item).
#[derive(Clone)]
pub struct TreeItem {
    id: TreeItemId,
    parent: Option<TreeItemId>,
    children: SortedChildren,
    handle: Option<ItemHandle>,
    curves: Vec<CurveModelId>,
}

impl fmt::Debug for TreeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeItem")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children.ids)
            .field("has_item", &self.item().is_some())
            .field("curves", &self.curves)
            .finish()
    }
}

impl TreeItem {
    pub(crate) fn new(id: TreeItemId, parent: Option<TreeItemId>) -> Self {
        Self {
            id,
            parent,
            children: SortedChildren::default(),
            handle: None,
            curves: Vec::new(),
        }
    }

    /// This item's id.
    pub fn id(&self) -> TreeItemId {
        self.id
    }

    /// The parent's id, or `None` for root items.
    pub fn parent_id(&self) -> Option<TreeItemId> {
        self.parent
    }

    /// Child ids in their current order.
    pub fn children(&self) -> &[TreeItemId] {
        self.children.ids()
    }

    /// The full child container, including the deferred sort flag.
    pub fn sorted_children(&self) -> &SortedChildren {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut SortedChildren {
        &mut self.children
    }

    /// Ids of the curve models this item has created.
    pub fn curves(&self) -> &[CurveModelId] {
        &self.curves
    }

    pub(crate) fn set_curves(&mut self, curves: Vec<CurveModelId>) {
        self.curves = curves;
    }

    /// The item implementation, if one is set and still alive.
    pub fn item(&self) -> Option<Arc<dyn TreeItemImpl>> {
        match self.handle.as_ref()? {
            ItemHandle::Strong(strong) => Some(strong.clone()),
            ItemHandle::Weak(weak) => weak.upgrade(),
        }
    }

    /// Keeps `item` alive for as long as this tree item exists.
    pub fn set_strong_item(&mut self, item: Arc<dyn TreeItemImpl>) {
        self.handle = Some(ItemHandle::Strong(item));
    }

    /// References `item` without keeping it alive.
    pub fn set_weak_item(&mut self, item: Weak<dyn TreeItemImpl>) {
        self.handle = Some(ItemHandle::Weak(item));
    }
}

pub(crate) fn get_or_create_curves(
    owner: TreeItemId,
    curves: &mut Vec<CurveModelId>,
    item: Option<&dyn TreeItemImpl>,
    context: &mut dyn CurveEditorContext,
) {
    if curves.is_empty() {
        let Some(item) = item else {
            return;
        };
        let mut models = Vec::new();
        item.create_curve_models(&mut models);
        for model in models {
            curves.push(context.add_curve_for_tree_item(model, owner));
        }
        tracing::trace!(target: targets::CURVES, %owner, count = curves.len(), "created curves");
    } else {
        for &id in curves.iter() {
            if context.find_curve(id).is_some() {
                context.broadcast_curve_changed(id);
            }
        }
    }
}

pub(crate) fn destroy_curves(curves: &mut Vec<CurveModelId>, context: &mut dyn CurveEditorContext) {
    for id in curves.drain(..) {
        context.remove_curve(id);
    }
}

pub(crate) fn destroy_unpinned_curves(curves: &mut Vec<CurveModelId>, context: &mut dyn CurveEditorContext) {
    for index in (0..curves.len()).rev() {
        if !context.is_curve_pinned(curves[index]) {
            context.remove_curve(curves[index]);
            curves.swap_remove(index);
        }
    }
}
