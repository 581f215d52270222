//! Curve models and the curve editor context that owns them.
//!
//! Tree items never own curve models. They ask a [`CurveEditorContext`] to
//! take ownership of the models their implementation creates and keep only
//! the returned [`CurveModelId`]s. [`CurveEditor`] is the stock context.

use std::any::Any;
use std::collections::HashSet;

use horizon_curve_tree_core::logging::targets;
use horizon_curve_tree_core::Signal;
use slotmap::{new_key_type, SlotMap};

use crate::id::TreeItemId;

new_key_type! {
    /// Identifier of a curve model registered with a curve editor context.
    pub struct CurveModelId;
}

/// A curve shown by the curve editor.
///
/// The tree only needs to move models into the context; everything else
/// about a curve (keys, evaluation, drawing) belongs to the concrete type,
/// which can be recovered with [`downcast_ref`](trait.CurveModel.html#method.downcast_ref).
pub trait CurveModel: Any {
    /// Human-readable name of the curve.
    fn display_name(&self) -> String;
}

impl dyn CurveModel {
    /// Downcasts to a concrete curve model type.
    pub fn downcast_ref<T: CurveModel>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// The owner of curve models created on behalf of tree items.
pub trait CurveEditorContext {
    /// Takes ownership of `model`, recording `owner` as the item it belongs to.
    fn add_curve_for_tree_item(&mut self, model: Box<dyn CurveModel>, owner: TreeItemId) -> CurveModelId;

    /// Looks up a curve model.
    fn find_curve(&self, id: CurveModelId) -> Option<&dyn CurveModel>;

    /// Removes and drops a curve model. Unknown ids are ignored.
    fn remove_curve(&mut self, id: CurveModelId);

    /// Whether the curve is pinned, i.e. kept alive regardless of selection.
    fn is_curve_pinned(&self, id: CurveModelId) -> bool;

    /// Notifies listeners that an existing curve should be refreshed.
    fn broadcast_curve_changed(&self, id: CurveModelId);
}

struct CurveEntry {
    model: Box<dyn CurveModel>,
    owner: TreeItemId,
}

/// Stock [`CurveEditorContext`] backed by a slot map.
///
/// # Signals
///
/// - `curve_added`: a model was registered
/// - `curve_removed`: a model was removed
/// - `curve_changed`: an existing model was asked to refresh
pub struct CurveEditor {
    curves: SlotMap<CurveModelId, CurveEntry>,
    pinned: HashSet<CurveModelId>,

    /// Emitted after a curve model is registered.
    pub curve_added: Signal<CurveModelId>,

    /// Emitted after a curve model is removed.
    pub curve_removed: Signal<CurveModelId>,

    /// Emitted when an existing curve model should be refreshed.
    pub curve_changed: Signal<CurveModelId>,
}

impl Default for CurveEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CurveEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveEditor")
            .field("curves", &self.curves.len())
            .field("pinned", &self.pinned.len())
            .finish()
    }
}

impl CurveEditor {
    /// Creates an empty curve editor.
    pub fn new() -> Self {
        Self {
            curves: SlotMap::with_key(),
            pinned: HashSet::new(),
            curve_added: Signal::new(),
            curve_removed: Signal::new(),
            curve_changed: Signal::new(),
        }
    }

    /// Number of registered curve models.
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    /// Ids of all registered curve models.
    pub fn curve_ids(&self) -> Vec<CurveModelId> {
        self.curves.keys().collect()
    }

    /// The tree item a curve was created for.
    pub fn curve_owner(&self, id: CurveModelId) -> Option<TreeItemId> {
        self.curves.get(id).map(|entry| entry.owner)
    }

    /// Pins a curve so selection changes no longer destroy it.
    ///
    /// Returns `false` if the curve does not exist or was already pinned.
    pub fn pin_curve(&mut self, id: CurveModelId) -> bool {
        self.curves.contains_key(id) && self.pinned.insert(id)
    }

    /// Unpins a curve. Returns `true` if it was pinned.
    pub fn unpin_curve(&mut self, id: CurveModelId) -> bool {
        self.pinned.remove(&id)
    }

    /// All pinned curve ids.
    pub fn pinned_curves(&self) -> Vec<CurveModelId> {
        self.pinned.iter().copied().collect()
    }
}

impl CurveEditorContext for CurveEditor {
    fn add_curve_for_tree_item(&mut self, model: Box<dyn CurveModel>, owner: TreeItemId) -> CurveModelId {
        let name = model.display_name();
        let id = self.curves.insert(CurveEntry { model, owner });
        tracing::debug!(target: targets::CURVES, ?id, %owner, %name, "curve added");
        self.curve_added.emit(id);
        id
    }

    fn find_curve(&self, id: CurveModelId) -> Option<&dyn CurveModel> {
        self.curves.get(id).map(|entry| entry.model.as_ref())
    }

    fn remove_curve(&mut self, id: CurveModelId) {
        if self.curves.remove(id).is_some() {
            self.pinned.remove(&id);
            tracing::debug!(target: targets::CURVES, ?id, "curve removed");
            self.curve_removed.emit(id);
        }
    }

    fn is_curve_pinned(&self, id: CurveModelId) -> bool {
        self.pinned.contains(&id)
    }

    fn broadcast_curve_changed(&self, id: CurveModelId) {
        self.curve_changed.emit(id);
    }
}
