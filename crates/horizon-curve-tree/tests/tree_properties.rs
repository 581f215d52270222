//! Behavioural tests for the curve tree as seen from a host application.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_curve_tree::contract::set_contract_panics_enabled;
use horizon_curve_tree::{
    CurveEditor, CurveEditorContext, CurveEditorTree, CurveModel, CurveModelId, FilterState, FilterType,
    SelectionState, TextFilter, TreeDelegate, TreeFilter, TreeItemId, TreeItemImpl,
};

struct Curve(String);

impl CurveModel for Curve {
    fn display_name(&self) -> String {
        self.0.clone()
    }
}

/// A channel with a label and a fixed number of curves.
struct Channel {
    label: &'static str,
    curves: usize,
}

impl TreeItemImpl for Channel {
    fn create_curve_models(&self, out: &mut Vec<Box<dyn CurveModel>>) {
        for index in 0..self.curves {
            out.push(Box::new(Curve(format!("{}[{index}]", self.label))));
        }
    }

    fn passes_filter(&self, filter: &dyn TreeFilter) -> bool {
        if let Some(text) = filter.downcast_ref::<TextFilter>() {
            return text.matches(self.label);
        }
        filter
            .downcast_ref::<CurveCountFilter>()
            .is_some_and(|count| self.curves >= count.minimum)
    }

    fn label(&self) -> Option<String> {
        Some(self.label.to_string())
    }
}

/// Matches channels with at least `minimum` curves.
struct CurveCountFilter {
    minimum: usize,
    kind: FilterType,
    pass: i32,
}

impl TreeFilter for CurveCountFilter {
    fn filter_type(&self) -> FilterType {
        self.kind
    }

    fn filter_pass(&self) -> i32 {
        self.pass
    }
}

fn channel(tree: &CurveEditorTree, parent: Option<TreeItemId>, label: &'static str, curves: usize) -> TreeItemId {
    tree.add_item_with(parent, Arc::new(Channel { label, curves })).unwrap()
}

fn text_filter(text: &str, pass: i32) -> Arc<dyn TreeFilter> {
    Arc::new(TextFilter::new(text).with_pass(pass))
}

fn count_broadcasts(delegate: &TreeDelegate) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let clone = count.clone();
    delegate.connect(move |_| {
        clone.fetch_add(1, Ordering::SeqCst);
    });
    count
}

#[test]
fn ids_are_unique_and_never_reused() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();

    let first: Vec<_> = (0..4).map(|_| tree.add_item(None).unwrap()).collect();
    for id in &first {
        tree.remove_item(*id, &mut editor);
    }
    let second: Vec<_> = (0..4).map(|_| tree.add_item(None).unwrap()).collect();

    let mut all: Vec<_> = first.iter().chain(&second).copied().collect();
    assert!(all.iter().all(|id| id.is_valid()));
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 8);
    assert!(second.iter().all(|late| first.iter().all(|early| late > early)));
}

/// Records, for every removed curve, whether its owning item still existed.
struct RemovalRecorder {
    editor: CurveEditor,
    tree: Weak<CurveEditorTree>,
    owner_alive: Vec<bool>,
}

impl CurveEditorContext for RemovalRecorder {
    fn add_curve_for_tree_item(&mut self, model: Box<dyn CurveModel>, owner: TreeItemId) -> CurveModelId {
        self.editor.add_curve_for_tree_item(model, owner)
    }

    fn find_curve(&self, id: CurveModelId) -> Option<&dyn CurveModel> {
        self.editor.find_curve(id)
    }

    fn remove_curve(&mut self, id: CurveModelId) {
        if let (Some(owner), Some(tree)) = (self.editor.curve_owner(id), self.tree.upgrade()) {
            self.owner_alive.push(tree.contains(owner));
        }
        self.editor.remove_curve(id);
    }

    fn is_curve_pinned(&self, id: CurveModelId) -> bool {
        self.editor.is_curve_pinned(id)
    }

    fn broadcast_curve_changed(&self, id: CurveModelId) {
        self.editor.broadcast_curve_changed(id);
    }
}

#[test]
fn removal_destroys_curves_before_items() {
    let tree = Arc::new(CurveEditorTree::new());
    let mut recorder = RemovalRecorder {
        editor: CurveEditor::new(),
        tree: Arc::downgrade(&tree),
        owner_alive: Vec::new(),
    };

    let root = channel(&tree, None, "Transform", 1);
    let child = channel(&tree, Some(root), "Location", 3);
    let grandchild = channel(&tree, Some(child), "Location.X", 1);
    let other = channel(&tree, None, "Visibility", 1);

    tree.set_direct_selection(vec![root, other], &mut recorder);
    assert_eq!(recorder.editor.curve_count(), 6);

    tree.remove_item(root, &mut recorder);

    assert_eq!(recorder.owner_alive, vec![true; 5]);
    assert_eq!(recorder.editor.curve_count(), 1);
    for id in [root, child, grandchild] {
        assert!(!tree.contains(id));
        assert_eq!(tree.selection_state(id), SelectionState::None);
    }
    assert_eq!(tree.root_items(), vec![other]);
    assert!(tree.is_selected(other));
}

#[test]
fn removing_unknown_item_is_a_no_op() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    tree.add_item(None).unwrap();
    let items = count_broadcasts(&tree.events().items_changed);

    tree.remove_item(TreeItemId::from_raw(99), &mut editor);

    assert_eq!(tree.len(), 1);
    assert_eq!(items.load(Ordering::SeqCst), 0);
}

#[test]
fn matching_leaf_makes_ancestors_implicit_parents() {
    let tree = CurveEditorTree::new();
    let a = channel(&tree, None, "Actor", 0);
    let b = channel(&tree, Some(a), "Transform", 0);
    let c = channel(&tree, Some(b), "Location", 1);
    let d = channel(&tree, Some(a), "Visibility", 1);

    let filter = text_filter("location", 0);
    tree.add_filter(Arc::downgrade(&filter));

    assert_eq!(tree.filter_state(c), FilterState::Match);
    assert_eq!(tree.filter_state(b), FilterState::ImplicitParent);
    assert_eq!(tree.filter_state(a), FilterState::ImplicitParent);
    assert_eq!(tree.filter_state(d), FilterState::NoMatch);

    let states = tree.filter_states();
    assert!(states.is_active());
    assert_eq!(states.num_matched(), 1);
    assert_eq!(states.num_matched_implicitly(), 2);
}

#[test]
fn descendants_of_a_match_are_implicit_children() {
    let tree = CurveEditorTree::new();
    let a = channel(&tree, None, "Transform", 0);
    let b = channel(&tree, Some(a), "Location", 0);
    let c = channel(&tree, Some(b), "X", 1);

    let filter = text_filter("transform", 0);
    tree.add_filter(Arc::downgrade(&filter));

    assert_eq!(tree.filter_state(a), FilterState::Match);
    assert_eq!(tree.filter_state(b), FilterState::ImplicitChild);
    assert_eq!(tree.filter_state(c), FilterState::ImplicitChild);
}

#[test]
fn no_filters_means_inactive() {
    let tree = CurveEditorTree::new();
    let a = channel(&tree, None, "Transform", 0);

    tree.run_filters();

    assert!(!tree.filter_states().is_active());
    assert_eq!(tree.filter_state(a), FilterState::Inactive);
    assert_eq!(tree.filter_state(TreeItemId::from_raw(1234)), FilterState::Inactive);
}

#[test]
fn filters_or_within_a_pass_and_across_passes() {
    let tree = CurveEditorTree::new();
    let location = channel(&tree, None, "Location", 3);
    let rotation = channel(&tree, None, "Rotation", 1);
    let scale = channel(&tree, None, "Scale", 3);

    let loc = text_filter("location", 0);
    let rot = text_filter("rotation", 0);
    tree.add_filter(Arc::downgrade(&loc));
    tree.add_filter(Arc::downgrade(&rot));

    assert_eq!(tree.filter_state(location), FilterState::Match);
    assert_eq!(tree.filter_state(rotation), FilterState::Match);
    assert_eq!(tree.filter_state(scale), FilterState::NoMatch);

    let many_curves: Arc<dyn TreeFilter> = Arc::new(CurveCountFilter {
        minimum: 2,
        kind: FilterType::register_custom(),
        pass: 1,
    });
    tree.add_filter(Arc::downgrade(&many_curves));

    assert_eq!(tree.filter_state(location), FilterState::Match);
    assert_eq!(tree.filter_state(rotation), FilterState::NoMatch);
    assert_eq!(tree.filter_state(scale), FilterState::NoMatch);
}

#[test]
fn expired_filter_is_pruned_on_next_run() {
    let tree = CurveEditorTree::new();
    let a = channel(&tree, None, "Location", 0);
    let filter = text_filter("rotation", 0);
    tree.add_filter(Arc::downgrade(&filter));
    assert_eq!(tree.filter_state(a), FilterState::NoMatch);

    drop(filter);
    assert!(tree.filters().is_empty());
    tree.run_filters();

    assert_eq!(tree.filter_state(a), FilterState::Inactive);
    assert!(tree.find_filter_by_type(FilterType::Text).is_none());
}

#[test]
fn selection_skips_filtered_out_children() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    let root = channel(&tree, None, "Transform", 0);
    let location = channel(&tree, Some(root), "Location", 1);
    let rotation = channel(&tree, Some(root), "Rotation", 1);
    let x = channel(&tree, Some(location), "Location.X", 1);

    let filter = text_filter("location", 0);
    tree.add_filter(Arc::downgrade(&filter));
    tree.set_direct_selection(vec![root], &mut editor);

    assert_eq!(tree.selection_state(root), SelectionState::Explicit);
    assert_eq!(tree.selection_state(location), SelectionState::ImplicitChild);
    assert_eq!(tree.selection_state(x), SelectionState::ImplicitChild);
    assert_eq!(tree.selection_state(rotation), SelectionState::None);
    assert_eq!(editor.curve_count(), 2);
}

#[test]
fn reordered_selection_does_not_notify() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    let a = channel(&tree, None, "A", 1);
    let b = channel(&tree, None, "B", 1);

    tree.set_direct_selection(vec![a, b], &mut editor);
    let serial = tree.events().selection_changed.serial_number();
    let broadcasts = count_broadcasts(&tree.events().selection_changed);

    tree.set_direct_selection(vec![b, a], &mut editor);

    assert_eq!(tree.events().selection_changed.serial_number(), serial);
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);
    assert_eq!(editor.curve_count(), 2);
    assert_eq!(editor.curve_changed.emit_count(), 2);
}

#[test]
fn deselection_keeps_pinned_curves() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    let a = channel(&tree, None, "Location", 3);

    tree.set_direct_selection(vec![a], &mut editor);
    let curves = tree.get_item(a).curves().to_vec();
    assert_eq!(curves.len(), 3);
    assert!(editor.pin_curve(curves[0]));

    tree.set_direct_selection(Vec::new(), &mut editor);

    assert!(!tree.is_selected(a));
    assert_eq!(tree.get_item(a).curves(), &[curves[0]]);
    assert_eq!(editor.curve_ids(), vec![curves[0]]);
}

#[test]
fn nested_scopes_broadcast_once() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    let items = count_broadcasts(&tree.events().items_changed);
    let selection = count_broadcasts(&tree.events().selection_changed);
    let filters = count_broadcasts(&tree.events().filters_changed);
    let filter = text_filter("a", 0);

    {
        let _outer = tree.scoped_update();
        let a = channel(&tree, None, "A", 1);
        {
            let _inner = tree.scoped_update();
            channel(&tree, Some(a), "B", 1);
            tree.add_filter(Arc::downgrade(&filter));
        }
        tree.set_direct_selection(vec![a], &mut editor);
        assert_eq!(items.load(Ordering::SeqCst), 0);
    }

    assert_eq!(items.load(Ordering::SeqCst), 1);
    assert_eq!(selection.load(Ordering::SeqCst), 1);
    assert_eq!(filters.load(Ordering::SeqCst), 1);
    assert_eq!(tree.events().update_depth(), 0);
}

#[test]
fn sorted_children_follow_predicate() {
    let tree = CurveEditorTree::new();
    tree.set_sort_predicate(|a, b| a.label().cmp(&b.label()));
    let root = channel(&tree, None, "Transform", 0);
    let z = channel(&tree, Some(root), "Z", 0);
    let x = channel(&tree, Some(root), "X", 0);
    let y = channel(&tree, Some(root), "Y", 0);

    assert_eq!(tree.children(root).unwrap(), vec![z, x, y]);
    tree.sort_tree_items();
    assert_eq!(tree.children(root).unwrap(), vec![x, y, z]);

    let w = channel(&tree, Some(root), "W", 0);
    assert_eq!(tree.sorted_children(Some(root)).unwrap(), vec![w, x, y, z]);
}

fn tree_that_mutates_itself() -> (Arc<CurveEditorTree>, Arc<AtomicUsize>) {
    let tree = Arc::new(CurveEditorTree::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let weak = Arc::downgrade(&tree);
    let calls_clone = calls.clone();
    tree.events().items_changed.connect(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        if let Some(tree) = weak.upgrade() {
            tree.add_item(None).unwrap();
        }
    });
    (tree, calls)
}

#[test]
#[should_panic(expected = "while already broadcasting")]
fn mutating_from_a_handler_is_a_contract_violation() {
    set_contract_panics_enabled(true);
    let (tree, _calls) = tree_that_mutates_itself();
    tree.add_item(None).unwrap();
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn nested_broadcast_is_skipped_when_panics_are_disabled() {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    set_contract_panics_enabled(false);
    let (tree, calls) = tree_that_mutates_itself();

    tree.add_item(None).unwrap();
    set_contract_panics_enabled(cfg!(debug_assertions));

    let output = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    assert!(output.contains("broadcast items_changed while already broadcasting"), "{output}");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(tree.len(), 2);
    assert!(!tree.events().items_changed.is_broadcasting());
}

#[test]
fn curve_handlers_may_read_the_tree() {
    let tree = Arc::new(CurveEditorTree::new());
    let x = channel(&tree, None, "Location.X", 2);
    let mut editor = CurveEditor::new();

    let seen = Arc::new(AtomicUsize::new(0));
    for signal in [&editor.curve_added, &editor.curve_removed] {
        let tree = tree.clone();
        let seen = seen.clone();
        signal.connect(move |_| {
            seen.fetch_add(tree.len(), Ordering::SeqCst);
        });
    }

    let curves = tree.get_or_create_curves(x, &mut editor);
    assert_eq!(curves.len(), 2);
    assert_eq!(tree.get_item(x).curves(), curves.as_slice());
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    assert!(editor.pin_curve(curves[0]));
    tree.destroy_unpinned_curves(x, &mut editor);
    assert_eq!(tree.get_item(x).curves(), &curves[..1]);

    tree.destroy_curves(x, &mut editor);
    assert!(tree.get_item(x).curves().is_empty());
    assert_eq!(editor.curve_count(), 0);
    assert_eq!(seen.load(Ordering::SeqCst), 4);
}

#[test]
fn curve_management_ignores_unknown_items() {
    let tree = CurveEditorTree::new();
    let mut editor = CurveEditor::new();
    let stale = TreeItemId::from_raw(42);

    assert!(tree.get_or_create_curves(stale, &mut editor).is_empty());
    tree.destroy_curves(stale, &mut editor);
    assert_eq!(editor.curve_count(), 0);
}

#[test]
fn attaching_an_implementation_refilters() {
    let tree = CurveEditorTree::new();
    let filter = text_filter("location", 0);
    tree.add_filter(Arc::downgrade(&filter));

    let x = tree.add_item(None).unwrap();
    assert_eq!(tree.filter_state(x), FilterState::NoMatch);

    let items = count_broadcasts(&tree.events().items_changed);
    tree.set_strong_item(x, Arc::new(Channel { label: "Location.X", curves: 1 })).unwrap();

    assert_eq!(tree.filter_state(x), FilterState::Match);
    assert_eq!(items.load(Ordering::SeqCst), 1);
}
