//! Human-readable dumps of a curve tree.
//!
//! ```
//! use horizon_curve_tree::{CurveEditorTree, TreeDebug, TreeFormatOptions};
//!
//! let tree = CurveEditorTree::new();
//! let root = tree.add_item(None).unwrap();
//! tree.add_item(Some(root)).unwrap();
//!
//! let output = TreeDebug::with_options(TreeFormatOptions::detailed()).format(&tree);
//! assert!(output.starts_with("Curve Tree (2 items):"));
//! ```

use std::fmt::Write;

use crate::error::{Result, TreeError};
use crate::filter::FilterState;
use crate::id::TreeItemId;
use crate::selection::SelectionState;
use crate::tree::CurveEditorTree;

/// Branch drawing style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Dashes only.
    Compact,
}

/// What to include in a tree dump.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch drawing style.
    pub style: TreeStyle,
    /// Show item ids.
    pub show_ids: bool,
    /// Show each item's filter state while filters are active.
    pub show_filter_states: bool,
    /// Mark selected items.
    pub show_selection: bool,
    /// Show how many curves each item owns.
    pub show_curves: bool,
    /// Leave out items that did not match the filters.
    pub hide_filtered: bool,
    /// Maximum depth to descend to, `None` for unlimited.
    pub max_depth: Option<usize>,
    /// Spaces per level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_filter_states: true,
            show_selection: true,
            show_curves: false,
            hide_filtered: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything the dump can show.
    pub fn detailed() -> Self {
        Self {
            show_curves: true,
            ..Default::default()
        }
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_filter_states: false,
            show_selection: false,
            show_curves: false,
            ..Default::default()
        }
    }
}

struct NodeView {
    label: Option<String>,
    children: Vec<TreeItemId>,
    curves: usize,
    filter_state: FilterState,
    selection_state: SelectionState,
}

/// Formats a [`CurveEditorTree`] as an indented outline.
///
/// Labels come from [`TreeItemImpl::label`](crate::TreeItemImpl::label).
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// A formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// A formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Formats every root item and its subtree, in current child order.
    pub fn format(&self, tree: &CurveEditorTree) -> String {
        let mut output = String::new();
        writeln!(output, "Curve Tree ({} items):", tree.len()).expect("write to String");

        let roots = self.visible(tree, tree.root_items());
        if roots.is_empty() {
            writeln!(output, "  (empty)").expect("write to String");
        }
        let count = roots.len();
        for (index, root) in roots.into_iter().enumerate() {
            self.format_into(tree, root, 0, index + 1 == count, &mut output);
        }
        output
    }

    /// Formats one item and its subtree.
    pub fn format_subtree(&self, tree: &CurveEditorTree, id: TreeItemId) -> Result<String> {
        if !tree.contains(id) {
            return Err(TreeError::ItemNotFound(id));
        }
        let mut output = String::new();
        self.format_into(tree, id, 0, true, &mut output);
        Ok(output)
    }

    // Hidden items are dropped before sibling positions are assigned.
    fn visible(&self, tree: &CurveEditorTree, mut ids: Vec<TreeItemId>) -> Vec<TreeItemId> {
        if self.options.hide_filtered {
            ids.retain(|&id| tree.filter_state(id) != FilterState::NoMatch);
        }
        ids
    }

    fn view(tree: &CurveEditorTree, id: TreeItemId) -> Option<NodeView> {
        let (implementation, children, curves) = {
            let item = tree.find_item(id)?;
            (item.item(), item.children().to_vec(), item.curves().len())
        };
        Some(NodeView {
            label: implementation.and_then(|implementation| implementation.label()),
            children,
            curves,
            filter_state: tree.filter_state(id),
            selection_state: tree.selection_state(id),
        })
    }

    fn format_into(&self, tree: &CurveEditorTree, id: TreeItemId, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = Self::view(tree, id) else {
            return;
        };
        if self.options.hide_filtered && node.filter_state == FilterState::NoMatch {
            return;
        }

        output.push_str(&self.prefix(depth, is_last));
        output.push_str(node.label.as_deref().unwrap_or("(unlabelled)"));

        if self.options.show_ids {
            write!(output, " [{id}]").expect("write to String");
        }
        if self.options.show_filter_states && node.filter_state != FilterState::Inactive {
            write!(output, " {{{:?}}}", node.filter_state).expect("write to String");
        }
        if self.options.show_selection {
            match node.selection_state {
                SelectionState::None => {}
                SelectionState::Explicit => output.push_str(" *"),
                SelectionState::ImplicitChild => output.push_str(" (*)"),
            }
        }
        if self.options.show_curves && node.curves > 0 {
            write!(output, " <{} curves>", node.curves).expect("write to String");
        }
        output.push('\n');

        let children = self.visible(tree, node.children);
        let count = children.len();
        for (index, child) in children.into_iter().enumerate() {
            self.format_into(tree, child, depth + 1, index + 1 == count, output);
        }
    }

    fn prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 1..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix.push(' ');
        prefix
    }
}
