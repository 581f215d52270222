//! Horizon Curve Tree - the item tree behind a curve editor's outline.
//!
//! A [`CurveEditorTree`] holds a hierarchy of items, each backed by a
//! [`TreeItemImpl`] supplied by the host. The tree provides:
//!
//! - **Filtering**: weakly-held [`TreeFilter`]s grouped into passes. Items
//!   that match, their ancestors and their descendants stay visible.
//! - **Selection**: directly selected items implicitly select their visible
//!   descendants.
//! - **Curve lifecycle**: selected items create their curve models through a
//!   [`CurveEditorContext`]; deselected items release the unpinned ones.
//! - **Coalesced notifications**: mutations inside an update scope produce at
//!   most one broadcast per notification when the outermost scope closes.
//!
//! The core crate is re-exported, so [`Signal`], [`ensure_always!`] and the
//! logging targets are available from here as well.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_curve_tree::{CurveEditor, CurveEditorTree, CurveModel, TreeFilter, TreeItemImpl};
//!
//! struct Track;
//!
//! struct Keys;
//!
//! impl CurveModel for Keys {
//!     fn display_name(&self) -> String {
//!         "keys".into()
//!     }
//! }
//!
//! impl TreeItemImpl for Track {
//!     fn create_curve_models(&self, out: &mut Vec<Box<dyn CurveModel>>) {
//!         out.push(Box::new(Keys));
//!     }
//!
//!     fn passes_filter(&self, _filter: &dyn TreeFilter) -> bool {
//!         true
//!     }
//! }
//!
//! let tree = CurveEditorTree::new();
//! let mut editor = CurveEditor::new();
//! let track = tree.add_item_with(None, Arc::new(Track)).unwrap();
//!
//! tree.set_direct_selection(vec![track], &mut editor);
//! assert_eq!(editor.curve_count(), 1);
//!
//! tree.remove_item(track, &mut editor);
//! assert_eq!(editor.curve_count(), 0);
//! ```

pub use horizon_curve_tree_core::*;

pub mod config;
pub mod curve;
pub mod debug;
pub mod error;
pub mod events;
pub mod filter;
pub mod id;
pub mod item;
pub mod selection;
mod store;
pub mod tree;

pub use config::TreeConfig;
pub use curve::{CurveEditor, CurveEditorContext, CurveModel, CurveModelId};
pub use debug::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use error::{Result, TreeError};
pub use events::{TreeDelegate, TreeEventGuard, TreeEvents};
pub use filter::{FilterState, FilterStates, FilterType, TextFilter, TreeFilter};
pub use id::TreeItemId;
pub use item::{SortPredicate, SortedChildren, TreeItem, TreeItemImpl};
pub use selection::{Selection, SelectionState};
pub use tree::CurveEditorTree;
