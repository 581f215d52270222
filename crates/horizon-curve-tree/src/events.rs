//! Change notification for the curve tree.
//!
//! Every mutation bumps the serial number of the notification it affects
//! instead of broadcasting right away. Mutations run inside a
//! [`TreeEventGuard`]; guards nest, and only when the outermost one closes are
//! the notifications whose serial numbers moved broadcast, each exactly once.
//!
//! ```
//! use horizon_curve_tree::CurveEditorTree;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let tree = CurveEditorTree::new();
//! let broadcasts = Arc::new(AtomicUsize::new(0));
//! let counter = broadcasts.clone();
//! tree.events().items_changed.connect(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! {
//!     let _scope = tree.scoped_update();
//!     tree.add_item(None).unwrap();
//!     tree.add_item(None).unwrap();
//! }
//! assert_eq!(broadcasts.load(Ordering::SeqCst), 1);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use horizon_curve_tree_core::logging::{span_names, targets};
use horizon_curve_tree_core::{ensure_always, ConnectionGuard, ConnectionId, Signal};

use crate::tree::CurveEditorTree;

/// A tree notification with a change serial number.
pub struct TreeDelegate {
    name: &'static str,
    signal: Signal<()>,
    serial_number: AtomicU32,
    broadcasting: AtomicBool,
}

impl std::fmt::Debug for TreeDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeDelegate")
            .field("name", &self.name)
            .field("serial_number", &self.serial_number())
            .field("connections", &self.signal.connection_count())
            .finish()
    }
}

impl TreeDelegate {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            signal: Signal::new(),
            serial_number: AtomicU32::new(0),
            broadcasting: AtomicBool::new(false),
        }
    }

    /// Connects a handler.
    ///
    /// Handlers may read the tree. Mutating the tree from a handler triggers
    /// a nested broadcast of the same notification, which is a contract
    /// violation.
    pub fn connect<F>(&self, handler: F) -> ConnectionId
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.signal.connect(handler)
    }

    /// Connects a handler for the lifetime of the returned guard.
    pub fn connect_scoped<F>(&self, handler: F) -> ConnectionGuard<'_, ()>
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.signal.connect_scoped(handler)
    }

    /// Disconnects a handler. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.signal.disconnect(id)
    }

    /// The current change serial number. It increases on every change.
    pub fn serial_number(&self) -> u32 {
        self.serial_number.load(Ordering::SeqCst)
    }

    /// Whether handlers are running right now.
    pub fn is_broadcasting(&self) -> bool {
        self.broadcasting.load(Ordering::SeqCst)
    }

    pub(crate) fn bump(&self) {
        self.serial_number.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn broadcast(&self) {
        let already = self.broadcasting.swap(true, Ordering::SeqCst);
        if !ensure_always!(
            !already,
            "attempted to broadcast {} while already broadcasting it; \
             do not mutate the tree in response to it being mutated",
            self.name
        ) {
            return;
        }

        struct Reset<'a>(&'a AtomicBool);
        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::SeqCst);
            }
        }
        let _reset = Reset(&self.broadcasting);

        tracing::debug!(target: targets::EVENTS, notification = self.name, "broadcasting");
        self.signal.emit(());
    }
}

/// The notifications of a tree and the update-scope depth counter.
#[derive(Debug)]
pub struct TreeEvents {
    /// Items were added or removed, or filter states were recomputed.
    pub items_changed: TreeDelegate,
    /// The selection changed.
    pub selection_changed: TreeDelegate,
    /// Filters were added, removed or re-run.
    pub filters_changed: TreeDelegate,
    update_guard_counter: AtomicU32,
}

impl Default for TreeEvents {
    fn default() -> Self {
        Self {
            items_changed: TreeDelegate::new("items_changed"),
            selection_changed: TreeDelegate::new("selection_changed"),
            filters_changed: TreeDelegate::new("filters_changed"),
            update_guard_counter: AtomicU32::new(0),
        }
    }
}

impl TreeEvents {
    /// Number of update scopes currently open.
    pub fn update_depth(&self) -> u32 {
        self.update_guard_counter.load(Ordering::SeqCst)
    }
}

/// An open update scope.
///
/// Created by [`CurveEditorTree::scoped_update`]. While at least one scope is
/// open, notifications are deferred. Closing the outermost scope first
/// re-runs the filters if items or filters changed (still counted as open, so
/// the re-filter cannot start another flush), then broadcasts each
/// notification whose serial number moved. A changed item set also compacts
/// storage before `items_changed` fires.
///
/// Moving a guard moves the scope; it is closed exactly once, by whichever
/// owner drops it.
#[must_use = "the update scope closes as soon as the guard is dropped"]
pub struct TreeEventGuard<'a> {
    tree: &'a CurveEditorTree,
    cached_items: u32,
    cached_selection: u32,
    cached_filters: u32,
}

impl std::fmt::Debug for TreeEventGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEventGuard")
            .field("cached_items", &self.cached_items)
            .field("cached_selection", &self.cached_selection)
            .field("cached_filters", &self.cached_filters)
            .finish()
    }
}

impl<'a> TreeEventGuard<'a> {
    pub(crate) fn new(tree: &'a CurveEditorTree) -> Self {
        let events = tree.events();
        let guard = Self {
            tree,
            cached_items: events.items_changed.serial_number(),
            cached_selection: events.selection_changed.serial_number(),
            cached_filters: events.filters_changed.serial_number(),
        };
        events.update_guard_counter.fetch_add(1, Ordering::SeqCst);
        guard
    }
}

impl Drop for TreeEventGuard<'_> {
    fn drop(&mut self) {
        let events = self.tree.events();

        if std::thread::panicking() {
            events.update_guard_counter.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        let items_changed = events.items_changed.serial_number() != self.cached_items;
        let filters_changed = events.filters_changed.serial_number() != self.cached_filters;
        if (items_changed || filters_changed)
            && events.update_depth() == 1
            && self.tree.config().refilters_on_scope_close()
        {
            self.tree.run_filters();
        }

        if events.update_guard_counter.fetch_sub(1, Ordering::SeqCst) != 1 {
            return;
        }

        let _span = tracing::trace_span!(target: targets::EVENTS, "flush", operation = span_names::EVENT_FLUSH).entered();

        if events.items_changed.serial_number() != self.cached_items {
            if self.tree.config().compacts_on_items_changed() {
                self.tree.compact();
            }
            events.items_changed.broadcast();
        }

        if events.selection_changed.serial_number() != self.cached_selection {
            events.selection_changed.broadcast();
        }

        if events.filters_changed.serial_number() != self.cached_filters {
            events.filters_changed.broadcast();
        }
    }
}
