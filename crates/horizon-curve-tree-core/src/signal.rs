//! Observer lists used for change notification.
//!
//! A [`Signal`] keeps a set of handlers and calls each of them, on the
//! emitting thread, whenever it is emitted. Tree delegates and the curve
//! editor's curve notifications are built on it.
//!
//! Emission works on a snapshot of the handler list taken before the first
//! handler runs, with the internal lock released. Handlers may connect,
//! disconnect, or emit other signals; a handler connected during an emission
//! first runs on the next one.
//!
//! ```
//! use horizon_curve_tree_core::Signal;
//!
//! let curve_renamed = Signal::<String>::new();
//! let id = curve_renamed.connect(|name| println!("curve renamed to {name}"));
//!
//! curve_renamed.emit("Location.X".to_string());
//! curve_renamed.disconnect(id);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected handler, used to disconnect it.
    pub struct ConnectionId;
}

type Handler<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of handlers called with `&Args` on every emission.
///
/// Use `()` for notifications that carry no payload.
pub struct Signal<Args> {
    handlers: Mutex<SlotMap<ConnectionId, Handler<Args>>>,
    blocked: AtomicBool,
    emissions: AtomicU64,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.lock().len())
            .field("blocked", &self.blocked.load(Ordering::Relaxed))
            .field("emissions", &self.emissions.load(Ordering::Relaxed))
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    /// A signal without handlers.
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
            emissions: AtomicU64::new(0),
        }
    }

    /// Adds a handler and returns its id.
    pub fn connect<F>(&self, handler: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.handlers.lock().insert(Arc::new(handler))
    }

    /// Adds a handler that stays connected until the returned guard drops.
    pub fn connect_scoped<F>(&self, handler: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(handler),
            signal: self,
        }
    }

    /// Removes a handler. Returns `false` if `id` was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.handlers.lock().remove(id).is_some()
    }

    /// Removes every handler.
    pub fn disconnect_all(&self) {
        self.handlers.lock().clear();
    }

    /// Number of connected handlers.
    pub fn connection_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// While blocked, [`emit`](Self::emit) does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// How many emissions actually reached the handlers.
    pub fn emit_count(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    /// Calls every connected handler with `args`.
    #[tracing::instrument(skip_all, target = "horizon_curve_tree_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked");
            return;
        }

        let handlers: Vec<Handler<Args>> = self.handlers.lock().values().cloned().collect();
        self.emissions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(target: targets::SIGNAL, handlers = handlers.len(), "emit");

        for handler in &handlers {
            handler(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

/// Disconnects its handler when dropped.
///
/// ```
/// use horizon_curve_tree_core::Signal;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let items_changed = Signal::<()>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// {
///     let seen = seen.clone();
///     let _guard = items_changed.connect_scoped(move |_| {
///         seen.fetch_add(1, Ordering::SeqCst);
///     });
///     items_changed.emit(());
/// }
/// items_changed.emit(());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[must_use = "dropping the guard disconnects the handler immediately"]
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    /// The guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder<T: Copy + Send + 'static>(signal: &Signal<T>) -> (ConnectionId, Arc<Mutex<Vec<T>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let id = signal.connect(move |value: &T| sink.lock().push(*value));
        (id, log)
    }

    #[test]
    fn test_emit_reaches_every_handler() {
        let serial_changed = Signal::<u32>::new();
        let (_, first) = recorder(&serial_changed);
        let (_, second) = recorder(&serial_changed);

        serial_changed.emit(4);
        serial_changed.emit(5);

        assert_eq!(*first.lock(), [4, 5]);
        assert_eq!(*second.lock(), [4, 5]);
        assert_eq!(serial_changed.connection_count(), 2);
        assert_eq!(serial_changed.emit_count(), 2);
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<u32>::new();
        let (id, log) = recorder(&signal);

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*log.lock(), [1]);
    }

    #[test]
    fn test_blocked_signal_skips_handlers() {
        let signal = Signal::<u32>::new();
        let (_, log) = recorder(&signal);

        signal.set_blocked(true);
        signal.emit(1);
        assert!(signal.is_blocked());
        signal.set_blocked(false);
        signal.emit(2);

        assert_eq!(*log.lock(), [2]);
        assert_eq!(signal.emit_count(), 1);
    }

    #[test]
    fn test_scoped_connection() {
        let signal = Signal::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = log.clone();
            let guard = signal.connect_scoped(move |value| sink.lock().push(*value));
            assert_eq!(signal.connection_count(), 1);
            assert!(signal.disconnect(guard.id()));
            let sink = log.clone();
            let _guard = signal.connect_scoped(move |value| sink.lock().push(*value));
            signal.emit(7);
        }
        signal.emit(8);

        assert_eq!(*log.lock(), [7]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_handler_may_disconnect_during_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&signal);
        let counter = calls.clone();
        signal.connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(signal) = weak.upgrade() {
                signal.disconnect_all();
            }
        });

        signal.emit(());
        signal.emit(());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }
}
