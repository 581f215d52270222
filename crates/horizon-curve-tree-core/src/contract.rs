//! Programmer-contract checks.
//!
//! A contract violation is a caller bug: selecting an item that does not
//! exist, mutating a tree from inside its own change notification, compacting
//! storage while an update scope is open. These are never silently ignored.
//! [`ensure_always!`](crate::ensure_always) reports them at error level on the
//! [`CONTRACT`](crate::logging::targets::CONTRACT) target and, while panics are
//! enabled, panics so the bug surfaces during development.
//!
//! Panics are enabled by default in debug builds and disabled in release
//! builds, where the violating operation is skipped instead. The setting is
//! per thread.
//!
//! ```
//! use horizon_curve_tree_core::ensure_always;
//!
//! horizon_curve_tree_core::contract::set_contract_panics_enabled(false);
//! let exists = false;
//! if !ensure_always!(exists, "item {} does not exist", 7) {
//!     // skip the operation
//! }
//! ```

use std::cell::Cell;

use crate::logging::targets;

thread_local! {
    static CONTRACT_PANICS: Cell<bool> = const { Cell::new(cfg!(debug_assertions)) };
}

/// Enable or disable panicking on contract violations for the current thread.
pub fn set_contract_panics_enabled(enabled: bool) {
    CONTRACT_PANICS.with(|flag| flag.set(enabled));
}

/// Whether contract violations panic on the current thread.
#[inline]
pub fn are_contract_panics_enabled() -> bool {
    CONTRACT_PANICS.with(Cell::get)
}

/// Evaluates a condition that must hold, reporting a violation if it does not.
///
/// Expands to a `bool` expression carrying the condition's value, so callers
/// can skip the offending work when panics are disabled.
#[macro_export]
macro_rules! ensure_always {
    ($cond:expr, $($arg:tt)+) => {{
        let holds: bool = $cond;
        if !holds {
            $crate::contract::contract_violated(&format!($($arg)+), file!(), line!());
        }
        holds
    }};
}

/// Reports a contract violation. Called by [`ensure_always!`](crate::ensure_always).
///
/// Does not panic while the thread is already unwinding.
#[cold]
#[inline(never)]
#[doc(hidden)]
pub fn contract_violated(msg: &str, file: &str, line: u32) {
    tracing::error!(target: targets::CONTRACT, file, line, "contract violation: {msg}");
    if are_contract_panics_enabled() && !std::thread::panicking() {
        panic!("contract violation: {msg} ({file}:{line})");
    }
}
