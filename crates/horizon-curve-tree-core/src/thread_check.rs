//! Owner-thread checks for single-owner structures.
//!
//! A curve tree belongs to whichever thread created it, normally the editor
//! UI thread. [`ThreadAffinity`] remembers that thread so mutating operations
//! can verify they are not being driven from somewhere else.
//!
//! ```
//! use horizon_curve_tree_core::ThreadAffinity;
//!
//! struct Outline {
//!     affinity: ThreadAffinity,
//!     rows: std::cell::Cell<usize>,
//! }
//!
//! impl Outline {
//!     fn push_row(&self) {
//!         self.affinity.debug_check("push_row");
//!         self.rows.set(self.rows.get() + 1);
//!     }
//! }
//!
//! let outline = Outline { affinity: ThreadAffinity::current(), rows: Default::default() };
//! outline.push_row();
//! ```

use std::thread::{self, ThreadId};

use crate::logging::targets;

/// The thread a structure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Binds to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// The owning thread.
    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Whether the calling thread is the owner.
    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics unless called on the owning thread. Runs in every build.
    ///
    /// `operation` names what was attempted and appears in the panic message.
    pub fn check(&self, operation: &str) {
        if !self.is_owner_thread() {
            self.wrong_thread(operation);
        }
    }

    /// Like [`check`](Self::check), but compiled out of release builds.
    #[inline]
    pub fn debug_check(&self, operation: &str) {
        if cfg!(debug_assertions) {
            self.check(operation);
        }
    }

    #[cold]
    #[inline(never)]
    fn wrong_thread(&self, operation: &str) -> ! {
        let current = thread::current();
        let name = current.name().unwrap_or("<unnamed>");
        tracing::error!(
            target: targets::CONTRACT,
            operation,
            owner = ?self.owner,
            current = ?current.id(),
            "single-owner structure used from a foreign thread"
        );
        panic!(
            "`{operation}` called on thread \"{name}\" ({:?}), but the structure belongs to thread {:?}; \
             curve trees must only be driven from the thread that created them",
            current.id(),
            self.owner
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_thread_passes() {
        let affinity = ThreadAffinity::current();
        assert!(affinity.is_owner_thread());
        assert_eq!(affinity.owner(), thread::current().id());
        affinity.check("owner");
        affinity.debug_check("owner");
    }

    #[test]
    fn test_foreign_thread_is_detected() {
        let affinity = ThreadAffinity::default();
        let foreign = thread::spawn(move || affinity.is_owner_thread()).join().unwrap();
        assert!(!foreign);
    }

    #[test]
    fn test_foreign_thread_check_panics() {
        let affinity = ThreadAffinity::current();
        let outcome = thread::Builder::new()
            .name("worker".into())
            .spawn(move || affinity.check("remove_item"))
            .unwrap()
            .join();

        let payload = outcome.expect_err("check from a foreign thread must panic");
        let message = payload.downcast_ref::<String>().cloned().unwrap_or_default();
        assert!(message.contains("`remove_item`"));
        assert!(message.contains("\"worker\""));
    }
}
