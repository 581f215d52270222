//! Core systems for Horizon Curve Tree.
//!
//! This crate provides the infrastructure the curve tree is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Contract Checks**: Loud reporting of caller bugs via [`ensure_always!`]
//! - **Thread Affinity**: Single-owner verification for UI-thread structures
//! - **Logging**: `tracing` targets and span names for every subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_curve_tree_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

pub mod contract;
pub mod logging;
pub mod signal;
pub mod thread_check;

pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
