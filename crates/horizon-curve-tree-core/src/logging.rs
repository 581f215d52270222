//! Logging facilities for Horizon Curve Tree.
//!
//! Horizon Curve Tree uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_curve_tree=debug")
//!     .init();
//! ```
//!
//! The constants in [`targets`] name the subsystems so they can be filtered
//! individually, and [`PerfSpan`] measures the duration of an operation.

/// Span names used throughout Horizon Curve Tree for tracing.
pub mod span_names {
    /// A full filter run over the tree.
    pub const FILTER_RUN: &str = "horizon_curve_tree::filter_run";
    /// A selection replacement.
    pub const SELECTION: &str = "horizon_curve_tree::selection";
    /// Closing the outermost update scope.
    pub const EVENT_FLUSH: &str = "horizon_curve_tree::event_flush";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_curve_tree_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_curve_tree_core::signal";
    /// Contract violation reports.
    pub const CONTRACT: &str = "horizon_curve_tree_core::contract";
    /// Item store: insertion, removal, compaction.
    pub const TREE: &str = "horizon_curve_tree::tree";
    /// Filter engine.
    pub const FILTER: &str = "horizon_curve_tree::filter";
    /// Selection engine.
    pub const SELECTION: &str = "horizon_curve_tree::selection";
    /// Event coalescing and notification.
    pub const EVENTS: &str = "horizon_curve_tree::events";
    /// Curve model lifecycle.
    pub const CURVES: &str = "horizon_curve_tree::curves";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: "horizon_curve_tree::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
