//! Controller loop timing.

/// Seconds between two ApplicationSet reconcile passes.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 10;

/// Seconds between two owner garbage collection passes.
pub const DEFAULT_GC_INTERVAL_SECS: u64 = 30;
