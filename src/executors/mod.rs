//! src/executors/mod.rs

/// Capacity of every channel bridging a user callback and a persistence
/// writer. Bounds memory regardless of how prolific the callback is.
pub(crate) const CHANNEL_CAPACITY: usize = 100;

mod map;
pub use map::MapExecutor;

mod reduce;
pub use reduce::ReduceExecutor;
