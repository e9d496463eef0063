//! Polling reconciler: recomputes live schedule state from the log and
//! publishes it to observers.
//!
//! The reconciler owns the read path to the schedule log and a fixed-delay
//! poll loop. UI tiles, alert banners, and the worker's status logging all
//! subscribe to the same [`watch`](tokio::sync::watch) channel; none of
//! them may mutate scheduler state.

mod core;

#[cfg(test)]
mod tests;

pub use self::core::{RefreshHandle, ScheduleReconciler, ScheduleState};
