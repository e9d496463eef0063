//! Pure recurrence computation over schedule log events.
//!
//! [`compute_state`] derives the current occurrence window, the next due
//! time, and the missed-occurrence count from the raw event list. It holds
//! no state of its own: the reconciler calls it afresh on every poll, so
//! clock changes between polls can never corrupt the counts.

mod calculator;
mod computation;


pub use self::calculator::compute_state;
pub use self::computation::{HistoryRow, RowKind, ScheduleComputation};
