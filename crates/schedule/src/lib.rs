//! Recurring-measurement scheduler for a home telehealth terminal.
//!
//! This crate provides:
//! - Append-only schedule event log (`SCHEDULED`/`STARTED`/`MEASURED`/`TRANSMITTED`)
//! - Pure recurrence computation: next due time, missed-occurrence count, history rows
//! - Polling reconciler publishing live state on a `watch` channel
//! - Chain executor driving an ordered device chain through one measurement round
//! - Filesystem watcher picking up external schedule rewrites via `notify`

pub mod clock;
pub mod error;
pub mod event;
pub mod executor;
pub mod log;
pub mod reconciler;
pub mod recurrence;
pub mod watcher;

pub use clock::{Clock, SystemClock};
pub use error::{Result, ScheduleError};
pub use event::{EventKind, ScheduleEvent};
pub use executor::{ChainExecutor, ExecutorState};
pub use log::ScheduleLog;
pub use reconciler::{RefreshHandle, ScheduleReconciler, ScheduleState};
pub use recurrence::{compute_state, HistoryRow, RowKind, ScheduleComputation};
pub use watcher::ScheduleWatcher;
