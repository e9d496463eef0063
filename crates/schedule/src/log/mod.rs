//! Append-only, line-oriented schedule log: the durable source of truth.
//!
//! Every lifecycle event (`SCHEDULED`, `STARTED`, `MEASURED`,
//! `TRANSMITTED`) is one human-readable line. The log is never edited in
//! place and never truncated; all live state is recomputed from it.

mod store;


pub use self::store::ScheduleLog;
