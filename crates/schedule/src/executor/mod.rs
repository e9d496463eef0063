//! Chain executor: drives the ordered device chain through one
//! measurement round and hands the result to the transmission pipeline.
//!
//! Each device reports completion as a message; the executor owns a plain
//! queue and index rather than chaining callbacks between device
//! workflows. Nothing touches the durable log until the whole round has been
//! transmitted: a crashed, cancelled, or failed run leaves the log exactly
//! as it was, and the occurrence is simply counted as missed on the next
//! reconciliation.

mod context;
mod core;


pub use self::core::{ChainExecutor, ExecutorState};
