//! Filesystem watcher for the schedule log (external-edit pickup).
//!
//! Clinicians push new schedules by rewriting the log file over SFTP; the
//! watcher notices the change and asks the reconciler for an immediate
//! refresh instead of waiting for the next poll tick. Bursts of events
//! from a single rewrite are debounced into one request. The watcher is an
//! accelerator only: if it cannot start, polling still picks the change up.

mod core;

#[cfg(test)]
mod tests;

pub use self::core::ScheduleWatcher;
