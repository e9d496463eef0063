//! Error taxonomy for the scheduler core.
//!
//! Parse and computation errors (`LogCorrupted`, `NoValidSchedule`,
//! `InvalidRepeat`) are recovered locally by the reconciler: the observable
//! state degrades to `Unavailable` and the next poll retries. Device and
//! transmission errors abort the run they belong to but leave the scheduler
//! healthy for the next cycle.

use thiserror::Error;

/// Errors that can occur in the schedule log, calculator, and executor.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A line in the schedule log could not be parsed. Fatal for the whole
    /// read; the reconciler must not attempt partial recovery.
    #[error("schedule log corrupted at line {line}: {reason}")]
    LogCorrupted { line: usize, reason: String },

    /// No `SCHEDULED` entry, or the latest one is in the future.
    #[error("schedule log contains no valid SCHEDULED entry")]
    NoValidSchedule,

    /// The active `SCHEDULED` entry has a non-positive repeat interval.
    #[error("schedule repeat interval must be a positive number of minutes")]
    InvalidRepeat,

    /// The device chain of the active schedule is empty.
    #[error("schedule has an empty device chain")]
    EmptyChain,

    /// A chain run named a device that is not in the registry.
    #[error("device not found in registry: {0}")]
    DeviceNotFound(String),

    /// The transmission collaborator reported failure.
    #[error("transmission failed: {0}")]
    TransmissionFailed(String),

    /// A chain run was requested while another is in progress.
    #[error("a schedule run is already in progress")]
    AlreadyRunning,

    /// Filesystem I/O error on the schedule log.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem watcher error.
    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for scheduler operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
