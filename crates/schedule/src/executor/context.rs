//! Per-run execution context, owned exclusively by the executor for the
//! life of one run.

use uuid::Uuid;
use vitalink_core::device::MeasurementResult;

use crate::event::ScheduleEvent;

pub(super) struct RunContext {
    /// Epoch id grouping every event of this run.
    pub epoch: Uuid,
    /// Full ordered device chain for the run.
    pub chain: Vec<String>,
    /// Index of the device currently measuring.
    pub index: usize,
    /// Whether this run was started by the scheduler (as opposed to a
    /// patient pressing "run now" ahead of time).
    pub scheduled_run: bool,
    /// Repeat period copied from the active schedule onto every event.
    pub repeat_minutes: u32,
    /// `STARTED` and `MEASURED` events, written to the log only after a
    /// successful transmission.
    pub buffered: Vec<ScheduleEvent>,
    /// Readings collected from devices that reported data.
    pub results: Vec<MeasurementResult>,
}

impl RunContext {
    pub fn current_device(&self) -> Option<&str> {
        self.chain.get(self.index).map(String::as_str)
    }
}
