//! Value types produced by the recurrence calculator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Kind of a row in the computed schedule history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowKind {
    /// A round was transmitted inside this occurrence window.
    Transmitted,
    /// Synthetic: an occurrence window with no transmission inside it.
    Missing,
    /// Synthetic: the upcoming occurrence, nothing missed yet.
    ScheduleDueAt,
    /// Synthetic: the upcoming occurrence, with missed readings outstanding.
    ScheduleNowDue,
}

impl RowKind {
    pub fn label(&self) -> &'static str {
        match self {
            RowKind::Transmitted => "TRANSMITTED",
            RowKind::Missing => "MISSING",
            RowKind::ScheduleDueAt => "SCHEDULE_DUE_AT",
            RowKind::ScheduleNowDue => "SCHEDULE_NOW_DUE",
        }
    }
}

/// One display row: a historical transmission or a synthetic marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub kind: RowKind,
    pub time: DateTime<Utc>,
    pub epoch: Uuid,
    pub devices: Vec<String>,
}

/// Result of one recurrence computation. A pure value: computing twice
/// from the same events and the same `now` yields identical results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleComputation {
    /// Epoch id of the active `SCHEDULED` entry.
    pub epoch: Uuid,
    /// Repeat period of the active schedule, minutes.
    pub repeat_minutes: u32,
    /// Device chain of the active schedule.
    pub devices: Vec<String>,
    /// Start of the occurrence window containing `now`.
    pub current_window_start: DateTime<Utc>,
    /// End of that window, i.e. when the next round falls due.
    pub next_due: DateTime<Utc>,
    /// Elapsed windows with no transmission, counted from the schedule start.
    pub missed_count: u32,
    /// Transmissions within the retention period plus the due marker,
    /// newest first.
    pub historical_rows: Vec<HistoryRow>,
    /// Synthetic `MISSING` rows for unsatisfied windows within retention.
    pub missing_rows: Vec<HistoryRow>,
}

impl ScheduleComputation {
    /// Whether the patient currently has measurements outstanding.
    pub fn due_now(&self) -> bool {
        self.missed_count > 0
    }

    /// All rows merged for display, newest first.
    pub fn display_rows(&self) -> Vec<HistoryRow> {
        let mut rows = self.historical_rows.clone();
        rows.extend(self.missing_rows.iter().cloned());
        rows.sort_by(|a, b| b.time.cmp(&a.time));
        rows
    }

    /// Human-readable repeat period, e.g. "every 1 day(s)".
    pub fn repeat_summary(&self) -> String {
        let days = f64::from(self.repeat_minutes) / 1440.0;
        format!("every {days} day(s)")
    }
}
