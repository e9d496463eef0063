//! The occurrence-window walk: due time, missed count, history rows.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Result, ScheduleError};
use crate::event::{EventKind, ScheduleEvent};

use super::computation::{HistoryRow, RowKind, ScheduleComputation};

/// Compute live schedule state from the full event list.
///
/// Occurrence windows `[start, start + repeat)` are walked forward from the
/// latest `SCHEDULED` timestamp. A window counts as missed when it elapsed
/// with the latest transmission still before its end; windows starting
/// inside the retention period additionally get a synthetic `MISSING` row
/// when no transmission falls inside them.
///
/// Fails with [`ScheduleError::NoValidSchedule`] when the log has no
/// `SCHEDULED` entry or the latest one is in the future, and with
/// [`ScheduleError::InvalidRepeat`] when its repeat period is zero (the
/// walk would never advance).
pub fn compute_state(
    events: &[ScheduleEvent],
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<ScheduleComputation> {
    let scheduled = events
        .iter()
        .filter(|e| e.kind == EventKind::Scheduled)
        .max_by_key(|e| e.time)
        .ok_or(ScheduleError::NoValidSchedule)?;
    if scheduled.time > now {
        return Err(ScheduleError::NoValidSchedule);
    }
    if scheduled.repeat_minutes == 0 {
        return Err(ScheduleError::InvalidRepeat);
    }

    let transmitted: Vec<&ScheduleEvent> = events
        .iter()
        .filter(|e| e.kind == EventKind::Transmitted)
        .collect();
    // sentinel: "never transmitted" sorts before every window end
    let latest_transmitted = transmitted
        .iter()
        .map(|e| e.time)
        .max()
        .unwrap_or(DateTime::UNIX_EPOCH);

    let repeat = Duration::minutes(i64::from(scheduled.repeat_minutes));
    let retention_start = now - Duration::days(i64::from(retention_days));

    let mut missed_count = 0u32;
    let mut missing_rows = Vec::new();
    let mut window_end = scheduled.time + repeat;
    let (current_window_start, next_due) = loop {
        let window_start = window_end - repeat;

        if window_start > retention_start {
            let satisfied = transmitted
                .iter()
                .any(|e| e.time >= window_start && e.time < window_end);
            if !satisfied {
                missing_rows.push(HistoryRow {
                    kind: RowKind::Missing,
                    time: window_start,
                    epoch: scheduled.id,
                    devices: scheduled.devices.clone(),
                });
            }
        }

        // a window whose end is exactly `now` is due, not yet missed
        if window_end >= now {
            break (window_start, window_end);
        }
        if latest_transmitted < window_end {
            missed_count += 1;
        }
        window_end += repeat;
    };

    let mut historical_rows: Vec<HistoryRow> = transmitted
        .iter()
        .filter(|e| e.time > retention_start)
        .map(|e| HistoryRow {
            kind: RowKind::Transmitted,
            time: e.time,
            epoch: e.id,
            devices: e.devices.clone(),
        })
        .collect();
    historical_rows.push(HistoryRow {
        kind: if missed_count == 0 {
            RowKind::ScheduleDueAt
        } else {
            RowKind::ScheduleNowDue
        },
        time: next_due,
        epoch: scheduled.id,
        devices: scheduled.devices.clone(),
    });
    historical_rows.sort_by(|a, b| b.time.cmp(&a.time));

    Ok(ScheduleComputation {
        epoch: scheduled.id,
        repeat_minutes: scheduled.repeat_minutes,
        devices: scheduled.devices.clone(),
        current_window_start,
        next_due,
        missed_count,
        historical_rows,
        missing_rows,
    })
}
