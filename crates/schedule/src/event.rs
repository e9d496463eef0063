//! Schedule log record types and the line codec.
//!
//! One event per line, whitespace-tokenized:
//! `<uuid> <KIND> <ISO-8601-instant> <repeatMinutes> <deviceId>[ <deviceId>...]`
//!
//! Lines starting with `#` are comments; blank lines are ignored. The
//! timestamp is serialized to whole-second precision UTC (`Z` suffix).

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ScheduleError;

/// Kind of a schedule log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// When the schedule was (re)set: due time, repeat period, device chain.
    /// All occurrence windows are derived from the latest `Scheduled` line.
    Scheduled,
    /// A chain run started.
    Started,
    /// A single device captured data during a run.
    Measured,
    /// A completed run was transmitted to the clinician service.
    Transmitted,
    /// Synthetic only: an occurrence window elapsed with no transmission.
    /// Derived by the calculator for display, never authoritative when
    /// read back from the log.
    Missing,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Scheduled => "SCHEDULED",
            EventKind::Started => "STARTED",
            EventKind::Measured => "MEASURED",
            EventKind::Transmitted => "TRANSMITTED",
            EventKind::Missing => "MISSING",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "SCHEDULED" => Some(EventKind::Scheduled),
            "STARTED" => Some(EventKind::Started),
            "MEASURED" => Some(EventKind::Measured),
            "TRANSMITTED" => Some(EventKind::Transmitted),
            "MISSING" => Some(EventKind::Missing),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record in the schedule log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEvent {
    /// Groups events belonging to the same schedule epoch.
    pub id: Uuid,
    pub kind: EventKind,
    pub time: DateTime<Utc>,
    /// Repeat period in minutes. Only meaningful on `Scheduled`/`Started`
    /// records; copied forward onto the other kinds.
    pub repeat_minutes: u32,
    /// Ordered device chain for this occurrence.
    pub devices: Vec<String>,
}

impl ScheduleEvent {
    pub fn new(
        id: Uuid,
        kind: EventKind,
        time: DateTime<Utc>,
        repeat_minutes: u32,
        devices: Vec<String>,
    ) -> Self {
        Self {
            id,
            kind,
            time,
            repeat_minutes,
            devices,
        }
    }

    /// Serialize to one log line (no trailing newline).
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} {} {} {}",
            self.id,
            self.kind,
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.repeat_minutes,
        );
        for device in &self.devices {
            line.push(' ');
            line.push_str(device);
        }
        line
    }

    /// Parse one non-comment, non-blank log line. `line_no` is 1-based and
    /// used only for error reporting.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, ScheduleError> {
        let corrupted = |reason: String| ScheduleError::LogCorrupted {
            line: line_no,
            reason,
        };

        let mut tokens = line.split_whitespace();
        let id_tok = tokens.next();
        let kind_tok = tokens.next();
        let time_tok = tokens.next();
        let repeat_tok = tokens.next();
        let (id_tok, kind_tok, time_tok, repeat_tok) = match (id_tok, kind_tok, time_tok, repeat_tok)
        {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => return Err(corrupted("expected at least 4 fields".to_string())),
        };

        let id = Uuid::parse_str(id_tok)
            .map_err(|e| corrupted(format!("bad event id '{id_tok}': {e}")))?;
        let kind = EventKind::parse(kind_tok)
            .ok_or_else(|| corrupted(format!("unknown event kind '{kind_tok}'")))?;
        let time = DateTime::parse_from_rfc3339(time_tok)
            .map_err(|e| corrupted(format!("bad timestamp '{time_tok}': {e}")))?
            .with_timezone(&Utc);
        let repeat_minutes: u32 = repeat_tok
            .parse()
            .map_err(|e| corrupted(format!("bad repeat minutes '{repeat_tok}': {e}")))?;

        let devices: Vec<String> = tokens.map(String::from).collect();

        Ok(Self {
            id,
            kind,
            time,
            repeat_minutes,
            devices,
        })
    }
}
