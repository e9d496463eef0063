//! Core [`ScheduleLog`] struct: filesystem-backed append/read of schedule events.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::error::Result;
use crate::event::ScheduleEvent;

/// Append-only schedule event log backed by a single file.
///
/// Appends are serialized through one lock so concurrent writers can never
/// interleave partial lines; reads take no lock and parse a consistent
/// snapshot because appends are flushed whole-line.
pub struct ScheduleLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ScheduleLog {
    /// Create a log handle for the given file.
    ///
    /// Creates the parent directory (and parents) if it does not exist.
    /// The file itself is created lazily on first append.
    pub fn new(path: PathBuf) -> Self {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    warn!(path = %dir.display(), error = %e, "failed to create schedule log directory");
                }
            }
        }
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, flushed and synced before returning success.
    pub fn append(&self, event: &ScheduleEvent) -> Result<()> {
        self.append_batch(std::slice::from_ref(event))
    }

    /// Append a batch of events as a single locked write.
    ///
    /// Lines are newline-prefixed to tolerate files without a trailing
    /// newline, so a batch lands either whole or (on crash) as a prefix of
    /// whole lines, never as a partial line followed by another writer's
    /// output.
    pub fn append_batch(&self, events: &[ScheduleEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for event in events {
            buf.push('\n');
            buf.push_str(&event.to_line());
        }

        let _guard = self.write_lock.lock().expect("schedule log lock poisoned");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    /// Parse every non-comment, non-blank line of the log.
    ///
    /// Any malformed line is fatal for the whole read: the caller must
    /// treat the log as corrupted rather than work from a partial list.
    pub fn read_all(&self) -> Result<Vec<ScheduleEvent>> {
        let contents = fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            events.push(ScheduleEvent::parse_line(line, idx + 1)?);
        }
        Ok(events)
    }

    /// Write a commented header plus an initial `SCHEDULED` entry, but only
    /// when the log file does not exist yet. Returns whether seeding
    /// happened. Used when provisioning a new device.
    pub fn seed_if_missing(&self, initial: &ScheduleEvent) -> Result<bool> {
        let _guard = self.write_lock.lock().expect("schedule log lock poisoned");
        if self.path.exists() {
            return Ok(false);
        }
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&self.path)?;
        let header = "# schedule log: one event per line\n\
                      # <uuid> <KIND> <ISO-8601-instant> <repeatMinutes> <deviceId>...";
        write!(file, "{}\n{}", header, initial.to_line())?;
        file.flush()?;
        file.sync_all()?;
        info!(path = %self.path.display(), "seeded new schedule log");
        Ok(true)
    }
}
