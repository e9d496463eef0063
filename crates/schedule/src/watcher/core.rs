//! Core [`ScheduleWatcher`] struct: notify subscription plus debounce task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::reconciler::RefreshHandle;

/// Quiet window a file rewrite must observe before one refresh is issued.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the schedule log's directory and requests a reconciliation
/// after the file changes on disk.
///
/// Dropping the watcher stops both the filesystem subscription and the
/// debounce task.
pub struct ScheduleWatcher {
    _watcher: RecommendedWatcher,
    _task: tokio::task::JoinHandle<()>,
}

impl ScheduleWatcher {
    /// Start watching `log_path` and forward debounced change
    /// notifications to `refresh`. Must be called from within a tokio
    /// runtime.
    pub fn spawn(log_path: &Path, refresh: RefreshHandle) -> Result<Self> {
        let file_name = log_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("schedule.log"));
        let watch_dir = match log_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (fs_tx, fs_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if is_log_change(&event, &file_name) {
                        let _ = fs_tx.send(());
                    }
                }
                Err(e) => warn!(error = %e, "schedule file watcher error"),
            },
        )?;

        // the log file itself may not exist yet; watch its directory
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        info!(path = %log_path.display(), "watching schedule log for external changes");
        let task = tokio::spawn(debounce_loop(fs_rx, refresh));

        Ok(Self {
            _watcher: watcher,
            _task: task,
        })
    }
}

fn is_log_change(event: &Event, file_name: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == file_name.file_name())
}

/// Collapse a burst of change events into a single refresh request once
/// the file has been quiet for [`DEBOUNCE`].
pub(super) async fn debounce_loop(mut rx: mpsc::UnboundedReceiver<()>, refresh: RefreshHandle) {
    while rx.recv().await.is_some() {
        while tokio::time::timeout(DEBOUNCE, rx.recv())
            .await
            .is_ok_and(|msg| msg.is_some())
        {}
        debug!("schedule log changed on disk, requesting reconciliation");
        refresh.request();
    }
}
