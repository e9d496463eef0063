//! Tests for the schedule file watcher.

use std::fs;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::reconciler::RefreshHandle;

use super::core::debounce_loop;
use super::ScheduleWatcher;

#[tokio::test(start_paused = true)]
async fn burst_of_events_collapses_to_one_refresh() {
    let (fs_tx, fs_rx) = mpsc::unbounded_channel();
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
    tokio::spawn(debounce_loop(fs_rx, RefreshHandle::new(refresh_tx)));

    // a rewrite over SFTP lands as many small writes
    for _ in 0..5 {
        fs_tx.send(()).unwrap();
    }

    refresh_rx.recv().await.expect("one refresh");
    assert!(refresh_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn separate_changes_each_get_a_refresh() {
    let (fs_tx, fs_rx) = mpsc::unbounded_channel();
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();
    tokio::spawn(debounce_loop(fs_rx, RefreshHandle::new(refresh_tx)));

    fs_tx.send(()).unwrap();
    refresh_rx.recv().await.expect("first refresh");

    fs_tx.send(()).unwrap();
    refresh_rx.recv().await.expect("second refresh");
}

#[tokio::test]
async fn file_write_triggers_refresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("schedule.log");
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();

    let _watcher =
        ScheduleWatcher::spawn(&log_path, RefreshHandle::new(refresh_tx)).expect("spawn watcher");
    // give the platform watcher a moment to arm
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(&log_path, "# schedule log\n").unwrap();

    tokio::time::timeout(Duration::from_secs(10), refresh_rx.recv())
        .await
        .expect("refresh within timeout")
        .expect("refresh requested");
}

#[tokio::test]
async fn changes_to_other_files_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("schedule.log");
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel();

    let _watcher =
        ScheduleWatcher::spawn(&log_path, RefreshHandle::new(refresh_tx)).expect("spawn watcher");
    tokio::time::sleep(Duration::from_millis(100)).await;

    fs::write(dir.path().join("other.txt"), "noise\n").unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(refresh_rx.try_recv().is_err());
}

#[tokio::test]
async fn spawn_fails_when_directory_is_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log_path = dir.path().join("no-such-dir").join("schedule.log");
    let (refresh_tx, _refresh_rx) = mpsc::unbounded_channel();

    assert!(ScheduleWatcher::spawn(&log_path, RefreshHandle::new(refresh_tx)).is_err());
}
