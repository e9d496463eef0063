//! Tests for the schedule reconciler.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::FixedClock;
use crate::event::{EventKind, ScheduleEvent};
use crate::log::ScheduleLog;

use super::{ScheduleReconciler, ScheduleState};

fn at(s: &str) -> DateTime<Utc> {
    s.parse().expect("test timestamp")
}

struct Fixture {
    _dir: tempfile::TempDir,
    log: Arc<ScheduleLog>,
    clock: Arc<FixedClock>,
    run_active: Arc<AtomicBool>,
    reconciler: Arc<ScheduleReconciler<Arc<FixedClock>>>,
}

fn fixture(now: &str) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Arc::new(ScheduleLog::new(dir.path().join("schedule.log")));
    let clock = Arc::new(FixedClock::new(at(now)));
    let run_active = Arc::new(AtomicBool::new(false));
    let reconciler = Arc::new(ScheduleReconciler::new(
        Arc::clone(&log),
        Arc::clone(&clock),
        7,
        Duration::from_secs(10),
        Arc::clone(&run_active),
    ));
    Fixture {
        _dir: dir,
        log,
        clock,
        run_active,
        reconciler,
    }
}

fn scheduled(time: &str, repeat: u32) -> ScheduleEvent {
    ScheduleEvent::new(
        Uuid::new_v4(),
        EventKind::Scheduled,
        at(time),
        repeat,
        vec!["devA".to_string(), "devB".to_string()],
    )
}

#[test]
fn valid_log_publishes_ready_state() {
    let f = fixture("2024-01-03T00:00:00Z");
    f.log.append(&scheduled("2024-01-01T00:00:00Z", 1440)).unwrap();

    let state = f.reconciler.refresh_now();

    match state {
        ScheduleState::Ready(comp) => {
            assert_eq!(comp.missed_count, 1);
            assert_eq!(comp.next_due, at("2024-01-03T00:00:00Z"));
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[test]
fn missing_log_degrades_to_unavailable() {
    let f = fixture("2024-01-03T00:00:00Z");

    let state = f.reconciler.refresh_now();

    assert!(matches!(state, ScheduleState::Unavailable { .. }));
}

#[test]
fn corrupt_log_degrades_and_recovers_after_fix() {
    let f = fixture("2024-01-03T00:00:00Z");
    let path = f.log.path().to_path_buf();
    fs::write(&path, "garbage line\n").unwrap();

    assert!(matches!(
        f.reconciler.refresh_now(),
        ScheduleState::Unavailable { .. }
    ));

    // operator replaces the log with a valid one; the next refresh recovers
    fs::write(&path, scheduled("2024-01-01T00:00:00Z", 1440).to_line()).unwrap();
    assert!(f.reconciler.refresh_now().is_ready());
}

#[test]
fn refresh_is_noop_while_run_in_progress() {
    let f = fixture("2024-01-03T00:00:00Z");
    f.log.append(&scheduled("2024-01-01T00:00:00Z", 1440)).unwrap();
    f.reconciler.refresh_now();

    f.run_active.store(true, Ordering::SeqCst);
    f.clock.set(at("2024-01-05T00:00:00Z"));
    let during_run = f.reconciler.refresh_now();

    // still the state computed before the run started
    match during_run {
        ScheduleState::Ready(comp) => assert_eq!(comp.missed_count, 1),
        other => panic!("expected Ready, got {other:?}"),
    }

    f.run_active.store(false, Ordering::SeqCst);
    match f.reconciler.refresh_now() {
        ScheduleState::Ready(comp) => assert_eq!(comp.missed_count, 3),
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn observers_see_published_state() {
    let f = fixture("2024-01-03T00:00:00Z");
    f.log.append(&scheduled("2024-01-01T00:00:00Z", 1440)).unwrap();

    let mut rx = f.reconciler.subscribe();
    f.reconciler.refresh_now();

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().is_ready());
}

#[test]
fn advancing_clock_raises_missed_count_for_observers() {
    let f = fixture("2024-01-02T12:00:00Z");
    f.log.append(&scheduled("2024-01-01T00:00:00Z", 1440)).unwrap();

    let first = match f.reconciler.refresh_now() {
        ScheduleState::Ready(c) => c.missed_count,
        other => panic!("expected Ready, got {other:?}"),
    };

    f.clock.set(at("2024-01-06T00:00:01Z"));
    let later = match f.reconciler.refresh_now() {
        ScheduleState::Ready(c) => c.missed_count,
        other => panic!("expected Ready, got {other:?}"),
    };

    assert!(later >= first);
    assert_eq!(first, 1);
    assert_eq!(later, 5);
}
