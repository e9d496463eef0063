//! Core [`ScheduleReconciler`] struct: poll loop, refresh requests, observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::log::ScheduleLog;
use crate::recurrence::{compute_state, ScheduleComputation};

/// Observable schedule state.
///
/// `Unavailable` covers every locally-recovered error: unreadable or
/// corrupt log, no valid `SCHEDULED` entry. Consumers must disable
/// "run now" while the state is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleState {
    Unavailable { reason: String },
    Ready(ScheduleComputation),
}

impl ScheduleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ScheduleState::Ready(_))
    }
}

/// Cloneable handle for requesting an immediate reconciliation from
/// another task (file watcher, chain executor, UI visibility hook).
///
/// Requests are queued; no parsing or recurrence computation runs on the
/// sender's thread.
#[derive(Clone)]
pub struct RefreshHandle(mpsc::UnboundedSender<()>);

impl RefreshHandle {
    pub fn new(tx: mpsc::UnboundedSender<()>) -> Self {
        Self(tx)
    }

    pub fn request(&self) {
        let _ = self.0.send(());
    }
}

/// Recomputes schedule state from the log on a fixed-delay poll and on
/// demand, publishing the result on a watch channel.
pub struct ScheduleReconciler<C: Clock> {
    log: Arc<ScheduleLog>,
    clock: C,
    retention_days: u32,
    poll_period: Duration,
    /// Set by the chain executor for the duration of one run; while raised,
    /// reconciliation is a no-op so observers are not rewritten mid-run.
    run_active: Arc<AtomicBool>,
    state_tx: watch::Sender<ScheduleState>,
    alert_raised: AtomicBool,
}

impl<C: Clock> ScheduleReconciler<C> {
    pub fn new(
        log: Arc<ScheduleLog>,
        clock: C,
        retention_days: u32,
        poll_period: Duration,
        run_active: Arc<AtomicBool>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScheduleState::Unavailable {
            reason: "not yet reconciled".to_string(),
        });
        Self {
            log,
            clock,
            retention_days,
            poll_period,
            run_active,
            state_tx,
            alert_raised: AtomicBool::new(false),
        }
    }

    /// Subscribe to state changes. Any number of observers may subscribe;
    /// each sees the latest published state.
    pub fn subscribe(&self) -> watch::Receiver<ScheduleState> {
        self.state_tx.subscribe()
    }

    /// Latest published state.
    pub fn current(&self) -> ScheduleState {
        self.state_tx.borrow().clone()
    }

    /// Recompute state from the log immediately and publish it.
    ///
    /// No-op while a chain run is in progress. Errors degrade the state
    /// rather than propagate: the next poll or refresh retries.
    pub fn refresh_now(&self) -> ScheduleState {
        if self.run_active.load(Ordering::SeqCst) {
            debug!("skipping reconciliation while a schedule run is in progress");
            return self.current();
        }

        let computed = self
            .log
            .read_all()
            .and_then(|events| compute_state(&events, self.retention_days, self.clock.now()));

        let state = match computed {
            Ok(comp) => {
                if comp.due_now() {
                    if !self.alert_raised.swap(true, Ordering::SeqCst) {
                        warn!(
                            missed = comp.missed_count,
                            next_due = %comp.next_due,
                            "scheduled measurements are overdue"
                        );
                    }
                } else if self.alert_raised.swap(false, Ordering::SeqCst) {
                    info!(next_due = %comp.next_due, "schedule alert cleared");
                }
                ScheduleState::Ready(comp)
            }
            Err(e) => {
                error!(error = %e, path = %self.log.path().display(), "failed to reconcile schedule from log");
                ScheduleState::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        self.state_tx.send_replace(state.clone());
        state
    }

    /// Poll loop. Reconciles once at startup, then on every fixed-delay
    /// tick and every queued refresh request. Exits when all refresh
    /// handles are dropped.
    pub async fn run(self: Arc<Self>, mut refresh_rx: mpsc::UnboundedReceiver<()>) {
        info!(
            period_secs = self.poll_period.as_secs(),
            retention_days = self.retention_days,
            "schedule reconciler started"
        );
        self.refresh_now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_period) => {
                    self.refresh_now();
                }
                msg = refresh_rx.recv() => {
                    match msg {
                        Some(()) => {
                            self.refresh_now();
                        }
                        None => {
                            info!("all refresh handles dropped, reconciler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}
