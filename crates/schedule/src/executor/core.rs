//! Core [`ChainExecutor`] struct: the run state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vitalink_core::device::{CompletionSender, DeviceRegistry, MeasurementOutcome, Transmitter};

use crate::clock::Clock;
use crate::error::{Result, ScheduleError};
use crate::event::{EventKind, ScheduleEvent};
use crate::log::ScheduleLog;
use crate::reconciler::RefreshHandle;

use super::context::RunContext;

/// Observable run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    /// Measuring; `device_index` is the position in the chain.
    Running { device_index: usize },
    /// Chain exhausted, awaiting the transmission outcome.
    Transmitting,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutorState {
    fn is_active(&self) -> bool {
        matches!(
            self,
            ExecutorState::Running { .. } | ExecutorState::Transmitting
        )
    }
}

struct Inner {
    state: ExecutorState,
    run: Option<RunContext>,
    /// Why the last run settled as `Failed`; cleared when a new run starts.
    last_error: Option<ScheduleError>,
}

/// Decision taken under the state lock, acted on after releasing it.
enum Step {
    Invoke(String),
    Transmit,
    Ignore,
}

/// Walks an ordered device chain through one measurement round.
///
/// Exactly one run may be in progress per executor; `start` is
/// check-and-set. Devices report back via [`advance`](ChainExecutor::advance)
/// (normally pumped from the completion channel); when the chain is
/// exhausted the collected readings go to the transmitter, and only a
/// successful transmission writes the run's events to the log, as one
/// batch.
pub struct ChainExecutor<C: Clock> {
    devices: DeviceRegistry,
    transmitter: Arc<dyn Transmitter>,
    log: Arc<ScheduleLog>,
    clock: C,
    refresh: RefreshHandle,
    /// Shared with the reconciler, which skips polling while raised.
    run_active: Arc<AtomicBool>,
    inner: Mutex<Inner>,
    completion_tx: CompletionSender,
    completion_rx: Mutex<Option<mpsc::UnboundedReceiver<MeasurementOutcome>>>,
}

impl<C: Clock> ChainExecutor<C> {
    pub fn new(
        devices: DeviceRegistry,
        transmitter: Arc<dyn Transmitter>,
        log: Arc<ScheduleLog>,
        clock: C,
        refresh: RefreshHandle,
        run_active: Arc<AtomicBool>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            devices,
            transmitter,
            log,
            clock,
            refresh,
            run_active,
            inner: Mutex::new(Inner {
                state: ExecutorState::Idle,
                run: None,
                last_error: None,
            }),
            completion_tx,
            completion_rx: Mutex::new(Some(completion_rx)),
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.inner.lock().expect("executor lock poisoned").state
    }

    /// Why the last run settled as [`ExecutorState::Failed`], if it did.
    pub fn last_failure(&self) -> Option<String> {
        self.inner
            .lock()
            .expect("executor lock poisoned")
            .last_error
            .as_ref()
            .map(|e| e.to_string())
    }

    /// Pump device completion reports into [`advance`](Self::advance).
    /// Call once after wiring; panics if called twice.
    pub fn spawn_completion_pump(self: &Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
    {
        let mut rx = self
            .completion_rx
            .lock()
            .expect("executor lock poisoned")
            .take()
            .expect("completion pump already spawned");
        let executor = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(outcome) = rx.recv().await {
                executor.advance(&outcome.device_id, outcome.has_data).await;
            }
        })
    }

    /// Start one run over `chain`.
    ///
    /// Fails with [`ScheduleError::AlreadyRunning`] when a run is in
    /// progress, and with [`ScheduleError::DeviceNotFound`] when the chain
    /// names an unregistered device; in both cases nothing is appended to
    /// the log and no device is invoked.
    pub async fn start(
        &self,
        chain: &[String],
        repeat_minutes: u32,
        scheduled_run: bool,
    ) -> Result<Uuid> {
        if chain.is_empty() {
            return Err(ScheduleError::EmptyChain);
        }
        for device_id in chain {
            if !self.devices.contains(device_id) {
                error!(device_id = %device_id, "schedule names a device that is not registered");
                return Err(ScheduleError::DeviceNotFound(device_id.clone()));
            }
        }

        let epoch = Uuid::new_v4();
        {
            let mut inner = self.inner.lock().expect("executor lock poisoned");
            if inner.state.is_active() {
                return Err(ScheduleError::AlreadyRunning);
            }
            let started = ScheduleEvent::new(
                epoch,
                EventKind::Started,
                self.clock.now(),
                repeat_minutes,
                chain.to_vec(),
            );
            inner.run = Some(RunContext {
                epoch,
                chain: chain.to_vec(),
                index: 0,
                scheduled_run,
                repeat_minutes,
                buffered: vec![started],
                results: Vec::new(),
            });
            inner.state = ExecutorState::Running { device_index: 0 };
            inner.last_error = None;
            self.run_active.store(true, Ordering::SeqCst);
        }

        for device_id in chain {
            if let Some(device) = self.devices.get(device_id) {
                device.reset_device();
            }
        }

        info!(
            epoch = %epoch,
            devices = ?chain,
            scheduled_run,
            "schedule run started"
        );
        self.invoke_device(&chain[0]);
        Ok(epoch)
    }

    /// Completion report from a device.
    ///
    /// Buffers a `MEASURED` event when the device captured data, then
    /// invites the next device; the chain advances regardless of
    /// `has_data`. An exhausted chain hands off to the transmitter. Late
    /// reports after cancellation or completion are ignored.
    pub async fn advance(&self, device_id: &str, has_data: bool) {
        let step = {
            let mut inner = self.inner.lock().expect("executor lock poisoned");
            if !matches!(inner.state, ExecutorState::Running { .. }) {
                debug!(device_id = %device_id, "ignoring completion report outside a run");
                Step::Ignore
            } else {
                let ctx = inner.run.as_mut().expect("running without context");
                if ctx.current_device() != Some(device_id) {
                    warn!(
                        device_id = %device_id,
                        expected = ?ctx.current_device(),
                        "completion report from unexpected device ignored"
                    );
                    Step::Ignore
                } else {
                    if has_data {
                        let measured = ScheduleEvent::new(
                            ctx.epoch,
                            EventKind::Measured,
                            self.clock.now(),
                            ctx.repeat_minutes,
                            vec![device_id.to_string()],
                        );
                        ctx.buffered.push(measured);
                        if let Some(result) =
                            self.devices.get(device_id).and_then(|d| d.take_data())
                        {
                            ctx.results.push(result);
                        }
                    }
                    ctx.index += 1;
                    let next_index = ctx.index;
                    match ctx.current_device().map(str::to_string) {
                        Some(next) => {
                            inner.state = ExecutorState::Running {
                                device_index: next_index,
                            };
                            Step::Invoke(next)
                        }
                        None => {
                            inner.state = ExecutorState::Transmitting;
                            Step::Transmit
                        }
                    }
                }
            }
        };

        match step {
            Step::Invoke(next) => self.invoke_device(&next),
            Step::Transmit => self.run_transmission().await,
            Step::Ignore => {}
        }
    }

    /// Cancel an in-progress run. No further devices are invited and
    /// nothing is appended to the log; an in-flight device measurement or
    /// transmission may still complete but its report is discarded.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().expect("executor lock poisoned");
        if !inner.state.is_active() {
            return;
        }
        let epoch = inner.run.as_ref().map(|c| c.epoch);
        inner.state = ExecutorState::Cancelled;
        inner.run = None;
        self.run_active.store(false, Ordering::SeqCst);
        info!(epoch = ?epoch, "schedule run cancelled");
        self.refresh.request();
    }

    fn invoke_device(&self, device_id: &str) {
        match self.devices.get(device_id) {
            Some(device) => {
                debug!(device_id = %device_id, "inviting device to measure");
                device.begin_measurement(self.completion_tx.clone());
            }
            None => {
                // chain was validated at start; losing a device mid-run is
                // an operator-level fault
                error!(device_id = %device_id, "device disappeared mid-run, aborting");
                self.fail_run(ScheduleError::DeviceNotFound(device_id.to_string()));
            }
        }
    }

    /// Hand the collected round to the transmitter and settle the run.
    async fn run_transmission(&self) {
        let (epoch, payloads, scheduled_run) = {
            let inner = self.inner.lock().expect("executor lock poisoned");
            match (&inner.state, &inner.run) {
                (ExecutorState::Transmitting, Some(ctx)) => {
                    (ctx.epoch, ctx.results.clone(), ctx.scheduled_run)
                }
                _ => return,
            }
        };

        info!(
            epoch = %epoch,
            readings = payloads.len(),
            scheduled_run,
            "transmitting schedule run"
        );
        let outcome = self.transmitter.transmit(epoch, payloads).await;

        let mut inner = self.inner.lock().expect("executor lock poisoned");
        if inner.state != ExecutorState::Transmitting {
            // cancelled while the transmission was in flight
            debug!(epoch = %epoch, "discarding transmission outcome for a cancelled run");
            return;
        }
        let ctx = inner.run.take().expect("transmitting without context");

        match outcome {
            Ok(()) => {
                let mut batch = ctx.buffered;
                batch.push(ScheduleEvent::new(
                    ctx.epoch,
                    EventKind::Transmitted,
                    self.clock.now(),
                    ctx.repeat_minutes,
                    ctx.chain,
                ));
                match self.log.append_batch(&batch) {
                    Ok(()) => {
                        inner.state = ExecutorState::Completed;
                        info!(epoch = %epoch, "schedule run completed");
                    }
                    Err(e) => {
                        // the remote side has the round but our log does
                        // not: the occurrence stays missed locally and the
                        // whole round is retried next time
                        inner.state = ExecutorState::Failed;
                        error!(
                            epoch = %epoch,
                            error = %e,
                            "transmission succeeded but the schedule log append failed"
                        );
                        inner.last_error = Some(e);
                    }
                }
            }
            Err(e) => {
                inner.state = ExecutorState::Failed;
                warn!(epoch = %epoch, error = %e, "transmission failed, run will be retried");
                inner.last_error = Some(ScheduleError::TransmissionFailed(e.to_string()));
            }
        }

        self.run_active.store(false, Ordering::SeqCst);
        drop(inner);
        self.refresh.request();
    }

    fn fail_run(&self, error: ScheduleError) {
        let mut inner = self.inner.lock().expect("executor lock poisoned");
        if !inner.state.is_active() {
            return;
        }
        inner.state = ExecutorState::Failed;
        inner.run = None;
        inner.last_error = Some(error);
        self.run_active.store(false, Ordering::SeqCst);
        drop(inner);
        self.refresh.request();
    }
}
