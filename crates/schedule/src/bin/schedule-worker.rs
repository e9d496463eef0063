//! schedule-worker — headless schedule monitor.
//!
//! Reconciles the schedule log on a fixed-delay poll and on filesystem
//! change, and logs every published state transition: next due time,
//! missed-occurrence count, and the device chain the active schedule
//! names. Measurement runs themselves are driven by the terminal UI
//! through the library API; this worker only observes.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use vitalink_core::config::{load_dotenv, Config};
use vitalink_schedule::{
    RefreshHandle, ScheduleLog, ScheduleReconciler, ScheduleState, ScheduleWatcher, SystemClock,
};

/// Schedule monitor worker; flags override the environment config.
#[derive(Parser, Debug)]
#[command(name = "schedule-worker", version, about)]
struct Cli {
    /// Path to the schedule log file.
    #[arg(long)]
    schedule_file: Option<String>,

    /// Reconciliation poll period in seconds.
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Days of history to keep in computed state.
    #[arg(long)]
    history_days: Option<u32>,
}

/// Log each published state transition, cross-checking the scheduled
/// device chain against the expected one from config.
async fn log_state_changes(
    reconciler: Arc<ScheduleReconciler<SystemClock>>,
    expected_devices: Vec<String>,
) {
    let mut rx = reconciler.subscribe();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        match state {
            ScheduleState::Ready(comp) => {
                info!(
                    next_due = %comp.next_due,
                    missed = comp.missed_count,
                    due_now = comp.due_now(),
                    devices = ?comp.devices,
                    repeat = %comp.repeat_summary(),
                    "schedule state"
                );
                for id in &comp.devices {
                    if !expected_devices.is_empty() && !expected_devices.contains(id) {
                        warn!(device_id = %id, "schedule names a device not in SCHEDULE_DEVICES");
                    }
                }
            }
            ScheduleState::Unavailable { reason } => {
                warn!(reason = %reason, "schedule unavailable");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.schedule_file {
        config.schedule_file = path.into();
    }
    if let Some(secs) = cli.poll_secs {
        config.poll_secs = secs;
    }
    if let Some(days) = cli.history_days {
        config.history_days = days;
    }
    config.log_summary();

    let log = Arc::new(ScheduleLog::new(config.schedule_file.clone()));
    let run_active = Arc::new(AtomicBool::new(false));
    let reconciler = Arc::new(ScheduleReconciler::new(
        Arc::clone(&log),
        SystemClock,
        config.history_days,
        Duration::from_secs(config.poll_secs),
        run_active,
    ));

    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    let refresh = RefreshHandle::new(refresh_tx);

    // the watcher is best-effort; polling alone still picks up changes
    let _watcher = match ScheduleWatcher::spawn(&config.schedule_file, refresh.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "schedule file watcher unavailable, relying on polling only");
            None
        }
    };

    tokio::spawn(log_state_changes(
        Arc::clone(&reconciler),
        config.devices.clone(),
    ));
    tokio::spawn(Arc::clone(&reconciler).run(refresh_rx));

    info!("schedule-worker started");
    tokio::signal::ctrl_c().await?;
    info!("schedule-worker shutting down");
    Ok(())
}
