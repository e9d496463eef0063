//! Collaborator interfaces consumed by the scheduler core.
//!
//! Device drivers (Bluetooth/serial/Continua protocol adapters) and the
//! encryption + transmission pipeline live outside this workspace. The
//! scheduler drives them through these traits and only ever sees a
//! completion report per device and a success/failure outcome per
//! transmission.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::error::DeviceError;

/// Completion report sent by a device when its measurement workflow ends.
///
/// A device reports completion whether or not the patient produced a
/// reading; `has_data` distinguishes the two.
#[derive(Debug, Clone)]
pub struct MeasurementOutcome {
    pub device_id: String,
    pub has_data: bool,
}

/// Channel on which devices report measurement completion.
pub type CompletionSender = mpsc::UnboundedSender<MeasurementOutcome>;

/// One captured reading. The payload is opaque to the scheduler; the
/// transmission pipeline interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub device_id: String,
    pub taken_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// A single measurement component (blood pressure cuff, scales, pulse
/// oximeter, questionnaire, ...).
#[async_trait]
pub trait MeasurementDevice: Send + Sync {
    /// Identifier used in schedule log device chains.
    fn device_id(&self) -> &str;

    /// Prepare the driver. Failure keeps the device out of the registry.
    async fn init(&self) -> Result<(), DeviceError>;

    /// Clear any per-run buffered reading.
    fn reset_device(&self);

    /// Whether the current run of the workflow captured data.
    fn has_data(&self) -> bool;

    /// Take the buffered reading, clearing it.
    fn take_data(&self) -> Option<MeasurementResult>;

    /// Start the measurement workflow. The device reports on `done` when
    /// the patient finishes (or skips) the reading; it must not block the
    /// caller.
    fn begin_measurement(&self, done: CompletionSender);
}

/// Transmission pipeline for one completed measurement round.
#[async_trait]
pub trait Transmitter: Send + Sync {
    /// Send one round. Success or failure is the only signal the
    /// scheduler acts on.
    async fn transmit(&self, epoch: Uuid, payloads: Vec<MeasurementResult>)
        -> Result<(), DeviceError>;
}

/// Lookup table of registered measurement devices, keyed by device id.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Arc<dyn MeasurementDevice>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Initialise a driver and add it to the registry.
    ///
    /// Init failure is propagated and the driver is not registered.
    pub async fn register(&mut self, device: Arc<dyn MeasurementDevice>) -> Result<(), DeviceError> {
        device.init().await?;
        let id = device.device_id().to_string();
        info!(device_id = %id, "registered measurement device");
        self.devices.insert(id, device);
        Ok(())
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<dyn MeasurementDevice>> {
        self.devices.get(device_id).cloned()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
