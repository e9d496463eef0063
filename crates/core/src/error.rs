use thiserror::Error;

/// Errors raised by measurement-device and transmission collaborators.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device initialisation failed: {0}")]
    Init(String),

    #[error("measurement failed: {0}")]
    Measurement(String),

    #[error("transmission rejected: {0}")]
    Transmission(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
