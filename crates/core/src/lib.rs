//! Shared telehealth terminal primitives.
//!
//! This crate provides:
//! - Environment-driven configuration with `.env` support
//! - Device and transmitter trait seams the scheduler drives
//! - Error types shared by device collaborators

pub mod config;
pub mod device;
pub mod error;

pub use config::Config;
pub use device::*;
pub use error::*;
