//! # SX1272 Error Handling
//!
//! This module defines the Sx1272Error enum, which represents the different
//! error types that can occur in the sx1272-rs crate. Radio-level outcomes
//! (packet received, CRC failure, TX timeout) are reported through the
//! [`RadioEvents`](crate::RadioEvents) callbacks instead, matching the
//! asynchronous fire-and-report design of the driver.

use crate::hal::HalError;
use thiserror::Error;

/// Represents the different error types that can occur in the SX1272 crate.
#[derive(Debug, Error)]
pub enum Sx1272Error {
    /// Hardware abstraction layer error (SPI, GPIO, interrupt wiring).
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// Requested FSK bandwidth has no entry in the chip's RXBW table.
    #[error("Invalid FSK bandwidth: {0} Hz")]
    InvalidBandwidth(u32),

    /// Configuration parameter outside the chip's supported range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
