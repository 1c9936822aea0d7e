//! # Hardware Abstraction Layer for the SX1272
//!
//! This module defines the HAL trait the driver is generic over. The SX1272
//! is a raw-register chip: the platform only has to provide a byte-level SPI
//! exchange gated by the NSS line, the handful of board control GPIOs (reset,
//! antenna switch wiring, optional TCXO), rising-edge interrupt attachment
//! for the DIO lines, and a millisecond delay. Everything protocol-shaped
//! (register framing, FIFO bursts, mode sequencing) lives in the driver.

use crate::radio::irq::DioLine;
use thiserror::Error;

/// Errors that can occur during HAL operations
#[derive(Debug, Error)]
pub enum HalError {
    #[error("SPI communication error")]
    Spi,

    #[error("GPIO operation error")]
    Gpio,

    #[error("Interrupt attach error")]
    Interrupt,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Board control GPIOs the SX1272 modules wire up in different combinations.
///
/// Any of these may be absent on a given board; the driver probes with
/// [`Hal::control_pin_present`] and picks the antenna-switch scheme that is
/// actually populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPin {
    /// RF latch switch control line 1 (dual-control wiring)
    RfSwitchCtl1,
    /// RF latch switch control line 2 (dual-control wiring)
    RfSwitchCtl2,
    /// TX enable line (separate TX/RX enable wiring)
    TxCtl,
    /// RX enable line (separate TX/RX enable wiring)
    RxCtl,
    /// Single shared antenna switch line
    AntSwitch,
    /// External power amplifier enable
    PwrAmpCtl,
    /// External TCXO enable
    Tcxo,
}

/// How the reset pin is driven.
///
/// The SX1272 reset sequence requires the pin to be actively pulled low and
/// then *released* (left floating), not driven high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDrive {
    /// Drive the reset line low.
    Low,
    /// Release the line (reconfigure as floating input).
    Release,
}

/// Hardware Abstraction Layer trait for SX1272 radio control
pub trait Hal {
    /// Exchange a single byte on the SPI bus. NSS state is not touched.
    fn spi_write(&mut self, byte: u8) -> Result<u8, HalError>;

    /// Assert (`true`) or deassert (`false`) the NSS chip-select line.
    fn set_nss(&mut self, asserted: bool) -> Result<(), HalError>;

    /// Drive or release the radio reset line.
    fn set_reset(&mut self, drive: ResetDrive) -> Result<(), HalError>;

    /// Whether the given board control pin is wired on this platform.
    fn control_pin_present(&self, pin: ControlPin) -> bool;

    /// Drive a board control pin. Must be a no-op-equivalent error-free call
    /// only for pins reported present.
    fn set_control_pin(&mut self, pin: ControlPin, level: bool) -> Result<(), HalError>;

    /// Sample a board control pin as an input (used for board variant
    /// detection on the shared antenna-switch line).
    fn read_control_pin(&mut self, pin: ControlPin) -> Result<bool, HalError>;

    /// Attach a rising-edge interrupt handler to a DIO line. The handler runs
    /// in interrupt (or interrupt-thread) context and must only post events.
    fn attach_dio_interrupt(
        &mut self,
        line: DioLine,
        handler: Box<dyn FnMut() + Send>,
    ) -> Result<(), HalError>;

    /// Blocking delay.
    fn delay_ms(&mut self, ms: u64);
}

// Platform implementations
#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{RaspberryPiHal, RaspberryPiHalBuilder, Sx1272Pins};
