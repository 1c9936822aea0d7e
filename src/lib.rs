//! # sx1272-rs - A Rust Driver for the Semtech SX1272 FSK/LoRa Transceiver
//!
//! The sx1272-rs crate drives the Semtech SX1272 sub-GHz transceiver over its
//! raw SPI register interface. The SX1272 carries two mutually exclusive
//! modems, classic FSK packet radio and LoRa, and this driver implements the
//! full dual-modem operating-state machine on top of a thin platform HAL:
//! mode transitions, FIFO streaming, DIO interrupt routing with deferred
//! worker-thread processing, TX timeout supervision and recovery, and the
//! derived-configuration algorithms (time-on-air, bandwidth lookup, TX power
//! encoding, antenna-switch control).
//!
//! ## Features
//!
//! - FSK and LoRa TX/RX pipelines with chunked FIFO streaming
//! - Interrupt-driven operation: six DIO lines coalesced into one worker
//! - Channel Activity Detection (LoRa) and RSSI-based carrier sense
//! - Time-on-air calculation for duty-cycle enforcement by upper layers
//! - TX-timeout recovery with full register re-initialization
//! - Hardware abstraction layer for different platforms
//! - Raspberry Pi HAL implementation (feature `raspberry-pi`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │   MAC / application layer       │
//! ├─────────────────────────────────┤
//! │   Sx1272 facade (lock + worker) │
//! ├─────────────────────────────────┤
//! │   Sx1272Driver (state machine)  │
//! ├─────────────────────────────────┤
//! │   HAL abstraction layer         │
//! ├─────────────────────────────────┤
//! │   Platform-specific HAL impl    │
//! └─────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sx1272_rs::{Sx1272, RadioEvents};
//!
//! struct App;
//! impl RadioEvents for App {
//!     fn rx_done(&self, payload: &[u8], rssi: i16, snr: i8) {
//!         println!("received {} bytes at {} dBm", payload.len(), rssi);
//!     }
//! }
//!
//! # use sx1272_rs::hal::{Hal, HalError, ResetDrive, ControlPin};
//! # use sx1272_rs::DioLine;
//! # struct StubHal;
//! # impl Hal for StubHal {
//! #     fn spi_write(&mut self, _: u8) -> Result<u8, HalError> { unimplemented!() }
//! #     fn set_nss(&mut self, _: bool) -> Result<(), HalError> { unimplemented!() }
//! #     fn set_reset(&mut self, _: ResetDrive) -> Result<(), HalError> { unimplemented!() }
//! #     fn control_pin_present(&self, _: ControlPin) -> bool { unimplemented!() }
//! #     fn set_control_pin(&mut self, _: ControlPin, _: bool) -> Result<(), HalError> { unimplemented!() }
//! #     fn read_control_pin(&mut self, _: ControlPin) -> Result<bool, HalError> { unimplemented!() }
//! #     fn attach_dio_interrupt(&mut self, _: DioLine, _: Box<dyn FnMut() + Send>) -> Result<(), HalError> { unimplemented!() }
//! #     fn delay_ms(&mut self, _: u64) {}
//! # }
//! # fn hal() -> impl sx1272_rs::hal::Hal + Send + 'static { StubHal }
//! let events: Arc<dyn RadioEvents + Send + Sync> = Arc::new(App);
//! let radio = Sx1272::new(hal());
//! radio.init_radio(&events)?;
//! radio.set_channel(868_100_000)?;
//! radio.receive()?;
//! # Ok::<(), sx1272_rs::Sx1272Error>(())
//! ```

pub mod error;
pub mod hal;
pub mod logging;
pub mod radio;

pub use crate::error::Sx1272Error;
pub use crate::logging::{init_logger, log_info};

// Core radio types
pub use radio::driver::{Sx1272, Sx1272Driver, MAX_DATA_BUFFER_SIZE};
pub use radio::events::RadioEvents;
pub use radio::irq::{DioLine, IrqStats};
pub use radio::settings::{
    AntennaSwitch, BoardVariant, FskRxConfig, FskTxConfig, LoRaRxConfig, LoRaTxConfig, Modem,
    RadioState, RxConfig, TxConfig,
};
