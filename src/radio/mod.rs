//! # SX1272 Radio Driver
//!
//! Dual-modem (FSK / LoRa) packet radio driver: register map, configuration
//! model, derived-value calculators, interrupt plumbing and the state-machine
//! driver itself.

pub mod calc;
pub mod driver;
pub mod events;
pub mod irq;
pub mod registers;
pub mod settings;
