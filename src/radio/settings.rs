//! # Radio State and Configuration Model
//!
//! Driver-owned state for the SX1272: the operating-state machine value, the
//! active modem, the per-modem RF configurations and the transient per-packet
//! bookkeeping the interrupt handlers mutate while a TX or RX operation is in
//! flight. One [`RadioSettings`] instance lives inside the driver; public
//! configuration enters through the serde-friendly `*Config` structs.

use serde::{Deserialize, Serialize};

/// Radio operating states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    /// No operation in flight
    Idle,
    /// Receiver chain active (continuous or single-shot)
    RxRunning,
    /// Transmission in flight, TX timeout timer armed
    TxRunning,
    /// LoRa carrier-acquisition / channel-activity detection in progress
    Cad,
}

/// The two mutually exclusive modems of the SX1272
///
/// Switching modems forces the chip through Sleep: the long-range-mode bit
/// of `REG_OPMODE` is only writable while the chip is not modulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modem {
    Fsk,
    LoRa,
}

/// Which antenna-switch wiring scheme the board populates.
///
/// At most one scheme is present; detected at init by probing which control
/// pins the HAL reports as connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntennaSwitch {
    /// Two RF latch switch control lines
    DualControl,
    /// Separate TX-enable and RX-enable lines
    TxRxEnable,
    /// One shared antenna switch line
    SingleLine,
    /// No switch control wired
    None,
}

/// SX1272 module variant, detected by sampling the shared antenna-switch pin
/// at init. Selects the PA path used for TX power encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    /// PA_BOOST output wired (e.g. SX1272MB1DCS)
    PaBoost,
    /// RFO output wired (e.g. SX1272MB2xAS)
    Rfo,
}

/// FSK receive configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FskRxConfig {
    /// Channel filter bandwidth in Hz
    pub bandwidth: u32,
    /// Bit rate in bps
    pub datarate: u32,
    /// Channel filter bandwidth during AFC, Hz
    pub bandwidth_afc: u32,
    /// Preamble length in bytes
    pub preamble_len: u16,
    /// Single-shot RX timeout in symbols
    pub symb_timeout: u16,
    /// Fixed-length packets (no length prefix on air)
    pub fix_len: bool,
    /// Payload length, used when `fix_len` is set
    pub payload_len: u8,
    /// Hardware CRC check
    pub crc_on: bool,
    /// Stay in RX after each packet
    pub rx_continuous: bool,
}

impl Default for FskRxConfig {
    fn default() -> Self {
        Self {
            bandwidth: 50_000,
            datarate: 50_000,
            bandwidth_afc: 83_333,
            preamble_len: 5,
            symb_timeout: 8,
            fix_len: false,
            payload_len: 0,
            crc_on: true,
            rx_continuous: true,
        }
    }
}

/// FSK transmit configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FskTxConfig {
    /// Output power in dBm
    pub power: i8,
    /// Frequency deviation in Hz
    pub fdev: u32,
    /// Bit rate in bps
    pub datarate: u32,
    /// Preamble length in bytes
    pub preamble_len: u16,
    /// Fixed-length packets (no length prefix on air)
    pub fix_len: bool,
    /// Hardware CRC generation
    pub crc_on: bool,
    /// TX supervision timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for FskTxConfig {
    fn default() -> Self {
        Self {
            power: 14,
            fdev: 25_000,
            datarate: 50_000,
            preamble_len: 5,
            fix_len: false,
            crc_on: true,
            timeout_ms: 3_000,
        }
    }
}

/// LoRa receive configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoRaRxConfig {
    /// Bandwidth index: 0 = 125 kHz, 1 = 250 kHz, 2 = 500 kHz
    pub bandwidth: u8,
    /// Spreading factor, 6..=12
    pub datarate: u8,
    /// Coding rate index: 1 = 4/5 .. 4 = 4/8
    pub coderate: u8,
    /// Preamble length in symbols
    pub preamble_len: u16,
    /// Single-shot RX symbol timeout (10 bits)
    pub symb_timeout: u16,
    /// Implicit header mode
    pub fix_len: bool,
    /// Payload length, required in implicit header mode
    pub payload_len: u8,
    /// Payload CRC check
    pub crc_on: bool,
    /// Intra-packet frequency hopping
    pub freq_hop_on: bool,
    /// Symbol periods between hops
    pub hop_period: u8,
    /// Invert I and Q signals
    pub iq_inverted: bool,
    /// Stay in RX after each packet
    pub rx_continuous: bool,
}

impl Default for LoRaRxConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0,
            datarate: 7,
            coderate: 1,
            preamble_len: 8,
            symb_timeout: 5,
            fix_len: false,
            payload_len: 0,
            crc_on: true,
            freq_hop_on: false,
            hop_period: 0,
            iq_inverted: false,
            rx_continuous: true,
        }
    }
}

/// LoRa transmit configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoRaTxConfig {
    /// Output power in dBm
    pub power: i8,
    /// Bandwidth index: 0 = 125 kHz, 1 = 250 kHz, 2 = 500 kHz
    pub bandwidth: u8,
    /// Spreading factor, 6..=12
    pub datarate: u8,
    /// Coding rate index: 1 = 4/5 .. 4 = 4/8
    pub coderate: u8,
    /// Preamble length in symbols
    pub preamble_len: u16,
    /// Implicit header mode
    pub fix_len: bool,
    /// Payload CRC generation
    pub crc_on: bool,
    /// Intra-packet frequency hopping
    pub freq_hop_on: bool,
    /// Symbol periods between hops
    pub hop_period: u8,
    /// Invert I and Q signals
    pub iq_inverted: bool,
    /// TX supervision timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for LoRaTxConfig {
    fn default() -> Self {
        Self {
            power: 14,
            bandwidth: 0,
            datarate: 7,
            coderate: 1,
            preamble_len: 8,
            fix_len: false,
            crc_on: true,
            freq_hop_on: false,
            hop_period: 0,
            iq_inverted: false,
            timeout_ms: 3_000,
        }
    }
}

/// Receive configuration for either modem
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum RxConfig {
    Fsk(FskRxConfig),
    LoRa(LoRaRxConfig),
}

/// Transmit configuration for either modem
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TxConfig {
    Fsk(FskTxConfig),
    LoRa(LoRaTxConfig),
}

/// Applied FSK settings plus derived fields
#[derive(Debug, Clone, Copy, Default)]
pub struct FskSettings {
    pub power: i8,
    pub fdev: u32,
    pub bandwidth: u32,
    pub bandwidth_afc: u32,
    pub datarate: u32,
    pub preamble_len: u16,
    pub fix_len: bool,
    pub payload_len: u8,
    pub crc_on: bool,
    pub rx_continuous: bool,
    pub tx_timeout_ms: u32,
    /// Derived: single-shot RX timeout in ms, from `symb_timeout`
    pub rx_single_timeout_ms: u32,
}

/// Applied LoRa settings plus derived fields
#[derive(Debug, Clone, Copy)]
pub struct LoRaSettings {
    pub power: i8,
    pub bandwidth: u8,
    pub datarate: u8,
    /// Derived: required at slow SF/BW combinations
    pub low_datarate_optimize: bool,
    pub coderate: u8,
    pub preamble_len: u16,
    pub fix_len: bool,
    pub payload_len: u8,
    pub crc_on: bool,
    pub freq_hop_on: bool,
    pub hop_period: u8,
    pub iq_inverted: bool,
    pub rx_continuous: bool,
    pub tx_timeout_ms: u32,
    /// Sync word selection, survives TX-timeout recovery
    pub public_network: bool,
}

impl Default for LoRaSettings {
    fn default() -> Self {
        Self {
            power: 0,
            bandwidth: 0,
            datarate: 7,
            low_datarate_optimize: false,
            coderate: 1,
            preamble_len: 8,
            fix_len: false,
            payload_len: 0,
            crc_on: true,
            freq_hop_on: false,
            hop_period: 0,
            iq_inverted: false,
            rx_continuous: false,
            tx_timeout_ms: 0,
            public_network: false,
        }
    }
}

/// Transient FSK per-operation bookkeeping.
///
/// Invariant: `nb_bytes <= size` and `size` never exceeds the receive
/// buffer capacity once accepted by the RX path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FskPacketHandler {
    pub preamble_detected: bool,
    pub sync_word_detected: bool,
    /// RSSI of the last completed packet, dBm
    pub rssi_value: i16,
    /// AFC correction of the last completed packet, Hz
    pub afc_value: i32,
    /// LNA gain index of the last completed packet
    pub rx_gain: u8,
    /// Expected total payload bytes of the operation
    pub size: u16,
    /// Bytes streamed so far
    pub nb_bytes: u16,
    /// FIFO watermark, from `REG_FIFOTHRESH`
    pub fifo_thresh: u8,
    /// TX burst size
    pub chunk_size: u8,
}

/// Transient LoRa per-operation bookkeeping
#[derive(Debug, Clone, Copy, Default)]
pub struct LoRaPacketHandler {
    /// SNR of the last packet, dB
    pub snr_value: i8,
    /// RSSI of the last packet, dBm
    pub rssi_value: i16,
    /// Payload size of the last packet
    pub size: u8,
}

/// The driver's complete mutable state.
///
/// Mutated by configuration calls from the owning thread and by the
/// interrupt dispatch path; both run under the driver lock.
#[derive(Debug, Clone, Copy)]
pub struct RadioSettings {
    pub state: RadioState,
    pub modem: Modem,
    /// Channel frequency in Hz
    pub channel: u32,
    pub fsk: FskSettings,
    pub lora: LoRaSettings,
    pub fsk_packet_handler: FskPacketHandler,
    pub lora_packet_handler: LoRaPacketHandler,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            state: RadioState::Idle,
            modem: Modem::Fsk,
            channel: 0,
            fsk: FskSettings::default(),
            lora: LoRaSettings::default(),
            fsk_packet_handler: FskPacketHandler::default(),
            lora_packet_handler: LoRaPacketHandler::default(),
        }
    }
}
