//! # SX1272 Register Definitions and Constants
//!
//! Register addresses, operating modes and bit field definitions for the
//! Semtech SX1272 transceiver, taken from the SX1272 datasheet. The chip
//! exposes two overlaid register banks selected by the long-range-mode bit
//! in `REG_OPMODE`: addresses 0x00-0x0C and 0x40+ are common, 0x0D-0x3F
//! mean different things in FSK and LoRa mode. Constants below are grouped
//! accordingly; `REG_LR_*` names address the LoRa bank.
//!
//! ## Register Map
//!
//! - 0x00-0x0C: common configuration (FIFO, operating mode, frequency, PA)
//! - 0x0D-0x3F: modem bank (FSK packet engine / LoRa modem)
//! - 0x40-0x42: DIO mapping and silicon version
//! - 0x4B-0x5A: PLL hop, TCXO and PA DAC trim registers

use bitflags::bitflags;

// =============================================================================
// Crystal and frequency synthesis
// =============================================================================

/// Crystal oscillator frequency in Hz
pub const XTAL_FREQ: u32 = 32_000_000;

/// Frequency synthesizer step: XTAL_FREQ / 2^19 Hz
pub const FREQ_STEP: f64 = 61.035_156_25;

/// RSSI offset for the SX1272 LoRa packet engine, dBm
pub const RSSI_OFFSET: i16 = -139;

/// Silicon revision reported by `REG_VERSION`
pub const SX1272_VERSION: u8 = 0x22;

/// LoRa sync word for public (LoRaWAN) networks
pub const LORA_MAC_PUBLIC_SYNCWORD: u8 = 0x34;

/// LoRa sync word for private networks
pub const LORA_MAC_PRIVATE_SYNCWORD: u8 = 0x12;

// =============================================================================
// Common register addresses
// =============================================================================

/// FIFO read/write access register
pub const REG_FIFO: u8 = 0x00;

/// Operating mode and modem selection
pub const REG_OPMODE: u8 = 0x01;

/// FSK bit rate setting (MSB)
pub const REG_BITRATEMSB: u8 = 0x02;

/// FSK bit rate setting (LSB)
pub const REG_BITRATELSB: u8 = 0x03;

/// FSK frequency deviation setting (MSB)
pub const REG_FDEVMSB: u8 = 0x04;

/// FSK frequency deviation setting (LSB)
pub const REG_FDEVLSB: u8 = 0x05;

/// RF carrier frequency (MSB)
pub const REG_FRFMSB: u8 = 0x06;

/// RF carrier frequency (MID)
pub const REG_FRFMID: u8 = 0x07;

/// RF carrier frequency (LSB)
pub const REG_FRFLSB: u8 = 0x08;

/// PA selection and output power control
pub const REG_PACONFIG: u8 = 0x09;

/// PA ramp time
pub const REG_PARAMP: u8 = 0x0A;

/// Over current protection control
pub const REG_OCP: u8 = 0x0B;

/// LNA gain and boost settings
pub const REG_LNA: u8 = 0x0C;

/// DIO0-DIO3 mapping
pub const REG_DIOMAPPING1: u8 = 0x40;

/// DIO4-DIO5 mapping, preamble-detect/RSSI map select
pub const REG_DIOMAPPING2: u8 = 0x41;

/// Chip version (read-only, 0x22 for SX1272)
pub const REG_VERSION: u8 = 0x42;

/// Fast frequency hopping control
pub const REG_PLLHOP: u8 = 0x4B;

/// External crystal / TCXO input control
pub const REG_TCXO: u8 = 0x58;

/// High power PA DAC control
pub const REG_PADAC: u8 = 0x5A;

// =============================================================================
// Operating mode bits (REG_OPMODE)
// =============================================================================

/// Mask preserving everything but the mode bits
pub const RF_OPMODE_MASK: u8 = 0xF8;

pub const RF_OPMODE_SLEEP: u8 = 0x00;
pub const RF_OPMODE_STANDBY: u8 = 0x01;
pub const RF_OPMODE_SYNTHESIZER_TX: u8 = 0x02;
pub const RF_OPMODE_TRANSMITTER: u8 = 0x03;
pub const RF_OPMODE_SYNTHESIZER_RX: u8 = 0x04;
pub const RF_OPMODE_RECEIVER: u8 = 0x05;

/// LoRa-only single-shot receive mode
pub const RFLR_OPMODE_RECEIVER_SINGLE: u8 = 0x06;

/// LoRa-only channel activity detection mode
pub const RFLR_OPMODE_CAD: u8 = 0x07;

/// Long-range (LoRa) mode select bit; writable only from Sleep
pub const RFLR_OPMODE_LONGRANGEMODE_MASK: u8 = 0x7F;
pub const RFLR_OPMODE_LONGRANGEMODE_OFF: u8 = 0x00;
pub const RFLR_OPMODE_LONGRANGEMODE_ON: u8 = 0x80;

// =============================================================================
// PA configuration bits (REG_PACONFIG / REG_PADAC)
// =============================================================================

pub const RF_PACONFIG_PASELECT_MASK: u8 = 0x7F;
pub const RF_PACONFIG_PASELECT_PABOOST: u8 = 0x80;
pub const RF_PACONFIG_PASELECT_RFO: u8 = 0x00;

/// Output power is the low nibble of PACONFIG
pub const RF_PACONFIG_OUTPUTPOWER_MASK: u8 = 0xF0;

pub const RF_PADAC_20DBM_MASK: u8 = 0xF8;
pub const RF_PADAC_20DBM_ON: u8 = 0x07;
pub const RF_PADAC_20DBM_OFF: u8 = 0x04;

// =============================================================================
// FSK bank register addresses
// =============================================================================

/// RX configuration (restart, AFC/AGC auto, RX trigger source)
pub const REG_RXCONFIG: u8 = 0x0D;

/// RSSI smoothing and offset
pub const REG_RSSICONFIG: u8 = 0x0E;

/// RSSI collision detector threshold
pub const REG_RSSICOLLISION: u8 = 0x0F;

/// RSSI interrupt threshold
pub const REG_RSSITHRESH: u8 = 0x10;

/// Instantaneous RSSI, -RSSI/2 dBm
pub const REG_RSSIVALUE: u8 = 0x11;

/// Channel filter bandwidth
pub const REG_RXBW: u8 = 0x12;

/// Channel filter bandwidth during AFC
pub const REG_AFCBW: u8 = 0x13;

pub const REG_OOKPEAK: u8 = 0x14;
pub const REG_OOKFIX: u8 = 0x15;
pub const REG_OOKAVG: u8 = 0x16;

/// AFC and FEI control
pub const REG_AFCFEI: u8 = 0x1A;

/// Frequency correction of the AFC (MSB)
pub const REG_AFCMSB: u8 = 0x1B;

/// Frequency correction of the AFC (LSB)
pub const REG_AFCLSB: u8 = 0x1C;

pub const REG_FEIMSB: u8 = 0x1D;
pub const REG_FEILSB: u8 = 0x1E;

/// Preamble detector control
pub const REG_PREAMBLEDETECT: u8 = 0x1F;

/// Timeout between RX request and RSSI detection
pub const REG_RXTIMEOUT1: u8 = 0x20;

/// Timeout between RSSI detection and preamble detection
pub const REG_RXTIMEOUT2: u8 = 0x21;

/// Timeout between preamble detection and sync word detection
pub const REG_RXTIMEOUT3: u8 = 0x22;

pub const REG_RXDELAY: u8 = 0x23;

/// RC oscillator calibration and CLKOUT control
pub const REG_OSC: u8 = 0x24;

/// Preamble length in bytes (MSB)
pub const REG_PREAMBLEMSB: u8 = 0x25;

/// Preamble length in bytes (LSB)
pub const REG_PREAMBLELSB: u8 = 0x26;

/// Sync word recognition control
pub const REG_SYNCCONFIG: u8 = 0x27;

pub const REG_SYNCVALUE1: u8 = 0x28;
pub const REG_SYNCVALUE2: u8 = 0x29;
pub const REG_SYNCVALUE3: u8 = 0x2A;
pub const REG_SYNCVALUE4: u8 = 0x2B;
pub const REG_SYNCVALUE5: u8 = 0x2C;
pub const REG_SYNCVALUE6: u8 = 0x2D;
pub const REG_SYNCVALUE7: u8 = 0x2E;
pub const REG_SYNCVALUE8: u8 = 0x2F;

/// Packet format, DC-free encoding, CRC, address filtering
pub const REG_PACKETCONFIG1: u8 = 0x30;

/// Data mode (packet/continuous) and payload length MSB
pub const REG_PACKETCONFIG2: u8 = 0x31;

/// Payload length (fixed mode) or max length (variable mode)
pub const REG_PAYLOADLENGTH: u8 = 0x32;

pub const REG_NODEADRS: u8 = 0x33;
pub const REG_BROADCASTADRS: u8 = 0x34;

/// TX start condition and FIFO level threshold
pub const REG_FIFOTHRESH: u8 = 0x35;

pub const REG_SEQCONFIG1: u8 = 0x36;
pub const REG_SEQCONFIG2: u8 = 0x37;
pub const REG_TIMERRESOL: u8 = 0x38;
pub const REG_TIMER1COEF: u8 = 0x39;
pub const REG_TIMER2COEF: u8 = 0x3A;

/// Image rejection calibration and temperature monitoring
pub const REG_IMAGECAL: u8 = 0x3B;

pub const REG_TEMP: u8 = 0x3C;
pub const REG_LOWBAT: u8 = 0x3D;

/// IRQ flags: mode ready, RSSI, preamble, sync address match
pub const REG_IRQFLAGS1: u8 = 0x3E;

/// IRQ flags: FIFO state, packet sent, payload ready, CRC OK
pub const REG_IRQFLAGS2: u8 = 0x3F;

// =============================================================================
// FSK bit definitions
// =============================================================================

pub const RF_RXCONFIG_RESTARTRXONCOLLISION_ON: u8 = 0x80;
pub const RF_RXCONFIG_RESTARTRXWITHOUTPLLLOCK: u8 = 0x40;
pub const RF_RXCONFIG_RESTARTRXWITHPLLLOCK: u8 = 0x20;
pub const RF_RXCONFIG_AFCAUTO_ON: u8 = 0x10;
pub const RF_RXCONFIG_AGCAUTO_ON: u8 = 0x08;
pub const RF_RXCONFIG_RXTRIGER_OFF: u8 = 0x00;
pub const RF_RXCONFIG_RXTRIGER_RSSI: u8 = 0x01;
pub const RF_RXCONFIG_RXTRIGER_PREAMBLEDETECT: u8 = 0x06;
pub const RF_RXCONFIG_RXTRIGER_RSSI_PREAMBLEDETECT: u8 = 0x07;

/// Sync word size field is the low three bits, size = field + 1 bytes
pub const RF_SYNCCONFIG_SYNCSIZE_MASK: u8 = 0xF8;

pub const RF_PACKETCONFIG1_PACKETFORMAT_MASK: u8 = 0x7F;
pub const RF_PACKETCONFIG1_PACKETFORMAT_FIXED: u8 = 0x00;
pub const RF_PACKETCONFIG1_PACKETFORMAT_VARIABLE: u8 = 0x80;
pub const RF_PACKETCONFIG1_CRC_MASK: u8 = 0xEF;
pub const RF_PACKETCONFIG1_CRC_ON: u8 = 0x10;
pub const RF_PACKETCONFIG1_CRC_OFF: u8 = 0x00;

/// Address filtering field, bits 2:1
pub const RF_PACKETCONFIG1_ADDRSFILTERING_MASK: u8 = 0xF9;

pub const RF_PACKETCONFIG2_DATAMODE_MASK: u8 = 0xBF;
pub const RF_PACKETCONFIG2_DATAMODE_CONTINUOUS: u8 = 0x00;
pub const RF_PACKETCONFIG2_DATAMODE_PACKET: u8 = 0x40;

/// FIFO level threshold field, bits 5:0
pub const RF_FIFOTHRESH_FIFOTHRESHOLD_MASK: u8 = 0x3F;

bitflags! {
    /// FSK `REG_IRQFLAGS1` contents
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FskIrqFlags1: u8 {
        const MODE_READY         = 0x80;
        const RX_READY           = 0x40;
        const TX_READY           = 0x20;
        const PLL_LOCK           = 0x10;
        const RSSI               = 0x08;
        const TIMEOUT            = 0x04;
        const PREAMBLE_DETECT    = 0x02;
        const SYNC_ADDRESS_MATCH = 0x01;
    }
}

bitflags! {
    /// FSK `REG_IRQFLAGS2` contents
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FskIrqFlags2: u8 {
        const FIFO_FULL     = 0x80;
        const FIFO_EMPTY    = 0x40;
        const FIFO_LEVEL    = 0x20;
        const FIFO_OVERRUN  = 0x10;
        const PACKET_SENT   = 0x08;
        const PAYLOAD_READY = 0x04;
        const CRC_OK        = 0x02;
        const LOW_BAT       = 0x01;
    }
}

// =============================================================================
// DIO mapping bits (REG_DIOMAPPING1 / REG_DIOMAPPING2)
// =============================================================================

pub const RF_DIOMAPPING1_DIO0_MASK: u8 = 0x3F;
pub const RF_DIOMAPPING1_DIO0_00: u8 = 0x00;
pub const RF_DIOMAPPING1_DIO0_01: u8 = 0x40;
pub const RF_DIOMAPPING1_DIO0_10: u8 = 0x80;
pub const RF_DIOMAPPING1_DIO0_11: u8 = 0xC0;

pub const RF_DIOMAPPING1_DIO1_MASK: u8 = 0xCF;
pub const RF_DIOMAPPING1_DIO1_00: u8 = 0x00;
pub const RF_DIOMAPPING1_DIO1_01: u8 = 0x10;
pub const RF_DIOMAPPING1_DIO1_10: u8 = 0x20;
pub const RF_DIOMAPPING1_DIO1_11: u8 = 0x30;

pub const RF_DIOMAPPING1_DIO2_MASK: u8 = 0xF3;
pub const RF_DIOMAPPING1_DIO2_00: u8 = 0x00;
pub const RF_DIOMAPPING1_DIO2_01: u8 = 0x04;
pub const RF_DIOMAPPING1_DIO2_10: u8 = 0x08;
pub const RF_DIOMAPPING1_DIO2_11: u8 = 0x0C;

pub const RF_DIOMAPPING1_DIO3_MASK: u8 = 0xFC;
pub const RF_DIOMAPPING1_DIO3_00: u8 = 0x00;
pub const RF_DIOMAPPING1_DIO3_01: u8 = 0x01;
pub const RF_DIOMAPPING1_DIO3_10: u8 = 0x02;
pub const RF_DIOMAPPING1_DIO3_11: u8 = 0x03;

pub const RF_DIOMAPPING2_DIO4_MASK: u8 = 0x3F;
pub const RF_DIOMAPPING2_DIO4_00: u8 = 0x00;
pub const RF_DIOMAPPING2_DIO4_01: u8 = 0x40;
pub const RF_DIOMAPPING2_DIO4_10: u8 = 0x80;
pub const RF_DIOMAPPING2_DIO4_11: u8 = 0xC0;

pub const RF_DIOMAPPING2_DIO5_MASK: u8 = 0xCF;
pub const RF_DIOMAPPING2_DIO5_00: u8 = 0x00;
pub const RF_DIOMAPPING2_DIO5_01: u8 = 0x10;
pub const RF_DIOMAPPING2_DIO5_10: u8 = 0x20;
pub const RF_DIOMAPPING2_DIO5_11: u8 = 0x30;

/// DIO4/DIO5 map select: preamble detect vs RSSI
pub const RF_DIOMAPPING2_MAP_MASK: u8 = 0xFE;
pub const RF_DIOMAPPING2_MAP_PREAMBLEDETECT: u8 = 0x01;
pub const RF_DIOMAPPING2_MAP_RSSI: u8 = 0x00;

// =============================================================================
// LoRa bank register addresses
// =============================================================================

/// FIFO SPI access pointer
pub const REG_LR_FIFOADDRPTR: u8 = 0x0D;

/// Start address of TX data in the FIFO
pub const REG_LR_FIFOTXBASEADDR: u8 = 0x0E;

/// Start address of RX data in the FIFO
pub const REG_LR_FIFORXBASEADDR: u8 = 0x0F;

/// Start address of the last packet received
pub const REG_LR_FIFORXCURRENTADDR: u8 = 0x10;

/// IRQ mask; a set bit disables the corresponding interrupt
pub const REG_LR_IRQFLAGSMASK: u8 = 0x11;

/// IRQ flags; write a 1 to clear
pub const REG_LR_IRQFLAGS: u8 = 0x12;

/// Number of payload bytes of the last packet received
pub const REG_LR_RXNBBYTES: u8 = 0x13;

pub const REG_LR_RXHEADERCNTVALUEMSB: u8 = 0x14;
pub const REG_LR_RXHEADERCNTVALUELSB: u8 = 0x15;
pub const REG_LR_RXPACKETCNTVALUEMSB: u8 = 0x16;
pub const REG_LR_RXPACKETCNTVALUELSB: u8 = 0x17;
pub const REG_LR_MODEMSTAT: u8 = 0x18;

/// SNR of the last packet, two's complement in 0.25 dB steps
pub const REG_LR_PKTSNRVALUE: u8 = 0x19;

/// RSSI of the last packet
pub const REG_LR_PKTRSSIVALUE: u8 = 0x1A;

/// Current RSSI
pub const REG_LR_RSSIVALUE: u8 = 0x1B;

/// PLL lock state and current hop channel
pub const REG_LR_HOPCHANNEL: u8 = 0x1C;

/// Bandwidth, coding rate, header mode, CRC, low-data-rate-optimize
pub const REG_LR_MODEMCONFIG1: u8 = 0x1D;

/// Spreading factor, TX continuous, AGC auto, symbol timeout MSB
pub const REG_LR_MODEMCONFIG2: u8 = 0x1E;

/// RX single-shot symbol timeout LSB
pub const REG_LR_SYMBTIMEOUTLSB: u8 = 0x1F;

/// Preamble length in symbols (MSB)
pub const REG_LR_PREAMBLEMSB: u8 = 0x20;

/// Preamble length in symbols (LSB)
pub const REG_LR_PREAMBLELSB: u8 = 0x21;

/// Payload length (required in implicit header mode)
pub const REG_LR_PAYLOADLENGTH: u8 = 0x22;

/// Maximum accepted payload length
pub const REG_LR_PAYLOADMAXLENGTH: u8 = 0x23;

/// Symbol periods between frequency hops
pub const REG_LR_HOPPERIOD: u8 = 0x24;

/// Address of the last byte written to the FIFO by the receiver
pub const REG_LR_FIFORXBYTEADDR: u8 = 0x25;

/// Wideband RSSI, LSB is broadband noise (entropy source)
pub const REG_LR_RSSIWIDEBAND: u8 = 0x2C;

/// LoRa detection optimize (SF6 vs SF7-SF12)
pub const REG_LR_DETECTOPTIMIZE: u8 = 0x31;

/// I and Q signal inversion
pub const REG_LR_INVERTIQ: u8 = 0x33;

/// LoRa detection threshold
pub const REG_LR_DETECTIONTHRESHOLD: u8 = 0x37;

/// LoRa sync word (0x34 public network, 0x12 private)
pub const REG_LR_SYNCWORD: u8 = 0x39;

/// Second I/Q inversion control register
pub const REG_LR_INVERTIQ2: u8 = 0x3B;

// =============================================================================
// LoRa bit definitions
// =============================================================================

bitflags! {
    /// LoRa `REG_LR_IRQFLAGS` / `REG_LR_IRQFLAGSMASK` contents.
    ///
    /// In the mask register a set bit *disables* the interrupt; in the flags
    /// register writing a set bit clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LoRaIrqFlags: u8 {
        const RX_TIMEOUT           = 0x80;
        const RX_DONE              = 0x40;
        const PAYLOAD_CRC_ERROR    = 0x20;
        const VALID_HEADER         = 0x10;
        const TX_DONE              = 0x08;
        const CAD_DONE             = 0x04;
        const FHSS_CHANGED_CHANNEL = 0x02;
        const CAD_DETECTED         = 0x01;
    }
}

pub const RFLR_MODEMCONFIG1_BW_MASK: u8 = 0x3F;
pub const RFLR_MODEMCONFIG1_BW_125_KHZ: u8 = 0x00;
pub const RFLR_MODEMCONFIG1_BW_250_KHZ: u8 = 0x40;
pub const RFLR_MODEMCONFIG1_BW_500_KHZ: u8 = 0x80;
pub const RFLR_MODEMCONFIG1_CODINGRATE_MASK: u8 = 0xC7;
pub const RFLR_MODEMCONFIG1_IMPLICITHEADER_MASK: u8 = 0xFB;
pub const RFLR_MODEMCONFIG1_RXPAYLOADCRC_MASK: u8 = 0xFD;
pub const RFLR_MODEMCONFIG1_LOWDATARATEOPTIMIZE_MASK: u8 = 0xFE;

pub const RFLR_MODEMCONFIG2_SF_MASK: u8 = 0x0F;
pub const RFLR_MODEMCONFIG2_TXCONTINUOUSMODE_MASK: u8 = 0xF7;
pub const RFLR_MODEMCONFIG2_TXCONTINUOUSMODE_ON: u8 = 0x08;
pub const RFLR_MODEMCONFIG2_AGCAUTO_MASK: u8 = 0xFB;
pub const RFLR_MODEMCONFIG2_AGCAUTO_ON: u8 = 0x04;
pub const RFLR_MODEMCONFIG2_SYMBTIMEOUTMSB_MASK: u8 = 0xFC;

/// Current hop channel is the low six bits
pub const RFLR_HOPCHANNEL_CHANNEL_MASK: u8 = 0x3F;

pub const RFLR_PLLHOP_FASTHOP_MASK: u8 = 0x7F;
pub const RFLR_PLLHOP_FASTHOP_ON: u8 = 0x80;
pub const RFLR_PLLHOP_FASTHOP_OFF: u8 = 0x00;

pub const RFLR_DETECTIONOPTIMIZE_MASK: u8 = 0xF8;
pub const RFLR_DETECTIONOPTIMIZE_SF7_TO_SF12: u8 = 0x03;
pub const RFLR_DETECTIONOPTIMIZE_SF6: u8 = 0x05;

pub const RFLR_DETECTIONTHRESH_SF7_TO_SF12: u8 = 0x0A;
pub const RFLR_DETECTIONTHRESH_SF6: u8 = 0x0C;

pub const RFLR_INVERTIQ_RX_MASK: u8 = 0xBF;
pub const RFLR_INVERTIQ_RX_ON: u8 = 0x40;
pub const RFLR_INVERTIQ_RX_OFF: u8 = 0x00;
pub const RFLR_INVERTIQ_TX_MASK: u8 = 0xFE;
pub const RFLR_INVERTIQ_TX_ON: u8 = 0x00;
pub const RFLR_INVERTIQ_TX_OFF: u8 = 0x01;

pub const RFLR_INVERTIQ2_ON: u8 = 0x19;
pub const RFLR_INVERTIQ2_OFF: u8 = 0x1D;

// Common registers shared with the FSK bank under their LoRa names
pub const REG_LR_PLLHOP: u8 = REG_PLLHOP;

// LoRa DIO mappings share the FSK field layout
pub const RFLR_DIOMAPPING1_DIO0_MASK: u8 = RF_DIOMAPPING1_DIO0_MASK;
pub const RFLR_DIOMAPPING1_DIO0_00: u8 = RF_DIOMAPPING1_DIO0_00;
pub const RFLR_DIOMAPPING1_DIO0_01: u8 = RF_DIOMAPPING1_DIO0_01;
pub const RFLR_DIOMAPPING1_DIO1_MASK: u8 = RF_DIOMAPPING1_DIO1_MASK;
pub const RFLR_DIOMAPPING1_DIO1_00: u8 = RF_DIOMAPPING1_DIO1_00;
pub const RFLR_DIOMAPPING1_DIO2_MASK: u8 = RF_DIOMAPPING1_DIO2_MASK;
pub const RFLR_DIOMAPPING1_DIO2_00: u8 = RF_DIOMAPPING1_DIO2_00;
pub const RFLR_DIOMAPPING1_DIO3_MASK: u8 = RF_DIOMAPPING1_DIO3_MASK;
pub const RFLR_DIOMAPPING1_DIO3_00: u8 = RF_DIOMAPPING1_DIO3_00;

// =============================================================================
// Power-on register defaults applied by the driver
// =============================================================================

use super::settings::Modem;

/// One entry of the default-initialization table.
#[derive(Debug, Clone, Copy)]
pub struct RadioRegisterInit {
    /// Modem bank that must be active when the value is written
    pub modem: Modem,
    pub addr: u8,
    pub value: u8,
}

/// Register values written after reset and after TX-timeout recovery.
///
/// The table is ordered so all FSK-bank writes happen under the FSK modem
/// before the single LoRa-bank entry.
pub const RADIO_INIT_REGISTERS: &[RadioRegisterInit] = &[
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_LNA, value: 0x23 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_RXCONFIG, value: 0x1E },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_RSSICONFIG, value: 0xD2 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_AFCFEI, value: 0x01 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_PREAMBLEDETECT, value: 0xAA },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_OSC, value: 0x07 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_SYNCCONFIG, value: 0x12 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_SYNCVALUE1, value: 0xC1 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_SYNCVALUE2, value: 0x94 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_SYNCVALUE3, value: 0xC1 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_PACKETCONFIG1, value: 0xD8 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_FIFOTHRESH, value: 0x8F },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_IMAGECAL, value: 0x02 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_DIOMAPPING1, value: 0x00 },
    RadioRegisterInit { modem: Modem::Fsk, addr: REG_DIOMAPPING2, value: 0x30 },
    RadioRegisterInit { modem: Modem::LoRa, addr: REG_LR_PAYLOADMAXLENGTH, value: 0x40 },
];
