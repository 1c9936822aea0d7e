//! # SX1272 Driver State Machine
//!
//! The driver proper: register access over the HAL, the operating-state
//! machine for both modems, the TX/RX pipelines with chunked FIFO streaming,
//! and the interrupt dispatch path. [`Sx1272Driver`] contains all radio
//! logic and is single-threaded by construction; [`Sx1272`] wraps it in a
//! mutex, attaches the DIO interrupt lines and runs the worker thread that
//! turns posted interrupt events into driver dispatch calls.
//!
//! ## Interrupt model
//!
//! DIO edges and the synthetic TX timeout are posted into an [`IrqPending`]
//! mask from interrupt context and drained by one worker. Dispatch order
//! within a batch is fixed (DIO0 first, timeout last), so the
//! packet-complete path always runs before FIFO-level housekeeping queued in
//! the same batch.

use log::{debug, info, trace, warn};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::Sx1272Error;
use crate::hal::{ControlPin, Hal, ResetDrive};
use crate::radio::calc;
use crate::radio::events::RadioEvents;
use crate::radio::irq::{DioLine, IrqPending, IrqStats, TxTimeoutTimer, EVT_TIMEOUT};
use crate::radio::registers::*;
use crate::radio::settings::{
    AntennaSwitch, BoardVariant, Modem, RadioSettings, RadioState, RxConfig, TxConfig,
};

/// Receive/transmit staging buffer capacity in bytes. Matches the largest
/// on-air payload either modem can declare.
pub const MAX_DATA_BUFFER_SIZE: usize = 255;

/// TX FIFO refill burst for packets larger than the hardware FIFO.
const FSK_TX_CHUNK_SIZE: u8 = 32;

/// Hardware FIFO depth of the FSK packet engine.
const FSK_FIFO_SIZE: usize = 64;

/// Settling time after leaving Sleep before the FIFO is accessible.
const RADIO_WAKEUP_TIME_MS: u64 = 1;

/// Reset pin timing per the power-on-reset sequence.
const RESET_HOLD_MS: u64 = 2;
const RESET_SETTLE_MS: u64 = 6;

/// Samples gathered by [`Sx1272Driver::random`], one bit each.
const RANDOM_SAMPLE_COUNT: u32 = 32;

/// The SX1272 state machine, generic over the platform HAL.
///
/// All methods are synchronous and must run under a single lock; the
/// interrupt path enters through [`dispatch`](Self::dispatch) only.
pub struct Sx1272Driver<H: Hal> {
    hal: H,
    settings: RadioSettings,
    events: Option<Weak<dyn RadioEvents + Send + Sync>>,
    pending: Arc<IrqPending>,
    tx_timeout_timer: TxTimeoutTimer,
    stats: IrqStats,
    data_buffer: [u8; MAX_DATA_BUFFER_SIZE],
    ant_switch: AntennaSwitch,
    variant: BoardVariant,
}

impl<H: Hal> Sx1272Driver<H> {
    /// Creates the driver around a HAL instance. No hardware access happens
    /// until [`init_radio`](Self::init_radio).
    pub fn new(hal: H, pending: Arc<IrqPending>) -> Self {
        let tx_timeout_timer = TxTimeoutTimer::new(Arc::clone(&pending));
        Self {
            hal,
            settings: RadioSettings::default(),
            events: None,
            pending,
            tx_timeout_timer,
            stats: IrqStats::default(),
            data_buffer: [0; MAX_DATA_BUFFER_SIZE],
            ant_switch: AntennaSwitch::None,
            variant: BoardVariant::Rfo,
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Resets the chip, verifies the silicon version, applies the default
    /// register table and leaves the radio idle on the FSK modem.
    pub fn init_radio(
        &mut self,
        events: Weak<dyn RadioEvents + Send + Sync>,
    ) -> Result<(), Sx1272Error> {
        self.events = Some(events);

        self.radio_reset()?;
        self.enable_tcxo()?;
        self.detect_board()?;

        let version = self.read_register(REG_VERSION)?;
        if version != SX1272_VERSION {
            return Err(Sx1272Error::InvalidConfig(format!(
                "unexpected silicon version 0x{version:02X}, expected 0x{:02X}",
                SX1272_VERSION
            )));
        }

        self.set_operation_mode(RF_OPMODE_SLEEP)?;
        self.setup_registers()?;
        self.set_modem(Modem::Fsk)?;
        self.settings.state = RadioState::Idle;

        info!(
            "SX1272 initialized: variant {:?}, antenna switch {:?}",
            self.variant, self.ant_switch
        );
        Ok(())
    }

    /// Attaches the posting closures to every wired DIO line.
    pub fn attach_dio_interrupts(&mut self) -> Result<(), Sx1272Error> {
        for line in DioLine::ALL {
            let pending = Arc::clone(&self.pending);
            self.hal
                .attach_dio_interrupt(line, Box::new(move || pending.post(line)))?;
        }
        Ok(())
    }

    /// Power-on-reset sequence: hold the reset line low, then release it and
    /// let the chip settle.
    fn radio_reset(&mut self) -> Result<(), Sx1272Error> {
        self.hal.set_reset(ResetDrive::Low)?;
        self.hal.delay_ms(RESET_HOLD_MS);
        self.hal.set_reset(ResetDrive::Release)?;
        self.hal.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    /// Powers the external TCXO when the board carries one.
    fn enable_tcxo(&mut self) -> Result<(), Sx1272Error> {
        if self.hal.control_pin_present(ControlPin::Tcxo) {
            self.hal.set_control_pin(ControlPin::Tcxo, true)?;
            self.hal.delay_ms(5);
            let tcxo = self.read_register(REG_TCXO)?;
            self.write_register(REG_TCXO, tcxo | 0x10)?;
        }
        Ok(())
    }

    /// Probes which antenna-switch wiring is populated and, on boards with a
    /// shared switch line, samples it to tell the PA_BOOST and RFO module
    /// variants apart.
    fn detect_board(&mut self) -> Result<(), Sx1272Error> {
        self.ant_switch = if self.hal.control_pin_present(ControlPin::RfSwitchCtl1)
            && self.hal.control_pin_present(ControlPin::RfSwitchCtl2)
        {
            AntennaSwitch::DualControl
        } else if self.hal.control_pin_present(ControlPin::TxCtl)
            && self.hal.control_pin_present(ControlPin::RxCtl)
        {
            AntennaSwitch::TxRxEnable
        } else if self.hal.control_pin_present(ControlPin::AntSwitch) {
            AntennaSwitch::SingleLine
        } else {
            AntennaSwitch::None
        };

        if self.ant_switch == AntennaSwitch::SingleLine {
            self.hal.delay_ms(1);
            self.variant = if self.hal.read_control_pin(ControlPin::AntSwitch)? {
                BoardVariant::PaBoost
            } else {
                BoardVariant::Rfo
            };
        } else {
            self.variant = BoardVariant::Rfo;
        }
        Ok(())
    }

    /// Writes the default-initialization table, switching the modem bank as
    /// each entry requires.
    fn setup_registers(&mut self) -> Result<(), Sx1272Error> {
        for entry in RADIO_INIT_REGISTERS {
            self.set_modem(entry.modem)?;
            self.write_register(entry.addr, entry.value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Register access
    // =========================================================================

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Sx1272Error> {
        self.write_registers(addr, &[value])
    }

    fn write_registers(&mut self, addr: u8, data: &[u8]) -> Result<(), Sx1272Error> {
        self.hal.set_nss(true)?;
        // MSB set selects write access
        self.hal.spi_write(addr | 0x80)?;
        for &byte in data {
            self.hal.spi_write(byte)?;
        }
        self.hal.set_nss(false)?;
        Ok(())
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, Sx1272Error> {
        let mut buf = [0u8; 1];
        self.read_registers(addr, &mut buf)?;
        Ok(buf[0])
    }

    fn read_registers(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Sx1272Error> {
        self.hal.set_nss(true)?;
        self.hal.spi_write(addr & 0x7F)?;
        for byte in buf.iter_mut() {
            *byte = self.hal.spi_write(0x00)?;
        }
        self.hal.set_nss(false)?;
        Ok(())
    }

    fn write_fifo(&mut self, data: &[u8]) -> Result<(), Sx1272Error> {
        self.write_registers(REG_FIFO, data)
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), Sx1272Error> {
        self.read_registers(REG_FIFO, buf)
    }

    // =========================================================================
    // Mode and modem control
    // =========================================================================

    /// Masked write of the mode bits, with antenna-switch handling: entering
    /// Sleep powers the switch down, any active mode routes it first.
    fn set_operation_mode(&mut self, mode: u8) -> Result<(), Sx1272Error> {
        if mode == RF_OPMODE_SLEEP {
            self.set_low_power_mode()?;
        } else {
            self.set_antenna_switch(mode)?;
        }
        let opmode = self.read_register(REG_OPMODE)?;
        self.write_register(REG_OPMODE, (opmode & RF_OPMODE_MASK) | mode)
    }

    /// Selects the modem bank. The chip's read-back is authoritative: if the
    /// long-range-mode bit already matches, nothing is written. Switching
    /// goes through Sleep because the bit is only writable there.
    fn set_modem(&mut self, modem: Modem) -> Result<(), Sx1272Error> {
        let opmode = self.read_register(REG_OPMODE)?;
        self.settings.modem = if opmode & RFLR_OPMODE_LONGRANGEMODE_ON != 0 {
            Modem::LoRa
        } else {
            Modem::Fsk
        };
        if self.settings.modem == modem {
            return Ok(());
        }

        self.settings.modem = modem;
        debug!("switching modem to {:?}", modem);
        match modem {
            Modem::Fsk => {
                self.sleep()?;
                let opmode = self.read_register(REG_OPMODE)?;
                self.write_register(
                    REG_OPMODE,
                    (opmode & RFLR_OPMODE_LONGRANGEMODE_MASK) | RFLR_OPMODE_LONGRANGEMODE_OFF,
                )?;
                self.write_register(REG_DIOMAPPING1, 0x00)?;
                // DIO5 = ModeReady
                self.write_register(REG_DIOMAPPING2, 0x30)?;
            }
            Modem::LoRa => {
                self.sleep()?;
                let opmode = self.read_register(REG_OPMODE)?;
                self.write_register(
                    REG_OPMODE,
                    (opmode & RFLR_OPMODE_LONGRANGEMODE_MASK) | RFLR_OPMODE_LONGRANGEMODE_ON,
                )?;
                self.write_register(REG_DIOMAPPING1, 0x00)?;
                self.write_register(REG_DIOMAPPING2, 0x00)?;
            }
        }
        Ok(())
    }

    /// Routes the antenna switch for the target mode on whichever wiring
    /// scheme the board populates.
    fn set_antenna_switch(&mut self, mode: u8) -> Result<(), Sx1272Error> {
        let tx = mode == RF_OPMODE_TRANSMITTER;
        match self.ant_switch {
            AntennaSwitch::DualControl => {
                self.hal.set_control_pin(ControlPin::RfSwitchCtl1, tx)?;
                self.hal.set_control_pin(ControlPin::RfSwitchCtl2, !tx)?;
            }
            AntennaSwitch::TxRxEnable => {
                self.hal.set_control_pin(ControlPin::TxCtl, tx)?;
                self.hal.set_control_pin(ControlPin::RxCtl, !tx)?;
            }
            AntennaSwitch::SingleLine => {
                self.hal.set_control_pin(ControlPin::AntSwitch, tx)?;
            }
            AntennaSwitch::None => {}
        }
        if self.hal.control_pin_present(ControlPin::PwrAmpCtl) {
            self.hal.set_control_pin(ControlPin::PwrAmpCtl, tx)?;
        }
        Ok(())
    }

    /// Parks every populated switch pin low so Sleep draws no switch current.
    fn set_low_power_mode(&mut self) -> Result<(), Sx1272Error> {
        for pin in [
            ControlPin::RfSwitchCtl1,
            ControlPin::RfSwitchCtl2,
            ControlPin::TxCtl,
            ControlPin::RxCtl,
            ControlPin::AntSwitch,
            ControlPin::PwrAmpCtl,
        ] {
            if self.hal.control_pin_present(pin) {
                self.hal.set_control_pin(pin, false)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Frequency hopping support is board-independent on this chip.
    pub fn check_rf_frequency(&self, _frequency: u32) -> bool {
        true
    }

    /// Tunes the synthesizer. Takes effect on the next mode entry.
    pub fn set_channel(&mut self, freq: u32) -> Result<(), Sx1272Error> {
        self.settings.channel = freq;
        let frf = (f64::from(freq) / FREQ_STEP) as u32;
        self.write_registers(
            REG_FRFMSB,
            &[(frf >> 16) as u8, (frf >> 8) as u8, frf as u8],
        )
    }

    /// Gathers 32 bits of entropy from wideband RSSI noise. Leaves the radio
    /// asleep on the LoRa modem.
    pub fn random(&mut self) -> Result<u32, Sx1272Error> {
        self.set_modem(Modem::LoRa)?;
        // All interrupts masked while sampling
        self.write_register(REG_LR_IRQFLAGSMASK, LoRaIrqFlags::all().bits())?;
        self.set_operation_mode(RF_OPMODE_RECEIVER)?;

        let mut rnd: u32 = 0;
        for i in 0..RANDOM_SAMPLE_COUNT {
            self.hal.delay_ms(1);
            let noise = self.read_register(REG_LR_RSSIWIDEBAND)?;
            rnd |= u32::from(noise & 0x01) << i;
        }
        self.sleep()?;
        Ok(rnd)
    }

    /// Applies a receive configuration and selects the matching modem.
    pub fn set_rx_config(&mut self, config: RxConfig) -> Result<(), Sx1272Error> {
        match config {
            RxConfig::Fsk(cfg) => {
                self.set_modem(Modem::Fsk)?;

                let fsk = &mut self.settings.fsk;
                fsk.bandwidth = cfg.bandwidth;
                fsk.datarate = cfg.datarate;
                fsk.bandwidth_afc = cfg.bandwidth_afc;
                fsk.preamble_len = cfg.preamble_len;
                fsk.fix_len = cfg.fix_len;
                fsk.payload_len = cfg.payload_len;
                fsk.crc_on = cfg.crc_on;
                fsk.rx_continuous = cfg.rx_continuous;
                fsk.rx_single_timeout_ms =
                    calc::fsk_rx_single_timeout_ms(cfg.datarate, cfg.symb_timeout);

                let bitrate = (f64::from(XTAL_FREQ) / f64::from(cfg.datarate)) as u16;
                self.write_register(REG_BITRATEMSB, (bitrate >> 8) as u8)?;
                self.write_register(REG_BITRATELSB, bitrate as u8)?;

                self.write_register(REG_RXBW, calc::fsk_bandwidth_reg_value(cfg.bandwidth)?)?;
                self.write_register(
                    REG_AFCBW,
                    calc::fsk_bandwidth_reg_value(cfg.bandwidth_afc)?,
                )?;

                self.write_register(REG_PREAMBLEMSB, (cfg.preamble_len >> 8) as u8)?;
                self.write_register(REG_PREAMBLELSB, cfg.preamble_len as u8)?;

                if cfg.fix_len {
                    self.write_register(REG_PAYLOADLENGTH, cfg.payload_len)?;
                } else {
                    self.write_register(REG_PAYLOADLENGTH, 0xFF)?;
                }

                let pktcfg1 = self.read_register(REG_PACKETCONFIG1)?;
                self.write_register(
                    REG_PACKETCONFIG1,
                    (pktcfg1 & RF_PACKETCONFIG1_CRC_MASK & RF_PACKETCONFIG1_PACKETFORMAT_MASK)
                        | if cfg.fix_len {
                            RF_PACKETCONFIG1_PACKETFORMAT_FIXED
                        } else {
                            RF_PACKETCONFIG1_PACKETFORMAT_VARIABLE
                        }
                        | if cfg.crc_on {
                            RF_PACKETCONFIG1_CRC_ON
                        } else {
                            RF_PACKETCONFIG1_CRC_OFF
                        },
                )?;
                let pktcfg2 = self.read_register(REG_PACKETCONFIG2)?;
                self.write_register(REG_PACKETCONFIG2, pktcfg2 | RF_PACKETCONFIG2_DATAMODE_PACKET)
            }
            RxConfig::LoRa(cfg) => {
                self.set_modem(Modem::LoRa)?;

                if cfg.bandwidth > 2 {
                    return Err(Sx1272Error::InvalidConfig(format!(
                        "LoRa bandwidth index {} not supported, valid range 0..=2",
                        cfg.bandwidth
                    )));
                }
                let datarate = cfg.datarate.clamp(6, 12);
                let ldro = calc::lora_low_datarate_optimize(cfg.bandwidth, datarate);

                let lora = &mut self.settings.lora;
                lora.bandwidth = cfg.bandwidth;
                lora.datarate = datarate;
                lora.coderate = cfg.coderate;
                lora.preamble_len = cfg.preamble_len;
                lora.fix_len = cfg.fix_len;
                lora.payload_len = cfg.payload_len;
                lora.crc_on = cfg.crc_on;
                lora.freq_hop_on = cfg.freq_hop_on;
                lora.hop_period = cfg.hop_period;
                lora.iq_inverted = cfg.iq_inverted;
                lora.rx_continuous = cfg.rx_continuous;
                lora.low_datarate_optimize = ldro;

                let cfg1 = self.read_register(REG_LR_MODEMCONFIG1)?;
                self.write_register(
                    REG_LR_MODEMCONFIG1,
                    (cfg1 & RFLR_MODEMCONFIG1_BW_MASK
                        & RFLR_MODEMCONFIG1_CODINGRATE_MASK
                        & RFLR_MODEMCONFIG1_IMPLICITHEADER_MASK
                        & RFLR_MODEMCONFIG1_RXPAYLOADCRC_MASK
                        & RFLR_MODEMCONFIG1_LOWDATARATEOPTIMIZE_MASK)
                        | (cfg.bandwidth << 6)
                        | (cfg.coderate << 3)
                        | (u8::from(cfg.fix_len) << 2)
                        | (u8::from(cfg.crc_on) << 1)
                        | u8::from(ldro),
                )?;

                let cfg2 = self.read_register(REG_LR_MODEMCONFIG2)?;
                self.write_register(
                    REG_LR_MODEMCONFIG2,
                    (cfg2 & RFLR_MODEMCONFIG2_SF_MASK & RFLR_MODEMCONFIG2_SYMBTIMEOUTMSB_MASK)
                        | (datarate << 4)
                        | ((cfg.symb_timeout >> 8) as u8 & !RFLR_MODEMCONFIG2_SYMBTIMEOUTMSB_MASK),
                )?;
                self.write_register(REG_LR_SYMBTIMEOUTLSB, cfg.symb_timeout as u8)?;

                self.write_register(REG_LR_PREAMBLEMSB, (cfg.preamble_len >> 8) as u8)?;
                self.write_register(REG_LR_PREAMBLELSB, cfg.preamble_len as u8)?;

                if cfg.fix_len {
                    self.write_register(REG_LR_PAYLOADLENGTH, cfg.payload_len)?;
                }

                if cfg.freq_hop_on {
                    let pllhop = self.read_register(REG_LR_PLLHOP)?;
                    self.write_register(
                        REG_LR_PLLHOP,
                        (pllhop & RFLR_PLLHOP_FASTHOP_MASK) | RFLR_PLLHOP_FASTHOP_ON,
                    )?;
                    self.write_register(REG_LR_HOPPERIOD, cfg.hop_period)?;
                }

                self.apply_detection_optimize(datarate)
            }
        }
    }

    /// Applies a transmit configuration and selects the matching modem.
    pub fn set_tx_config(&mut self, config: TxConfig) -> Result<(), Sx1272Error> {
        match config {
            TxConfig::Fsk(cfg) => {
                self.set_modem(Modem::Fsk)?;

                let fsk = &mut self.settings.fsk;
                fsk.power = cfg.power;
                fsk.fdev = cfg.fdev;
                fsk.datarate = cfg.datarate;
                fsk.preamble_len = cfg.preamble_len;
                fsk.fix_len = cfg.fix_len;
                fsk.crc_on = cfg.crc_on;
                fsk.tx_timeout_ms = cfg.timeout_ms;

                let fdev = (f64::from(cfg.fdev) / FREQ_STEP) as u16;
                self.write_register(REG_FDEVMSB, (fdev >> 8) as u8)?;
                self.write_register(REG_FDEVLSB, fdev as u8)?;

                let bitrate = (f64::from(XTAL_FREQ) / f64::from(cfg.datarate)) as u16;
                self.write_register(REG_BITRATEMSB, (bitrate >> 8) as u8)?;
                self.write_register(REG_BITRATELSB, bitrate as u8)?;

                self.write_register(REG_PREAMBLEMSB, (cfg.preamble_len >> 8) as u8)?;
                self.write_register(REG_PREAMBLELSB, cfg.preamble_len as u8)?;

                let pktcfg1 = self.read_register(REG_PACKETCONFIG1)?;
                self.write_register(
                    REG_PACKETCONFIG1,
                    (pktcfg1 & RF_PACKETCONFIG1_CRC_MASK & RF_PACKETCONFIG1_PACKETFORMAT_MASK)
                        | if cfg.fix_len {
                            RF_PACKETCONFIG1_PACKETFORMAT_FIXED
                        } else {
                            RF_PACKETCONFIG1_PACKETFORMAT_VARIABLE
                        }
                        | if cfg.crc_on {
                            RF_PACKETCONFIG1_CRC_ON
                        } else {
                            RF_PACKETCONFIG1_CRC_OFF
                        },
                )?;
                let pktcfg2 = self.read_register(REG_PACKETCONFIG2)?;
                self.write_register(
                    REG_PACKETCONFIG2,
                    pktcfg2 | RF_PACKETCONFIG2_DATAMODE_PACKET,
                )?;

                self.set_rf_tx_power(cfg.power)
            }
            TxConfig::LoRa(cfg) => {
                self.set_modem(Modem::LoRa)?;

                if cfg.bandwidth > 2 {
                    return Err(Sx1272Error::InvalidConfig(format!(
                        "LoRa bandwidth index {} not supported, valid range 0..=2",
                        cfg.bandwidth
                    )));
                }
                let datarate = cfg.datarate.clamp(6, 12);
                let ldro = calc::lora_low_datarate_optimize(cfg.bandwidth, datarate);

                let lora = &mut self.settings.lora;
                lora.power = cfg.power;
                lora.bandwidth = cfg.bandwidth;
                lora.datarate = datarate;
                lora.coderate = cfg.coderate;
                lora.preamble_len = cfg.preamble_len;
                lora.fix_len = cfg.fix_len;
                lora.crc_on = cfg.crc_on;
                lora.freq_hop_on = cfg.freq_hop_on;
                lora.hop_period = cfg.hop_period;
                lora.iq_inverted = cfg.iq_inverted;
                lora.tx_timeout_ms = cfg.timeout_ms;
                lora.low_datarate_optimize = ldro;

                let cfg1 = self.read_register(REG_LR_MODEMCONFIG1)?;
                self.write_register(
                    REG_LR_MODEMCONFIG1,
                    (cfg1 & RFLR_MODEMCONFIG1_BW_MASK
                        & RFLR_MODEMCONFIG1_CODINGRATE_MASK
                        & RFLR_MODEMCONFIG1_IMPLICITHEADER_MASK
                        & RFLR_MODEMCONFIG1_RXPAYLOADCRC_MASK
                        & RFLR_MODEMCONFIG1_LOWDATARATEOPTIMIZE_MASK)
                        | (cfg.bandwidth << 6)
                        | (cfg.coderate << 3)
                        | (u8::from(cfg.fix_len) << 2)
                        | (u8::from(cfg.crc_on) << 1)
                        | u8::from(ldro),
                )?;

                let cfg2 = self.read_register(REG_LR_MODEMCONFIG2)?;
                self.write_register(
                    REG_LR_MODEMCONFIG2,
                    (cfg2 & RFLR_MODEMCONFIG2_SF_MASK) | (datarate << 4),
                )?;

                self.write_register(REG_LR_PREAMBLEMSB, (cfg.preamble_len >> 8) as u8)?;
                self.write_register(REG_LR_PREAMBLELSB, cfg.preamble_len as u8)?;

                if cfg.freq_hop_on {
                    let pllhop = self.read_register(REG_LR_PLLHOP)?;
                    self.write_register(
                        REG_LR_PLLHOP,
                        (pllhop & RFLR_PLLHOP_FASTHOP_MASK) | RFLR_PLLHOP_FASTHOP_ON,
                    )?;
                    self.write_register(REG_LR_HOPPERIOD, cfg.hop_period)?;
                }

                self.apply_detection_optimize(datarate)?;
                self.set_rf_tx_power(cfg.power)
            }
        }
    }

    /// SF6 needs its own detection optimize and threshold values.
    fn apply_detection_optimize(&mut self, datarate: u8) -> Result<(), Sx1272Error> {
        let detect = self.read_register(REG_LR_DETECTOPTIMIZE)?;
        if datarate == 6 {
            self.write_register(
                REG_LR_DETECTOPTIMIZE,
                (detect & RFLR_DETECTIONOPTIMIZE_MASK) | RFLR_DETECTIONOPTIMIZE_SF6,
            )?;
            self.write_register(REG_LR_DETECTIONTHRESHOLD, RFLR_DETECTIONTHRESH_SF6)
        } else {
            self.write_register(
                REG_LR_DETECTOPTIMIZE,
                (detect & RFLR_DETECTIONOPTIMIZE_MASK) | RFLR_DETECTIONOPTIMIZE_SF7_TO_SF12,
            )?;
            self.write_register(REG_LR_DETECTIONTHRESHOLD, RFLR_DETECTIONTHRESH_SF7_TO_SF12)
        }
    }

    /// Encodes and writes the TX power for the detected PA wiring.
    fn set_rf_tx_power(&mut self, power: i8) -> Result<(), Sx1272Error> {
        let paconfig = self.read_register(REG_PACONFIG)?;
        let padac = self.read_register(REG_PADAC)?;
        let (paconfig, padac) =
            calc::encode_tx_power(power, self.variant == BoardVariant::PaBoost, paconfig, padac);
        self.write_register(REG_PACONFIG, paconfig)?;
        self.write_register(REG_PADAC, padac)
    }

    /// Time-on-air in milliseconds for a payload of `pkt_len` bytes under
    /// the currently applied configuration of `modem`.
    ///
    /// The FSK figure reads the live sync-word and address-filter framing
    /// from the chip so it matches what actually goes on air.
    pub fn time_on_air(&mut self, modem: Modem, pkt_len: u8) -> Result<u32, Sx1272Error> {
        match modem {
            Modem::Fsk => {
                let sync_size = (self.read_register(REG_SYNCCONFIG)? & !RF_SYNCCONFIG_SYNCSIZE_MASK) + 1;
                let addr_filter = (self.read_register(REG_PACKETCONFIG1)?
                    & !RF_PACKETCONFIG1_ADDRSFILTERING_MASK)
                    != 0;
                let fsk = &self.settings.fsk;
                Ok(calc::fsk_time_on_air(
                    fsk.datarate,
                    fsk.preamble_len,
                    fsk.fix_len,
                    fsk.crc_on,
                    sync_size,
                    addr_filter,
                    pkt_len,
                ))
            }
            Modem::LoRa => {
                let lora = &self.settings.lora;
                Ok(calc::lora_time_on_air(
                    lora.bandwidth,
                    lora.datarate,
                    lora.coderate,
                    lora.preamble_len,
                    lora.fix_len,
                    lora.crc_on,
                    lora.low_datarate_optimize,
                    pkt_len,
                ))
            }
        }
    }

    /// Queues a payload and starts transmission on the active modem.
    ///
    /// Completion is reported via [`RadioEvents::tx_done`]; a transmission
    /// that never completes is recovered by the TX timeout.
    pub fn send(&mut self, buffer: &[u8]) -> Result<(), Sx1272Error> {
        if buffer.is_empty() || buffer.len() > MAX_DATA_BUFFER_SIZE {
            return Err(Sx1272Error::InvalidConfig(format!(
                "payload length {} outside 1..={}",
                buffer.len(),
                MAX_DATA_BUFFER_SIZE
            )));
        }
        let size = buffer.len() as u8;

        // FIFO access is invalid in Sleep on either modem
        if self.read_register(REG_OPMODE)? & !RF_OPMODE_MASK == RF_OPMODE_SLEEP {
            self.standby()?;
            self.hal.delay_ms(RADIO_WAKEUP_TIME_MS);
        }

        let tx_timeout_ms = match self.settings.modem {
            Modem::Fsk => {
                self.settings.fsk_packet_handler.nb_bytes = 0;
                self.settings.fsk_packet_handler.size = u16::from(size);
                self.data_buffer[..buffer.len()].copy_from_slice(buffer);

                if self.settings.fsk.fix_len {
                    self.write_register(REG_PAYLOADLENGTH, size)?;
                } else {
                    self.write_fifo(&[size])?;
                }

                // Whole packet fits the FIFO in one burst, otherwise stream
                // it in refill chunks via the FIFO-level interrupt
                let chunk = if buffer.len() <= FSK_FIFO_SIZE {
                    size
                } else {
                    FSK_TX_CHUNK_SIZE
                };
                self.settings.fsk_packet_handler.chunk_size = chunk;
                let chunk = usize::from(chunk);
                let first = self.data_buffer[..chunk].to_vec();
                self.write_fifo(&first)?;
                self.settings.fsk_packet_handler.nb_bytes = chunk as u16;

                self.settings.fsk.tx_timeout_ms
            }
            Modem::LoRa => {
                if self.settings.lora.iq_inverted {
                    let invertiq = self.read_register(REG_LR_INVERTIQ)?;
                    self.write_register(
                        REG_LR_INVERTIQ,
                        (invertiq & RFLR_INVERTIQ_TX_MASK & RFLR_INVERTIQ_RX_MASK)
                            | RFLR_INVERTIQ_RX_OFF
                            | RFLR_INVERTIQ_TX_ON,
                    )?;
                    self.write_register(REG_LR_INVERTIQ2, RFLR_INVERTIQ2_ON)?;
                } else {
                    let invertiq = self.read_register(REG_LR_INVERTIQ)?;
                    self.write_register(
                        REG_LR_INVERTIQ,
                        (invertiq & RFLR_INVERTIQ_TX_MASK & RFLR_INVERTIQ_RX_MASK)
                            | RFLR_INVERTIQ_RX_OFF
                            | RFLR_INVERTIQ_TX_OFF,
                    )?;
                    self.write_register(REG_LR_INVERTIQ2, RFLR_INVERTIQ2_OFF)?;
                }

                self.settings.lora_packet_handler.size = size;
                self.write_register(REG_LR_PAYLOADLENGTH, size)?;
                self.write_register(REG_LR_FIFOTXBASEADDR, 0)?;
                self.write_register(REG_LR_FIFOADDRPTR, 0)?;
                self.write_fifo(buffer)?;

                self.settings.lora.tx_timeout_ms
            }
        };

        self.transmit(tx_timeout_ms)
    }

    /// Maps the DIO lines for TX, arms the supervision timer and keys up.
    fn transmit(&mut self, timeout_ms: u32) -> Result<(), Sx1272Error> {
        match self.settings.modem {
            Modem::Fsk => {
                // DIO0 = PacketSent, DIO1 = FifoLevel
                let dio1 = self.read_register(REG_DIOMAPPING1)?;
                self.write_register(
                    REG_DIOMAPPING1,
                    dio1 & RF_DIOMAPPING1_DIO0_MASK
                        & RF_DIOMAPPING1_DIO1_MASK
                        & RF_DIOMAPPING1_DIO2_MASK,
                )?;
                let dio2 = self.read_register(REG_DIOMAPPING2)?;
                self.write_register(
                    REG_DIOMAPPING2,
                    dio2 & RF_DIOMAPPING2_DIO4_MASK & RF_DIOMAPPING2_MAP_MASK,
                )?;
                self.settings.fsk_packet_handler.fifo_thresh =
                    self.read_register(REG_FIFOTHRESH)? & RF_FIFOTHRESH_FIFOTHRESHOLD_MASK;
            }
            Modem::LoRa => {
                if self.settings.lora.freq_hop_on {
                    self.write_register(
                        REG_LR_IRQFLAGSMASK,
                        LoRaIrqFlags::all()
                            .difference(LoRaIrqFlags::TX_DONE | LoRaIrqFlags::FHSS_CHANGED_CHANNEL)
                            .bits(),
                    )?;
                    // DIO0 = TxDone, DIO2 = FhssChangeChannel
                    let dio1 = self.read_register(REG_DIOMAPPING1)?;
                    self.write_register(
                        REG_DIOMAPPING1,
                        (dio1 & RFLR_DIOMAPPING1_DIO0_MASK & RFLR_DIOMAPPING1_DIO2_MASK)
                            | RFLR_DIOMAPPING1_DIO0_01
                            | RFLR_DIOMAPPING1_DIO2_00,
                    )?;
                } else {
                    self.write_register(
                        REG_LR_IRQFLAGSMASK,
                        LoRaIrqFlags::all().difference(LoRaIrqFlags::TX_DONE).bits(),
                    )?;
                    // DIO0 = TxDone
                    let dio1 = self.read_register(REG_DIOMAPPING1)?;
                    self.write_register(
                        REG_DIOMAPPING1,
                        (dio1 & RFLR_DIOMAPPING1_DIO0_MASK) | RFLR_DIOMAPPING1_DIO0_01,
                    )?;
                }
            }
        }

        self.settings.state = RadioState::TxRunning;
        self.tx_timeout_timer
            .arm(Duration::from_millis(u64::from(timeout_ms)));
        trace!("TX started, timeout {} ms", timeout_ms);
        self.set_operation_mode(RF_OPMODE_TRANSMITTER)
    }

    /// Cancels any supervision timer and puts the chip to Sleep.
    pub fn sleep(&mut self) -> Result<(), Sx1272Error> {
        self.tx_timeout_timer.cancel();
        self.set_operation_mode(RF_OPMODE_SLEEP)?;
        self.settings.state = RadioState::Idle;
        self.hal.delay_ms(RADIO_WAKEUP_TIME_MS);
        Ok(())
    }

    /// Cancels any supervision timer and brings the chip to Standby.
    pub fn standby(&mut self) -> Result<(), Sx1272Error> {
        self.tx_timeout_timer.cancel();
        self.set_operation_mode(RF_OPMODE_STANDBY)?;
        self.settings.state = RadioState::Idle;
        Ok(())
    }

    /// Enters receive mode under the applied RX configuration: continuous or
    /// single-shot, with the DIO lines mapped for the active modem.
    pub fn receive(&mut self) -> Result<(), Sx1272Error> {
        match self.settings.modem {
            Modem::Fsk => {
                // DIO0 = PayloadReady, DIO1 = FifoLevel, DIO2 = SyncAddr,
                // DIO4 = PreambleDetect
                let dio1 = self.read_register(REG_DIOMAPPING1)?;
                self.write_register(
                    REG_DIOMAPPING1,
                    (dio1 & RF_DIOMAPPING1_DIO0_MASK
                        & RF_DIOMAPPING1_DIO1_MASK
                        & RF_DIOMAPPING1_DIO2_MASK)
                        | RF_DIOMAPPING1_DIO0_00
                        | RF_DIOMAPPING1_DIO1_00
                        | RF_DIOMAPPING1_DIO2_11,
                )?;
                let dio2 = self.read_register(REG_DIOMAPPING2)?;
                self.write_register(
                    REG_DIOMAPPING2,
                    (dio2 & RF_DIOMAPPING2_DIO4_MASK & RF_DIOMAPPING2_MAP_MASK)
                        | RF_DIOMAPPING2_DIO4_11
                        | RF_DIOMAPPING2_MAP_PREAMBLEDETECT,
                )?;

                self.settings.fsk_packet_handler.fifo_thresh =
                    self.read_register(REG_FIFOTHRESH)? & RF_FIFOTHRESH_FIFOTHRESHOLD_MASK;

                self.write_register(
                    REG_RXCONFIG,
                    RF_RXCONFIG_AFCAUTO_ON
                        | RF_RXCONFIG_AGCAUTO_ON
                        | RF_RXCONFIG_RXTRIGER_PREAMBLEDETECT,
                )?;

                self.settings.fsk_packet_handler.preamble_detected = false;
                self.settings.fsk_packet_handler.sync_word_detected = false;
                self.settings.fsk_packet_handler.nb_bytes = 0;
                self.settings.fsk_packet_handler.size = 0;
            }
            Modem::LoRa => {
                if self.settings.lora.iq_inverted {
                    let invertiq = self.read_register(REG_LR_INVERTIQ)?;
                    self.write_register(
                        REG_LR_INVERTIQ,
                        (invertiq & RFLR_INVERTIQ_TX_MASK & RFLR_INVERTIQ_RX_MASK)
                            | RFLR_INVERTIQ_RX_ON
                            | RFLR_INVERTIQ_TX_OFF,
                    )?;
                    self.write_register(REG_LR_INVERTIQ2, RFLR_INVERTIQ2_ON)?;
                } else {
                    let invertiq = self.read_register(REG_LR_INVERTIQ)?;
                    self.write_register(
                        REG_LR_INVERTIQ,
                        (invertiq & RFLR_INVERTIQ_TX_MASK & RFLR_INVERTIQ_RX_MASK)
                            | RFLR_INVERTIQ_RX_OFF
                            | RFLR_INVERTIQ_TX_OFF,
                    )?;
                    self.write_register(REG_LR_INVERTIQ2, RFLR_INVERTIQ2_OFF)?;
                }

                if self.settings.lora.freq_hop_on {
                    self.write_register(
                        REG_LR_IRQFLAGSMASK,
                        LoRaIrqFlags::all()
                            .difference(
                                LoRaIrqFlags::RX_TIMEOUT
                                    | LoRaIrqFlags::RX_DONE
                                    | LoRaIrqFlags::PAYLOAD_CRC_ERROR
                                    | LoRaIrqFlags::FHSS_CHANGED_CHANNEL,
                            )
                            .bits(),
                    )?;
                    // DIO0 = RxDone, DIO2 = FhssChangeChannel
                    let dio1 = self.read_register(REG_DIOMAPPING1)?;
                    self.write_register(
                        REG_DIOMAPPING1,
                        (dio1 & RFLR_DIOMAPPING1_DIO0_MASK & RFLR_DIOMAPPING1_DIO2_MASK)
                            | RFLR_DIOMAPPING1_DIO0_00
                            | RFLR_DIOMAPPING1_DIO2_00,
                    )?;
                } else {
                    self.write_register(
                        REG_LR_IRQFLAGSMASK,
                        LoRaIrqFlags::all()
                            .difference(
                                LoRaIrqFlags::RX_TIMEOUT
                                    | LoRaIrqFlags::RX_DONE
                                    | LoRaIrqFlags::PAYLOAD_CRC_ERROR,
                            )
                            .bits(),
                    )?;
                    // DIO0 = RxDone, DIO1 stays on RxTimeout
                    let dio1 = self.read_register(REG_DIOMAPPING1)?;
                    self.write_register(
                        REG_DIOMAPPING1,
                        (dio1 & RFLR_DIOMAPPING1_DIO0_MASK) | RFLR_DIOMAPPING1_DIO0_00,
                    )?;
                }

                self.write_register(REG_LR_FIFORXBASEADDR, 0)?;
                self.write_register(REG_LR_FIFOADDRPTR, 0)?;
            }
        }

        self.data_buffer.fill(0);
        self.settings.state = RadioState::RxRunning;

        match self.settings.modem {
            Modem::Fsk => self.set_operation_mode(RF_OPMODE_RECEIVER),
            Modem::LoRa => {
                if self.settings.lora.rx_continuous {
                    self.set_operation_mode(RF_OPMODE_RECEIVER)
                } else {
                    self.set_operation_mode(RFLR_OPMODE_RECEIVER_SINGLE)
                }
            }
        }
    }

    /// Starts a LoRa channel-activity-detection cycle. The outcome arrives
    /// via [`RadioEvents::cad_done`]. Not meaningful on FSK, where the call
    /// does nothing.
    pub fn start_cad(&mut self) -> Result<(), Sx1272Error> {
        match self.settings.modem {
            Modem::Fsk => {
                debug!("start_cad ignored on the FSK modem");
                Ok(())
            }
            Modem::LoRa => {
                self.write_register(
                    REG_LR_IRQFLAGSMASK,
                    LoRaIrqFlags::all()
                        .difference(LoRaIrqFlags::CAD_DONE | LoRaIrqFlags::CAD_DETECTED)
                        .bits(),
                )?;
                // DIO3 = CadDone
                let dio1 = self.read_register(REG_DIOMAPPING1)?;
                self.write_register(
                    REG_DIOMAPPING1,
                    (dio1 & RFLR_DIOMAPPING1_DIO3_MASK) | RFLR_DIOMAPPING1_DIO3_00,
                )?;
                self.settings.state = RadioState::Cad;
                self.set_operation_mode(RFLR_OPMODE_CAD)
            }
        }
    }

    /// Emits an unmodulated carrier at `freq` for `time_s` seconds, used for
    /// regulatory bench measurements. Ends through the TX timeout path.
    pub fn set_tx_continuous_wave(
        &mut self,
        freq: u32,
        power: i8,
        time_s: u16,
    ) -> Result<(), Sx1272Error> {
        let timeout_ms = u32::from(time_s) * 1000;

        self.set_channel(freq)?;
        self.set_tx_config(TxConfig::Fsk(crate::radio::settings::FskTxConfig {
            power,
            fdev: 0,
            datarate: 4_800,
            preamble_len: 5,
            fix_len: false,
            crc_on: false,
            timeout_ms,
        }))?;

        // Continuous data mode, DIO lines parked on unused functions
        let pktcfg2 = self.read_register(REG_PACKETCONFIG2)?;
        self.write_register(REG_PACKETCONFIG2, pktcfg2 & RF_PACKETCONFIG2_DATAMODE_MASK)?;
        self.write_register(
            REG_DIOMAPPING1,
            RF_DIOMAPPING1_DIO0_11 | RF_DIOMAPPING1_DIO1_11,
        )?;
        self.write_register(
            REG_DIOMAPPING2,
            RF_DIOMAPPING2_DIO4_10 | RF_DIOMAPPING2_DIO5_10,
        )?;

        self.settings.state = RadioState::TxRunning;
        self.tx_timeout_timer
            .arm(Duration::from_millis(u64::from(timeout_ms)));
        self.set_operation_mode(RF_OPMODE_TRANSMITTER)
    }

    /// Instantaneous RSSI in dBm on the given modem.
    pub fn get_rssi(&mut self, modem: Modem) -> Result<i16, Sx1272Error> {
        match modem {
            Modem::Fsk => Ok(-i16::from(self.read_register(REG_RSSIVALUE)? >> 1)),
            Modem::LoRa => {
                Ok(RSSI_OFFSET + i16::from(self.read_register(REG_LR_RSSIVALUE)?))
            }
        }
    }

    /// Listens on `freq` for up to `max_time_ms`, polling RSSI every
    /// millisecond. Returns `true` when the channel stayed below
    /// `rssi_threshold` the whole time. Leaves the radio asleep.
    pub fn perform_carrier_sense(
        &mut self,
        modem: Modem,
        freq: u32,
        rssi_threshold: i16,
        max_time_ms: u32,
    ) -> Result<bool, Sx1272Error> {
        let mut channel_free = true;

        self.set_modem(modem)?;
        self.set_channel(freq)?;
        self.set_operation_mode(RF_OPMODE_RECEIVER)?;
        self.hal.delay_ms(RADIO_WAKEUP_TIME_MS);

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(u64::from(max_time_ms)) {
            let rssi = self.get_rssi(modem)?;
            if rssi > rssi_threshold {
                channel_free = false;
                break;
            }
            self.hal.delay_ms(1);
        }
        self.sleep()?;
        Ok(channel_free)
    }

    /// Caps the accepted payload length on RX.
    pub fn set_max_payload_length(&mut self, modem: Modem, max: u8) -> Result<(), Sx1272Error> {
        self.set_modem(modem)?;
        match modem {
            Modem::Fsk => {
                if !self.settings.fsk.fix_len {
                    self.write_register(REG_PAYLOADLENGTH, max)?;
                }
                Ok(())
            }
            Modem::LoRa => self.write_register(REG_LR_PAYLOADMAXLENGTH, max),
        }
    }

    /// Selects the public (LoRaWAN) or private LoRa sync word. The choice
    /// survives TX-timeout recovery.
    pub fn set_public_network(&mut self, enable: bool) -> Result<(), Sx1272Error> {
        self.set_modem(Modem::LoRa)?;
        self.settings.lora.public_network = enable;
        self.write_register(
            REG_LR_SYNCWORD,
            if enable {
                LORA_MAC_PUBLIC_SYNCWORD
            } else {
                LORA_MAC_PRIVATE_SYNCWORD
            },
        )
    }

    /// Current operating state.
    pub fn get_status(&self) -> RadioState {
        self.settings.state
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> IrqStats {
        self.stats
    }

    /// Read-only view of the applied settings, for diagnostics.
    pub fn settings(&self) -> &RadioSettings {
        &self.settings
    }

    /// Access to the underlying HAL.
    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    // =========================================================================
    // Interrupt dispatch
    // =========================================================================

    /// Processes one drained event mask. Lines run in fixed priority order
    /// with the synthetic timeout last.
    pub fn dispatch(&mut self, mask: u8) -> Result<(), Sx1272Error> {
        self.stats.batches += 1;
        for line in DioLine::ALL {
            if mask & line.bit() != 0 {
                self.stats.dio_events[line as usize] += 1;
                match line {
                    DioLine::Dio0 => self.handle_dio0()?,
                    DioLine::Dio1 => self.handle_dio1()?,
                    DioLine::Dio2 => self.handle_dio2()?,
                    DioLine::Dio3 => self.handle_dio3()?,
                    DioLine::Dio4 => self.handle_dio4()?,
                    DioLine::Dio5 => self.handle_dio5()?,
                }
            }
        }
        if mask & EVT_TIMEOUT != 0 {
            self.stats.timeout_events += 1;
            self.handle_timeout()?;
        }
        Ok(())
    }

    fn events(&self) -> Option<Arc<dyn RadioEvents + Send + Sync>> {
        self.events.as_ref().and_then(Weak::upgrade)
    }

    /// Resets the transient FSK receive bookkeeping.
    fn reset_fsk_packet_handler(&mut self) {
        let handler = &mut self.settings.fsk_packet_handler;
        handler.preamble_detected = false;
        handler.sync_word_detected = false;
        handler.nb_bytes = 0;
        handler.size = 0;
    }

    /// Learns the declared FSK packet size if not known yet. In
    /// variable-length mode a declaration above the configured maximum
    /// accepted payload aborts the reception before any FIFO drain.
    fn fsk_learn_packet_size(&mut self) -> Result<bool, Sx1272Error> {
        if self.settings.fsk_packet_handler.size != 0
            || self.settings.fsk_packet_handler.nb_bytes != 0
        {
            return Ok(true);
        }
        let size = if self.settings.fsk.fix_len {
            u16::from(self.read_register(REG_PAYLOADLENGTH)?)
        } else {
            let mut len = [0u8; 1];
            self.read_fifo(&mut len)?;
            let declared = u16::from(len[0]);
            // REG_PAYLOADLENGTH holds the maximum accepted length here
            let max_accepted = u16::from(self.read_register(REG_PAYLOADLENGTH)?);
            if declared > max_accepted {
                warn!(
                    "declared FSK payload length {} exceeds accepted maximum {}, dropping",
                    declared, max_accepted
                );
                self.fsk_abort_rx()?;
                return Ok(false);
            }
            declared
        };
        self.settings.fsk_packet_handler.size = size;
        Ok(true)
    }

    /// Abandons the in-flight FSK reception: restart or idle per the RX
    /// mode, report `rx_error`, clear the transient state.
    fn fsk_abort_rx(&mut self) -> Result<(), Sx1272Error> {
        if self.settings.fsk.rx_continuous {
            let rxconfig = self.read_register(REG_RXCONFIG)?;
            self.write_register(REG_RXCONFIG, rxconfig | RF_RXCONFIG_RESTARTRXWITHOUTPLLLOCK)?;
        } else {
            self.settings.state = RadioState::Idle;
        }
        if let Some(events) = self.events() {
            events.rx_error();
        }
        self.reset_fsk_packet_handler();
        Ok(())
    }

    /// Drains `count` received bytes from the FIFO into the staging buffer.
    /// The drain is clamped to the remaining buffer capacity, so a corrupted
    /// size declaration can never write past the buffer.
    fn fsk_drain_fifo(&mut self, count: u16) -> Result<(), Sx1272Error> {
        let offset = usize::from(self.settings.fsk_packet_handler.nb_bytes);
        let count = usize::from(count).min(MAX_DATA_BUFFER_SIZE.saturating_sub(offset));
        let mut chunk = [0u8; MAX_DATA_BUFFER_SIZE];
        self.read_fifo(&mut chunk[..count])?;
        self.data_buffer[offset..offset + count].copy_from_slice(&chunk[..count]);
        self.settings.fsk_packet_handler.nb_bytes += count as u16;
        Ok(())
    }

    /// DIO0: packet complete. FSK PayloadReady / LoRa RxDone in RX, FSK
    /// PacketSent / LoRa TxDone in TX.
    fn handle_dio0(&mut self) -> Result<(), Sx1272Error> {
        match (self.settings.state, self.settings.modem) {
            (RadioState::RxRunning, Modem::Fsk) => {
                if self.settings.fsk.crc_on {
                    let irq_flags =
                        FskIrqFlags2::from_bits_truncate(self.read_register(REG_IRQFLAGS2)?);
                    if !irq_flags.contains(FskIrqFlags2::CRC_OK) {
                        self.stats.crc_errors += 1;
                        trace!("FSK CRC failure, dropping packet");
                        return self.fsk_abort_rx();
                    }
                }

                if !self.fsk_learn_packet_size()? {
                    return Ok(());
                }
                let remaining = self
                    .settings
                    .fsk_packet_handler
                    .size
                    .saturating_sub(self.settings.fsk_packet_handler.nb_bytes);
                self.fsk_drain_fifo(remaining)?;

                // Link measurements for the packet that just completed
                self.settings.fsk_packet_handler.sync_word_detected = true;
                let rssi = -i16::from(self.read_register(REG_RSSIVALUE)? >> 1);
                self.settings.fsk_packet_handler.rssi_value = rssi;
                let mut afc = [0u8; 2];
                self.read_registers(REG_AFCMSB, &mut afc)?;
                self.settings.fsk_packet_handler.afc_value =
                    (f64::from(i16::from_be_bytes(afc)) * FREQ_STEP) as i32;
                self.settings.fsk_packet_handler.rx_gain =
                    (self.read_register(REG_LNA)? >> 5) & 0x07;

                if self.settings.fsk.rx_continuous {
                    let rxconfig = self.read_register(REG_RXCONFIG)?;
                    self.write_register(
                        REG_RXCONFIG,
                        rxconfig | RF_RXCONFIG_RESTARTRXWITHOUTPLLLOCK,
                    )?;
                } else {
                    self.settings.state = RadioState::Idle;
                }

                self.stats.rx_done += 1;
                let nb_bytes = usize::from(self.settings.fsk_packet_handler.nb_bytes);
                if let Some(events) = self.events() {
                    events.rx_done(&self.data_buffer[..nb_bytes], rssi, 0);
                }
                self.reset_fsk_packet_handler();
            }
            (RadioState::RxRunning, Modem::LoRa) => {
                self.write_register(REG_LR_IRQFLAGS, LoRaIrqFlags::RX_DONE.bits())?;

                let irq_flags =
                    LoRaIrqFlags::from_bits_truncate(self.read_register(REG_LR_IRQFLAGS)?);
                if irq_flags.contains(LoRaIrqFlags::PAYLOAD_CRC_ERROR) {
                    self.write_register(
                        REG_LR_IRQFLAGS,
                        LoRaIrqFlags::PAYLOAD_CRC_ERROR.bits(),
                    )?;
                    self.stats.crc_errors += 1;
                    if !self.settings.lora.rx_continuous {
                        self.settings.state = RadioState::Idle;
                    }
                    if let Some(events) = self.events() {
                        events.rx_error();
                    }
                    return Ok(());
                }

                // SNR is two's complement in quarter-dB steps, truncated
                // toward zero
                let raw_snr = self.read_register(REG_LR_PKTSNRVALUE)?;
                let snr = (raw_snr as i8) / 4;
                self.settings.lora_packet_handler.snr_value = snr;

                let raw_rssi = i16::from(self.read_register(REG_LR_PKTRSSIVALUE)?);
                let mut rssi = RSSI_OFFSET + raw_rssi + (raw_rssi >> 4);
                if snr < 0 {
                    rssi += i16::from(snr);
                }
                self.settings.lora_packet_handler.rssi_value = rssi;

                let size = self.read_register(REG_LR_RXNBBYTES)?;
                self.settings.lora_packet_handler.size = size;
                let current = self.read_register(REG_LR_FIFORXCURRENTADDR)?;
                self.write_register(REG_LR_FIFOADDRPTR, current)?;
                let mut payload = [0u8; MAX_DATA_BUFFER_SIZE];
                self.read_fifo(&mut payload[..usize::from(size)])?;
                self.data_buffer[..usize::from(size)]
                    .copy_from_slice(&payload[..usize::from(size)]);

                if !self.settings.lora.rx_continuous {
                    self.settings.state = RadioState::Idle;
                }
                self.stats.rx_done += 1;
                if let Some(events) = self.events() {
                    events.rx_done(&self.data_buffer[..usize::from(size)], rssi, snr);
                }
            }
            (RadioState::TxRunning, modem) => {
                self.tx_timeout_timer.cancel();
                if modem == Modem::LoRa {
                    self.write_register(REG_LR_IRQFLAGS, LoRaIrqFlags::TX_DONE.bits())?;
                }
                self.settings.state = RadioState::Idle;
                self.stats.tx_done += 1;
                if let Some(events) = self.events() {
                    events.tx_done();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// DIO1: FSK FifoLevel streaming in both directions, LoRa single-shot
    /// RX timeout.
    fn handle_dio1(&mut self) -> Result<(), Sx1272Error> {
        match (self.settings.state, self.settings.modem) {
            (RadioState::RxRunning, Modem::Fsk) => {
                if !self.fsk_learn_packet_size()? {
                    return Ok(());
                }
                let handler = self.settings.fsk_packet_handler;
                let remaining = handler.size.saturating_sub(handler.nb_bytes);
                let chunk = remaining.min(u16::from(handler.fifo_thresh));
                self.fsk_drain_fifo(chunk)?;
            }
            (RadioState::RxRunning, Modem::LoRa) => {
                self.settings.state = RadioState::Idle;
                if let Some(events) = self.events() {
                    events.rx_timeout();
                }
            }
            (RadioState::TxRunning, Modem::Fsk) => {
                // FIFO dropped below threshold, push the next burst
                let handler = self.settings.fsk_packet_handler;
                let remaining = handler.size.saturating_sub(handler.nb_bytes);
                let chunk = usize::from(remaining.min(u16::from(handler.chunk_size)));
                if chunk > 0 {
                    let offset = usize::from(handler.nb_bytes);
                    let burst = self.data_buffer[offset..offset + chunk].to_vec();
                    self.write_fifo(&burst)?;
                    self.settings.fsk_packet_handler.nb_bytes += chunk as u16;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// DIO2: FSK sync window expired without an address match; LoRa frequency
    /// hop reports the next channel in both RX and TX.
    fn handle_dio2(&mut self) -> Result<(), Sx1272Error> {
        match (self.settings.state, self.settings.modem) {
            (RadioState::RxRunning, Modem::Fsk) => {
                self.reset_fsk_packet_handler();
                if self.settings.fsk.rx_continuous {
                    let rxconfig = self.read_register(REG_RXCONFIG)?;
                    self.write_register(
                        REG_RXCONFIG,
                        rxconfig | RF_RXCONFIG_RESTARTRXWITHOUTPLLLOCK,
                    )?;
                } else {
                    self.settings.state = RadioState::Idle;
                }
                if let Some(events) = self.events() {
                    events.rx_timeout();
                }
            }
            (RadioState::RxRunning | RadioState::TxRunning, Modem::LoRa) => {
                if self.settings.lora.freq_hop_on {
                    self.write_register(
                        REG_LR_IRQFLAGS,
                        LoRaIrqFlags::FHSS_CHANGED_CHANNEL.bits(),
                    )?;
                    let channel =
                        self.read_register(REG_LR_HOPCHANNEL)? & RFLR_HOPCHANNEL_CHANNEL_MASK;
                    if let Some(events) = self.events() {
                        events.fhss_change_channel(channel);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// DIO3: LoRa CadDone, with CadDetected deciding the outcome.
    fn handle_dio3(&mut self) -> Result<(), Sx1272Error> {
        if self.settings.modem != Modem::LoRa {
            return Ok(());
        }
        let irq_flags = LoRaIrqFlags::from_bits_truncate(self.read_register(REG_LR_IRQFLAGS)?);
        let detected = irq_flags.contains(LoRaIrqFlags::CAD_DETECTED);
        if detected {
            self.write_register(
                REG_LR_IRQFLAGS,
                (LoRaIrqFlags::CAD_DETECTED | LoRaIrqFlags::CAD_DONE).bits(),
            )?;
        } else {
            self.write_register(REG_LR_IRQFLAGS, LoRaIrqFlags::CAD_DONE.bits())?;
        }
        // The chip falls back to Standby by itself once CAD completes
        self.settings.state = RadioState::Idle;
        if let Some(events) = self.events() {
            events.cad_done(detected);
        }
        Ok(())
    }

    /// DIO4: FSK preamble detection latch.
    fn handle_dio4(&mut self) -> Result<(), Sx1272Error> {
        if self.settings.modem == Modem::Fsk {
            self.settings.fsk_packet_handler.preamble_detected = true;
        }
        Ok(())
    }

    /// DIO5: ModeReady, nothing to do.
    fn handle_dio5(&mut self) -> Result<(), Sx1272Error> {
        Ok(())
    }

    /// TX supervision timeout. A transmission that never raised TxDone means
    /// the chip state is no longer trustworthy, so recovery re-initializes
    /// the register file rather than just flipping modes.
    fn handle_timeout(&mut self) -> Result<(), Sx1272Error> {
        if self.settings.state != RadioState::TxRunning {
            return Ok(());
        }
        warn!("TX timeout, re-initializing radio");
        self.stats.tx_timeout_recoveries += 1;

        self.set_operation_mode(RF_OPMODE_SLEEP)?;
        self.setup_registers()?;
        self.set_modem(Modem::Fsk)?;
        // Sync word selection is configuration, not transient state
        let public = self.settings.lora.public_network;
        self.set_public_network(public)?;

        self.settings.state = RadioState::Idle;
        if let Some(events) = self.events() {
            events.tx_timeout();
        }
        Ok(())
    }
}

/// Thread-safe facade over [`Sx1272Driver`].
///
/// Owns the driver lock, wires the DIO interrupt lines into the pending mask
/// and runs the worker thread that dispatches drained event batches. Dropping
/// the facade stops the worker and puts the radio to sleep.
pub struct Sx1272<H: Hal + Send + 'static> {
    driver: Arc<Mutex<Sx1272Driver<H>>>,
    pending: Arc<IrqPending>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<H: Hal + Send + 'static> Sx1272<H> {
    pub fn new(hal: H) -> Self {
        let pending = Arc::new(IrqPending::new());
        let driver = Arc::new(Mutex::new(Sx1272Driver::new(hal, Arc::clone(&pending))));
        Self {
            driver,
            pending,
            worker: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Sx1272Driver<H>> {
        match self.driver.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Initializes the radio, attaches the DIO interrupts and starts the
    /// dispatch worker.
    pub fn init_radio(
        &self,
        events: &Arc<dyn RadioEvents + Send + Sync>,
    ) -> Result<(), Sx1272Error> {
        {
            let mut driver = self.lock();
            driver.init_radio(Arc::downgrade(events))?;
            driver.attach_dio_interrupts()?;
        }

        let mut worker = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if worker.is_none() {
            let driver = Arc::clone(&self.driver);
            let pending = Arc::clone(&self.pending);
            let handle = thread::Builder::new()
                .name("sx1272-irq".into())
                .spawn(move || {
                    while let Some(mask) = pending.wait() {
                        let mut driver = match driver.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        if let Err(e) = driver.dispatch(mask) {
                            warn!("interrupt dispatch failed: {e}");
                        }
                    }
                })
                .map_err(|_| {
                    Sx1272Error::InvalidConfig("failed to spawn dispatch worker".into())
                })?;
            *worker = Some(handle);
        }
        Ok(())
    }

    /// Drains and dispatches pending events on the caller's thread, for
    /// deployments that skip the worker and poll instead.
    pub fn process_pending(&self) -> Result<(), Sx1272Error> {
        let mask = self.pending.take();
        if mask != 0 {
            self.lock().dispatch(mask)?;
        }
        Ok(())
    }

    pub fn check_rf_frequency(&self, frequency: u32) -> bool {
        self.lock().check_rf_frequency(frequency)
    }

    pub fn set_channel(&self, freq: u32) -> Result<(), Sx1272Error> {
        self.lock().set_channel(freq)
    }

    pub fn random(&self) -> Result<u32, Sx1272Error> {
        self.lock().random()
    }

    pub fn set_rx_config(&self, config: RxConfig) -> Result<(), Sx1272Error> {
        self.lock().set_rx_config(config)
    }

    pub fn set_tx_config(&self, config: TxConfig) -> Result<(), Sx1272Error> {
        self.lock().set_tx_config(config)
    }

    pub fn time_on_air(&self, modem: Modem, pkt_len: u8) -> Result<u32, Sx1272Error> {
        self.lock().time_on_air(modem, pkt_len)
    }

    pub fn send(&self, buffer: &[u8]) -> Result<(), Sx1272Error> {
        self.lock().send(buffer)
    }

    pub fn sleep(&self) -> Result<(), Sx1272Error> {
        self.lock().sleep()
    }

    pub fn standby(&self) -> Result<(), Sx1272Error> {
        self.lock().standby()
    }

    pub fn receive(&self) -> Result<(), Sx1272Error> {
        self.lock().receive()
    }

    pub fn start_cad(&self) -> Result<(), Sx1272Error> {
        self.lock().start_cad()
    }

    pub fn set_tx_continuous_wave(
        &self,
        freq: u32,
        power: i8,
        time_s: u16,
    ) -> Result<(), Sx1272Error> {
        self.lock().set_tx_continuous_wave(freq, power, time_s)
    }

    pub fn get_rssi(&self, modem: Modem) -> Result<i16, Sx1272Error> {
        self.lock().get_rssi(modem)
    }

    pub fn perform_carrier_sense(
        &self,
        modem: Modem,
        freq: u32,
        rssi_threshold: i16,
        max_time_ms: u32,
    ) -> Result<bool, Sx1272Error> {
        self.lock()
            .perform_carrier_sense(modem, freq, rssi_threshold, max_time_ms)
    }

    pub fn set_max_payload_length(&self, modem: Modem, max: u8) -> Result<(), Sx1272Error> {
        self.lock().set_max_payload_length(modem, max)
    }

    pub fn set_public_network(&self, enable: bool) -> Result<(), Sx1272Error> {
        self.lock().set_public_network(enable)
    }

    pub fn get_status(&self) -> RadioState {
        self.lock().get_status()
    }

    pub fn stats(&self) -> IrqStats {
        self.lock().stats()
    }
}

impl<H: Hal + Send + 'static> Drop for Sx1272<H> {
    fn drop(&mut self) {
        self.pending.shutdown();
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        if let Err(e) = self.lock().sleep() {
            debug!("failed to sleep radio on shutdown: {e}");
        }
    }
}
