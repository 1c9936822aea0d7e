//! # Raspberry Pi HAL Implementation
//!
//! Hardware abstraction layer implementation for Raspberry Pi 4 and 5,
//! providing SPI communication and GPIO control for SX1272 radio modules.
//!
//! ## Hardware Setup
//!
//! ### SPI Configuration
//!
//! The Raspberry Pi provides two SPI controllers:
//! - **SPI0**: `/dev/spidev0.0`, `/dev/spidev0.1` (recommended)
//! - **SPI1**: `/dev/spidev1.0`, `/dev/spidev1.1`, `/dev/spidev1.2`
//!
//! NSS is driven as a plain GPIO rather than the controller's chip select:
//! the driver frames multi-byte register bursts itself and needs NSS held
//! across the whole burst.
//!
//! ### Pinout (40-pin GPIO header)
//!
//! ```text
//! Pi Pin │ BCM GPIO │ SX1272 Pin │ Function
//! ───────┼──────────┼────────────┼─────────────
//! 19     │ GPIO 10  │ MOSI       │ SPI data out
//! 21     │ GPIO 9   │ MISO       │ SPI data in
//! 23     │ GPIO 11  │ SCLK       │ SPI clock
//! 24     │ GPIO 8   │ NSS        │ Chip select
//! 15     │ GPIO 22  │ NRESET     │ Reset (driven low / released)
//! 18     │ GPIO 24  │ DIO0       │ Interrupt (input)
//! 16     │ GPIO 23  │ DIO1       │ Interrupt (input, optional)
//! ```
//!
//! DIO2..DIO5 and the antenna-switch control lines are optional and depend
//! on the module wiring; unwired lines are simply left out of [`Sx1272Pins`].

use crate::hal::{ControlPin, Hal, HalError, ResetDrive};
use crate::radio::irq::DioLine;
use rppal::gpio::{Gpio, InputPin, IoPin, Level, Mode, OutputPin, Trigger};
use rppal::spi::{BitOrder, Bus, Error as SpiError, Mode as SpiMode, SlaveSelect, Spi};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Errors specific to the Raspberry Pi HAL implementation
#[derive(Error, Debug)]
pub enum RpiHalError {
    /// SPI bus initialization failed
    #[error("SPI initialization failed: {0}")]
    SpiInit(#[from] SpiError),
    /// GPIO initialization failed
    #[error("GPIO initialization failed: {0}")]
    GpioInit(#[from] rppal::gpio::Error),
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// GPIO pin assignment for an SX1272 module, BCM numbering.
///
/// Only `nss`, `reset` and `dio0` are required; everything else depends on
/// how the module is wired.
#[derive(Debug, Clone)]
pub struct Sx1272Pins {
    /// NSS chip select (output, active low)
    pub nss: u8,
    /// NRESET (driven low to reset, released otherwise)
    pub reset: u8,
    /// DIO interrupt lines in order DIO0..DIO5; unwired lines are `None`
    pub dio: [Option<u8>; 6],
    /// RF latch switch control line 1 (dual-control boards)
    pub rf_switch_ctl1: Option<u8>,
    /// RF latch switch control line 2 (dual-control boards)
    pub rf_switch_ctl2: Option<u8>,
    /// TX enable line
    pub tx_ctl: Option<u8>,
    /// RX enable line
    pub rx_ctl: Option<u8>,
    /// Single shared antenna switch line
    pub ant_switch: Option<u8>,
    /// External PA enable
    pub pwr_amp_ctl: Option<u8>,
    /// External TCXO enable
    pub tcxo: Option<u8>,
}

impl Default for Sx1272Pins {
    /// Pin assignment matching a common SX1272 shield wiring
    fn default() -> Self {
        Self {
            nss: 8,    // GPIO 8 (Pin 24)
            reset: 22, // GPIO 22 (Pin 15)
            dio: [Some(24), Some(23), Some(25), Some(27), None, None],
            rf_switch_ctl1: None,
            rf_switch_ctl2: None,
            tx_ctl: None,
            rx_ctl: None,
            ant_switch: Some(17), // GPIO 17 (Pin 11)
            pwr_amp_ctl: None,
            tcxo: None,
        }
    }
}

/// Raspberry Pi HAL implementation for the SX1272
///
/// Provides hardware SPI plus GPIO control for the NSS, reset, DIO and
/// antenna-switch lines using the rppal crate. Works on Pi 4 (BCM2711) and
/// Pi 5 (BCM2712).
pub struct RaspberryPiHal {
    spi: Spi,
    nss_pin: OutputPin,
    /// Reset needs to float when released, so it is mode-switched
    reset_pin: IoPin,
    dio_pins: [Option<InputPin>; 6],
    rf_switch_ctl1: Option<OutputPin>,
    rf_switch_ctl2: Option<OutputPin>,
    tx_ctl: Option<OutputPin>,
    rx_ctl: Option<OutputPin>,
    /// Sampled as input for board-variant detection, then driven
    ant_switch: Option<IoPin>,
    pwr_amp_ctl: Option<OutputPin>,
    tcxo: Option<OutputPin>,
}

impl RaspberryPiHal {
    /// Initializes SPI and all configured GPIO pins.
    ///
    /// The SPI interface is configured for the SX1272: Mode 0, MSB first,
    /// 8 MHz by default (the chip tolerates up to 10 MHz).
    pub fn new(spi_bus: u8, spi_speed: u32, pins: &Sx1272Pins) -> Result<Self, RpiHalError> {
        let (bus, slave_select) = match spi_bus {
            0 => (Bus::Spi0, SlaveSelect::Ss0),
            1 => (Bus::Spi1, SlaveSelect::Ss0),
            _ => {
                return Err(RpiHalError::InvalidConfig(format!(
                    "Invalid SPI bus {}, only 0 and 1 are supported",
                    spi_bus
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, spi_speed, SpiMode::Mode0)?
            .bit_order(BitOrder::MsbFirst);

        let gpio = Gpio::new()?;

        let mut nss_pin = gpio.get(pins.nss)?.into_output();
        nss_pin.set_high(); // deasserted

        // Start released: the chip boots on its own power-on reset
        let reset_pin = gpio.get(pins.reset)?.into_io(Mode::Input);

        let mut dio_pins: [Option<InputPin>; 6] = Default::default();
        for (i, dio) in pins.dio.iter().enumerate() {
            if let Some(bcm) = dio {
                dio_pins[i] = Some(gpio.get(*bcm)?.into_input_pulldown());
            }
        }

        let output = |bcm: Option<u8>| -> Result<Option<OutputPin>, RpiHalError> {
            match bcm {
                Some(bcm) => {
                    let mut pin = gpio.get(bcm)?.into_output();
                    pin.set_low();
                    Ok(Some(pin))
                }
                None => Ok(None),
            }
        };

        let ant_switch = match pins.ant_switch {
            Some(bcm) => Some(gpio.get(bcm)?.into_io(Mode::Input)),
            None => None,
        };

        log::info!(
            "Raspberry Pi HAL initialized: SPI{} at {} Hz, NSS GPIO {}, RESET GPIO {}",
            spi_bus,
            spi_speed,
            pins.nss,
            pins.reset
        );
        for (i, dio) in pins.dio.iter().enumerate() {
            if let Some(bcm) = dio {
                log::info!("  DIO{}: GPIO {}", i, bcm);
            }
        }

        Ok(Self {
            spi,
            nss_pin,
            reset_pin,
            dio_pins,
            rf_switch_ctl1: output(pins.rf_switch_ctl1)?,
            rf_switch_ctl2: output(pins.rf_switch_ctl2)?,
            tx_ctl: output(pins.tx_ctl)?,
            rx_ctl: output(pins.rx_ctl)?,
            ant_switch,
            pwr_amp_ctl: output(pins.pwr_amp_ctl)?,
            tcxo: output(pins.tcxo)?,
        })
    }

    fn output_for(&mut self, pin: ControlPin) -> Option<&mut OutputPin> {
        match pin {
            ControlPin::RfSwitchCtl1 => self.rf_switch_ctl1.as_mut(),
            ControlPin::RfSwitchCtl2 => self.rf_switch_ctl2.as_mut(),
            ControlPin::TxCtl => self.tx_ctl.as_mut(),
            ControlPin::RxCtl => self.rx_ctl.as_mut(),
            ControlPin::PwrAmpCtl => self.pwr_amp_ctl.as_mut(),
            ControlPin::Tcxo => self.tcxo.as_mut(),
            ControlPin::AntSwitch => None,
        }
    }
}

impl Hal for RaspberryPiHal {
    fn spi_write(&mut self, byte: u8) -> Result<u8, HalError> {
        let mut read = [0u8; 1];
        self.spi
            .transfer(&mut read, &[byte])
            .map_err(|e| {
                log::error!("SPI transfer failed: {}", e);
                HalError::Spi
            })?;
        Ok(read[0])
    }

    fn set_nss(&mut self, asserted: bool) -> Result<(), HalError> {
        // Active low
        if asserted {
            self.nss_pin.set_low();
        } else {
            self.nss_pin.set_high();
        }
        Ok(())
    }

    fn set_reset(&mut self, drive: ResetDrive) -> Result<(), HalError> {
        match drive {
            ResetDrive::Low => {
                self.reset_pin.set_mode(Mode::Output);
                self.reset_pin.set_low();
            }
            ResetDrive::Release => {
                self.reset_pin.set_mode(Mode::Input);
            }
        }
        Ok(())
    }

    fn control_pin_present(&self, pin: ControlPin) -> bool {
        match pin {
            ControlPin::RfSwitchCtl1 => self.rf_switch_ctl1.is_some(),
            ControlPin::RfSwitchCtl2 => self.rf_switch_ctl2.is_some(),
            ControlPin::TxCtl => self.tx_ctl.is_some(),
            ControlPin::RxCtl => self.rx_ctl.is_some(),
            ControlPin::AntSwitch => self.ant_switch.is_some(),
            ControlPin::PwrAmpCtl => self.pwr_amp_ctl.is_some(),
            ControlPin::Tcxo => self.tcxo.is_some(),
        }
    }

    fn set_control_pin(&mut self, pin: ControlPin, level: bool) -> Result<(), HalError> {
        if pin == ControlPin::AntSwitch {
            let ant = self.ant_switch.as_mut().ok_or(HalError::Gpio)?;
            ant.set_mode(Mode::Output);
            if level {
                ant.set_high();
            } else {
                ant.set_low();
            }
            return Ok(());
        }
        let out = self.output_for(pin).ok_or(HalError::Gpio)?;
        if level {
            out.set_high();
        } else {
            out.set_low();
        }
        Ok(())
    }

    fn read_control_pin(&mut self, pin: ControlPin) -> Result<bool, HalError> {
        if pin == ControlPin::AntSwitch {
            let ant = self.ant_switch.as_mut().ok_or(HalError::Gpio)?;
            ant.set_mode(Mode::Input);
            return Ok(ant.read() == Level::High);
        }
        let out = self.output_for(pin).ok_or(HalError::Gpio)?;
        Ok(out.is_set_high())
    }

    fn attach_dio_interrupt(
        &mut self,
        line: DioLine,
        mut handler: Box<dyn FnMut() + Send>,
    ) -> Result<(), HalError> {
        match self.dio_pins[line as usize].as_mut() {
            Some(pin) => pin
                .set_async_interrupt(Trigger::RisingEdge, move |_| handler())
                .map_err(|e| {
                    log::error!("failed to attach {:?} interrupt: {}", line, e);
                    HalError::Interrupt
                }),
            // Unwired lines simply never fire
            None => Ok(()),
        }
    }

    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Builder for the Raspberry Pi HAL configuration
///
/// # Examples
///
/// ```rust,no_run
/// use sx1272_rs::hal::raspberry_pi::RaspberryPiHalBuilder;
///
/// let hal = RaspberryPiHalBuilder::new()
///     .spi_bus(0)
///     .spi_speed(8_000_000)
///     .nss_pin(8)
///     .reset_pin(22)
///     .dio_pin(0, 24)
///     .dio_pin(1, 23)
///     .ant_switch_pin(17)
///     .build()?;
/// # Ok::<(), sx1272_rs::hal::raspberry_pi::RpiHalError>(())
/// ```
pub struct RaspberryPiHalBuilder {
    spi_bus: u8,
    spi_speed: u32,
    pins: Sx1272Pins,
}

impl Default for RaspberryPiHalBuilder {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_speed: 8_000_000,
            pins: Sx1272Pins::default(),
        }
    }
}

impl RaspberryPiHalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SPI bus number (0 or 1)
    pub fn spi_bus(mut self, bus: u8) -> Self {
        self.spi_bus = bus;
        self
    }

    /// Set the SPI clock speed in Hz (clamped to the chip's 10 MHz maximum)
    pub fn spi_speed(mut self, speed: u32) -> Self {
        self.spi_speed = speed.min(10_000_000);
        self
    }

    pub fn nss_pin(mut self, pin: u8) -> Self {
        self.pins.nss = pin;
        self
    }

    pub fn reset_pin(mut self, pin: u8) -> Self {
        self.pins.reset = pin;
        self
    }

    /// Assign a DIO line (0..=5) to a BCM GPIO
    pub fn dio_pin(mut self, line: usize, pin: u8) -> Self {
        if line < 6 {
            self.pins.dio[line] = Some(pin);
        }
        self
    }

    pub fn rf_switch_pins(mut self, ctl1: u8, ctl2: u8) -> Self {
        self.pins.rf_switch_ctl1 = Some(ctl1);
        self.pins.rf_switch_ctl2 = Some(ctl2);
        self
    }

    pub fn tx_rx_ctl_pins(mut self, tx: u8, rx: u8) -> Self {
        self.pins.tx_ctl = Some(tx);
        self.pins.rx_ctl = Some(rx);
        self
    }

    pub fn ant_switch_pin(mut self, pin: u8) -> Self {
        self.pins.ant_switch = Some(pin);
        self
    }

    pub fn no_ant_switch(mut self) -> Self {
        self.pins.ant_switch = None;
        self
    }

    pub fn pwr_amp_ctl_pin(mut self, pin: u8) -> Self {
        self.pins.pwr_amp_ctl = Some(pin);
        self
    }

    pub fn tcxo_pin(mut self, pin: u8) -> Self {
        self.pins.tcxo = Some(pin);
        self
    }

    /// Build the HAL instance with the current configuration
    pub fn build(self) -> Result<RaspberryPiHal, RpiHalError> {
        if self.spi_bus > 1 {
            return Err(RpiHalError::InvalidConfig(format!(
                "Invalid SPI bus {}, only 0 and 1 supported",
                self.spi_bus
            )));
        }
        if self.spi_speed == 0 {
            return Err(RpiHalError::InvalidConfig(
                "SPI speed must be non-zero".to_string(),
            ));
        }
        RaspberryPiHal::new(self.spi_bus, self.spi_speed, &self.pins)
    }
}
