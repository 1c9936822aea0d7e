//! # SX1272 Driver Tests
//!
//! Integration tests for the driver state machine over the mock HAL:
//! initialization, configuration register encoding, both TX/RX pipelines,
//! interrupt dispatch outcomes and the TX-timeout recovery path.


use mock_support::{init_driver, Event, MockHal};
use sx1272_rs::radio::irq::{EVT_DIO0, EVT_DIO2, EVT_DIO3, EVT_DIO4, EVT_TIMEOUT};
use sx1272_rs::{
    FskRxConfig, FskTxConfig, LoRaRxConfig, LoRaTxConfig, Modem, RadioState, RxConfig,
    Sx1272Error, TxConfig,
};

// Register addresses used in assertions
const REG_OPMODE: u8 = 0x01;
const REG_FRFMSB: u8 = 0x06;
const REG_FRFMID: u8 = 0x07;
const REG_FRFLSB: u8 = 0x08;
const REG_PACONFIG: u8 = 0x09;
const REG_LNA: u8 = 0x0C;
const REG_RXCONFIG: u8 = 0x0D;
const REG_RSSIVALUE: u8 = 0x11;
const REG_RXBW: u8 = 0x12;
const REG_AFCBW: u8 = 0x13;
const REG_AFCMSB: u8 = 0x1B;
const REG_AFCLSB: u8 = 0x1C;
const REG_SYNCVALUE1: u8 = 0x28;
const REG_PAYLOADLENGTH: u8 = 0x32;
const REG_IRQFLAGS2: u8 = 0x3F;
const REG_DIOMAPPING1: u8 = 0x40;
const REG_PADAC: u8 = 0x5A;

const REG_LR_IRQFLAGSMASK: u8 = 0x11;
const REG_LR_IRQFLAGS: u8 = 0x12;
const REG_LR_RXNBBYTES: u8 = 0x13;
const REG_LR_PKTSNRVALUE: u8 = 0x19;
const REG_LR_PKTRSSIVALUE: u8 = 0x1A;
const REG_LR_MODEMCONFIG1: u8 = 0x1D;
const REG_LR_MODEMCONFIG2: u8 = 0x1E;
const REG_LR_SYMBTIMEOUTLSB: u8 = 0x1F;
const REG_LR_PAYLOADLENGTH: u8 = 0x22;
const REG_LR_PAYLOADMAXLENGTH: u8 = 0x23;
const REG_LR_RSSIWIDEBAND: u8 = 0x2C;
const REG_LR_SYNCWORD: u8 = 0x39;

// =============================================================================
// Initialization
// =============================================================================

#[test]
fn init_applies_default_register_table() {
    let (driver, _events, _keep) = init_driver(MockHal::new());

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(driver.settings().modem, Modem::Fsk);

    // FSK sync word C1 94 C1 and the LoRa max payload default
    let hal = driver.hal();
    assert_eq!(hal.fsk_reg(REG_SYNCVALUE1), 0xC1);
    assert_eq!(hal.fsk_reg(REG_SYNCVALUE1 + 1), 0x94);
    assert_eq!(hal.fsk_reg(REG_SYNCVALUE1 + 2), 0xC1);
    assert_eq!(hal.lora_reg(REG_LR_PAYLOADMAXLENGTH), 0x40);
}

#[test]
fn init_rejects_unknown_silicon_version() {
    let mut hal = MockHal::new();
    hal.set_fsk_reg(0x42, 0x12); // not an SX1272

    let pending = std::sync::Arc::new(sx1272_rs::radio::irq::IrqPending::new());
    let mut driver = sx1272_rs::Sx1272Driver::new(hal, pending);
    let recorder: std::sync::Arc<mock_support::RecordingEvents> = Default::default();
    let events: std::sync::Arc<dyn sx1272_rs::RadioEvents + Send + Sync> = recorder;

    let result = driver.init_radio(std::sync::Arc::downgrade(&events));
    assert!(matches!(result, Err(Sx1272Error::InvalidConfig(_))));
}

#[test]
fn ant_switch_level_selects_board_variant() {
    // High level on the shared switch line means PA_BOOST wiring
    let (mut driver, _events, _keep) = init_driver(MockHal::with_ant_switch(true));
    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig {
            power: 20,
            ..Default::default()
        }))
        .unwrap();
    let paconfig = *driver.hal().writes_to(REG_PACONFIG).last().unwrap();
    assert_eq!(paconfig & 0x80, 0x80, "PA_BOOST path selected");
}

// =============================================================================
// Configuration encoding
// =============================================================================

#[test]
fn set_channel_writes_synthesizer_registers() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.set_channel(868_100_000).unwrap();

    let hal = driver.hal();
    // 868.1 MHz / 61.035 Hz per step = 0xD90666
    assert_eq!(*hal.writes_to(REG_FRFMSB).last().unwrap(), 0xD9);
    assert_eq!(*hal.writes_to(REG_FRFMID).last().unwrap(), 0x06);
    assert_eq!(*hal.writes_to(REG_FRFLSB).last().unwrap(), 0x66);
}

#[test]
fn fsk_rx_config_encodes_bitrate_and_bandwidth() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();

    let hal = driver.hal();
    // 32 MHz / 50 kbps = 640 = 0x0280
    assert_eq!(*hal.writes_to(0x02).last().unwrap(), 0x02);
    assert_eq!(*hal.writes_to(0x03).last().unwrap(), 0x80);
    // 50 kHz channel filter, 83.333 kHz AFC filter
    assert_eq!(*hal.writes_to(REG_RXBW).last().unwrap(), 0x0B);
    assert_eq!(*hal.writes_to(REG_AFCBW).last().unwrap(), 0x12);
    // Variable-length framing accepts up to the maximum
    assert_eq!(*hal.writes_to(REG_PAYLOADLENGTH).last().unwrap(), 0xFF);
}

#[test]
fn fsk_rx_config_rejects_unsupported_bandwidth() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    let result = driver.set_rx_config(RxConfig::Fsk(FskRxConfig {
        bandwidth: 500_000,
        ..Default::default()
    }));
    assert!(matches!(
        result,
        Err(Sx1272Error::InvalidBandwidth(500_000))
    ));
}

#[test]
fn lora_rx_config_encodes_modem_config_registers() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();

    let hal = driver.hal();
    // BW 125 kHz, CR 4/5, explicit header, CRC on, no LDRO
    assert_eq!(*hal.lora_writes_to(REG_LR_MODEMCONFIG1).last().unwrap(), 0x0A);
    // SF7, symbol timeout MSB zero
    assert_eq!(*hal.lora_writes_to(REG_LR_MODEMCONFIG2).last().unwrap(), 0x70);
    assert_eq!(*hal.lora_writes_to(REG_LR_SYMBTIMEOUTLSB).last().unwrap(), 5);
}

#[test]
fn lora_config_rejects_bandwidth_above_500khz() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    let result = driver.set_tx_config(TxConfig::LoRa(LoRaTxConfig {
        bandwidth: 3,
        ..Default::default()
    }));
    assert!(matches!(result, Err(Sx1272Error::InvalidConfig(_))));
}

#[test]
fn modem_switch_is_idempotent() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());

    driver.hal_mut().clear_writes();
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    let longrange_writes = |hal: &MockHal| {
        hal.writes_to(REG_OPMODE)
            .iter()
            .filter(|v| **v & 0x80 != 0)
            .count()
    };
    // Already on FSK: no long-range-mode bit transitions
    assert_eq!(longrange_writes(driver.hal()), 0);

    driver.hal_mut().clear_writes();
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    assert!(longrange_writes(driver.hal()) > 0);

    // Second LoRa configuration leaves the modem bit alone
    driver.hal_mut().clear_writes();
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    assert_eq!(longrange_writes(driver.hal()), 0);
}

// =============================================================================
// TX power encoding
// =============================================================================

#[test]
fn tx_power_rfo_board_clamps_to_14_dbm() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig {
            power: 20,
            ..Default::default()
        }))
        .unwrap();

    let paconfig = *driver.hal().writes_to(REG_PACONFIG).last().unwrap();
    assert_eq!(paconfig, 0x0F, "RFO path, clamped to +14 dBm");
    assert_eq!(*driver.hal().writes_to(REG_PADAC).last().unwrap(), 0x84);
}

#[test]
fn tx_power_pa_boost_board_enables_dac_above_17_dbm() {
    let (mut driver, _events, _keep) = init_driver(MockHal::with_ant_switch(true));
    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig {
            power: 20,
            ..Default::default()
        }))
        .unwrap();
    assert_eq!(*driver.hal().writes_to(REG_PACONFIG).last().unwrap(), 0x8F);
    assert_eq!(*driver.hal().writes_to(REG_PADAC).last().unwrap(), 0x87);

    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig {
            power: 14,
            ..Default::default()
        }))
        .unwrap();
    assert_eq!(*driver.hal().writes_to(REG_PACONFIG).last().unwrap(), 0x8C);
    assert_eq!(*driver.hal().writes_to(REG_PADAC).last().unwrap(), 0x84);
}

// =============================================================================
// Transmit pipeline
// =============================================================================

#[test]
fn lora_send_stages_payload_and_enters_tx() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::LoRa(LoRaTxConfig::default()))
        .unwrap();

    let payload = [0xAA; 16];
    driver.send(&payload).unwrap();

    assert_eq!(driver.get_status(), RadioState::TxRunning);
    let hal = driver.hal();
    assert_eq!(hal.tx_fifo, payload);
    assert_eq!(*hal.lora_writes_to(REG_LR_PAYLOADLENGTH).last().unwrap(), 16);
    // Everything but TxDone masked, DIO0 mapped to TxDone
    assert_eq!(*hal.lora_writes_to(REG_LR_IRQFLAGSMASK).last().unwrap(), 0xF7);
    assert_eq!(*hal.writes_to(REG_DIOMAPPING1).last().unwrap(), 0x40);
    // Transmitter mode with the long-range bit preserved
    assert_eq!(*hal.writes_to(REG_OPMODE).last().unwrap() & 0x87, 0x83);
}

#[test]
fn fsk_send_prefixes_length_byte_in_variable_mode() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig::default()))
        .unwrap();

    let payload = [0x11, 0x22, 0x33];
    driver.send(&payload).unwrap();

    assert_eq!(driver.get_status(), RadioState::TxRunning);
    assert_eq!(driver.hal().tx_fifo, vec![3, 0x11, 0x22, 0x33]);
}

#[test]
fn send_wakes_a_sleeping_chip_before_fifo_staging() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig::default()))
        .unwrap();
    driver.sleep().unwrap();
    driver.hal_mut().clear_writes();

    driver.send(&[0x11, 0x22]).unwrap();

    // Standby first, FIFO is not accessible in Sleep; TX keys up last
    let opmode_writes = driver.hal().writes_to(REG_OPMODE);
    assert_eq!(*opmode_writes.first().unwrap() & 0x07, 0x01);
    assert_eq!(*opmode_writes.last().unwrap() & 0x07, 0x03);
    assert_eq!(driver.hal().tx_fifo, vec![2, 0x11, 0x22]);
}

#[test]
fn send_rejects_oversized_and_empty_payloads() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::LoRa(LoRaTxConfig::default()))
        .unwrap();

    assert!(matches!(
        driver.send(&[]),
        Err(Sx1272Error::InvalidConfig(_))
    ));
    assert!(matches!(
        driver.send(&vec![0u8; 300]),
        Err(Sx1272Error::InvalidConfig(_))
    ));
}

#[test]
fn dio0_completes_transmission() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_tx_config(TxConfig::LoRa(LoRaTxConfig::default()))
        .unwrap();
    driver.send(&[0x42; 8]).unwrap();

    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(events.take(), vec![Event::TxDone]);
    assert_eq!(driver.stats().tx_done, 1);
}

#[test]
fn tx_timeout_reinitializes_and_restores_sync_word() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver.set_public_network(true).unwrap();
    driver
        .set_tx_config(TxConfig::LoRa(LoRaTxConfig::default()))
        .unwrap();
    driver.send(&[0x55; 32]).unwrap();

    driver.dispatch(EVT_TIMEOUT).unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(events.take(), vec![Event::TxTimeout]);
    assert_eq!(driver.stats().tx_timeout_recoveries, 1);
    // Default table re-applied, public sync word restored on top of it
    assert_eq!(driver.hal().lora_reg(REG_LR_SYNCWORD), 0x34);
    assert_eq!(driver.hal().fsk_reg(REG_SYNCVALUE1), 0xC1);
}

#[test]
fn stale_timeout_outside_tx_is_ignored() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver.dispatch(EVT_TIMEOUT).unwrap();
    assert_eq!(driver.get_status(), RadioState::Idle);
    assert!(events.take().is_empty());
    assert_eq!(driver.stats().tx_timeout_recoveries, 0);
}

// =============================================================================
// Receive pipeline
// =============================================================================

#[test]
fn lora_receive_unmasks_rx_interrupts() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    assert_eq!(driver.get_status(), RadioState::RxRunning);
    // RxTimeout, RxDone and PayloadCrcError stay enabled
    assert_eq!(
        *driver
            .hal()
            .lora_writes_to(REG_LR_IRQFLAGSMASK)
            .last()
            .unwrap(),
        0x1F
    );
}

#[test]
fn lora_rx_done_reports_payload_rssi_and_snr() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_lora_reg(REG_LR_RXNBBYTES, 3);
    hal.set_lora_reg(REG_LR_PKTSNRVALUE, 40); // +10 dB in quarter-dB steps
    hal.set_lora_reg(REG_LR_PKTRSSIVALUE, 60);
    hal.rx_fifo.extend([0x01, 0x02, 0x03]);

    driver.dispatch(EVT_DIO0).unwrap();

    // -139 + 60 + 60/16 = -76 dBm
    assert_eq!(
        events.take(),
        vec![Event::RxDone {
            payload: vec![0x01, 0x02, 0x03],
            rssi: -76,
            snr: 10,
        }]
    );
    // Continuous mode stays in RX
    assert_eq!(driver.get_status(), RadioState::RxRunning);
    assert_eq!(driver.stats().rx_done, 1);
}

#[test]
fn lora_negative_snr_lowers_reported_rssi() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_lora_reg(REG_LR_RXNBBYTES, 1);
    hal.set_lora_reg(REG_LR_PKTSNRVALUE, 0xE8); // -6 dB
    hal.set_lora_reg(REG_LR_PKTRSSIVALUE, 40);
    hal.rx_fifo.extend([0x7E]);

    driver.dispatch(EVT_DIO0).unwrap();

    // -139 + 40 + 40/16 - 6 = -103 dBm
    assert_eq!(
        events.take(),
        vec![Event::RxDone {
            payload: vec![0x7E],
            rssi: -103,
            snr: -6,
        }]
    );
}

#[test]
fn lora_snr_quarter_db_truncates_toward_zero() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_lora_reg(REG_LR_RXNBBYTES, 1);
    hal.set_lora_reg(REG_LR_PKTSNRVALUE, 0xE9); // -23 quarter-dB = -5 dB
    hal.set_lora_reg(REG_LR_PKTRSSIVALUE, 40);
    hal.rx_fifo.extend([0x7E]);

    driver.dispatch(EVT_DIO0).unwrap();

    // -139 + 40 + 40/16 - 5 = -102 dBm
    assert_eq!(
        events.take(),
        vec![Event::RxDone {
            payload: vec![0x7E],
            rssi: -102,
            snr: -5,
        }]
    );
}

#[test]
fn lora_crc_failure_reports_rx_error() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    driver
        .hal_mut()
        .set_lora_reg(REG_LR_IRQFLAGS, 0x60); // RxDone | PayloadCrcError

    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(events.take(), vec![Event::RxError]);
    assert_eq!(driver.stats().crc_errors, 1);
    assert_eq!(driver.stats().rx_done, 0);
}

#[test]
fn fsk_rx_done_drains_variable_length_packet() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_fsk_reg(REG_IRQFLAGS2, 0x02); // CrcOk
    hal.rx_fifo.extend([4, 0xDE, 0xAD, 0xBE, 0xEF]);

    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(
        events.take(),
        vec![Event::RxDone {
            payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
            rssi: 0,
            snr: 0,
        }]
    );
    // Continuous mode restarts the receiver chain without PLL relock
    let restart = *driver.hal().writes_to(REG_RXCONFIG).last().unwrap();
    assert_eq!(restart & 0x40, 0x40);
    assert_eq!(driver.get_status(), RadioState::RxRunning);
}

#[test]
fn fsk_crc_failure_discards_packet() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    // IRQFLAGS2 left clear: CRC check fails
    driver.hal_mut().rx_fifo.extend([2, 0x00, 0x00]);
    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(events.take(), vec![Event::RxError]);
    assert_eq!(driver.stats().crc_errors, 1);
}

#[test]
fn fsk_rx_done_captures_link_measurements() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_fsk_reg(REG_IRQFLAGS2, 0x02); // CrcOk
    hal.set_fsk_reg(REG_RSSIVALUE, 80); // -40 dBm
    hal.set_fsk_reg(REG_AFCMSB, 0x00);
    hal.set_fsk_reg(REG_AFCLSB, 0x64);
    hal.set_fsk_reg(REG_LNA, 0x40); // gain index 2
    hal.rx_fifo.extend([2, 0xAB, 0xCD]);

    driver.dispatch(EVT_DIO4).unwrap();
    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(
        events.take(),
        vec![Event::RxDone {
            payload: vec![0xAB, 0xCD],
            rssi: -40,
            snr: 0,
        }]
    );
    // Measurements taken while draining the packet stay readable
    let handler = driver.settings().fsk_packet_handler;
    assert_eq!(handler.rssi_value, -40);
    assert_eq!(handler.rx_gain, 2);
    // 100 synthesizer steps of AFC correction
    assert_eq!(handler.afc_value, 6_103);
}

#[test]
fn fsk_preamble_interrupt_latches_detection() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    driver.dispatch(EVT_DIO4).unwrap();

    assert!(driver.settings().fsk_packet_handler.preamble_detected);
    assert!(events.take().is_empty());
}

#[test]
fn fsk_sync_timeout_restarts_continuous_rx() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.receive().unwrap();

    // A preamble was seen but the sync window expired before a match
    driver.dispatch(EVT_DIO4).unwrap();
    driver.hal_mut().clear_writes();
    driver.dispatch(EVT_DIO2).unwrap();

    assert_eq!(events.take(), vec![Event::RxTimeout]);
    // Partial-packet bookkeeping is dropped and the chain restarts
    // without a PLL relock
    assert!(!driver.settings().fsk_packet_handler.preamble_detected);
    let restart = *driver.hal().writes_to(REG_RXCONFIG).last().unwrap();
    assert_eq!(restart & 0x40, 0x40);
    assert_eq!(driver.get_status(), RadioState::RxRunning);
}

#[test]
fn fsk_single_shot_sync_timeout_goes_idle() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig {
            rx_continuous: false,
            ..Default::default()
        }))
        .unwrap();
    driver.receive().unwrap();

    driver.hal_mut().clear_writes();
    driver.dispatch(EVT_DIO2).unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(events.take(), vec![Event::RxTimeout]);
    assert!(driver.hal().writes_to(REG_RXCONFIG).is_empty());
}

#[test]
fn fsk_oversized_length_declaration_aborts_rx() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::Fsk(FskRxConfig::default()))
        .unwrap();
    driver.set_max_payload_length(Modem::Fsk, 32).unwrap();
    driver.receive().unwrap();

    let hal = driver.hal_mut();
    hal.set_fsk_reg(REG_IRQFLAGS2, 0x02); // CrcOk
    hal.rx_fifo.extend([200, 0x01, 0x02]); // declares 200 B, max is 32

    driver.dispatch(EVT_DIO0).unwrap();

    assert_eq!(events.take(), vec![Event::RxError]);
    assert_eq!(driver.settings().fsk_packet_handler.size, 0);
    // Continuous mode restarts the chain after dropping the packet
    let restart = *driver.hal().writes_to(REG_RXCONFIG).last().unwrap();
    assert_eq!(restart & 0x40, 0x40);
    assert_eq!(driver.get_status(), RadioState::RxRunning);
}

#[test]
fn lora_single_shot_rx_timeout_goes_idle() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig {
            rx_continuous: false,
            ..Default::default()
        }))
        .unwrap();
    driver.receive().unwrap();

    driver.dispatch(sx1272_rs::radio::irq::EVT_DIO1).unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(events.take(), vec![Event::RxTimeout]);
}

// =============================================================================
// CAD, carrier sense, entropy
// =============================================================================

#[test]
fn cad_cycle_reports_detection() {
    let (mut driver, events, _keep) = init_driver(MockHal::new());
    driver
        .set_rx_config(RxConfig::LoRa(LoRaRxConfig::default()))
        .unwrap();
    driver.start_cad().unwrap();

    assert_eq!(driver.get_status(), RadioState::Cad);
    assert_eq!(
        *driver
            .hal()
            .lora_writes_to(REG_LR_IRQFLAGSMASK)
            .last()
            .unwrap(),
        0xFA
    );

    driver
        .hal_mut()
        .set_lora_reg(REG_LR_IRQFLAGS, 0x05); // CadDone | CadDetected
    driver.dispatch(EVT_DIO3).unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert_eq!(events.take(), vec![Event::CadDone(true)]);
}

#[test]
fn cad_on_fsk_modem_does_nothing() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.hal_mut().clear_writes();

    driver.start_cad().unwrap();

    assert_eq!(driver.get_status(), RadioState::Idle);
    assert!(driver.hal().writes_to(REG_OPMODE).is_empty());
    assert!(driver.hal().writes_to(REG_DIOMAPPING1).is_empty());
}

#[test]
fn carrier_sense_detects_busy_channel() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.hal_mut().set_fsk_reg(REG_RSSIVALUE, 80); // -40 dBm

    let free = driver
        .perform_carrier_sense(Modem::Fsk, 868_100_000, -90, 5)
        .unwrap();
    assert!(!free);
    assert_eq!(driver.get_status(), RadioState::Idle);
}

#[test]
fn carrier_sense_reports_quiet_channel_free() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.hal_mut().set_fsk_reg(REG_RSSIVALUE, 240); // -120 dBm

    let free = driver
        .perform_carrier_sense(Modem::Fsk, 868_100_000, -90, 2)
        .unwrap();
    assert!(free);
}

#[test]
fn random_collects_wideband_noise_bits() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.hal_mut().set_lora_reg(REG_LR_RSSIWIDEBAND, 0x55);

    let value = driver.random().unwrap();
    assert_eq!(value, u32::MAX, "LSB set in every sample");
    assert_eq!(driver.get_status(), RadioState::Idle);
}

// =============================================================================
// Misc operations
// =============================================================================

#[test]
fn time_on_air_matches_applied_configuration() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());

    driver
        .set_tx_config(TxConfig::Fsk(FskTxConfig {
            datarate: 4_800,
            preamble_len: 5,
            ..Default::default()
        }))
        .unwrap();
    // 3-byte sync word from the default table, length byte, 2-byte CRC
    assert_eq!(driver.time_on_air(Modem::Fsk, 20).unwrap(), 52);

    driver
        .set_tx_config(TxConfig::LoRa(LoRaTxConfig::default()))
        .unwrap();
    assert_eq!(driver.time_on_air(Modem::LoRa, 64).unwrap(), 119);
}

#[test]
fn public_network_selects_lorawan_sync_word() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());

    driver.set_public_network(true).unwrap();
    assert_eq!(driver.hal().lora_reg(REG_LR_SYNCWORD), 0x34);

    driver.set_public_network(false).unwrap();
    assert_eq!(driver.hal().lora_reg(REG_LR_SYNCWORD), 0x12);
}

#[test]
fn max_payload_length_reaches_the_right_register() {
    let (mut driver, _events, _keep) = init_driver(MockHal::new());
    driver.set_max_payload_length(Modem::LoRa, 128).unwrap();
    assert_eq!(driver.hal().lora_reg(REG_LR_PAYLOADMAXLENGTH), 128);
}

#[test]
fn check_rf_frequency_accepts_all_channels() {
    let (driver, _events, _keep) = init_driver(MockHal::new());
    assert!(driver.check_rf_frequency(433_000_000));
    assert!(driver.check_rf_frequency(868_100_000));
    assert!(driver.check_rf_frequency(915_000_000));
}
