//! Unit tests for the derived-configuration calculators.

use super::*;
use crate::radio::registers::{
    RF_PACONFIG_PASELECT_PABOOST, RF_PADAC_20DBM_OFF, RF_PADAC_20DBM_ON,
};
use proptest::prelude::*;

const PACONFIG_RESET: u8 = 0x0F;
const PADAC_RESET: u8 = 0x84;

#[test]
fn fsk_bandwidth_lookup_exact_entries() {
    assert_eq!(fsk_bandwidth_reg_value(2_600).unwrap(), 0x17);
    assert_eq!(fsk_bandwidth_reg_value(50_000).unwrap(), 0x0B);
    assert_eq!(fsk_bandwidth_reg_value(125_000).unwrap(), 0x02);
    assert_eq!(fsk_bandwidth_reg_value(250_000).unwrap(), 0x01);
}

#[test]
fn fsk_bandwidth_lookup_brackets_between_entries() {
    // Anything inside a bracket resolves to the lower entry's code
    assert_eq!(fsk_bandwidth_reg_value(2_601).unwrap(), 0x17);
    assert_eq!(fsk_bandwidth_reg_value(60_000).unwrap(), 0x0B);
    assert_eq!(fsk_bandwidth_reg_value(299_999).unwrap(), 0x01);
}

#[test]
fn fsk_bandwidth_lookup_rejects_out_of_range() {
    assert!(matches!(
        fsk_bandwidth_reg_value(2_599),
        Err(crate::error::Sx1272Error::InvalidBandwidth(2_599))
    ));
    assert!(matches!(
        fsk_bandwidth_reg_value(0),
        Err(crate::error::Sx1272Error::InvalidBandwidth(0))
    ));
    // 300 kHz is the table's closing bracket, not a selectable filter
    assert!(fsk_bandwidth_reg_value(300_000).is_err());
    assert!(fsk_bandwidth_reg_value(500_000).is_err());
}

#[test]
fn tx_power_rfo_path_encoding_and_clamps() {
    // RFO: reg nibble = power + 1, range -1..=14 dBm
    let (paconfig, _) = encode_tx_power(14, false, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x80, 0, "PA_BOOST bit must be clear on RFO");
    assert_eq!(paconfig & 0x0F, 15);

    let (paconfig, _) = encode_tx_power(-1, false, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x0F, 0);

    // Out-of-range requests clamp instead of wrapping
    let (paconfig, _) = encode_tx_power(20, false, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x0F, 15);
    let (paconfig, _) = encode_tx_power(-10, false, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x0F, 0);
}

#[test]
fn tx_power_pa_boost_path_encoding_and_clamps() {
    // PA_BOOST without DAC boost: reg nibble = power - 2, range 2..=17 dBm
    let (paconfig, padac) = encode_tx_power(17, true, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x80, RF_PACONFIG_PASELECT_PABOOST);
    assert_eq!(paconfig & 0x0F, 15);
    assert_eq!(padac & 0x07, RF_PADAC_20DBM_OFF);

    let (paconfig, padac) = encode_tx_power(0, true, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(paconfig & 0x0F, 0, "clamps up to 2 dBm");
    assert_eq!(padac & 0x07, RF_PADAC_20DBM_OFF);
}

#[test]
fn tx_power_above_17_dbm_engages_pa_dac() {
    // Above 17 dBm the DAC boost turns on and the nibble becomes power - 5
    let (paconfig, padac) = encode_tx_power(20, true, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(padac & 0x07, RF_PADAC_20DBM_ON);
    assert_eq!(paconfig & 0x0F, 15);

    let (paconfig, padac) = encode_tx_power(18, true, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(padac & 0x07, RF_PADAC_20DBM_ON);
    assert_eq!(paconfig & 0x0F, 13);

    // Requests past the DAC ceiling clamp to 20 dBm
    let (paconfig, padac) = encode_tx_power(30, true, PACONFIG_RESET, PADAC_RESET);
    assert_eq!(padac & 0x07, RF_PADAC_20DBM_ON);
    assert_eq!(paconfig & 0x0F, 15);
}

#[test]
fn tx_power_preserves_reserved_padac_bits() {
    let (_, padac) = encode_tx_power(20, true, PACONFIG_RESET, 0x84);
    assert_eq!(padac & 0xF8, 0x80);
}

#[test]
fn fsk_time_on_air_counts_framing_overhead() {
    // 5 B preamble + 3 B sync + length byte + 20 B payload + 2 B CRC
    // = 31 B = 248 bits at 4800 bps = 51.67 ms
    assert_eq!(fsk_time_on_air(4_800, 5, false, true, 3, false, 20), 52);

    // Fixed-length framing drops the length byte: 30 B = 50 ms flat
    assert_eq!(fsk_time_on_air(4_800, 5, true, true, 3, false, 20), 50);

    // Address filtering adds one on-air byte
    assert_eq!(fsk_time_on_air(4_800, 5, true, true, 3, true, 20), 52);
}

#[test]
fn fsk_time_on_air_scales_with_datarate() {
    let slow = fsk_time_on_air(4_800, 5, false, true, 3, false, 64);
    let fast = fsk_time_on_air(50_000, 5, false, true, 3, false, 64);
    assert!(slow > fast);
    // 75 B = 600 bits at 50 kbps = 12 ms
    assert_eq!(fast, 12);
}

#[test]
fn lora_time_on_air_sf7_reference_point() {
    // SF7 / 125 kHz / CR 4/5, 8-symbol preamble, explicit header, CRC,
    // 64 B payload: 118.016 ms on air, reported as 119 ms
    assert_eq!(lora_time_on_air(0, 7, 1, 8, false, true, false, 64), 119);
}

#[test]
fn lora_time_on_air_sf12_with_ldro() {
    // SF12 / 125 kHz / CR 4/5, 12 B payload, LDRO engaged: 23 payload
    // symbols at 32.768 ms/symbol plus preamble = 1155.072 ms
    assert_eq!(lora_time_on_air(0, 12, 1, 8, false, true, true, 12), 1_156);
}

#[test]
fn lora_time_on_air_monotonic_in_payload() {
    let short = lora_time_on_air(0, 9, 1, 8, false, true, false, 10);
    let long = lora_time_on_air(0, 9, 1, 8, false, true, false, 200);
    assert!(long > short);
}

#[test]
fn lora_time_on_air_higher_bandwidth_is_faster() {
    let bw125 = lora_time_on_air(0, 7, 1, 8, false, true, false, 32);
    let bw500 = lora_time_on_air(2, 7, 1, 8, false, true, false, 32);
    assert!(bw500 < bw125);
}

#[test]
fn low_datarate_optimize_required_combinations() {
    assert!(lora_low_datarate_optimize(0, 11));
    assert!(lora_low_datarate_optimize(0, 12));
    assert!(lora_low_datarate_optimize(1, 12));
    assert!(!lora_low_datarate_optimize(0, 10));
    assert!(!lora_low_datarate_optimize(1, 11));
    assert!(!lora_low_datarate_optimize(2, 12));
}

#[test]
fn fsk_rx_single_timeout_derivation() {
    // 8 symbols of 8 bits at 50 kbps = 1.28 ms, truncated to whole ms
    assert_eq!(fsk_rx_single_timeout_ms(50_000, 8), 1);
    assert_eq!(fsk_rx_single_timeout_ms(4_800, 30), 50);
}

proptest! {
    #[test]
    fn bandwidth_lookup_total_over_valid_domain(bw in 2_600u32..300_000) {
        prop_assert!(fsk_bandwidth_reg_value(bw).is_ok());
    }

    #[test]
    fn bandwidth_lookup_rejects_below_domain(bw in 0u32..2_600) {
        prop_assert!(fsk_bandwidth_reg_value(bw).is_err());
    }

    #[test]
    fn tx_power_nibble_always_in_range(power in -30i8..=30, boost: bool) {
        let (paconfig, padac) = encode_tx_power(power, boost, PACONFIG_RESET, PADAC_RESET);
        prop_assert!(paconfig & 0x0F <= 0x0F);
        prop_assert_eq!(paconfig & 0x80 != 0, boost);
        let dac = padac & 0x07;
        prop_assert!(dac == RF_PADAC_20DBM_ON || dac == RF_PADAC_20DBM_OFF);
    }

    #[test]
    fn lora_airtime_never_zero(
        sf in 7u8..=12,
        bw in 0u8..=2,
        cr in 1u8..=4,
        len in 1u8..=255,
    ) {
        let ldro = lora_low_datarate_optimize(bw, sf);
        let ms = lora_time_on_air(bw, sf, cr, 8, false, true, ldro, len);
        prop_assert!(ms > 0);
    }
}
