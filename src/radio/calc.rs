//! # Derived-Configuration Calculators
//!
//! Pure functions mapping requested radio parameters to register encodings
//! and air-time figures: the FSK channel-filter bandwidth table lookup, the
//! TX-power to `PACONFIG`/`PADAC` encoding, and the time-on-air formulas for
//! both modems. The numeric semantics (clamp ranges, rounding directions)
//! are load-bearing: MAC-layer duty-cycle enforcement sits on top of them.

use crate::error::Sx1272Error;
use crate::radio::registers::*;

/// FSK channel filter bandwidths and their `REG_RXBW` codes, ascending.
///
/// The final entry is not a valid selection; it only closes the last
/// bracket of the lookup.
const FSK_BANDWIDTHS: &[(u32, u8)] = &[
    (2_600, 0x17),
    (3_100, 0x0F),
    (3_900, 0x07),
    (5_200, 0x16),
    (6_300, 0x0E),
    (7_800, 0x06),
    (10_400, 0x15),
    (12_500, 0x0D),
    (15_600, 0x05),
    (20_800, 0x14),
    (25_000, 0x0C),
    (31_300, 0x04),
    (41_700, 0x13),
    (50_000, 0x0B),
    (62_500, 0x03),
    (83_333, 0x12),
    (100_000, 0x0A),
    (125_000, 0x02),
    (166_700, 0x11),
    (200_000, 0x09),
    (250_000, 0x01),
    (300_000, 0x00), // Invalid bandwidth, upper bracket only
];

/// Look up the `REG_RXBW`/`REG_AFCBW` code for a requested bandwidth in Hz.
///
/// Returns the code of the bracketing table entry: the last entry whose
/// bandwidth is `<=` the request. Requests outside `[2600, 300000)` Hz have
/// no register encoding and fail with [`Sx1272Error::InvalidBandwidth`].
pub fn fsk_bandwidth_reg_value(bandwidth: u32) -> Result<u8, Sx1272Error> {
    for pair in FSK_BANDWIDTHS.windows(2) {
        let (low, code) = pair[0];
        let (high, _) = pair[1];
        if bandwidth >= low && bandwidth < high {
            return Ok(code);
        }
    }
    Err(Sx1272Error::InvalidBandwidth(bandwidth))
}

/// Encode a requested TX power into new `PACONFIG`/`PADAC` register values.
///
/// `pa_boost` selects the PA path (board wiring). Power is clamped to the
/// valid range of the selected path: RFO -1..=14 dBm, PA_BOOST 2..=17 dBm,
/// or 5..=20 dBm once the +20 dBm DAC boost engages (auto-enabled for
/// requests above 17 dBm). Reserved bits of both registers are preserved.
pub fn encode_tx_power(power: i8, pa_boost: bool, paconfig: u8, padac: u8) -> (u8, u8) {
    let mut paconfig = (paconfig & RF_PACONFIG_PASELECT_MASK)
        | if pa_boost {
            RF_PACONFIG_PASELECT_PABOOST
        } else {
            RF_PACONFIG_PASELECT_RFO
        };
    let mut padac = padac;

    let output_power;
    if pa_boost {
        padac = (padac & RF_PADAC_20DBM_MASK)
            | if power > 17 {
                RF_PADAC_20DBM_ON
            } else {
                RF_PADAC_20DBM_OFF
            };
        if (padac & !RF_PADAC_20DBM_MASK) == RF_PADAC_20DBM_ON {
            let power = power.clamp(5, 20);
            output_power = (power - 5) as u8;
        } else {
            let power = power.clamp(2, 17);
            output_power = (power - 2) as u8;
        }
    } else {
        let power = power.clamp(-1, 14);
        output_power = (power + 1) as u8;
    }

    paconfig = (paconfig & RF_PACONFIG_OUTPUTPOWER_MASK) | (output_power & 0x0F);
    (paconfig, padac)
}

/// Whether the LoRa low-data-rate-optimize bit is required for the given
/// bandwidth index (0 = 125 kHz, 1 = 250 kHz, 2 = 500 kHz) and spreading
/// factor. Required when the symbol time exceeds 16 ms.
pub fn lora_low_datarate_optimize(bandwidth: u8, datarate: u8) -> bool {
    (bandwidth == 0 && (datarate == 11 || datarate == 12)) || (bandwidth == 1 && datarate == 12)
}

/// LoRa bandwidth index to Hz.
pub fn lora_bandwidth_hz(bandwidth: u8) -> f64 {
    match bandwidth {
        0 => 125_000.0,
        1 => 250_000.0,
        _ => 500_000.0,
    }
}

/// FSK time-on-air in milliseconds, rounded to nearest.
///
/// `sync_word_len` in bytes and `addr_filter_on` come from the live
/// `REG_SYNCCONFIG`/`REG_PACKETCONFIG1` values; variable-length framing adds
/// one length byte, CRC adds two trailing bytes.
pub fn fsk_time_on_air(
    datarate: u32,
    preamble_len: u16,
    fix_len: bool,
    crc_on: bool,
    sync_word_len: u8,
    addr_filter_on: bool,
    pkt_len: u8,
) -> u32 {
    let bits = 8.0
        * (f64::from(preamble_len)
            + f64::from(sync_word_len)
            + if fix_len { 0.0 } else { 1.0 }
            + if addr_filter_on { 1.0 } else { 0.0 }
            + f64::from(pkt_len)
            + if crc_on { 2.0 } else { 0.0 });
    (bits / f64::from(datarate) * 1000.0).round() as u32
}

/// LoRa time-on-air in milliseconds, rounded up to the next whole ms.
///
/// Standard LoRa airtime formula: preamble time plus payload symbol count
/// at the symbol rate given by bandwidth and spreading factor, accounting
/// for coding rate, explicit/implicit header, CRC and the
/// low-data-rate-optimize reduction.
#[allow(clippy::too_many_arguments)]
pub fn lora_time_on_air(
    bandwidth: u8,
    datarate: u8,
    coderate: u8,
    preamble_len: u16,
    fix_len: bool,
    crc_on: bool,
    low_datarate_optimize: bool,
    pkt_len: u8,
) -> u32 {
    let bw = lora_bandwidth_hz(bandwidth);

    // Symbol rate and symbol time
    let rs = bw / f64::from(1u32 << datarate);
    let ts = 1.0 / rs;
    let t_preamble = (f64::from(preamble_len) + 4.25) * ts;

    // Payload symbol count
    let tmp = ((8.0 * f64::from(pkt_len) - 4.0 * f64::from(datarate)
        + 28.0
        + 16.0 * if crc_on { 1.0 } else { 0.0 }
        - if fix_len { 20.0 } else { 0.0 })
        / (4.0 * (f64::from(datarate) - if low_datarate_optimize { 2.0 } else { 0.0 })))
    .ceil()
        * f64::from(coderate + 4);
    let n_payload = 8.0 + tmp.max(0.0);
    let t_payload = n_payload * ts;

    let t_on_air = t_preamble + t_payload;
    // Seconds to ms, rounded up
    (t_on_air * 1000.0 + 0.999).floor() as u32
}

/// Derived single-shot FSK RX timeout in milliseconds for a symbol count at
/// a bit rate (one "symbol" is eight bits on the FSK modem).
pub fn fsk_rx_single_timeout_ms(datarate: u32, symb_timeout: u16) -> u32 {
    (f64::from(symb_timeout) * (8.0 / f64::from(datarate)) * 1000.0) as u32
}

#[cfg(test)]
#[path = "calc_tests.rs"]
mod calc_tests;
