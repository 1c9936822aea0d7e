//! # Radio Event Callbacks
//!
//! The driver reports radio outcomes asynchronously through this trait; the
//! synchronous public API never returns radio-level results itself. Every
//! method has a no-op default so a listener only implements the subset it
//! cares about, and the driver holds the listener through a `Weak` reference
//! so it never extends the listener's lifetime.

/// Callbacks raised from the interrupt dispatch context.
///
/// All methods are invoked with the driver lock held; implementations should
/// hand heavy work off to their own context rather than blocking the radio.
pub trait RadioEvents {
    /// Transmission completed.
    fn tx_done(&self) {}

    /// TX supervision timer fired; the radio has been re-initialized and is
    /// back in `Idle`.
    fn tx_timeout(&self) {}

    /// Packet received. `rssi` in dBm; `snr` in dB, meaningful for LoRa only.
    fn rx_done(&self, _payload: &[u8], _rssi: i16, _snr: i8) {}

    /// Receive window closed without a packet.
    fn rx_timeout(&self) {}

    /// Packet received but discarded (CRC failure or oversized declaration).
    fn rx_error(&self) {}

    /// Frequency hop performed; `channel` is the new hop channel index.
    fn fhss_change_channel(&self, _channel: u8) {}

    /// Channel activity detection finished.
    fn cad_done(&self, _channel_activity_detected: bool) {}
}
