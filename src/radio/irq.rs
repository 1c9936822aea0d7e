//! # Interrupt Event Queue and TX Timeout Timer
//!
//! ISR-to-worker hand-off for the six DIO lines plus the synthetic TX
//! timeout event. Interrupt context does negligible work: it sets one bit in
//! a pending mask and wakes the worker once ("coalesce bursts, wake once").
//! The worker drains the whole mask in a single lock acquisition and
//! dispatches the lines in fixed priority order, DIO0 first and the timeout
//! event last, so a packet-complete signal is never starved by a
//! FIFO-level signal arriving in the same batch.

use log::warn;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Hardware interrupt lines of the SX1272.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DioLine {
    Dio0,
    Dio1,
    Dio2,
    Dio3,
    Dio4,
    Dio5,
}

impl DioLine {
    /// All lines in dispatch priority order.
    pub const ALL: [DioLine; 6] = [
        DioLine::Dio0,
        DioLine::Dio1,
        DioLine::Dio2,
        DioLine::Dio3,
        DioLine::Dio4,
        DioLine::Dio5,
    ];

    pub(crate) fn bit(self) -> u8 {
        match self {
            DioLine::Dio0 => EVT_DIO0,
            DioLine::Dio1 => EVT_DIO1,
            DioLine::Dio2 => EVT_DIO2,
            DioLine::Dio3 => EVT_DIO3,
            DioLine::Dio4 => EVT_DIO4,
            DioLine::Dio5 => EVT_DIO5,
        }
    }
}

/// Event mask bits consumed by the dispatch path, one per DIO line plus the
/// synthetic TX timeout.
pub const EVT_DIO0: u8 = 1 << 0;
pub const EVT_DIO1: u8 = 1 << 1;
pub const EVT_DIO2: u8 = 1 << 2;
pub const EVT_DIO3: u8 = 1 << 3;
pub const EVT_DIO4: u8 = 1 << 4;
pub const EVT_DIO5: u8 = 1 << 5;
/// Synthetic event raised by the TX supervision timer, not a pin.
pub const EVT_TIMEOUT: u8 = 1 << 6;

/// Per-line dispatch counters, owned by the driver instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrqStats {
    /// Events dispatched per DIO line
    pub dio_events: [u64; 6],
    /// Synthetic TX timeout events dispatched
    pub timeout_events: u64,
    /// Worker wake-ups (batches processed)
    pub batches: u64,
    /// CRC failures observed on RX
    pub crc_errors: u64,
    /// Completed transmissions
    pub tx_done: u64,
    /// Completed receptions
    pub rx_done: u64,
    /// Full re-initialization recoveries taken
    pub tx_timeout_recoveries: u64,
}

/// Bounded pending-event notification shared between ISR context and the
/// worker. The "queue" is a bitmask: repeated posts of one line coalesce,
/// which matches the chip (the flag register, not the edge count, carries
/// the information).
pub struct IrqPending {
    state: Mutex<PendingState>,
    cond: Condvar,
}

struct PendingState {
    mask: u8,
    shutdown: bool,
}

impl IrqPending {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PendingState {
                mask: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Post a DIO event. Safe from interrupt-thread context: one short
    /// critical section and a wake, no register I/O.
    pub fn post(&self, line: DioLine) {
        self.post_bits(line.bit());
    }

    /// Post the synthetic TX timeout event.
    pub fn post_timeout(&self) {
        self.post_bits(EVT_TIMEOUT);
    }

    fn post_bits(&self, bits: u8) {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.mask |= bits;
        self.cond.notify_one();
    }

    /// Block until at least one event is pending, then drain and return the
    /// whole mask. Returns `None` once shut down and drained.
    pub fn wait(&self) -> Option<u8> {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if state.mask != 0 {
                let mask = state.mask;
                state.mask = 0;
                return Some(mask);
            }
            if state.shutdown {
                return None;
            }
            state = match self.cond.wait(state) {
                Ok(s) => s,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Non-blocking drain for callers running the no-worker model.
    pub fn take(&self) -> u8 {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mask = state.mask;
        state.mask = 0;
        mask
    }

    /// Wake the worker for the last time.
    pub fn shutdown(&self) {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.shutdown = true;
        self.cond.notify_all();
    }
}

impl Default for IrqPending {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot TX supervision timer.
///
/// Arming spawns a short-lived sleeper thread tagged with a generation
/// number; cancelling bumps the generation so a stale sleeper expires
/// silently instead of firing against unrelated later state.
pub struct TxTimeoutTimer {
    pending: Arc<IrqPending>,
    generation: Arc<(Mutex<u64>, Condvar)>,
}

impl TxTimeoutTimer {
    pub fn new(pending: Arc<IrqPending>) -> Self {
        Self {
            pending,
            generation: Arc::new((Mutex::new(0), Condvar::new())),
        }
    }

    /// Arm the timer. Any previously armed timeout is superseded.
    pub fn arm(&self, timeout: Duration) {
        let (lock, _) = &*self.generation;
        let my_gen = {
            let mut gen = match lock.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            *gen += 1;
            *gen
        };

        let pending = Arc::clone(&self.pending);
        let generation = Arc::clone(&self.generation);
        let builder = thread::Builder::new().name("sx1272-tx-timer".into());
        let spawned = builder.spawn(move || {
            let (lock, cond) = &*generation;
            let deadline = Instant::now() + timeout;
            let mut gen = match lock.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            loop {
                if *gen != my_gen {
                    // Cancelled or re-armed
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                gen = match cond.wait_timeout(gen, deadline - now) {
                    Ok((g, _)) => g,
                    Err(poisoned) => poisoned.into_inner().0,
                };
            }
            drop(gen);
            pending.post_timeout();
        });
        if spawned.is_err() {
            warn!("failed to spawn TX timeout timer thread");
        }
    }

    /// Cancel a pending timeout. Idempotent; a timer that already fired is
    /// unaffected (the dispatch path ignores timeouts outside TxRunning).
    pub fn cancel(&self) {
        let (lock, cond) = &*self.generation;
        let mut gen = match lock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *gen += 1;
        cond.notify_all();
    }
}
