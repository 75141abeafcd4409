//! Tick pacing for modulation and the protocol watchdog.
//!
//! Two periodic timers drive the instrument:
//!
//! - a 200 ms pace tick that derives the 1 s and 30 s modulation cadences
//!   from a single counter, and
//! - a 250 ms watchdog tick that detects a stalled serial peer.
//!
//! Both raise [`Signals`](crate::signals::Signals) cells; the main loop
//! consumes them.  Counters live in atomics so the timer callbacks can run
//! in a different execution context from the consumer.
//!
//! ```text
//!   200 ms ──▶ counter: -1, 0, 1, … 1499, 0, …
//!                ├─ counter % 5   == 0  → advance_fast   (1 s)
//!                ├─ counter % 150 == 0  → advance_slow   (30 s)
//!                └─ counter       == 0  → cycle_start
//!   250 ms ──▶ 20 ticks without a byte → protocol_timeout (5 s)
//! ```

use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use crate::signals::Signals;
use log::debug;

/// Pace ticks per full cycle (1500 × 200 ms = 5 min).
pub const PACE_WRAP_TICKS: i32 = 1500;
/// Pace ticks per fast cadence (5 × 200 ms = 1 s).
pub const FAST_CADENCE_TICKS: i32 = 5;
/// Pace ticks per slow cadence (150 × 200 ms = 30 s).
pub const SLOW_CADENCE_TICKS: i32 = 150;

/// Derives the modulation cadences from the 200 ms pace tick.
///
/// The counter starts at -1 so the first tick after a reset lands on 0,
/// firing both cadences and the cycle-start marker at once: a freshly
/// selected pattern takes its first step 200 ms after the command.
#[derive(Debug)]
pub struct PaceClock {
    counter: AtomicI32,
}

impl PaceClock {
    pub const fn new() -> Self {
        Self {
            counter: AtomicI32::new(-1),
        }
    }

    /// Advance one 200 ms tick, raising the cadence signals that fall on
    /// this tick.  Single writer: the pace timer callback.
    pub fn tick(&self, signals: &Signals) {
        let mut counter = self.counter.load(Ordering::Relaxed) + 1;
        if counter == PACE_WRAP_TICKS {
            counter = 0;
        }
        self.counter.store(counter, Ordering::Relaxed);

        if counter % FAST_CADENCE_TICKS == 0 {
            signals.advance_fast.raise();
        }
        if counter % SLOW_CADENCE_TICKS == 0 {
            signals.advance_slow.raise();
            if counter == 0 {
                signals.cycle_start.raise();
            }
        }
    }

    /// Restart pacing: the next tick lands on counter 0.
    pub fn reset(&self) {
        self.counter.store(-1, Ordering::Relaxed);
    }

    /// Current counter value (test/diagnostic hook).
    pub fn counter(&self) -> i32 {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Watchdog ticks before a stalled peer is declared (20 × 250 ms = 5 s).
pub const WATCHDOG_LIMIT_TICKS: u32 = 20;

/// Detects a serial peer that stopped mid-packet.
///
/// Fed by every received byte; ticked every 250 ms.  After
/// [`WATCHDOG_LIMIT_TICKS`] unfed ticks it raises `protocol_timeout` and
/// starts over.
#[derive(Debug)]
pub struct ProtocolWatchdog {
    ticks: AtomicU32,
}

impl ProtocolWatchdog {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// One 250 ms watchdog tick.  Single writer: the watchdog timer
    /// callback.
    pub fn tick(&self, signals: &Signals) {
        let ticks = self.ticks.load(Ordering::Relaxed) + 1;
        if ticks >= WATCHDOG_LIMIT_TICKS {
            debug!("protocol watchdog expired");
            signals.protocol_timeout.raise();
            self.ticks.store(0, Ordering::Relaxed);
        } else {
            self.ticks.store(ticks, Ordering::Relaxed);
        }
    }

    /// A byte arrived; push the deadline out.
    pub fn feed(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
