//! Lossy boolean signals between tick producers and the main loop.
//!
//! Each cell has exactly one writer (a timer callback) and one reader
//! (the main loop).  A raise is "level-triggered": raising an already-raised
//! signal coalesces with the pending one, so a slow consumer sees at most
//! one pending edge no matter how many ticks fired in between.  That
//! coalescing is load-bearing — pattern advances and acquisition cycles are
//! paced by the *latest* state, never replayed.
//!
//! ```text
//! ┌──────────────────┐                       ┌──────────────┐
//! │ pace timer 200ms │──▶ advance_fast/slow ─▶│              │
//! │ acq timer 10ms   │──▶ acquire ───────────▶│  Main Loop   │
//! │ wdt timer 250ms  │──▶ protocol_timeout ──▶│  (consumer)  │
//! └──────────────────┘                       └──────────────┘
//! ```
//!
//! No ambient globals: producers and the consumer both receive `&Signals`.

use core::sync::atomic::{AtomicBool, Ordering};

/// A single-writer / single-reader boolean signal cell.
#[derive(Debug, Default)]
pub struct Signal(AtomicBool);

impl Signal {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the signal.  Raising an already-raised signal is a no-op
    /// (edges coalesce).
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Lower the signal without consuming it.
    pub fn lower(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Consume the signal: returns `true` at most once per raise and
    /// lowers it.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Peek without consuming.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// All cross-context signals of the instrument, grouped in one place so
/// producers and the consumer share a single `&Signals`.
#[derive(Debug, Default)]
pub struct Signals {
    /// 10 ms acquisition tick.
    pub acquire: Signal,
    /// 1 s modulation cadence (sine / triangle / square-triangle).
    pub advance_fast: Signal,
    /// 30 s modulation cadence (ramp / square).
    pub advance_slow: Signal,
    /// The pace counter wrapped to zero (square re-sync point).
    pub cycle_start: Signal,
    /// A full gas-channel sweep is available.
    pub gas_ready: Signal,
    /// A fresh environmental sample is available.
    pub env_ready: Signal,
    /// Both halves of a telemetry frame are available.
    pub frame_ready: Signal,
    /// 5 s elapsed without a received serial byte.
    pub protocol_timeout: Signal,
}

impl Signals {
    pub const fn new() -> Self {
        Self {
            acquire: Signal::new(),
            advance_fast: Signal::new(),
            advance_slow: Signal::new(),
            cycle_start: Signal::new(),
            gas_ready: Signal::new(),
            env_ready: Signal::new(),
            frame_ready: Signal::new(),
            protocol_timeout: Signal::new(),
        }
    }

    /// Lower every acquisition- and pacing-related signal.  Used when the
    /// pacing is restarted by a command; a stale edge must not advance a
    /// freshly selected pattern.
    pub fn clear_pacing(&self) {
        self.acquire.lower();
        self.advance_fast.lower();
        self.advance_slow.lower();
        self.cycle_start.lower();
        self.gas_ready.lower();
        self.env_ready.lower();
        self.frame_ready.lower();
    }
}
