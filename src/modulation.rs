//! Heater modulation pattern engine.
//!
//! All four heater groups share one compare value against a period-99 PWM:
//! compare 0 is full drive, compare 99 (with the output killed) is off.
//! The engine is advanced by the pacing signals — 1 s cadence for the LUT
//! and triangle waveforms, 30 s cadence for ramp and square — and writes
//! through a [`HeaterPort`], so every waveform is testable against a
//! recording mock.
//!
//! | Pattern        | Cadence | Shape                               |
//! |----------------|---------|-------------------------------------|
//! | Ramp           | 30 s    | duty steps up 11 %, then output off |
//! | Square         | 30 s    | on/off toggle, re-synced at wrap    |
//! | Sine           | 1 s     | 50-entry duty LUT                   |
//! | Triangle       | 1 s     | compare walks ±2 between the rails  |
//! | SquareTriangle | 1 s     | 100-entry duty LUT                  |

use crate::app::ports::HeaterPort;
use log::info;

/// Shared PWM period.
pub const PWM_PERIOD: u8 = 99;
/// Ramp compare step per 30 s tick (11 % duty).
pub const RAMP_STEP: u8 = 11;

/// Duty LUT for the sine pattern, one entry per second.
const SINE_TABLE: [u8; 50] = [
    50, 56, 62, 68, 74, 78, 84, 88, 92, 96, 98, 100, 100, 100, 100, 98, 96, 92, 88, 84, 78, 74,
    68, 62, 56, 50, 44, 38, 32, 26, 22, 16, 12, 8, 4, 2, 0, 0, 0, 0, 2, 4, 8, 12, 16, 22, 26, 32,
    38, 44,
];

/// Duty LUT for the square+triangle pattern: half a cycle flat-out, then a
/// triangle sweep.
const SQTR_TABLE: [u8; 100] = [
    100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100,
    100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100,
    100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 100, 0, 4, 8, 12, 16, 20, 24, 28,
    32, 36, 40, 44, 48, 52, 56, 60, 64, 68, 72, 76, 80, 84, 88, 92, 96, 100, 96, 92, 88, 84, 80,
    76, 72, 68, 64, 60, 56, 52, 48, 44, 40, 36, 32, 28, 24, 20, 16, 12, 8, 4, 0,
];

/// Selectable heater modulation patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Ramp,
    Square,
    Sine,
    Triangle,
    SquareTriangle,
}

/// Which pacing signal advances a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// 1 s.
    Fast,
    /// 30 s.
    Slow,
}

impl Pattern {
    pub const fn cadence(self) -> Cadence {
        match self {
            Self::Ramp | Self::Square => Cadence::Slow,
            Self::Sine | Self::Triangle | Self::SquareTriangle => Cadence::Fast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slope {
    Up,
    Down,
}

/// Stack-allocated modulation engine.
pub struct Modulator {
    active: Option<Pattern>,
    sine_idx: usize,
    sqtr_idx: usize,
    slope: Slope,
}

impl Modulator {
    pub fn new() -> Self {
        Self {
            active: None,
            sine_idx: 0,
            sqtr_idx: 0,
            slope: Slope::Up,
        }
    }

    pub fn active(&self) -> Option<Pattern> {
        self.active
    }

    /// Activate a pattern.  Refused (returns `false`) while another pattern
    /// is active — the operator deselects first.  Activation rewinds the
    /// waveform state and parks the heaters at the idle drive.
    pub fn select(&mut self, pattern: Pattern, hw: &mut impl HeaterPort) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.rewind();
        self.active = Some(pattern);
        hw.set_output(true);
        hw.write_compare_all(0);
        info!("modulation: {pattern:?} selected");
        true
    }

    /// Deactivate whatever pattern is running.  Heater drive is left as-is;
    /// the command layer decides the final drive state.
    pub fn deselect(&mut self) {
        if let Some(p) = self.active.take() {
            info!("modulation: {p:?} deselected");
        }
        self.rewind();
    }

    /// Rewind waveform state without touching the selection.
    pub fn rewind(&mut self) {
        self.sine_idx = 0;
        self.sqtr_idx = 0;
        self.slope = Slope::Up;
    }

    /// 1 s cadence step (sine / triangle / square+triangle).
    pub fn advance_fast(&mut self, hw: &mut impl HeaterPort) {
        match self.active {
            Some(Pattern::Sine) => self.step_sine(hw),
            Some(Pattern::Triangle) => self.step_triangle(hw),
            Some(Pattern::SquareTriangle) => self.step_sqtr(hw),
            _ => {}
        }
    }

    /// 30 s cadence step (ramp / square).  `cycle_start` is true when the
    /// pace counter wrapped to zero, which re-syncs the square phase.
    pub fn advance_slow(&mut self, hw: &mut impl HeaterPort, cycle_start: bool) {
        match self.active {
            Some(Pattern::Ramp) => self.step_ramp(hw),
            Some(Pattern::Square) => self.step_square(hw, cycle_start),
            _ => {}
        }
    }

    fn step_ramp(&mut self, hw: &mut impl HeaterPort) {
        let cmp = hw.compare();
        if cmp != 0 {
            hw.set_output(true);
            hw.write_compare_all(cmp - RAMP_STEP);
        } else {
            // Kill the output: at compare 99 the duty is not quite 0.
            hw.set_output(false);
            hw.write_compare_all(PWM_PERIOD);
        }
    }

    fn step_square(&mut self, hw: &mut impl HeaterPort, cycle_start: bool) {
        if cycle_start {
            hw.set_output(true);
            hw.write_compare_all(0);
        } else {
            let on = hw.output_enabled();
            hw.set_output(!on);
        }
    }

    fn step_sine(&mut self, hw: &mut impl HeaterPort) {
        Self::apply_duty(hw, SINE_TABLE[self.sine_idx]);
        self.sine_idx = (self.sine_idx + 1) % SINE_TABLE.len();
    }

    fn step_sqtr(&mut self, hw: &mut impl HeaterPort) {
        Self::apply_duty(hw, SQTR_TABLE[self.sqtr_idx]);
        self.sqtr_idx = (self.sqtr_idx + 1) % SQTR_TABLE.len();
    }

    fn step_triangle(&mut self, hw: &mut impl HeaterPort) {
        let cmp = hw.compare();
        match self.slope {
            Slope::Up => {
                if cmp == 1 {
                    // Turnaround just above full drive.
                    hw.set_output(true);
                    hw.write_compare_all(cmp + 2);
                    self.slope = Slope::Down;
                } else if cmp != 0 {
                    hw.set_output(true);
                    hw.write_compare_all(cmp - 2);
                } else {
                    hw.set_output(false);
                    hw.write_compare_all(PWM_PERIOD);
                }
            }
            Slope::Down => {
                if cmp == 97 {
                    hw.set_output(false);
                    hw.write_compare_all(PWM_PERIOD);
                } else if cmp == PWM_PERIOD {
                    hw.set_output(true);
                    hw.write_compare_all(cmp - 2);
                    self.slope = Slope::Up;
                } else {
                    hw.set_output(true);
                    hw.write_compare_all(cmp + 2);
                }
            }
        }
    }

    /// Map a LUT duty entry onto the shared compare.  Duty 0 kills the
    /// output entirely; duty above the period saturates at full drive.
    fn apply_duty(hw: &mut impl HeaterPort, duty: u8) {
        if duty == 0 {
            hw.set_output(false);
        } else {
            hw.set_output(true);
            let cmp = if duty > PWM_PERIOD {
                0
            } else {
                PWM_PERIOD - duty
            };
            hw.write_compare_all(cmp);
        }
    }
}
