//! Recording hardware mocks for integration tests.
//!
//! The heater and hydraulics mocks record every actuator call so tests can
//! assert on the full command history.  The sensor bus, serial link, and
//! byte store reuse the crate's own in-memory adapter backends.

use embedded_hal::delay::DelayNs;
use enose::adapters::i2c::SimSensorBus;
use enose::app::InstrumentService;
use enose::app::ports::{GasLine, GasReadings, GasSamplerPort, HeaterPort, HydraulicsPort};
use enose::bme280::Bme280;
use enose::error::AcquisitionError;
use enose::scheduler::{PaceClock, ProtocolWatchdog};
use enose::signals::Signals;

// ── Delay stub ────────────────────────────────────────────────

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Heater mock ───────────────────────────────────────────────

/// Records every compare and output write.
pub struct MockHeater {
    pub compare: u8,
    pub output: bool,
    pub compare_writes: Vec<u8>,
    pub output_writes: Vec<bool>,
}

#[allow(dead_code)]
impl MockHeater {
    pub fn new() -> Self {
        Self {
            compare: 0,
            output: false,
            compare_writes: Vec::new(),
            output_writes: Vec::new(),
        }
    }
}

impl HeaterPort for MockHeater {
    fn compare(&self) -> u8 {
        self.compare
    }

    fn write_compare_all(&mut self, cmp: u8) {
        self.compare = cmp;
        self.compare_writes.push(cmp);
    }

    fn set_output(&mut self, enabled: bool) {
        self.output = enabled;
        self.output_writes.push(enabled);
    }

    fn output_enabled(&self) -> bool {
        self.output
    }
}

// ── Hydraulics mock ───────────────────────────────────────────

/// Records `(line, enabled)` in call order.
pub struct MockLines {
    pub calls: Vec<(GasLine, bool)>,
}

#[allow(dead_code)]
impl MockLines {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    /// Last commanded state of a line, `false` if never touched.
    pub fn line_on(&self, line: GasLine) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|&(l, on)| (l == line).then_some(on))
            .unwrap_or(false)
    }
}

impl HydraulicsPort for MockLines {
    fn enable_line(&mut self, line: GasLine) {
        self.calls.push((line, true));
    }

    fn disable_line(&mut self, line: GasLine) {
        self.calls.push((line, false));
    }
}

// ── Gas sampler mock ──────────────────────────────────────────

/// Returns a fixed, distinguishable sweep on every acquisition.
pub struct SweepSampler;

impl GasSamplerPort for SweepSampler {
    fn acquire(&mut self) -> Result<GasReadings, AcquisitionError> {
        Ok([110, 220, 330, 440, 550, 660, 770, 880])
    }
}

// ── Service rig ───────────────────────────────────────────────

/// The shared timer-owned state, held by the test so the service can
/// borrow it.
pub struct Clocks {
    pub signals: Signals,
    pub pace: PaceClock,
    pub watchdog: ProtocolWatchdog,
}

impl Clocks {
    pub fn new() -> Self {
        Self {
            signals: Signals::new(),
            pace: PaceClock::new(),
            watchdog: ProtocolWatchdog::new(),
        }
    }
}

/// Fresh service over the simulated sensor bus.
pub fn service(clocks: &Clocks) -> InstrumentService<'_, SimSensorBus, NoDelay> {
    let sensor = Bme280::new(SimSensorBus::new(), NoDelay);
    InstrumentService::new(sensor, &clocks.signals, &clocks.pace, &clocks.watchdog)
}
