//! Pattern selection over the serial link, advanced by real pace-clock
//! ticks: command byte → modulator → heater writes, with the cadence
//! signals flowing through the same path the timer callbacks use.
//!
//! Patterns only advance while telemetry streams, so each flow opens
//! with `a` before selecting its waveform.

use crate::mock_hw::{Clocks, MockHeater, MockLines, service};

use enose::adapters::eeprom::NvsByteStore;
use enose::adapters::serial::SimLink;
use enose::modulation::{PWM_PERIOD, Pattern, RAMP_STEP};

/// Everything one modulation test needs on the bench.
struct Bench {
    store: NvsByteStore,
    heater: MockHeater,
    lines: MockLines,
    link: SimLink,
}

impl Bench {
    fn new() -> Self {
        Self {
            store: NvsByteStore::new().unwrap(),
            heater: MockHeater::new(),
            lines: MockLines::new(),
            link: SimLink::new(),
        }
    }
}

#[test]
fn triangle_advances_on_the_fast_cadence() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"at");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Triangle));
    assert_eq!(b.heater.compare, 0, "selection starts at full drive");
    assert!(b.heater.output);

    // First pace tick lands on counter 0 and raises the fast cadence.
    clocks.pace.tick(&clocks.signals);
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD, "full drive steps to off");
    assert!(!b.heater.output);

    // Five more 200 ms ticks reach the next 1 s edge.
    for _ in 0..5 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, 97);
    assert!(b.heater.output);
}

#[test]
fn sine_walks_the_duty_table() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"aw");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Sine));

    // Table entries 50 then 56, as compare = period − duty.
    clocks.pace.tick(&clocks.signals);
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD - 50);

    for _ in 0..5 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD - 56);
}

#[test]
fn ramp_steps_down_the_compare_on_the_slow_cadence() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"ar");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Ramp));
    assert_eq!(b.heater.compare, 0);

    // Counter 0: from full drive the ramp wraps to output-off.
    clocks.pace.tick(&clocks.signals);
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD);
    assert!(!b.heater.output);

    // Next 30 s edge: drive steps back in, one ramp step down.
    for _ in 0..150 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD - RAMP_STEP);
    assert!(b.heater.output);

    for _ in 0..150 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD - 2 * RAMP_STEP);
}

#[test]
fn square_toggles_and_resyncs_at_the_cycle_wrap() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"aq");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Square));

    // Counter 0 is a cycle start: forced to the on phase.
    clocks.pace.tick(&clocks.signals);
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert!(b.heater.output);
    assert_eq!(b.heater.compare, 0);

    // Each following 30 s edge toggles the output.
    for _ in 0..150 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert!(!b.heater.output);

    for _ in 0..150 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert!(b.heater.output);

    // Run the counter through the 5 min wrap: the cycle start re-syncs
    // the phase to on regardless of where the toggle left it.
    for _ in 0..1500 {
        clocks.pace.tick(&clocks.signals);
    }
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert!(b.heater.output);
    assert_eq!(b.heater.compare, 0);
}

#[test]
fn pattern_waits_for_streaming_before_it_modulates() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"r");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Ramp));

    // A full 30 s of pace edges with streaming off: the drive holds.
    for _ in 0..151 {
        clocks.pace.tick(&clocks.signals);
        svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    }
    assert_eq!(b.heater.compare, 0, "idle drive must hold until `a`");
    assert!(b.heater.output);

    // Streaming clears the selection, so the ramp is re-armed under
    // stream and only then starts walking.
    b.link.inject(b"ar");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    clocks.pace.tick(&clocks.signals);
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(b.heater.compare, PWM_PERIOD);
    assert!(!b.heater.output);
}

#[test]
fn pattern_commands_interlock_until_heater_off() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut b = Bench::new();
    svc.init(&mut b.store).unwrap();

    b.link.inject(b"q");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Square));

    // A second selection is refused while one is running.
    b.link.inject(b"w");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Square));

    // Heater-off releases the interlock and kills the output.
    b.link.inject(b"o");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), None);
    assert!(!b.heater.output);

    b.link.inject(b"w");
    svc.poll(&mut b.heater, &mut b.lines, &mut b.link, &mut b.store);
    assert_eq!(svc.active_pattern(), Some(Pattern::Sine));
}
