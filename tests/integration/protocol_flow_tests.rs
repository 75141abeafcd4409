//! End-to-end serial protocol flows: boot, identify, streaming, settings
//! persistence, and the gas line commands, all over the in-memory link.

use crate::mock_hw::{Clocks, MockHeater, MockLines, SweepSampler, service};

use enose::adapters::eeprom::NvsByteStore;
use enose::adapters::serial::SimLink;
use enose::app::ports::GasLine;
use enose::protocol::frame::FRAME_LEN;
use enose::protocol::{DATA_HEADER, DATA_TAIL, IDENTIFY_REPLY, REPORT_HEADER, REPORT_TAIL};

// ── Boot + identify ───────────────────────────────────────────

#[test]
fn boot_then_identify_replies_with_the_connection_string() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    svc.init(&mut store).unwrap();

    link.inject(b"v");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    assert_eq!(link.drain_tx(), IDENTIFY_REPLY);
}

#[test]
fn report_command_echoes_the_instrument_defaults() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    svc.init(&mut store).unwrap();

    link.inject(b"g");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    // Defaults: osr_h ×1, osr_t ×2, osr_p ×16, standby 0.5 ms, filter ×16.
    assert_eq!(
        link.drain_tx(),
        vec![REPORT_HEADER, 1, 2, 5, 0, 4, REPORT_TAIL]
    );
}

// ── Streaming ─────────────────────────────────────────────────

#[test]
fn streamed_frame_carries_the_sweep_and_the_sample() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();
    let mut sampler = SweepSampler;

    svc.init(&mut store).unwrap();

    link.inject(b"a");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(svc.streaming());

    svc.on_acquisition_tick(&mut sampler);
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    let frame = link.drain_tx();
    assert_eq!(frame.len(), FRAME_LEN);
    assert_eq!(frame[0], DATA_HEADER);
    assert_eq!(frame[1], 1, "first frame after boot carries seq 1");
    assert_eq!(frame[FRAME_LEN - 1], DATA_TAIL);

    // Gas words go out big-endian in channel order.
    assert_eq!(&frame[2..6], &110i32.to_be_bytes());
    assert_eq!(&frame[30..34], &880i32.to_be_bytes());

    // Environmental words follow: pressure, temperature, humidity.  The
    // simulated sensor's reference raws compensate to 25.08 °C.
    assert_eq!(&frame[38..42], &2508i32.to_be_bytes());

    // A second cycle bumps the sequence number.
    svc.on_acquisition_tick(&mut sampler);
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert_eq!(link.drain_tx()[1], 2);
}

#[test]
fn no_frame_goes_out_between_acquisitions() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    svc.init(&mut store).unwrap();

    link.inject(b"a");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    // Streaming is on but nothing was acquired yet.
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    assert!(link.drain_tx().is_empty());
}

// ── Settings persistence ──────────────────────────────────────

#[test]
fn settings_update_persists_across_a_reboot() {
    let clocks = Clocks::new();
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    {
        let mut svc = service(&clocks);
        svc.init(&mut store).unwrap();

        // osr_h ×16, osr_t ×8, osr_p ×4, standby 125 ms, filter ×2.
        link.inject(&[b't', 5, 4, 3, 2, 1, b'T']);
        svc.poll(&mut heater, &mut lines, &mut link, &mut store);

        assert_eq!(
            link.drain_tx(),
            vec![REPORT_HEADER, 5, 4, 3, 2, 1, REPORT_TAIL]
        );
    }

    // Power cycle: a new service over the same store picks the values up.
    let clocks2 = Clocks::new();
    let mut svc = service(&clocks2);
    svc.init(&mut store).unwrap();

    link.inject(b"g");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert_eq!(
        link.drain_tx(),
        vec![REPORT_HEADER, 5, 4, 3, 2, 1, REPORT_TAIL]
    );
}

#[test]
fn stalled_packet_is_abandoned_and_never_commits() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    svc.init(&mut store).unwrap();

    // Header plus one field, then the peer goes quiet.
    link.inject(&[b't', 5]);
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    // 20 unfed 250 ms ticks expire the watchdog.
    for _ in 0..20 {
        clocks.watchdog.tick(&clocks.signals);
    }
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);

    // The rest of the packet arrives too late to mean anything.
    link.inject(&[4, 3, 2, 1, b'T']);
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(link.drain_tx().is_empty(), "no report for an aborted packet");

    link.inject(b"g");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert_eq!(
        link.drain_tx(),
        vec![REPORT_HEADER, 1, 2, 5, 0, 4, REPORT_TAIL],
        "settings must still be the defaults"
    );
}

// ── Gas lines ─────────────────────────────────────────────────

#[test]
fn line_commands_route_the_gas_path() {
    let clocks = Clocks::new();
    let mut svc = service(&clocks);
    let mut store = NvsByteStore::new().unwrap();
    let mut heater = MockHeater::new();
    let mut lines = MockLines::new();
    let mut link = SimLink::new();

    svc.init(&mut store).unwrap();

    link.inject(b"h");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(lines.line_on(GasLine::Inlet));
    assert!(!lines.line_on(GasLine::Outlet));

    link.inject(b"y");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(!lines.line_on(GasLine::Inlet));
    assert!(lines.line_on(GasLine::Outlet));

    link.inject(b"e");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(lines.line_on(GasLine::Inlet));
    assert!(lines.line_on(GasLine::Outlet));

    link.inject(b"i");
    svc.poll(&mut heater, &mut lines, &mut link, &mut store);
    assert!(!lines.line_on(GasLine::Inlet));
    assert!(!lines.line_on(GasLine::Outlet));
}
