//! Instrument service — the hexagonal core.
//!
//! [`InstrumentService`] owns the environmental sensor driver, the heater
//! modulation engine, the settings decoder, and the telemetry bundler.
//! All I/O flows through port traits injected at call sites, so the whole
//! command/stream behavior runs against mocks on the host.
//!
//! ```text
//!  GasSamplerPort ──▶ ┌─────────────────────────┐ ──▶ SerialPort
//!  RegisterBus  ◀───▶ │    InstrumentService     │ ──▶ HeaterPort
//!  timers (Signals) ─▶│ decode · pace · bundle   │ ──▶ HydraulicsPort
//!                     └─────────────────────────┘ ◀─▶ ByteStore
//! ```
//!
//! Two entry points, called from different contexts:
//!
//! - [`on_acquisition_tick`](InstrumentService::on_acquisition_tick) runs on
//!   the 10 ms acquisition cadence and only moves data into the service,
//! - [`poll`](InstrumentService::poll) runs in the main loop and does
//!   everything else: byte decoding, command dispatch, pattern advancing,
//!   settings commits, and telemetry emission.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::bme280::registers::{Filter, Mode, Oversampling, StandbyTime};
use crate::bme280::{Bme280, SensorSettings};
use crate::error::Result;
use crate::modulation::{Modulator, Pattern};
use crate::protocol::IDENTIFY_REPLY;
use crate::protocol::command::Command;
use crate::protocol::frame::{FrameBundler, SettingsReport};
use crate::protocol::settings::{SettingsDecoder, SettingsUpdate};
use crate::scheduler::{PaceClock, ProtocolWatchdog};
use crate::signals::Signals;

use super::ports::{
    ByteStore, GasLine, GasReadings, GasSamplerPort, HeaterPort, HydraulicsPort, RegisterBus,
    SerialPort, SettingKey,
};

// ───────────────────────────────────────────────────────────────
// InstrumentService
// ───────────────────────────────────────────────────────────────

/// The instrument service orchestrates the whole measurement chain.
pub struct InstrumentService<'c, B, D> {
    sensor: Bme280<B, D>,
    modulator: Modulator,
    decoder: SettingsDecoder,
    bundler: FrameBundler,
    signals: &'c Signals,
    pace: &'c PaceClock,
    watchdog: &'c ProtocolWatchdog,
    /// Latest gas-channel sweep, overwritten on every acquisition tick.
    gas: GasReadings,
    streaming: bool,
}

impl<'c, B: RegisterBus, D: DelayNs> InstrumentService<'c, B, D> {
    pub fn new(
        sensor: Bme280<B, D>,
        signals: &'c Signals,
        pace: &'c PaceClock,
        watchdog: &'c ProtocolWatchdog,
    ) -> Self {
        Self {
            sensor,
            modulator: Modulator::new(),
            decoder: SettingsDecoder::new(),
            bundler: FrameBundler::new(),
            signals,
            pace,
            watchdog,
            gas: GasReadings::default(),
            streaming: false,
        }
    }

    /// Whether telemetry streaming is on.
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// Currently active modulation pattern, if any.
    pub fn active_pattern(&self) -> Option<Pattern> {
        self.modulator.active()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the sensor up and apply the persisted settings.
    ///
    /// Each stored byte is decoded against its typed register value; a byte
    /// that does not decode falls back to the instrument default.  Whatever
    /// was actually applied is written back to the store, then the sensor is
    /// put in normal (cycling) mode.
    pub fn init(&mut self, store: &mut impl ByteStore) -> Result<()> {
        self.sensor.start()?;

        let defaults = SensorSettings::default();
        let osr_h = load_field(
            store,
            SettingKey::HumidityOsr,
            Oversampling::from_raw,
            defaults.osr_h,
        );
        let osr_t = load_field(
            store,
            SettingKey::TemperatureOsr,
            Oversampling::from_raw,
            defaults.osr_t,
        );
        let osr_p = load_field(
            store,
            SettingKey::PressureOsr,
            Oversampling::from_raw,
            defaults.osr_p,
        );
        let standby = load_field(
            store,
            SettingKey::Standby,
            StandbyTime::from_raw,
            defaults.standby,
        );
        let filter = load_field(store, SettingKey::Filter, Filter::from_raw, defaults.filter);

        self.sensor.set_humidity_oversampling(osr_h)?;
        self.sensor.set_temperature_oversampling(osr_t)?;
        self.sensor.set_pressure_oversampling(osr_p)?;
        self.sensor.set_standby_time(standby)?;
        self.sensor.set_filter(filter)?;
        self.persist_settings(store);

        self.sensor.set_mode(Mode::Normal)?;
        info!("sensor running: {:?}", self.sensor.settings());
        Ok(())
    }

    // ── Acquisition (10 ms cadence) ───────────────────────────

    /// One acquisition tick: sweep the gas channels and poll the
    /// environmental sensor.  A failed read skips this tick; the signal for
    /// that half simply stays low and no frame is raised.
    pub fn on_acquisition_tick(&mut self, sampler: &mut impl GasSamplerPort) {
        match sampler.acquire() {
            Ok(readings) => {
                self.gas = readings;
                self.signals.gas_ready.raise();
            }
            Err(err) => debug!("gas sweep skipped: {err}"),
        }

        match self.sensor.read_sample() {
            Ok(Some(_)) => self.signals.env_ready.raise(),
            Ok(None) => {} // conversion still running
            Err(err) => debug!("environmental read skipped: {err}"),
        }

        if self.signals.gas_ready.is_raised() && self.signals.env_ready.is_raised() {
            self.signals.frame_ready.raise();
        }
    }

    // ── Main loop ─────────────────────────────────────────────

    /// One main-loop pass: drain received bytes, handle the protocol
    /// watchdog, advance the active pattern, and emit telemetry.
    pub fn poll(
        &mut self,
        heater: &mut impl HeaterPort,
        lines: &mut impl HydraulicsPort,
        serial: &mut impl SerialPort,
        store: &mut impl ByteStore,
    ) {
        let mut update = None;
        while let Some(byte) = serial.read_byte() {
            // Any received byte pushes the watchdog deadline out and
            // retracts a not-yet-consumed timeout.
            self.watchdog.feed();
            self.signals.protocol_timeout.lower();

            // Commands decode on every byte, even mid-packet: no valid
            // packet field value collides with a command byte, and 't'
            // doubles as the packet header.
            if let Some(cmd) = Command::from_byte(byte) {
                self.handle_command(cmd, heater, lines, serial);
            }
            if let Some(decoded) = self.decoder.feed(byte) {
                update = Some(decoded);
            }
        }

        if self.signals.protocol_timeout.take() && self.decoder.in_flight() {
            debug!("settings packet abandoned mid-flight, discarding");
            self.decoder.abort();
        }

        if let Some(update) = update {
            self.commit_settings(update, serial, store);
        }

        // Pacing edges are consumed every pass so none goes stale, but a
        // pattern only advances while telemetry streams; selected earlier,
        // it holds its idle drive until `a` arrives.
        let cycle_start = self.signals.cycle_start.take();
        let fast = self.signals.advance_fast.take();
        let slow = self.signals.advance_slow.take();
        if self.streaming {
            if fast {
                self.modulator.advance_fast(heater);
            }
            if slow {
                self.modulator.advance_slow(heater, cycle_start);
            }
        }

        if self.streaming && self.signals.frame_ready.take() {
            let frame = self.bundler.bundle(self.gas, self.sensor.last_sample());
            serial.write(&frame.encode());
            self.signals.gas_ready.lower();
            self.signals.env_ready.lower();
        }
    }

    // ── Command dispatch ──────────────────────────────────────

    fn handle_command(
        &mut self,
        cmd: Command,
        heater: &mut impl HeaterPort,
        lines: &mut impl HydraulicsPort,
        serial: &mut impl SerialPort,
    ) {
        match cmd {
            Command::Identify => serial.write(IDENTIFY_REPLY),

            Command::SelectPattern(pattern) => {
                if self.modulator.select(pattern, heater) {
                    self.restart_pacing();
                }
            }

            Command::StartStream => {
                // Ignored while already streaming; the byte would otherwise
                // restart the pacing mid-stream.
                if !self.streaming {
                    self.streaming = true;
                    self.modulator.deselect();
                    self.restart_pacing();
                    info!("telemetry streaming started");
                }
            }

            Command::StopStream => {
                self.streaming = false;
                self.idle_drive(heater);
                self.restart_pacing();
                info!("telemetry streaming stopped");
            }

            Command::HeaterFullOn => {
                // Same drive action as stop, but streaming is untouched.
                self.idle_drive(heater);
                self.restart_pacing();
            }

            Command::HeaterOff => {
                self.modulator.deselect();
                heater.set_output(false);
                self.restart_pacing();
            }

            Command::ReportSettings => {
                if !self.streaming {
                    let report = settings_report(self.sensor.settings());
                    serial.write(&report.encode());
                }
            }

            Command::SelectInlet => {
                lines.enable_line(GasLine::Inlet);
                lines.disable_line(GasLine::Outlet);
            }
            Command::SelectOutlet => {
                lines.enable_line(GasLine::Outlet);
                lines.disable_line(GasLine::Inlet);
            }
            Command::OpenBothLines => {
                lines.enable_line(GasLine::Inlet);
                lines.enable_line(GasLine::Outlet);
            }
            Command::CloseBothLines => {
                lines.disable_line(GasLine::Inlet);
                lines.disable_line(GasLine::Outlet);
            }
        }
    }

    /// Heaters to full steady drive: output on, compare 0.
    fn idle_drive(&mut self, heater: &mut impl HeaterPort) {
        self.modulator.deselect();
        heater.set_output(true);
        heater.write_compare_all(0);
    }

    /// Restart the pace counter and drop any pending pacing edge, so a
    /// stale tick cannot advance a freshly selected pattern.
    fn restart_pacing(&mut self) {
        self.pace.reset();
        self.signals.clear_pacing();
    }

    // ── Settings commit ───────────────────────────────────────

    /// Apply a decoded settings packet.  Invalid fields fall back to the
    /// instrument defaults.  The five fields commit independently: a field
    /// whose register write fails keeps its previous value while the rest
    /// still apply, and only fields that stick are persisted.  Whatever the
    /// registers now hold goes out as the report, failures included.
    ///
    /// Dropped entirely while streaming.
    fn commit_settings(
        &mut self,
        update: SettingsUpdate,
        serial: &mut impl SerialPort,
        store: &mut impl ByteStore,
    ) {
        if self.streaming {
            info!("settings update ignored while streaming");
            return;
        }

        let defaults = SensorSettings::default();

        match self
            .sensor
            .set_humidity_oversampling(update.osr_h.unwrap_or(defaults.osr_h))
        {
            Ok(()) => store_byte(store, SettingKey::HumidityOsr, self.sensor.settings().osr_h.raw()),
            Err(err) => warn!("humidity oversampling not applied: {err}"),
        }
        match self
            .sensor
            .set_temperature_oversampling(update.osr_t.unwrap_or(defaults.osr_t))
        {
            Ok(()) => store_byte(
                store,
                SettingKey::TemperatureOsr,
                self.sensor.settings().osr_t.raw(),
            ),
            Err(err) => warn!("temperature oversampling not applied: {err}"),
        }
        match self
            .sensor
            .set_pressure_oversampling(update.osr_p.unwrap_or(defaults.osr_p))
        {
            Ok(()) => store_byte(store, SettingKey::PressureOsr, self.sensor.settings().osr_p.raw()),
            Err(err) => warn!("pressure oversampling not applied: {err}"),
        }
        match self
            .sensor
            .set_standby_time(update.standby.unwrap_or(defaults.standby))
        {
            Ok(()) => store_byte(store, SettingKey::Standby, self.sensor.settings().standby.raw()),
            Err(err) => warn!("standby time not applied: {err}"),
        }
        match self.sensor.set_filter(update.filter.unwrap_or(defaults.filter)) {
            Ok(()) => store_byte(store, SettingKey::Filter, self.sensor.settings().filter.raw()),
            Err(err) => warn!("filter coefficient not applied: {err}"),
        }

        let report = settings_report(self.sensor.settings());
        serial.write(&report.encode());
        info!("settings committed: {:?}", self.sensor.settings());
    }

    /// Mirror the held register settings into the byte store.
    fn persist_settings(&mut self, store: &mut impl ByteStore) {
        let settings = self.sensor.settings();
        let slots = [
            (SettingKey::HumidityOsr, settings.osr_h.raw()),
            (SettingKey::TemperatureOsr, settings.osr_t.raw()),
            (SettingKey::PressureOsr, settings.osr_p.raw()),
            (SettingKey::Standby, settings.standby.raw()),
            (SettingKey::Filter, settings.filter.raw()),
        ];
        for (key, raw) in slots {
            store_byte(store, key, raw);
        }
    }
}

/// Persist one setting byte; a write failure is logged and tolerated.
fn store_byte(store: &mut impl ByteStore, key: SettingKey, raw: u8) {
    if let Err(err) = store.write_byte(key, raw) {
        warn!("could not persist {key:?}: {err}");
    }
}

/// Read one stored setting byte, falling back to `default` when the slot is
/// unreadable or holds a value the register does not accept.
fn load_field<T: Copy>(
    store: &mut impl ByteStore,
    key: SettingKey,
    decode: fn(u8) -> Option<T>,
    default: T,
) -> T {
    match store.read_byte(key).ok().and_then(decode) {
        Some(value) => value,
        None => {
            warn!("stored {key:?} invalid, using default");
            default
        }
    }
}

fn settings_report(settings: SensorSettings) -> SettingsReport {
    SettingsReport {
        osr_h: settings.osr_h.raw(),
        osr_t: settings.osr_t.raw(),
        osr_p: settings.osr_p.raw(),
        standby: settings.standby.raw(),
        filter: settings.filter.raw(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
