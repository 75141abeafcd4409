//! Electronic-Nose Firmware — Main Entry Point
//!
//! Hexagonal architecture with signal-paced execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HeaterAdapter    HydraulicsAdapter   GasSamplerAdapter        │
//! │  (LEDC PWM)       (pump/valve GPIO)   (ADC1 + analog mux)      │
//! │  I2cRegisterBus   UartLink            NvsByteStore             │
//! │  (env sensor)     (host link)         (settings + config)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐   │
//! │  │           InstrumentService (pure logic)               │   │
//! │  │  protocol · modulation · telemetry                     │   │
//! │  └────────────────────────────────────────────────────────┘   │
//! │                                                                │
//! │  timers (esp_timer) ──▶ Signals ──▶ main loop                  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod pins;
mod scheduler;
mod signals;

pub mod app;
pub mod bme280;
mod adapters;
mod modulation;
mod protocol;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::info;

use adapters::eeprom::NvsByteStore;
use adapters::hardware::{GasSamplerAdapter, HeaterAdapter, HydraulicsAdapter};
use adapters::timers::{PACE, SIGNALS, WATCHDOG};
use app::service::InstrumentService;
use bme280::Bme280;
use config::SystemConfig;

#[cfg(target_os = "espidf")]
use bme280::registers::I2C_ADDR;

// ── Host-side delay ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
struct HostDelay;

#[cfg(not(target_os = "espidf"))]
impl embedded_hal::delay::DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }

    info!("eNose v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Storage + config ───────────────────────────────────
    let mut store = match NvsByteStore::new() {
        Ok(store) => store,
        Err(err) => {
            // Without NVS there are no persisted settings and no config —
            // the instrument cannot honor its own commit semantics.
            anyhow::bail!("storage init failed: {err}");
        }
    };
    let cfg = SystemConfig::load(&mut store);
    info!("config: {cfg:?}");

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(err) = adapters::hardware::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("peripheral init failed: {err} — halting");
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let mut heater = HeaterAdapter::new();
    let mut lines = HydraulicsAdapter::new(cfg.line_settle_ms);
    let mut sampler = GasSamplerAdapter::new();

    // Pin routing mirrors `pins.rs`.
    #[cfg(target_os = "espidf")]
    let (bus, mut serial) = {
        use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
        use esp_idf_hal::peripherals::Peripherals;
        use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
        use esp_idf_hal::units::Hertz;

        let p = Peripherals::take()?;
        let i2c = I2cDriver::new(
            p.i2c0,
            p.pins.gpio14,
            p.pins.gpio15,
            &I2cConfig::new().baudrate(Hertz(400_000)),
        )?;
        let uart = UartDriver::new(
            p.uart1,
            p.pins.gpio17,
            p.pins.gpio18,
            Option::<esp_idf_hal::gpio::AnyIOPin>::None,
            Option::<esp_idf_hal::gpio::AnyIOPin>::None,
            &UartConfig::new().baudrate(Hertz(cfg.uart_baud)),
        )?;
        (
            adapters::i2c::I2cRegisterBus::new(i2c, I2C_ADDR),
            adapters::serial::UartLink::new(uart),
        )
    };
    #[cfg(not(target_os = "espidf"))]
    let (bus, mut serial) = (
        adapters::i2c::SimSensorBus::new(),
        adapters::serial::SimLink::new(),
    );

    #[cfg(target_os = "espidf")]
    let delay = esp_idf_hal::delay::Delay::new_default();
    #[cfg(not(target_os = "espidf"))]
    let delay = HostDelay;

    // ── 4. Service ────────────────────────────────────────────
    let sensor = Bme280::new(bus, delay);
    let mut service = InstrumentService::new(sensor, &SIGNALS, &PACE, &WATCHDOG);
    service.init(&mut store)?;

    // ── 5. Tick timers ────────────────────────────────────────
    adapters::timers::start_timers(
        cfg.pace_tick_ms,
        cfg.acquisition_tick_ms,
        cfg.watchdog_tick_ms,
    );

    info!("system ready, entering main loop");

    // ── 6. Main loop ──────────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    let mut sim_tick: u32 = 0;

    loop {
        // Simulate the tick timers via sleep on non-espidf targets.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                cfg.acquisition_tick_ms,
            )));
            sim_tick = sim_tick.wrapping_add(1);
            SIGNALS.acquire.raise();
            if sim_tick % (cfg.pace_tick_ms / cfg.acquisition_tick_ms) == 0 {
                PACE.tick(&SIGNALS);
            }
            if sim_tick % (cfg.watchdog_tick_ms / cfg.acquisition_tick_ms) == 0 {
                WATCHDOG.tick(&SIGNALS);
            }
        }
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(1);

        if SIGNALS.acquire.take() {
            service.on_acquisition_tick(&mut sampler);
        }
        service.poll(&mut heater, &mut lines, &mut serial, &mut store);
    }
}
