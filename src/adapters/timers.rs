//! Periodic tick timers using ESP-IDF's esp_timer API.
//!
//! Three timers drive the instrument: the 200 ms modulation pace, the
//! 10 ms acquisition tick, and the 250 ms protocol watchdog.  Callbacks
//! execute in the ESP timer task context (not ISR), and only touch the
//! atomic cells in [`SIGNALS`] / [`PACE`] / [`WATCHDOG`], which the main
//! loop shares by reference.
//!
//! On simulation targets the timers are not started; the host main loop
//! drives the same statics from a sleep loop.

use crate::scheduler::{PaceClock, ProtocolWatchdog};
use crate::signals::Signals;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Cross-context signal cells shared by timer callbacks and the main loop.
pub static SIGNALS: Signals = Signals::new();
/// Modulation pace counter, ticked every 200 ms.
pub static PACE: PaceClock = PaceClock::new();
/// Serial-peer watchdog, ticked every 250 ms.
pub static WATCHDOG: ProtocolWatchdog = ProtocolWatchdog::new();

#[cfg(target_os = "espidf")]
static mut PACE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut ACQ_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut WDT_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pace_tick_cb(_arg: *mut core::ffi::c_void) {
    PACE.tick(&SIGNALS);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn acquisition_tick_cb(_arg: *mut core::ffi::c_void) {
    SIGNALS.acquire.raise();
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn watchdog_tick_cb(_arg: *mut core::ffi::c_void) {
    WATCHDOG.tick(&SIGNALS);
}

/// Start the periodic tick timers with periods from the config
/// (milliseconds).
#[cfg(target_os = "espidf")]
pub fn start_timers(pace_ms: u32, acquisition_ms: u32, watchdog_ms: u32) {
    // SAFETY: the timer handles are written here once at boot from the
    // single main-task context before any callback fires.  The callbacks
    // only touch the atomic statics above.
    unsafe {
        let plan: [(
            unsafe extern "C" fn(*mut core::ffi::c_void),
            *mut esp_timer_handle_t,
            u32,
            &[u8],
        ); 3] = [
            (pace_tick_cb, &raw mut PACE_TIMER, pace_ms, b"pace\0"),
            (
                acquisition_tick_cb,
                &raw mut ACQ_TIMER,
                acquisition_ms,
                b"acq\0",
            ),
            (watchdog_tick_cb, &raw mut WDT_TIMER, watchdog_ms, b"wdt\0"),
        ];

        for (callback, handle, period_ms, name) in plan {
            let args = esp_timer_create_args_t {
                callback: Some(callback),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: name.as_ptr() as *const _,
                skip_unhandled_events: false,
            };
            let ret = esp_timer_create(&args, handle);
            if ret != ESP_OK {
                log::error!("timers: create failed (rc={}) — ticks unavailable", ret);
                return;
            }
            let ret = esp_timer_start_periodic(*handle, u64::from(period_ms) * 1_000);
            if ret != ESP_OK {
                log::error!("timers: start failed (rc={})", ret);
                return;
            }
        }

        info!(
            "timers: pace@{}ms acq@{}ms wdt@{}ms started",
            pace_ms, acquisition_ms, watchdog_ms
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_pace_ms: u32, _acquisition_ms: u32, _watchdog_ms: u32) {
    log::info!("timers(sim): not started (ticks driven by sleep loop)");
}

/// Stop all tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; the null
    // check prevents stopping a timer that was never created.
    unsafe {
        for handle in [PACE_TIMER, ACQ_TIMER, WDT_TIMER] {
            if !handle.is_null() {
                esp_timer_stop(handle);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
