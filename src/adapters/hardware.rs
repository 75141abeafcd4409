//! Hardware adapter — heaters, hydraulics, and the gas-sensor front-end.
//!
//! This is the only module in the system that touches the analog board:
//! LEDC PWM for the four heater groups, GPIO for the pump/valve pairs and
//! the mux address lines, and ADC1 for the muxed gas-sensor voltage.
//! Peripheral setup uses raw ESP-IDF sys calls, called once from `main()`
//! before the loop starts.  On non-espidf targets everything is tracked
//! in-memory only.

use log::info;

use crate::app::ports::{GasLine, GasReadings, GasSamplerPort, HeaterPort, HydraulicsPort};
use crate::error::AcquisitionError;
#[cfg(target_os = "espidf")]
use crate::modulation::PWM_PERIOD;
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

// ── One-shot peripheral init ──────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hardware: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    info!("hardware(sim): peripheral init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: `ADC1_HANDLE` is written once in `init_adc()` before the
/// sampler runs; all later access is from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret =
        unsafe { adc_oneshot_config_channel(adc1_handle(), pins::GAS_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hardware: ADC1 configured (CH{}=gas mux)", pins::GAS_ADC_CHANNEL);
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let control_pins = [
        pins::MUX_EN_GPIO,
        pins::PUMP_IN_GPIO,
        pins::VALVE_IN_GPIO,
        pins::PUMP_OUT_GPIO,
        pins::VALVE_OUT_GPIO,
    ];

    for &pin in pins::MUX_ADDR_GPIOS.iter().chain(&control_pins) {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hardware: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // One timer, four channels, all on the shared heater frequency.
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: pins::PWM_RESOLUTION_BITS,
        freq_hz: pins::HEATER_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    for (i, &gpio) in pins::HEATER_PWM_GPIOS.iter().enumerate() {
        let ret = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel: i as u32,
                timer_sel: ledc_timer_t_LEDC_TIMER_0,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    info!("hardware: LEDC configured (heaters=CH0-3)");
    Ok(())
}

#[cfg(target_os = "espidf")]
fn gpio_write(pin: i32, high: bool) {
    // SAFETY: writes to an already-configured output pin; main loop only.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
fn gpio_write(_pin: i32, _high: bool) {}

// ── HeaterPort ────────────────────────────────────────────────

/// Four LEDC channels with one shared compare value.
///
/// Compare 0 is full drive; the LEDC duty is the inverse, scaled to the
/// timer resolution.  Killing the output parks every channel low without
/// losing the shadowed compare.
pub struct HeaterAdapter {
    compare: u8,
    output: bool,
}

impl HeaterAdapter {
    pub fn new() -> Self {
        Self {
            compare: 0,
            output: false,
        }
    }

    fn apply(&self) {
        #[cfg(target_os = "espidf")]
        {
            let max_duty = (1u32 << pins::PWM_RESOLUTION_BITS) - 1;
            let duty =
                u32::from(PWM_PERIOD - self.compare.min(PWM_PERIOD)) * max_duty / u32::from(PWM_PERIOD);
            for ch in 0..pins::HEATER_PWM_GPIOS.len() as u32 {
                // SAFETY: channels configured in init_ledc(); main loop only.
                unsafe {
                    if self.output {
                        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch, duty);
                        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch);
                    } else {
                        ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, ch, 0);
                    }
                }
            }
        }
    }
}

impl HeaterPort for HeaterAdapter {
    fn compare(&self) -> u8 {
        self.compare
    }

    fn write_compare_all(&mut self, cmp: u8) {
        self.compare = cmp;
        self.apply();
    }

    fn set_output(&mut self, enabled: bool) {
        self.output = enabled;
        self.apply();
    }

    fn output_enabled(&self) -> bool {
        self.output
    }
}

// ── HydraulicsPort ────────────────────────────────────────────

/// Pump + valve pairs on the inlet and outlet gas lines.
///
/// Opening a line runs the pump first and opens the valve only after the
/// settle time, so the valve never sees a dead-headed line.  Closing is
/// immediate.
pub struct HydraulicsAdapter {
    settle_ms: u32,
}

impl HydraulicsAdapter {
    pub fn new(settle_ms: u32) -> Self {
        Self { settle_ms }
    }

    fn line_pins(line: GasLine) -> (i32, i32) {
        match line {
            GasLine::Inlet => (pins::PUMP_IN_GPIO, pins::VALVE_IN_GPIO),
            GasLine::Outlet => (pins::PUMP_OUT_GPIO, pins::VALVE_OUT_GPIO),
        }
    }

    fn settle(&self) {
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(self.settle_ms);
        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(u64::from(self.settle_ms)));
    }
}

impl HydraulicsPort for HydraulicsAdapter {
    fn enable_line(&mut self, line: GasLine) {
        let (pump, valve) = Self::line_pins(line);
        gpio_write(pump, true);
        self.settle();
        gpio_write(valve, true);
        info!("hydraulics: {line:?} open");
    }

    fn disable_line(&mut self, line: GasLine) {
        let (pump, valve) = Self::line_pins(line);
        gpio_write(pump, false);
        gpio_write(valve, false);
        info!("hydraulics: {line:?} closed");
    }
}

// ── GasSamplerPort ────────────────────────────────────────────

/// Telemetry channel index per sensor.
const S4_1: usize = 0;
const S4_2: usize = 1;
const S4_3: usize = 2;
const S4_4: usize = 3;
const S6_1: usize = 4;
const S6_2: usize = 5;
const AS_1: usize = 6;
const AS_2: usize = 7;

/// Mux walk: address lines (A0, A1, A2), then the sensor pair read with
/// the bank-select low and high.
const MUX_PLAN: [([bool; 3], usize, usize); 4] = [
    ([false, false, false], S4_1, S4_3),
    ([false, true, false], AS_1, S6_2),
    ([false, false, true], S6_1, S4_4),
    ([false, true, true], S4_2, AS_2),
];

/// Raw ADC ceiling for a gas reading.
const GAS_RAW_MAX: i32 = 65_535;

/// Walks the analog mux over all eight sensors through one ADC input.
pub struct GasSamplerAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim_step: i32,
}

impl GasSamplerAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim_step: 0,
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_raw(&mut self) -> Result<i32, AcquisitionError> {
        let mut raw: i32 = 0;
        // SAFETY: adc1_handle() contract — single-threaded main-task access.
        let ret = unsafe { adc_oneshot_read(adc1_handle(), pins::GAS_ADC_CHANNEL, &mut raw) };
        if ret != ESP_OK as i32 {
            return Err(AcquisitionError::AdcReadFailed);
        }
        Ok(raw)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_raw(&mut self) -> Result<i32, AcquisitionError> {
        // Slow deterministic ramp so a host run shows moving channels.
        self.sim_step = (self.sim_step + 7) % 4096;
        Ok(self.sim_step)
    }
}

impl GasSamplerPort for GasSamplerAdapter {
    fn acquire(&mut self) -> Result<GasReadings, AcquisitionError> {
        let mut readings = GasReadings::default();
        for (addr, low_idx, high_idx) in MUX_PLAN {
            for (pin, high) in pins::MUX_ADDR_GPIOS.iter().zip(addr) {
                gpio_write(*pin, high);
            }
            gpio_write(pins::MUX_EN_GPIO, false);
            readings[low_idx] = self.read_raw()?.clamp(0, GAS_RAW_MAX);
            gpio_write(pins::MUX_EN_GPIO, true);
            readings[high_idx] = self.read_raw()?.clamp(0, GAS_RAW_MAX);
        }
        Ok(readings)
    }
}
