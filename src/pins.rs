//! GPIO / peripheral pin assignments for the instrument main board.
//!
//! Single source of truth — every adapter references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Heater drive (four sensor groups, one shared duty)
// ---------------------------------------------------------------------------

/// LEDC PWM outputs, one per heater group (S4 a/b, S6, AS).
pub const HEATER_PWM_GPIOS: [i32; 4] = [1, 2, 3, 4];

// ---------------------------------------------------------------------------
// Gas sensor front-end (analog mux into one ADC input)
// ---------------------------------------------------------------------------

/// Mux address lines A0 / A1 / A2.
pub const MUX_ADDR_GPIOS: [i32; 3] = [5, 6, 7];
/// Mux bank select: LOW = first sensor of the pair, HIGH = second.
pub const MUX_EN_GPIO: i32 = 8;

/// Muxed gas-sensor voltage — ADC1 channel 8 (GPIO 9 on ESP32-S3).
pub const GAS_ADC_CHANNEL: u32 = 8;

// ---------------------------------------------------------------------------
// Gas path hydraulics (pump + valve per line)
// ---------------------------------------------------------------------------

pub const PUMP_IN_GPIO: i32 = 10;
pub const VALVE_IN_GPIO: i32 = 11;
pub const PUMP_OUT_GPIO: i32 = 12;
pub const VALVE_OUT_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// I²C bus (environmental sensor)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// UART host link
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 17;
pub const UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  7-bit gives the 0–99 compare range room.
pub const PWM_RESOLUTION_BITS: u32 = 7;
/// LEDC base frequency for the heater groups (25 kHz — inaudible).
pub const HEATER_PWM_FREQ_HZ: u32 = 25_000;
