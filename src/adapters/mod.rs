//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements      | Connects to                    |
//! |------------|-----------------|--------------------------------|
//! | `hardware` | HeaterPort      | ESP32 LEDC PWM                 |
//! |            | HydraulicsPort  | ESP32 GPIO (pumps + valves)    |
//! |            | GasSamplerPort  | ESP32 ADC1 via analog mux      |
//! | `i2c`      | RegisterBus     | ESP32 I2C0 / sim register file |
//! | `serial`   | SerialPort      | ESP32 UART1 / in-memory rings  |
//! | `eeprom`   | ByteStore       | NVS flash / in-memory store    |
//! | `timers`   | —               | esp_timer periodic callbacks   |
//!
//! Every adapter is dual-target: on `target_os = "espidf"` it drives the
//! real peripheral; on the host it keeps state in memory so the whole
//! instrument runs in tests.

pub mod eeprom;
pub mod hardware;
pub mod i2c;
pub mod serial;
pub mod timers;
