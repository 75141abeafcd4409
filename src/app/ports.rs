//! Hardware port traits.
//!
//! Everything the service touches goes through one of these seams, so the
//! whole instrument runs against recording mocks on the host.  The esp-idf
//! adapters implement them for the real board.

use crate::error::{AcquisitionError, StorageError};

pub use crate::bme280::RegisterBus;

/// Number of gas sensor channels in the array.
pub const GAS_CHANNELS: usize = 8;

/// One sweep of the gas sensor array, in telemetry channel order.
pub type GasReadings = [i32; GAS_CHANNELS];

/// Multiplexed gas-sensor ADC front-end.
pub trait GasSamplerPort {
    /// Read all channels.  The adapter owns the mux wiring; readings come
    /// back in channel order.
    fn acquire(&mut self) -> Result<GasReadings, AcquisitionError>;
}

/// The four PWM heater groups, driven with one shared compare value.
pub trait HeaterPort {
    /// Read back the shared compare (all groups are written together).
    fn compare(&self) -> u8;
    /// Write the compare value to every heater group.
    fn write_compare_all(&mut self, cmp: u8);
    /// Enable or kill the PWM output stage.
    fn set_output(&mut self, enabled: bool);
    fn output_enabled(&self) -> bool;
}

/// Gas path selector: inlet and outlet, each a pump plus a valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasLine {
    Inlet,
    Outlet,
}

pub trait HydraulicsPort {
    /// Pump on, settle, then open the valve.
    fn enable_line(&mut self, line: GasLine);
    /// Pump off and valve closed, immediately.
    fn disable_line(&mut self, line: GasLine);
}

/// Byte-oriented serial link to the host.
pub trait SerialPort {
    /// Next received byte, if any.  Non-blocking.
    fn read_byte(&mut self) -> Option<u8>;
    /// Queue bytes for transmission.
    fn write(&mut self, bytes: &[u8]);
}

/// Persisted sensor-setting slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SettingKey {
    HumidityOsr = 0x0000,
    TemperatureOsr = 0x0001,
    PressureOsr = 0x0002,
    Standby = 0x0003,
    Filter = 0x0004,
}

impl SettingKey {
    pub const ALL: [Self; 5] = [
        Self::HumidityOsr,
        Self::TemperatureOsr,
        Self::PressureOsr,
        Self::Standby,
        Self::Filter,
    ];

    pub const fn addr(self) -> u16 {
        self as u16
    }
}

/// Non-volatile byte store for the sensor settings and the config blob.
pub trait ByteStore {
    fn read_byte(&mut self, key: SettingKey) -> Result<u8, StorageError>;
    fn write_byte(&mut self, key: SettingKey, value: u8) -> Result<(), StorageError>;

    /// Read a named blob into `buf`, returning the stored length.
    fn read_blob(&mut self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;
    fn write_blob(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError>;
}
