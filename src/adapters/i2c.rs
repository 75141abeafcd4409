//! I2C adapter for the environmental sensor.
//!
//! On ESP-IDF the [`RegisterBus`] rides on `esp_idf_hal`'s I2C master with
//! the device address bound at construction.  The host backend is a full
//! register-file simulation of the device — chip id, calibration blocks,
//! soft reset, and a steady measurement — so driver behavior is testable
//! end to end without a board.

use crate::app::ports::RegisterBus;
use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use esp_idf_hal::i2c::I2cDriver;

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct I2cRegisterBus<'d> {
    driver: I2cDriver<'d>,
    addr: u8,
}

#[cfg(target_os = "espidf")]
impl<'d> I2cRegisterBus<'d> {
    pub fn new(driver: I2cDriver<'d>, addr: u8) -> Self {
        Self { driver, addr }
    }
}

#[cfg(target_os = "espidf")]
impl RegisterBus for I2cRegisterBus<'_> {
    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.driver
            .write_read(self.addr, &[reg], &mut buf, esp_idf_hal::delay::BLOCK)
            .map_err(|_| SensorError::Comm)?;
        Ok(buf[0])
    }

    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.driver
            .write_read(self.addr, &[reg], buf, esp_idf_hal::delay::BLOCK)
            .map_err(|_| SensorError::Comm)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.driver
            .write(self.addr, &[reg, value], esp_idf_hal::delay::BLOCK)
            .map_err(|_| SensorError::Comm)
    }
}

// ── Host simulation backend ───────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::SimSensorBus;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::{RegisterBus, SensorError};
    use crate::bme280::registers::{CHIP_ID, Reg, RESET_CMD};

    /// Register-file simulation of the environmental sensor.
    ///
    /// Calibration and raw data are the reference values from the vendor's
    /// compensation walkthrough, so a host run produces believable ambient
    /// numbers (about 25 °C / 1007 hPa).
    pub struct SimSensorBus {
        regs: [u8; 256],
    }

    impl SimSensorBus {
        pub fn new() -> Self {
            let mut bus = Self { regs: [0u8; 256] };
            bus.power_on_state();
            bus
        }

        fn power_on_state(&mut self) {
            self.regs = [0u8; 256];
            self.regs[Reg::ChipId as usize] = CHIP_ID;
            self.seed_calibration();
            self.seed_measurement();
        }

        fn seed_calibration(&mut self) {
            let a = Reg::CalibA as usize;
            self.put_u16(a, 27_504); // T1
            self.put_i16(a + 2, 26_435); // T2
            self.put_i16(a + 4, -1_000); // T3
            self.put_u16(a + 6, 36_477); // P1
            self.put_i16(a + 8, -10_685); // P2
            self.put_i16(a + 10, 3_024); // P3
            self.put_i16(a + 12, 2_855); // P4
            self.put_i16(a + 14, 140); // P5
            self.put_i16(a + 16, -7); // P6
            self.put_i16(a + 18, 15_500); // P7
            self.put_i16(a + 20, -14_600); // P8
            self.put_i16(a + 22, 6_000); // P9
            self.regs[a + 25] = 75; // H1

            let b = Reg::CalibB as usize;
            self.put_i16(b, 355); // H2
            self.regs[b + 2] = 0; // H3
            // H4 = 333, H5 = 0, packed in shared nibbles.
            self.regs[b + 3] = (333 >> 4) as u8;
            self.regs[b + 4] = (333 & 0x0F) as u8;
            self.regs[b + 5] = 0;
            self.regs[b + 6] = 30; // H6
        }

        fn seed_measurement(&mut self) {
            // 20-bit raws: pressure 415148, temperature 519888; 16-bit
            // humidity 33434.
            let d = Reg::PressMsb as usize;
            self.regs[d] = 0x65;
            self.regs[d + 1] = 0x5A;
            self.regs[d + 2] = 0xC0;
            self.regs[d + 3] = 0x7E;
            self.regs[d + 4] = 0xED;
            self.regs[d + 5] = 0x00;
            self.regs[d + 6] = 0x82;
            self.regs[d + 7] = 0x9A;
        }

        fn put_u16(&mut self, at: usize, value: u16) {
            let [lo, hi] = value.to_le_bytes();
            self.regs[at] = lo;
            self.regs[at + 1] = hi;
        }

        fn put_i16(&mut self, at: usize, value: i16) {
            self.put_u16(at, value as u16);
        }
    }

    impl RegisterBus for SimSensorBus {
        fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
            Ok(self.regs[reg as usize])
        }

        fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
            let at = reg as usize;
            buf.copy_from_slice(&self.regs[at..at + buf.len()]);
            Ok(())
        }

        fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
            if reg == Reg::Reset as u8 {
                if value == RESET_CMD {
                    // NVM copy is instantaneous here; status stays clear.
                    self.power_on_state();
                }
                return Ok(());
            }
            self.regs[reg as usize] = value;
            Ok(())
        }
    }
}
