//! Bit-exact integer compensation.
//!
//! Fixed-point output scales:
//! - temperature: hundredths of °C, clamped to \[-4000, 8500\]
//! - pressure: Pa, clamped to \[30000, 110000\]
//! - humidity: %RH in Q22.10 (1024 = 1 %RH), clamped to \[0, 102400\]
//!
//! The pressure and humidity formulas depend on the fine-resolution
//! temperature word, so [`temperature`] hands out a [`TFine`] token that
//! the other two require.  Compensating out of order does not compile.

use super::calib::Calibration;

/// Fine-resolution temperature carrier produced by [`temperature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TFine(pub(crate) i32);

pub const TEMPERATURE_MIN: i32 = -4000;
pub const TEMPERATURE_MAX: i32 = 8500;
pub const PRESSURE_MIN: u32 = 30000;
pub const PRESSURE_MAX: u32 = 110_000;
pub const HUMIDITY_MAX: u32 = 102_400;

/// Compensate a raw 20-bit temperature reading.
pub fn temperature(raw: i32, calib: &Calibration) -> (i32, TFine) {
    let mut var1 = (raw / 8) - (i32::from(calib.t1) * 2);
    var1 = (var1 * i32::from(calib.t2)) / 2048;
    let mut var2 = (raw / 16) - i32::from(calib.t1);
    var2 = (((var2 * var2) / 4096) * i32::from(calib.t3)) / 16384;

    let t_fine = var1 + var2;
    let temp = (t_fine * 5 + 128) / 256;
    (
        temp.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX),
        TFine(t_fine),
    )
}

/// Compensate a raw 20-bit pressure reading.
pub fn pressure(raw: u32, calib: &Calibration, t_fine: TFine) -> u32 {
    let var1 = (t_fine.0 / 2) - 64000;
    let mut var2 = ((var1 / 4) * (var1 / 4) / 2048) * i32::from(calib.p6);
    var2 += (var1 * i32::from(calib.p5)) * 2;
    var2 = (var2 / 4) + (i32::from(calib.p4) * 65536);
    let var3 = (i32::from(calib.p3) * ((var1 / 4) * (var1 / 4) / 8192)) / 8;
    let var4 = (i32::from(calib.p2) * var1) / 2;
    let var1 = (var3 + var4) / 262_144;
    let var1 = ((32768 + var1) * i32::from(calib.p1)) / 32768;

    // A zero divisor would mean a blank calibration page; report the
    // low clamp rather than dividing.
    if var1 == 0 {
        return PRESSURE_MIN;
    }

    // The reference algorithm does this section in unsigned arithmetic
    // with wrap-on-overflow semantics.
    let var5 = 1_048_576u32.wrapping_sub(raw);
    let mut p = var5.wrapping_sub((var2 / 4096) as u32).wrapping_mul(3125);
    if p < 0x8000_0000 {
        p = (p << 1) / (var1 as u32);
    } else {
        p = (p / var1 as u32) * 2;
    }

    let var1 =
        (i32::from(calib.p9) * ((((p / 8) * (p / 8)) / 8192) as i32)) / 4096;
    let var2 = ((p / 4) as i32 * i32::from(calib.p8)) / 8192;
    let p = (p as i32 + (var1 + var2 + i32::from(calib.p7)) / 16) as u32;

    p.clamp(PRESSURE_MIN, PRESSURE_MAX)
}

/// Compensate a raw 16-bit humidity reading.
pub fn humidity(raw: i32, calib: &Calibration, t_fine: TFine) -> u32 {
    let var1 = t_fine.0 - 76800;
    let var2 = raw * 16384;
    let var3 = i32::from(calib.h4) * 1_048_576;
    let var4 = i32::from(calib.h5) * var1;
    let var5 = (((var2 - var3) - var4) + 16384) / 32768;
    let var2 = (var1 * i32::from(calib.h6)) / 1024;
    let var3 = (var1 * i32::from(calib.h3)) / 2048;
    let var4 = ((var2 * (var3 + 32768)) / 1024) + 2_097_152;
    let var2 = ((var4 * i32::from(calib.h2)) + 8192) / 16384;
    let var3 = var5 * var2;
    let var4 = ((var3 / 32768) * (var3 / 32768)) / 128;
    let var5 = var3 - ((var4 * i32::from(calib.h1)) / 16);
    let var5 = var5.clamp(0, 419_430_400);

    (var5 as u32 / 4096).min(HUMIDITY_MAX)
}
