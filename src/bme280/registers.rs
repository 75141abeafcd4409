//! Register map and typed register fields.
//!
//! Every multi-valued register field gets a dedicated enum with an explicit
//! raw mapping and a round-trip decode; unknown raw values decode to `None`
//! so an invalid wire byte can never be latched into the device.

/// Fixed I2C device address (SDO tied low).
pub const I2C_ADDR: u8 = 0x76;

/// Chip identity expected in [`Reg::ChipId`].
pub const CHIP_ID: u8 = 0x60;

/// Soft-reset command written to [`Reg::Reset`].
pub const RESET_CMD: u8 = 0xB6;

/// Status bit: NVM data is being copied to image registers.
pub const STATUS_IM_UPDATE: u8 = 0x01;
/// Status bit: a conversion is running.
pub const STATUS_MEASURING: u8 = 0x08;

/// Register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    /// Calibration block A (26 bytes).
    CalibA = 0x88,
    ChipId = 0xD0,
    Reset = 0xE0,
    /// Calibration block B (7 bytes).
    CalibB = 0xE1,
    CtrlHum = 0xF2,
    Status = 0xF3,
    CtrlMeas = 0xF4,
    Config = 0xF5,
    /// Burst data block: press msb..xlsb, temp msb..xlsb, hum msb/lsb.
    PressMsb = 0xF7,
}

impl Reg {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Length of calibration block A.
pub const CALIB_A_LEN: usize = 26;
/// Length of calibration block B.
pub const CALIB_B_LEN: usize = 7;
/// Length of the burst data block.
pub const DATA_LEN: usize = 8;

// ── ctrl_hum / ctrl_meas oversampling field ───────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    Skip = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Skip),
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            3 => Some(Self::X4),
            4 => Some(Self::X8),
            5 => Some(Self::X16),
            _ => None,
        }
    }
}

// ── config standby field ──────────────────────────────────────

/// Inactive duration between normal-mode conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StandbyTime {
    Ms0_5 = 0,
    Ms62_5 = 1,
    Ms125 = 2,
    Ms250 = 3,
    Ms500 = 4,
    Ms1000 = 5,
    Ms10 = 6,
    Ms20 = 7,
}

impl StandbyTime {
    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Ms0_5),
            1 => Some(Self::Ms62_5),
            2 => Some(Self::Ms125),
            3 => Some(Self::Ms250),
            4 => Some(Self::Ms500),
            5 => Some(Self::Ms1000),
            6 => Some(Self::Ms10),
            7 => Some(Self::Ms20),
            _ => None,
        }
    }
}

// ── config IIR filter field ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Filter {
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

impl Filter {
    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::X2),
            2 => Some(Self::X4),
            3 => Some(Self::X8),
            4 => Some(Self::X16),
            _ => None,
        }
    }
}

// ── ctrl_meas mode field ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Sleep = 0,
    Forced = 1,
    Normal = 3,
}

impl Mode {
    pub const fn raw(self) -> u8 {
        self as u8
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Sleep),
            // 0b01 and 0b10 both select forced mode.
            1 | 2 => Some(Self::Forced),
            3 => Some(Self::Normal),
            _ => None,
        }
    }
}

// ── register field packing ────────────────────────────────────
//
// ctrl_hum: [2:0] osrs_h
// ctrl_meas: [7:5] osrs_t, [4:2] osrs_p, [1:0] mode
// config:    [7:5] t_sb,   [4:2] filter

pub const CTRL_HUM_OSR_MASK: u8 = 0x07;

pub const CTRL_MEAS_OSR_T_MASK: u8 = 0xE0;
pub const CTRL_MEAS_OSR_T_SHIFT: u8 = 5;
pub const CTRL_MEAS_OSR_P_MASK: u8 = 0x1C;
pub const CTRL_MEAS_OSR_P_SHIFT: u8 = 2;
pub const CTRL_MEAS_MODE_MASK: u8 = 0x03;

pub const CONFIG_STANDBY_MASK: u8 = 0xE0;
pub const CONFIG_STANDBY_SHIFT: u8 = 5;
pub const CONFIG_FILTER_MASK: u8 = 0x1C;
pub const CONFIG_FILTER_SHIFT: u8 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversampling_round_trips() {
        for osr in [
            Oversampling::Skip,
            Oversampling::X1,
            Oversampling::X2,
            Oversampling::X4,
            Oversampling::X8,
            Oversampling::X16,
        ] {
            assert_eq!(Oversampling::from_raw(osr.raw()), Some(osr));
        }
        assert_eq!(Oversampling::from_raw(6), None);
        assert_eq!(Oversampling::from_raw(0xFF), None);
    }

    #[test]
    fn standby_round_trips() {
        for raw in 0..=7 {
            let sb = StandbyTime::from_raw(raw).unwrap();
            assert_eq!(sb.raw(), raw);
        }
        assert_eq!(StandbyTime::from_raw(8), None);
    }

    #[test]
    fn filter_round_trips() {
        for raw in 0..=4 {
            let f = Filter::from_raw(raw).unwrap();
            assert_eq!(f.raw(), raw);
        }
        assert_eq!(Filter::from_raw(5), None);
    }

    #[test]
    fn both_forced_encodings_decode() {
        assert_eq!(Mode::from_raw(1), Some(Mode::Forced));
        assert_eq!(Mode::from_raw(2), Some(Mode::Forced));
        assert_eq!(Mode::from_raw(3), Some(Mode::Normal));
        assert_eq!(Mode::from_raw(4), None);
    }
}
