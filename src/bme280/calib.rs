//! Factory calibration decode.
//!
//! The trim values live in two register blocks.  Everything is little
//! endian except H4/H5, which share a nibble-packed middle byte:
//!
//! ```text
//! block B: [h2_lsb][h2_msb][h3][h4_msb][h4_lsb | h5_lsb][h5_msb][h6]
//!          H4 = h4_msb(signed) << 4 | (b4 & 0x0F)
//!          H5 = h5_msb(signed) << 4 | (b4 >> 4)
//! ```

use super::registers::{CALIB_A_LEN, CALIB_B_LEN};

/// Factory trim values, widened to the types the integer compensation
/// expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

fn u16_le(lo: u8, hi: u8) -> u16 {
    u16::from(hi) << 8 | u16::from(lo)
}

fn i16_le(lo: u8, hi: u8) -> i16 {
    u16_le(lo, hi) as i16
}

impl Calibration {
    /// Decode both calibration blocks.
    pub fn parse(block_a: &[u8; CALIB_A_LEN], block_b: &[u8; CALIB_B_LEN]) -> Self {
        Self {
            t1: u16_le(block_a[0], block_a[1]),
            t2: i16_le(block_a[2], block_a[3]),
            t3: i16_le(block_a[4], block_a[5]),
            p1: u16_le(block_a[6], block_a[7]),
            p2: i16_le(block_a[8], block_a[9]),
            p3: i16_le(block_a[10], block_a[11]),
            p4: i16_le(block_a[12], block_a[13]),
            p5: i16_le(block_a[14], block_a[15]),
            p6: i16_le(block_a[16], block_a[17]),
            p7: i16_le(block_a[18], block_a[19]),
            p8: i16_le(block_a[20], block_a[21]),
            p9: i16_le(block_a[22], block_a[23]),
            // block_a[24] is a reserved byte.
            h1: block_a[25],
            h2: i16_le(block_b[0], block_b[1]),
            h3: block_b[2],
            h4: (i16::from(block_b[3] as i8) << 4) | i16::from(block_b[4] & 0x0F),
            h5: (i16::from(block_b[5] as i8) << 4) | i16::from(block_b[4] >> 4),
            h6: block_b[6] as i8,
        }
    }
}
