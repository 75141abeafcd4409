//! Outbound wire records: the telemetry frame and the settings report.

use crate::app::ports::{GAS_CHANNELS, GasReadings};
use crate::bme280::Sample;
use crate::protocol::{DATA_HEADER, DATA_TAIL, REPORT_HEADER, REPORT_TAIL};

/// Encoded telemetry frame length:
/// header + seq + 8 gas words + 3 environmental words + tail.
pub const FRAME_LEN: usize = 1 + 1 + GAS_CHANNELS * 4 + 3 * 4 + 1;

/// Encoded settings report length.
pub const REPORT_LEN: usize = 7;

/// One acquisition cycle, bundled for the host.
///
/// All words go out as big-endian i32: gas channels in array order, then
/// pressure, temperature, humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame {
    pub seq: u8,
    pub gas: GasReadings,
    pub env: Sample,
}

impl TelemetryFrame {
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = DATA_HEADER;
        buf[1] = self.seq;

        let mut at = 2;
        for word in self.gas {
            buf[at..at + 4].copy_from_slice(&word.to_be_bytes());
            at += 4;
        }
        for word in [
            self.env.pressure as i32,
            self.env.temperature,
            self.env.humidity as i32,
        ] {
            buf[at..at + 4].copy_from_slice(&word.to_be_bytes());
            at += 4;
        }

        buf[FRAME_LEN - 1] = DATA_TAIL;
        buf
    }
}

/// Hands out wrapping sequence numbers for telemetry frames.
#[derive(Debug, Default)]
pub struct FrameBundler {
    seq: u8,
}

impl FrameBundler {
    pub fn new() -> Self {
        Self { seq: 0 }
    }

    /// Bundle one cycle.  The sequence number increments before each
    /// frame, so the first frame after boot carries 1.
    pub fn bundle(&mut self, gas: GasReadings, env: Sample) -> TelemetryFrame {
        self.seq = self.seq.wrapping_add(1);
        TelemetryFrame {
            seq: self.seq,
            gas,
            env,
        }
    }
}

/// The five persisted setting bytes, echoed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsReport {
    pub osr_h: u8,
    pub osr_t: u8,
    pub osr_p: u8,
    pub standby: u8,
    pub filter: u8,
}

impl SettingsReport {
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        [
            REPORT_HEADER,
            self.osr_h,
            self.osr_t,
            self.osr_p,
            self.standby,
            self.filter,
            REPORT_TAIL,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout_is_exact() {
        let mut bundler = FrameBundler::new();
        let gas = [1, 2, 3, 4, 5, 6, 7, -8];
        let env = Sample {
            temperature: 2500,
            pressure: 101_325,
            humidity: 51_200,
        };

        let frame = bundler.bundle(gas, env);
        let buf = frame.encode();

        assert_eq!(buf.len(), 47);
        assert_eq!(buf[0], DATA_HEADER);
        assert_eq!(buf[1], 1);
        assert_eq!(&buf[2..6], &1i32.to_be_bytes());
        assert_eq!(&buf[30..34], &(-8i32).to_be_bytes());
        assert_eq!(&buf[34..38], &101_325i32.to_be_bytes());
        assert_eq!(&buf[38..42], &2500i32.to_be_bytes());
        assert_eq!(&buf[42..46], &51_200i32.to_be_bytes());
        assert_eq!(buf[46], DATA_TAIL);
    }

    #[test]
    fn sequence_increments_and_wraps() {
        let mut bundler = FrameBundler::new();
        let env = Sample::default();

        assert_eq!(bundler.bundle([0; 8], env).seq, 1);
        assert_eq!(bundler.bundle([0; 8], env).seq, 2);

        for _ in 0..253 {
            bundler.bundle([0; 8], env);
        }
        assert_eq!(bundler.bundle([0; 8], env).seq, 0);
        assert_eq!(bundler.bundle([0; 8], env).seq, 1);
    }

    #[test]
    fn report_echoes_raw_bytes() {
        let report = SettingsReport {
            osr_h: 1,
            osr_t: 2,
            osr_p: 5,
            standby: 0,
            filter: 4,
        };
        assert_eq!(report.encode(), [0xBB, 1, 2, 5, 0, 4, 0xB0]);
    }
}
