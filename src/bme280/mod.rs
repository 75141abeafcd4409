//! BME280-class environmental sensor driver.
//!
//! The driver is generic over a [`RegisterBus`] (the I2C adapter binds the
//! fixed device address) and an `embedded_hal` delay, so the whole protocol
//! runs against a simulated register file on the host.
//!
//! Mode discipline: every settings setter parks the device in sleep and
//! leaves it there.  The caller re-enters a measuring mode explicitly once
//! all fields are written — re-entering after every field would restart a
//! conversion five times per settings packet.

pub mod calib;
pub mod compensate;
pub mod registers;

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::error::SensorError;
use calib::Calibration;
use registers::{
    CALIB_A_LEN, CALIB_B_LEN, CHIP_ID, CONFIG_FILTER_MASK, CONFIG_FILTER_SHIFT,
    CONFIG_STANDBY_MASK, CONFIG_STANDBY_SHIFT, CTRL_HUM_OSR_MASK, CTRL_MEAS_MODE_MASK,
    CTRL_MEAS_OSR_P_MASK, CTRL_MEAS_OSR_P_SHIFT, CTRL_MEAS_OSR_T_MASK, CTRL_MEAS_OSR_T_SHIFT,
    DATA_LEN, Filter, Mode, Oversampling, Reg, RESET_CMD, STATUS_IM_UPDATE, STATUS_MEASURING,
    StandbyTime,
};

/// Chip-id probe attempts during [`Bme280::start`].
const START_RETRIES: u8 = 5;
/// NVM-copy polls after a soft reset.
const RESET_POLLS: u8 = 5;

/// Byte-register transport with the device address already bound.
pub trait RegisterBus {
    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError>;
    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError>;
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        (**self).read_reg(reg)
    }
    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        (**self).read_block(reg, buf)
    }
    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        (**self).write_reg(reg, value)
    }
}

/// Held register settings, mirrored from the device after each commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSettings {
    pub osr_h: Oversampling,
    pub osr_t: Oversampling,
    pub osr_p: Oversampling,
    pub standby: StandbyTime,
    pub filter: Filter,
    pub mode: Mode,
}

impl Default for SensorSettings {
    /// Instrument defaults, also used to patch invalid packet fields.
    fn default() -> Self {
        Self {
            osr_h: Oversampling::X1,
            osr_t: Oversampling::X2,
            osr_p: Oversampling::X16,
            standby: StandbyTime::Ms0_5,
            filter: Filter::X16,
            mode: Mode::Sleep,
        }
    }
}

/// One compensated measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Hundredths of °C.
    pub temperature: i32,
    /// Pa.
    pub pressure: u32,
    /// %RH in Q22.10.
    pub humidity: u32,
}

/// Raw ADC words from the burst data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawSample {
    pressure: u32,
    temperature: i32,
    humidity: i32,
}

impl RawSample {
    fn parse(buf: &[u8; DATA_LEN]) -> Self {
        let p = (u32::from(buf[0]) << 12) | (u32::from(buf[1]) << 4) | (u32::from(buf[2]) >> 4);
        let t = (i32::from(buf[3]) << 12) | (i32::from(buf[4]) << 4) | (i32::from(buf[5]) >> 4);
        let h = (i32::from(buf[6]) << 8) | i32::from(buf[7]);
        Self {
            pressure: p,
            temperature: t,
            humidity: h,
        }
    }
}

pub struct Bme280<B, D> {
    bus: B,
    delay: D,
    calib: Calibration,
    settings: SensorSettings,
    last: Sample,
}

impl<B: RegisterBus, D: DelayNs> Bme280<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            calib: Calibration::default(),
            settings: SensorSettings::default(),
            last: Sample::default(),
        }
    }

    /// Probe the chip id (with retries), soft-reset, and load calibration.
    pub fn start(&mut self) -> Result<(), SensorError> {
        for _ in 0..START_RETRIES {
            if let Ok(id) = self.bus.read_reg(Reg::ChipId.addr()) {
                if id == CHIP_ID {
                    self.reset()?;
                    self.load_calibration()?;
                    debug!("bme280: started, chip id {id:#04x}");
                    return Ok(());
                }
            }
            self.delay.delay_ms(1);
        }
        Err(SensorError::DeviceNotFound)
    }

    /// Soft-reset, wait for the NVM copy to finish, then re-apply the held
    /// settings (a reset clears every configuration register).
    pub fn reset(&mut self) -> Result<(), SensorError> {
        self.bus.write_reg(Reg::Reset.addr(), RESET_CMD)?;

        let mut copied = false;
        for _ in 0..RESET_POLLS {
            self.delay.delay_ms(2);
            if self.bus.read_reg(Reg::Status.addr())? & STATUS_IM_UPDATE == 0 {
                copied = true;
                break;
            }
        }
        if !copied {
            return Err(SensorError::NvmCopyTimeout);
        }

        let held = self.settings;
        self.set_humidity_oversampling(held.osr_h)?;
        self.set_temperature_oversampling(held.osr_t)?;
        self.set_pressure_oversampling(held.osr_p)?;
        self.set_standby_time(held.standby)?;
        self.set_filter(held.filter)?;
        self.set_mode(held.mode)
    }

    pub fn chip_id(&mut self) -> Result<u8, SensorError> {
        self.bus.read_reg(Reg::ChipId.addr())
    }

    /// Current mode from the device (not the held copy).
    pub fn mode(&mut self) -> Result<Mode, SensorError> {
        let raw = self.bus.read_reg(Reg::CtrlMeas.addr())? & CTRL_MEAS_MODE_MASK;
        // Masked to two bits; every encoding decodes.
        Ok(Mode::from_raw(raw).unwrap_or(Mode::Sleep))
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SensorError> {
        let v = self.bus.read_reg(Reg::CtrlMeas.addr())? & !CTRL_MEAS_MODE_MASK;
        self.bus.write_reg(Reg::CtrlMeas.addr(), v | mode.raw())?;
        self.settings.mode = mode;
        Ok(())
    }

    pub fn set_humidity_oversampling(&mut self, osr: Oversampling) -> Result<(), SensorError> {
        self.ensure_sleep()?;
        let v = self.bus.read_reg(Reg::CtrlHum.addr())? & !CTRL_HUM_OSR_MASK;
        self.bus.write_reg(Reg::CtrlHum.addr(), v | osr.raw())?;
        // ctrl_hum only latches on the next ctrl_meas write.
        let meas = self.bus.read_reg(Reg::CtrlMeas.addr())?;
        self.bus.write_reg(Reg::CtrlMeas.addr(), meas)?;

        let committed = self.bus.read_reg(Reg::CtrlHum.addr())? & CTRL_HUM_OSR_MASK;
        if let Some(v) = Oversampling::from_raw(committed) {
            self.settings.osr_h = v;
        }
        Ok(())
    }

    pub fn set_temperature_oversampling(&mut self, osr: Oversampling) -> Result<(), SensorError> {
        self.ensure_sleep()?;
        let v = self.bus.read_reg(Reg::CtrlMeas.addr())? & !CTRL_MEAS_OSR_T_MASK;
        self.bus
            .write_reg(Reg::CtrlMeas.addr(), v | (osr.raw() << CTRL_MEAS_OSR_T_SHIFT))?;

        let committed =
            (self.bus.read_reg(Reg::CtrlMeas.addr())? & CTRL_MEAS_OSR_T_MASK) >> CTRL_MEAS_OSR_T_SHIFT;
        if let Some(v) = Oversampling::from_raw(committed) {
            self.settings.osr_t = v;
        }
        Ok(())
    }

    pub fn set_pressure_oversampling(&mut self, osr: Oversampling) -> Result<(), SensorError> {
        self.ensure_sleep()?;
        let v = self.bus.read_reg(Reg::CtrlMeas.addr())? & !CTRL_MEAS_OSR_P_MASK;
        self.bus
            .write_reg(Reg::CtrlMeas.addr(), v | (osr.raw() << CTRL_MEAS_OSR_P_SHIFT))?;

        let committed =
            (self.bus.read_reg(Reg::CtrlMeas.addr())? & CTRL_MEAS_OSR_P_MASK) >> CTRL_MEAS_OSR_P_SHIFT;
        if let Some(v) = Oversampling::from_raw(committed) {
            self.settings.osr_p = v;
        }
        Ok(())
    }

    pub fn set_standby_time(&mut self, standby: StandbyTime) -> Result<(), SensorError> {
        self.ensure_sleep()?;
        let v = self.bus.read_reg(Reg::Config.addr())? & !CONFIG_STANDBY_MASK;
        self.bus
            .write_reg(Reg::Config.addr(), v | (standby.raw() << CONFIG_STANDBY_SHIFT))?;

        let committed =
            (self.bus.read_reg(Reg::Config.addr())? & CONFIG_STANDBY_MASK) >> CONFIG_STANDBY_SHIFT;
        if let Some(v) = StandbyTime::from_raw(committed) {
            self.settings.standby = v;
        }
        Ok(())
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<(), SensorError> {
        self.ensure_sleep()?;
        let v = self.bus.read_reg(Reg::Config.addr())? & !CONFIG_FILTER_MASK;
        self.bus
            .write_reg(Reg::Config.addr(), v | (filter.raw() << CONFIG_FILTER_SHIFT))?;

        let committed =
            (self.bus.read_reg(Reg::Config.addr())? & CONFIG_FILTER_MASK) >> CONFIG_FILTER_SHIFT;
        if let Some(v) = Filter::from_raw(committed) {
            self.settings.filter = v;
        }
        Ok(())
    }

    /// Read one measurement if the device is not mid-conversion.
    ///
    /// Returns `Ok(None)` when the measuring bit is set; the caller simply
    /// skips this cycle.
    pub fn read_sample(&mut self) -> Result<Option<Sample>, SensorError> {
        if self.bus.read_reg(Reg::Status.addr())? & STATUS_MEASURING != 0 {
            return Ok(None);
        }

        let mut buf = [0u8; DATA_LEN];
        self.bus.read_block(Reg::PressMsb.addr(), &mut buf)?;
        let raw = RawSample::parse(&buf);

        let (temperature, t_fine) = compensate::temperature(raw.temperature, &self.calib);
        let pressure = compensate::pressure(raw.pressure, &self.calib, t_fine);
        let humidity = compensate::humidity(raw.humidity, &self.calib, t_fine);

        let sample = Sample {
            temperature,
            pressure,
            humidity,
        };
        self.last = sample;
        Ok(Some(sample))
    }

    /// Most recent compensated sample (zeroes before the first read).
    pub fn last_sample(&self) -> Sample {
        self.last
    }

    /// Held settings, as last committed to the device.
    pub fn settings(&self) -> SensorSettings {
        self.settings
    }

    pub fn calibration(&self) -> Calibration {
        self.calib
    }

    /// Test hook: install calibration without a bus transfer.
    #[cfg(test)]
    pub(crate) fn set_calibration(&mut self, calib: Calibration) {
        self.calib = calib;
    }

    fn ensure_sleep(&mut self) -> Result<(), SensorError> {
        if self.mode()? != Mode::Sleep {
            self.set_mode(Mode::Sleep)?;
        }
        Ok(())
    }

    fn load_calibration(&mut self) -> Result<(), SensorError> {
        let mut block_a = [0u8; CALIB_A_LEN];
        let mut block_b = [0u8; CALIB_B_LEN];
        self.bus.read_block(Reg::CalibA.addr(), &mut block_a)?;
        self.bus.read_block(Reg::CalibB.addr(), &mut block_b)?;
        self.calib = Calibration::parse(&block_a, &block_b);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat 256-byte register file with scriptable failure knobs.
    struct SimBus {
        regs: [u8; 256],
        /// Status reads report NVM-copy-busy this many more times.
        nvm_busy_reads: u8,
        /// Chip-id reads fail this many more times.
        id_fails: u8,
        writes: Vec<(u8, u8)>,
    }

    impl SimBus {
        fn new() -> Self {
            let mut regs = [0u8; 256];
            regs[Reg::ChipId.addr() as usize] = CHIP_ID;
            Self {
                regs,
                nvm_busy_reads: 0,
                id_fails: 0,
                writes: Vec::new(),
            }
        }
    }

    impl RegisterBus for SimBus {
        fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
            if reg == Reg::ChipId.addr() && self.id_fails > 0 {
                self.id_fails -= 1;
                return Err(SensorError::Comm);
            }
            if reg == Reg::Status.addr() && self.nvm_busy_reads > 0 {
                self.nvm_busy_reads -= 1;
                return Ok(self.regs[reg as usize] | STATUS_IM_UPDATE);
            }
            Ok(self.regs[reg as usize])
        }

        fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.regs[reg as usize + i];
            }
            Ok(())
        }

        fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
            self.writes.push((reg, value));
            if reg != Reg::Reset.addr() {
                self.regs[reg as usize] = value;
            }
            Ok(())
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver(bus: SimBus) -> Bme280<SimBus, NoDelay> {
        Bme280::new(bus, NoDelay)
    }

    #[test]
    fn start_probes_resets_and_loads_calibration() {
        let mut bus = SimBus::new();
        bus.regs[Reg::CalibA.addr() as usize] = 0x88;
        bus.regs[Reg::CalibA.addr() as usize + 1] = 0x6D;
        let mut dev = driver(bus);

        dev.start().unwrap();
        assert_eq!(dev.calibration().t1, 0x6D88);
        assert!(dev.bus.writes.contains(&(Reg::Reset.addr(), RESET_CMD)));
    }

    #[test]
    fn start_survives_transient_probe_failures() {
        let mut bus = SimBus::new();
        bus.id_fails = 4;
        let mut dev = driver(bus);
        assert!(dev.start().is_ok());
    }

    #[test]
    fn start_gives_up_after_retry_budget() {
        let mut bus = SimBus::new();
        bus.regs[Reg::ChipId.addr() as usize] = 0x55;
        let mut dev = driver(bus);
        assert_eq!(dev.start(), Err(SensorError::DeviceNotFound));
    }

    #[test]
    fn reset_times_out_when_nvm_copy_sticks() {
        let mut bus = SimBus::new();
        bus.nvm_busy_reads = u8::MAX;
        let mut dev = driver(bus);
        assert_eq!(dev.reset(), Err(SensorError::NvmCopyTimeout));
    }

    #[test]
    fn reset_reapplies_held_settings() {
        let mut dev = driver(SimBus::new());
        dev.set_filter(Filter::X4).unwrap();
        dev.set_standby_time(StandbyTime::Ms250).unwrap();
        dev.bus.regs[Reg::Config.addr() as usize] = 0;

        dev.reset().unwrap();
        let config = dev.bus.regs[Reg::Config.addr() as usize];
        assert_eq!((config & CONFIG_FILTER_MASK) >> CONFIG_FILTER_SHIFT, Filter::X4.raw());
        assert_eq!(
            (config & CONFIG_STANDBY_MASK) >> CONFIG_STANDBY_SHIFT,
            StandbyTime::Ms250.raw()
        );
    }

    #[test]
    fn setters_force_sleep_and_stay_there() {
        let mut dev = driver(SimBus::new());
        dev.set_mode(Mode::Normal).unwrap();

        dev.set_temperature_oversampling(Oversampling::X8).unwrap();
        assert_eq!(dev.mode().unwrap(), Mode::Sleep);
        assert_eq!(dev.settings().osr_t, Oversampling::X8);
    }

    #[test]
    fn humidity_setter_latches_via_ctrl_meas() {
        let mut dev = driver(SimBus::new());
        dev.set_humidity_oversampling(Oversampling::X16).unwrap();

        // The ctrl_hum write must be followed by a ctrl_meas rewrite.
        let hum_pos = dev
            .bus
            .writes
            .iter()
            .position(|w| w.0 == Reg::CtrlHum.addr())
            .unwrap();
        assert!(
            dev.bus.writes[hum_pos + 1..]
                .iter()
                .any(|w| w.0 == Reg::CtrlMeas.addr())
        );
        assert_eq!(dev.settings().osr_h, Oversampling::X16);
    }

    #[test]
    fn read_sample_skips_while_measuring() {
        let mut dev = driver(SimBus::new());
        dev.bus.regs[Reg::Status.addr() as usize] = STATUS_MEASURING;
        assert_eq!(dev.read_sample().unwrap(), None);
    }

    #[test]
    fn read_sample_parses_and_compensates() {
        let mut bus = SimBus::new();
        // raw_p = 524288 (0x80000), raw_t = 992000 (0xF2300), raw_h = 99
        bus.regs[0xF7] = 0x80;
        bus.regs[0xF8] = 0x00;
        bus.regs[0xF9] = 0x00;
        bus.regs[0xFA] = 0xF2;
        bus.regs[0xFB] = 0x30;
        bus.regs[0xFC] = 0x00;
        bus.regs[0xFD] = 0x00;
        bus.regs[0xFE] = 99;

        let mut dev = driver(bus);
        dev.set_calibration(Calibration {
            t1: 30000,
            t2: 4096,
            p1: 32768,
            h2: 1023,
            ..Calibration::default()
        });

        let sample = dev.read_sample().unwrap().unwrap();
        assert_eq!(sample.temperature, 2500);
        assert_eq!(sample.pressure, 100_000);
        assert_eq!(dev.last_sample(), sample);
    }
}
