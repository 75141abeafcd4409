//! System configuration parameters
//!
//! All tunable parameters for the instrument.  Values can be overridden via
//! a blob in non-volatile storage; anything missing or unreadable falls back
//! to the defaults, which reproduce the factory timing.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::ByteStore;

/// Storage key of the persisted config blob.
pub const CONFIG_BLOB_KEY: &str = "sys_config";
/// Upper bound for the serialized blob.
pub const CONFIG_BLOB_MAX: usize = 128;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Modulation pace tick period (milliseconds)
    pub pace_tick_ms: u32,
    /// Gas/environment acquisition period (milliseconds)
    pub acquisition_tick_ms: u32,
    /// Protocol watchdog tick period (milliseconds)
    pub watchdog_tick_ms: u32,

    // --- Serial link ---
    /// UART baud rate for the host link
    pub uart_baud: u32,

    // --- Heaters ---
    /// Shared PWM period for the heater groups (compare counts)
    pub pwm_period: u8,
    /// Pump-before-valve settle time when opening a gas line (milliseconds)
    pub line_settle_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            pace_tick_ms: 200,      // 1500 ticks per 5 min cycle
            acquisition_tick_ms: 10,
            watchdog_tick_ms: 250,  // 20 ticks per 5 s timeout

            // Serial link
            uart_baud: 115_200,

            // Heaters
            pwm_period: 99,
            line_settle_ms: 5,
        }
    }
}

impl SystemConfig {
    /// Load the persisted config, falling back to defaults when the blob is
    /// missing or does not deserialize.
    pub fn load(store: &mut impl ByteStore) -> Self {
        let mut buf = [0u8; CONFIG_BLOB_MAX];
        match store.read_blob(CONFIG_BLOB_KEY, &mut buf) {
            Ok(len) => match postcard::from_bytes(&buf[..len]) {
                Ok(config) => config,
                Err(err) => {
                    warn!("stored config unreadable ({err}), using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist this config as a blob.
    pub fn save(&self, store: &mut impl ByteStore) -> crate::error::Result<()> {
        let mut buf = [0u8; CONFIG_BLOB_MAX];
        let used = postcard::to_slice(self, &mut buf)
            .map_err(|_| crate::error::Error::Config("config blob too large"))?;
        store.write_blob(CONFIG_BLOB_KEY, used)?;
        Ok(())
    }
}
