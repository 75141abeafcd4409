//! Serial wire protocol.
//!
//! Three wire records, each with exactly one codec:
//!
//! - [`command::Command`] — single-byte immediate commands
//! - [`settings::SettingsUpdate`] — inbound 7-byte settings packet
//! - [`frame::TelemetryFrame`] / [`frame::SettingsReport`] — outbound
//!   records
//!
//! No other module touches raw wire bytes.

pub mod command;
pub mod frame;
pub mod settings;

/// Telemetry frame framing.
pub const DATA_HEADER: u8 = 0xAA;
pub const DATA_TAIL: u8 = 0xF0;

/// Settings-report framing (instrument → host).
pub const REPORT_HEADER: u8 = 0xBB;
pub const REPORT_TAIL: u8 = 0xB0;

/// Settings-update framing (host → instrument).
pub const UPDATE_HEADER: u8 = b't';
pub const UPDATE_TAIL: u8 = b'T';

/// Reply to the identify command.
pub const IDENTIFY_REPLY: &[u8] = b"COM Connection $$$";
