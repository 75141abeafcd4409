//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules of the instrument: protocol
//! handling, heater pacing, settings persistence, and telemetry bundling.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod ports;
pub mod service;

pub use service::InstrumentService;
