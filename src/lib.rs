//! Electronic-nose instrument firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod bme280;
pub mod config;
pub mod modulation;
pub mod protocol;
pub mod scheduler;
pub mod signals;

pub mod error;
pub mod pins;

// The adapters compile on every target; the actual peripheral access is
// guarded by cfg attributes inside.
pub mod adapters;
