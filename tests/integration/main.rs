//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the instrument end to
//! end against the in-memory adapters.  All tests run on the host
//! (x86_64) with no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod mock_hw;
mod modulation_flow_tests;
mod protocol_flow_tests;
