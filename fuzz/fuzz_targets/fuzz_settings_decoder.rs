//! Fuzz target: `SettingsDecoder::feed`
//!
//! Drives arbitrary byte streams through the settings-packet decoder one
//! byte at a time and asserts that it never panics, only completes a
//! packet on the tail byte, and always recovers cleanly after an abort.
//!
//! cargo fuzz run fuzz_settings_decoder

#![no_main]

use enose::protocol::UPDATE_TAIL;
use enose::protocol::settings::SettingsDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = SettingsDecoder::new();

    for &byte in data {
        if decoder.feed(byte).is_some() {
            // A decoded packet is only ever delivered on its tail byte,
            // and the decoder must be back at idle afterwards.
            assert_eq!(byte, UPDATE_TAIL);
            assert!(!decoder.in_flight());
        }
    }

    // After an abort the decoder must accept a clean packet again.
    decoder.abort();
    let mut done = false;
    for &byte in &[b't', 0, 1, 2, 3, 4, b'T'] {
        done = decoder.feed(byte).is_some();
    }
    assert!(done, "canonical packet must decode after abort");
});
