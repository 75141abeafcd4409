//! Serial adapter for the host link.
//!
//! On ESP-IDF this wraps `esp_idf_hal`'s UART driver with a zero-tick read
//! timeout, so the main loop drains whatever has arrived and moves on.  The
//! host backend is a pair of fixed-capacity rings that tests (and the sim
//! main loop) push into and drain.

use crate::app::ports::SerialPort;

#[cfg(target_os = "espidf")]
use esp_idf_hal::uart::UartDriver;
#[cfg(target_os = "espidf")]
use log::warn;

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct UartLink<'d> {
    driver: UartDriver<'d>,
}

#[cfg(target_os = "espidf")]
impl<'d> UartLink<'d> {
    pub fn new(driver: UartDriver<'d>) -> Self {
        Self { driver }
    }
}

#[cfg(target_os = "espidf")]
impl SerialPort for UartLink<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.driver.read(&mut buf, 0) {
            Ok(1) => Some(buf[0]),
            _ => None,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        // The TX FIFO outruns every frame we produce; a failed write here
        // means the link itself is broken, not backpressure worth waiting on.
        if let Err(err) = self.driver.write(bytes) {
            warn!("uart write failed: {err}");
        }
    }
}

// ── Host simulation backend ───────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use sim::SimLink;

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::SerialPort;
    use heapless::Deque;

    /// In-memory serial link: tests push received bytes and drain what the
    /// instrument transmitted.
    #[derive(Default)]
    pub struct SimLink {
        rx: Deque<u8, 256>,
        tx: Deque<u8, 1024>,
    }

    impl SimLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue bytes as if the peer had sent them.
        pub fn inject(&mut self, bytes: &[u8]) {
            for &b in bytes {
                // A full ring drops the byte, like a UART FIFO overrun.
                let _ = self.rx.push_back(b);
            }
        }

        /// Drain everything the instrument transmitted.
        pub fn drain_tx(&mut self) -> Vec<u8> {
            let mut out = Vec::with_capacity(self.tx.len());
            while let Some(b) = self.tx.pop_front() {
                out.push(b);
            }
            out
        }
    }

    impl SerialPort for SimLink {
        fn read_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }

        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                let _ = self.tx.push_back(b);
            }
        }
    }
}
