//! Inbound settings-update packet decoder.
//!
//! Wire format, seven bytes:
//!
//! ```text
//! ['t'][osr_h][osr_t][osr_p][standby][filter]['T']
//! ```
//!
//! Every byte advances the state machine.  A field byte that does not
//! decode to its typed register value marks the field invalid (`None`) but
//! keeps the packet alive; the commit layer substitutes defaults.  A bad
//! tail discards the whole packet.  The protocol watchdog aborts an
//! in-flight packet after 5 s of silence.

use crate::bme280::registers::{Filter, Oversampling, StandbyTime};
use crate::protocol::{UPDATE_HEADER, UPDATE_TAIL};

/// Decoded settings-update packet.  `None` fields were present but
/// invalid on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub osr_h: Option<Oversampling>,
    pub osr_t: Option<Oversampling>,
    pub osr_p: Option<Oversampling>,
    pub standby: Option<StandbyTime>,
    pub filter: Option<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Header accepted; next byte is the humidity field.
    Head,
    GotOsrH,
    GotOsrT,
    GotOsrP,
    GotStandby,
    GotFilter,
}

/// Streaming decoder, fed one byte at a time.
#[derive(Debug)]
pub struct SettingsDecoder {
    state: State,
    fields: SettingsUpdate,
}

impl SettingsDecoder {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            fields: SettingsUpdate::default(),
        }
    }

    /// Feed one received byte.  Returns the decoded packet when a complete,
    /// correctly framed update has been consumed.
    pub fn feed(&mut self, byte: u8) -> Option<SettingsUpdate> {
        match self.state {
            State::Idle => {
                if byte == UPDATE_HEADER {
                    self.fields = SettingsUpdate::default();
                    self.state = State::Head;
                }
                None
            }
            State::Head => {
                self.fields.osr_h = Oversampling::from_raw(byte);
                self.state = State::GotOsrH;
                None
            }
            State::GotOsrH => {
                self.fields.osr_t = Oversampling::from_raw(byte);
                self.state = State::GotOsrT;
                None
            }
            State::GotOsrT => {
                self.fields.osr_p = Oversampling::from_raw(byte);
                self.state = State::GotOsrP;
                None
            }
            State::GotOsrP => {
                self.fields.standby = StandbyTime::from_raw(byte);
                self.state = State::GotStandby;
                None
            }
            State::GotStandby => {
                self.fields.filter = Filter::from_raw(byte);
                self.state = State::GotFilter;
                None
            }
            State::GotFilter => {
                let fields = self.fields;
                self.abort();
                (byte == UPDATE_TAIL).then_some(fields)
            }
        }
    }

    /// A packet is being assembled.
    pub fn in_flight(&self) -> bool {
        self.state != State::Idle
    }

    /// Discard any partial packet and return to idle.
    pub fn abort(&mut self) {
        self.state = State::Idle;
        self.fields = SettingsUpdate::default();
    }
}
