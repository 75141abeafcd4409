//! Single-byte immediate commands.
//!
//! Command bytes are decoded on every received byte, even while a settings
//! packet is in flight — none of the valid packet field values collide with
//! a command byte, so the two decoders coexist on one stream.

use crate::modulation::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `v` — reply with the identify string.
    Identify,
    /// `r`/`q`/`w`/`t`/`c` — activate a modulation pattern.
    SelectPattern(Pattern),
    /// `a` — start telemetry streaming.
    StartStream,
    /// `s` — stop streaming, heaters to idle drive.
    StopStream,
    /// `O` — heaters to full drive.
    HeaterFullOn,
    /// `o` — heater output off.
    HeaterOff,
    /// `g` — send the settings report.
    ReportSettings,
    /// `h` — inlet line on, outlet line off.
    SelectInlet,
    /// `y` — outlet line on, inlet line off.
    SelectOutlet,
    /// `e` — both gas lines on.
    OpenBothLines,
    /// `i` — both gas lines off.
    CloseBothLines,
}

impl Command {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'v' => Some(Self::Identify),
            b'r' => Some(Self::SelectPattern(Pattern::Ramp)),
            b'q' => Some(Self::SelectPattern(Pattern::Square)),
            b'w' => Some(Self::SelectPattern(Pattern::Sine)),
            b't' => Some(Self::SelectPattern(Pattern::Triangle)),
            b'c' => Some(Self::SelectPattern(Pattern::SquareTriangle)),
            b'a' => Some(Self::StartStream),
            b's' => Some(Self::StopStream),
            b'O' => Some(Self::HeaterFullOn),
            b'o' => Some(Self::HeaterOff),
            b'g' => Some(Self::ReportSettings),
            b'h' => Some(Self::SelectInlet),
            b'y' => Some(Self::SelectOutlet),
            b'e' => Some(Self::OpenBothLines),
            b'i' => Some(Self::CloseBothLines),
            _ => None,
        }
    }
}
