//! MIDI parsing for the channel messages the binding engine consumes.
//!
//! Only note on/off, control change and pitch bend are modelled; everything
//! else on the wire is ignored by the dispatch path.

use crate::binding::{Signature, Source};
use std::fmt;

/// Decoded MIDI channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes. Returns `None` for running
    /// status, truncated messages, and message types the engine ignores.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        if !(0x80..0xF0).contains(&status) {
            return None;
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::NoteOff {
                    channel,
                    note: data[1] & 0x7F,
                    velocity: data[2] & 0x7F,
                })
            }
            0x90 => {
                if data.len() < 3 {
                    return None;
                }
                let note = data[1] & 0x7F;
                let velocity = data[2] & 0x7F;
                // Note On with velocity 0 is a Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note, velocity: 0 })
                } else {
                    Some(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xB0 => {
                if data.len() < 3 {
                    return None;
                }
                Some(MidiMessage::ControlChange {
                    channel,
                    cc: data[1] & 0x7F,
                    value: data[2] & 0x7F,
                })
            }
            0xE0 => {
                if data.len() < 3 {
                    return None;
                }
                let lsb = (data[1] & 0x7F) as u16;
                let msb = (data[2] & 0x7F) as u16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    /// Signature and raw 0-127 level for the dispatch engine. Note offs
    /// carry level 0 so they read as releases; the 14-bit pitch wheel is
    /// folded to 7 bits and addressed as control 0 on its channel.
    pub fn to_input(&self) -> (Signature, u8) {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => (
                Signature { source: Source::Note, channel, control: note as u32 },
                velocity,
            ),
            MidiMessage::NoteOff { channel, note, .. } => (
                Signature { source: Source::Note, channel, control: note as u32 },
                0,
            ),
            MidiMessage::ControlChange { channel, cc, value } => (
                Signature { source: Source::ControlChange, channel, control: cc as u32 },
                value,
            ),
            MidiMessage::PitchBend { channel, value } => (
                Signature { source: Source::PitchWheel, channel, control: 0 },
                convert::to_7bit(value),
            ),
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Convert 14-bit value (0-16383) to 7-bit value (0-127)
    pub fn to_7bit(value_14bit: u16) -> u8 {
        ((value_14bit >> 7) & 0x7F) as u8
    }

    /// Convert 7-bit value (0-127) to 14-bit value (0-16383)
    pub fn to_14bit(value_7bit: u8) -> u16 {
        ((value_7bit as u16) << 7) | (value_7bit as u16)
    }
}

/// Format MIDI bytes as hex string for monitor output
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_parsing() {
        let msg = MidiMessage::parse(&[0x90, 60, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 }
        );
    }

    #[test]
    fn test_note_on_velocity_zero_is_note_off() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOff { channel: 0, note: 60, velocity: 0 }
        );
    }

    #[test]
    fn test_control_change() {
        let msg = MidiMessage::parse(&[0xB2, 7, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::ControlChange { channel: 2, cc: 7, value: 100 }
        );
    }

    #[test]
    fn test_pitch_bend_center() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(msg, MidiMessage::PitchBend { channel: 0, value: 8192 });
    }

    #[test]
    fn test_unsupported_and_truncated_messages() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(MidiMessage::parse(&[0x45]), None); // running status
        assert_eq!(MidiMessage::parse(&[0xF8]), None); // timing clock
        assert_eq!(MidiMessage::parse(&[0xB0, 7]), None);
    }

    #[test]
    fn test_to_input_signatures() {
        let (sig, raw) = MidiMessage::parse(&[0xB0, 0x0F, 90]).unwrap().to_input();
        assert_eq!(sig.to_string(), "c0.0f");
        assert_eq!(raw, 90);

        let (sig, raw) = MidiMessage::parse(&[0x91, 0x40, 127]).unwrap().to_input();
        assert_eq!(sig.to_string(), "n1.40");
        assert_eq!(raw, 127);

        let (sig, raw) = MidiMessage::parse(&[0x80, 0x40, 64]).unwrap().to_input();
        assert_eq!(sig.to_string(), "n0.40");
        assert_eq!(raw, 0);

        let (sig, raw) = MidiMessage::parse(&[0xE3, 0x7F, 0x7F]).unwrap().to_input();
        assert_eq!(sig.to_string(), "p3.00");
        assert_eq!(raw, 127);
    }

    #[test]
    fn test_14bit_to_7bit() {
        assert_eq!(convert::to_7bit(0), 0);
        assert_eq!(convert::to_7bit(8192), 64);
        assert_eq!(convert::to_7bit(16383), 127);
        assert_eq!(convert::to_14bit(64), 8256);
    }
}
