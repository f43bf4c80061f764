//! Binding value type and the canonical textual grammar.
//!
//! A [`Binding`] describes one physical input → console action mapping.
//! The stored form is a compact string:
//!
//! ```text
//! binding := source channel '.' control ':' mode method '.' target '.' value
//! source  := 'c' | 'n' | 'p' | 'k'    # control-change | note | pitch-wheel | keyboard
//! mode    := 'd' | 'p' | 's' | 'a'    # direct | pulse | set | alter
//! ```
//!
//! `channel`, `control` and `target` are hex; `value` is signed decimal.
//! Example: `c0.0f:pp_stop.0.127` is control-change on channel 0, controller
//! 0x0f, pulse mode, action `p_stop`, target 0, value 127. `parse` and
//! `Display` round-trip exactly; this grammar is the single source of truth,
//! the presentational converters in [`crate::codec`] are not part of it.

use crate::actions;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of physical input stream a binding listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    ControlChange,
    Note,
    PitchWheel,
    Keyboard,
}

impl Source {
    pub fn letter(self) -> char {
        match self {
            Source::ControlChange => 'c',
            Source::Note => 'n',
            Source::PitchWheel => 'p',
            Source::Keyboard => 'k',
        }
    }

    pub fn from_letter(letter: char) -> Result<Self, ParseBindingError> {
        match letter {
            'c' => Ok(Source::ControlChange),
            'n' => Ok(Source::Note),
            'p' => Ok(Source::PitchWheel),
            'k' => Ok(Source::Keyboard),
            other => Err(ParseBindingError::UnknownSource(other)),
        }
    }
}

/// How the raw 0-127 value of an input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Mirror (or invert) the raw value continuously
    Direct,
    /// Fire once per press edge (or release edge when inverted), debounced
    Pulse,
    /// Fire the binding's fixed value on each press edge
    Set,
    /// Fire the binding's fixed delta on each press edge
    Alter,
}

impl Mode {
    pub fn letter(self) -> char {
        match self {
            Mode::Direct => 'd',
            Mode::Pulse => 'p',
            Mode::Set => 's',
            Mode::Alter => 'a',
        }
    }

    pub fn from_letter(letter: char) -> Result<Self, ParseBindingError> {
        match letter {
            'd' => Ok(Mode::Direct),
            'p' => Ok(Mode::Pulse),
            's' => Ok(Mode::Set),
            'a' => Ok(Mode::Alter),
            other => Err(ParseBindingError::UnknownMode(other)),
        }
    }
}

/// Canonical key for one physical input stream, independent of any binding.
///
/// For keyboard sources `channel` carries the retained modifier bitmask and
/// `control` the key code; for MIDI sources they carry the MIDI channel and
/// the controller/note number (0 for the pitch wheel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub source: Source,
    pub channel: u8,
    pub control: u32,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:x}.{:02x}", self.source.letter(), self.channel, self.control)
    }
}

/// Error raised when a stored or typed binding string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseBindingError {
    #[error("unknown source letter '{0}' (expected c, n, p or k)")]
    UnknownSource(char),
    #[error("unknown mode letter '{0}' (expected d, p, s or a)")]
    UnknownMode(char),
    #[error("unrecognized action name '{0}'")]
    UnknownMethod(String),
    #[error("malformed binding: expected source<ch>.<ctl>:<mode><method>.<target>.<value>")]
    FieldCount,
    #[error("invalid {field} field '{text}'")]
    InvalidNumber { field: &'static str, text: String },
}

/// One immutable input → action mapping.
///
/// Value-equal and hashable so it can key the repeat cache and the
/// recently-fired map. A variant of an existing binding is made with struct
/// update syntax, never by mutating in place:
///
/// ```
/// use deckctl::binding::{Binding, Mode};
/// let base = Binding::default();
/// let inverted = Binding { value: 0, ..base };
/// assert_eq!(base.value, 127);
/// assert_eq!(inverted.mode, Mode::Pulse);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub source: Source,
    /// MIDI channel (0-15) or keyboard modifier bitmask
    pub channel: u8,
    /// Controller/note number (0-127) or key code
    pub control: u32,
    pub mode: Mode,
    /// Registered action identifier (interned from [`crate::actions`])
    pub method: &'static str,
    /// Small addressing index, interpreted per the action's target group
    pub target: u8,
    /// Mode-dependent value: polarity for direct, edge selector for pulse,
    /// constant for set, delta for alter
    pub value: i32,
}

impl Default for Binding {
    /// Keyboard key "1", pulse mode, stop the left player.
    fn default() -> Self {
        Binding {
            source: Source::Keyboard,
            channel: 0,
            control: 0x31,
            mode: Mode::Pulse,
            method: "p_stop",
            target: 0,
            value: 127,
        }
    }
}

impl Binding {
    /// The input signature this binding listens on.
    pub fn signature(&self) -> Signature {
        Signature {
            source: self.source,
            channel: self.channel,
            control: self.control,
        }
    }

    /// Parse the stored string form. The method name must be registered.
    pub fn parse(text: &str) -> Result<Self, ParseBindingError> {
        let (input, action) = text.split_once(':').ok_or(ParseBindingError::FieldCount)?;

        let source_letter = input.chars().next().ok_or(ParseBindingError::FieldCount)?;
        let source = Source::from_letter(source_letter)?;
        let (channel_text, control_text) = input[source_letter.len_utf8()..]
            .split_once('.')
            .ok_or(ParseBindingError::FieldCount)?;
        let channel = parse_hex_u8(channel_text, "channel")?;
        let control = u32::from_str_radix(control_text, 16).map_err(|_| {
            ParseBindingError::InvalidNumber {
                field: "control",
                text: control_text.to_string(),
            }
        })?;

        let mode_letter = action.chars().next().ok_or(ParseBindingError::FieldCount)?;
        let mode = Mode::from_letter(mode_letter)?;
        let fields: Vec<&str> = action[mode_letter.len_utf8()..].splitn(3, '.').collect();
        let [method_text, target_text, value_text] = fields[..] else {
            return Err(ParseBindingError::FieldCount);
        };
        let method = actions::ActionSpec::interned(method_text)
            .ok_or_else(|| ParseBindingError::UnknownMethod(method_text.to_string()))?;
        let target = parse_hex_u8(target_text, "target")?;
        let value = value_text
            .parse::<i32>()
            .map_err(|_| ParseBindingError::InvalidNumber {
                field: "value",
                text: value_text.to_string(),
            })?;

        Ok(Binding {
            source,
            channel,
            control,
            mode,
            method,
            target,
            value,
        })
    }
}

fn parse_hex_u8(text: &str, field: &'static str) -> Result<u8, ParseBindingError> {
    u8::from_str_radix(text, 16).map_err(|_| ParseBindingError::InvalidNumber {
        field,
        text: text.to_string(),
    })
}

impl fmt::Display for Binding {
    /// Render the canonical string form; `Binding::parse` inverts this
    /// exactly (target in hex, value in signed decimal).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}.{:x}.{}",
            self.signature(),
            self.mode.letter(),
            self.method,
            self.target,
            self.value
        )
    }
}

impl FromStr for Binding {
    type Err = ParseBindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Binding::parse(s)
    }
}
