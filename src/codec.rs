//! Presentational converters between the small integers the binding grammar
//! stores and the tokens a human reads: key names, note names, modifier
//! glyphs.
//!
//! The forward directions never fail (unmapped key codes fall back to a
//! deterministic bracketed-hex form). The inverse parsers are best-effort
//! helpers for an external editor and are not part of the canonical grammar.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Modifier bits retained in keyboard signatures (X11-style values).
pub const MOD_SHIFT: u8 = 0x01;
pub const MOD_CTRL: u8 = 0x04;
pub const MOD_ALT: u8 = 0x08;

/// Only these bits ever reach a signature, so the same physical chord yields
/// the same signature regardless of lock keys or platform extras.
pub const MOD_MASK: u8 = MOD_SHIFT | MOD_CTRL | MOD_ALT;

const GLYPH_CTRL: char = '\u{2303}'; // ⌃
const GLYPH_ALT: char = '\u{2325}'; // ⌥
const GLYPH_SHIFT: char = '\u{21e7}'; // ⇧

/// Named non-printable keys, X11 keysym values.
const KEY_TABLE: &[(u32, &str)] = &[
    (0x0020, "space"),
    (0xff08, "BackSpace"),
    (0xff09, "Tab"),
    (0xff0d, "Return"),
    (0xff13, "Pause"),
    (0xff1b, "Escape"),
    (0xff50, "Home"),
    (0xff51, "Left"),
    (0xff52, "Up"),
    (0xff53, "Right"),
    (0xff54, "Down"),
    (0xff55, "Page_Up"),
    (0xff56, "Page_Down"),
    (0xff57, "End"),
    (0xff63, "Insert"),
    (0xff8d, "KP_Enter"),
    (0xffb0, "KP_0"),
    (0xffb1, "KP_1"),
    (0xffb2, "KP_2"),
    (0xffb3, "KP_3"),
    (0xffb4, "KP_4"),
    (0xffb5, "KP_5"),
    (0xffb6, "KP_6"),
    (0xffb7, "KP_7"),
    (0xffb8, "KP_8"),
    (0xffb9, "KP_9"),
    (0xffbe, "F1"),
    (0xffbf, "F2"),
    (0xffc0, "F3"),
    (0xffc1, "F4"),
    (0xffc2, "F5"),
    (0xffc3, "F6"),
    (0xffc4, "F7"),
    (0xffc5, "F8"),
    (0xffc6, "F9"),
    (0xffc7, "F10"),
    (0xffc8, "F11"),
    (0xffc9, "F12"),
    (0xffff, "Delete"),
];

static NAME_BY_CODE: Lazy<HashMap<u32, &'static str>> =
    Lazy::new(|| KEY_TABLE.iter().copied().collect());

static CODE_BY_NAME: Lazy<HashMap<&'static str, u32>> =
    Lazy::new(|| KEY_TABLE.iter().map(|&(code, name)| (name, code)).collect());

/// Pure-modifier key codes (Shift_L 0xffe1 through Hyper_R 0xffee); these
/// never produce an input signature on their own.
pub fn is_modifier_key(keyval: u32) -> bool {
    (0xffe1..=0xffee).contains(&keyval)
}

/// Human-readable name for a key code. Never fails: printable ASCII renders
/// as itself, named keys from the table, anything else as `[0x…]`.
pub fn key_name(keyval: u32) -> String {
    if let Some(name) = NAME_BY_CODE.get(&keyval) {
        return (*name).to_string();
    }
    if (0x21..=0x7e).contains(&keyval) {
        return char::from_u32(keyval).map(String::from).unwrap_or_default();
    }
    format!("[0x{keyval:x}]")
}

/// Best-effort inverse of [`key_name`].
pub fn parse_key_name(name: &str) -> Option<u32> {
    if let Some(hex) = name.strip_prefix("[0x").and_then(|s| s.strip_suffix(']')) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(code) = CODE_BY_NAME.get(name) {
        return Some(*code);
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if ('\u{21}'..='\u{7e}').contains(&c) => Some(c as u32),
        _ => None,
    }
}

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note name with octave for a MIDI note number; middle C (60) is C4.
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Best-effort inverse of [`note_name`]; only accepts numbers in 0-127.
pub fn parse_note_name(name: &str) -> Option<u8> {
    if !name.is_ascii() {
        return None;
    }
    let split = if name.len() > 1 && name.as_bytes()[1] == b'#' { 2 } else { 1 };
    if name.len() <= split {
        return None;
    }
    let pitch = NOTE_NAMES.iter().position(|n| *n == &name[..split])? as i32;
    let octave: i32 = name[split..].parse().ok()?;
    let note = (octave + 1) * 12 + pitch;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

/// Compact glyph string for a modifier bitmask, in ⌃⌥⇧ order.
pub fn modifier_glyphs(mask: u8) -> String {
    let mut out = String::new();
    if mask & MOD_CTRL != 0 {
        out.push(GLYPH_CTRL);
    }
    if mask & MOD_ALT != 0 {
        out.push(GLYPH_ALT);
    }
    if mask & MOD_SHIFT != 0 {
        out.push(GLYPH_SHIFT);
    }
    out
}

/// Best-effort inverse of [`modifier_glyphs`]; any unknown glyph rejects the
/// whole string.
pub fn parse_modifier_glyphs(text: &str) -> Option<u8> {
    let mut mask = 0;
    for glyph in text.chars() {
        mask |= match glyph {
            GLYPH_CTRL => MOD_CTRL,
            GLYPH_ALT => MOD_ALT,
            GLYPH_SHIFT => MOD_SHIFT,
            _ => return None,
        };
    }
    Some(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name_printable_and_named() {
        assert_eq!(key_name(0x31), "1");
        assert_eq!(key_name(0x7a), "z");
        assert_eq!(key_name(0x20), "space");
        assert_eq!(key_name(0xffbe), "F1");
        assert_eq!(key_name(0xff0d), "Return");
    }

    #[test]
    fn test_key_name_hex_fallback_is_deterministic() {
        assert_eq!(key_name(0x1008ff12), "[0x1008ff12]");
        assert_eq!(parse_key_name("[0x1008ff12]"), Some(0x1008ff12));
    }

    #[test]
    fn test_key_name_round_trip_for_table() {
        for &(code, _) in KEY_TABLE {
            assert_eq!(parse_key_name(&key_name(code)), Some(code));
        }
        assert_eq!(parse_key_name("1"), Some(0x31));
        assert_eq!(parse_key_name("definitely not a key"), None);
    }

    #[test]
    fn test_modifier_keys_are_recognized() {
        assert!(is_modifier_key(0xffe1)); // Shift_L
        assert!(is_modifier_key(0xffe9)); // Alt_L
        assert!(!is_modifier_key(0x31));
        assert!(!is_modifier_key(0xffbe));
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn test_note_name_round_trip() {
        for note in 0..=127u8 {
            assert_eq!(parse_note_name(&note_name(note)), Some(note));
        }
        assert_eq!(parse_note_name("H3"), None);
        assert_eq!(parse_note_name("C"), None);
    }

    #[test]
    fn test_modifier_glyph_order_and_round_trip() {
        assert_eq!(modifier_glyphs(0), "");
        assert_eq!(modifier_glyphs(MOD_SHIFT), "\u{21e7}");
        assert_eq!(
            modifier_glyphs(MOD_MASK),
            "\u{2303}\u{2325}\u{21e7}"
        );
        for mask in 0..=MOD_MASK {
            let mask = mask & MOD_MASK;
            assert_eq!(parse_modifier_glyphs(&modifier_glyphs(mask)), Some(mask));
        }
        assert_eq!(parse_modifier_glyphs("x"), None);
    }
}
