//! Static action registry: which interpretation modes each console action
//! accepts, and which target-addressing group it belongs to.
//!
//! The registry is the single authority for legal `method` names. The binding
//! parser rejects unknown names, the dispatch engine skips mode/action
//! pairings the table does not allow, and an external binding editor can use
//! the table to restrict its own UI.

use crate::binding::Mode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Addressing namespace giving meaning to a binding's small `target` integer.
///
/// The group is determined by the leading segment of the action name
/// (`p_*`, `x_*`, `m_*`, `s_*`, `r_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetGroup {
    /// 0 = left deck, 1 = right deck, 2 = deck holding input focus,
    /// 3 = deck the crossfader currently favors. 2 and 3 are resolved at
    /// call time inside the action, because focus and crossfader position
    /// change continuously.
    PlayerPair,
    /// Flat index: microphone channel N
    Microphone,
    /// Flat index: stream connection N
    Stream,
    /// Flat index: recorder N
    Recorder,
    /// Console-wide controls (crossfader, focus); target is unused
    Master,
}

/// One registered action: its name, the modes it may legally be bound with
/// (in preference order, momentary actions accept only pulse), and its
/// target group.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub name: &'static str,
    pub modes: &'static [Mode],
    pub group: TargetGroup,
}

const PULSE_ONLY: &[Mode] = &[Mode::Pulse];
const FADER: &[Mode] = &[Mode::Direct, Mode::Set, Mode::Alter];

/// Every action the console exposes to the binding layer.
pub const REGISTRY: &[ActionSpec] = &[
    // Player pair
    ActionSpec { name: "p_play", modes: PULSE_ONLY, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_stop", modes: PULSE_ONLY, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_pause", modes: PULSE_ONLY, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_prev", modes: PULSE_ONLY, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_next", modes: PULSE_ONLY, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_volume", modes: FADER, group: TargetGroup::PlayerPair },
    ActionSpec { name: "p_pbspeed", modes: FADER, group: TargetGroup::PlayerPair },
    // Console-wide
    ActionSpec { name: "x_fade", modes: FADER, group: TargetGroup::Master },
    ActionSpec { name: "x_pass", modes: PULSE_ONLY, group: TargetGroup::Master },
    ActionSpec { name: "x_focus", modes: PULSE_ONLY, group: TargetGroup::Master },
    // Microphone channels
    ActionSpec { name: "m_on", modes: PULSE_ONLY, group: TargetGroup::Microphone },
    ActionSpec { name: "m_off", modes: PULSE_ONLY, group: TargetGroup::Microphone },
    ActionSpec { name: "m_vol", modes: FADER, group: TargetGroup::Microphone },
    // Streams
    ActionSpec { name: "s_on", modes: PULSE_ONLY, group: TargetGroup::Stream },
    ActionSpec { name: "s_off", modes: PULSE_ONLY, group: TargetGroup::Stream },
    // Recorders
    ActionSpec { name: "r_on", modes: PULSE_ONLY, group: TargetGroup::Recorder },
    ActionSpec { name: "r_off", modes: PULSE_ONLY, group: TargetGroup::Recorder },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static ActionSpec>> =
    Lazy::new(|| REGISTRY.iter().map(|spec| (spec.name, spec)).collect());

/// Look up an action by its registered name.
pub fn lookup(name: &str) -> Option<&'static ActionSpec> {
    BY_NAME.get(name).copied()
}

/// Whether `mode` is a legal interpretation for the named action.
pub fn mode_allowed(name: &str, mode: Mode) -> bool {
    lookup(name).is_some_and(|spec| spec.modes.contains(&mode))
}

impl ActionSpec {
    /// Canonical interned name for a parsed method string, so bindings can
    /// carry a `&'static str` instead of an allocation.
    pub fn interned(name: &str) -> Option<&'static str> {
        lookup(name).map(|spec| spec.name)
    }
}
