//! Console session state and the action methods bindings dispatch into.
//!
//! This is the boundary object: the real audio players, mixer, streamers and
//! recorders live elsewhere and observe this state. Player-pair target
//! resolution happens here, at call time, because "focused deck" and
//! "crossfader-favored deck" change continuously and cannot be baked into a
//! binding.

use crate::actions::{self, TargetGroup};
use crate::controls::ActionHandler;
use tracing::{debug, info, warn};

/// Fader midpoint; the crossfader below it favors the left deck.
const CROSSFADER_CENTER: u8 = 64;

/// Player-pair addressing: fixed sides, then the call-time-resolved pair.
const TARGET_LEFT: u8 = 0;
const TARGET_RIGHT: u8 = 1;
const TARGET_FOCUSED: u8 = 2;
const TARGET_FADERED: u8 = 3;

#[derive(Debug, Clone, Copy)]
pub struct PlayerDeck {
    pub playing: bool,
    pub paused: bool,
    /// Playlist position, advanced by p_prev/p_next
    pub track: u32,
    /// 0-127
    pub volume: u8,
    /// 0-127, 64 = unity speed
    pub speed: u8,
}

impl Default for PlayerDeck {
    fn default() -> Self {
        Self {
            playing: false,
            paused: false,
            track: 0,
            volume: 127,
            speed: 64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MicChannel {
    pub open: bool,
    /// 0-127
    pub level: u8,
}

impl Default for MicChannel {
    fn default() -> Self {
        Self { open: false, level: 100 }
    }
}

/// Live console state mutated by dispatched actions.
#[derive(Debug)]
pub struct ConsoleSession {
    pub players: [PlayerDeck; 2],
    /// Which deck holds input focus (0 or 1)
    pub focus: usize,
    /// 0 = hard left, 127 = hard right
    pub crossfader: u8,
    pub mics: Vec<MicChannel>,
    pub streams: Vec<bool>,
    pub recorders: Vec<bool>,
}

impl Default for ConsoleSession {
    fn default() -> Self {
        Self {
            players: [PlayerDeck::default(); 2],
            focus: 0,
            crossfader: CROSSFADER_CENTER,
            mics: vec![MicChannel::default(); 4],
            streams: vec![false; 6],
            recorders: vec![false; 2],
        }
    }
}

/// Clamp a set-or-alter update onto a 0-127 level.
fn apply_level(current: u8, value: i32, is_delta: bool) -> u8 {
    let next = if is_delta {
        current as i32 + value
    } else {
        value
    };
    next.clamp(0, 127) as u8
}

impl ConsoleSession {
    /// Which deck a player-pair target addresses right now. Unknown indices
    /// fall back to the focused deck.
    pub fn resolve_player(&self, target: u8) -> usize {
        match target {
            TARGET_LEFT => 0,
            TARGET_RIGHT => 1,
            TARGET_FOCUSED => self.focus,
            TARGET_FADERED => {
                if self.crossfader < CROSSFADER_CENTER {
                    0
                } else {
                    1
                }
            }
            other => {
                warn!("player target {} out of range, using focused deck", other);
                self.focus
            }
        }
    }

    fn player_action(&mut self, method: &str, target: u8, value: i32, is_delta: bool) {
        let index = self.resolve_player(target);
        let deck = &mut self.players[index];
        match method {
            "p_play" => {
                deck.playing = true;
                deck.paused = false;
                info!("deck {} play (track {})", index, deck.track);
            }
            "p_stop" => {
                deck.playing = false;
                deck.paused = false;
                info!("deck {} stop", index);
            }
            "p_pause" => {
                if deck.playing {
                    deck.paused = !deck.paused;
                    info!("deck {} pause {}", index, if deck.paused { "on" } else { "off" });
                }
            }
            "p_prev" => {
                deck.track = deck.track.saturating_sub(1);
                info!("deck {} previous track -> {}", index, deck.track);
            }
            "p_next" => {
                deck.track += 1;
                info!("deck {} next track -> {}", index, deck.track);
            }
            "p_volume" => {
                deck.volume = apply_level(deck.volume, value, is_delta);
                debug!("deck {} volume {}", index, deck.volume);
            }
            "p_pbspeed" => {
                deck.speed = apply_level(deck.speed, value, is_delta);
                debug!("deck {} playback speed {}", index, deck.speed);
            }
            other => warn!("unhandled player action {}", other),
        }
    }

    fn master_action(&mut self, method: &str, value: i32, is_delta: bool) {
        match method {
            "x_fade" => {
                self.crossfader = apply_level(self.crossfader, value, is_delta);
                debug!("crossfader {}", self.crossfader);
            }
            "x_pass" => {
                // full swing to whichever side is currently disfavored
                self.crossfader = if self.crossfader < CROSSFADER_CENTER { 127 } else { 0 };
                info!("crossfader pass -> {}", self.crossfader);
            }
            "x_focus" => {
                self.focus ^= 1;
                info!("focus -> deck {}", self.focus);
            }
            other => warn!("unhandled master action {}", other),
        }
    }

    fn mic_action(&mut self, method: &str, target: u8, value: i32, is_delta: bool) {
        let Some(mic) = self.mics.get_mut(target as usize) else {
            warn!("microphone {} out of range", target);
            return;
        };
        match method {
            "m_on" => {
                mic.open = true;
                info!("microphone {} open", target);
            }
            "m_off" => {
                mic.open = false;
                info!("microphone {} closed", target);
            }
            "m_vol" => {
                mic.level = apply_level(mic.level, value, is_delta);
                debug!("microphone {} level {}", target, mic.level);
            }
            other => warn!("unhandled microphone action {}", other),
        }
    }

    fn switch_action(kind: &str, slots: &mut [bool], target: u8, on: bool) {
        match slots.get_mut(target as usize) {
            Some(slot) => {
                *slot = on;
                info!("{} {} {}", kind, target, if on { "on" } else { "off" });
            }
            None => warn!("{} {} out of range", kind, target),
        }
    }
}

impl ActionHandler for ConsoleSession {
    fn invoke(&mut self, method: &str, target: u8, value: i32, is_delta: bool) {
        let Some(spec) = actions::lookup(method) else {
            // unreachable once bindings come from the parser, but a custom
            // caller must not be able to panic the session
            warn!("unknown action {} ignored", method);
            return;
        };
        match spec.group {
            TargetGroup::PlayerPair => self.player_action(method, target, value, is_delta),
            TargetGroup::Master => self.master_action(method, value, is_delta),
            TargetGroup::Microphone => self.mic_action(method, target, value, is_delta),
            TargetGroup::Stream => Self::switch_action(
                "stream",
                &mut self.streams,
                target,
                method == "s_on",
            ),
            TargetGroup::Recorder => Self::switch_action(
                "recorder",
                &mut self.recorders,
                target,
                method == "r_on",
            ),
        }
    }
}
