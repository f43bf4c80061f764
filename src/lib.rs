//! deckctl - input-binding and dispatch engine for a live broadcast/DJ
//! console.
//!
//! Raw events from a MIDI control surface (control change, note, pitch
//! wheel) and from a keyboard (modifier chord + key code) are bound to
//! named, parameterized console actions through a compact, round-trippable
//! string grammar (see [`binding`]). The dispatch engine ([`controls`])
//! interprets each raw value under the binding's mode - mirror, one-shot,
//! absolute set or relative alter - debounces keyboard auto-repeat, and
//! invokes the action against the session ([`session`]), which resolves
//! polymorphic player-pair targets at call time.

pub mod actions;
pub mod binding;
pub mod cli;
pub mod codec;
pub mod config;
pub mod controls;
pub mod midi;
pub mod paths;
pub mod prefs;
pub mod repeat_cache;
pub mod session;
pub mod watcher;

pub use binding::{Binding, Mode, ParseBindingError, Signature, Source};
pub use controls::{ActionHandler, Controls, KeyEvent, Learner};
pub use repeat_cache::RepeatCache;
pub use session::ConsoleSession;
