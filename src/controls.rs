//! Dispatch engine: ordered binding list, derived signature lookup, learner
//! intercept, pulse debounce, and the four interpretation policies.
//!
//! The engine is synchronous and single-threaded: `input` runs to completion
//! on the thread owning the session, and invoking an action is a direct
//! blocking call. Raw events from the MIDI callback and the keyboard loop
//! must be serialized onto that one thread before they reach here; the
//! binary does this with an mpsc channel feeding a single task.

use crate::actions;
use crate::binding::{Binding, Mode, Signature, Source};
use crate::codec;
use crate::repeat_cache::RepeatCache;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Raw input levels span 0-127.
pub const MAX_RAW: u8 = 127;

/// Press/release threshold for the edge-triggered modes; values at or above
/// it count as "high". The same midpoint selects inverted pulse (a binding
/// value at or under it fires on release instead of press).
pub const PULSE_THRESHOLD: u8 = 64;

/// Default repeat-cache TTL. Keyboard auto-repeat re-signals every few tens
/// of milliseconds, so a held key is refreshed long before this elapses.
pub const DEFAULT_REPEAT_TTL: Duration = Duration::from_millis(600);

/// Sink for dispatched actions. Implementations mutate session state held by
/// reference at construction time; calls must be fast and non-blocking, and
/// long-running effects are for the implementation to hand off, not perform
/// inline.
pub trait ActionHandler: Send {
    /// `target` is the raw addressing index from the binding; player-pair
    /// targets 2 and 3 are for the handler to resolve at call time.
    fn invoke(&mut self, method: &str, target: u8, value: i32, is_delta: bool);
}

/// Transient listener for an external binding editor. While attached it
/// receives raw signatures instead of normal dispatch.
pub trait Learner: Send + Sync {
    fn learn(&self, signature: Signature);
}

/// A platform key press or release, before signature extraction.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    /// X11-style key code
    pub keyval: u32,
    /// Raw modifier state; only [`codec::MOD_MASK`] bits are retained
    pub modifiers: u8,
    pub pressed: bool,
}

/// The input-binding dispatch engine.
pub struct Controls<H: ActionHandler> {
    bindings: Vec<Binding>,
    /// Derived from `bindings`; rebuilt after every structural change
    lookup: HashMap<Signature, Vec<usize>>,
    /// Held weakly so an editor that vanishes without detaching cannot
    /// break dispatch
    learner: Option<Weak<dyn Learner>>,
    repeat_cache: RepeatCache,
    /// UI feedback only, not load-bearing
    recent: HashMap<Binding, Instant>,
    handler: H,
}

impl<H: ActionHandler> Controls<H> {
    pub fn new(handler: H) -> Self {
        Self::with_repeat_ttl(handler, DEFAULT_REPEAT_TTL)
    }

    pub fn with_repeat_ttl(handler: H, ttl: Duration) -> Self {
        Self {
            bindings: Vec::new(),
            lookup: HashMap::new(),
            learner: None,
            repeat_cache: RepeatCache::new(ttl),
            recent: HashMap::new(),
            handler,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Replace the whole list (initial load, file reload).
    pub fn set_bindings(&mut self, bindings: Vec<Binding>) {
        self.bindings = bindings;
        self.update_lookup();
    }

    pub fn add_binding(&mut self, binding: Binding) {
        self.bindings.push(binding);
        self.update_lookup();
    }

    pub fn remove_binding(&mut self, index: usize) -> Option<Binding> {
        if index >= self.bindings.len() {
            return None;
        }
        let removed = self.bindings.remove(index);
        self.update_lookup();
        Some(removed)
    }

    /// Whole-record replacement; bindings are never edited in place.
    pub fn replace_binding(&mut self, index: usize, binding: Binding) -> bool {
        match self.bindings.get_mut(index) {
            Some(slot) => {
                *slot = binding;
                self.update_lookup();
                true
            }
            None => false,
        }
    }

    /// Rebuild the signature lookup from the binding list. A pure function
    /// of the list: calling it twice without an intervening edit yields an
    /// identical map.
    pub fn update_lookup(&mut self) {
        let mut lookup: HashMap<Signature, Vec<usize>> = HashMap::new();
        for (index, binding) in self.bindings.iter().enumerate() {
            lookup.entry(binding.signature()).or_default().push(index);
        }
        self.lookup = lookup;
    }

    pub fn attach_learner(&mut self, learner: &Arc<dyn Learner>) {
        self.learner = Some(Arc::downgrade(learner));
    }

    pub fn detach_learner(&mut self) {
        self.learner = None;
    }

    /// Whether a live learner is currently attached.
    pub fn learning(&self) -> bool {
        self.learner
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Bindings that fired within `window`, for UI feedback.
    pub fn recently_fired(&mut self, window: Duration) -> Vec<Binding> {
        let now = Instant::now();
        self.recent.retain(|_, fired| now.duration_since(*fired) <= window);
        self.recent.keys().copied().collect()
    }

    /// Feed one raw event. While a learner is attached it receives the
    /// signature and nothing fires; a learner that was dropped without
    /// being detached is silently discarded and dispatch proceeds.
    /// Otherwise every binding matching the signature is interpreted under
    /// its own mode and invoked independently, in list order.
    pub fn input(&mut self, signature: Signature, raw: u8) {
        if let Some(weak) = &self.learner {
            if let Some(learner) = weak.upgrade() {
                debug!("learner takes {}", signature);
                learner.learn(signature);
                return;
            }
            self.learner = None;
        }

        let Some(indices) = self.lookup.get(&signature) else {
            trace!("no binding for {}", signature);
            return;
        };
        for index in indices.clone() {
            let binding = self.bindings[index];
            self.dispatch_one(&binding, raw);
        }
    }

    /// Adapter from a platform key event. Pure-modifier keystrokes never
    /// produce a signature; only the fixed modifier subset is retained so
    /// one physical chord always yields one signature. Returns whether the
    /// event was taken (a learner is listening or a binding matches), so a
    /// host UI can decide to swallow the keystroke.
    pub fn input_key(&mut self, event: KeyEvent) -> bool {
        if codec::is_modifier_key(event.keyval) {
            return false;
        }
        let signature = Signature {
            source: Source::Keyboard,
            channel: event.modifiers & codec::MOD_MASK,
            control: event.keyval,
        };
        let taken = self.learning() || self.lookup.contains_key(&signature);
        let raw = if event.pressed { MAX_RAW } else { 0 };
        self.input(signature, raw);
        taken
    }

    fn dispatch_one(&mut self, binding: &Binding, raw: u8) {
        // Defensive: an editor should never produce an illegal pairing, but
        // a hand-edited file can. Skip deterministically, never crash.
        if !actions::mode_allowed(binding.method, binding.mode) {
            warn!(
                "binding {} uses mode '{}' not registered for {}; skipped",
                binding,
                binding.mode.letter(),
                binding.method
            );
            return;
        }

        let high = raw >= PULSE_THRESHOLD;
        let fired = match binding.mode {
            Mode::Direct => {
                let value = if binding.value < 0 {
                    (MAX_RAW - raw) as i32
                } else {
                    raw as i32
                };
                self.handler.invoke(binding.method, binding.target, value, false);
                true
            }
            Mode::Pulse => {
                // The binding's value doubles as the edge selector: above
                // the midpoint fires on press, at or under it on release.
                let inverted = binding.value <= PULSE_THRESHOLD as i32;
                if high {
                    if self.repeat_cache.contains(binding) {
                        // auto-repeat while held
                        false
                    } else {
                        self.repeat_cache.add(*binding);
                        if !inverted {
                            self.handler.invoke(
                                binding.method,
                                binding.target,
                                binding.value,
                                true,
                            );
                        }
                        !inverted
                    }
                } else {
                    let was_held = self.repeat_cache.discard(binding);
                    if inverted && was_held {
                        self.handler.invoke(binding.method, binding.target, binding.value, true);
                    }
                    inverted && was_held
                }
            }
            Mode::Set => {
                if high {
                    self.handler.invoke(binding.method, binding.target, binding.value, false);
                }
                high
            }
            Mode::Alter => {
                if high {
                    self.handler.invoke(binding.method, binding.target, binding.value, true);
                }
                high
            }
        };

        if fired {
            trace!("fired {}", binding);
            self.recent.insert(*binding, Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Call {
        method: String,
        target: u8,
        value: i32,
        is_delta: bool,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl ActionHandler for Recorder {
        fn invoke(&mut self, method: &str, target: u8, value: i32, is_delta: bool) {
            self.calls.push(Call {
                method: method.to_string(),
                target,
                value,
                is_delta,
            });
        }
    }

    fn engine_with(lines: &[&str]) -> Controls<Recorder> {
        let mut controls = Controls::new(Recorder::default());
        controls.set_bindings(
            lines
                .iter()
                .map(|line| Binding::parse(line).unwrap())
                .collect(),
        );
        controls
    }

    fn sig(text_binding: &str) -> Signature {
        Binding::parse(text_binding).unwrap().signature()
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut controls = engine_with(&["c0.0f:dx_fade.0.1", "c0.0f:pp_stop.0.127"]);
        let first = controls.lookup.clone();
        controls.update_lookup();
        assert_eq!(controls.lookup, first);
    }

    #[test]
    fn test_no_match_is_a_noop() {
        let mut controls = engine_with(&["c0.0f:dx_fade.0.1"]);
        controls.input(sig("n5.10:pp_play.0.127"), 127);
        assert!(controls.handler().calls.is_empty());
    }

    #[test]
    fn test_direct_passthrough_and_inversion() {
        let line = "c0.0f:dx_fade.0.1";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 0);
        controls.input(sig(line), 127);
        controls.input(sig(line), 90);
        let values: Vec<i32> = controls.handler().calls.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![0, 127, 90]);
        assert!(controls.handler().calls.iter().all(|c| !c.is_delta));

        // negative binding value inverts: hold to decrease
        let inverted = "c0.0f:dx_fade.0.-1";
        let mut controls = engine_with(&[inverted]);
        controls.input(sig(inverted), 0);
        controls.input(sig(inverted), 127);
        let values: Vec<i32> = controls.handler().calls.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![127, 0]);
    }

    #[test]
    fn test_pulse_debounces_auto_repeat() {
        let line = "k0.31:pp_stop.0.127";
        let mut controls = engine_with(&[line]);
        // two sustained-high events with no release between: one fire
        controls.input(sig(line), 127);
        controls.input(sig(line), 127);
        assert_eq!(controls.handler().calls.len(), 1);
        assert_eq!(
            controls.handler().calls[0],
            Call { method: "p_stop".into(), target: 0, value: 127, is_delta: true }
        );
        // release, then a genuine new press fires again
        controls.input(sig(line), 0);
        controls.input(sig(line), 127);
        assert_eq!(controls.handler().calls.len(), 2);
    }

    #[test]
    fn test_inverted_pulse_fires_on_release() {
        let line = "k0.31:pp_stop.0.0";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 127);
        assert!(controls.handler().calls.is_empty());
        controls.input(sig(line), 0);
        assert_eq!(controls.handler().calls.len(), 1);
        // a second low event does not cross the edge again
        controls.input(sig(line), 0);
        assert_eq!(controls.handler().calls.len(), 1);
    }

    #[test]
    fn test_pulse_subthreshold_values_do_not_fire() {
        let line = "c0.10:pp_play.1.127";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 10);
        controls.input(sig(line), 63);
        assert!(controls.handler().calls.is_empty());
        controls.input(sig(line), 64);
        assert_eq!(controls.handler().calls.len(), 1);
    }

    #[test]
    fn test_set_repeats_without_debounce() {
        let line = "c0.20:sx_fade.0.64";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 127);
        controls.input(sig(line), 127);
        controls.input(sig(line), 0);
        assert_eq!(controls.handler().calls.len(), 2);
        for call in &controls.handler().calls {
            assert_eq!(call.value, 64);
            assert!(!call.is_delta);
        }
    }

    #[test]
    fn test_alter_always_fixed_delta() {
        let line = "n0.40:am_vol.2.-5";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 64);
        controls.input(sig(line), 127);
        controls.input(sig(line), 1);
        assert_eq!(controls.handler().calls.len(), 2);
        for call in &controls.handler().calls {
            assert_eq!(call.value, -5);
            assert!(call.is_delta);
            assert_eq!(call.target, 2);
        }
    }

    #[test]
    fn test_multi_match_fires_all_in_list_order() {
        let mut controls = engine_with(&["k0.31:pp_stop.0.127", "k0.31:pp_play.1.127"]);
        controls.input(sig("k0.31:pp_stop.0.127"), 127);
        let methods: Vec<&str> = controls
            .handler()
            .calls
            .iter()
            .map(|c| c.method.as_str())
            .collect();
        assert_eq!(methods, vec!["p_stop", "p_play"]);
    }

    #[test]
    fn test_illegal_mode_action_pairing_is_skipped() {
        // p_stop is pulse-only; force a direct binding onto it
        let binding = Binding {
            mode: Mode::Direct,
            ..Binding::default()
        };
        let mut controls = Controls::new(Recorder::default());
        controls.set_bindings(vec![binding]);
        controls.input(binding.signature(), 127);
        assert!(controls.handler().calls.is_empty());
    }

    struct CollectingLearner {
        seen: Mutex<Vec<Signature>>,
    }

    impl Learner for CollectingLearner {
        fn learn(&self, signature: Signature) {
            self.seen.lock().unwrap().push(signature);
        }
    }

    #[test]
    fn test_learner_intercepts_dispatch() {
        let line = "k0.31:pp_stop.0.127";
        let mut controls = engine_with(&[line]);
        let learner = Arc::new(CollectingLearner { seen: Mutex::new(Vec::new()) });
        let as_dyn: Arc<dyn Learner> = learner.clone();
        controls.attach_learner(&as_dyn);

        controls.input(sig(line), 127);
        assert!(controls.handler().calls.is_empty());
        assert_eq!(learner.seen.lock().unwrap().as_slice(), &[sig(line)]);

        controls.detach_learner();
        controls.input(sig(line), 127);
        assert_eq!(controls.handler().calls.len(), 1);
    }

    #[test]
    fn test_stale_learner_falls_back_to_dispatch() {
        let line = "k0.31:pp_stop.0.127";
        let mut controls = engine_with(&[line]);
        {
            let learner: Arc<dyn Learner> =
                Arc::new(CollectingLearner { seen: Mutex::new(Vec::new()) });
            controls.attach_learner(&learner);
            // learner dropped here without detach
        }
        assert!(!controls.learning());
        controls.input(sig(line), 127);
        assert_eq!(controls.handler().calls.len(), 1);
    }

    #[test]
    fn test_input_key_filters_pure_modifiers_and_masks() {
        let line = "k1.31:pp_stop.0.127"; // shift+1
        let mut controls = engine_with(&[line]);

        // pure modifier press produces nothing
        assert!(!controls.input_key(KeyEvent { keyval: 0xffe1, modifiers: 0, pressed: true }));
        assert!(controls.handler().calls.is_empty());

        // extra non-retained modifier bits (e.g. num-lock) are masked away
        let taken = controls.input_key(KeyEvent {
            keyval: 0x31,
            modifiers: codec::MOD_SHIFT | 0x10,
            pressed: true,
        });
        assert!(taken);
        assert_eq!(controls.handler().calls.len(), 1);

        // unbound key reports not taken
        assert!(!controls.input_key(KeyEvent { keyval: 0x7a, modifiers: 0, pressed: true }));
    }

    #[test]
    fn test_recently_fired_tracks_ui_feedback() {
        let line = "k0.31:pp_stop.0.127";
        let mut controls = engine_with(&[line]);
        controls.input(sig(line), 127);
        let recent = controls.recently_fired(Duration::from_secs(5));
        assert_eq!(recent, vec![Binding::parse(line).unwrap()]);
        assert!(controls.recently_fired(Duration::ZERO).len() <= 1);
    }

    #[test]
    fn test_structural_edits_rebuild_lookup() {
        let mut controls = engine_with(&["k0.31:pp_stop.0.127"]);
        let added = Binding::parse("k0.32:pp_play.0.127").unwrap();
        controls.add_binding(added);
        controls.input(added.signature(), 127);
        assert_eq!(controls.handler().calls.len(), 1);

        controls.remove_binding(1);
        controls.input(added.signature(), 0);
        controls.input(added.signature(), 127);
        assert_eq!(controls.handler().calls.len(), 1);

        let replacement = Binding::parse("k0.33:pp_pause.0.127").unwrap();
        assert!(controls.replace_binding(0, replacement));
        assert!(!controls.replace_binding(5, replacement));
        controls.input(replacement.signature(), 127);
        assert_eq!(controls.handler().calls.len(), 2);
    }
}
