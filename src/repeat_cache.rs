//! TTL-backed membership set used to debounce pulse-mode auto-repeat.
//!
//! A continuously held key re-signals faster than the TTL, so each
//! [`RepeatCache::contains`] check both detects "still held" and slides the
//! expiry forward. Once the key is released the refreshes stop and the entry
//! ages out within one TTL, after which the next press reads as new. A cache
//! is used instead of release tracking because some input sources never
//! deliver a reliable release event; this gives bounded-time recovery.
//!
//! Expiry is evaluated lazily, only inside `contains`. There is no timer,
//! which is safe because the cache is queried exclusively from the single
//! dispatch path.

use crate::binding::Binding;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RepeatCache {
    ttl: Duration,
    entries: HashMap<Binding, Instant>,
}

impl RepeatCache {
    /// `ttl` must be positive; it bounds how long a vanished "held" state
    /// lingers.
    pub fn new(ttl: Duration) -> Self {
        debug_assert!(!ttl.is_zero());
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Insert or refresh: expiry becomes now + ttl.
    pub fn add(&mut self, binding: Binding) {
        self.entries.insert(binding, Instant::now() + self.ttl);
    }

    /// Remove unconditionally; reports whether an entry was present
    /// (expired-but-unevicted entries count as absent).
    pub fn discard(&mut self, binding: &Binding) -> bool {
        match self.entries.remove(binding) {
            Some(expiry) => expiry > Instant::now(),
            None => false,
        }
    }

    /// Membership with sliding refresh. The only place expiry is evaluated:
    /// a passed expiry evicts the entry and reports absent; a live entry is
    /// refreshed to now + ttl and reports present.
    pub fn contains(&mut self, binding: &Binding) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(binding) {
            Some(expiry) if *expiry > now => {
                *expiry = now + self.ttl;
                true
            }
            Some(_) => {
                self.entries.remove(binding);
                false
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_millis(100);

    #[test]
    fn test_add_then_contains() {
        let mut cache = RepeatCache::new(TTL);
        let b = Binding::default();
        cache.add(b);
        assert!(cache.contains(&b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut cache = RepeatCache::new(TTL);
        let b = Binding::default();
        cache.add(b);
        sleep(TTL + Duration::from_millis(20));
        assert!(!cache.contains(&b));
        // the expired check also evicted the entry
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_contains_slides_the_window() {
        let mut cache = RepeatCache::new(TTL);
        let b = Binding::default();
        cache.add(b);
        // keep polling at intervals well under the ttl; entry must survive
        // far past the original expiry
        for _ in 0..6 {
            sleep(Duration::from_millis(40));
            assert!(cache.contains(&b));
        }
    }

    #[test]
    fn test_discard_reports_presence() {
        let mut cache = RepeatCache::new(TTL);
        let b = Binding::default();
        assert!(!cache.discard(&b));
        cache.add(b);
        assert!(cache.discard(&b));
        assert!(!cache.contains(&b));
    }

    #[test]
    fn test_discard_of_expired_entry_counts_as_absent() {
        let mut cache = RepeatCache::new(TTL);
        let b = Binding::default();
        cache.add(b);
        sleep(TTL + Duration::from_millis(20));
        assert!(!cache.discard(&b));
    }
}
