//! TTL cache implementation.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use relay_core::{to_chrono_duration, SharedClock, Timestamp};

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expiry: Timestamp,
}

impl<V> CacheEntry<V> {
    /// An entry is expired once `now` is strictly past its expiry.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiry < now
    }
}

/// Key/value store whose entries expire a fixed TTL after being saved.
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    clock: SharedClock,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache. `ttl` applies to every entry.
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Look up a live entry.
    ///
    /// Returns `None` when the key is absent or its entry has expired; an
    /// expired entry is removed on the way out.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` until `now + ttl`, replacing any previous entry, then
    /// sweep out everything that has expired.
    pub fn save(&mut self, key: K, value: V) {
        let now = self.clock.now();
        let expiry = now
            .checked_add_signed(to_chrono_duration(self.ttl))
            .unwrap_or(Timestamp::MAX_UTC);
        self.entries.insert(key, CacheEntry { value, expiry });
        self.sweep_at(now);
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        self.sweep_at(now)
    }

    fn sweep_at(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use relay_core::ManualClock;
    use std::sync::Arc;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A read never yields a value whose expiry is already behind the clock.
        #[test]
        fn prop_never_returns_expired(
            ttl_ms in 1u64..5_000,
            saved_at in 0i64..10_000,
            read_at in 0i64..20_000,
        ) {
            let clock = Arc::new(ManualClock::at_epoch());
            let mut cache = TtlCache::new(Duration::from_millis(ttl_ms), clock.clone());

            clock.set_millis(saved_at);
            cache.save("k".to_string(), 7u8);

            clock.set_millis(saved_at.max(read_at));
            let expired = saved_at.max(read_at) > saved_at + ttl_ms as i64;
            prop_assert_eq!(cache.get("k").is_none(), expired);
        }
    }
}
