//! TTL cache backing both sentiment cache tiers.
//!
//! Expiry is lazy: `get` treats an entry older than the TTL as absent, so
//! correctness never depends on the sweep. The periodic sweep only bounds
//! memory. Methods take an explicit `now_ms` (`*_at` variants) so tests can
//! cross TTL boundaries without sleeping; the plain variants use the clock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at_ms: u64,
}

/// Thread-safe map of string keys to values with a fixed TTL.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl_ms: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl_ms: ttl.as_millis() as u64,
        }
    }

    /// Valid iff `now_ms - written_at_ms < ttl_ms`.
    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<V> {
        let map = self.inner.lock().expect("cache mutex poisoned");
        map.get(key).and_then(|e| {
            if now_ms.saturating_sub(e.written_at_ms) < self.ttl_ms {
                Some(e.value.clone())
            } else {
                None
            }
        })
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, now_ms())
    }

    /// Unconditionally overwrites.
    pub fn put_at(&self, key: impl Into<String>, value: V, now_ms: u64) {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        map.insert(
            key.into(),
            CacheEntry {
                value,
                written_at_ms: now_ms,
            },
        );
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_at(key, value, now_ms());
    }

    /// Drop expired entries; returns how many were removed.
    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let mut map = self.inner.lock().expect("cache mutex poisoned");
        let before = map.len();
        map.retain(|_, e| now_ms.saturating_sub(e.written_at_ms) < self.ttl_ms);
        before - map.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    /// Entry count including not-yet-swept expired entries (diagnostics).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }
}

/// Current UNIX time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: u64 = 24 * 3600 * 1000;

    #[test]
    fn get_within_ttl_returns_value() {
        let c: TtlCache<String> = TtlCache::new(Duration::from_secs(24 * 3600));
        c.put_at("k", "v".to_string(), 1_000);
        assert_eq!(c.get_at("k", 1_000 + DAY_MS - 1), Some("v".to_string()));
    }

    #[test]
    fn entry_at_exact_ttl_boundary_is_absent() {
        // written at t0, 24h TTL: a get at t0 + 24h must already miss,
        // and certainly at t0 + 24h + 1ms.
        let c: TtlCache<u32> = TtlCache::new(Duration::from_secs(24 * 3600));
        c.put_at("k", 7, 1_000);
        assert_eq!(c.get_at("k", 1_000 + DAY_MS), None);
        assert_eq!(c.get_at("k", 1_000 + DAY_MS + 1), None);
    }

    #[test]
    fn expired_entry_is_absent_even_before_sweep() {
        let c: TtlCache<u32> = TtlCache::new(Duration::from_millis(10));
        c.put_at("k", 1, 0);
        assert_eq!(c.get_at("k", 11), None);
        // Still physically present until swept.
        assert_eq!(c.len(), 1);
        assert_eq!(c.sweep_at(11), 1);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn put_overwrites_and_refreshes_age() {
        let c: TtlCache<u32> = TtlCache::new(Duration::from_millis(100));
        c.put_at("k", 1, 0);
        c.put_at("k", 2, 90);
        assert_eq!(c.get_at("k", 150), Some(2));
    }

    #[test]
    fn sweep_keeps_fresh_entries() {
        let c: TtlCache<u32> = TtlCache::new(Duration::from_millis(100));
        c.put_at("old", 1, 0);
        c.put_at("new", 2, 80);
        assert_eq!(c.sweep_at(120), 1);
        assert_eq!(c.get_at("new", 120), Some(2));
    }
}
