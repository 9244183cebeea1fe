//! Per-entry TTL cache using Moka.
//!
//! Each entry carries its own time-to-live. Expired entries are never
//! returned: Moka checks expiry on every read and evicts them lazily, and
//! [`TtlCache::size`] flushes pending maintenance before counting.

use std::hash::Hash;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

/// A cached value together with the TTL it was stored with.
#[derive(Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy reading the TTL off each entry.
struct PerEntryTtl;

impl<K, V> Expiry<K, Timed<V>> for PerEntryTtl {
    fn expire_after_create(&self, _key: &K, entry: &Timed<V>, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Thread-safe key/value cache with per-entry expiration.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, Timed<V>>,
    default_ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `max_capacity` entries.
    ///
    /// `default_ttl` applies to [`TtlCache::insert`]; [`TtlCache::set`] takes
    /// an explicit TTL.
    #[must_use]
    pub fn new(max_capacity: u64, default_ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { inner, default_ttl }
    }

    /// The TTL used by [`TtlCache::insert`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live entry.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.inner.insert(key, Timed { value, ttl });
    }

    /// Store `value` under `key` with the default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove an entry. Removing a missing key is a no-op.
    pub fn delete(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Return the cached value, or build, store and return it.
    ///
    /// # Errors
    ///
    /// Returns the factory's error unchanged; nothing is cached in that case.
    pub fn get_or_set<E>(
        &self,
        key: K,
        factory: impl FnOnce() -> Result<V, E>,
        ttl: Duration,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = factory()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Number of live entries, after evicting expired ones.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::thread::sleep;

    fn cache() -> TtlCache<String, u32> {
        TtlCache::new(100, Duration::from_secs(60))
    }

    #[test]
    fn set_then_get() {
        let cache = cache();
        cache.set("a".into(), 1, Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn expired_entries_are_absent() {
        let cache = cache();
        cache.set("short".into(), 1, Duration::from_millis(30));
        cache.set("long".into(), 2, Duration::from_secs(60));

        sleep(Duration::from_millis(120));

        assert_eq!(cache.get(&"short".to_string()), None);
        assert_eq!(cache.get(&"long".to_string()), Some(2));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn delete_removes_entry() {
        let cache = cache();
        cache.insert("a".into(), 1);
        cache.delete(&"a".to_string());
        cache.delete(&"missing".to_string());
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn get_or_set_calls_factory_once() {
        let cache = cache();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok::<_, String>(7)
        };

        assert_eq!(cache.get_or_set("k".into(), load, Duration::from_secs(60)), Ok(7));
        assert_eq!(cache.get_or_set("k".into(), load, Duration::from_secs(60)), Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn get_or_set_does_not_cache_errors() {
        let cache = cache();
        let result = cache.get_or_set("k".into(), || Err::<u32, _>("store down"), Duration::from_secs(60));
        assert_eq!(result, Err("store down"));
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn clear_empties_cache() {
        let cache = cache();
        cache.insert("a".into(), 1);
        cache.insert("b".into(), 2);
        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn overwrite_refreshes_ttl() {
        let cache = cache();
        cache.set("a".into(), 1, Duration::from_millis(30));
        cache.set("a".into(), 2, Duration::from_secs(60));
        sleep(Duration::from_millis(80));
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }
}
