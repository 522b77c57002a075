//! In-memory TTL cache (§4.9).
//!
//! Resolves its TTL per-read rather than at insertion time (callers ask "is
//! this still fresh for N seconds" instead of the entry carrying its own
//! expiry). Grounded on `dashmap` for the concurrent map, the same primitive
//! the teacher's in-memory backend uses for its own cache.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::CacheError;

struct Entry {
    payload: Vec<u8>,
    stored_at: Instant,
}

/// Age of the oldest/newest live entry plus the entry count, per §4.9's
/// `get_stats()` surface.
#[derive(Debug, Default, Serialize)]
pub struct CacheStats {
    pub oldest_age_secs: Option<f64>,
    pub newest_age_secs: Option<f64>,
    pub entries: usize,
}

/// A read-time-TTL cache keyed by string, values round-tripped through JSON.
pub struct TtlCache {
    entries: DashMap<String, Entry>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Fetch a value, treating it as absent once `ttl` has elapsed since it
    /// was stored. Does not evict on a stale read; call `cleanup_expired` for
    /// that.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .and_then(|entry| serde_json::from_slice(&entry.payload).ok())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.entries.insert(
            key.to_string(),
            Entry {
                payload,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every entry older than `ttl`, returning the count removed.
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - self.entries.len()
    }

    /// Per-entry age (§4.9): oldest and newest `stored_at.elapsed()` across
    /// all live entries, plus the entry count. `None` for both ages when the
    /// cache is empty.
    pub fn get_stats(&self) -> CacheStats {
        let mut oldest = None;
        let mut newest = None;
        for entry in self.entries.iter() {
            let age = entry.stored_at.elapsed();
            oldest = Some(oldest.map_or(age, |o: Duration| o.max(age)));
            newest = Some(newest.map_or(age, |n: Duration| n.min(age)));
        }
        CacheStats {
            oldest_age_secs: oldest.map(|d| d.as_secs_f64()),
            newest_age_secs: newest.map(|d| d.as_secs_f64()),
            entries: self.entries.len(),
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_within_ttl() {
        let cache = TtlCache::new();
        cache.set("k", &"v".to_string()).unwrap();
        let got: Option<String> = cache.get("k", Duration::from_secs(60));
        assert_eq!(got, Some("v".to_string()));
    }

    #[test]
    fn get_treats_an_expired_entry_as_absent() {
        let cache = TtlCache::new();
        cache.set("k", &"v".to_string()).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let got: Option<String> = cache.get("k", Duration::from_millis(1));
        assert_eq!(got, None);
    }

    #[test]
    fn cleanup_expired_removes_only_stale_entries() {
        let cache = TtlCache::new();
        cache.set("stale", &1).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.set("fresh", &2).unwrap();
        let removed = cache.cleanup_expired(Duration::from_millis(3));
        assert_eq!(removed, 1);
        assert_eq!(cache.get_stats().entries, 1);
    }

    #[test]
    fn get_stats_reports_oldest_and_newest_age() {
        let cache = TtlCache::new();
        assert_eq!(cache.get_stats().entries, 0);
        assert!(cache.get_stats().oldest_age_secs.is_none());

        cache.set("older", &1).unwrap();
        std::thread::sleep(Duration::from_millis(10));
        cache.set("newer", &2).unwrap();

        let stats = cache.get_stats();
        assert_eq!(stats.entries, 2);
        let oldest = stats.oldest_age_secs.unwrap();
        let newest = stats.newest_age_secs.unwrap();
        assert!(oldest > newest);
    }

    #[test]
    fn delete_and_clear_work() {
        let cache = TtlCache::new();
        cache.set("a", &1).unwrap();
        cache.set("b", &2).unwrap();
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        cache.clear();
        assert_eq!(cache.get_stats().entries, 0);
    }
}
