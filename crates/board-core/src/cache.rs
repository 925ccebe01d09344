//! In-process TTL cache with versioned composite keys.
//!
//! Mutations never delete entries: invalidation bumps a persistent per-kind
//! version counter (see [`crate::store::VersionStore`]) so keys built with
//! the old version simply become unreachable and expire via TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::trace;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe string cache with per-entry expiry.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. Expired entries are dropped on read.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                trace!(key, "cache entry expired");
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, value: String, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Number of physically present entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a versioned composite cache key: `<kind>_v<version>_<params>`.
pub fn versioned_key(kind: &str, version: u64, params: &str) -> String {
    format!("{kind}_v{version}_{params}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VersionStore;

    struct MemVersions {
        versions: Mutex<HashMap<String, u64>>,
    }

    impl MemVersions {
        fn new() -> Self {
            Self {
                versions: Mutex::new(HashMap::new()),
            }
        }
    }

    impl VersionStore for MemVersions {
        fn cache_version(&self, kind: &str) -> anyhow::Result<u64> {
            Ok(*self.versions.lock().unwrap().get(kind).unwrap_or(&0))
        }

        fn bump_cache_version(&self, kind: &str) -> anyhow::Result<u64> {
            let mut versions = self.versions.lock().unwrap();
            let v = versions.entry(kind.to_string()).or_insert(0);
            *v += 1;
            Ok(*v)
        }
    }

    #[test]
    fn put_get_remove() {
        let cache = TtlCache::new();
        cache.put("k", "v".into(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        cache.remove("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = TtlCache::new();
        cache.put("k", "v".into(), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        // dropped on read
        assert!(cache.is_empty());
    }

    #[test]
    fn versioned_key_format() {
        assert_eq!(versioned_key("users", 0, "all"), "users_v0_all");
        assert_eq!(versioned_key("users", 3, "id_7"), "users_v3_id_7");
    }

    /// Bumping the version makes old entries unreachable even though they
    /// are still physically present and unexpired.
    #[test]
    fn version_bump_invalidates_without_deletion() {
        let cache = TtlCache::new();
        let versions = MemVersions::new();

        let v0 = versions.cache_version("users").unwrap();
        let key0 = versioned_key("users", v0, "all");
        cache.put(&key0, "snapshot-v0".into(), Duration::from_secs(300));
        assert_eq!(cache.get(&key0), Some("snapshot-v0".to_string()));

        let v1 = versions.bump_cache_version("users").unwrap();
        assert_eq!(v1, 1);

        let key1 = versioned_key("users", v1, "all");
        // New key misses, forcing a fresh read...
        assert_eq!(cache.get(&key1), None);
        // ...while the orphaned v0 entry still exists until its TTL.
        assert_eq!(cache.get(&key0), Some("snapshot-v0".to_string()));
        assert_eq!(cache.len(), 1);
    }
}
