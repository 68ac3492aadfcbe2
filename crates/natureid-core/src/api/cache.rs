//! Persistent cache of raw API responses.
//!
//! Entries are keyed by request signature and hold the fetch time (unix
//! seconds) plus the raw JSON payload. The whole cache lives in one JSON file
//! that is read when the cache is opened and written back on `flush` and on
//! drop. Entries are never deleted, only refreshed once they are stale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::NatureIdError;

/// Default time-to-live for cached responses: two weeks.
pub const DEFAULT_TTL: Duration = Duration::from_secs(14 * 24 * 3600);

/// One cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fetch time in seconds since the unix epoch
    pub fetched_at: u64,
    /// Raw JSON response
    pub payload: serde_json::Value,
}

/// Request-signature → response cache with time-based expiry.
pub struct ApiCache {
    path: Option<PathBuf>,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
    dirty: bool,
}

impl ApiCache {
    /// Open the cache file at `path`, starting empty if it does not exist.
    ///
    /// An unreadable file is an error; a file that does not parse is logged
    /// and replaced on the next flush.
    pub fn open(path: &Path, ttl: Duration) -> Result<Self, NatureIdError> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt API cache {:?}: {}", path, e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        tracing::debug!("Opened API cache {:?} with {} entries", path, entries.len());

        Ok(Self {
            path: Some(path.to_path_buf()),
            ttl,
            entries,
            dirty: false,
        })
    }

    /// A cache that is never written to disk.
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            path: None,
            ttl,
            entries: HashMap::new(),
            dirty: false,
        }
    }

    /// Fresh payload for `key` at time `now`, or `None` when missing or stale.
    ///
    /// An entry fetched at `T` is fresh for `now < T + ttl`.
    pub fn get(&self, key: &str, now: u64) -> Option<&serde_json::Value> {
        let entry = self.entries.get(key)?;
        if now < entry.fetched_at.saturating_add(self.ttl.as_secs()) {
            Some(&entry.payload)
        } else {
            None
        }
    }

    /// Insert or refresh an entry.
    pub fn insert(&mut self, key: impl Into<String>, now: u64, payload: serde_json::Value) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                fetched_at: now,
                payload,
            },
        );
        self.dirty = true;
    }

    /// Write pending changes to disk (no-op for in-memory caches).
    ///
    /// Writes to a sibling temp file and renames it over the cache so a crash
    /// mid-write never leaves a truncated cache behind.
    pub fn flush(&mut self) -> Result<(), NatureIdError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_vec(&self.entries)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, path)?;

        tracing::debug!("Flushed {} API cache entries to {:?}", self.entries.len(), path);
        self.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ApiCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!("Failed to write API cache: {e}");
        }
    }
}

/// Current time in seconds since the unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DAY: u64 = 24 * 3600;

    #[test]
    fn test_fresh_before_ttl() {
        let mut cache = ApiCache::in_memory(DEFAULT_TTL);
        let t = 1_700_000_000;
        cache.insert("k", t, json!({"results": []}));

        assert!(cache.get("k", t).is_some());
        assert!(cache.get("k", t + 14 * DAY - 1).is_some());
    }

    #[test]
    fn test_stale_at_ttl() {
        let mut cache = ApiCache::in_memory(DEFAULT_TTL);
        let t = 1_700_000_000;
        cache.insert("k", t, json!({"results": []}));

        assert!(cache.get("k", t + 14 * DAY).is_none());
        assert!(cache.get("k", t + 30 * DAY).is_none());
    }

    #[test]
    fn test_missing_key() {
        let cache = ApiCache::in_memory(DEFAULT_TTL);
        assert!(cache.get("nope", 0).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_refresh_replaces_entry() {
        let mut cache = ApiCache::in_memory(DEFAULT_TTL);
        cache.insert("k", 0, json!(1));
        cache.insert("k", 20 * DAY, json!(2));
        assert_eq!(cache.get("k", 20 * DAY), Some(&json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("api.cache.json");

        {
            let mut cache = ApiCache::open(&path, DEFAULT_TTL).unwrap();
            cache.insert("https://example.org/taxa/1", 100, json!({"results": [{"id": 1}]}));
            cache.flush().unwrap();
        }

        let cache = ApiCache::open(&path, DEFAULT_TTL).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("https://example.org/taxa/1", 100),
            Some(&json!({"results": [{"id": 1}]}))
        );
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.cache.json");

        {
            let mut cache = ApiCache::open(&path, DEFAULT_TTL).unwrap();
            cache.insert("k", 5, json!("v"));
        }

        assert!(path.exists());
        let cache = ApiCache::open(&path, DEFAULT_TTL).unwrap();
        assert_eq!(cache.get("k", 5), Some(&json!("v")));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.cache.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = ApiCache::open(&path, DEFAULT_TTL).unwrap();
        assert!(cache.is_empty());
    }
}
