//! Time-stamped snapshot cache for timeline datasets.
//!
//! Entries never expire in storage; they are ignored once older than
//! [`FRESHNESS_WINDOW`]. Each entry is serialized as one JSON document
//! (timestamp and payload together), so a reader can't observe a payload
//! paired with another write's timestamp.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Profile, TimelineDataset};
use crate::storage::kv::KeyValueStore;

/// Maximum age at which a cached dataset is served without a network call.
pub const FRESHNESS_WINDOW: Duration = Duration::minutes(30);

/// Namespace prefix keeping cache keys apart from the profile key.
pub const CACHE_KEY_PREFIX: &str = "rumbo_cache";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub payload: TimelineDataset,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Cache key for a timeline request.
///
/// Covers every request field that changes the service's answer: the spot
/// and the whole profile, session goal included. A request without a
/// profile gets its own `anonymous` key.
pub fn cache_key(spot_id: &str, profile: Option<&Profile>) -> String {
    match profile {
        Some(p) => format!(
            "{}:{}:{}:{}:{}:{}",
            CACHE_KEY_PREFIX,
            spot_id,
            p.session_goal.as_wire(),
            p.board_type.as_wire(),
            p.experience.as_wire(),
            p.paddle_power.as_wire()
        ),
        None => format!("{}:{}:anonymous", CACHE_KEY_PREFIX, spot_id),
    }
}

#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Look up an entry. Backend failures and unreadable entries are logged
    /// and reported as absent so the caller falls through to a refetch.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for '{}', treating as miss: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.key == key => Some(entry),
            Ok(entry) => {
                tracing::warn!(
                    "Cache entry under '{}' belongs to '{}', treating as miss",
                    key,
                    entry.key
                );
                None
            }
            Err(e) => {
                tracing::warn!("Cache parse error for '{}', treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Store `payload` under `key`, stamped with the current instant.
    pub fn put(&self, key: &str, payload: &TimelineDataset) -> Result<CacheEntry, AppError> {
        self.put_at(key, payload, Utc::now())
    }

    /// Store `payload` under `key` with an explicit timestamp.
    pub fn put_at(
        &self,
        key: &str,
        payload: &TimelineDataset,
        timestamp: DateTime<Utc>,
    ) -> Result<CacheEntry, AppError> {
        let entry = CacheEntry {
            key: key.to_string(),
            timestamp,
            payload: payload.clone(),
        };
        let json = serde_json::to_string(&entry)?;
        self.store.set(key, &json)?;
        Ok(entry)
    }

    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        is_fresh_at(entry, Utc::now())
    }
}

/// `now - entry.timestamp < FRESHNESS_WINDOW`.
pub fn is_fresh_at(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    entry.age(now) < FRESHNESS_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionGoal;
    use crate::storage::kv::MemoryStore;
    use crate::test_support;

    fn cache() -> (Arc<MemoryStore>, CacheStore) {
        let backend = Arc::new(MemoryStore::new());
        (backend.clone(), CacheStore::new(backend))
    }

    #[test]
    fn test_key_differs_by_goal() {
        let calm = test_support::profile(SessionGoal::Calm);
        let training = test_support::profile(SessionGoal::Training);
        assert_ne!(
            cache_key("varese", Some(&calm)),
            cache_key("varese", Some(&training))
        );
    }

    #[test]
    fn test_key_with_goal_differs_from_unset() {
        let calm = test_support::profile(SessionGoal::Calm);
        assert_ne!(cache_key("varese", Some(&calm)), cache_key("varese", None));
    }

    #[test]
    fn test_key_differs_by_spot_and_board() {
        let calm = test_support::profile(SessionGoal::Calm);
        let inflatable = Profile {
            board_type: crate::models::BoardType::Inflatable,
            ..calm
        };
        assert_ne!(
            cache_key("varese", Some(&calm)),
            cache_key("playa-grande", Some(&calm))
        );
        assert_ne!(
            cache_key("varese", Some(&calm)),
            cache_key("varese", Some(&inflatable))
        );
    }

    #[test]
    fn test_key_is_deterministic() {
        let p = test_support::profile(SessionGoal::Challenge);
        assert_eq!(
            cache_key("varese", Some(&p)),
            "rumbo_cache:varese:desafio:rigid:intermediate:medium"
        );
        assert_eq!(cache_key("varese", None), "rumbo_cache:varese:anonymous");
    }

    #[test]
    fn test_put_then_get() {
        let (_, cache) = cache();
        let dataset = test_support::dataset(3);
        let stored = cache.put("k", &dataset).unwrap();

        let entry = cache.get("k").unwrap();
        assert_eq!(entry, stored);
        assert_eq!(entry.payload, dataset);
        assert!(cache.is_fresh(&entry));
    }

    #[test]
    fn test_put_overwrites() {
        let (_, cache) = cache();
        cache.put("k", &test_support::dataset(1)).unwrap();
        cache.put("k", &test_support::dataset(4)).unwrap();
        assert_eq!(cache.get("k").unwrap().payload.timeline.len(), 4);
    }

    #[test]
    fn test_get_missing() {
        let (_, cache) = cache();
        assert!(cache.get("nothing").is_none());
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let (backend, cache) = cache();
        backend.set("k", "{\"timestamp\": 12").unwrap();
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_entry_under_wrong_key_is_absent() {
        let (backend, cache) = cache();
        cache.put("a", &test_support::dataset(1)).unwrap();
        let raw = backend.get("a").unwrap().unwrap();
        backend.set("b", &raw).unwrap();
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_freshness_window() {
        let now = Utc::now();
        let entry = CacheEntry {
            key: "k".into(),
            timestamp: now - Duration::minutes(29),
            payload: test_support::dataset(1),
        };
        assert!(is_fresh_at(&entry, now));

        let stale = CacheEntry {
            timestamp: now - Duration::minutes(31),
            ..entry.clone()
        };
        assert!(!is_fresh_at(&stale, now));

        let boundary = CacheEntry {
            timestamp: now - Duration::minutes(30),
            ..entry
        };
        assert!(!is_fresh_at(&boundary, now));
    }
}
