use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::coordinator::Category;
use crate::storage::KeyValueStore;

/// Consider a snapshot stale after 1 hour.
/// Staleness is informational; stale snapshots are still served.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew (negative ages)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// Per-category snapshots of the last successful live fetch.
///
/// Snapshots of user-scoped categories belong to one owner (the session
/// subject) and are keyed by it. Without an owner those categories have no
/// snapshot at all.
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn cache_key(category: Category, owner: Option<&str>) -> Option<String> {
        if !category.requires_auth() {
            return Some(format!("snapshot_{}", category.key()));
        }
        // Base64url keeps arbitrary subjects inside the store's key alphabet
        owner.map(|owner| format!("snapshot_{}_{}", category.key(), URL_SAFE_NO_PAD.encode(owner)))
    }

    pub async fn load<T: DeserializeOwned>(
        &self,
        category: Category,
        owner: Option<&str>,
    ) -> Result<Option<CachedData<Vec<T>>>> {
        let Some(key) = Self::cache_key(category, owner) else {
            return Ok(None);
        };
        let Some(contents) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let cached: CachedData<Vec<T>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot: {}", category.key()))?;
        Ok(Some(cached))
    }

    /// Replace the snapshot for `category`. Only live results belong here.
    pub async fn save<T: Serialize>(
        &self,
        category: Category,
        owner: Option<&str>,
        items: &[T],
    ) -> Result<()> {
        let Some(key) = Self::cache_key(category, owner) else {
            debug!(category = category.key(), "No owner, snapshot not saved");
            return Ok(());
        };
        let cached = CachedData::new(items);
        let contents = serde_json::to_string(&cached)?;
        self.store
            .set(&key, &contents)
            .await
            .with_context(|| format!("Failed to write snapshot: {}", category.key()))?;
        debug!(category = category.key(), count = items.len(), "Snapshot saved");
        Ok(())
    }

    pub async fn clear(&self, category: Category, owner: Option<&str>) -> Result<()> {
        match Self::cache_key(category, owner) {
            Some(key) => self.store.delete(&key).await,
            None => Ok(()),
        }
    }

    /// Age of every snapshot visible to `owner`, for status display
    pub async fn ages(&self, owner: Option<&str>) -> Vec<(Category, Option<String>)> {
        let loads = Category::ALL.into_iter().map(|category| async move {
            let age = match self.load::<serde_json::Value>(category, owner).await {
                Ok(Some(cached)) => Some(cached.age_display()),
                Ok(None) => None,
                Err(e) => {
                    debug!(category = category.key(), error = %e, "Failed to load snapshot for age display");
                    None
                }
            };
            (category, age)
        });
        join_all(loads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_age_display_ranges() {
        let mut cached = CachedData::new(vec![1]);
        cached.cached_at = Utc::now() - Duration::minutes(5);
        assert_eq!(cached.age_display(), "5m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::hours(30);
        assert_eq!(cached.age_display(), "1d ago");

        cached.cached_at = Utc::now() + Duration::minutes(10);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_stale());
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let cache = SnapshotCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.load::<String>(Category::Trending, None).await.unwrap().is_none());

        cache
            .save(Category::Trending, None, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        let loaded = cache.load::<String>(Category::Trending, None).await.unwrap().unwrap();
        assert_eq!(loaded.data, vec!["a", "b"]);

        // Public snapshots are shared by every owner
        let loaded = cache.load::<String>(Category::Trending, Some("u1")).await.unwrap().unwrap();
        assert_eq!(loaded.data, vec!["a", "b"]);

        // Other categories are independent
        assert!(cache.load::<String>(Category::Popular, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("snapshot_popular", "{not json").await.unwrap();
        let cache = SnapshotCache::new(store);
        assert!(cache.load::<String>(Category::Popular, None).await.is_err());
    }

    #[tokio::test]
    async fn test_user_snapshots_are_per_owner() {
        let store = Arc::new(MemoryStore::new());
        let cache = SnapshotCache::new(store.clone());

        cache.save(Category::Bookings, Some("alice"), &[1, 2]).await.unwrap();

        let alice = cache.load::<u32>(Category::Bookings, Some("alice")).await.unwrap();
        assert_eq!(alice.unwrap().data, vec![1, 2]);
        assert!(cache.load::<u32>(Category::Bookings, Some("bob")).await.unwrap().is_none());
        assert!(cache.load::<u32>(Category::Bookings, None).await.unwrap().is_none());

        // Nothing is written without an owner
        cache.save(Category::Wishlist, None, &[7]).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_owner_keys_stay_in_key_alphabet() {
        let key = SnapshotCache::cache_key(Category::Reviews, Some("auth0|hiker@example.com")).unwrap();
        assert!(key.starts_with("snapshot_reviews_"));
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[tokio::test]
    async fn test_ages_lists_every_category() {
        let cache = SnapshotCache::new(Arc::new(MemoryStore::new()));
        cache.save(Category::Bookings, Some("u1"), &[1, 2]).await.unwrap();

        assert!(cache.ages(None).await.iter().all(|(_, age)| age.is_none()));
        let ages = cache.ages(Some("u1")).await;
        assert_eq!(ages.len(), Category::ALL.len());
        for (category, age) in ages {
            if category == Category::Bookings {
                assert_eq!(age.as_deref(), Some("just now"));
            } else {
                assert_eq!(age, None);
            }
        }
    }
}
