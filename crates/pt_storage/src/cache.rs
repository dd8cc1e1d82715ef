use pt_core::{Clock, Result, StateBackend};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize, Deserialize)]
struct CacheItem<T> {
    data: T,
    /// Milliseconds since the epoch at insertion.
    timestamp: i64,
}

/// Expiring entries on top of a [`StateBackend`]. Expired or unreadable
/// entries are removed on read.
pub struct TtlCache {
    backend: Arc<dyn StateBackend>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(backend: Arc<dyn StateBackend>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { backend, clock, ttl }
    }

    fn is_stale(&self, timestamp: i64) -> bool {
        let age = self.clock.now().timestamp_millis() - timestamp;
        age > self.ttl.as_millis() as i64
    }

    pub async fn set<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let item = CacheItem {
            data,
            timestamp: self.clock.now().timestamp_millis(),
        };
        self.backend.save(key, &serde_json::to_string(&item)?).await
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.load(key).await? else {
            return Ok(None);
        };

        let item: CacheItem<T> = match serde_json::from_str(&raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(key, "dropping unreadable cache entry: {}", e);
                self.backend.remove(key).await?;
                return Ok(None);
            }
        };

        if self.is_stale(item.timestamp) {
            tracing::debug!(key, "cache entry expired");
            self.backend.remove(key).await?;
            return Ok(None);
        }

        Ok(Some(item.data))
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove(key).await
    }

    pub async fn is_expired(&self, key: &str) -> Result<bool> {
        let Some(raw) = self.backend.load(key).await? else {
            return Ok(true);
        };
        Ok(match serde_json::from_str::<CacheItem<serde_json::Value>>(&raw) {
            Ok(item) => self.is_stale(item.timestamp),
            Err(_) => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use chrono::{Duration as ChronoDuration, Utc};
    use pt_core::ManualClock;

    fn setup() -> (TtlCache, Arc<ManualClock>, Arc<MemoryBackend>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let backend = Arc::new(MemoryBackend::new());
        let cache = TtlCache::new(backend.clone(), clock.clone(), Duration::from_secs(300));
        (cache, clock, backend)
    }

    #[tokio::test]
    async fn test_get_within_ttl() {
        let (cache, clock, _) = setup();
        cache.set("article-x", &vec!["a".to_string()]).await.unwrap();
        clock.advance(ChronoDuration::minutes(4));

        let hit: Option<Vec<String>> = cache.get("article-x").await.unwrap();
        assert_eq!(hit, Some(vec!["a".to_string()]));
        assert!(!cache.is_expired("article-x").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed() {
        let (cache, clock, backend) = setup();
        cache.set("article-x", &42u32).await.unwrap();
        clock.advance(ChronoDuration::minutes(6));

        assert!(cache.is_expired("article-x").await.unwrap());
        let miss: Option<u32> = cache.get("article-x").await.unwrap();
        assert!(miss.is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_a_miss() {
        let (cache, _, backend) = setup();
        backend.save("article-x", "garbage").await.unwrap();

        let miss: Option<u32> = cache.get("article-x").await.unwrap();
        assert!(miss.is_none());
        assert!(cache.is_expired("missing").await.unwrap());
    }
}
