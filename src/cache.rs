use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store used as a best-effort accelerator. Values are opaque bytes.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local cache with per-entry expiry
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included until the next read or write
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        debug!(key = %key, bytes = value.len(), ttl_secs = ttl.as_secs(), "Caching entry");
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            CacheError::Backend(format!("TTL of {}s is out of range", ttl.as_secs()))
        })?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    debug!(key = %key, "Cache hit");
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    debug!(key = %key, "Cache miss");
                    return Ok(None);
                }
            }
        }

        // Expired: evict unless a writer refreshed it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        debug!(key = %key, "Cache entry expired");
        Ok(None)
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        debug!(key = %key, "Evicting cache entry");
        self.entries.write().await.remove(key);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|entry| !entry.is_expired(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let cache = InMemoryCacheStore::new();
        cache
            .set("user:1", b"payload".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("user:1").await.unwrap(), Some(b"payload".to_vec()));
        assert!(cache.exists("user:1").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let cache = InMemoryCacheStore::new();
        assert_eq!(cache.get("user:404").await.unwrap(), None);
        assert!(!cache.exists("user:404").await.unwrap());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_evicted() {
        let cache = InMemoryCacheStore::new();
        cache
            .set("user:1", b"stale".to_vec(), Duration::ZERO)
            .await
            .unwrap();

        assert!(!cache.exists("user:1").await.unwrap());
        assert_eq!(cache.get("user:1").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_an_error() {
        let cache = InMemoryCacheStore::new();
        let result = cache
            .set("user:1", b"payload".to_vec(), Duration::from_secs(u64::MAX))
            .await;

        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let cache = InMemoryCacheStore::new();
        for key in ["user:1", "user:2"] {
            cache.set(key, b"stale".to_vec(), Duration::ZERO).await.unwrap();
        }

        cache
            .set("user:3", b"fresh".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.exists("user:3").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCacheStore::new();
        cache
            .set("user:1", b"payload".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete("user:1").await.unwrap();

        assert_eq!(cache.get("user:1").await.unwrap(), None);
        // Deleting an absent key is not an error
        cache.delete("user:1").await.unwrap();
    }
}
