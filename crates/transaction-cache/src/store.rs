//! In-memory namespaced cache with TTL expiration.

use crate::error::CacheError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Entry in the cache with expiration tracking.
///
/// Values are kept in their serialized form, the same way an external
/// key-value service would hold them, so callers always get an independent
/// copy back.
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Composite key: namespace plus entry key.
type EntryKey = (String, String);

/// In-memory key-value cache partitioned into namespaces.
///
/// Every entry carries its own TTL. Expired entries are invisible to readers
/// immediately and are physically removed by [`TtlCache::purge_expired`],
/// which the sweeper task calls periodically.
#[derive(Clone, Default)]
pub struct TtlCache {
    entries: Arc<RwLock<HashMap<EntryKey, CacheEntry>>>,
}

impl TtlCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache and spawn its sweeper on the current runtime.
    pub fn with_sweeper(interval: Duration) -> Self {
        let cache = Self::new();
        cache.spawn_sweeper(interval);

        info!("In-memory transaction cache initialized (sweep_interval={:?})", interval);

        cache
    }

    /// Spawn a background task that periodically drops expired entries.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                cache.purge_expired().await;
            }
        })
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before_count = entries.len();

        entries.retain(|_, entry| entry.expires_at > now);

        let removed = before_count - entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    /// Get a live value from a namespace.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<T>, CacheError> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        match entries
            .get(&(namespace.to_string(), key.to_string()))
            .filter(|entry| entry.expires_at > now)
        {
            Some(entry) => Ok(Some(serde_json::from_slice(&entry.value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a value, resetting its TTL.
    #[instrument(skip(self, value))]
    pub async fn put<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(CacheError::InvalidTtl(ttl))?;
        let value = serde_json::to_vec(value)?;

        let mut entries = self.entries.write().await;
        entries.insert(
            (namespace.to_string(), key.to_string()),
            CacheEntry { value, expires_at },
        );

        Ok(())
    }

    /// Remove an entry. Returns whether a live entry was removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, namespace: &str, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries
            .remove(&(namespace.to_string(), key.to_string()))
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Number of live entries in a namespace.
    pub async fn len(&self, namespace: &str) -> usize {
        let entries = self.entries.read().await;
        let now = Instant::now();
        entries
            .iter()
            .filter(|((ns, _), entry)| ns == namespace && entry.expires_at > now)
            .count()
    }

    /// Whether a namespace has no live entries.
    pub async fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace).await == 0
    }
}
