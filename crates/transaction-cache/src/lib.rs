//! Namespaced key-value cache with per-entry expiry.
//!
//! Stands in for an external key-value service: values are stored
//! serialized, every entry has its own TTL, and an expired entry is
//! indistinguishable from a missing one.

mod error;
mod store;

pub use error::CacheError;
pub use store::TtlCache;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    fn sample(count: u32) -> Sample {
        Sample {
            name: "sample".into(),
            count,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "key1", &sample(1), Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<Sample> = cache.get("alpha", "key1").await.unwrap();
        assert_eq!(value, Some(sample(1)));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = TtlCache::new();

        let value: Option<Sample> = cache.get("alpha", "missing").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "key1", &sample(1), Duration::from_secs(60))
            .await
            .unwrap();

        let other: Option<Sample> = cache.get("beta", "key1").await.unwrap();
        assert!(other.is_none());
        assert_eq!(cache.len("alpha").await, 1);
        assert!(cache.is_empty("beta").await);
    }

    #[tokio::test]
    async fn test_put_replaces_value() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "key1", &sample(1), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .put("alpha", "key1", &sample(2), Duration::from_secs(60))
            .await
            .unwrap();

        let value: Sample = cache.get("alpha", "key1").await.unwrap().unwrap();
        assert_eq!(value.count, 2);
        assert_eq!(cache.len("alpha").await, 1);
    }

    #[tokio::test]
    async fn test_returned_value_is_a_copy() {
        let cache = TtlCache::new();
        cache
            .put("alpha", "key1", &sample(1), Duration::from_secs(60))
            .await
            .unwrap();

        let mut value: Sample = cache.get("alpha", "key1").await.unwrap().unwrap();
        value.count = 99;

        let stored: Sample = cache.get("alpha", "key1").await.unwrap().unwrap();
        assert_eq!(stored.count, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = TtlCache::new();
        cache
            .put("alpha", "key1", &sample(1), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.remove("alpha", "key1").await);
        assert!(!cache.remove("alpha", "key1").await);

        let value: Option<Sample> = cache.get("alpha", "key1").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "key1", &sample(1), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get::<Sample>("alpha", "key1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get::<Sample>("alpha", "key1").await.unwrap().is_none());
        assert_eq!(cache.len("alpha").await, 0);
    }

    #[tokio::test]
    async fn test_ttl_refresh_on_put() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "key1", &sample(1), Duration::from_millis(100))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        // Re-putting resets the expiry
        cache
            .put("alpha", "key1", &sample(1), Duration::from_millis(100))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get::<Sample>("alpha", "key1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = TtlCache::new();

        cache
            .put("alpha", "short", &sample(1), Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .put("alpha", "long", &sample(2), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.get::<Sample>("alpha", "long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = TtlCache::with_sweeper(Duration::from_millis(20));

        cache
            .put("alpha", "key1", &sample(1), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_serialization_error() {
        let cache = TtlCache::new();
        cache
            .put("alpha", "key1", &"just a string", Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get::<Sample>("alpha", "key1").await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_rejected() {
        let cache = TtlCache::new();

        let result = cache
            .put("alpha", "key1", &sample(1), Duration::MAX)
            .await;

        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
        assert!(cache.is_empty("alpha").await);
    }
}
