//! Transaction storage keyed by phase and token.

use super::{Phase, RegistrationTransaction};
use crate::error::SignupError;
use async_trait::async_trait;
use std::time::Duration;
use transaction_cache::TtlCache;

/// Phase-namespaced store for registration transactions.
///
/// Entries expire after the TTL given on `put`; an expired entry reads as
/// absent.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn get(
        &self,
        phase: Phase,
        token: &str,
    ) -> Result<Option<RegistrationTransaction>, SignupError>;

    async fn put(
        &self,
        phase: Phase,
        token: &str,
        transaction: &RegistrationTransaction,
        ttl: Duration,
    ) -> Result<(), SignupError>;

    async fn evict(&self, phase: Phase, token: &str) -> Result<(), SignupError>;
}

/// [`TransactionStore`] backed by the in-memory TTL cache.
#[derive(Clone, Default)]
pub struct CacheTransactionStore {
    cache: TtlCache,
}

impl CacheTransactionStore {
    pub fn new(cache: TtlCache) -> Self {
        Self { cache }
    }

    /// Underlying cache.
    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }
}

#[async_trait]
impl TransactionStore for CacheTransactionStore {
    async fn get(
        &self,
        phase: Phase,
        token: &str,
    ) -> Result<Option<RegistrationTransaction>, SignupError> {
        Ok(self.cache.get(phase.namespace(), token).await?)
    }

    async fn put(
        &self,
        phase: Phase,
        token: &str,
        transaction: &RegistrationTransaction,
        ttl: Duration,
    ) -> Result<(), SignupError> {
        Ok(self
            .cache
            .put(phase.namespace(), token, transaction, ttl)
            .await?)
    }

    async fn evict(&self, phase: Phase, token: &str) -> Result<(), SignupError> {
        self.cache.remove(phase.namespace(), token).await;
        Ok(())
    }
}
