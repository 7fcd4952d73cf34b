//! Cache keys and the key-value cache that sits in front of secret reads
//!
//! A stored secret is addressable two ways: by its id, or by
//! (type, name, tenant domain). Both keys are plain value objects. The
//! cache itself is partitioned by tenant id so that one tenant can never
//! observe another tenant's entries even if two keys compare equal.

use crate::domain::{Secret, SecretId, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Addresses a cached secret by id
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SecretByIdCacheKey {
    pub secret_id: SecretId,
}

impl SecretByIdCacheKey {
    pub fn new(secret_id: SecretId) -> Self {
        Self { secret_id }
    }
}

/// Addresses a cached secret by type, name and tenant domain
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SecretByNameCacheKey {
    pub secret_type: String,
    pub secret_name: String,
    pub tenant_domain: String,
}

impl SecretByNameCacheKey {
    pub fn new(
        secret_type: impl Into<String>,
        secret_name: impl Into<String>,
        tenant_domain: impl Into<String>,
    ) -> Self {
        Self {
            secret_type: secret_type.into(),
            secret_name: secret_name.into(),
            tenant_domain: tenant_domain.into(),
        }
    }

    /// Key for a stored secret, using its own type, name and tenant domain
    pub fn for_secret(secret: &Secret) -> Self {
        Self::new(&secret.secret_type, &secret.secret_name, &secret.tenant_domain)
    }
}

/// Either kind of cache key
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum SecretCacheKey {
    ById(SecretByIdCacheKey),
    ByName(SecretByNameCacheKey),
}

impl SecretCacheKey {
    /// Label used for the `key` dimension of cache metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SecretCacheKey::ById(_) => "id",
            SecretCacheKey::ByName(_) => "name",
        }
    }
}

impl From<SecretByIdCacheKey> for SecretCacheKey {
    fn from(key: SecretByIdCacheKey) -> Self {
        SecretCacheKey::ById(key)
    }
}

impl From<SecretByNameCacheKey> for SecretCacheKey {
    fn from(key: SecretByNameCacheKey) -> Self {
        SecretCacheKey::ByName(key)
    }
}

/// Key-value cache consulted on the read path
///
/// Implementations decide eviction and expiry. Callers are responsible for
/// invalidating both keys of a secret whenever it changes.
#[async_trait]
pub trait SecretCache: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &SecretCacheKey, tenant_id: TenantId) -> Option<Secret>;

    async fn put(&self, key: SecretCacheKey, tenant_id: TenantId, secret: Secret);

    async fn invalidate(&self, key: &SecretCacheKey, tenant_id: TenantId);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    secret: Secret,
    inserted_at: Instant,
}

/// In-process TTL cache
///
/// Expired entries are dropped lazily on lookup or by `cleanup_expired`.
#[derive(Debug, Clone)]
pub struct TtlSecretCache {
    inner: Arc<RwLock<HashMap<(TenantId, SecretCacheKey), CacheEntry>>>,
    ttl: Duration,
}

impl TtlSecretCache {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    /// Create a new cache with default TTL (5 minutes)
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove expired entries
    pub async fn cleanup_expired(&self) {
        let ttl = self.ttl;
        let mut cache = self.inner.write().await;
        cache.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    pub async fn clear(&self) {
        debug!("Clearing entire secret cache");
        self.inner.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for TtlSecretCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

#[async_trait]
impl SecretCache for TtlSecretCache {
    async fn get(&self, key: &SecretCacheKey, tenant_id: TenantId) -> Option<Secret> {
        // HashMap lookup needs an owned tuple key
        let map_key = (tenant_id, key.clone());
        {
            let cache = self.inner.read().await;
            let entry = cache.get(&map_key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                debug!(tenant_id, key = key.kind(), "Cache hit for secret");
                return Some(entry.secret.clone());
            }
        }

        let mut cache = self.inner.write().await;
        // A put may have refreshed the entry while the lock was released
        if cache.get(&map_key).is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl) {
            cache.remove(&map_key);
            debug!(tenant_id, key = key.kind(), "Dropped expired cache entry");
        }
        None
    }

    async fn put(&self, key: SecretCacheKey, tenant_id: TenantId, secret: Secret) {
        debug!(tenant_id, key = key.kind(), ttl_secs = self.ttl.as_secs(), "Caching secret");
        self.inner
            .write()
            .await
            .insert((tenant_id, key), CacheEntry { secret, inserted_at: Instant::now() });
    }

    async fn invalidate(&self, key: &SecretCacheKey, tenant_id: TenantId) {
        debug!(tenant_id, key = key.kind(), "Invalidating cached secret");
        self.inner.write().await.remove(&(tenant_id, key.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str) -> Secret {
        let mut secret = Secret::new(name, "ciphertext").with_id(SecretId::new());
        secret.secret_type = "USER".to_string();
        secret.tenant_domain = "acme.com".to_string();
        secret
    }

    #[test]
    fn test_key_equality() {
        let id = SecretId::from("abc");
        assert_eq!(SecretByIdCacheKey::new(id.clone()), SecretByIdCacheKey::new(id));

        let a = SecretByNameCacheKey::new("USER", "db-pass", "acme.com");
        let b = SecretByNameCacheKey::new("USER", "db-pass", "acme.com");
        let other_tenant = SecretByNameCacheKey::new("USER", "db-pass", "other.com");
        assert_eq!(a, b);
        assert_ne!(a, other_tenant);
    }

    #[test]
    fn test_key_for_secret() {
        let secret = stored("db-pass");
        assert_eq!(
            SecretByNameCacheKey::for_secret(&secret),
            SecretByNameCacheKey::new("USER", "db-pass", "acme.com")
        );
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = TtlSecretCache::new(Duration::from_secs(60));
        let secret = stored("db-pass");
        let key: SecretCacheKey = SecretByNameCacheKey::for_secret(&secret).into();

        cache.put(key.clone(), 1, secret.clone()).await;
        assert_eq!(cache.get(&key, 1).await, Some(secret));
    }

    #[tokio::test]
    async fn test_partitioned_by_tenant() {
        let cache = TtlSecretCache::new(Duration::from_secs(60));
        let secret = stored("db-pass");
        let key: SecretCacheKey = SecretByIdCacheKey::new(SecretId::from("x")).into();

        cache.put(key.clone(), 1, secret).await;
        assert!(cache.get(&key, 2).await.is_none());
    }

    #[tokio::test]
    async fn test_expiration() {
        let cache = TtlSecretCache::new(Duration::from_millis(50));
        let key: SecretCacheKey = SecretByIdCacheKey::new(SecretId::from("x")).into();
        cache.put(key.clone(), 1, stored("db-pass")).await;
        assert!(cache.get(&key, 1).await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get(&key, 1).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let cache = TtlSecretCache::new(Duration::from_millis(50));
        let key: SecretCacheKey = SecretByIdCacheKey::new(SecretId::from("x")).into();
        cache.put(key, 1, stored("db-pass")).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.len().await, 1);
        cache.cleanup_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = TtlSecretCache::default();
        let key: SecretCacheKey = SecretByIdCacheKey::new(SecretId::from("x")).into();
        cache.put(key.clone(), 1, stored("db-pass")).await;

        cache.invalidate(&key, 1).await;
        assert!(cache.get(&key, 1).await.is_none());
    }
}
