//! Read-through cache in front of a secret backend.
//!
//! [`CachedSecretBackend`] wraps any [`SecretBackend`] and consults a
//! [`SecretCache`] on single-secret reads. A hit under either key skips the
//! backend. A miss populates both the by-id and the by-name entry.
//!
//! Every mutation invalidates both keys of the affected secret. Deletes and
//! replaces look the record up first so that the key the caller did not
//! supply is known too.
//!
//! By-name keys carry the current tenant's domain. When no tenant is bound
//! the by-name entry is skipped and the backend is read directly.
//!
//! A read that misses records the tenant's invalidation generation before
//! going to the backend and only populates if no invalidation happened in
//! between. A mutation racing a slow read therefore cannot leave the old
//! record behind for a whole TTL.
//!
//! The cache holds exactly what the backend returned, so cached values are
//! ciphertext.

use crate::domain::{Secret, SecretId, SecretType, TenantId};
use crate::errors::Result;
use crate::observability::SecretMetrics;
use crate::secrets::backends::{
    SecretBackend, SecretByIdCacheKey, SecretByNameCacheKey, SecretCache, SecretCacheKey,
};
use crate::secrets::context::TenantContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, Instrument};

/// Caching decorator for a secret backend
#[derive(Debug, Clone)]
pub struct CachedSecretBackend {
    inner: Arc<dyn SecretBackend>,
    cache: Arc<dyn SecretCache>,
    tenant_context: Arc<dyn TenantContext>,
    metrics: SecretMetrics,
    /// Invalidation count per tenant; populate and invalidate hold this lock
    generations: Arc<Mutex<HashMap<TenantId, u64>>>,
}

impl CachedSecretBackend {
    pub fn new(
        inner: Arc<dyn SecretBackend>,
        cache: Arc<dyn SecretCache>,
        tenant_context: Arc<dyn TenantContext>,
    ) -> Self {
        Self {
            inner,
            cache,
            tenant_context,
            metrics: SecretMetrics::new(),
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn id_key(id: &SecretId) -> SecretCacheKey {
        SecretByIdCacheKey::new(id.clone()).into()
    }

    fn name_key(&self, secret_type: &str, name: &str) -> Option<SecretCacheKey> {
        self.tenant_context
            .current_tenant_domain()
            .map(|domain| SecretByNameCacheKey::new(secret_type, name, domain).into())
    }

    async fn lookup(&self, key: &SecretCacheKey, tenant_id: TenantId) -> Option<Secret> {
        let cached = self.cache.get(key, tenant_id).await;
        self.metrics.record_cache_lookup(key.kind(), cached.is_some());
        cached
    }

    async fn generation(&self, tenant_id: TenantId) -> u64 {
        self.generations.lock().await.get(&tenant_id).copied().unwrap_or(0)
    }

    /// Populate both keys for a freshly read secret, unless the tenant saw
    /// an invalidation since `observed` was taken
    async fn populate(&self, secret: &Secret, tenant_id: TenantId, observed: u64) {
        let generations = self.generations.lock().await;
        if generations.get(&tenant_id).copied().unwrap_or(0) != observed {
            debug!(tenant_id, secret_id = secret.id_str(), "Skipped caching a superseded read");
            return;
        }

        if let Some(id) = secret.secret_id.as_ref() {
            self.cache.put(Self::id_key(id), tenant_id, secret.clone()).await;
        }
        if let Some(key) = self.name_key(&secret.secret_type, &secret.secret_name) {
            self.cache.put(key, tenant_id, secret.clone()).await;
        }
    }

    async fn invalidate_key(&self, key: SecretCacheKey, tenant_id: TenantId) {
        let mut generations = self.generations.lock().await;
        let generation = generations.entry(tenant_id).or_insert(0);
        *generation = generation.wrapping_add(1);
        self.cache.invalidate(&key, tenant_id).await;
        self.metrics.record_cache_invalidation(key.kind());
    }

    /// Drop both entries of a secret
    async fn invalidate_secret(&self, secret: &Secret, tenant_id: TenantId) {
        if let Some(id) = secret.secret_id.as_ref() {
            self.invalidate_key(Self::id_key(id), tenant_id).await;
        }
        if let Some(key) = self.name_key(&secret.secret_type, &secret.secret_name) {
            self.invalidate_key(key, tenant_id).await;
        }
    }
}

#[async_trait]
impl SecretBackend for CachedSecretBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn add(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        self.inner.add(secret, tenant_id).await?;
        // Clears any stale entry left under the same name
        self.invalidate_secret(secret, tenant_id).await;
        Ok(())
    }

    async fn get_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Secret>> {
        let key = self.name_key(secret_type.name(), name);
        if let Some(key) = key.as_ref() {
            if let Some(secret) = self.lookup(key, tenant_id).await {
                return Ok(Some(secret));
            }
        }

        let observed = self.generation(tenant_id).await;
        let fetched = self
            .inner
            .get_by_name(name, secret_type, tenant_id)
            .instrument(crate::secret_span!("cache_fill", tenant_id = tenant_id, key = "name"))
            .await?;
        if let Some(secret) = fetched.as_ref() {
            self.populate(secret, tenant_id, observed).await;
        }
        Ok(fetched)
    }

    async fn get_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>> {
        if let Some(secret) = self.lookup(&Self::id_key(id), tenant_id).await {
            return Ok(Some(secret));
        }

        let observed = self.generation(tenant_id).await;
        let fetched = self
            .inner
            .get_by_id(id, tenant_id)
            .instrument(crate::secret_span!("cache_fill", tenant_id = tenant_id, key = "id"))
            .await?;
        if let Some(secret) = fetched.as_ref() {
            self.populate(secret, tenant_id, observed).await;
        }
        Ok(fetched)
    }

    async fn get_list(
        &self,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Vec<Secret>>> {
        self.inner.get_list(secret_type, tenant_id).await
    }

    async fn delete_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<()> {
        let existing = self.inner.get_by_name(name, secret_type, tenant_id).await?;
        self.inner.delete_by_name(name, secret_type, tenant_id).await?;

        match existing {
            Some(secret) => self.invalidate_secret(&secret, tenant_id).await,
            None => {
                if let Some(key) = self.name_key(secret_type.name(), name) {
                    self.invalidate_key(key, tenant_id).await;
                }
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<()> {
        let existing = self.inner.get_by_id(id, tenant_id).await?;
        self.inner.delete_by_id(id, tenant_id).await?;

        self.invalidate_key(Self::id_key(id), tenant_id).await;
        if let Some(secret) = existing {
            self.invalidate_secret(&secret, tenant_id).await;
        }
        Ok(())
    }

    async fn replace(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        let previous = match secret.secret_id.as_ref() {
            Some(id) => self.inner.get_by_id(id, tenant_id).await?,
            None => None,
        };
        self.inner.replace(secret, tenant_id).await?;

        if let Some(previous) = previous {
            self.invalidate_secret(&previous, tenant_id).await;
        }
        self.invalidate_secret(secret, tenant_id).await;
        Ok(())
    }

    async fn update_value(
        &self,
        secret: &Secret,
        ciphertext: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let updated = self.inner.update_value(secret, ciphertext, tenant_id).await?;
        self.invalidate_secret(secret, tenant_id).await;
        debug!(tenant_id, secret_id = secret.id_str(), "Invalidated cache after value update");
        Ok(updated)
    }

    async fn update_description(
        &self,
        secret: &Secret,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let updated = self.inner.update_description(secret, description, tenant_id).await?;
        self.invalidate_secret(secret, tenant_id).await;
        debug!(tenant_id, secret_id = secret.id_str(), "Invalidated cache after description update");
        Ok(updated)
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}
