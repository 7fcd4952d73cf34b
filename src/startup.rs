//! Startup wiring for the secret manager
//!
//! Turns an [`AppConfig`] into a ready [`SecretManager`]:
//! - AES-256-GCM crypto from the encryption section (required)
//! - PostgreSQL backend when a database is configured, in-memory otherwise
//! - read-through TTL cache in front of the backend when enabled

use crate::config::AppConfig;
use crate::errors::{Result, SecretManagementError};
use crate::secrets::backends::{
    DatabaseSecretBackend, InMemorySecretBackend, SecretBackend, SecretBackendRegistry,
    TtlSecretCache,
};
use crate::secrets::{CachedSecretBackend, TenantContext};
use crate::services::{SecretEncryption, SecretManager};
use crate::storage::create_pool;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Build a secret manager from configuration
pub async fn build_secret_manager(
    config: &AppConfig,
    tenant_context: Arc<dyn TenantContext>,
) -> Result<SecretManager> {
    let span = crate::secret_span!("build_secret_manager");
    async move {
        let encryption = config.encryption.as_ref().ok_or_else(|| {
            SecretManagementError::config("encryption.master_key_base64 must be set")
        })?;
        let crypto = SecretEncryption::new(encryption)?;

        let backend: Arc<dyn SecretBackend> = match &config.database {
            Some(database) => Arc::new(DatabaseSecretBackend::new(create_pool(database).await?)),
            None => {
                warn!("No database configured, secrets are held in memory only");
                Arc::new(InMemorySecretBackend::new())
            }
        };

        let backend: Arc<dyn SecretBackend> = if config.cache.enabled {
            Arc::new(CachedSecretBackend::new(
                backend,
                Arc::new(TtlSecretCache::new(config.cache.ttl())),
                tenant_context.clone(),
            ))
        } else {
            backend
        };

        let registry = SecretBackendRegistry::single(backend);
        let manager =
            SecretManager::new(&config.secrets, registry, Arc::new(crypto), tenant_context)?;

        info!(
            backends = ?manager.registry().registered_backends(),
            cache_enabled = config.cache.enabled,
            key_version = %encryption.key_version,
            "Secret manager ready"
        );
        Ok(manager)
    }
    .instrument(span)
    .await
}
