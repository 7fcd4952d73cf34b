//! Secret manager service
//!
//! The façade every caller goes through. Each operation runs the same
//! pipeline:
//!
//! 1. refuse if secret management is switched off
//! 2. read the tenant once from the injected context
//! 3. validate the request (no backend is touched when this fails)
//! 4. resolve the backend of record from the registry
//! 5. encrypt before writing, decrypt after reading
//!
//! Values handed to a backend are always ciphertext. Values handed back to
//! the caller are always plaintext. Neither is ever logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, Span};
use zeroize::Zeroizing;

use crate::config::SecretManagerConfig;
use crate::domain::{Secret, SecretId, SecretType, Secrets, Tenant, TenantId};
use crate::errors::{ErrorMessage, Result, SecretManagementError};
use crate::observability::metrics::{outcome_label, SecretMetrics};
use crate::secrets::backends::{SecretBackend, SecretBackendRegistry};
use crate::secrets::context::{FeatureFlag, TenantContext};
use crate::secrets::SecretString;
use crate::services::secret_encryption::CryptoProvider;
use crate::validation::{is_blank, SecretValidator};

/// Tenant-scoped secret management façade
///
/// Cheap to clone; clones share the same collaborators. Holds no per-call
/// state.
#[derive(Debug, Clone)]
pub struct SecretManager {
    validator: Arc<SecretValidator>,
    registry: SecretBackendRegistry,
    crypto: Arc<dyn CryptoProvider>,
    tenant_context: Arc<dyn TenantContext>,
    feature_flag: Arc<dyn FeatureFlag>,
    metrics: SecretMetrics,
}

impl SecretManager {
    /// Create a new secret manager
    ///
    /// The enabled switch starts out as `config.enabled`; use
    /// [`SecretManager::with_feature_flag`] to make it dynamic.
    pub fn new(
        config: &SecretManagerConfig,
        registry: SecretBackendRegistry,
        crypto: Arc<dyn CryptoProvider>,
        tenant_context: Arc<dyn TenantContext>,
    ) -> Result<Self> {
        let validator = SecretValidator::new(config)?;

        if registry.is_empty() {
            debug!("Secret manager created without a backend");
        }

        Ok(Self {
            validator: Arc::new(validator),
            registry,
            crypto,
            tenant_context,
            feature_flag: Arc::new(config.enabled),
            metrics: SecretMetrics::new(),
        })
    }

    /// Replace the enabled switch
    pub fn with_feature_flag(mut self, feature_flag: Arc<dyn FeatureFlag>) -> Self {
        self.feature_flag = feature_flag;
        self
    }

    pub fn registry(&self) -> &SecretBackendRegistry {
        &self.registry
    }

    /// Store a new secret of the given type
    ///
    /// Returns the secret as the caller supplied it, with the generated id
    /// and type filled in and the plaintext value.
    #[instrument(
        skip(self, secret),
        fields(secret_type = %secret_type, secret_name = %secret.secret_name, tenant_id)
    )]
    pub async fn add_secret(&self, secret_type: &str, secret: Secret) -> Result<Secret> {
        self.observe("add_secret", async move {
            let tenant = self.begin()?;
            self.validator.validate_secret_type(secret_type)?;
            if is_blank(&secret.secret_name) || secret.secret_value.is_blank() {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretAddRequestInvalid,
                    None,
                ));
            }
            self.validator.validate_secret_name(&secret.secret_name)?;
            self.validator.validate_secret_value(secret.secret_value.expose_secret())?;
            self.validator.validate_secret_description(secret.description.as_deref())?;

            let secret_type = SecretType::new(secret_type);
            let backend = self.registry.select()?;

            let lookup =
                fetch_by_name(backend.as_ref(), &secret_type, &secret.secret_name, tenant.id).await;
            if exists(lookup)? {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretAlreadyExists,
                    Some(&secret.secret_name),
                ));
            }

            let mut secret = secret;
            let secret_id = SecretId::new();
            secret.secret_id = Some(secret_id.clone());
            secret.secret_type = secret_type.name().to_string();
            secret.tenant_domain = tenant.domain.clone();

            let ciphertext =
                self.encrypt(&secret.secret_value, ErrorMessage::AddSecret, &secret.secret_name)?;
            backend.add(&secret.clone().with_value(ciphertext), tenant.id).await?;

            info!(tenant_id = tenant.id, secret_id = %secret_id, "Secret added");
            Ok(secret)
        })
        .await
    }

    /// Fetch a secret by type and name
    #[instrument(skip(self), fields(tenant_id))]
    pub async fn get_secret(&self, secret_type: &str, name: &str) -> Result<Secret> {
        self.observe("get_secret", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;
            if is_blank(name) {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretGetRequestInvalid,
                    None,
                ));
            }

            let backend = self.registry.select()?;
            let stored = fetch_by_name(backend.as_ref(), &secret_type, name, tenant.id).await?;
            self.decrypt(stored)
        })
        .await
    }

    /// Fetch a secret by id
    #[instrument(skip(self), fields(secret_id = %secret_id, tenant_id))]
    pub async fn get_secret_by_id(&self, secret_id: &SecretId) -> Result<Secret> {
        self.observe("get_secret_by_id", async move {
            let tenant = self.begin()?;
            require_id(secret_id)?;

            let backend = self.registry.select()?;
            let stored = fetch_by_id(backend.as_ref(), secret_id, tenant.id).await?;
            self.decrypt(stored)
        })
        .await
    }

    /// List every secret of a type
    #[instrument(skip(self), fields(tenant_id))]
    pub async fn get_secrets(&self, secret_type: &str) -> Result<Secrets> {
        self.observe("get_secrets", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;

            let backend = self.registry.select()?;
            let stored = backend
                .get_list(&secret_type, tenant.id)
                .await?
                .filter(|secrets| !secrets.is_empty())
                .ok_or_else(|| {
                    SecretManagementError::client(
                        ErrorMessage::SecretsDoNotExist,
                        Some(secret_type.name()),
                    )
                })?;

            stored.into_iter().map(|secret| self.decrypt(secret)).collect::<Result<Secrets>>()
        })
        .await
    }

    /// Delete a secret by type and name
    #[instrument(skip(self), fields(tenant_id))]
    pub async fn delete_secret(&self, secret_type: &str, name: &str) -> Result<()> {
        self.observe("delete_secret", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;
            if is_blank(name) {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretDeleteRequestRequired,
                    None,
                ));
            }

            let backend = self.registry.select()?;
            if !exists(fetch_by_name(backend.as_ref(), &secret_type, name, tenant.id).await)? {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretDoesNotExist,
                    Some(name),
                ));
            }

            backend.delete_by_name(name, &secret_type, tenant.id).await?;
            info!(tenant_id = tenant.id, secret_type = %secret_type, secret_name = %name, "Secret deleted");
            Ok(())
        })
        .await
    }

    /// Delete a secret by id
    #[instrument(skip(self), fields(secret_id = %secret_id, tenant_id))]
    pub async fn delete_secret_by_id(&self, secret_id: &SecretId) -> Result<()> {
        self.observe("delete_secret_by_id", async move {
            let tenant = self.begin()?;
            require_id(secret_id)?;

            let backend = self.registry.select()?;
            if !exists(fetch_by_id(backend.as_ref(), secret_id, tenant.id).await)? {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretIdDoesNotExist,
                    Some(secret_id.as_str()),
                ));
            }

            backend.delete_by_id(secret_id, tenant.id).await?;
            info!(tenant_id = tenant.id, secret_id = %secret_id, "Secret deleted");
            Ok(())
        })
        .await
    }

    /// Replace value and description of an existing secret
    ///
    /// The name is not replaceable this way: whatever name the caller sends
    /// is overwritten with the stored one.
    #[instrument(skip(self, secret), fields(secret_type = %secret_type, secret_id = secret.id_str(), tenant_id))]
    pub async fn replace_secret(&self, secret_type: &str, secret: Secret) -> Result<Secret> {
        self.observe("replace_secret", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;

            let secret_id = match secret.secret_id.as_ref() {
                Some(id) if !id.is_blank() && !secret.secret_value.is_blank() => id.clone(),
                _ => {
                    return Err(SecretManagementError::client(
                        ErrorMessage::SecretReplaceRequestInvalid,
                        None,
                    ))
                }
            };
            self.validator.validate_secret_value(secret.secret_value.expose_secret())?;
            self.validator.validate_secret_description(secret.description.as_deref())?;

            let backend = self.registry.select()?;
            let existing = fetch_by_id(backend.as_ref(), &secret_id, tenant.id).await?;

            // Retyping must not collide with a secret of the same name under the new type
            if existing.secret_type != secret_type.name() {
                let lookup =
                    fetch_by_name(backend.as_ref(), &secret_type, &existing.secret_name, tenant.id)
                        .await;
                if exists(lookup)? {
                    return Err(SecretManagementError::client(
                        ErrorMessage::SecretAlreadyExists,
                        Some(&existing.secret_name),
                    ));
                }
            }

            let mut secret = secret;
            secret.secret_name = existing.secret_name;
            secret.secret_type = secret_type.name().to_string();
            secret.tenant_domain = existing.tenant_domain;
            secret.created = existing.created;

            let ciphertext =
                self.encrypt(&secret.secret_value, ErrorMessage::ReplaceSecret, secret_id.as_str())?;
            backend.replace(&secret.clone().with_value(ciphertext), tenant.id).await?;

            info!(tenant_id = tenant.id, secret_id = %secret_id, "Secret replaced");
            Ok(secret)
        })
        .await
    }

    /// Store a new value for the secret with the given type and name
    #[instrument(skip(self, value), fields(tenant_id))]
    pub async fn update_secret_value(
        &self,
        secret_type: &str,
        name: &str,
        value: SecretString,
    ) -> Result<Secret> {
        self.observe("update_secret_value", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;
            if is_blank(name) {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretGetRequestInvalid,
                    None,
                ));
            }
            self.validator.validate_secret_value(value.expose_secret())?;

            let backend = self.registry.select()?;
            let existing = fetch_by_name(backend.as_ref(), &secret_type, name, tenant.id).await?;
            self.store_value(backend.as_ref(), existing, value, tenant.id).await
        })
        .await
    }

    /// Store a new value for the secret with the given id
    #[instrument(skip(self, value), fields(secret_id = %secret_id, tenant_id))]
    pub async fn update_secret_value_by_id(
        &self,
        secret_id: &SecretId,
        value: SecretString,
    ) -> Result<Secret> {
        self.observe("update_secret_value_by_id", async move {
            let tenant = self.begin()?;
            require_id(secret_id)?;
            self.validator.validate_secret_value(value.expose_secret())?;

            let backend = self.registry.select()?;
            let existing = fetch_by_id(backend.as_ref(), secret_id, tenant.id).await?;
            self.store_value(backend.as_ref(), existing, value, tenant.id).await
        })
        .await
    }

    /// Store a new description for the secret with the given type and name
    #[instrument(skip(self, description), fields(tenant_id))]
    pub async fn update_secret_description(
        &self,
        secret_type: &str,
        name: &str,
        description: &str,
    ) -> Result<Secret> {
        self.observe("update_secret_description", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;
            if is_blank(name) {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretGetRequestInvalid,
                    None,
                ));
            }
            self.validator.validate_secret_description(Some(description))?;

            let backend = self.registry.select()?;
            let existing = fetch_by_name(backend.as_ref(), &secret_type, name, tenant.id).await?;
            let updated = backend.update_description(&existing, description, tenant.id).await?;

            info!(tenant_id = tenant.id, secret_id = existing.id_str(), "Secret description updated");
            self.decrypt(updated)
        })
        .await
    }

    /// Store a new description for the secret with the given id
    #[instrument(skip(self, description), fields(secret_id = %secret_id, tenant_id))]
    pub async fn update_secret_description_by_id(
        &self,
        secret_id: &SecretId,
        description: &str,
    ) -> Result<Secret> {
        self.observe("update_secret_description_by_id", async move {
            let tenant = self.begin()?;
            require_id(secret_id)?;
            self.validator.validate_secret_description(Some(description))?;

            let backend = self.registry.select()?;
            let existing = fetch_by_id(backend.as_ref(), secret_id, tenant.id).await?;
            let updated = backend.update_description(&existing, description, tenant.id).await?;

            info!(tenant_id = tenant.id, secret_id = %secret_id, "Secret description updated");
            self.decrypt(updated)
        })
        .await
    }

    /// Resolve a secret type by name
    pub fn get_secret_type(&self, name: &str) -> Result<SecretType> {
        self.ensure_enabled()?;
        self.validator.validate_secret_type(name)?;
        Ok(SecretType::new(name))
    }

    /// Whether a secret with this type and name exists for the current tenant
    #[instrument(skip(self), fields(tenant_id))]
    pub async fn secret_exists(&self, secret_type: &str, name: &str) -> Result<bool> {
        self.observe("secret_exists", async move {
            let tenant = self.begin()?;
            let secret_type = self.request_type(secret_type)?;
            if is_blank(name) {
                return Err(SecretManagementError::client(
                    ErrorMessage::SecretGetRequestInvalid,
                    None,
                ));
            }

            let backend = self.registry.select()?;
            exists(fetch_by_name(backend.as_ref(), &secret_type, name, tenant.id).await)
        })
        .await
    }

    /// Whether a secret with this id exists for the current tenant
    #[instrument(skip(self), fields(secret_id = %secret_id, tenant_id))]
    pub async fn secret_exists_by_id(&self, secret_id: &SecretId) -> Result<bool> {
        self.observe("secret_exists_by_id", async move {
            let tenant = self.begin()?;
            require_id(secret_id)?;

            let backend = self.registry.select()?;
            exists(fetch_by_id(backend.as_ref(), secret_id, tenant.id).await)
        })
        .await
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.feature_flag.is_enabled() {
            Ok(())
        } else {
            Err(SecretManagementError::server(ErrorMessage::SecretManagerNotEnabled, None))
        }
    }

    /// Feature check and tenant snapshot shared by every operation
    fn begin(&self) -> Result<Tenant> {
        self.ensure_enabled()?;
        let tenant = self.tenant_context.current_tenant().ok_or_else(|| {
            SecretManagementError::server(ErrorMessage::TenantContextUnavailable, None)
        })?;
        Span::current().record("tenant_id", tenant.id);
        Ok(tenant)
    }

    fn request_type(&self, secret_type: &str) -> Result<SecretType> {
        self.validator.validate_secret_type(secret_type)?;
        Ok(SecretType::new(secret_type))
    }

    async fn store_value(
        &self,
        backend: &dyn SecretBackend,
        existing: Secret,
        value: SecretString,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let subject = existing.id_str().to_string();
        let ciphertext = self.encrypt(&value, ErrorMessage::UpdateSecret, &subject)?;
        let updated = backend.update_value(&existing, &ciphertext, tenant_id).await?;

        info!(tenant_id, secret_id = %subject, "Secret value updated");
        Ok(updated.with_value(value))
    }

    fn encrypt(&self, value: &SecretString, failure: ErrorMessage, subject: &str) -> Result<String> {
        self.crypto.encrypt_and_encode(value.expose_secret().as_bytes()).map_err(|e| {
            error!(subject = %subject, error = %e, "Secret encryption failed");
            SecretManagementError::server_with_source(failure, Some(subject), e)
        })
    }

    fn decrypt(&self, mut secret: Secret) -> Result<Secret> {
        let plaintext = self
            .crypto
            .decode_and_decrypt(secret.secret_value.expose_secret())
            .map(Zeroizing::new)
            .map_err(|e| {
                error!(secret_id = secret.id_str(), error = %e, "Secret decryption failed");
                SecretManagementError::server_with_source(
                    ErrorMessage::DecryptSecret,
                    Some(secret.id_str()),
                    e,
                )
            })?;

        let plaintext = std::str::from_utf8(&plaintext).map_err(|_| {
            SecretManagementError::server(ErrorMessage::DecryptSecret, Some(secret.id_str()))
        })?;
        secret.secret_value = SecretString::new(plaintext);
        Ok(secret)
    }

    /// Run an operation and record its outcome
    async fn observe<T, F>(&self, operation: &'static str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = work.await;
        self.metrics.record_operation(operation, outcome_label(&result), started.elapsed());

        match &result {
            Err(e) if e.is_server() => {
                error!(operation, code = e.code(), error = %e, "Secret operation failed")
            }
            Err(e) => debug!(operation, code = e.code(), error = %e, "Secret operation rejected"),
            Ok(_) => {}
        }
        result
    }
}

fn require_id(secret_id: &SecretId) -> Result<()> {
    if secret_id.is_blank() {
        return Err(SecretManagementError::client(
            ErrorMessage::InvalidSecretId,
            Some(secret_id.as_str()),
        ));
    }
    Ok(())
}

async fn fetch_by_name(
    backend: &dyn SecretBackend,
    secret_type: &SecretType,
    name: &str,
    tenant_id: TenantId,
) -> Result<Secret> {
    backend
        .get_by_name(name, secret_type, tenant_id)
        .await?
        .ok_or_else(|| SecretManagementError::client(ErrorMessage::SecretDoesNotExist, Some(name)))
}

async fn fetch_by_id(
    backend: &dyn SecretBackend,
    secret_id: &SecretId,
    tenant_id: TenantId,
) -> Result<Secret> {
    backend.get_by_id(secret_id, tenant_id).await?.ok_or_else(|| {
        SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some(secret_id.as_str()))
    })
}

/// Existence from a read: item-level not-found means absent, any other
/// failure propagates unchanged
fn exists(lookup: Result<Secret>) -> Result<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(e) if e.is_secret_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::backends::InMemorySecretBackend;
    use crate::secrets::context::StaticTenantContext;
    use crate::services::secret_encryption::SecretEncryption;
    use crate::config::EncryptionConfig;
    use tracing_test::traced_test;

    fn manager() -> SecretManager {
        SecretManager::new(
            &SecretManagerConfig::default(),
            SecretBackendRegistry::single(Arc::new(InMemorySecretBackend::new())),
            Arc::new(SecretEncryption::new(&EncryptionConfig::for_testing()).unwrap()),
            Arc::new(StaticTenantContext::new(1, "acme.com")),
        )
        .unwrap()
    }

    #[test]
    fn test_exists_mapping() {
        assert!(exists(Ok(Secret::default())).unwrap());

        let by_name = SecretManagementError::client(ErrorMessage::SecretDoesNotExist, Some("x"));
        assert!(!exists(Err(by_name)).unwrap());

        let by_id = SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some("x"));
        assert!(!exists(Err(by_id)).unwrap());

        let collection = SecretManagementError::client(ErrorMessage::SecretsDoNotExist, None);
        assert!(exists(Err(collection)).is_err());

        let backend = SecretManagementError::backend("fetch", std::io::Error::other("down"));
        assert!(exists(Err(backend)).unwrap_err().is_server());
    }

    #[test]
    fn test_get_secret_type() {
        let manager = manager();
        assert_eq!(manager.get_secret_type("USER").unwrap().name(), "USER");
        assert_eq!(
            manager.get_secret_type("").unwrap_err().error_message(),
            ErrorMessage::SecretTypeNameRequired
        );
        assert_eq!(
            manager.get_secret_type("API_KEY").unwrap_err().error_message(),
            ErrorMessage::SecretTypeDoesNotExist
        );
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let manager = manager();
        let err = manager.get_secret_by_id(&SecretId::from(" ")).await.unwrap_err();
        assert_eq!(err.error_message(), ErrorMessage::InvalidSecretId);
    }

    #[tokio::test]
    async fn test_secret_type_is_stamped_on_add() {
        let manager = manager();
        let added = manager.add_secret("USER", Secret::new("db-pass", "s3cr3t!")).await.unwrap();
        assert_eq!(added.secret_type, "USER");
        assert_eq!(added.tenant_domain, "acme.com");
        assert!(added.secret_id.is_some());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_values_never_reach_logs() {
        let manager = manager();
        let added = manager.add_secret("USER", Secret::new("db-pass", "s3cr3t!")).await.unwrap();
        manager.get_secret("USER", "db-pass").await.unwrap();
        manager
            .update_secret_value("USER", "db-pass", SecretString::new("n3w-s3cr3t!"))
            .await
            .unwrap();
        let _ = manager.add_secret("USER", Secret::new("db-pass", "dup-s3cr3t!")).await;

        assert!(logs_contain("Secret added"));
        assert!(logs_contain(added.id_str()));
        assert!(!logs_contain("s3cr3t!"));
    }
}
