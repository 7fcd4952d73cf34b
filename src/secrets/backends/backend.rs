//! Secret backend trait
//!
//! Defines the narrow CRUD contract every storage backend satisfies.
//! Values crossing this trait are always ciphertext; the manager encrypts
//! before calling in and decrypts after reading out.

use crate::domain::{Secret, SecretId, SecretType, TenantId};
use crate::errors::Result;
use async_trait::async_trait;

/// Trait for secret storage backends
///
/// Implementations must be Send + Sync for use in async contexts. Every
/// operation is scoped by the tenant id passed in; a backend must never
/// return or touch another tenant's rows.
#[async_trait]
pub trait SecretBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and health reports
    fn name(&self) -> &'static str;

    /// Persist a new secret. The secret already carries its id and type.
    async fn add(&self, secret: &Secret, tenant_id: TenantId) -> Result<()>;

    async fn get_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Secret>>;

    async fn get_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>>;

    /// List every secret of a type. `None` signals that there are none.
    async fn get_list(
        &self,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Vec<Secret>>>;

    async fn delete_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<()>;

    async fn delete_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<()>;

    /// Overwrite name, type, value and description of the secret with the same id
    async fn replace(&self, secret: &Secret, tenant_id: TenantId) -> Result<()>;

    /// Store a new ciphertext for `secret` and return the persisted state
    async fn update_value(
        &self,
        secret: &Secret,
        ciphertext: &str,
        tenant_id: TenantId,
    ) -> Result<Secret>;

    /// Store a new description for `secret` and return the persisted state
    async fn update_description(
        &self,
        secret: &Secret,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Secret>;

    /// Perform a health check on the backend
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
