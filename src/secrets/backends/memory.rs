//! In-process secret backend
//!
//! Keeps secrets in a map guarded by a tokio lock. Suitable for tests and
//! single-node development; nothing survives a restart.

use super::backend::SecretBackend;
use crate::domain::{Secret, SecretId, SecretType, TenantId};
use crate::errors::{ErrorMessage, Result, SecretManagementError};
use crate::secrets::SecretString;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
pub struct InMemorySecretBackend {
    name: &'static str,
    map: RwLock<HashMap<(TenantId, SecretId), Secret>>,
}

impl Default for InMemorySecretBackend {
    fn default() -> Self {
        Self::named("memory")
    }
}

impl InMemorySecretBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that reports `name` in logs and health checks
    pub fn named(name: &'static str) -> Self {
        Self { name, map: RwLock::new(HashMap::new()) }
    }

    /// Number of secrets held for a tenant
    pub async fn count(&self, tenant_id: TenantId) -> usize {
        self.map.read().await.keys().filter(|(tid, _)| *tid == tenant_id).count()
    }

    fn stored_id(secret: &Secret) -> Result<SecretId> {
        secret
            .secret_id
            .clone()
            .filter(|id| !id.is_blank())
            .ok_or_else(|| SecretManagementError::client(ErrorMessage::InvalidSecretId, None))
    }
}

fn matches(secret: &Secret, name: &str, secret_type: &SecretType) -> bool {
    secret.secret_name == name && secret.secret_type == secret_type.name()
}

#[async_trait]
impl SecretBackend for InMemorySecretBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn add(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        let id = Self::stored_id(secret)?;
        let mut map = self.map.write().await;

        let duplicate = map.iter().any(|((tid, _), existing)| {
            *tid == tenant_id
                && existing.secret_name == secret.secret_name
                && existing.secret_type == secret.secret_type
        });
        if duplicate || map.contains_key(&(tenant_id, id.clone())) {
            return Err(SecretManagementError::client(
                ErrorMessage::SecretAlreadyExists,
                Some(&secret.secret_name),
            ));
        }

        let now = Utc::now();
        let mut stored = secret.clone();
        stored.created = Some(now);
        stored.last_modified = Some(now);
        debug!(tenant_id, secret_id = %id, "Stored secret in memory");
        map.insert((tenant_id, id), stored);
        Ok(())
    }

    async fn get_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Secret>> {
        let map = self.map.read().await;
        Ok(map
            .iter()
            .find(|((tid, _), s)| *tid == tenant_id && matches(s, name, secret_type))
            .map(|(_, s)| s.clone()))
    }

    async fn get_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>> {
        Ok(self.map.read().await.get(&(tenant_id, id.clone())).cloned())
    }

    async fn get_list(
        &self,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Vec<Secret>>> {
        let map = self.map.read().await;
        let mut secrets: Vec<Secret> = map
            .iter()
            .filter(|((tid, _), s)| *tid == tenant_id && s.secret_type == secret_type.name())
            .map(|(_, s)| s.clone())
            .collect();

        if secrets.is_empty() {
            return Ok(None);
        }
        secrets.sort_by(|a, b| a.created.cmp(&b.created).then(a.secret_name.cmp(&b.secret_name)));
        Ok(Some(secrets))
    }

    async fn delete_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<()> {
        self.map
            .write()
            .await
            .retain(|(tid, _), s| !(*tid == tenant_id && matches(s, name, secret_type)));
        Ok(())
    }

    async fn delete_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<()> {
        self.map.write().await.remove(&(tenant_id, id.clone()));
        Ok(())
    }

    async fn replace(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        let id = Self::stored_id(secret)?;
        let mut map = self.map.write().await;

        let taken = map.iter().any(|((tid, other_id), other)| {
            *tid == tenant_id
                && *other_id != id
                && other.secret_name == secret.secret_name
                && other.secret_type == secret.secret_type
        });
        if taken {
            return Err(SecretManagementError::client(
                ErrorMessage::SecretAlreadyExists,
                Some(&secret.secret_name),
            ));
        }

        let existing = map.get_mut(&(tenant_id, id.clone())).ok_or_else(|| {
            SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some(id.as_str()))
        })?;

        existing.secret_name = secret.secret_name.clone();
        existing.secret_type = secret.secret_type.clone();
        existing.secret_value = secret.secret_value.clone();
        existing.description = secret.description.clone();
        existing.last_modified = Some(Utc::now());
        Ok(())
    }

    async fn update_value(
        &self,
        secret: &Secret,
        ciphertext: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let id = Self::stored_id(secret)?;
        let mut map = self.map.write().await;
        let existing = map.get_mut(&(tenant_id, id.clone())).ok_or_else(|| {
            SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some(id.as_str()))
        })?;

        existing.secret_value = SecretString::new(ciphertext);
        existing.last_modified = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn update_description(
        &self,
        secret: &Secret,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        let id = Self::stored_id(secret)?;
        let mut map = self.map.write().await;
        let existing = map.get_mut(&(tenant_id, id.clone())).ok_or_else(|| {
            SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some(id.as_str()))
        })?;

        existing.description = Some(description.to_string());
        existing.last_modified = Some(Utc::now());
        Ok(existing.clone())
    }
}
