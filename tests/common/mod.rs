//! Common test utilities for all integration tests.
//!
//! Provides manager builders, a backend that records what it was handed,
//! and crypto doubles.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

#[cfg(feature = "postgres_tests")]
pub mod test_db;

use async_trait::async_trait;
use base64::Engine;
use secret_mgt::config::{EncryptionConfig, SecretManagerConfig};
use secret_mgt::secrets::InMemorySecretBackend;
use secret_mgt::services::CryptoError;
use secret_mgt::{
    CryptoProvider, Result, Secret, SecretBackend, SecretBackendRegistry, SecretEncryption,
    SecretId, SecretManager, SecretType, StaticTenantContext, TenantContext, TenantId,
};
use std::sync::{Arc, Mutex};

pub const TENANT_ID: TenantId = 1;
pub const TENANT_DOMAIN: &str = "acme.com";

/// Fixed-key encryption config shared by integration tests
pub fn test_encryption_config() -> EncryptionConfig {
    EncryptionConfig {
        master_key_base64: base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]),
        key_version: "test".to_string(),
    }
}

pub fn test_crypto() -> Arc<SecretEncryption> {
    Arc::new(SecretEncryption::new(&test_encryption_config()).expect("test encryption"))
}

pub fn tenant(id: TenantId, domain: &str) -> Arc<dyn TenantContext> {
    Arc::new(StaticTenantContext::new(id, domain))
}

/// Manager over the given backend for the default test tenant
pub fn manager_with(backend: Arc<dyn SecretBackend>) -> SecretManager {
    manager_for(backend, tenant(TENANT_ID, TENANT_DOMAIN))
}

pub fn manager_for(
    backend: Arc<dyn SecretBackend>,
    tenant_context: Arc<dyn TenantContext>,
) -> SecretManager {
    SecretManager::new(
        &SecretManagerConfig::default(),
        SecretBackendRegistry::single(backend),
        test_crypto(),
        tenant_context,
    )
    .expect("build secret manager")
}

/// One call observed by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub tenant_id: TenantId,
    /// Value handed to a write, as the backend saw it
    pub value: Option<String>,
}

/// Backend that records every call and delegates storage to memory
#[derive(Debug, Default)]
pub struct RecordingBackend {
    inner: InMemorySecretBackend,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Values handed to add, replace and update_value
    pub fn written_values(&self) -> Vec<String> {
        self.calls().into_iter().filter_map(|call| call.value).collect()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, operation: &'static str, tenant_id: TenantId, value: Option<&str>) {
        self.calls.lock().unwrap().push(RecordedCall {
            operation,
            tenant_id,
            value: value.map(str::to_string),
        });
    }
}

#[async_trait]
impl SecretBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn add(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        self.record("add", tenant_id, Some(secret.secret_value.expose_secret()));
        self.inner.add(secret, tenant_id).await
    }

    async fn get_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Secret>> {
        self.record("get_by_name", tenant_id, None);
        self.inner.get_by_name(name, secret_type, tenant_id).await
    }

    async fn get_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<Option<Secret>> {
        self.record("get_by_id", tenant_id, None);
        self.inner.get_by_id(id, tenant_id).await
    }

    async fn get_list(
        &self,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<Option<Vec<Secret>>> {
        self.record("get_list", tenant_id, None);
        self.inner.get_list(secret_type, tenant_id).await
    }

    async fn delete_by_name(
        &self,
        name: &str,
        secret_type: &SecretType,
        tenant_id: TenantId,
    ) -> Result<()> {
        self.record("delete_by_name", tenant_id, None);
        self.inner.delete_by_name(name, secret_type, tenant_id).await
    }

    async fn delete_by_id(&self, id: &SecretId, tenant_id: TenantId) -> Result<()> {
        self.record("delete_by_id", tenant_id, None);
        self.inner.delete_by_id(id, tenant_id).await
    }

    async fn replace(&self, secret: &Secret, tenant_id: TenantId) -> Result<()> {
        self.record("replace", tenant_id, Some(secret.secret_value.expose_secret()));
        self.inner.replace(secret, tenant_id).await
    }

    async fn update_value(
        &self,
        secret: &Secret,
        ciphertext: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        self.record("update_value", tenant_id, Some(ciphertext));
        self.inner.update_value(secret, ciphertext, tenant_id).await
    }

    async fn update_description(
        &self,
        secret: &Secret,
        description: &str,
        tenant_id: TenantId,
    ) -> Result<Secret> {
        self.record("update_description", tenant_id, None);
        self.inner.update_description(secret, description, tenant_id).await
    }
}

/// Crypto provider whose encryption always fails
#[derive(Debug, Default)]
pub struct FailingCrypto;

impl CryptoProvider for FailingCrypto {
    fn encrypt_and_encode(&self, _plaintext: &[u8]) -> std::result::Result<String, CryptoError> {
        Err(CryptoError::Encryption("keystore unavailable"))
    }

    fn decode_and_decrypt(&self, _encoded: &str) -> std::result::Result<Vec<u8>, CryptoError> {
        Err(CryptoError::Decryption("keystore unavailable"))
    }
}
