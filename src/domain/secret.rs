//! Secret domain types
//!
//! A [`Secret`] is a named, typed credential owned by one tenant. At the
//! manager boundary its value is plaintext; at the backend boundary the
//! same field carries ciphertext produced by the crypto provider.

use super::id::SecretId;
use crate::secrets::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric tenant identifier used to scope every backend call
pub type TenantId = i32;

/// Snapshot of the caller's tenant, read once at the start of each operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub domain: String,
}

impl Tenant {
    pub fn new(id: TenantId, domain: impl Into<String>) -> Self {
        Self { id, domain: domain.into() }
    }
}

/// A tenant-scoped named credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Generated at creation, `None` until then
    pub secret_id: Option<SecretId>,
    pub secret_name: String,
    /// Stamped by the manager from the requested secret type
    pub secret_type: String,
    pub secret_value: SecretString,
    pub description: Option<String>,
    pub tenant_domain: String,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Secret {
    /// Create a secret request with a name and plaintext value
    pub fn new(name: impl Into<String>, value: impl Into<SecretString>) -> Self {
        Self { secret_name: name.into(), secret_value: value.into(), ..Default::default() }
    }

    pub fn with_id(mut self, id: impl Into<SecretId>) -> Self {
        self.secret_id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<SecretString>) -> Self {
        self.secret_value = value.into();
        self
    }

    /// The id as a string slice, empty when unset
    pub fn id_str(&self) -> &str {
        self.secret_id.as_ref().map(SecretId::as_str).unwrap_or("")
    }
}

/// Ordered collection of secrets returned by list operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secrets {
    secrets: Vec<Secret>,
}

impl Secrets {
    pub fn new(secrets: Vec<Secret>) -> Self {
        Self { secrets }
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Secret> {
        self.secrets.iter()
    }

    pub fn into_inner(self) -> Vec<Secret> {
        self.secrets
    }
}

impl IntoIterator for Secrets {
    type Item = Secret;
    type IntoIter = std::vec::IntoIter<Secret>;

    fn into_iter(self) -> Self::IntoIter {
        self.secrets.into_iter()
    }
}

impl<'a> IntoIterator for &'a Secrets {
    type Item = &'a Secret;
    type IntoIter = std::slice::Iter<'a, Secret>;

    fn into_iter(self) -> Self::IntoIter {
        self.secrets.iter()
    }
}

impl FromIterator<Secret> for Secrets {
    fn from_iter<I: IntoIterator<Item = Secret>>(iter: I) -> Self {
        Self { secrets: iter.into_iter().collect() }
    }
}

/// Classification label drawn from the configured set of secret types.
///
/// Never persisted on its own; built on demand from a validated name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretType {
    name: String,
}

impl SecretType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
