//! # Configuration Settings
//!
//! Defines the configuration structure for the secret manager. All of it
//! is read once at process start and treated as read-only afterwards.

use crate::errors::{Result, SecretManagementError};
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

/// Secret types known out of the box
pub const DEFAULT_SECRET_TYPES: &[&str] = &[
    "ADAPTIVE_AUTH_CALL_CHOREO",
    "IDP_SECRET_PROPERTIES",
    "IDVP_SECRET_PROPERTIES",
    "ANDROID_ATTESTATION_CREDENTIALS",
    "ACTION_API_ENDPOINT_AUTH_SECRETS",
    "USER",
];

pub const DEFAULT_SECRET_NAME_REGEX: &str = r"^[a-zA-Z0-9._-]{1,64}$";
pub const DEFAULT_SECRET_VALUE_REGEX: &str = r"^[\s\S]{1,2048}$";
pub const DEFAULT_SECRET_DESCRIPTION_REGEX: &str = r"^[\s\S]{0,1023}$";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Secret manager behaviour and validation patterns
    #[validate(nested)]
    pub secrets: SecretManagerConfig,

    /// At-rest encryption key material
    #[validate(nested)]
    pub encryption: Option<EncryptionConfig>,

    /// Read-path cache settings
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Database backend settings (absent = in-memory only)
    #[validate(nested)]
    pub database: Option<DatabaseConfig>,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SecretManagementError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Checks the validator crate cannot express
    fn validate_custom(&self) -> Result<()> {
        self.secrets.validate_patterns()?;

        if let Some(encryption) = &self.encryption {
            encryption.decode_key()?;
        }

        if let Some(database) = &self.database {
            if database.min_connections > database.max_connections {
                return Err(SecretManagementError::config(
                    "database.min_connections cannot exceed database.max_connections",
                ));
            }
            if !database.url.starts_with("postgres://") && !database.url.starts_with("postgresql://")
            {
                return Err(SecretManagementError::config(
                    "database.url must start with 'postgres://' or 'postgresql://'",
                ));
            }
        }

        Ok(())
    }
}

/// Secret manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SecretManagerConfig {
    /// Administrative switch for the whole subsystem
    pub enabled: bool,

    /// Closed set of accepted secret type names
    #[validate(length(min = 1, message = "At least one secret type must be configured"))]
    pub secret_types: Vec<String>,

    /// Pattern every secret name must fully match
    #[validate(length(min = 1, message = "Secret name regex cannot be empty"))]
    pub name_regex: String,

    /// Pattern every secret value must fully match
    #[validate(length(min = 1, message = "Secret value regex cannot be empty"))]
    pub value_regex: String,

    /// Pattern a present description must fully match
    #[validate(length(min = 1, message = "Secret description regex cannot be empty"))]
    pub description_regex: String,
}

impl Default for SecretManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret_types: DEFAULT_SECRET_TYPES.iter().map(|s| s.to_string()).collect(),
            name_regex: DEFAULT_SECRET_NAME_REGEX.to_string(),
            value_regex: DEFAULT_SECRET_VALUE_REGEX.to_string(),
            description_regex: DEFAULT_SECRET_DESCRIPTION_REGEX.to_string(),
        }
    }
}

impl SecretManagerConfig {
    /// Ensure every configured pattern compiles and no type name is blank
    pub fn validate_patterns(&self) -> Result<()> {
        for (field, pattern) in [
            ("secrets.name_regex", &self.name_regex),
            ("secrets.value_regex", &self.value_regex),
            ("secrets.description_regex", &self.description_regex),
        ] {
            Regex::new(pattern).map_err(|e| {
                SecretManagementError::config(format!("{} does not compile: {}", field, e))
            })?;
        }

        if self.secret_types.iter().any(|t| t.trim().is_empty()) {
            return Err(SecretManagementError::config("secrets.secret_types contains a blank entry"));
        }

        Ok(())
    }
}

/// Encryption key configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct EncryptionConfig {
    /// Base64-encoded 32-byte master encryption key
    #[validate(length(min = 1, message = "Encryption key cannot be empty"))]
    pub master_key_base64: String,

    /// Key version for rotation tracking
    #[validate(length(min = 1, message = "Key version cannot be empty"))]
    #[serde(default = "default_key_version")]
    pub key_version: String,
}

fn default_key_version() -> String {
    "default".to_string()
}

impl EncryptionConfig {
    /// Decode and length-check the master key
    pub fn decode_key(&self) -> Result<[u8; 32]> {
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(&self.master_key_base64)
            .map_err(|e| {
                SecretManagementError::config(format!("encryption.master_key_base64 is not base64: {}", e))
            })?;

        let key: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            SecretManagementError::config(format!(
                "encryption.master_key_base64 must decode to 32 bytes, got {} bytes",
                key_bytes.len()
            ))
        })?;

        Ok(key)
    }

    /// A fixed-key configuration for tests
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            master_key_base64: base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]),
            key_version: "test".to_string(),
        }
    }
}

impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("master_key_base64", &"[REDACTED]")
            .field("key_version", &self.key_version)
            .finish()
    }
}

/// Read-path cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// Wrap the backend of record with the cached decorator
    pub enabled: bool,

    /// Entry time-to-live in seconds
    #[validate(range(min = 1, max = 86400, message = "Cache TTL must be between 1 and 86400 seconds"))]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, ttl_seconds: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(min = 0, max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Apply embedded migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/secrets".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to log output
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { service_name: "secret-mgt".to_string(), log_level: "info".to_string(), json_logging: false }
    }
}
