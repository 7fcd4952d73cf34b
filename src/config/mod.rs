//! # Configuration Management
//!
//! Layered configuration: compiled-in defaults, then an optional `.env`
//! file, then `SECRET_MGT__*` environment variables. Nested keys use a
//! double underscore, e.g. `SECRET_MGT__SECRETS__ENABLED=false` or
//! `SECRET_MGT__SECRETS__SECRET_TYPES=USER,IDP_SECRET_PROPERTIES`.

pub mod settings;

pub use settings::{
    AppConfig, CacheConfig, DatabaseConfig, EncryptionConfig, ObservabilityConfig,
    SecretManagerConfig, DEFAULT_SECRET_DESCRIPTION_REGEX, DEFAULT_SECRET_NAME_REGEX,
    DEFAULT_SECRET_TYPES, DEFAULT_SECRET_VALUE_REGEX,
};

use crate::errors::Result;
use config::{Config, Environment};

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "SECRET_MGT";

impl AppConfig {
    /// Load configuration from defaults, `.env` and the process environment
    pub fn load() -> Result<Self> {
        // A missing .env file is the normal case outside development
        let _ = dotenvy::dotenv();
        Self::from_environment(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("secrets.secret_types")
                .try_parsing(true),
        )
    }

    /// Build configuration from defaults overlaid with the given environment source
    pub fn from_environment(environment: Environment) -> Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;

        tracing::debug!(
            secrets_enabled = config.secrets.enabled,
            secret_types = config.secrets.secret_types.len(),
            cache_enabled = config.cache.enabled,
            database_configured = config.database.is_some(),
            encryption_configured = config.encryption.is_some(),
            "Loaded secret manager configuration"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("secrets.secret_types")
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_environment(source(&[])).unwrap();
        assert!(config.secrets.enabled);
        assert_eq!(config.secrets.name_regex, DEFAULT_SECRET_NAME_REGEX);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_environment(source(&[
            ("SECRET_MGT__SECRETS__ENABLED", "false"),
            ("SECRET_MGT__SECRETS__SECRET_TYPES", "USER,IDP_SECRET_PROPERTIES"),
            ("SECRET_MGT__CACHE__TTL_SECONDS", "60"),
        ]))
        .unwrap();

        assert!(!config.secrets.enabled);
        assert_eq!(config.secrets.secret_types, vec!["USER", "IDP_SECRET_PROPERTIES"]);
        assert_eq!(config.cache.ttl_seconds, 60);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = AppConfig::from_environment(source(&[(
            "SECRET_MGT__SECRETS__VALUE_REGEX",
            "(unclosed",
        )]));
        assert!(result.is_err());
    }
}
