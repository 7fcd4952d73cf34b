//! # Structured Logging
//!
//! Span macro and subscriber setup for the secret manager.
//!
//! Secret values are never recorded. Manager operations carry the tenant
//! id, secret type and secret name or id as span fields; values only
//! appear as lengths.

use crate::config::ObservabilityConfig;
use crate::errors::{Result, SecretManagementError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Create a tracing span for a secret manager operation.
///
/// Supports an optional `tenant_id` field. Extra fields are passed through:
///
/// ```rust,ignore
/// let span = secret_span!("get_secret", tenant_id = 7, secret_type = "USER");
/// ```
#[macro_export]
macro_rules! secret_span {
    ($operation:expr) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            tenant_id = tracing::field::Empty
        )
    };
    ($operation:expr, tenant_id = $tenant:expr) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            tenant_id = $tenant
        )
    };
    ($operation:expr, tenant_id = $tenant:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            tenant_id = $tenant,
            $($field)*
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::debug_span!(
            "secret_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            tenant_id = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Fails if a global
/// subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            SecretManagementError::config(format!(
                "Invalid log level '{}': {}",
                config.log_level, e
            ))
        })?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json_logging {
        registry.with(tracing_subscriber::fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| {
        SecretManagementError::config(format!("Failed to install log subscriber: {}", e))
    })?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        json_logging = config.json_logging,
        "Logging initialized"
    );
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        service_name = %config.observability.service_name,
        secrets_enabled = config.secrets.enabled,
        secret_types = ?config.secrets.secret_types,
        cache_enabled = config.cache.enabled,
        cache_ttl_seconds = config.cache.ttl_seconds,
        database_configured = config.database.is_some(),
        encryption_key_version = ?config.encryption.as_ref().map(|e| e.key_version.as_str()),
        "Secret manager configuration"
    );
}
