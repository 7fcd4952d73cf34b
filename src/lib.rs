//! # secret-mgt
//!
//! Tenant-scoped secret management core. Stores named, typed secrets per
//! tenant, keeps every stored value encrypted at rest, and exposes create,
//! read, update and delete operations with strict validation and
//! existence semantics.
//!
//! ## Architecture
//!
//! ```text
//! caller → SecretManager → SecretValidator (fail fast)
//!                        → SecretBackendRegistry::select (last backend wins)
//!                        → CryptoProvider (encrypt before write, decrypt after read)
//!                        → [CachedSecretBackend →] SecretBackend
//! ```
//!
//! ## Core Components
//!
//! - **Secret Manager**: the façade in [`services::SecretManager`]
//! - **Validation Engine**: configurable full-match patterns in [`validation`]
//! - **Backend Resolver**: [`secrets::SecretBackendRegistry`]
//! - **Crypto Boundary**: [`services::CryptoProvider`] with an AES-256-GCM implementation
//! - **Cache Keys**: by-id and by-name keys in [`secrets::backends::cache`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use secret_mgt::{build_secret_manager, AppConfig, Result, Secret, StaticTenantContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load()?;
//!     let manager =
//!         build_secret_manager(&config, Arc::new(StaticTenantContext::new(1, "acme.com"))).await?;
//!
//!     manager.add_secret("USER", Secret::new("db-pass", "s3cr3t!")).await?;
//!     let secret = manager.get_secret("USER", "db-pass").await?;
//!     assert_eq!(secret.secret_value.expose_secret(), "s3cr3t!");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod services;
pub mod startup;
pub mod storage;
pub mod validation;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use domain::{Secret, SecretId, SecretType, Secrets, Tenant, TenantId};
pub use errors::{ErrorMessage, Result, SecretManagementError};
pub use secrets::{
    FeatureFlag, SecretBackend, SecretBackendRegistry, SecretString, StaticTenantContext,
    TaskTenantContext, TenantContext,
};
pub use services::{CryptoProvider, SecretEncryption, SecretManager};
pub use startup::build_secret_manager;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
