//! Pluggable secret storage
//!
//! The manager talks to storage only through [`SecretBackend`]. Backends
//! are collected in a [`SecretBackendRegistry`] which picks the one to use
//! on each call.
//!
//! ## Shipped Backends
//!
//! - **Database**: PostgreSQL table holding ciphertext rows
//! - **Memory**: process-local map for tests and development

pub mod backend;
pub mod cache;
pub mod database;
pub mod memory;
pub mod registry;

pub use backend::SecretBackend;
pub use cache::{
    SecretByIdCacheKey, SecretByNameCacheKey, SecretCache, SecretCacheKey, TtlSecretCache,
};
pub use database::DatabaseSecretBackend;
pub use memory::InMemorySecretBackend;
pub use registry::SecretBackendRegistry;
