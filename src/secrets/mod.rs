//! Secret storage building blocks.
//!
//! - [`backends`]: the storage contract, shipped backends, the registry
//!   that selects one, and the cache keys
//! - [`cached`]: read-through cache decorator for any backend
//! - [`context`]: tenant context and feature flag collaborators
//! - [`types`]: [`SecretString`], the redacting holder for secret text
//!
//! # Security Considerations
//!
//! - Secret values are never logged or placed in error messages
//! - Backends and caches only ever see ciphertext
//! - Every backend call is scoped to a tenant id

pub mod backends;
pub mod cached;
pub mod context;
pub mod types;

pub use backends::{
    DatabaseSecretBackend, InMemorySecretBackend, SecretBackend, SecretBackendRegistry,
    SecretByIdCacheKey, SecretByNameCacheKey, SecretCache, SecretCacheKey, TtlSecretCache,
};
pub use cached::CachedSecretBackend;
pub use context::{FeatureFlag, StaticTenantContext, TaskTenantContext, TenantContext};
pub use types::SecretString;
