//! # Domain Model
//!
//! Value types exchanged between the secret manager, its backends and its
//! callers.

pub mod id;
pub mod secret;

pub use id::SecretId;
pub use secret::{Secret, SecretType, Secrets, Tenant, TenantId};
