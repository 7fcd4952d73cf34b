//! # Error Handling
//!
//! Error taxonomy shared by every layer of the secret manager. Downstream
//! HTTP and admin layers map [`SecretManagementError::Client`] to 4xx
//! responses and [`SecretManagementError::Server`] to 5xx responses.

pub mod types;

pub use types::{ErrorMessage, Result, SecretManagementError};
