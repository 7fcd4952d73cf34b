//! Business logic services
//!
//! The secret manager façade and the crypto boundary it encrypts through.

pub mod secret_encryption;
pub mod secret_manager;

pub use secret_encryption::{CryptoError, CryptoProvider, SecretEncryption};
pub use secret_manager::SecretManager;
