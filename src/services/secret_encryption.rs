//! Crypto boundary for secret values
//!
//! The manager only ever talks to a [`CryptoProvider`]. The shipped
//! implementation, [`SecretEncryption`], uses AES-256-GCM with a fresh
//! random nonce per value and encodes `nonce || ciphertext || tag` as
//! standard base64 so the result can be stored in a text column.
//!
//! ## Configuration
//!
//! The key comes from [`EncryptionConfig`], normally populated from
//! `SECRET_MGT__ENCRYPTION__MASTER_KEY_BASE64` (base64-encoded 32-byte key).

use crate::config::EncryptionConfig;
use crate::errors::Result;
use base64::Engine;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Size of AES-256-GCM nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of AES-256-GCM tag in bytes
const TAG_SIZE: usize = 16;

/// Failures raised by a crypto provider. Never carries plaintext.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(&'static str),

    #[error("decryption failed: {0}")]
    Decryption(&'static str),

    #[error("ciphertext encoding is invalid: {0}")]
    Encoding(String),
}

/// Encrypt/decrypt capability backed by a keystore.
///
/// `encrypt_and_encode` runs before every persist of a secret value;
/// `decode_and_decrypt` is its inverse on the read path.
pub trait CryptoProvider: Send + Sync + std::fmt::Debug {
    fn encrypt_and_encode(&self, plaintext: &[u8]) -> std::result::Result<String, CryptoError>;

    fn decode_and_decrypt(&self, encoded: &str) -> std::result::Result<Vec<u8>, CryptoError>;
}

impl<T> CryptoProvider for Arc<T>
where
    T: CryptoProvider + ?Sized,
{
    fn encrypt_and_encode(&self, plaintext: &[u8]) -> std::result::Result<String, CryptoError> {
        (**self).encrypt_and_encode(plaintext)
    }

    fn decode_and_decrypt(&self, encoded: &str) -> std::result::Result<Vec<u8>, CryptoError> {
        (**self).decode_and_decrypt(encoded)
    }
}

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

/// AES-256-GCM crypto provider
#[derive(Clone)]
pub struct SecretEncryption {
    key_bytes: Arc<[u8; 32]>,
    key_version: String,
    rng: Arc<SystemRandom>,
}

impl SecretEncryption {
    /// Create a new encryption service from configuration
    pub fn new(config: &EncryptionConfig) -> Result<Self> {
        let key_bytes = config.decode_key()?;

        debug!(key_version = %config.key_version, "Secret encryption service initialized");

        Ok(Self {
            key_bytes: Arc::new(key_bytes),
            key_version: config.key_version.clone(),
            rng: Arc::new(SystemRandom::new()),
        })
    }

    /// Get the current key version
    pub fn key_version(&self) -> &str {
        &self.key_version
    }

    fn unbound_key(&self) -> std::result::Result<UnboundKey, ring::error::Unspecified> {
        UnboundKey::new(&AES_256_GCM, &*self.key_bytes)
    }
}

impl CryptoProvider for SecretEncryption {
    #[instrument(skip(self, plaintext), fields(plaintext_len = plaintext.len()))]
    fn encrypt_and_encode(&self, plaintext: &[u8]) -> std::result::Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            error!("Failed to generate random nonce");
            CryptoError::Encryption("nonce generation failed")
        })?;

        let unbound_key = self.unbound_key().map_err(|_| {
            error!("Failed to create encryption key");
            CryptoError::Encryption("key setup failed")
        })?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut sealed = plaintext.to_vec();
        sealed.reserve(TAG_SIZE);
        sealing_key.seal_in_place_append_tag(Aad::empty(), &mut sealed).map_err(|_| {
            error!("Encryption failed");
            CryptoError::Encryption("seal failed")
        })?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + sealed.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&sealed);

        Ok(base64::engine::general_purpose::STANDARD.encode(payload))
    }

    #[instrument(skip(self, encoded), fields(encoded_len = encoded.len()))]
    fn decode_and_decrypt(&self, encoded: &str) -> std::result::Result<Vec<u8>, CryptoError> {
        let payload = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;

        if payload.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Encoding(format!(
                "payload too short: expected at least {} bytes, got {}",
                NONCE_SIZE + TAG_SIZE,
                payload.len()
            )));
        }

        let (nonce, sealed) = payload.split_at(NONCE_SIZE);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);

        let unbound_key = self.unbound_key().map_err(|_| {
            error!("Failed to create decryption key");
            CryptoError::Decryption("key setup failed")
        })?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = sealed.to_vec();
        let plaintext = opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| {
            error!("Decryption failed - possible tampering or wrong key");
            CryptoError::Decryption("authentication failed")
        })?;

        Ok(plaintext.to_vec())
    }
}

impl std::fmt::Debug for SecretEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEncryption")
            .field("key_version", &self.key_version)
            .field("key_bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_encryption() -> SecretEncryption {
        SecretEncryption::new(&EncryptionConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let encryption = test_encryption();
        let encoded = encryption.encrypt_and_encode(b"s3cr3t!").unwrap();

        assert_ne!(encoded, "s3cr3t!");
        assert_eq!(encryption.decode_and_decrypt(&encoded).unwrap(), b"s3cr3t!");
    }

    #[test]
    fn test_same_plaintext_encrypts_differently() {
        let encryption = test_encryption();
        let first = encryption.encrypt_and_encode(b"same-plaintext").unwrap();
        let second = encryption.encrypt_and_encode(b"same-plaintext").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let encryption = test_encryption();
        let encoded = encryption.encrypt_and_encode(b"sensitive-data").unwrap();

        let mut payload = base64::engine::general_purpose::STANDARD.decode(&encoded).unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;
        let tampered = base64::engine::general_purpose::STANDARD.encode(payload);

        assert!(matches!(
            encryption.decode_and_decrypt(&tampered),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let encoded = test_encryption().encrypt_and_encode(b"sensitive-data").unwrap();
        let other = SecretEncryption::new(&EncryptionConfig {
            master_key_base64: base64::engine::general_purpose::STANDARD.encode([0x07u8; 32]),
            key_version: "other".to_string(),
        })
        .unwrap();

        assert!(other.decode_and_decrypt(&encoded).is_err());
    }

    #[test]
    fn test_malformed_encoding_fails() {
        let encryption = test_encryption();
        assert!(matches!(encryption.decode_and_decrypt("not base64!"), Err(CryptoError::Encoding(_))));
        assert!(matches!(encryption.decode_and_decrypt("AAAA"), Err(CryptoError::Encoding(_))));
    }

    #[test]
    fn test_empty_plaintext() {
        let encryption = test_encryption();
        let encoded = encryption.encrypt_and_encode(b"").unwrap();
        assert!(encryption.decode_and_decrypt(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_key_length() {
        let config = EncryptionConfig {
            master_key_base64: base64::engine::general_purpose::STANDARD.encode([0u8; 16]),
            key_version: "test".to_string(),
        };
        assert!(SecretEncryption::new(&config).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", test_encryption());
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("test"));
    }

    #[test]
    fn test_errors_never_echo_plaintext() {
        let err = CryptoError::Encryption("seal failed");
        assert_eq!(err.to_string(), "encryption failed: seal failed");
    }
}
