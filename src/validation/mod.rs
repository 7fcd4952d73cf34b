//! # Validation Engine
//!
//! Pattern and membership checks applied to every secret request before
//! any backend call. Patterns come from configuration and are compiled
//! once. A pattern must match the whole input, not a substring of it.
//!
//! Failures are client errors that name the field and the expected
//! pattern. They never include the rejected input, since for values that
//! input is the secret itself.

use crate::config::SecretManagerConfig;
use crate::errors::{ErrorMessage, Result, SecretManagementError};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Whether a string is empty or whitespace only
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A configured pattern together with its full-match compilation
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    compiled: Regex,
}

impl Pattern {
    fn compile(field: &str, source: &str) -> Result<Self> {
        let compiled = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            SecretManagementError::config(format!("{} pattern does not compile: {}", field, e))
        })?;
        Ok(Self { source: source.to_string(), compiled })
    }

    fn is_match(&self, input: &str) -> bool {
        self.compiled.is_match(input)
    }
}

/// Compiled validation rules for secret requests
#[derive(Debug, Clone)]
pub struct SecretValidator {
    secret_types: HashSet<String>,
    name: Pattern,
    value: Pattern,
    description: Pattern,
}

impl SecretValidator {
    /// Compile the validator from configuration
    pub fn new(config: &SecretManagerConfig) -> Result<Self> {
        Ok(Self {
            secret_types: config.secret_types.iter().cloned().collect(),
            name: Pattern::compile("secret name", &config.name_regex)?,
            value: Pattern::compile("secret value", &config.value_regex)?,
            description: Pattern::compile("secret description", &config.description_regex)?,
        })
    }

    /// Check that a secret type name is present and belongs to the configured set
    pub fn validate_secret_type(&self, secret_type: &str) -> Result<()> {
        if is_blank(secret_type) {
            debug!("Secret type name is blank");
            return Err(SecretManagementError::client(ErrorMessage::SecretTypeNameRequired, None));
        }
        if !self.secret_types.contains(secret_type) {
            debug!(secret_type = %secret_type, "Unknown secret type");
            return Err(SecretManagementError::client(
                ErrorMessage::SecretTypeDoesNotExist,
                Some(secret_type),
            ));
        }
        Ok(())
    }

    pub fn validate_secret_name(&self, name: &str) -> Result<()> {
        if !self.name.is_match(name) {
            debug!(pattern = %self.name.source, "Secret name does not conform to pattern");
            return Err(SecretManagementError::client(
                ErrorMessage::InvalidSecretName,
                Some(&self.name.source),
            ));
        }
        Ok(())
    }

    pub fn validate_secret_value(&self, value: &str) -> Result<()> {
        if !self.value.is_match(value) {
            debug!(pattern = %self.value.source, "Secret value does not conform to pattern");
            return Err(SecretManagementError::client(
                ErrorMessage::InvalidSecretValue,
                Some(&self.value.source),
            ));
        }
        Ok(())
    }

    /// An absent description is always valid
    pub fn validate_secret_description(&self, description: Option<&str>) -> Result<()> {
        match description {
            Some(description) if !self.description.is_match(description) => {
                debug!(
                    pattern = %self.description.source,
                    "Secret description does not conform to pattern"
                );
                Err(SecretManagementError::client(
                    ErrorMessage::InvalidSecretDescription,
                    Some(&self.description.source),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Whether the type name is one of the configured secret types
    pub fn is_known_type(&self, secret_type: &str) -> bool {
        self.secret_types.contains(secret_type)
    }
}
