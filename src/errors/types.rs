//! # Error Types
//!
//! Two-tier error taxonomy for secret management. Client errors are
//! caller-fixable and map to 4xx responses; server errors are operational
//! and map to 5xx responses. Every error carries a stable code and a
//! rendered description. Descriptions only ever contain identifiers, type
//! names and patterns, never a secret value.

use std::fmt;

/// Custom result type for secret management operations
pub type Result<T> = std::result::Result<T, SecretManagementError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Catalogue of every error the secret manager can raise.
///
/// Each entry owns a stable code, a short message and a description
/// template rendered with the offending identifier or pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorMessage {
    // Client errors
    SecretAddRequestInvalid,
    SecretGetRequestInvalid,
    SecretDeleteRequestRequired,
    SecretReplaceRequestInvalid,
    SecretTypeNameRequired,
    SecretTypeDoesNotExist,
    SecretAlreadyExists,
    SecretDoesNotExist,
    SecretIdDoesNotExist,
    SecretsDoNotExist,
    InvalidSecretId,
    InvalidSecretName,
    InvalidSecretValue,
    InvalidSecretDescription,

    // Server errors
    SecretManagerNotEnabled,
    TenantContextUnavailable,
    NoBackendConfigured,
    AddSecret,
    ReplaceSecret,
    UpdateSecret,
    DecryptSecret,
    BackendOperation,
    InvalidConfiguration,
}

impl ErrorMessage {
    /// Stable error code exposed to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::SecretAddRequestInvalid => "SECRETM_00001",
            Self::SecretGetRequestInvalid => "SECRETM_00002",
            Self::SecretDeleteRequestRequired => "SECRETM_00003",
            Self::SecretReplaceRequestInvalid => "SECRETM_00004",
            Self::SecretTypeNameRequired => "SECRETM_00005",
            Self::SecretTypeDoesNotExist => "SECRETM_00006",
            Self::SecretAlreadyExists => "SECRETM_00007",
            Self::SecretDoesNotExist => "SECRETM_00008",
            Self::SecretIdDoesNotExist => "SECRETM_00009",
            Self::SecretsDoNotExist => "SECRETM_00010",
            Self::InvalidSecretId => "SECRETM_00011",
            Self::InvalidSecretName => "SECRETM_00012",
            Self::InvalidSecretValue => "SECRETM_00013",
            Self::InvalidSecretDescription => "SECRETM_00014",
            Self::SecretManagerNotEnabled => "SECRETM_65001",
            Self::TenantContextUnavailable => "SECRETM_65002",
            Self::NoBackendConfigured => "SECRETM_65003",
            Self::AddSecret => "SECRETM_65004",
            Self::ReplaceSecret => "SECRETM_65005",
            Self::UpdateSecret => "SECRETM_65006",
            Self::DecryptSecret => "SECRETM_65007",
            Self::BackendOperation => "SECRETM_65008",
            Self::InvalidConfiguration => "SECRETM_65009",
        }
    }

    /// Short human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            Self::SecretAddRequestInvalid => "Invalid secret add request",
            Self::SecretGetRequestInvalid => "Invalid secret get request",
            Self::SecretDeleteRequestRequired => "Secret name is required for deletion",
            Self::SecretReplaceRequestInvalid => "Invalid secret replace request",
            Self::SecretTypeNameRequired => "Secret type name is required",
            Self::SecretTypeDoesNotExist => "Secret type does not exist",
            Self::SecretAlreadyExists => "Secret already exists",
            Self::SecretDoesNotExist => "Secret does not exist",
            Self::SecretIdDoesNotExist => "Secret id does not exist",
            Self::SecretsDoNotExist => "No secrets found",
            Self::InvalidSecretId => "Invalid secret id",
            Self::InvalidSecretName => "Invalid secret name",
            Self::InvalidSecretValue => "Invalid secret value",
            Self::InvalidSecretDescription => "Invalid secret description",
            Self::SecretManagerNotEnabled => "Secret manager is not enabled",
            Self::TenantContextUnavailable => "Tenant context is unavailable",
            Self::NoBackendConfigured => "No secret backend configured",
            Self::AddSecret => "Error while adding secret",
            Self::ReplaceSecret => "Error while replacing secret",
            Self::UpdateSecret => "Error while updating secret",
            Self::DecryptSecret => "Error while decrypting secret",
            Self::BackendOperation => "Secret backend operation failed",
            Self::InvalidConfiguration => "Invalid secret manager configuration",
        }
    }

    /// Render the description for this error with optional context data
    pub fn describe(&self, data: Option<&str>) -> String {
        let data = data.unwrap_or("");
        match self {
            Self::SecretAddRequestInvalid => {
                "Secret name and value are required to add a secret.".to_string()
            }
            Self::SecretGetRequestInvalid => {
                "Secret type and secret name are required to retrieve a secret.".to_string()
            }
            Self::SecretDeleteRequestRequired => {
                "Secret type and secret name are required to delete a secret.".to_string()
            }
            Self::SecretReplaceRequestInvalid => {
                "Secret id and value are required to replace a secret.".to_string()
            }
            Self::SecretTypeNameRequired => "Secret type name is required.".to_string(),
            Self::SecretTypeDoesNotExist => format!("Secret type: {} does not exist.", data),
            Self::SecretAlreadyExists => format!("Secret with the name: {} already exists.", data),
            Self::SecretDoesNotExist => format!("Secret with the name: {} does not exist.", data),
            Self::SecretIdDoesNotExist => format!("Secret with the id: {} does not exist.", data),
            Self::SecretsDoNotExist => "No secrets found for the requested type.".to_string(),
            Self::InvalidSecretId => format!("Invalid secret id: '{}'.", data),
            Self::InvalidSecretName => format!("Secret name should conform to {} pattern.", data),
            Self::InvalidSecretValue => format!("Secret value should conform to {} pattern.", data),
            Self::InvalidSecretDescription => {
                format!("Secret description should conform to {} pattern.", data)
            }
            Self::SecretManagerNotEnabled => {
                "Secret management is disabled by configuration.".to_string()
            }
            Self::TenantContextUnavailable => {
                "No tenant is associated with the current request.".to_string()
            }
            Self::NoBackendConfigured => format!("No {} available to serve the request.", data),
            Self::AddSecret => format!("Error while adding secret: {}.", data),
            Self::ReplaceSecret => format!("Error while replacing secret: {}.", data),
            Self::UpdateSecret => format!("Error while updating secret: {}.", data),
            Self::DecryptSecret => format!("Error while decrypting secret: {}.", data),
            Self::BackendOperation => format!("Backend failed during {}.", data),
            Self::InvalidConfiguration => format!("Invalid configuration: {}.", data),
        }
    }

    /// Whether this entry belongs to the client tier
    pub fn is_client(&self) -> bool {
        matches!(
            self,
            Self::SecretAddRequestInvalid
                | Self::SecretGetRequestInvalid
                | Self::SecretDeleteRequestRequired
                | Self::SecretReplaceRequestInvalid
                | Self::SecretTypeNameRequired
                | Self::SecretTypeDoesNotExist
                | Self::SecretAlreadyExists
                | Self::SecretDoesNotExist
                | Self::SecretIdDoesNotExist
                | Self::SecretsDoNotExist
                | Self::InvalidSecretId
                | Self::InvalidSecretName
                | Self::InvalidSecretValue
                | Self::InvalidSecretDescription
        )
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

/// Main error type for secret management
#[derive(thiserror::Error, Debug)]
pub enum SecretManagementError {
    /// Caller-fixable errors
    #[error("{error}: {description}")]
    Client { error: ErrorMessage, description: String },

    /// Operational errors
    #[error("{error}: {description}")]
    Server {
        error: ErrorMessage,
        description: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl SecretManagementError {
    /// Create a client error from a catalogue entry
    pub fn client(error: ErrorMessage, data: Option<&str>) -> Self {
        Self::Client { description: error.describe(data), error }
    }

    /// Create a server error from a catalogue entry
    pub fn server(error: ErrorMessage, data: Option<&str>) -> Self {
        Self::Server { description: error.describe(data), error, source: None }
    }

    /// Create a server error that keeps the underlying cause
    pub fn server_with_source<E>(error: ErrorMessage, data: Option<&str>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Server { description: error.describe(data), error, source: Some(source.into()) }
    }

    /// Create an invalid configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        Self::server(ErrorMessage::InvalidConfiguration, Some(&message))
    }

    /// Create a backend failure error for the named operation
    pub fn backend<E>(operation: &str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::server_with_source(ErrorMessage::BackendOperation, Some(operation), source)
    }

    /// The catalogue entry behind this error
    pub fn error_message(&self) -> ErrorMessage {
        match self {
            Self::Client { error, .. } | Self::Server { error, .. } => *error,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.error_message().code()
    }

    /// Rendered description
    pub fn description(&self) -> &str {
        match self {
            Self::Client { description, .. } | Self::Server { description, .. } => description,
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Whether this error means a single secret did not resolve.
    ///
    /// Collection-level not-found is deliberately excluded.
    pub fn is_secret_not_found(&self) -> bool {
        matches!(
            self,
            Self::Client {
                error: ErrorMessage::SecretDoesNotExist | ErrorMessage::SecretIdDoesNotExist,
                ..
            }
        )
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self.error_message() {
            ErrorMessage::SecretDoesNotExist
            | ErrorMessage::SecretIdDoesNotExist
            | ErrorMessage::SecretsDoNotExist => 404,
            ErrorMessage::SecretAlreadyExists => 409,
            ErrorMessage::SecretManagerNotEnabled => 503,
            other if other.is_client() => 400,
            _ => 500,
        }
    }
}

impl From<sqlx::Error> for SecretManagementError {
    fn from(error: sqlx::Error) -> Self {
        Self::backend("database operation", error)
    }
}

impl From<sqlx::migrate::MigrateError> for SecretManagementError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::backend("schema migration", error)
    }
}

impl From<config::ConfigError> for SecretManagementError {
    fn from(error: config::ConfigError) -> Self {
        Self::server_with_source(
            ErrorMessage::InvalidConfiguration,
            Some("configuration loading failed"),
            error,
        )
    }
}

impl From<validator::ValidationErrors> for SecretManagementError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_creation() {
        let error = SecretManagementError::client(ErrorMessage::SecretAlreadyExists, Some("db-pass"));
        assert!(error.is_client());
        assert_eq!(error.code(), "SECRETM_00007");
        assert_eq!(
            error.to_string(),
            "SECRETM_00007 - Secret already exists: Secret with the name: db-pass already exists."
        );
    }

    #[test]
    fn test_server_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "keystore offline");
        let error = SecretManagementError::server_with_source(ErrorMessage::AddSecret, Some("db-pass"), io);
        assert!(error.is_server());
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), "keystore offline");
    }

    #[test]
    fn test_not_found_discrimination() {
        assert!(SecretManagementError::client(ErrorMessage::SecretDoesNotExist, Some("a"))
            .is_secret_not_found());
        assert!(SecretManagementError::client(ErrorMessage::SecretIdDoesNotExist, Some("a"))
            .is_secret_not_found());
        assert!(!SecretManagementError::client(ErrorMessage::SecretsDoNotExist, None)
            .is_secret_not_found());
        assert!(!SecretManagementError::server(ErrorMessage::BackendOperation, Some("get"))
            .is_secret_not_found());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(SecretManagementError::client(ErrorMessage::InvalidSecretName, None).status_code(), 400);
        assert_eq!(SecretManagementError::client(ErrorMessage::SecretDoesNotExist, None).status_code(), 404);
        assert_eq!(SecretManagementError::client(ErrorMessage::SecretsDoNotExist, None).status_code(), 404);
        assert_eq!(SecretManagementError::client(ErrorMessage::SecretAlreadyExists, None).status_code(), 409);
        assert_eq!(SecretManagementError::server(ErrorMessage::SecretManagerNotEnabled, None).status_code(), 503);
        assert_eq!(SecretManagementError::server(ErrorMessage::NoBackendConfigured, None).status_code(), 500);
    }

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorMessage::SecretAddRequestInvalid,
            ErrorMessage::SecretGetRequestInvalid,
            ErrorMessage::SecretDeleteRequestRequired,
            ErrorMessage::SecretReplaceRequestInvalid,
            ErrorMessage::SecretTypeNameRequired,
            ErrorMessage::SecretTypeDoesNotExist,
            ErrorMessage::SecretAlreadyExists,
            ErrorMessage::SecretDoesNotExist,
            ErrorMessage::SecretIdDoesNotExist,
            ErrorMessage::SecretsDoNotExist,
            ErrorMessage::InvalidSecretId,
            ErrorMessage::InvalidSecretName,
            ErrorMessage::InvalidSecretValue,
            ErrorMessage::InvalidSecretDescription,
            ErrorMessage::SecretManagerNotEnabled,
            ErrorMessage::TenantContextUnavailable,
            ErrorMessage::NoBackendConfigured,
            ErrorMessage::AddSecret,
            ErrorMessage::ReplaceSecret,
            ErrorMessage::UpdateSecret,
            ErrorMessage::DecryptSecret,
            ErrorMessage::BackendOperation,
            ErrorMessage::InvalidConfiguration,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_validation_errors_conversion() {
        use validator::Validate;

        #[derive(Validate)]
        struct Sample {
            #[validate(length(min = 1, message = "Name cannot be empty"))]
            name: String,
        }

        let errors = Sample { name: String::new() }.validate().unwrap_err();
        let error: SecretManagementError = errors.into();
        assert_eq!(error.error_message(), ErrorMessage::InvalidConfiguration);
        assert!(error.description().contains("Name cannot be empty"));
    }
}
