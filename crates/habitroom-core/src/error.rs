//! Core error types for habitroom-core.
//!
//! Errors are split by layer: validation failures never touch the network,
//! backend failures carry the service's own error code, and configuration
//! failures name the offending key.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for habitroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backend service errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input rejected before any network call
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Credential store errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Errors returned by the backend service or its transport.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport failure (DNS, TLS, connection reset, ...)
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("{message} ({kind}, {code})")]
    Api {
        code: u16,
        kind: String,
        message: String,
    },

    /// Realtime channel failure
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// Response body did not match the expected document shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request that needs a session was made without one
    #[error("Not signed in")]
    NotAuthenticated,
}

impl BackendError {
    /// Whether the service rejected the session (expired or revoked).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Api { code: 401, .. } | BackendError::NotAuthenticated)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BackendError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BackendError::Realtime(err.to_string())
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors. The display text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Password must be at least {min} characters long.")]
    PasswordTooShort { min: usize },

    /// A required text field was left empty
    #[error("{field} is required.")]
    Required { field: &'static str },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingCredentials.to_string(),
            "Email and password are required."
        );
        assert_eq!(
            ValidationError::PasswordTooShort { min: 6 }.to_string(),
            "Password must be at least 6 characters long."
        );
        assert_eq!(
            ValidationError::Required { field: "Title" }.to_string(),
            "Title is required."
        );
    }

    #[test]
    fn api_error_is_unauthorized_only_for_401() {
        let unauthorized = BackendError::Api {
            code: 401,
            kind: "user_unauthorized".into(),
            message: "The current user is not authorized".into(),
        };
        let conflict = BackendError::Api {
            code: 409,
            kind: "user_already_exists".into(),
            message: "A user with the same id already exists".into(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!conflict.is_unauthorized());
        assert!(BackendError::NotAuthenticated.is_unauthorized());
    }

    #[test]
    fn core_error_wraps_validation_transparently() {
        let err: CoreError = ValidationError::MissingCredentials.into();
        assert_eq!(err.to_string(), "Email and password are required.");
    }
}
