//! Error types for alarmsim.
//!
//! This module defines all error types used throughout the alarmsim crate,
//! providing detailed context for debugging and user-friendly error messages.

use thiserror::Error;

/// The main error type for alarmsim operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A setting needed for the requested operation is not configured.
    #[error("missing configuration value '{key}'. {hint}")]
    ConfigMissing {
        /// Dotted configuration key.
        key: &'static str,
        /// How to provide the value.
        hint: String,
    },

    /// A URL could not be parsed.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    // === Dispatch Errors ===
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingestion endpoint answered with a non-success status.
    #[error("endpoint rejected event batch with status {status}: {body}")]
    EndpointStatus {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    // === I/O Errors ===
    /// File system or stdout operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for alarmsim operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new configuration validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a missing configuration error with a hint.
    #[must_use]
    pub fn config_missing(key: &'static str, hint: impl Into<String>) -> Self {
        Self::ConfigMissing {
            key,
            hint: hint.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from the remote endpoint or the network,
    /// as opposed to local configuration.
    #[must_use]
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::EndpointStatus { .. })
    }

    /// Check if this error is a configuration issue.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad(_)
                | Self::ConfigValidation { .. }
                | Self::ConfigMissing { .. }
                | Self::InvalidUrl { .. }
        )
    }
}
