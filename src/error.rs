//! Error types for the Texnote editor
//!
//! This module provides structured error definitions using thiserror. Every
//! failure the editor session can surface to a user maps onto one of the
//! variants below.

use thiserror::Error;

/// Main error type for Texnote operations
#[derive(Error, Debug)]
pub enum TexnoteError {
    /// Bad or missing user input
    #[error("{0}")]
    Validation(String),

    /// Operation needs an authenticated session
    #[error("{0}")]
    AuthRequired(String),

    /// Referenced note no longer exists
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Failure reported by an external collaborator, message kept verbatim
    #[error("{message}")]
    Collaborator {
        /// Which collaborator failed (identity, notes, compile, artifacts)
        service: &'static str,
        /// The collaborator's own message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl TexnoteError {
    /// Build a collaborator error
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        TexnoteError::Collaborator {
            service,
            message: message.into(),
        }
    }

    /// Whether the user can fix this by changing input or logging in
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TexnoteError::Validation(_) | TexnoteError::AuthRequired(_) | TexnoteError::NotFound(_)
        )
    }
}

/// Result type alias for Texnote operations
pub type Result<T> = std::result::Result<T, TexnoteError>;

/// Convert anyhow::Error to TexnoteError
impl From<anyhow::Error> for TexnoteError {
    fn from(err: anyhow::Error) -> Self {
        TexnoteError::Other(err.to_string())
    }
}
