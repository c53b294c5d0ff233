//! REST client error types
//!
//! `ClientError` is what the identity and document clients return. Gateway
//! failures are wrapped unchanged so callers can still tell an expired session
//! (`is_unauthorized`) from everything else.

use thiserror::Error;

use crate::shared::error::GatewayError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request failed in the gateway or on the wire
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Input rejected before any request was sent
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The backend answered with a body we could not decode
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Login succeeded but the profile could not be loaded afterwards
    #[error("Logged in, but the user profile could not be loaded")]
    MissingProfile,
}

impl ClientError {
    /// Create a new validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the session is gone (401 that the gateway could not recover)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Gateway(err) if err.is_unauthorized())
    }

    /// HTTP status behind this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Gateway(err) => err.status_code(),
            _ => None,
        }
    }
}
