//! Gateway Error Types
//!
//! This module defines the failure type returned by every request that goes
//! through the session gateway. The same value may be handed to several
//! callers at once (every request queued behind a failed refresh receives the
//! refresh error), so the type is `Clone` and carries only owned strings.
//!
//! # Error Categories
//!
//! - `Transport` - the request never produced an HTTP response
//! - `Status` - the backend answered with a non-2xx status (401 included)
//! - `RefreshAbandoned` - a queued request whose refresh cycle was dropped
//! - `InvalidRequest` - the request could not be built (bad URL or header)
//!
//! # Usage
//!
//! ```rust
//! use docportal::shared::error::GatewayError;
//!
//! let error = GatewayError::status(401, "token expired");
//! assert!(error.is_unauthorized());
//! ```
use thiserror::Error;

/// Failure observed by a gateway caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network or I/O failure; never retried by the gateway
    #[error("Network error: {message}")]
    Transport {
        /// Human-readable error message
        message: String,
    },

    /// Non-success HTTP status returned by the backend
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body as text (may be empty)
        body: String,
    },

    /// The refresh cycle this request was queued behind was dropped before it settled
    #[error("Session refresh was abandoned before it completed")]
    RefreshAbandoned,

    /// The request could not be constructed
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message
        message: String,
    },
}

impl GatewayError {
    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a new invalid-request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the request as unauthenticated (401)
    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::invalid_request(err.to_string())
        } else {
            Self::transport(err.to_string())
        }
    }
}
