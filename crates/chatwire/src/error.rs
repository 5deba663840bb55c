//! Error types for the chatwire library.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, HTTP status, decoding, and input validation
//! errors.
//!
//! Every variant is `Clone`: a single refresh outcome is handed to every
//! caller waiting on it.

use std::fmt;
use thiserror::Error;

/// The unified error type for chatwire operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network transport errors (DNS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing, rejected or refreshed-away credentials).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success HTTP status other than an authentication failure.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Input validation errors (bad base URL).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this error means the user has to log in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out. The limit is unknown when reqwest reports the
    /// timeout on its own.
    #[error("request timed out{}", display_limit(.duration_ms))]
    Timeout { duration_ms: Option<u64> },

    /// Generic HTTP transport error, including a broken body stream.
    #[error("HTTP transport error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { duration_ms: None }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

fn display_limit(duration_ms: &Option<u64>) -> String {
    match duration_ms {
        Some(ms) => format!(" after {}ms", ms),
        None => String::new(),
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
///
/// Whenever one of these is returned by the session or request layer, the
/// stored credentials have already been cleared.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credentials are stored.
    #[error("not logged in")]
    MissingCredentials,

    /// The server rejected the credentials.
    #[error("credentials rejected{}", display_message(.message))]
    Rejected { message: Option<String> },

    /// The refresh token could not be exchanged for a new access token.
    #[error("token refresh failed: {reason}, please log in again")]
    RefreshFailed { reason: String },

    /// A token existed but the identity attached to it is not valid.
    #[error("invalid session: {reason}, please log in again")]
    InvalidSession { reason: String },
}

fn display_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

/// A non-success HTTP response.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Message supplied by the server, if the body carried one.
    pub message: Option<String>,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message {
            Some(ref message) => write!(f, "{}", message),
            None => write!(f, "request failed with status {}", self.status),
        }
    }
}

impl std::error::Error for HttpError {}

impl HttpError {
    /// Create a new HTTP error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }
}

/// A response body that did not match the expected JSON shape.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(DecodeError::from(err))
    }
}

/// Input validation errors.
#[derive(Debug, Clone, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_prefers_server_message() {
        let err = HttpError::new(422, Some("model not found".to_string()));
        assert_eq!(err.to_string(), "model not found");

        let err = HttpError::new(500, None);
        assert_eq!(err.to_string(), "request failed with status 500");
    }

    #[test]
    fn rejected_includes_optional_message() {
        let err = AuthError::Rejected { message: None };
        assert_eq!(err.to_string(), "credentials rejected");

        let err = AuthError::Rejected {
            message: Some("token expired".to_string()),
        };
        assert_eq!(err.to_string(), "credentials rejected: token expired");
    }

    #[test]
    fn timeout_reports_known_limit_only() {
        let err = TransportError::Timeout {
            duration_ms: Some(200),
        };
        assert_eq!(err.to_string(), "request timed out after 200ms");

        let err = TransportError::Timeout { duration_ms: None };
        assert_eq!(err.to_string(), "request timed out");
    }

    #[test]
    fn auth_errors_are_flagged() {
        let err: Error = AuthError::MissingCredentials.into();
        assert!(err.is_auth());

        let err: Error = HttpError::new(503, None).into();
        assert!(!err.is_auth());
    }
}
