//! Error types for the vanaspati client.

use thiserror::Error;

/// Result type alias using vanaspati's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vanaspati client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The server rejected the bearer token (HTTP 401).
    ///
    /// By the time a caller sees this, the credential store has already been
    /// cleared and a login-required event has been emitted.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Input rejected client-side before any network call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The server answered with a non-success status other than 401.
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// HTTP/network request failed before a response arrived
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by this error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(_) => Some(401),
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Serialization(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}
