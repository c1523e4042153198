/*
[INPUT]:  Error sources (HTTP, API, auth, polling, serialization)
[OUTPUT]: Structured error types with classification helpers
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the Stride client.
#[derive(Error, Debug)]
pub enum StrideError {
    /// HTTP transport failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-2xx response with a server message
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Identity provider rejected sign-in or sign-up
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Session is no longer valid and could not be refreshed
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Backend reported the queue job as failed
    #[error("{message}")]
    JobFailed { message: String },

    /// Bounded poller gave up waiting; the job itself was not cancelled
    #[error(
        "queue job did not finish after {attempts} status checks; it may still complete server-side"
    )]
    JobTimeout { attempts: u32 },

    /// Poll session was superseded or the caller gave up
    #[error("operation cancelled")]
    Cancelled,

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted-state read/write failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StrideError {
    /// Errors the unbounded poller treats as recoverable: the request
    /// never produced an authoritative job status, so polling continues.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StrideError::Http(_) | StrideError::InvalidResponse(_) | StrideError::Serialization(_)
        )
    }

    /// Errors that mean the session layer must act (sign out / re-auth).
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            StrideError::Auth { .. } | StrideError::SessionExpired
        )
    }
}

/// Result type alias for Stride client operations.
pub type Result<T> = std::result::Result<T, StrideError>;
