//! Feed error types.

use std::time::Duration;

/// Failure of a single feed fetch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, TLS or body read failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The request did not finish within the configured window
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The feed answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },
}

/// Why a payload did not yield a station snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseOutcome {
    /// The payload is not a usable feed document
    #[error("malformed feed document: {0}")]
    Malformed(String),

    /// The document is valid but does not contain the station
    #[error("station not found in feed")]
    NotFound,
}
