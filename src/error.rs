//! Error types and handling for Endolla
//!
//! This module defines the crate-wide error type. Feed-level failures have
//! their own narrower types in [`crate::feed`] and are folded into
//! [`EndollaError`] where they cross into the coordinator or the API.

use thiserror::Error;

use crate::feed::{FetchError, ParseOutcome};

/// Result type alias for Endolla operations
pub type Result<T> = std::result::Result<T, EndollaError>;

/// Main error type for Endolla
#[derive(Debug, Error)]
pub enum EndollaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Connection-level failures talking to the feed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Non-2xx answer from the feed
    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Feed payload could not be decoded
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A refresh cycle failed; retried on the next interval
    #[error("Update failed: {message}")]
    UpdateFailed {
        message: String,
        #[source]
        source: Option<Box<EndollaError>>,
    },

    /// Lookup of an entry, entity or station that does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },
}

impl EndollaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new HTTP status error
    pub fn http_status<S: Into<String>>(status: u16, message: S) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new update-failed error
    pub fn update_failed<S: Into<String>>(message: S) -> Self {
        Self::UpdateFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an update-failed error keeping the typed cause
    pub fn update_failed_from<S: Into<String>>(message: S, source: EndollaError) -> Self {
        Self::UpdateFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Typed cause of a failed refresh cycle, if any
    pub fn cause(&self) -> Option<&EndollaError> {
        match self {
            Self::UpdateFailed {
                source: Some(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Whether the next scheduled refresh may clear this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::HttpStatus { .. }
                | Self::Decode { .. }
                | Self::UpdateFailed { .. }
        )
    }
}

impl From<std::io::Error> for EndollaError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for EndollaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EndollaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for EndollaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<FetchError> for EndollaError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport { message } => Self::Network { message },
            FetchError::Timeout { after } => {
                Self::timeout(format!("feed request exceeded {after:?}"))
            }
            FetchError::HttpStatus { status, message } => Self::HttpStatus { status, message },
        }
    }
}

impl From<ParseOutcome> for EndollaError {
    fn from(outcome: ParseOutcome) -> Self {
        match outcome {
            ParseOutcome::Malformed(cause) => Self::Decode { message: cause },
            ParseOutcome::NotFound => Self::not_found("station not present in feed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EndollaError::config("test config error");
        assert!(matches!(err, EndollaError::Config { .. }));

        let err = EndollaError::update_failed("boom");
        assert!(matches!(err, EndollaError::UpdateFailed { .. }));
        assert!(err.cause().is_none());

        let err = EndollaError::update_failed_from("boom", EndollaError::decode("EOF"));
        assert!(matches!(err.cause(), Some(EndollaError::Decode { .. })));
        assert!(std::error::Error::source(&err).is_some());

        let err = EndollaError::validation("field", "test validation error");
        assert!(matches!(err, EndollaError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = EndollaError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = EndollaError::validation("station_id", "must not be empty");
        assert_eq!(
            format!("{}", err),
            "Validation error: station_id - must not be empty"
        );

        let err = EndollaError::http_status(503, "Service Unavailable");
        assert_eq!(format!("{}", err), "HTTP error 503: Service Unavailable");
    }

    #[test]
    fn fetch_errors_map_to_retryable_variants() {
        let err: EndollaError = FetchError::Timeout {
            after: std::time::Duration::from_secs(15),
        }
        .into();
        assert!(matches!(err, EndollaError::Timeout { .. }));
        assert!(err.is_retryable());

        let err: EndollaError = FetchError::HttpStatus {
            status: 500,
            message: "Internal Server Error".into(),
        }
        .into();
        assert!(matches!(err, EndollaError::HttpStatus { status: 500, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn parse_outcomes_map_to_decode_and_not_found() {
        let err: EndollaError = ParseOutcome::Malformed("EOF".into()).into();
        assert!(matches!(err, EndollaError::Decode { .. }));

        let err: EndollaError = ParseOutcome::NotFound.into();
        assert!(matches!(err, EndollaError::NotFound { .. }));
        assert!(!err.is_retryable());
    }
}
