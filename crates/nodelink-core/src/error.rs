//! Error types for nodelink.
//!
//! A single error enum covers the engine, the transport and the facades so
//! callers can match on one type regardless of which layer failed.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the nodelink library.
#[derive(Debug, Error)]
pub enum RpcError {
    // Inbound protocol errors
    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    #[error("Received response with unexpected ID: {id}")]
    UnmatchedResponseId { id: String },

    // Per-call errors
    #[error("RPC failed; {message} (code {code})")]
    RemoteCallFailed {
        code: i64,
        message: String,
        /// Optional `data` member of the error object
        data: Option<serde_json::Value>,
    },

    #[error("Response timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode result: {message}")]
    Decode { message: String },

    // Lifecycle errors
    #[error("Transport is not connected")]
    NotAttached,

    #[error("A transport is already attached")]
    AlreadyAttached,

    #[error("RPC closed")]
    ConnectionClosed,

    #[error("Transport error: {message}")]
    Transport { message: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for nodelink operations.
pub type Result<T> = std::result::Result<T, RpcError>;

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RpcError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        match err {
            tokio_tungstenite::tungstenite::Error::ConnectionClosed
            | tokio_tungstenite::tungstenite::Error::AlreadyClosed => RpcError::ConnectionClosed,
            other => RpcError::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for RpcError {
    fn from(err: url::ParseError) -> Self {
        RpcError::Config {
            message: format!("Invalid node URL: {}", err),
        }
    }
}

impl RpcError {
    /// Create a decode error from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        RpcError::Decode {
            message: cause.to_string(),
        }
    }

    /// Whether this error invalidates the whole connection scope.
    ///
    /// Only a response for an id nobody is waiting for is fatal; malformed
    /// messages are dropped and everything else is local to one call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RpcError::UnmatchedResponseId { .. })
    }

    /// The server-reported error code, if the server rejected the call.
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            RpcError::RemoteCallFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if the server reported that the requested item does not exist.
    ///
    /// Node APIs signal absence through the error message
    /// (e.g. `header: not found`, `blob: not found`).
    pub fn is_not_found(&self) -> bool {
        match self {
            RpcError::RemoteCallFailed { message, .. } => {
                message.to_lowercase().contains("not found")
            }
            _ => false,
        }
    }

    /// Check if the error came from the connection going away.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            RpcError::ConnectionClosed | RpcError::NotAttached | RpcError::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RpcError::RemoteCallFailed {
            code: 1,
            message: "boom".into(),
            data: None,
        };
        assert_eq!(err.to_string(), "RPC failed; boom (code 1)");
        assert_eq!(RpcError::ConnectionClosed.to_string(), "RPC closed");
    }

    #[test]
    fn test_only_unmatched_id_is_fatal() {
        assert!(RpcError::UnmatchedResponseId { id: "x".into() }.is_fatal());
        assert!(!RpcError::MalformedMessage {
            message: "bad".into()
        }
        .is_fatal());
        assert!(!RpcError::ConnectionClosed.is_fatal());
    }

    #[test]
    fn test_not_found_detection() {
        let err = RpcError::RemoteCallFailed {
            code: 1,
            message: "header: not found".into(),
            data: None,
        };
        assert!(err.is_not_found());
        assert_eq!(err.remote_code(), Some(1));
        assert!(!RpcError::NotAttached.is_not_found());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: RpcError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RpcError::Json { .. }));
    }
}
