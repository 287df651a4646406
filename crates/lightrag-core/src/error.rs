//! Error types for the LightRAG gateway.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Stable classification of a failed invocation.
///
/// The string forms are part of the tool-error payload and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConnectionError,
    TimeoutError,
    AuthError,
    ValidationError,
    ServerError,
    #[serde(rename = "APIError")]
    ApiError,
    UnknownTool,
    StreamError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionError => "ConnectionError",
            Self::TimeoutError => "TimeoutError",
            Self::AuthError => "AuthError",
            Self::ValidationError => "ValidationError",
            Self::ServerError => "ServerError",
            Self::ApiError => "APIError",
            Self::UnknownTool => "UnknownTool",
            Self::StreamError => "StreamError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while serving a tool invocation.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Backend could not be reached.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Exchange exceeded the configured deadline.
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Backend rejected the credential (401/403).
    #[error("Authentication failed (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    /// Arguments rejected locally or by backend schema validation (422).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Backend internal failure (5xx).
    #[error("Server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    /// Any other non-success HTTP outcome.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// A success response whose body did not match the expected shape.
    #[error("Unexpected response body (HTTP {status}): {message}")]
    Decode {
        status: u16,
        message: String,
        body: String,
    },

    /// Tool name outside the catalog.
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// Failure after a stream was successfully opened.
    #[error("Stream error: {message}")]
    Stream { message: String },

    /// Local configuration is unusable. Reported as a connection failure
    /// since no backend can be reached with it.
    #[error("Cannot connect, local configuration is invalid: {message}")]
    Config { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a local validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status with its raw body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Auth { status, body },
            422 => Self::Validation {
                message: format!("backend rejected the request (HTTP 422): {}", body),
                status: Some(status),
                body: Some(body),
            },
            500..=599 => Self::Server { status, body },
            _ => Self::Api { status, body },
        }
    }

    /// Get the stable error kind for tool responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } | Self::Config { .. } => ErrorKind::ConnectionError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::Auth { .. } => ErrorKind::AuthError,
            Self::Validation { .. } | Self::Io(_) => ErrorKind::ValidationError,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Api { .. } | Self::Decode { .. } | Self::Serialization(_) => ErrorKind::ApiError,
            Self::UnknownTool { .. } => ErrorKind::UnknownTool,
            Self::Stream { .. } => ErrorKind::StreamError,
        }
    }

    /// HTTP status reported by the backend, if the failure came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. }
            | Self::Server { status, .. }
            | Self::Api { status, .. }
            | Self::Decode { status, .. } => Some(*status),
            Self::Validation { status, .. } => *status,
            _ => None,
        }
    }

    /// Raw backend response body, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. }
            | Self::Server { body, .. }
            | Self::Api { body, .. }
            | Self::Decode { body, .. } => Some(body),
            Self::Validation { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}
