//! Error types for nlq-console.
//!
//! Defines the main error enum used throughout the client.

use thiserror::Error;

/// Main error type for client operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// Input rejected before any request was sent (blank query, empty batch, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// No response was received (connection refused, DNS failure, reset, ...).
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The server answered, but the body could not be interpreted at all.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration errors (invalid config file, bad server URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal client errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a server error for the given HTTP status.
    pub fn server(status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: msg.into(),
        }
    }

    /// Creates a malformed-response error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation Error",
            Self::Transport(_) => "Network Error",
            Self::Server { .. } => "Server Error",
            Self::MalformedResponse(_) => "Malformed Response",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the message without the category prefix, for status lines.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Transport(msg)
            | Self::MalformedResponse(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg,
            Self::Server { message, .. } => message,
        }
    }
}

/// Result type alias using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;
