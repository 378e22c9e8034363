//! Error types for the activity tracker.
//!
//! This module defines all error types used throughout the crate.
//!
//! Errors never escape the tracker's public recording surface: `record`,
//! `flush`, `tick` and `teardown` log failures and degrade to "try again
//! later". [`Result<T>`] is returned by configuration and by the
//! [`Transport`](crate::transport::Transport) seam, where the tracker
//! consumes it to decide between requeueing and moving on.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Url`] |
//! | Delivery | [`Error::Http`], [`Error::Status`], [`Error::Connection`], [`Error::TransportClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::protocol::Endpoint;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when tracker or transport configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Collector URL could not be parsed or joined.
    #[error("Invalid collector URL: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// HTTP client error (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Collector answered with a non-success status.
    #[error("Collector rejected {endpoint} with status {status}")]
    Status {
        /// Endpoint that was called.
        endpoint: Endpoint,
        /// HTTP status code.
        status: u16,
    },

    /// Delivery failed before reaching the collector.
    ///
    /// Used by in-process transports to simulate network failures.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The best-effort delivery worker is gone.
    #[error("Transport closed")]
    TransportClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Collector reply did not match the expected shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a status error.
    #[inline]
    pub fn status(endpoint: Endpoint, status: u16) -> Self {
        Self::Status { endpoint, status }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the request never got a usable answer from the
    /// collector.
    #[inline]
    #[must_use]
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::Connection { .. } | Self::TransportClosed
        )
    }

    /// Returns `true` if a later attempt may succeed.
    ///
    /// Client errors (4xx) and configuration errors are not recoverable.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            Self::Http(_) | Self::Connection { .. } => true,
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
