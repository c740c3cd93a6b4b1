//! Error types for inspector-inject.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use inspector_inject::{Injector, Result};
//!
//! async fn example(injector: &Injector) -> Result<()> {
//!     let outcome = injector.inject(9229, "process.pid").await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Discovery | [`Error::DiscoveryProbeFailed`], [`Error::TargetNotFound`] |
//! | Connection | [`Error::Handshake`], [`Error::ConnectionClosed`], [`Error::OperationTimeout`] |
//! | Framing | [`Error::PayloadTooLarge`], [`Error::UnsupportedFrameLength`], [`Error::Protocol`] |
//! | RPC | [`Error::UnexpectedResponseId`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when injector options are inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Debugger URL could not be used.
    ///
    /// Returned when a URL is malformed or not a plain `ws://` URL.
    #[error("Invalid debugger URL {url}: {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// A single discovery probe failed.
    ///
    /// Never surfaced by a scan: the port is skipped instead.
    #[error("Probe of port {port} failed: {message}")]
    DiscoveryProbeFailed {
        /// Probed port.
        port: u16,
        /// Description of the failure.
        message: String,
    },

    /// No inspector answered on the requested port.
    #[error("No inspector found on port {port}")]
    TargetNotFound {
        /// Requested port.
        port: u16,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket upgrade failed.
    ///
    /// Returned when the socket fails, closes, or times out before the
    /// handshake succeeds, or when the server refuses the upgrade.
    #[error("Handshake failed: {message}")]
    Handshake {
        /// Description of the handshake failure.
        message: String,
    },

    /// WebSocket connection closed unexpectedly.
    ///
    /// Returned when the connection is lost with a call in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The overall operation deadline elapsed.
    ///
    /// Treated as a benign outcome by the injector.
    #[error("Operation timed out after {timeout_ms}ms")]
    OperationTimeout {
        /// Milliseconds allowed for the operation.
        timeout_ms: u64,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// Outbound payload does not fit a 16-bit length frame.
    #[error("Payload of {len} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
        /// Largest payload that can be sent.
        max: usize,
    },

    /// Inbound frame uses a length encoding this client does not read.
    #[error("Unsupported frame length marker {marker}")]
    UnsupportedFrameLength {
        /// The 7-bit length marker found in the header.
        marker: u8,
    },

    /// Protocol violation or unexpected message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // RPC Errors
    // ========================================================================
    /// Response id does not match the call in flight.
    #[error("Expected response {expected}, got {actual}")]
    UnexpectedResponseId {
        /// Id of the call in flight.
        expected: RequestId,
        /// Id found in the response.
        actual: RequestId,
        /// The full response message.
        response: Box<Value>,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

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

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a discovery probe error.
    #[inline]
    pub fn probe_failed(port: u16, message: impl Into<String>) -> Self {
        Self::DiscoveryProbeFailed {
            port,
            message: message.into(),
        }
    }

    /// Creates a target not found error.
    #[inline]
    pub fn target_not_found(port: u16) -> Self {
        Self::TargetNotFound { port }
    }

    /// Creates a handshake error.
    #[inline]
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
        }
    }

    /// Creates an operation timeout error.
    #[inline]
    pub fn operation_timeout(timeout_ms: u64) -> Self {
        Self::OperationTimeout { timeout_ms }
    }

    /// Creates a payload too large error.
    #[inline]
    pub fn payload_too_large(len: usize, max: usize) -> Self {
        Self::PayloadTooLarge { len, max }
    }

    /// Creates an unsupported frame length error.
    #[inline]
    pub fn unsupported_frame_length(marker: u8) -> Self {
        Self::UnsupportedFrameLength { marker }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unexpected response id error.
    #[inline]
    pub fn unexpected_response_id(expected: RequestId, actual: RequestId, response: Value) -> Self {
        Self::UnexpectedResponseId {
            expected,
            actual,
            response: Box::new(response),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::handshake("connection refused");
        assert_eq!(err.to_string(), "Handshake failed: connection refused");
    }

    #[test]
    fn test_frame_error_display() {
        let err = Error::payload_too_large(70_000, 65_535);
        assert_eq!(
            err.to_string(),
            "Payload of 70000 bytes exceeds the 65535 byte frame limit"
        );

        let err = Error::unsupported_frame_length(127);
        assert_eq!(err.to_string(), "Unsupported frame length marker 127");
    }

    #[test]
    fn test_target_not_found_display() {
        let err = Error::target_not_found(9229);
        assert_eq!(err.to_string(), "No inspector found on port 9229");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::operation_timeout(5000);
        let other_err = Error::handshake("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
