//! HTTP/1.1 Upgrade handshake.
//!
//! The client writes one upgrade request and buffers the response until a
//! [`HandshakeValidator`] accepts or rejects it. Bytes that follow the
//! response header block are returned to the caller so the frame decoder
//! sees them.
//!
//! # Validators
//!
//! | Validator | Accepts when |
//! |-----------|--------------|
//! | [`LooseValidator`] | the bytes `101` appear anywhere in the response |
//! | [`StrictValidator`] | the status line reads `HTTP/1.x 101` |
//!
//! The loose check is the historical behavior of inspector tooling and
//! remains the default. It can misfire on a response that merely contains
//! the digits `101`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Debug;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on buffered response bytes before giving up.
const MAX_RESPONSE_LEN: usize = 16 * 1024;

const READ_CHUNK_LEN: usize = 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

// ============================================================================
// HandshakeStatus
// ============================================================================

/// Verdict of a validator on the response bytes buffered so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// More bytes are needed.
    Pending,
    /// Upgrade succeeded; frame data starts at `header_len`.
    Accepted {
        /// Length of the response header block, terminator included.
        header_len: usize,
    },
    /// The server refused the upgrade.
    Rejected {
        /// Human-readable reason, usually the status line.
        reason: String,
    },
}

// ============================================================================
// HandshakeValidator
// ============================================================================

/// Decides whether an upgrade response is a success.
///
/// Called after every read with the full response buffered so far.
pub trait HandshakeValidator: Debug + Send + Sync {
    /// Inspects the buffered response.
    fn inspect(&self, response: &[u8]) -> HandshakeStatus;
}

/// Accepts any response containing the bytes `101` once its header block
/// has ended.
#[derive(Debug, Clone, Copy, Default)]
pub struct LooseValidator;

impl HandshakeValidator for LooseValidator {
    fn inspect(&self, response: &[u8]) -> HandshakeStatus {
        let header_len = header_len(response);

        match (find(response, b"101"), header_len) {
            (Some(_), Some(header_len)) => HandshakeStatus::Accepted { header_len },
            // Stricter than accepting on `101` alone: the upgrade completes only
            // after `\r\n\r\n`, so header bytes are never decoded as frames. A
            // response that never ends its headers runs into the deadline.
            (Some(_), None) => HandshakeStatus::Pending,
            (None, Some(_)) => HandshakeStatus::Rejected {
                reason: status_line(response),
            },
            (None, None) => HandshakeStatus::Pending,
        }
    }
}

/// Accepts only a `101` status line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictValidator;

impl HandshakeValidator for StrictValidator {
    fn inspect(&self, response: &[u8]) -> HandshakeStatus {
        let Some(line_end) = find(response, b"\r\n") else {
            return HandshakeStatus::Pending;
        };

        let line = String::from_utf8_lossy(&response[..line_end]);
        let mut parts = line.split(' ');
        let version_ok = parts.next().is_some_and(|v| v.starts_with("HTTP/1."));
        let status_ok = parts.next() == Some("101");

        if !(version_ok && status_ok) {
            return HandshakeStatus::Rejected {
                reason: line.into_owned(),
            };
        }

        match header_len(response) {
            Some(header_len) => HandshakeStatus::Accepted { header_len },
            None => HandshakeStatus::Pending,
        }
    }
}

// ============================================================================
// HandshakeRequest
// ============================================================================

/// A WebSocket upgrade request.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    authority: String,
    resource: String,
    key: String,
}

impl HandshakeRequest {
    /// Creates a request with a fresh random key.
    #[must_use]
    pub fn new(endpoint: &Endpoint) -> Self {
        Self::with_key(endpoint, generate_key())
    }

    /// Creates a request with a specific `Sec-WebSocket-Key`.
    #[must_use]
    pub fn with_key(endpoint: &Endpoint, key: impl Into<String>) -> Self {
        Self {
            authority: endpoint.authority().to_string(),
            resource: endpoint.resource().to_string(),
            key: key.into(),
        }
    }

    /// Renders the request with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            self.resource, self.authority, self.key
        )
        .into_bytes()
    }

    /// Sends the request and reads the response until `validator` decides.
    ///
    /// Returns the bytes received after the response headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] if the socket fails or closes before
    /// acceptance, the response is rejected, or it grows past 16 KiB.
    pub async fn perform<S>(&self, stream: &mut S, validator: &dyn HandshakeValidator) -> Result<Vec<u8>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream
            .write_all(&self.to_bytes())
            .await
            .map_err(|e| Error::handshake(format!("failed to send upgrade request: {e}")))?;

        trace!(resource = %self.resource, "Upgrade request sent");

        let mut response = Vec::with_capacity(READ_CHUNK_LEN);
        let mut chunk = [0u8; READ_CHUNK_LEN];

        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| Error::handshake(format!("failed to read upgrade response: {e}")))?;

            if n == 0 {
                let message = if response.is_empty() {
                    "connection closed before any response".to_string()
                } else {
                    format!("connection closed mid-response: {}", status_line(&response))
                };
                return Err(Error::handshake(message));
            }

            response.extend_from_slice(&chunk[..n]);

            match validator.inspect(&response) {
                HandshakeStatus::Pending if response.len() > MAX_RESPONSE_LEN => {
                    return Err(Error::handshake(format!(
                        "no upgrade confirmation within {MAX_RESPONSE_LEN} bytes"
                    )));
                }
                HandshakeStatus::Pending => {}
                HandshakeStatus::Accepted { header_len } => {
                    let residual = response.split_off(header_len);
                    debug!(
                        authority = %self.authority,
                        residual = residual.len(),
                        "WebSocket handshake completed"
                    );
                    return Ok(residual);
                }
                HandshakeStatus::Rejected { reason } => {
                    return Err(Error::handshake(format!("upgrade refused: {reason}")));
                }
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Generates a `Sec-WebSocket-Key`: 16 random bytes, base64-encoded.
#[must_use]
pub fn generate_key() -> String {
    STANDARD.encode(rand::random::<[u8; 16]>())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn header_len(response: &[u8]) -> Option<usize> {
    find(response, HEADER_TERMINATOR).map(|i| i + HEADER_TERMINATOR.len())
}

fn status_line(response: &[u8]) -> String {
    let end = find(response, b"\r\n").unwrap_or(response.len());
    String::from_utf8_lossy(&response[..end]).into_owned()
}

// ============================================================================
// Tests
// ============================================================================
