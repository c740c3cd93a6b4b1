//! Minimal HTTP/1.0 GET client for inspector listings.
//!
//! Sends one request with `Connection: close` and reads the body up to
//! `Content-Length`, or to EOF when the header is absent. Chunked
//! transfer encoding is never negotiated because the request is HTTP/1.0.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on a listing response.
const MAX_RESPONSE_LEN: usize = 1024 * 1024;

const READ_CHUNK_LEN: usize = 4096;

// ============================================================================
// HttpResponse
// ============================================================================

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code from the status line.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for a 2xx status.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Parsed status line and headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResponseHead {
    status: u16,
    header_len: usize,
    content_length: Option<usize>,
}

// ============================================================================
// Request
// ============================================================================

/// Performs `GET <path>` against `addr`.
///
/// # Errors
///
/// - [`Error::Io`] if the connection or a read fails
/// - [`Error::Protocol`] if the response is malformed, truncated, or too large
pub async fn get(addr: SocketAddr, path: &str) -> Result<HttpResponse> {
    let mut stream = TcpStream::connect(addr).await?;

    let request = format!(
        "GET {path} HTTP/1.0\r\n\
         Host: {addr}\r\n\
         Accept: application/json\r\n\
         Connection: close\r\n\
         \r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::with_capacity(READ_CHUNK_LEN);
    let mut chunk = [0u8; READ_CHUNK_LEN];
    let mut head: Option<ResponseHead> = None;

    loop {
        if let Some(ResponseHead {
            header_len,
            content_length: Some(len),
            ..
        }) = head
            && buf.len() >= header_len + len
        {
            break;
        }

        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }

        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_RESPONSE_LEN {
            return Err(Error::protocol(format!(
                "HTTP response exceeds {MAX_RESPONSE_LEN} bytes"
            )));
        }

        if head.is_none() {
            head = parse_head(&buf)?;
        }
    }

    let head = head.ok_or_else(|| Error::protocol("incomplete HTTP response"))?;
    let mut body = buf.split_off(head.header_len);

    if let Some(len) = head.content_length {
        if body.len() < len {
            return Err(Error::protocol(format!(
                "HTTP body truncated: {} of {len} bytes",
                body.len()
            )));
        }
        body.truncate(len);
    }

    trace!(%addr, path, status = head.status, body_len = body.len(), "HTTP response received");

    Ok(HttpResponse {
        status: head.status,
        body,
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parses the response head once the blank line has arrived.
fn parse_head(buf: &[u8]) -> Result<Option<ResponseHead>> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };

    let text = String::from_utf8_lossy(&buf[..end]);
    let mut lines = text.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split(' ')
        .nth(1)
        .filter(|_| status_line.starts_with("HTTP/"))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| Error::protocol(format!("malformed status line: {status_line}")))?;

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::protocol(format!("invalid Content-Length: {value}")))
        })
        .transpose()?;

    Ok(Some(ResponseHead {
        status,
        header_len: end + 4,
        content_length,
    }))
}

// ============================================================================
// Tests
// ============================================================================
