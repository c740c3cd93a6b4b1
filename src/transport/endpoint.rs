//! Debugger URL parsing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Endpoint
// ============================================================================

/// A parsed `ws://host:port/path` debugger URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `host:port`, used both to connect and as the `Host` header.
    authority: String,
    /// Request target: path plus query string.
    resource: String,
}

impl Endpoint {
    /// Parses a debugger URL.
    ///
    /// The port defaults to 80 and the path to `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL is malformed, has no host,
    /// or uses a scheme other than `ws`.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| Error::invalid_url(raw, e.to_string()))?;

        if url.scheme() != "ws" {
            return Err(Error::invalid_url(
                raw,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_url(raw, "missing host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::invalid_url(raw, "missing port"))?;

        let mut resource = url.path().to_string();
        if let Some(query) = url.query() {
            resource.push('?');
            resource.push_str(query);
        }

        Ok(Self {
            authority: format!("{host}:{port}"),
            resource,
        })
    }

    /// Returns `host:port`.
    #[inline]
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns the request target sent in the upgrade request.
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws://{}{}", self.authority, self.resource)
    }
}

// ============================================================================
// Tests
// ============================================================================
