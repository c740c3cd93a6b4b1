//! Inspector target descriptors.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// InspectorTarget
// ============================================================================

/// A debuggable process found by discovery.
///
/// Serializes as `{"port": .., "title": .., "url": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectorTarget {
    /// Port the inspector HTTP endpoint answered on.
    pub port: u16,

    /// Human-readable title, usually the script path.
    pub title: String,

    /// `ws://` URL of the debugger endpoint.
    #[serde(rename = "url")]
    pub debugger_url: String,
}

/// One entry of the `/json` listing.
#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    title: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

impl InspectorTarget {
    /// Creates a target.
    #[inline]
    #[must_use]
    pub fn new(port: u16, title: impl Into<String>, debugger_url: impl Into<String>) -> Self {
        Self {
            port,
            title: title.into(),
            debugger_url: debugger_url.into(),
        }
    }

    /// Builds a target from the first entry of a `/json` listing body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryProbeFailed`] if the body is not a JSON
    /// array, the array is empty, or its first entry has no debugger URL.
    pub fn from_listing(port: u16, body: &[u8]) -> Result<Self> {
        let listing: Vec<Value> = serde_json::from_slice(body)
            .map_err(|e| Error::probe_failed(port, format!("invalid listing: {e}")))?;

        let first = listing
            .into_iter()
            .next()
            .ok_or_else(|| Error::probe_failed(port, "empty listing"))?;

        let descriptor: Descriptor = serde_json::from_value(first)
            .map_err(|e| Error::probe_failed(port, format!("invalid descriptor: {e}")))?;

        let debugger_url = descriptor
            .web_socket_debugger_url
            .ok_or_else(|| Error::probe_failed(port, "descriptor has no webSocketDebuggerUrl"))?;

        Ok(Self::new(port, descriptor.title, debugger_url))
    }
}

// ============================================================================
// Tests
// ============================================================================
