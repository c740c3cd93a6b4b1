//! Inbound message classification.
//!
//! The inspector sends two kinds of text messages: responses, which carry
//! the id of a call, and events, which carry only a method name.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use super::RpcResponse;

// ============================================================================
// Event
// ============================================================================

/// A notification from the inspector (no request id).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event name, e.g. `Runtime.consoleAPICalled`.
    pub method: String,

    /// Event payload.
    #[serde(default)]
    pub params: Option<Value>,
}

// ============================================================================
// Incoming
// ============================================================================

/// Any message the inspector can send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    /// Reply to a call.
    Response(RpcResponse),
    /// Unsolicited notification.
    Event(Event),
}

impl Incoming {
    /// Parses a text frame payload.
    ///
    /// Returns `None` for payloads that are not JSON messages.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
