//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing request ids with other integers
//! such as ports or frame lengths.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// RequestId
// ============================================================================

/// JSON-RPC request identifier.
///
/// Echoed verbatim by the remote end in the matching response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a request id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The id of the first call on a connection.
    #[inline]
    #[must_use]
    pub const fn first() -> Self {
        Self(1)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_is_one() {
        assert_eq!(RequestId::first().get(), 1);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&RequestId::new(7)).expect("serialize");
        assert_eq!(json, "7");

        let id: RequestId = serde_json::from_str("42").expect("parse");
        assert_eq!(id, RequestId::new(42));
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestId::new(3).to_string(), "3");
    }
}
