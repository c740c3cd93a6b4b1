//! Command definitions for the debug protocol.
//!
//! Commands follow the `Domain.methodName` format. Only the runtime
//! domain is modelled: this client evaluates expressions and nothing else.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// Serializes to `{"method": "...", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
}

impl Command {
    /// Creates a `Runtime.evaluate` command that returns its value by value.
    #[inline]
    #[must_use]
    pub fn evaluate(expression: impl Into<String>) -> Self {
        Self::Runtime(RuntimeCommand::Evaluate {
            expression: expression.into(),
            return_by_value: true,
        })
    }
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Evaluate an expression in the target's global context.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// Source text to evaluate.
        expression: String,
        /// Serialize the result instead of returning a remote object handle.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
