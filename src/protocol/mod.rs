//! JSON-RPC message types.
//!
//! This module defines the message format exchanged with an inspector
//! over an established WebSocket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `RpcRequest` | Local → Remote | Method call |
//! | `RpcResponse` | Remote → Local | Call result or error |
//! | `Event` | Remote → Local | Notification, ignored by this client |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed command definitions |
//! | `event` | Event type and inbound message classification |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Typed command definitions.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, RuntimeCommand};
pub use event::{Event, Incoming};
pub use request::{RpcRequest, RpcResponse};
