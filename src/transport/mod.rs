//! WebSocket transport layer.
//!
//! This module turns a `ws://` debugger URL into a duplex channel of
//! JSON-RPC messages without a WebSocket library.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Injector       │                              │  Debuggee       │
//! │                 │     HTTP/1.1 Upgrade         │  inspector      │
//! │  Connection ────┼─────────────────────────────►│                 │
//! │  (event loop)   │◄────────────────────────────►│  ws://host:port │
//! │                 │   masked ▲      ▼ unmasked   │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Endpoint::parse` - Split the debugger URL into authority and path
//! 2. `HandshakeRequest::perform` - Upgrade the TCP stream
//! 3. `Connection` - Send calls, receive responses
//! 4. `Connection::close` - Close frame, or drop every handle
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Event loop and request/response correlation |
//! | `endpoint` | Debugger URL parsing |
//! | `frame` | Frame encoding, masking and incremental decoding |
//! | `handshake` | Upgrade request and response validation |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Debugger URL parsing.
pub mod endpoint;

/// Frame codec.
pub mod frame;

/// HTTP/1.1 Upgrade handshake.
pub mod handshake;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use endpoint::Endpoint;
pub use frame::{Frame, FrameDecoder, MAX_PAYLOAD_LEN, Opcode, Role, apply_mask};
pub use handshake::{
    HandshakeRequest, HandshakeStatus, HandshakeValidator, LooseValidator, StrictValidator,
};
