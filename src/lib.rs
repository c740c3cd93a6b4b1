//! Inspector Inject - evaluate expressions in running Node.js processes.
//!
//! Finds processes started with `--inspect`, connects to their debugger
//! endpoint over a hand-rolled WebSocket client, and runs a single
//! `Runtime.evaluate` call per invocation.
//!
//! # Architecture
//!
//! - **Discovery**: probe `http://127.0.0.1:<port>/json` over a port range
//! - **Transport**: HTTP/1.1 Upgrade, masked frames out, unmasked frames in
//! - **Protocol**: JSON-RPC requests correlated to responses by id
//! - **Injector**: one connection per call, bounded by a single deadline
//!
//! # Quick Start
//!
//! ```no_run
//! use inspector_inject::{Injector, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let injector = Injector::builder().build()?;
//!
//!     for target in injector.discover().await {
//!         println!("{} {} {}", target.port, target.title, target.debugger_url);
//!     }
//!
//!     let outcome = injector.inject(9229, "6*7").await?;
//!     println!("{}", outcome.to_json());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cli`] | Command-line arguments and dispatch |
//! | [`discovery`] | Inspector discovery: [`InspectorTarget`], [`TargetLocator`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`injector`] | [`Injector`] and its configuration |
//! | [`protocol`] | JSON-RPC message types |
//! | [`transport`] | WebSocket client |

// ============================================================================
// Modules
// ============================================================================

/// Command-line surface.
pub mod cli;

/// Inspector discovery.
///
/// Use [`PortScanLocator`] to scan a port range, or implement
/// [`TargetLocator`] for another source of targets.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Injection coordinator and configuration.
pub mod injector;

/// JSON-RPC message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Handshake, frame codec and connection event loop.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Discovery types
pub use discovery::{InspectorTarget, PortScanLocator, StaticLocator, TargetLocator};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::RequestId;

// Injector types
pub use injector::{Injector, InjectorBuilder, InjectorOptions, InvokeOutcome};

// Transport types
pub use transport::{Connection, HandshakeValidator, LooseValidator, StrictValidator};
