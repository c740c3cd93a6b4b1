//! Injection coordinator.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Injector`] | Discovers targets and evaluates expressions |
//! | [`InjectorBuilder`] | Fluent configuration builder |
//! | [`InjectorOptions`] | Ports, timeouts and handshake mode |
//! | [`InvokeOutcome`] | Response, or no result before the deadline |
//!
//! # Example
//!
//! ```no_run
//! use inspector_inject::{Injector, Result};
//!
//! # async fn example() -> Result<()> {
//! let injector = Injector::builder().build()?;
//! let outcome = injector.notify(9229).await?;
//!
//! if let Some(response) = outcome.response() {
//!     println!("{:?}", response.pointer("/result/value"));
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for injector configuration.
pub mod builder;

/// Core injector implementation.
pub mod core;

/// Discovery and timeout options.
pub mod options;

/// Canned expressions.
pub mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::InjectorBuilder;
pub use core::{Injector, InvokeOutcome};
pub use options::{DEFAULT_OPERATION_TIMEOUT, InjectorOptions};
pub use script::NOTIFY_EXPRESSION;
