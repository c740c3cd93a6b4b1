//! Inspector discovery.
//!
//! Debuggees started with `--inspect` serve a JSON listing at
//! `http://127.0.0.1:<port>/json`. Discovery fetches that listing from
//! each candidate port and turns the first entry into an
//! [`InspectorTarget`].
//!
//! # Example
//!
//! ```no_run
//! use inspector_inject::discovery::{PortScanLocator, TargetLocator};
//!
//! # async fn example() {
//! let targets = PortScanLocator::new().locate().await;
//! for target in targets {
//!     println!("{} {}", target.port, target.debugger_url);
//! }
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Minimal HTTP client.
pub mod http;

/// Location strategies.
pub mod locator;

/// Target descriptors.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use locator::{
    DEFAULT_HOST, DEFAULT_PORTS, DEFAULT_PROBE_TIMEOUT, PortScanLocator, StaticLocator,
    TargetLocator,
};
pub use target::InspectorTarget;
