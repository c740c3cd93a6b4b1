//! Injector configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use inspector_inject::InjectorOptions;
//!
//! let options = InjectorOptions::new()
//!     .with_ports(9229..=9239)
//!     .with_operation_timeout(Duration::from_secs(2))
//!     .with_strict_handshake();
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::{DEFAULT_HOST, DEFAULT_PORTS, DEFAULT_PROBE_TIMEOUT};
use crate::error::{Error, Result};
use crate::transport::{HandshakeValidator, LooseValidator, StrictValidator};

// ============================================================================
// Constants
// ============================================================================

/// Deadline for one injection, from TCP connect to response.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// InjectorOptions
// ============================================================================

/// Discovery and injection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorOptions {
    /// Host probed during discovery.
    pub host: IpAddr,

    /// Ports probed during discovery.
    pub ports: RangeInclusive<u16>,

    /// Budget for each discovery probe.
    pub probe_timeout: Duration,

    /// Deadline for connect, handshake and response together.
    pub operation_timeout: Duration,

    /// Require a well-formed `101` status line instead of any `101`.
    pub strict_handshake: bool,
}

impl Default for InjectorOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl InjectorOptions {
    /// Creates options with the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: DEFAULT_HOST,
            ports: DEFAULT_PORTS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            strict_handshake: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl InjectorOptions {
    /// Sets the discovery host.
    #[inline]
    #[must_use]
    pub const fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the discovery port range.
    #[inline]
    #[must_use]
    pub fn with_ports(mut self, ports: RangeInclusive<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Sets the per-probe timeout.
    #[inline]
    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Sets the injection deadline.
    #[inline]
    #[must_use]
    pub const fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Enables strict handshake validation.
    #[inline]
    #[must_use]
    pub const fn with_strict_handshake(mut self) -> Self {
        self.strict_handshake = true;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl InjectorOptions {
    /// Returns the handshake validator these options select.
    #[must_use]
    pub fn handshake_validator(&self) -> Arc<dyn HandshakeValidator> {
        if self.strict_handshake {
            Arc::new(StrictValidator)
        } else {
            Arc::new(LooseValidator)
        }
    }

    /// Checks the options for values that can never succeed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the port range is empty or includes
    /// port 0, or if a timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.ports.is_empty() {
            return Err(Error::config(format!(
                "Port range {}-{} is empty",
                self.ports.start(),
                self.ports.end()
            )));
        }

        if *self.ports.start() == 0 {
            return Err(Error::config("Port range must not include port 0"));
        }

        if self.probe_timeout.is_zero() {
            return Err(Error::config("Probe timeout must be greater than zero"));
        }

        if self.operation_timeout.is_zero() {
            return Err(Error::config("Operation timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
