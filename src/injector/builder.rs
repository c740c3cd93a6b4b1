//! Builder pattern for injector configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use inspector_inject::Injector;
//!
//! # async fn example() -> inspector_inject::Result<()> {
//! let injector = Injector::builder()
//!     .ports(9229..=9239)
//!     .operation_timeout(Duration::from_secs(2))
//!     .build()?;
//!
//! let outcome = injector.inject(9229, "process.pid").await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::{PortScanLocator, TargetLocator};
use crate::error::Result;
use crate::transport::HandshakeValidator;

use super::core::Injector;
use super::options::InjectorOptions;

// ============================================================================
// InjectorBuilder
// ============================================================================

/// Builder for configuring an [`Injector`].
///
/// Use [`Injector::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct InjectorBuilder {
    /// Discovery and timeout settings.
    options: InjectorOptions,
    /// Replaces the port scan.
    locator: Option<Arc<dyn TargetLocator>>,
    /// Replaces the validator selected by the options.
    validator: Option<Arc<dyn HandshakeValidator>>,
}

impl fmt::Debug for InjectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectorBuilder")
            .field("options", &self.options)
            .field("custom_locator", &self.locator.is_some())
            .field("validator", &self.validator)
            .finish()
    }
}

// ============================================================================
// InjectorBuilder Implementation
// ============================================================================

impl InjectorBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: InjectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the discovery port range.
    #[inline]
    #[must_use]
    pub fn ports(mut self, ports: RangeInclusive<u16>) -> Self {
        self.options.ports = ports;
        self
    }

    /// Sets the per-probe discovery timeout.
    #[inline]
    #[must_use]
    pub fn probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.options.probe_timeout = probe_timeout;
        self
    }

    /// Sets the deadline for each injection.
    #[inline]
    #[must_use]
    pub fn operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.options.operation_timeout = operation_timeout;
        self
    }

    /// Selects strict or loose handshake validation.
    #[inline]
    #[must_use]
    pub fn strict_handshake(mut self, strict: bool) -> Self {
        self.options.strict_handshake = strict;
        self
    }

    /// Uses a custom target locator instead of the port scan.
    #[inline]
    #[must_use]
    pub fn locator(mut self, locator: impl TargetLocator + 'static) -> Self {
        self.locator = Some(Arc::new(locator));
        self
    }

    /// Uses a custom handshake validator.
    #[inline]
    #[must_use]
    pub fn validator(mut self, validator: impl HandshakeValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Builds the injector with validation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if the options are invalid.
    pub fn build(self) -> Result<Injector> {
        self.options.validate()?;

        let locator = self.locator.unwrap_or_else(|| {
            Arc::new(
                PortScanLocator::new()
                    .with_host(self.options.host)
                    .with_ports(self.options.ports.clone())
                    .with_probe_timeout(self.options.probe_timeout),
            )
        });
        let validator = self
            .validator
            .unwrap_or_else(|| self.options.handshake_validator());

        Ok(Injector::new(self.options, locator, validator))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::discovery::{InspectorTarget, StaticLocator};
    use crate::error::Error;
    use crate::transport::StrictValidator;

    #[test]
    fn test_new_uses_default_options() {
        let builder = InjectorBuilder::new();
        assert_eq!(builder.options, InjectorOptions::new());
        assert!(builder.locator.is_none());
        assert!(builder.validator.is_none());
    }

    #[test]
    fn test_setters_update_options() {
        let builder = InjectorBuilder::new()
            .ports(9300..=9301)
            .probe_timeout(Duration::from_millis(50))
            .operation_timeout(Duration::from_millis(750))
            .strict_handshake(true);

        assert_eq!(builder.options.ports, 9300..=9301);
        assert_eq!(builder.options.probe_timeout, Duration::from_millis(50));
        assert_eq!(builder.options.operation_timeout, Duration::from_millis(750));
        assert!(builder.options.strict_handshake);
    }

    #[test]
    fn test_build_rejects_invalid_options() {
        let result = InjectorBuilder::new()
            .operation_timeout(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_with_custom_parts() {
        let injector = InjectorBuilder::new()
            .locator(StaticLocator::new([InspectorTarget::new(1, "t", "ws://x")]))
            .validator(StrictValidator)
            .build()
            .expect("build");

        assert_eq!(injector.options(), &InjectorOptions::new());
    }
}
