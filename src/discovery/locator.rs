//! Target location strategies.
//!
//! [`PortScanLocator`] probes every port in a range concurrently and
//! keeps the ones whose `/json` listing yields a debugger URL.
//! [`StaticLocator`] serves a fixed set of targets.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

use super::http;
use super::target::InspectorTarget;

// ============================================================================
// Constants
// ============================================================================

/// Ports scanned when none are configured.
pub const DEFAULT_PORTS: RangeInclusive<u16> = 9229..=9249;

/// Host every probe connects to.
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Budget for one probe, from connect through the full body.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Path of the inspector listing.
const LISTING_PATH: &str = "/json";

// ============================================================================
// TargetLocator
// ============================================================================

/// Finds inspector targets.
///
/// Failures are never surfaced: an unreachable or unusable port simply
/// yields no target.
#[async_trait]
pub trait TargetLocator: Send + Sync {
    /// Returns every target found, ordered by ascending port.
    async fn locate(&self) -> Vec<InspectorTarget>;

    /// Returns the target on `port`, if any.
    async fn locate_port(&self, port: u16) -> Option<InspectorTarget>;
}

// ============================================================================
// PortScanLocator
// ============================================================================

/// Probes a port range on one host.
#[derive(Debug, Clone)]
pub struct PortScanLocator {
    host: IpAddr,
    ports: RangeInclusive<u16>,
    probe_timeout: Duration,
}

impl Default for PortScanLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortScanLocator {
    /// Creates a locator for the default host, ports and probe timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            host: DEFAULT_HOST,
            ports: DEFAULT_PORTS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Sets the probed host.
    #[must_use]
    pub const fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the probed port range.
    #[must_use]
    pub fn with_ports(mut self, ports: RangeInclusive<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Sets the per-probe timeout.
    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Returns the probed port range.
    #[inline]
    #[must_use]
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.ports.clone()
    }

    /// Probes a single port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryProbeFailed`] if the port does not answer
    /// in time, answers with a non-2xx status, or serves an unusable
    /// listing.
    pub async fn probe(&self, port: u16) -> Result<InspectorTarget> {
        let addr = SocketAddr::new(self.host, port);

        let response = timeout(self.probe_timeout, http::get(addr, LISTING_PATH))
            .await
            .map_err(|_| {
                Error::probe_failed(
                    port,
                    format!("no answer within {}ms", self.probe_timeout.as_millis()),
                )
            })?
            .map_err(|e| Error::probe_failed(port, e.to_string()))?;

        if !response.is_success() {
            return Err(Error::probe_failed(
                port,
                format!("HTTP status {}", response.status),
            ));
        }

        InspectorTarget::from_listing(port, &response.body)
    }
}

#[async_trait]
impl TargetLocator for PortScanLocator {
    async fn locate(&self) -> Vec<InspectorTarget> {
        let probes = self.ports.clone().map(|port| self.locate_port(port));

        let mut targets: Vec<InspectorTarget> =
            join_all(probes).await.into_iter().flatten().collect();
        targets.sort_by_key(|target| target.port);

        debug!(
            host = %self.host,
            ports = ?self.ports,
            found = targets.len(),
            "Port scan complete"
        );

        targets
    }

    async fn locate_port(&self, port: u16) -> Option<InspectorTarget> {
        match self.probe(port).await {
            Ok(target) => {
                debug!(port, url = %target.debugger_url, "Inspector found");
                Some(target)
            }
            Err(e) => {
                debug!(port, error = %e, "Probe skipped");
                None
            }
        }
    }
}

// ============================================================================
// StaticLocator
// ============================================================================

/// Serves a fixed list of targets.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    targets: Vec<InspectorTarget>,
}

impl StaticLocator {
    /// Creates a locator over `targets`.
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = InspectorTarget>) -> Self {
        let mut targets: Vec<_> = targets.into_iter().collect();
        targets.sort_by_key(|target| target.port);
        Self { targets }
    }
}

#[async_trait]
impl TargetLocator for StaticLocator {
    async fn locate(&self) -> Vec<InspectorTarget> {
        self.targets.clone()
    }

    async fn locate_port(&self, port: u16) -> Option<InspectorTarget> {
        self.targets.iter().find(|target| target.port == port).cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
