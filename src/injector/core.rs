//! Injection coordinator.
//!
//! The [`Injector`] ties discovery and transport together. Each call is
//! independent: resolve a target, open one connection, send one
//! `Runtime.evaluate`, wait for its response, close.
//!
//! # Deadline
//!
//! A single deadline covers connect, handshake and response. Expiry
//! before the upgrade completes is a [`Error::Handshake`]; expiry while
//! waiting for the response is benign and yields
//! [`InvokeOutcome::NoResult`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::discovery::{InspectorTarget, TargetLocator};
use crate::error::{Error, Result};
use crate::protocol::{Command, RpcResponse};
use crate::transport::{Connection, HandshakeValidator};

use super::builder::InjectorBuilder;
use super::options::InjectorOptions;
use super::script::NOTIFY_EXPRESSION;

// ============================================================================
// InvokeOutcome
// ============================================================================

/// Result of a dispatched evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    /// The inspector answered.
    Response(RpcResponse),
    /// The deadline passed before an answer arrived.
    NoResult,
}

impl InvokeOutcome {
    /// Returns the response, if any.
    #[inline]
    #[must_use]
    pub fn response(&self) -> Option<&RpcResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::NoResult => None,
        }
    }

    /// Returns `true` if the deadline passed without an answer.
    #[inline]
    #[must_use]
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::NoResult)
    }

    /// The response frame as the inspector sent it; `null` when there is
    /// no result.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Response(response) => response.as_value().clone(),
            Self::NoResult => Value::Null,
        }
    }
}

// ============================================================================
// Injector
// ============================================================================

/// Discovers inspectors and evaluates expressions in them.
///
/// # Example
///
/// ```no_run
/// use inspector_inject::Injector;
///
/// # async fn example() -> inspector_inject::Result<()> {
/// let injector = Injector::builder().build()?;
///
/// for target in injector.discover().await {
///     println!("{} {}", target.port, target.title);
/// }
///
/// let outcome = injector.inject(9229, "6*7").await?;
/// println!("{}", outcome.to_json());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Injector {
    options: InjectorOptions,
    locator: Arc<dyn TargetLocator>,
    validator: Arc<dyn HandshakeValidator>,
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("options", &self.options)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Injector - Public API
// ============================================================================

impl Injector {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    pub(crate) fn new(
        options: InjectorOptions,
        locator: Arc<dyn TargetLocator>,
        validator: Arc<dyn HandshakeValidator>,
    ) -> Self {
        Self {
            options,
            locator,
            validator,
        }
    }

    /// Returns the options this injector was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &InjectorOptions {
        &self.options
    }

    /// Lists every reachable inspector, ordered by port.
    pub async fn discover(&self) -> Vec<InspectorTarget> {
        self.locator.locate().await
    }

    /// Finds the inspector listening on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetNotFound`] if no usable inspector answers.
    pub async fn resolve(&self, port: u16) -> Result<InspectorTarget> {
        self.locator
            .locate_port(port)
            .await
            .ok_or_else(|| Error::target_not_found(port))
    }

    /// Evaluates `expression` in the inspector on `port`.
    ///
    /// # Errors
    ///
    /// - [`Error::TargetNotFound`] if no inspector answers on `port`
    /// - [`Error::Handshake`] if the upgrade fails or times out
    /// - [`Error::PayloadTooLarge`] if the request does not fit a frame
    /// - [`Error::UnsupportedFrameLength`] or [`Error::Protocol`] if the
    ///   inspector sends an unreadable frame
    pub async fn inject(&self, port: u16, expression: &str) -> Result<InvokeOutcome> {
        let target = self.resolve(port).await?;
        debug!(port, title = %target.title, "Target resolved");

        self.evaluate_at(&target.debugger_url, expression).await
    }

    /// Bumps the notify counters in the inspector on `port`.
    ///
    /// # Errors
    ///
    /// See [`Injector::inject`].
    pub async fn notify(&self, port: u16) -> Result<InvokeOutcome> {
        self.inject(port, NOTIFY_EXPRESSION).await
    }

    /// Evaluates `expression` at a known debugger URL, skipping discovery.
    ///
    /// # Errors
    ///
    /// See [`Injector::inject`]; additionally [`Error::InvalidUrl`] if
    /// `debugger_url` is not a `ws://` URL.
    pub async fn evaluate_at(&self, debugger_url: &str, expression: &str) -> Result<InvokeOutcome> {
        self.invoke(debugger_url, &Command::evaluate(expression))
            .await
    }
}

// ============================================================================
// Injector - Internal
// ============================================================================

impl Injector {
    /// Runs one command on a fresh connection under the operation deadline.
    async fn invoke(&self, debugger_url: &str, command: &Command) -> Result<InvokeOutcome> {
        let timeout = self.options.operation_timeout;
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let deadline = Instant::now() + timeout;

        let connection = timeout_at(
            deadline,
            Connection::connect(debugger_url, self.validator.as_ref()),
        )
        .await
        .map_err(|_| {
            Error::handshake(format!(
                "no upgrade response from {debugger_url} within {timeout_ms}ms"
            ))
        })??;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let result = connection.send_command(command, remaining).await;
        connection.close();

        match result {
            Ok(response) => Ok(InvokeOutcome::Response(response)),
            Err(e) if e.is_timeout() => {
                info!(url = debugger_url, timeout_ms, "No response before deadline");
                Ok(InvokeOutcome::NoResult)
            }
            Err(Error::UnexpectedResponseId {
                expected,
                actual,
                response,
            }) => {
                warn!(%expected, %actual, "Inspector answered with another request id");
                Ok(InvokeOutcome::Response(RpcResponse::from_value(*response)?))
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
