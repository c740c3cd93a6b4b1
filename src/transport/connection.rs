//! WebSocket connection and event loop.
//!
//! This module owns an upgraded socket and correlates JSON-RPC responses
//! with the calls that produced them.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the inspector (responses, events, control frames)
//! - Outgoing calls from the Rust API
//! - Request/response correlation by id
//!
//! The task owns the socket. It ends, closing the socket, when the remote
//! closes, a frame cannot be decoded, [`Connection::close`] is called, or
//! every [`Connection`] handle has been dropped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, to_string};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Command, Incoming, RpcRequest, RpcResponse};

use super::frame::{Frame, FrameDecoder, Opcode};
use super::handshake::{HandshakeRequest, HandshakeValidator};
use super::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a single call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 16;

/// Socket read buffer size.
const READ_CHUNK_LEN: usize = 4096;

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<RpcResponse>>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and wait for response.
    Send {
        request: RpcRequest,
        response_tx: oneshot::Sender<Result<RpcResponse>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Send a close frame and stop.
    Close,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to an inspector.
///
/// Handles request/response correlation. Cloning shares the same socket.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Next request id.
    next_id: Arc<AtomicU64>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl Connection {
    /// Connects to a debugger URL and performs the upgrade handshake.
    ///
    /// No frame is sent or read before the validator accepts the upgrade.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the URL is not a `ws://` URL
    /// - [`Error::Handshake`] if the TCP connect or the upgrade fails
    pub async fn connect(url: &str, validator: &dyn HandshakeValidator) -> Result<Self> {
        let endpoint = Endpoint::parse(url)?;

        let mut stream = TcpStream::connect(endpoint.authority())
            .await
            .map_err(|e| Error::handshake(format!("failed to connect to {}: {e}", endpoint.authority())))?;
        if let Err(e) = stream.set_nodelay(true) {
            trace!(error = %e, "Failed to set TCP_NODELAY");
        }

        let residual = HandshakeRequest::new(&endpoint)
            .perform(&mut stream, validator)
            .await?;

        info!(%endpoint, "WebSocket connection established");

        Ok(Self::new(stream, residual))
    }

    /// Creates a connection from an already upgraded stream.
    ///
    /// `residual` holds bytes read past the handshake response; they are
    /// decoded before anything else. Spawns the event loop task.
    pub fn new<S>(stream: S, residual: Vec<u8>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));

        tokio::spawn(Self::run_event_loop(
            stream,
            residual,
            command_rx,
            Arc::clone(&correlation),
        ));

        Self {
            command_tx,
            correlation,
            next_id: Arc::new(AtomicU64::new(RequestId::first().get())),
        }
    }

    /// Allocates the next request id. The first id is `1`.
    #[inline]
    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Calls a method and waits for its response with the default timeout (5s).
    ///
    /// # Errors
    ///
    /// See [`Connection::send_with_timeout`].
    pub async fn call(&self, method: impl Into<String>, params: Value) -> Result<RpcResponse> {
        self.call_with_timeout(method, params, DEFAULT_CALL_TIMEOUT)
            .await
    }

    /// Calls a method and waits for its response with a custom timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::send_with_timeout`].
    pub async fn call_with_timeout(
        &self,
        method: impl Into<String>,
        params: Value,
        call_timeout: Duration,
    ) -> Result<RpcResponse> {
        let request = RpcRequest::new(self.next_request_id(), method, params);
        self.send_with_timeout(request, call_timeout).await
    }

    /// Sends a typed command with a custom timeout.
    ///
    /// # Errors
    ///
    /// See [`Connection::send_with_timeout`].
    pub async fn send_command(&self, command: &Command, call_timeout: Duration) -> Result<RpcResponse> {
        let request = RpcRequest::from_command(self.next_request_id(), command)?;
        self.send_with_timeout(request, call_timeout).await
    }

    /// Sends a request and waits for the response with matching id.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::OperationTimeout`] if no response arrives within `request_timeout`
    /// - [`Error::UnexpectedResponseId`] if the only response carries another id
    /// - [`Error::PayloadTooLarge`] if the request does not fit a frame
    /// - [`Error::Protocol`] if too many requests are pending or the
    ///   inspector sends a malformed frame
    pub async fn send_with_timeout(
        &self,
        request: RpcRequest,
        request_timeout: Duration,
    ) -> Result<RpcResponse> {
        let request_id = request.id;

        // Check pending request limit
        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));

                Err(Error::operation_timeout(
                    u64::try_from(request_timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Sends a close frame and stops the event loop.
    pub fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Close);
    }

    /// Event loop that handles socket I/O.
    async fn run_event_loop<S>(
        stream: S,
        residual: Vec<u8>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut decoder = FrameDecoder::client();
        let mut chunk = vec![0u8; READ_CHUNK_LEN];

        decoder.extend(&residual);
        let mut open = Self::drain_frames(&mut decoder, &mut writer, &correlation).await;

        while open {
            tokio::select! {
                // Incoming bytes from the inspector
                read = reader.read(&mut chunk) => {
                    match read {
                        Ok(0) => {
                            debug!("Socket closed by remote");
                            break;
                        }
                        Ok(n) => {
                            trace!(bytes = n, "Socket read");
                            decoder.extend(&chunk[..n]);
                            open = Self::drain_frames(&mut decoder, &mut writer, &correlation).await;
                        }
                        Err(e) => {
                            error!(error = %e, "Socket read failed");
                            break;
                        }
                    }
                }

                // Commands from Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            Self::handle_send_command(
                                request,
                                response_tx,
                                &mut writer,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Close) => {
                            debug!("Close command received");
                            if let Err(e) = Self::write_frame(&mut writer, &Frame::close()).await {
                                debug!(error = %e, "Failed to send close frame");
                            }
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = writer.shutdown().await {
            trace!(error = %e, "Socket shutdown failed");
        }

        // Fail all pending requests on shutdown
        Self::fail_pending_requests(&correlation, None);

        debug!("Event loop terminated");
    }

    /// Decodes and handles every complete buffered frame.
    ///
    /// Returns `false` when the connection must stop.
    async fn drain_frames<W>(
        decoder: &mut FrameDecoder,
        writer: &mut W,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) -> bool
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            match decoder.decode() {
                Ok(Some(frame)) => {
                    if !Self::handle_frame(frame, writer, correlation).await {
                        return false;
                    }
                }
                Ok(None) => return true,
                Err(e) => {
                    error!(error = %e, "Frame decoding failed");
                    Self::fail_pending_requests(correlation, Some(e));
                    return false;
                }
            }
        }
    }

    /// Handles one decoded frame. Returns `false` on close.
    async fn handle_frame<W>(
        frame: Frame,
        writer: &mut W,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) -> bool
    where
        W: AsyncWrite + Unpin,
    {
        match frame.opcode {
            Opcode::Text if !frame.fin => {
                warn!(len = frame.payload.len(), "Ignoring fragmented message");
            }
            Opcode::Continuation => {
                trace!(len = frame.payload.len(), fin = frame.fin, "Ignoring continuation frame");
            }
            Opcode::Text => match frame.as_text() {
                Some(text) => Self::handle_incoming_message(text, correlation),
                None => warn!(len = frame.payload.len(), "Text frame is not valid UTF-8"),
            },
            Opcode::Binary => {
                debug!(len = frame.payload.len(), "Ignoring binary frame");
            }
            Opcode::Ping => {
                if let Err(e) = Self::write_frame(writer, &Frame::pong(frame.payload)).await {
                    warn!(error = %e, "Failed to answer ping");
                }
            }
            Opcode::Pong => {}
            Opcode::Close => {
                debug!("WebSocket closed by remote");
                if let Err(e) = Self::write_frame(writer, &Frame::close()).await {
                    trace!(error = %e, "Failed to echo close frame");
                }
                return false;
            }
        }

        true
    }

    /// Handles an incoming text message from the inspector.
    fn handle_incoming_message(text: &str, correlation: &Arc<Mutex<CorrelationMap>>) {
        match Incoming::parse(text) {
            Some(Incoming::Response(response)) => {
                let mut correlation = correlation.lock();

                if let Some(tx) = correlation.remove(&response.id) {
                    let _ = tx.send(Ok(response));
                    return;
                }

                // With a single call in flight a stray id can only be its answer.
                let sole = (correlation.len() == 1)
                    .then(|| correlation.keys().next().copied())
                    .flatten();

                match sole.and_then(|expected| correlation.remove(&expected).map(|tx| (expected, tx))) {
                    Some((expected, tx)) => {
                        warn!(%expected, actual = %response.id, "Response id does not match the call in flight");
                        let actual = response.id;
                        let raw = response.into_value();
                        let _ = tx.send(Err(Error::unexpected_response_id(expected, actual, raw)));
                    }
                    None => warn!(id = %response.id, "Response for unknown request"),
                }
            }

            Some(Incoming::Event(event)) => {
                trace!(method = %event.method, "Ignoring event");
            }

            None => warn!(text = %text, "Failed to parse incoming message"),
        }
    }

    /// Handles a send command from the Rust API.
    async fn handle_send_command<W>(
        request: RpcRequest,
        response_tx: oneshot::Sender<Result<RpcResponse>>,
        writer: &mut W,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) where
        W: AsyncWrite + Unpin,
    {
        let request_id = request.id;

        // Serialize request
        let json = match to_string(&request) {
            Ok(j) => j,
            Err(e) => {
                let _ = response_tx.send(Err(Error::Json(e)));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(request_id, response_tx);

        if let Err(e) = Self::write_frame(writer, &Frame::text(json)).await {
            // Remove correlation and notify caller
            if let Some(tx) = correlation.lock().remove(&request_id) {
                let _ = tx.send(Err(e));
            }
            return;
        }

        trace!(%request_id, method = %request.method, "Request sent");
    }

    /// Masks and writes one frame.
    async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = frame.encode_masked()?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Fails all pending requests.
    ///
    /// The first waiter receives `cause` when given; the rest get
    /// [`Error::ConnectionClosed`].
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>, cause: Option<Error>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();
        let mut cause = cause;

        for (_, tx) in pending {
            let err = cause.take().unwrap_or(Error::ConnectionClosed);
            let _ = tx.send(Err(err));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
