//! WebSocket connection and event loop.
//!
//! This module owns the persistent socket to the remote debugging endpoint.
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the browser (responses, notifications), handed to
//!   the [`MessageRouter`]
//! - Outgoing frames queued by the router
//! - Disconnect detection, which fails all pending router work
//!
//! WebSocket framing delivers complete messages only; a partial frame never
//! reaches the router. The reader task is never blocked by caller-side
//! processing: routing inserts into channels and returns.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::router::MessageRouter;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream to the debugging endpoint.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands consumed by the connection event loop.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Write one serialized frame.
    Send(String),
    /// Close the socket and stop the loop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// A live connection to the remote debugging endpoint.
///
/// Owns the socket through its spawned event loop. Dropping the connection
/// does not close the socket; call [`Connection::shutdown`] (the session
/// facade does this on close).
#[derive(Debug)]
pub struct Connection {
    /// Channel into the event loop, for shutdown.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// The endpoint this connection dialed.
    endpoint: Url,
}

impl Connection {
    /// Dials the endpoint and starts the event loop.
    ///
    /// `outbound_rx` is the receiving half of the router's outbound channel;
    /// the loop drains it so router dispatches become socket writes.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] on an invalid address, unreachable endpoint,
    ///   failed handshake or connect timeout
    pub async fn connect(
        endpoint: &str,
        router: Arc<MessageRouter>,
        outbound_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::connection(format!("invalid endpoint '{endpoint}': {e}")))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::connection(format!(
                "endpoint '{endpoint}' is not a ws:// or wss:// address"
            )));
        }

        let connect = connect_async(url.as_str());
        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "timed out connecting to {endpoint} after {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?;

        debug!(endpoint = %url, "Connected to debugging endpoint");

        let command_tx = router.command_sender();
        tokio::spawn(Self::run_event_loop(ws_stream, outbound_rx, router));

        Ok(Self {
            command_tx,
            endpoint: url,
        })
    }

    /// Returns the endpoint address this connection dialed.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Shuts the connection down.
    ///
    /// The event loop closes the socket and fails all pending router work;
    /// shutdown is bounded and idempotent.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that owns the WebSocket.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut outbound_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        router: Arc<MessageRouter>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Inbound frames from the browser
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = router.on_message(&text) {
                                error!(error = %e, "Unroutable inbound frame");
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Outbound frames from the router, shutdown from the session
                command = outbound_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to write frame, closing");
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Outbound channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Exiting for any reason means the channel is unusable: fail every
        // outstanding call and wake every subscriber.
        router.connection_lost();

        debug!("Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
