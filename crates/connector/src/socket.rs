//! Websocket connection manager built on tokio-tungstenite.
//!
//! Owns the socket lifecycle: establish, read/write tasks, loss detection,
//! and reconnection with exponential backoff. Everything the command adapter
//! needs to know arrives through the [`TransportEvents`] handler; the
//! adapter never touches the stream itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::backoff::{BackoffState, MAX_RETRY_ATTEMPTS};
use crate::connection::ConnectionState;

/// Per-connection handle for outbound text frames.
///
/// Valid only for the connection it was delivered with; the write task it
/// feeds dies with the stream.
pub type OutboundSender = mpsc::Sender<String>;

/// Frames buffered for the write task before `try_send` starts failing.
const OUTBOUND_BUFFER: usize = 32;

/// Transport notifications delivered to the command adapter.
///
/// Every successful (re)connection hands over a fresh [`OutboundSender`];
/// after `disconnected` fires the previous sender is dead and sends must
/// buffer until the next `connected`.
pub trait TransportEvents: Send + Sync + 'static {
    /// A connection is live; `outbound` feeds its write task.
    fn connected(&self, outbound: OutboundSender);

    /// A text frame arrived on the live connection.
    fn frame(&self, text: String);

    /// The connection is gone.
    fn disconnected(&self);

    /// A transport-level failure (connect refused, socket error).
    fn transport_error(&self, message: String);

    /// Connection state transition, for observers.
    fn state_changed(&self, state: ConnectionState);
}

/// Reconnecting websocket client.
///
/// [`run`](SocketClient::run) drives connection attempts until an
/// intentional [`disconnect`](SocketClient::disconnect) or until the retry
/// budget is exhausted.
pub struct SocketClient {
    url: String,
    handler: Arc<dyn TransportEvents>,
    /// Set when the owner asked to disconnect, so a close is not treated as
    /// a loss to recover from.
    intentional_disconnect: AtomicBool,
    shutdown: Notify,
}

impl SocketClient {
    pub fn new(url: impl Into<String>, handler: Arc<dyn TransportEvents>) -> Self {
        Self {
            url: url.into(),
            handler,
            intentional_disconnect: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn set_state(&self, state: ConnectionState) {
        self.handler.state_changed(state);
    }

    fn is_stopping(&self) -> bool {
        self.intentional_disconnect.load(Ordering::SeqCst)
    }

    /// Run one connection to completion.
    ///
    /// `Ok(())` means a connection was established and has since ended (for
    /// any reason); `Err` means it could not be established at all.
    async fn connect_internal(&self) -> Result<()> {
        let (mut ws_stream, _) = connect_async(&self.url).await?;

        // disconnect() may have fired while the dial was in flight, before
        // the select below starts watching the shutdown signal. Drop the
        // fresh connection instead of serving it.
        if self.is_stopping() {
            tracing::info!("disconnect requested during dial, closing");
            if let Err(e) = ws_stream.close(None).await {
                tracing::debug!("close after cancelled dial: {}", e);
            }
            self.set_state(ConnectionState::Disconnected);
            return Ok(());
        }

        tracing::info!("connected to daemon at {}", self.url);
        self.set_state(ConnectionState::Connected);

        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
        self.handler.connected(tx);

        let write_task = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = write.send(Message::Text(text)).await {
                    tracing::error!("failed to send frame: {}", e);
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handler.frame(text),
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("daemon closed the connection");
                        break;
                    }
                    // Ping/pong/binary frames carry nothing for us.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("websocket error: {}", e);
                        self.handler.transport_error(e.to_string());
                        break;
                    }
                    None => break,
                },
                _ = self.shutdown.notified() => {
                    tracing::info!("closing connection on request");
                    break;
                }
            }
        }

        // The stream is done; make sure nothing keeps writing to it and the
        // adapter goes back to queueing.
        write_task.abort();
        self.handler.disconnected();
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    /// Drive the connection, reconnecting with backoff after every loss.
    ///
    /// Returns after an intentional disconnect, or once
    /// [`MAX_RETRY_ATTEMPTS`] consecutive attempts fail to produce a
    /// connection.
    pub async fn run(&self) {
        let mut backoff = BackoffState::default();
        let mut connected_before = false;

        loop {
            if self.is_stopping() {
                self.set_state(ConnectionState::Disconnected);
                return;
            }

            self.set_state(if connected_before {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Connecting
            });

            match self.connect_internal().await {
                Ok(()) => {
                    connected_before = true;
                    backoff.reset();
                    if self.is_stopping() {
                        return;
                    }
                    tracing::info!("connection lost, scheduling reconnect");
                }
                Err(e) => {
                    tracing::warn!(
                        "connection attempt {} of {} failed: {}",
                        backoff.attempts() + 1,
                        MAX_RETRY_ATTEMPTS,
                        e
                    );
                    self.handler.transport_error(e.to_string());
                }
            }

            let Some(delay) = backoff.next_delay_and_advance() else {
                tracing::error!("max reconnection attempts reached, giving up");
                self.set_state(ConnectionState::Failed);
                return;
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Stop reconnecting and close any live connection.
    pub fn disconnect(&self) {
        self.intentional_disconnect.store(true, Ordering::SeqCst);
        // notify_one stores a permit when nothing is waiting yet, so the
        // signal survives firing before the read loop's select is armed.
        self.shutdown.notify_one();
    }
}
