//! Reconnecting websocket command adapter for the Bazaar daemon.
//!
//! The daemon speaks a small JSON request/response/subscription protocol over
//! a websocket at `ws://<host>:<port>/ws`. This crate keeps that connection
//! alive across drops and routes each asynchronous reply to the callback that
//! asked for it:
//!
//! - [`Connector`] is the command adapter: it queues commands while
//!   disconnected (replaying them in order on reconnect), registers one-shot
//!   reply callbacks and persistent subscriptions keyed by the reply's
//!   `result.type`, and emits typed [`ConnectorEvent`]s for lifecycle and raw
//!   data observation.
//! - [`SocketClient`] is the connection manager: it owns the
//!   tokio-tungstenite stream, the read/write tasks, and the exponential
//!   reconnect backoff, and notifies the adapter through [`TransportEvents`].

mod adapter;
mod backoff;
mod commands;
mod connection;
mod events;
mod socket;

pub use adapter::{Connector, Params, ReplyCallback};
pub use connection::{ConnectionState, ConnectionStateObserver};
pub use events::{ConnectorEvent, EventBus};
pub use socket::{OutboundSender, SocketClient, TransportEvents};
