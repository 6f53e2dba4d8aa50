//! The command adapter: queueing, correlation, and dispatch.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use bazaar_protocol::{correlation_key, parse_frame, response_type, FrameError, Request};

use crate::connection::{set_connection_state, ConnectionState, ConnectionStateObserver};
use crate::events::{lock, ConnectorEvent, EventBus};
use crate::socket::{OutboundSender, SocketClient, TransportEvents};

/// Request parameters, as they appear in the wire frame's `params` object.
pub type Params = serde_json::Map<String, Value>;

/// Callback consumed by the next reply matching its correlation key.
pub type ReplyCallback = Box<dyn FnOnce(Value) + Send + 'static>;

type SubscriptionCallback = Box<dyn FnMut(Value) + Send + 'static>;

/// A command issued while no connection was available.
///
/// Params stay un-defaulted and the request id is stamped at replay time,
/// so the frame that eventually goes out reflects when it was sent, not
/// when it was queued.
struct QueuedCommand {
    command: String,
    params: Option<Params>,
    on_reply: Option<ReplyCallback>,
}

/// State mutated by callers and the transport.
///
/// The outbound sender slot lives under the same lock as the queue so the
/// enqueue-or-send decision is atomic with connection attach/detach: the
/// queue can only be non-empty while the slot is empty.
#[derive(Default)]
struct AdapterState {
    outbound: Option<OutboundSender>,
    pending: Vec<QueuedCommand>,
    one_shot: HashMap<String, VecDeque<ReplyCallback>>,
}

struct Inner {
    state: Mutex<AdapterState>,
    subscriptions: Mutex<HashMap<String, SubscriptionCallback>>,
    events: EventBus,
    connection_state: Arc<AtomicU8>,
    connected_before: AtomicBool,
}

/// Command adapter for the daemon websocket API.
///
/// Cheap to clone; all clones share the same queue, callback tables, and
/// connection. Operations are synchronous and non-blocking: a command either
/// goes to the live connection's write task or onto the pending queue, and
/// replies come back through the registered callbacks.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
    client: Arc<SocketClient>,
}

impl Connector {
    /// Create an adapter for the daemon at `ws://<host>:<port>/ws`.
    ///
    /// No connection is made until [`connect`](Connector::connect); commands
    /// sent before then queue up like they would during an outage.
    pub fn new(host: &str, port: u16) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(AdapterState::default()),
            subscriptions: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            connection_state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8())),
            connected_before: AtomicBool::new(false),
        });
        let url = format!("ws://{host}:{port}/ws");
        let client = Arc::new(SocketClient::new(url, Arc::clone(&inner) as Arc<dyn TransportEvents>));

        Self { inner, client }
    }

    /// Start the connection driver in the background.
    pub fn connect(&self) -> &Self {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            client.run().await;
        });
        self
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Queued commands and registered callbacks are left in place; a later
    /// [`connect`](Connector::connect) on a fresh adapter would not see them,
    /// matching the fire-and-forget contract.
    pub fn disconnect(&self) {
        self.client.disconnect();
    }

    /// Send `command` to the daemon, or queue it while disconnected.
    ///
    /// `params` defaults to an empty object on the wire. When `on_reply` is
    /// given it is registered under the command's correlation key and
    /// consumed by the next matching reply; replies for one key go to
    /// callbacks in registration order. Without `on_reply` the send is
    /// fire-and-forget.
    pub fn send_command(
        &self,
        command: &str,
        params: Option<Params>,
        on_reply: Option<ReplyCallback>,
    ) -> &Self {
        self.inner.send_command(command, params, on_reply);
        self
    }

    /// Register a persistent callback for `command`'s reply type, then send
    /// the initial request.
    ///
    /// The callback fires on every matching inbound payload until another
    /// `subscribe` for the same key replaces it. It is independent of any
    /// one-shot callbacks for the key; both can fire for one reply.
    pub fn subscribe(
        &self,
        command: &str,
        params: Option<Params>,
        callback: impl FnMut(Value) + Send + 'static,
    ) -> &Self {
        lock(&self.inner.subscriptions)
            .insert(correlation_key(command).to_string(), Box::new(callback));
        self.send_command(command, params, None)
    }

    /// Register a listener for lifecycle and raw-data events.
    pub fn on_event(&self, listener: impl FnMut(ConnectorEvent) + Send + 'static) -> &Self {
        self.inner.events.subscribe(listener);
        self
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state_observer().state()
    }

    /// Observer handle for the connection state.
    pub fn state_observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.inner.connection_state))
    }

    /// The url this adapter connects to.
    pub fn url(&self) -> &str {
        self.client.url()
    }
}

#[cfg(test)]
impl Connector {
    /// Attach a fake connection (test harness for in-crate tests).
    pub(crate) fn test_connected(&self, outbound: OutboundSender) {
        self.inner.connected(outbound);
    }

    pub(crate) fn test_dispatch_frame(&self, text: &str) {
        self.inner.dispatch_frame(text);
    }

    pub(crate) fn test_has_one_shot(&self, key: &str) -> bool {
        lock(&self.inner.state).one_shot.contains_key(key)
    }
}

impl Inner {
    fn send_command(&self, command: &str, params: Option<Params>, on_reply: Option<ReplyCallback>) {
        let mut state = lock(&self.state);
        self.send_or_queue(&mut state, command, params, on_reply);
    }

    /// Send on the live connection or queue while disconnected.
    ///
    /// Caller holds the state lock; `try_send` is non-blocking, so holding
    /// it across the send keeps concurrent callers in call order.
    fn send_or_queue(
        &self,
        state: &mut AdapterState,
        command: &str,
        params: Option<Params>,
        on_reply: Option<ReplyCallback>,
    ) {
        let Some(outbound) = state.outbound.clone() else {
            state.pending.push(QueuedCommand {
                command: command.to_string(),
                params,
                on_reply,
            });
            return;
        };

        let request = Request::new(command, params);
        match request.to_frame() {
            Ok(frame) => {
                if let Err(e) = outbound.try_send(frame) {
                    tracing::error!("failed to hand frame to write task: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("failed to serialize request {}: {}", command, e);
                return;
            }
        }

        if let Some(callback) = on_reply {
            state
                .one_shot
                .entry(correlation_key(command).to_string())
                .or_default()
                .push_back(callback);
        }
    }

    /// Dispatch one inbound text frame.
    fn dispatch_frame(&self, text: &str) {
        let payload = match parse_frame(text) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("dropping malformed frame: {}", e);
                self.events.dispatch(ConnectorEvent::Error(e.to_string()));
                return;
            }
        };

        // Raw observability hook, always before correlation.
        self.events.dispatch(ConnectorEvent::Data(payload.clone()));

        let key = match response_type(&payload) {
            Ok(reply_type) => reply_type.to_string(),
            Err(FrameError::MissingType) => {
                // The daemon can push payloads we cannot route; drop them
                // rather than fault on an absent field.
                tracing::warn!("dropping frame with no result.type");
                return;
            }
            Err(FrameError::Parse(e)) => {
                tracing::warn!("dropping frame: {}", e);
                return;
            }
        };

        // One-shot: consume exactly the oldest callback for this key, if
        // any. Unmatched replies are not an error; the daemon pushes data
        // nobody asked for.
        let reply_callback = {
            let mut state = lock(&self.state);
            let callback = state
                .one_shot
                .get_mut(&key)
                .and_then(VecDeque::pop_front);
            if state.one_shot.get(&key).is_some_and(|queue| queue.is_empty()) {
                state.one_shot.remove(&key);
            }
            callback
        };
        if let Some(callback) = reply_callback {
            callback(payload.clone());
        }

        // Subscription: independent of the one-shot table. Taken out for
        // the call so the callback can reach back into the adapter.
        let subscription = lock(&self.subscriptions).remove(&key);
        if let Some(mut callback) = subscription {
            callback(payload);
            // Put it back unless the callback re-subscribed meanwhile.
            lock(&self.subscriptions).entry(key).or_insert(callback);
        }
    }
}

impl TransportEvents for Inner {
    fn connected(&self, outbound: OutboundSender) {
        {
            let mut state = lock(&self.state);
            state.outbound = Some(outbound);
            let drained = std::mem::take(&mut state.pending);

            if !drained.is_empty() {
                tracing::info!("replaying {} queued commands", drained.len());
            }
            // Replay in original call order, under the same critical section
            // that installed the sender: concurrent callers block until the
            // batch is out and can never write ahead of it.
            for queued in drained {
                self.send_or_queue(&mut state, &queued.command, queued.params, queued.on_reply);
            }
        }

        let event = if self.connected_before.swap(true, Ordering::SeqCst) {
            ConnectorEvent::Reconnected
        } else {
            ConnectorEvent::Connected
        };
        self.events.dispatch(event);
    }

    fn frame(&self, text: String) {
        self.dispatch_frame(&text);
    }

    fn disconnected(&self) {
        lock(&self.state).outbound = None;
        self.events.dispatch(ConnectorEvent::Disconnected);
    }

    fn transport_error(&self, message: String) {
        self.events.dispatch(ConnectorEvent::Error(message));
    }

    fn state_changed(&self, state: ConnectionState) {
        set_connection_state(&self.connection_state, state);
    }
}
