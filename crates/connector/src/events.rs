//! Typed lifecycle and data events.
//!
//! The connector reports what is happening on the connection through a
//! single event enum dispatched synchronously to registered listeners,
//! rather than string-keyed emitter events.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// Everything a connector can tell its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorEvent {
    /// First successful connection to the daemon.
    Connected,
    /// A later successful connection after a drop.
    Reconnected,
    /// The connection is gone; outbound commands queue until it returns.
    Disconnected,
    /// A transport failure or an unparseable inbound frame.
    Error(String),
    /// A successfully parsed inbound payload, delivered before any
    /// correlation happens.
    Data(Value),
}

/// Lock a mutex, recovering the guard if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Listener = Box<dyn FnMut(ConnectorEvent) + Send + 'static>;

/// Event bus for connector events.
///
/// Push-based: listeners register callbacks that are invoked for every
/// dispatched event. The bus holds strong references to listeners, so they
/// persist until the bus is dropped.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
}

impl EventBus {
    /// Create a new EventBus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to all events.
    ///
    /// The callback is invoked synchronously for every event the connector
    /// dispatches, in registration order.
    pub fn subscribe(&self, listener: impl FnMut(ConnectorEvent) + Send + 'static) {
        lock(&self.listeners).push(Box::new(listener));
    }

    /// Dispatch an event to all listeners.
    ///
    /// Each listener receives its own clone of the event. The listener list
    /// is taken out for the calls, so a listener may register new listeners;
    /// they start receiving from the next event.
    pub fn dispatch(&self, event: ConnectorEvent) {
        let mut listeners = std::mem::take(&mut *lock(&self.listeners));
        for listener in listeners.iter_mut() {
            listener(event.clone());
        }

        // Put the list back, keeping anything registered during dispatch
        // behind the existing listeners.
        let mut slot = lock(&self.listeners);
        let added = std::mem::take(&mut *slot);
        *slot = listeners;
        slot.extend(added);
    }

    /// Get the number of listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_subscribe_and_dispatch() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU32::new(0));

        let count_clone = Arc::clone(&count);
        bus.subscribe(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.listener_count(), 1);

        bus.dispatch(ConnectorEvent::Connected);
        bus.dispatch(ConnectorEvent::Disconnected);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_can_register_another_listener_from_inside_dispatch() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicU32::new(0));

        let bus_clone = Arc::clone(&bus);
        let count_clone = Arc::clone(&count);
        bus.subscribe(move |_event| {
            let inner_count = Arc::clone(&count_clone);
            bus_clone.subscribe(move |_event| {
                inner_count.fetch_add(1, Ordering::SeqCst);
            });
        });

        // Must not deadlock; the new listener misses the current event.
        bus.dispatch(ConnectorEvent::Connected);
        assert_eq!(bus.listener_count(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // It sees the next one.
        bus.dispatch(ConnectorEvent::Disconnected);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_listener_sees_every_event() {
        let bus = EventBus::new();
        let seen1 = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::new(Mutex::new(Vec::new()));

        let seen1_clone = Arc::clone(&seen1);
        bus.subscribe(move |event| {
            lock(&seen1_clone).push(event);
        });
        let seen2_clone = Arc::clone(&seen2);
        bus.subscribe(move |event| {
            lock(&seen2_clone).push(event);
        });

        bus.dispatch(ConnectorEvent::Error("boom".into()));

        assert_eq!(*lock(&seen1), vec![ConnectorEvent::Error("boom".into())]);
        assert_eq!(*lock(&seen2), vec![ConnectorEvent::Error("boom".into())]);
    }
}
