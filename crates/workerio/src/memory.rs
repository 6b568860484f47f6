//! In-process port pair.
//!
//! `MemoryPort::pair()` behaves like the two sides of a worker boundary:
//! whatever one side posts is delivered, in order, to the listeners of the
//! other side. Delivery is synchronous on the posting thread.

use crate::error::ChannelError;
use crate::port::{Listener, ListenerId, Port, PortEvent};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

#[derive(Default)]
struct Endpoint {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
    posted: AtomicU64,
}

impl Endpoint {
    fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(registered, _)| *registered != id);
    }

    fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers an event to every listener. The lock is released before the
    /// callbacks run so a listener may post or unregister re-entrantly.
    fn dispatch(&self, event: &PortEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        // No listener: the event is dropped, as a host worker would.
        for listener in listeners {
            listener(event.clone());
        }
    }
}

/// One end of an in-process message channel.
///
/// Cloning yields another handle to the same end.
#[derive(Clone)]
pub struct MemoryPort {
    local: Arc<Endpoint>,
    peer: Arc<Endpoint>,
    closed: Arc<AtomicBool>,
}

impl MemoryPort {
    /// Creates two connected ends.
    pub fn pair() -> (MemoryPort, MemoryPort) {
        let a = Arc::new(Endpoint::default());
        let b = Arc::new(Endpoint::default());
        let closed = Arc::new(AtomicBool::new(false));

        let left = MemoryPort {
            local: Arc::clone(&a),
            peer: Arc::clone(&b),
            closed: Arc::clone(&closed),
        };
        let right = MemoryPort {
            local: b,
            peer: a,
            closed,
        };
        (left, right)
    }

    /// Reports a transport failure to this end's listeners.
    pub fn emit_error(&self, message: &str) {
        trace!(error = message, "injecting channel error");
        self.local
            .dispatch(&PortEvent::Error(ChannelError::new(message)));
    }

    /// Returns `true` once either end has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of listeners currently registered on this end.
    pub fn listener_count(&self) -> usize {
        self.local.len()
    }

    /// Number of messages this end has posted successfully.
    pub fn messages_posted(&self) -> u64 {
        self.local.posted.load(Ordering::Relaxed)
    }
}

impl Port for MemoryPort {
    fn post_message(&self, data: Bytes) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::closed());
        }
        self.local.posted.fetch_add(1, Ordering::Relaxed);
        self.peer.dispatch(&PortEvent::Message(data));
        Ok(())
    }

    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.local.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.local.remove(id);
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.peer.dispatch(&PortEvent::Close);
        self.local.dispatch(&PortEvent::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Listener, Arc<Mutex<Vec<PortEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener: Listener = Arc::new(move |event: PortEvent| sink.lock().unwrap().push(event));
        (listener, events)
    }

    #[test]
    fn test_post_delivers_to_peer_only() {
        let (a, b) = MemoryPort::pair();
        let (on_a, seen_a) = recorder();
        let (on_b, seen_b) = recorder();
        a.add_listener(on_a);
        b.add_listener(on_b);

        a.post_message(Bytes::from_static(b"ping")).unwrap();

        assert!(seen_a.lock().unwrap().is_empty());
        assert_eq!(
            *seen_b.lock().unwrap(),
            vec![PortEvent::Message(Bytes::from_static(b"ping"))]
        );
        assert_eq!(a.messages_posted(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let (a, b) = MemoryPort::pair();
        let (on_b, seen_b) = recorder();
        let id = b.add_listener(on_b);
        assert_eq!(b.listener_count(), 1);

        b.remove_listener(id);
        assert_eq!(b.listener_count(), 0);

        a.post_message(Bytes::from_static(b"lost")).unwrap();
        assert!(seen_b.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_reaches_both_ends_once() {
        let (a, b) = MemoryPort::pair();
        let (on_a, seen_a) = recorder();
        let (on_b, seen_b) = recorder();
        a.add_listener(on_a);
        b.add_listener(on_b);

        b.close();
        b.close();

        assert_eq!(*seen_a.lock().unwrap(), vec![PortEvent::Close]);
        assert_eq!(*seen_b.lock().unwrap(), vec![PortEvent::Close]);
        assert_eq!(
            a.post_message(Bytes::from_static(b"late")),
            Err(ChannelError::closed())
        );
    }

    #[test]
    fn test_emit_error_is_local() {
        let (a, b) = MemoryPort::pair();
        let (on_a, seen_a) = recorder();
        let (on_b, seen_b) = recorder();
        a.add_listener(on_a);
        b.add_listener(on_b);

        a.emit_error("boom");

        assert_eq!(
            *seen_a.lock().unwrap(),
            vec![PortEvent::Error(ChannelError::new("boom"))]
        );
        assert!(seen_b.lock().unwrap().is_empty());
    }
}
