//! The message channel capability consumed by the adapters.

use crate::error::ChannelError;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// An event delivered by a port to its registered listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    /// One discrete inbound message.
    Message(Bytes),
    /// The channel has shut down in an orderly way; no more messages follow.
    Close,
    /// The channel reported a transport failure.
    Error(ChannelError),
}

/// Callback invoked for every event a port delivers.
pub type Listener = Arc<dyn Fn(PortEvent) + Send + Sync>;

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wraps a port-assigned registration number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw registration number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// A bidirectional message-passing endpoint.
///
/// The port is owned by the embedding application; adapters only hold a
/// shared reference to it. Each direction carries discrete binary messages
/// in FIFO order with no flow control.
pub trait Port: Send + Sync + 'static {
    /// Sends one message. Completion means the channel accepted it, not
    /// that the remote side received it.
    fn post_message(&self, data: Bytes) -> Result<(), ChannelError>;

    /// Registers a listener for inbound events.
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Unregisters a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Shuts the channel down for both ends.
    fn close(&self);
}
