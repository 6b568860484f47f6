//! Error types for reader/writer adapter operations.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// A failure reported by the underlying message channel.
///
/// Cheap to clone: adapters cache the first error they observe and hand the
/// same value to every later caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("channel error: {message}")]
pub struct ChannelError {
    message: Arc<str>,
}

impl ChannelError {
    /// Creates a channel error carrying the transport's description.
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error returned by a port whose channel has already been closed.
    pub fn closed() -> Self {
        Self::new("channel is closed")
    }

    /// The transport's description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur in reader and writer adapter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The underlying channel reported a failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The adapter has been disposed or closed locally.
    #[error("adapter is closed")]
    Closed,

    /// A read was issued while another read was still pending.
    #[error("a read is already pending on this reader")]
    ConcurrentRead,
}

impl AdapterError {
    /// Returns `true` if the caller can recover by changing how it calls the adapter.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConcurrentRead)
    }

    /// Returns `true` if this error indicates the adapter is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Channel(_) | Self::Closed)
    }
}

impl From<AdapterError> for io::Error {
    fn from(err: AdapterError) -> Self {
        let kind = match &err {
            AdapterError::Channel(_) => io::ErrorKind::BrokenPipe,
            AdapterError::Closed => io::ErrorKind::NotConnected,
            AdapterError::ConcurrentRead => io::ErrorKind::WouldBlock,
        };
        io::Error::new(kind, err)
    }
}
