//! Error types for stream and sink operations.

use thiserror::Error;
use workerio::AdapterError;

/// Errors that can occur in stream operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The underlying reader or writer failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Another consumer already holds the stream's lock.
    #[error("stream is locked by another consumer")]
    Locked,
}

impl StreamError {
    /// Returns `true` if retrying after the current holder releases can succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Locked => true,
            Self::Adapter(err) => err.is_recoverable(),
        }
    }

    /// Returns `true` if this error indicates the stream is permanently unusable.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Locked => false,
            Self::Adapter(err) => err.is_terminal(),
        }
    }
}
