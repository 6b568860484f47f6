//! Lifecycle shared by readers and writers.

use crate::error::ChannelError;

/// Adapter lifecycle.
///
/// ```text
/// Open ──► Closing ──► Closed
///   │         │
///   └────┬────┘
///        ▼
///     Errored
/// ```
///
/// `Closed` and `Errored` are terminal: no transition leaves them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AdapterState {
    /// Accepting traffic.
    #[default]
    Open,
    /// Close observed or initiated; buffered data may still drain.
    Closing,
    /// Fully closed.
    Closed,
    /// The channel failed; the cached error is handed to every later caller.
    Errored(ChannelError),
}

impl AdapterState {
    /// Returns `true` for `Closed` and `Errored`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored(_))
    }

    /// Returns `true` while the adapter still accepts traffic.
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// The cached channel error, if the adapter has failed.
    pub fn error(&self) -> Option<&ChannelError> {
        match self {
            Self::Errored(err) => Some(err),
            _ => None,
        }
    }

    /// `Open → Closing`. Returns `false` if the transition does not apply.
    pub(crate) fn begin_close(&mut self) -> bool {
        if self.is_open() {
            *self = Self::Closing;
            true
        } else {
            false
        }
    }

    /// `Open | Closing → Closed`. Returns `false` if already terminal.
    pub(crate) fn finish_close(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self = Self::Closed;
        true
    }

    /// `Open | Closing → Errored`. The first error wins.
    pub(crate) fn fail(&mut self, err: ChannelError) -> bool {
        if self.is_terminal() {
            return false;
        }
        *self = Self::Errored(err);
        true
    }
}
