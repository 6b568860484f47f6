//! Push-based writer that maps each write to one outbound message.

use crate::error::AdapterError;
use crate::port::{Listener, ListenerId, Port, PortEvent};
use crate::state::AdapterState;
use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;
use tracing::{debug, trace, warn};

/// Writer sending one port message per write call.
///
/// Writes complete once the port has accepted the message; the channel
/// gives no delivery acknowledgment. Concurrent writes never interleave
/// bytes, since each is its own message, but their order on the channel is
/// the order in which the sends were issued. Callers that need strict
/// ordering await each write before issuing the next.
///
/// A failed send, or an error event on the port, puts the writer in the
/// `Errored` state: every later write fails with the same cached
/// [`ChannelError`](crate::ChannelError). The writer listens on the port
/// only for error events, until it is closed or dropped.
pub struct MessageWriter<P: Port + ?Sized> {
    port: Arc<P>,
    state: Arc<Mutex<AdapterState>>,
    listener: Mutex<Option<ListenerId>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: Port + ?Sized> MessageWriter<P> {
    /// Creates a writer bound to the port.
    pub fn new(port: Arc<P>) -> Self {
        let state = Arc::new(Mutex::new(AdapterState::Open));

        let weak = Arc::downgrade(&state);
        let listener: Listener = Arc::new(move |event: PortEvent| {
            let PortEvent::Error(err) = event else {
                return;
            };
            let Some(state) = weak.upgrade() else {
                return;
            };
            if lock(&state).fail(err.clone()) {
                warn!(error = %err, "writer observed channel error");
            }
        });

        let id = port.add_listener(listener);
        debug!(%id, "writer registered port listener");

        Self {
            port,
            state,
            listener: Mutex::new(Some(id)),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AdapterState> {
        lock(&self.state)
    }

    fn release_listener(&self) {
        let id = lock(&self.listener).take();
        if let Some(id) = id {
            self.port.remove_listener(id);
            debug!(%id, "writer removed port listener");
        }
    }

    fn check_open(&self) -> Result<(), AdapterError> {
        match &*self.lock_state() {
            AdapterState::Open => Ok(()),
            AdapterState::Errored(err) => Err(AdapterError::Channel(err.clone())),
            AdapterState::Closing | AdapterState::Closed => Err(AdapterError::Closed),
        }
    }

    /// Sends `data` as a single message.
    ///
    /// An empty buffer is accepted and sends nothing.
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<(), AdapterError> {
        self.try_write(data.into())
    }

    /// Sends `data` as a single message without suspending.
    ///
    /// Ports accept sends synchronously, so this is the whole of
    /// [`write`](Self::write); it exists for poll-based callers.
    pub fn try_write(&self, data: Bytes) -> Result<(), AdapterError> {
        self.check_open()?;
        if data.is_empty() {
            return Ok(());
        }

        let len = data.len();
        // The state lock is not held across the send: delivery may run the
        // peer's listeners synchronously.
        match self.port.post_message(data) {
            Ok(()) => {
                trace!(len, "wrote outbound message");
                Ok(())
            }
            Err(err) => {
                if self.lock_state().fail(err.clone()) {
                    warn!(error = %err, "writer send failed");
                }
                Err(AdapterError::Channel(err))
            }
        }
    }

    /// Closes the writer. Later writes fail with [`AdapterError::Closed`].
    ///
    /// The port itself stays open; it belongs to the embedding application.
    pub fn close(&self) {
        {
            let mut state = self.lock_state();
            state.begin_close();
            if state.finish_close() {
                debug!("writer closed");
            }
        }
        self.release_listener();
    }

    /// Returns `true` once the writer is closed or has failed.
    pub fn is_closed(&self) -> bool {
        self.lock_state().is_terminal()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdapterState {
        self.lock_state().clone()
    }

    /// The port this writer sends on.
    pub fn port(&self) -> &Arc<P> {
        &self.port
    }
}

impl<P: Port + ?Sized> Drop for MessageWriter<P> {
    fn drop(&mut self) {
        self.release_listener();
    }
}

impl<P: Port + ?Sized> AsyncWrite for MessageWriter<P> {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.try_write(Bytes::copy_from_slice(buf))?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.check_open()?;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.close();
        Poll::Ready(Ok(()))
    }
}
