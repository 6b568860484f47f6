//! Pull-based reader over a port's inbound messages.

#[cfg(debug_assertions)]
use crate::invariants::{
    debug_assert_bounded_read, debug_assert_buffering_open, debug_assert_listener_released,
};
use crate::error::AdapterError;
use crate::port::{Listener, ListenerId, Port, PortEvent};
use crate::state::AdapterState;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{ready, Context, Poll, Waker};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, trace, warn};

/// Result of a successful read: `Some(bytes)` or `None` at end of stream.
pub type ReadResult = Result<Option<Bytes>, AdapterError>;

/// State shared between the reader and its port listener.
#[derive(Default)]
struct Shared {
    buffer: VecDeque<Bytes>,
    state: AdapterState,
    listener: Option<ListenerId>,
    disposed: bool,
    read_pending: bool,
    waker: Option<Waker>,
}

impl Shared {
    /// Applies one port event. Returns the waker of a suspended read, if the
    /// event can complete it.
    fn on_event(&mut self, event: PortEvent) -> Option<Waker> {
        if self.disposed {
            return None;
        }
        match event {
            PortEvent::Message(data) => {
                if !self.state.is_open() {
                    trace!(len = data.len(), state = ?self.state, "dropping message after close");
                    return None;
                }
                if data.is_empty() {
                    return None;
                }
                #[cfg(debug_assertions)]
                debug_assert_buffering_open!(self.state);
                trace!(len = data.len(), queued = self.buffer.len(), "buffered inbound message");
                self.buffer.push_back(data);
            }
            PortEvent::Close => {
                if self.state.begin_close() {
                    debug!(buffered = self.buffer.len(), "reader observed channel close");
                }
                if self.buffer.is_empty() {
                    self.state.finish_close();
                }
            }
            PortEvent::Error(err) => {
                if self.state.fail(err.clone()) {
                    warn!(error = %err, "reader observed channel error");
                }
            }
        }
        self.waker.take()
    }

    /// Removes at most `max_len` bytes from the front message.
    fn take_chunk(&mut self, max_len: usize) -> Option<Bytes> {
        let front = self.buffer.front_mut()?;
        let front_len = front.len();
        let chunk = if front_len > max_len {
            front.split_to(max_len)
        } else {
            self.buffer.pop_front()?
        };

        #[cfg(debug_assertions)]
        debug_assert_bounded_read!(chunk.len(), max_len, front_len);

        if self.buffer.is_empty() && self.state == AdapterState::Closing {
            self.state.finish_close();
        }
        Some(chunk)
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>, max_len: usize) -> Poll<ReadResult> {
        if self.disposed {
            return Poll::Ready(Err(AdapterError::Closed));
        }

        if max_len == 0 && (self.state.is_open() || !self.buffer.is_empty()) {
            return Poll::Ready(Ok(Some(Bytes::new())));
        }

        if let Some(chunk) = self.take_chunk(max_len) {
            return Poll::Ready(Ok(Some(chunk)));
        }

        if let AdapterState::Errored(err) = &self.state {
            return Poll::Ready(Err(AdapterError::Channel(err.clone())));
        }

        if self.state.is_open() {
            // Single-slot wake: the listener takes and wakes this waker.
            match &self.waker {
                Some(waker) if waker.will_wake(cx.waker()) => {}
                _ => self.waker = Some(cx.waker().clone()),
            }
            return Poll::Pending;
        }

        self.state.finish_close();
        Poll::Ready(Ok(None))
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pull reader over a port's inbound message stream.
///
/// Each inbound message is buffered in arrival order. A read returns between
/// one and `max_len` bytes taken from the front buffered message, never
/// joining two messages, and suspends only while nothing is buffered and the
/// channel is still open.
///
/// At most one read may be pending at a time. A second concurrent read
/// fails fast with [`AdapterError::ConcurrentRead`].
///
/// The reader registers exactly one listener on the port when constructed
/// and removes it on [`dispose`](Self::dispose) or drop. It never closes
/// the port itself.
pub struct MessageReader<P: Port + ?Sized> {
    port: Arc<P>,
    shared: Arc<Mutex<Shared>>,
}

impl<P: Port + ?Sized> MessageReader<P> {
    /// Creates a reader and subscribes it to the port's inbound events.
    pub fn new(port: Arc<P>) -> Self {
        let shared = Arc::new(Mutex::new(Shared::default()));

        let weak = Arc::downgrade(&shared);
        let listener: Listener = Arc::new(move |event: PortEvent| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let waker = lock(&shared).on_event(event);
            if let Some(waker) = waker {
                waker.wake();
            }
        });

        let id = port.add_listener(listener);
        lock(&shared).listener = Some(id);
        debug!(%id, "reader registered port listener");

        Self { port, shared }
    }

    /// Reads up to `max_len` bytes.
    ///
    /// Returns `Ok(None)` once the channel has closed and every buffered byte
    /// has been consumed; later reads keep returning `Ok(None)`.
    pub async fn read(&self, max_len: usize) -> ReadResult {
        let mut permit = self.acquire()?;
        permit.read(max_len).await
    }

    /// Claims the single read slot.
    ///
    /// The permit is held for the duration of one read, or for as long as a
    /// stream consumer keeps the reader locked. Dropping it (including
    /// dropping a suspended read) frees the slot.
    pub fn acquire(&self) -> Result<ReadPermit<'_>, AdapterError> {
        let mut shared = lock(&self.shared);
        if shared.disposed {
            return Err(AdapterError::Closed);
        }
        if shared.read_pending {
            return Err(AdapterError::ConcurrentRead);
        }
        shared.read_pending = true;
        Ok(ReadPermit {
            shared: &self.shared,
        })
    }

    /// Unsubscribes from the port and rejects any pending read with
    /// [`AdapterError::Closed`]. The reader ends `Closed`, or stays
    /// `Errored` if the channel already failed. Idempotent.
    pub fn dispose(&self) {
        let (id, waker) = {
            let mut shared = lock(&self.shared);
            if shared.disposed {
                return;
            }
            shared.disposed = true;
            shared.buffer.clear();
            shared.state.begin_close();
            shared.state.finish_close();
            let id = shared.listener.take();

            #[cfg(debug_assertions)]
            debug_assert_listener_released!(shared.listener);

            (id, shared.waker.take())
        };

        if let Some(id) = id {
            self.port.remove_listener(id);
            debug!(%id, "reader removed port listener");
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Returns `true` while a read permit is outstanding.
    pub fn is_read_pending(&self) -> bool {
        lock(&self.shared).read_pending
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        lock(&self.shared).disposed
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdapterState {
        lock(&self.shared).state.clone()
    }

    /// Number of bytes buffered and not yet read.
    pub fn buffered_len(&self) -> usize {
        lock(&self.shared).buffer.iter().map(Bytes::len).sum()
    }

    /// Number of (possibly partially read) messages buffered.
    pub fn buffered_messages(&self) -> usize {
        lock(&self.shared).buffer.len()
    }

    /// The port this reader is subscribed to.
    pub fn port(&self) -> &Arc<P> {
        &self.port
    }
}

impl<P: Port + ?Sized> Drop for MessageReader<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<P: Port + ?Sized> AsyncRead for MessageReader<P> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        // `&mut self` already excludes any other read on this reader.
        let result = ready!(lock(&self.shared).poll_chunk(cx, buf.remaining()));
        match result {
            Ok(Some(chunk)) => {
                buf.put_slice(&chunk);
                Poll::Ready(Ok(()))
            }
            Ok(None) => Poll::Ready(Ok(())),
            Err(err) => Poll::Ready(Err(err.into())),
        }
    }
}

/// Exclusive right to read from a [`MessageReader`].
pub struct ReadPermit<'a> {
    shared: &'a Mutex<Shared>,
}

impl ReadPermit<'_> {
    /// Polls for up to `max_len` bytes.
    pub fn poll_read_chunk(&mut self, cx: &mut Context<'_>, max_len: usize) -> Poll<ReadResult> {
        lock(self.shared).poll_chunk(cx, max_len)
    }

    /// Reads up to `max_len` bytes, suspending while nothing is buffered.
    pub async fn read(&mut self, max_len: usize) -> ReadResult {
        poll_fn(|cx| self.poll_read_chunk(cx, max_len)).await
    }
}

impl Drop for ReadPermit<'_> {
    fn drop(&mut self) {
        let mut shared = lock(self.shared);
        shared.read_pending = false;
        shared.waker = None;
    }
}
