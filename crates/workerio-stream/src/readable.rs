//! Chunk stream over a `MessageReader`, implementing `futures::Stream`.

use crate::error::StreamError;
use bytes::Bytes;
use futures_core::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tracing::debug;
use workerio::{AdapterError, MessageReader, Port, ReadPermit};

/// Readable stream of inbound messages.
///
/// Consumers take an exclusive [`ReaderLock`] with [`lock`](Self::lock);
/// the lock yields one chunk per inbound message. Dropping the lock releases
/// it and the stream may be locked again, picking up where the last consumer
/// stopped. Only one lock may be held at a time.
pub struct StreamReader<P: Port + ?Sized> {
    reader: MessageReader<P>,
}

impl<P: Port + ?Sized> StreamReader<P> {
    /// Creates a stream subscribed to the port's inbound messages.
    pub fn new(port: Arc<P>) -> Self {
        Self::from_reader(MessageReader::new(port))
    }

    /// Wraps an existing reader.
    pub fn from_reader(reader: MessageReader<P>) -> Self {
        Self { reader }
    }

    /// Takes the exclusive consumer lock.
    ///
    /// Fails with [`StreamError::Locked`] while another lock (or a direct
    /// read on the underlying reader) is outstanding.
    pub fn lock(&self) -> Result<ReaderLock<'_, P>, StreamError> {
        let permit = self.reader.acquire().map_err(|err| match err {
            AdapterError::ConcurrentRead => StreamError::Locked,
            other => StreamError::Adapter(other),
        })?;
        debug!("stream reader locked");
        Ok(ReaderLock {
            reader: &self.reader,
            permit,
            done: false,
        })
    }

    /// Returns `true` while a consumer holds the lock.
    pub fn is_locked(&self) -> bool {
        self.reader.is_read_pending()
    }

    /// Cancels the stream: the port listener is removed, buffered chunks are
    /// discarded, and a consumer waiting on the lock sees the stream end.
    pub fn cancel(&self) {
        debug!("stream reader cancelled");
        self.reader.dispose();
    }

    /// The underlying reader.
    pub fn get_ref(&self) -> &MessageReader<P> {
        &self.reader
    }

    /// Consumes the stream, returning the underlying reader.
    pub fn into_inner(self) -> MessageReader<P> {
        self.reader
    }
}

/// Exclusive consumer of a [`StreamReader`].
///
/// Yields `Ok(chunk)` per inbound message. The stream ends after the channel
/// closes, after [`cancel`](Self::cancel), or right after yielding an error.
pub struct ReaderLock<'a, P: Port + ?Sized> {
    reader: &'a MessageReader<P>,
    permit: ReadPermit<'a>,
    done: bool,
}

impl<P: Port + ?Sized> ReaderLock<'_, P> {
    /// Releases the lock, leaving the stream readable by a later consumer.
    pub fn release(self) {
        drop(self);
    }

    /// Cancels the underlying stream and releases the lock.
    pub fn cancel(self) {
        debug!("stream reader cancelled by consumer");
        self.reader.dispose();
    }
}

impl<P: Port + ?Sized> Stream for ReaderLock<'_, P> {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        // Unbounded read: one whole buffered message per chunk.
        match ready!(this.permit.poll_read_chunk(cx, usize::MAX)) {
            Ok(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            // Cancellation ends the stream normally.
            Ok(None) | Err(AdapterError::Closed) => {
                this.done = true;
                Poll::Ready(None)
            }
            Err(err) => {
                this.done = true;
                Poll::Ready(Some(Err(err.into())))
            }
        }
    }
}

impl<P: Port + ?Sized> Drop for ReaderLock<'_, P> {
    fn drop(&mut self) {
        debug!("stream reader lock released");
    }
}
