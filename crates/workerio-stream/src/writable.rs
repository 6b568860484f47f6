//! Chunk sink over a `MessageWriter`, implementing `futures::Sink`.

use crate::error::StreamError;
use bytes::Bytes;
use futures_sink::Sink;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tracing::{debug, trace};
use workerio::{MessageWriter, Port};

/// Writable stream of outbound messages.
///
/// Producers take an exclusive [`WriterLock`] with [`lock`](Self::lock);
/// every chunk accepted by the lock becomes exactly one port message.
pub struct StreamWriter<P: Port + ?Sized> {
    writer: MessageWriter<P>,
    locked: AtomicBool,
}

impl<P: Port + ?Sized> StreamWriter<P> {
    /// Creates a stream sending on the port.
    pub fn new(port: Arc<P>) -> Self {
        Self::from_writer(MessageWriter::new(port))
    }

    /// Wraps an existing writer.
    pub fn from_writer(writer: MessageWriter<P>) -> Self {
        Self {
            writer,
            locked: AtomicBool::new(false),
        }
    }

    /// Takes the exclusive producer lock.
    ///
    /// Fails with [`StreamError::Locked`] while another lock is held.
    pub fn lock(&self) -> Result<WriterLock<'_, P>, StreamError> {
        if self.locked.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Locked);
        }
        debug!("stream writer locked");
        Ok(WriterLock {
            stream: self,
            pending: None,
            written: 0,
        })
    }

    /// Returns `true` while a producer holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Closes the stream. Fails with [`StreamError::Locked`] while a
    /// producer holds the lock; that producer should close through it.
    pub fn close(&self) -> Result<(), StreamError> {
        if self.is_locked() {
            return Err(StreamError::Locked);
        }
        self.writer.close();
        Ok(())
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &MessageWriter<P> {
        &self.writer
    }

    /// Consumes the stream, returning the underlying writer.
    pub fn into_inner(self) -> MessageWriter<P> {
        self.writer
    }
}

/// Exclusive producer of a [`StreamWriter`].
///
/// Holds at most one chunk between `start_send` and the write that sends it,
/// so `poll_ready` reports readiness only after the previous chunk's write
/// has completed.
pub struct WriterLock<'a, P: Port + ?Sized> {
    stream: &'a StreamWriter<P>,
    pending: Option<Bytes>,
    written: u64,
}

impl<P: Port + ?Sized> WriterLock<'_, P> {
    /// Number of chunks written through this lock.
    pub fn chunks_written(&self) -> u64 {
        self.written
    }

    /// Releases the lock. A chunk accepted but not yet flushed is dropped.
    pub fn release(self) {
        drop(self);
    }

    /// Closes the underlying writer and releases the lock without flushing.
    pub fn abort(self) {
        debug!(dropped = self.pending.is_some(), "stream writer aborted");
        self.stream.writer.close();
    }

    fn poll_write_pending(&mut self) -> Poll<Result<(), StreamError>> {
        if let Some(chunk) = self.pending.take() {
            self.stream.writer.try_write(chunk)?;
            self.written += 1;
            trace!(written = self.written, "chunk written");
        }
        Poll::Ready(Ok(()))
    }
}

impl<P: Port + ?Sized> Sink<Bytes> for WriterLock<'_, P> {
    type Error = StreamError;

    /// Ready once the previously accepted chunk has been written.
    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().poll_write_pending()
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
        let this = self.get_mut();
        debug_assert!(
            this.pending.is_none(),
            "start_send called without poll_ready"
        );
        if this.stream.writer.is_closed() {
            // Surface the cached error (or Closed) without waiting for a flush.
            this.stream.writer.try_write(Bytes::new())?;
        }
        this.pending = Some(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.get_mut().poll_write_pending()
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        let this = self.get_mut();
        ready!(Pin::new(&mut *this).poll_flush(cx))?;
        this.stream.writer.close();
        debug!(written = this.written, "stream writer closed");
        Poll::Ready(Ok(()))
    }
}

impl<P: Port + ?Sized> Drop for WriterLock<'_, P> {
    fn drop(&mut self) {
        self.stream.locked.store(false, Ordering::Release);
        debug!("stream writer lock released");
    }
}
