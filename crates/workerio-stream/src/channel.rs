//! Stream construction from a port.

use crate::readable::StreamReader;
use crate::writable::StreamWriter;
use std::sync::Arc;
use workerio::Port;

/// Creates a readable stream of the port's inbound messages.
pub fn readable_stream_from_port<P: Port + ?Sized>(port: Arc<P>) -> StreamReader<P> {
    StreamReader::new(port)
}

/// Creates a writable stream sending one message per chunk on the port.
pub fn writable_stream_from_port<P: Port + ?Sized>(port: Arc<P>) -> StreamWriter<P> {
    StreamWriter::new(port)
}

/// Creates both directions over one port.
///
/// # Example
///
/// ```ignore
/// let (main_side, worker_side) = MemoryPort::pair();
/// let (rx, tx) = stream_pair(Arc::new(main_side));
///
/// let mut sink = tx.lock()?;
/// sink.send(Bytes::from_static(b"Hello")).await?;
/// ```
pub fn stream_pair<P: Port + ?Sized>(port: Arc<P>) -> (StreamReader<P>, StreamWriter<P>) {
    let reader = readable_stream_from_port(Arc::clone(&port));
    let writer = writable_stream_from_port(port);
    (reader, writer)
}
