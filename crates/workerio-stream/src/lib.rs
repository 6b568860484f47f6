//! Async Stream/Sink Adapters for workerio
//!
//! This crate provides [`futures_core::Stream`] and [`futures_sink::Sink`] implementations
//! over workerio's message readers and writers, so a worker-style port can be
//! consumed as a stream of chunks and fed as a sink of chunks.
//!
//! # Features
//!
//! - **One chunk per message**: the stream yields each inbound message whole;
//!   each chunk sent to the sink becomes one outbound message
//! - **Exact backpressure**: the sink is ready again only after the previous
//!   chunk's write completed
//! - **Exclusive locks**: one consumer and one producer at a time; a second
//!   `lock()` fails fast with [`StreamError::Locked`]
//! - **Cancellation**: cancelling removes the port listener and ends the stream
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use futures_util::SinkExt;
//! use workerio::MemoryPort;
//! use workerio_stream::{readable_stream_from_port, writable_stream_from_port, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (main_side, worker_side) = MemoryPort::pair();
//!     let rx = readable_stream_from_port(Arc::new(worker_side));
//!     let tx = writable_stream_from_port(Arc::new(main_side));
//!
//!     let mut sink = tx.lock().unwrap();
//!     sink.send(Bytes::from_static(b"Hello")).await.unwrap();
//!     sink.send(Bytes::from_static(b"World")).await.unwrap();
//!     sink.release();
//!
//!     let mut chunks = rx.lock().unwrap().take(2);
//!     while let Some(Ok(chunk)) = chunks.next().await {
//!         println!("{}", String::from_utf8_lossy(&chunk));
//!     }
//! }
//! ```

mod channel;
mod error;
mod readable;
mod writable;

pub use channel::{readable_stream_from_port, stream_pair, writable_stream_from_port};
pub use error::StreamError;
pub use readable::{ReaderLock, StreamReader};
pub use writable::{StreamWriter, WriterLock};

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
