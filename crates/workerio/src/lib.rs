//! workerio - Byte Reader/Writer Adapters over Message Channels
//!
//! Worker-style channels deliver whole binary messages through push events
//! and offer no flow control. This crate turns such a channel into a pull
//! reader ([`MessageReader`]) and a push writer ([`MessageWriter`]).
//!
//! # Features
//!
//! - **Bounded reads**: each read returns 1..=`max_len` bytes from the front
//!   buffered message, suspending only while nothing is buffered
//! - **One message per write**: writes complete when the port accepts the send
//! - **Terminal states**: end of stream is idempotent; channel errors are
//!   cached and returned to every later caller
//! - **tokio I/O**: [`MessageReader`] implements `AsyncRead`, [`MessageWriter`]
//!   implements `AsyncWrite`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use workerio::{MemoryPort, MessageReader, MessageWriter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), workerio::AdapterError> {
//! let (main_side, worker_side) = MemoryPort::pair();
//!
//! let reader = MessageReader::new(Arc::new(worker_side));
//! let writer = MessageWriter::new(Arc::new(main_side));
//!
//! writer.write(&b"Hello"[..]).await?;
//! writer.write(&b"World"[..]).await?;
//!
//! assert_eq!(reader.read(3).await?.as_deref(), Some(&b"Hel"[..]));
//! assert_eq!(reader.read(1024).await?.as_deref(), Some(&b"lo"[..]));
//! assert_eq!(reader.read(1024).await?.as_deref(), Some(&b"World"[..]));
//! # Ok(())
//! # }
//! ```

mod error;
mod invariants;
mod memory;
mod port;
mod reader;
mod state;
mod writer;

pub use error::{AdapterError, ChannelError};
pub use memory::MemoryPort;
pub use port::{Listener, ListenerId, Port, PortEvent};
pub use reader::{MessageReader, ReadPermit, ReadResult};
pub use state::AdapterState;
pub use writer::MessageWriter;
