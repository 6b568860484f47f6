//! Demonstration of workerio-stream over an in-process worker boundary.
//!
//! Run with: `cargo run -p workerio-stream --bin demo -- --messages 100 --size 1024`

use anyhow::{anyhow, bail, Context as _};
use bytes::Bytes;
use clap::Parser;
use futures_util::SinkExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use workerio::{MemoryPort, MessageReader, MessageWriter, Port};
use workerio_stream::{stream_pair, StreamExt};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "demo", about = "Echo bytes through a worker-style message port")]
struct Args {
    /// Number of messages sent in the bulk round-trip.
    #[arg(long, env = "WORKERIO_MESSAGES", default_value_t = 100)]
    messages: usize,

    /// Size in bytes of each bulk message.
    #[arg(long, env = "WORKERIO_SIZE", default_value_t = 1024)]
    size: usize,

    /// Log filter directive (e.g. `info`, `workerio=trace`).
    #[arg(long, env = "WORKERIO_LOG", default_value = "info")]
    log_level: String,
}

fn init_logging(directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter: {directive}"))?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    println!("=== workerio-stream Demo ===\n");

    demo_greeting().await?;
    demo_bulk_echo(args.messages, args.size).await?;

    println!("\n=== All demos completed successfully! ===");
    Ok(())
}

/// Subscribes the worker end before anything is posted to it; a port drops
/// messages that arrive while no listener is registered.
fn worker_adapters(port: MemoryPort) -> (MessageReader<MemoryPort>, MessageWriter<MemoryPort>) {
    let port = Arc::new(port);
    (MessageReader::new(Arc::clone(&port)), MessageWriter::new(port))
}

/// Worker side: wraps every inbound message as `!!! text !!!` and sends it back.
async fn shout_worker(
    reader: MessageReader<MemoryPort>,
    writer: MessageWriter<MemoryPort>,
) -> anyhow::Result<()> {
    while let Some(chunk) = reader.read(usize::MAX).await? {
        let text = String::from_utf8_lossy(&chunk);
        writer.write(format!("!!! {text} !!!")).await?;
    }
    debug!("shout worker reached end of stream");
    Ok(())
}

/// Demo 1: stream/sink round-trip through a transforming worker
async fn demo_greeting() -> anyhow::Result<()> {
    println!("--- Demo 1: Greeting ---");

    let (main_side, worker_side) = MemoryPort::pair();
    let main_side = Arc::new(main_side);
    let (reader, writer) = worker_adapters(worker_side);
    let worker = tokio::spawn(shout_worker(reader, writer));

    let (rx, tx) = stream_pair(Arc::clone(&main_side));

    let mut sink = tx.lock()?;
    sink.send(Bytes::from_static(b"Hello")).await?;
    sink.send(Bytes::from_static(b"World")).await?;
    sink.release();

    let mut chunks = rx.lock()?;
    for _ in 0..2 {
        let Some(chunk) = timeout(READ_TIMEOUT, chunks.next()).await? else {
            bail!("worker closed the channel early");
        };
        println!("  Received: {}", String::from_utf8_lossy(&chunk?));
    }
    chunks.release();

    main_side.close();
    worker.await??;
    println!("  ✓ Greeting complete\n");
    Ok(())
}

/// Worker side: copies bytes back verbatim using tokio I/O.
async fn echo_worker(
    mut reader: MessageReader<MemoryPort>,
    mut writer: MessageWriter<MemoryPort>,
) -> anyhow::Result<u64> {
    let copied = tokio::io::copy(&mut reader, &mut writer).await?;
    Ok(copied)
}

/// Demo 2: bulk echo measuring round-trip throughput
async fn demo_bulk_echo(messages: usize, size: usize) -> anyhow::Result<()> {
    println!("--- Demo 2: Bulk Echo ({messages} x {size} bytes) ---");

    let (main_side, worker_side) = MemoryPort::pair();
    let main_side = Arc::new(main_side);
    let (reader, writer) = worker_adapters(worker_side);
    let worker = tokio::spawn(echo_worker(reader, writer));

    let (rx, tx) = stream_pair(Arc::clone(&main_side));
    let expected = messages * size;
    let start = Instant::now();

    let mut sink = tx.lock()?;
    let payload = Bytes::from(vec![0u8; size]);
    for _ in 0..messages {
        sink.send(payload.clone()).await?;
    }
    info!(chunks = sink.chunks_written(), "bulk payload sent");
    sink.release();

    let mut received = 0usize;
    let mut chunks = rx.lock()?;
    while received < expected {
        let Some(chunk) = timeout(READ_TIMEOUT, chunks.next()).await? else {
            bail!("channel closed after {received} of {expected} bytes");
        };
        received += chunk?.len();
    }
    chunks.release();

    main_side.close();
    let copied = worker.await??;
    let elapsed = start.elapsed();

    println!("  Worker echoed {copied} bytes in {elapsed:?}");
    if copied != expected as u64 {
        bail!("worker echoed {copied} bytes, expected {expected}");
    }
    println!("  ✓ Bulk echo complete");
    Ok(())
}
