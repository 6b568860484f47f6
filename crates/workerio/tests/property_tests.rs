//! Property-based tests for reader ordering and bounded reads.
//!
//! Messages are posted before reading starts, so every read completes
//! without suspending and a current-thread runtime is enough.

use bytes::Bytes;
use proptest::prelude::*;
use std::sync::Arc;
use workerio::{MemoryPort, MessageReader, Port};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn messages() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 0..16)
}

// =============================================================================
// Ordering: reads observe the exact concatenation M1 ‖ M2 ‖ … ‖ Mn
// =============================================================================

proptest! {
    #[test]
    fn prop_reads_preserve_concatenation(
        msgs in messages(),
        sizes in prop::collection::vec(1usize..32, 1..8),
    ) {
        let (main_side, worker_side) = MemoryPort::pair();
        let reader = MessageReader::new(Arc::new(worker_side));
        for msg in &msgs {
            main_side.post_message(Bytes::copy_from_slice(msg)).unwrap();
        }
        main_side.close();

        let received = block_on(async {
            let mut out = Vec::new();
            let mut i = 0;
            while let Some(chunk) = reader.read(sizes[i % sizes.len()]).await.unwrap() {
                out.extend_from_slice(&chunk);
                i += 1;
            }
            out
        });

        prop_assert_eq!(received, msgs.concat());
    }
}

// =============================================================================
// Bounded reads: each read is 1..=max bytes from a single message
// =============================================================================

proptest! {
    #[test]
    fn prop_reads_never_span_messages(
        msgs in messages(),
        max_len in 1usize..48,
    ) {
        let (main_side, worker_side) = MemoryPort::pair();
        let reader = MessageReader::new(Arc::new(worker_side));
        for msg in &msgs {
            main_side.post_message(Bytes::copy_from_slice(msg)).unwrap();
        }
        main_side.close();

        // Expected chunking: each message split into max_len pieces.
        let expected: Vec<Vec<u8>> = msgs
            .iter()
            .flat_map(|msg| msg.chunks(max_len).map(<[u8]>::to_vec))
            .collect();

        let chunks = block_on(async {
            let mut chunks = Vec::new();
            while let Some(chunk) = reader.read(max_len).await.unwrap() {
                chunks.push(chunk.to_vec());
            }
            chunks
        });

        for chunk in &chunks {
            prop_assert!(!chunk.is_empty() && chunk.len() <= max_len,
                "read returned {} bytes for max_len {}", chunk.len(), max_len);
        }
        prop_assert_eq!(chunks, expected);
    }
}

// =============================================================================
// EOF idempotence: once drained, every read is end of stream
// =============================================================================

proptest! {
    #[test]
    fn prop_eof_repeats(msgs in messages(), extra_reads in 1usize..8) {
        let (main_side, worker_side) = MemoryPort::pair();
        let reader = MessageReader::new(Arc::new(worker_side));
        for msg in &msgs {
            main_side.post_message(Bytes::copy_from_slice(msg)).unwrap();
        }
        main_side.close();

        let tail = block_on(async {
            while reader.read(usize::MAX).await.unwrap().is_some() {}
            let mut tail = Vec::new();
            for _ in 0..extra_reads {
                tail.push(reader.read(16).await);
            }
            tail
        });

        prop_assert!(tail.iter().all(|r| matches!(r, Ok(None))));
    }
}
