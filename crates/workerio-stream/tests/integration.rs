//! Integration tests for workerio-stream.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use workerio::{
    AdapterError, ChannelError, Listener, ListenerId, MemoryPort, Port,
};
use workerio_stream::{
    readable_stream_from_port, stream_pair, writable_stream_from_port, StreamError, StreamReader,
};

/// Port that records every send.
#[derive(Default)]
struct RecordingPort {
    sent: Mutex<Vec<Bytes>>,
}

impl RecordingPort {
    fn sent_len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Port for RecordingPort {
    fn post_message(&self, data: Bytes) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(data);
        Ok(())
    }

    fn add_listener(&self, _listener: Listener) -> ListenerId {
        ListenerId::new(0)
    }

    fn remove_listener(&self, _id: ListenerId) {}

    fn close(&self) {}
}

#[tokio::test]
async fn test_hundred_chunks_hundred_messages() {
    let port = Arc::new(RecordingPort::default());
    let stream = writable_stream_from_port(Arc::clone(&port));

    let mut sink = stream.lock().expect("lock failed");
    for i in 0..100u32 {
        let mut chunk = vec![0u8; 1024];
        chunk[..4].copy_from_slice(&i.to_be_bytes());
        sink.feed(Bytes::from(chunk)).await.expect("feed failed");
        // Accepting chunk i sent chunk i - 1 and nothing more.
        assert_eq!(port.sent_len(), i as usize);
    }
    sink.flush().await.expect("flush failed");
    assert_eq!(sink.chunks_written(), 100);

    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 100);
    for (i, msg) in sent.iter().enumerate() {
        assert_eq!(msg.len(), 1024);
        assert_eq!(&msg[..4], &(i as u32).to_be_bytes(), "message {} out of order", i);
    }
}

#[tokio::test]
async fn test_send_all_preserves_order() {
    let port = Arc::new(RecordingPort::default());
    let stream = writable_stream_from_port(Arc::clone(&port));

    let chunks: Vec<Result<Bytes, StreamError>> = (0..10u8)
        .map(|i| Ok(Bytes::from(vec![i; 8])))
        .collect();
    let mut sink = stream.lock().unwrap();
    sink.send_all(&mut futures::stream::iter(chunks)).await.unwrap();
    sink.flush().await.unwrap();

    let sent = port.sent.lock().unwrap();
    let firsts: Vec<u8> = sent.iter().map(|msg| msg[0]).collect();
    assert_eq!(firsts, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_round_trip_between_ends() {
    let (main_side, worker_side) = MemoryPort::pair();
    let (main_rx, main_tx) = stream_pair(Arc::new(main_side));
    let (worker_rx, worker_tx) = stream_pair(Arc::new(worker_side));

    let mut sink = main_tx.lock().unwrap();
    sink.send(Bytes::from_static(b"Hello")).await.unwrap();
    sink.send(Bytes::from_static(b"World")).await.unwrap();
    sink.release();

    let mut inbound = worker_rx.lock().unwrap();
    let mut outbound = worker_tx.lock().unwrap();
    for _ in 0..2 {
        let chunk = inbound.next().await.unwrap().unwrap();
        let reply = format!("!!! {} !!!", String::from_utf8_lossy(&chunk));
        outbound.send(Bytes::from(reply)).await.unwrap();
    }

    let replies: Vec<Bytes> = main_rx
        .lock()
        .unwrap()
        .take(2)
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(
        replies,
        vec![
            Bytes::from_static(b"!!! Hello !!!"),
            Bytes::from_static(b"!!! World !!!"),
        ]
    );
}

#[tokio::test]
async fn test_stream_ends_on_close() {
    let (main_side, worker_side) = MemoryPort::pair();
    let rx = readable_stream_from_port(Arc::new(worker_side));
    main_side.post_message(Bytes::from_static(b"only")).unwrap();
    main_side.close();

    let chunks: Vec<_> = rx.lock().unwrap().collect().await;
    assert_eq!(chunks, vec![Ok(Bytes::from_static(b"only"))]);
}

#[tokio::test]
async fn test_cancel_wakes_pending_consumer() {
    let (main_side, worker_side) = MemoryPort::pair();
    let worker_side = Arc::new(worker_side);
    let rx = Arc::new(StreamReader::new(Arc::clone(&worker_side)));

    let consumer = tokio::spawn({
        let rx = Arc::clone(&rx);
        async move {
            let mut lock = rx.lock().expect("lock failed");
            lock.next().await
        }
    });
    tokio::task::yield_now().await;
    assert!(rx.is_locked());

    rx.cancel();
    assert_eq!(consumer.await.unwrap(), None);
    assert!(!rx.is_locked());
    assert_eq!(worker_side.listener_count(), 0);

    // Nothing is buffered once cancelled.
    main_side.post_message(Bytes::from_static(b"dropped")).unwrap();
    assert_eq!(rx.get_ref().buffered_len(), 0);
}

#[tokio::test]
async fn test_channel_error_reaches_consumer() {
    let (_main_side, worker_side) = MemoryPort::pair();
    let worker_side = Arc::new(worker_side);
    let rx = Arc::new(StreamReader::new(Arc::clone(&worker_side)));

    let consumer = tokio::spawn({
        let rx = Arc::clone(&rx);
        async move {
            let lock = rx.lock().expect("lock failed");
            lock.collect::<Vec<_>>().await
        }
    });
    tokio::task::yield_now().await;

    worker_side.emit_error("worker crashed");
    let items = consumer.await.unwrap();
    assert_eq!(
        items,
        vec![Err(StreamError::Adapter(AdapterError::Channel(
            ChannelError::new("worker crashed")
        )))]
    );

    // A fresh lock sees the same cached error.
    let mut lock = rx.lock().unwrap();
    assert_eq!(
        lock.next().await,
        Some(Err(StreamError::Adapter(AdapterError::Channel(
            ChannelError::new("worker crashed")
        ))))
    );
}

#[tokio::test]
async fn test_locks_are_exclusive_per_direction() {
    let (main_side, _worker_side) = MemoryPort::pair();
    let (rx, tx) = stream_pair(Arc::new(main_side));

    let _reading = rx.lock().unwrap();
    let _writing = tx.lock().unwrap();

    assert!(matches!(rx.lock(), Err(StreamError::Locked)));
    assert!(matches!(tx.lock(), Err(StreamError::Locked)));
    assert!(StreamError::Locked.is_recoverable());
}
