//! Integration tests: sender and receiver loops over real TCP on
//! localhost: round trips, blocking behaviour, reconnection, and error
//! recovery.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use vstream_core::{
    CancellationToken, Frame, FrameQueue, FrameReceiver, FrameSender, LengthPolicy,
    ReceiverConfig, RelayTask, SenderConfig, Status, StatusReporter,
};

const TIMEOUT: Duration = Duration::from_secs(10);

// ── Helpers ──────────────────────────────────────────────────────

/// Bind a sender on an OS-assigned port and spawn its loop.
async fn spawn_sender(frame_size: usize) -> (RelayTask, Arc<FrameQueue<Frame>>, u16) {
    let queue = Arc::new(FrameQueue::unbounded());
    let config = SenderConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        frame_size,
        ..SenderConfig::default()
    };
    let sender = FrameSender::bind(&config, Arc::clone(&queue), StatusReporter::new())
        .await
        .unwrap();
    let port = sender.local_addr().port();
    (
        RelayTask::spawn_sender(sender, CancellationToken::new()),
        queue,
        port,
    )
}

fn receiver_config(port: u16, frame_size: usize) -> ReceiverConfig {
    ReceiverConfig {
        host: "127.0.0.1".into(),
        port,
        frame_size,
        ..ReceiverConfig::default()
    }
}

/// Spawn a receiver loop feeding a fresh unbounded queue.
fn spawn_receiver(
    config: ReceiverConfig,
) -> (RelayTask, Arc<FrameQueue<Frame>>, StatusReporter) {
    let queue = Arc::new(FrameQueue::unbounded());
    let status = StatusReporter::new();
    let receiver = FrameReceiver::new(config, Arc::clone(&queue), status.clone()).unwrap();
    (
        RelayTask::spawn_receiver(receiver, CancellationToken::new()),
        queue,
        status,
    )
}

/// A port that nothing listens on (the probe listener is dropped).
fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn read_one_frame(port: u16) -> Vec<u8> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut buf = Vec::new();
    tokio::time::timeout(TIMEOUT, stream.read_to_end(&mut buf))
        .await
        .expect("timeout")
        .unwrap();
    buf
}

// ── Round trips ──────────────────────────────────────────────────

#[tokio::test]
async fn test_twelve_byte_frame_end_to_end() {
    let (sender, sender_queue, port) = spawn_sender(12).await;
    let (receiver, receiver_queue, status) = spawn_receiver(receiver_config(port, 12));

    let payload: Vec<u8> = (0x00..=0x0B).collect();
    sender_queue.push(Frame::new(payload.clone()));

    let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
        .await
        .expect("timeout");
    assert_eq!(frame.as_bytes(), &payload[..]);
    assert!(receiver_queue.is_empty());
    assert_eq!(status.current(), Status::Capturing);

    receiver.shutdown().await.unwrap();
    sender.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_raw_client_sees_exact_bytes_then_eof() {
    let (sender, queue, port) = spawn_sender(12).await;
    let payload: Vec<u8> = (0x00..=0x0B).collect();
    queue.push(Frame::new(payload.clone()));

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let mut buf = [0u8; 12];
    tokio::time::timeout(TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("timeout")
        .unwrap();
    assert_eq!(&buf[..], &payload[..]);

    // End-of-stream follows immediately.
    let mut rest = [0u8; 1];
    let n = tokio::time::timeout(TIMEOUT, stream.read(&mut rest))
        .await
        .expect("timeout")
        .unwrap();
    assert_eq!(n, 0);

    sender.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_round_trip_sizes() {
    for size in [1usize, 12, 4096, 64 * 1024 + 17, 1280 * 720 * 3] {
        let (sender, queue, port) = spawn_sender(size).await;
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        queue.push(Frame::new(payload.clone()));

        let received = read_one_frame(port).await;
        assert_eq!(received.len(), size);
        assert!(received == payload, "payload mismatch for size {size}");

        sender.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_frames_arrive_in_push_order() {
    let (sender, sender_queue, port) = spawn_sender(4).await;
    let (receiver, receiver_queue, _status) = spawn_receiver(receiver_config(port, 4));

    for i in 0..3u8 {
        sender_queue.push(Frame::new(vec![i; 4]));
    }
    for i in 0..3u8 {
        let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
            .await
            .expect("timeout");
        assert_eq!(frame.as_bytes(), &[i; 4]);
    }

    receiver.shutdown().await.unwrap();
    sender.shutdown().await.unwrap();
}

// ── Blocking and retry behaviour ─────────────────────────────────

#[tokio::test]
async fn test_client_blocks_until_frame_pushed() {
    let (sender, sender_queue, port) = spawn_sender(8).await;
    let (receiver, receiver_queue, status) = spawn_receiver(receiver_config(port, 8));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(receiver_queue.is_empty());
    assert!(
        !status.current().is_failed(),
        "receiver saw a premature end-of-stream: {}",
        status.current()
    );

    sender_queue.push(Frame::new(vec![0x5A; 8]));
    let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
        .await
        .expect("timeout");
    assert_eq!(frame.as_bytes(), &[0x5A; 8]);

    receiver.shutdown().await.unwrap();
    sender.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_client_started_before_server() {
    let port = unused_port();
    let (receiver, receiver_queue, status) = spawn_receiver(receiver_config(port, 6));

    // Several failed attempts are recorded while nothing listens.
    tokio::time::timeout(TIMEOUT, async {
        while status.consecutive_failures() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("receiver did not keep retrying");
    assert!(status.current().is_failed());

    let queue = Arc::new(FrameQueue::unbounded());
    let config = SenderConfig {
        bind_addr: ([127, 0, 0, 1], port).into(),
        frame_size: 6,
        ..SenderConfig::default()
    };
    let sender = FrameSender::bind(&config, Arc::clone(&queue), StatusReporter::new())
        .await
        .unwrap();
    let sender = RelayTask::spawn_sender(sender, CancellationToken::new());
    queue.push(Frame::new(b"first!".to_vec()));

    let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
        .await
        .expect("timeout");
    assert_eq!(frame.as_bytes(), b"first!");
    assert_eq!(status.consecutive_failures(), 0);

    receiver.shutdown().await.unwrap();
    sender.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_reports_unresolvable_host() {
    let config = ReceiverConfig {
        host: "vstream-sender.invalid".into(),
        port: 3333,
        frame_size: 4,
        retry_delay: Duration::from_millis(20),
        ..ReceiverConfig::default()
    };
    let (receiver, _queue, status) = spawn_receiver(config);
    let mut watcher = status.subscribe();

    let failed = tokio::time::timeout(Duration::from_secs(30), watcher.wait_for(Status::is_failed))
        .await
        .expect("timeout")
        .expect("reporter dropped");
    assert!(failed.to_string().contains("vstream-sender.invalid"));
    assert!(!receiver.is_finished());

    receiver.shutdown().await.unwrap();
}

// ── Error recovery ───────────────────────────────────────────────

#[tokio::test]
async fn test_server_survives_client_disconnect() {
    let size = 4 * 1024 * 1024;
    let (sender, queue, port) = spawn_sender(size).await;
    queue.push(Frame::new(vec![0xAA; size]));

    // Read a little, then hang up mid-transfer.
    {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut head = [0u8; 16];
        tokio::time::timeout(TIMEOUT, stream.read_exact(&mut head))
            .await
            .expect("timeout")
            .unwrap();
        assert_eq!(head, [0xAA; 16]);
    }

    queue.push(Frame::new(vec![0xBB; size]));
    let received = read_one_frame(port).await;
    assert_eq!(received.len(), size);
    assert!(received.iter().all(|&b| b == 0xBB));
    assert!(!sender.is_finished());

    sender.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_strict_receiver_rejects_short_transfer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (go_tx, go_rx) = oneshot::channel::<()>();

    // A misbehaving peer: a short transfer first, then a correct one.
    let peer = tokio::spawn(async move {
        let (mut short, _) = listener.accept().await.unwrap();
        short.write_all(&[1, 2, 3, 4, 5]).await.unwrap();
        drop(short);

        go_rx.await.unwrap();
        let (mut full, _) = listener.accept().await.unwrap();
        full.write_all(&[7u8; 12]).await.unwrap();
    });

    let (receiver, receiver_queue, status) = spawn_receiver(receiver_config(port, 12));
    let mut watcher = status.subscribe();
    let failed = tokio::time::timeout(TIMEOUT, watcher.wait_for(Status::is_failed))
        .await
        .expect("timeout")
        .expect("reporter dropped");
    assert!(failed.to_string().contains("expected 12, got 5"));
    assert!(receiver_queue.is_empty());

    go_tx.send(()).unwrap();
    let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
        .await
        .expect("timeout");
    assert_eq!(frame.as_bytes(), &[7u8; 12]);

    peer.await.unwrap();
    receiver.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_lenient_receiver_accepts_short_transfer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let peer = tokio::spawn(async move {
        let (mut short, _) = listener.accept().await.unwrap();
        short.write_all(&[1, 2, 3, 4, 5]).await.unwrap();
    });

    let config = ReceiverConfig {
        length_policy: LengthPolicy::Lenient,
        ..receiver_config(port, 12)
    };
    let (receiver, receiver_queue, _status) = spawn_receiver(config);

    let frame = tokio::time::timeout(TIMEOUT, receiver_queue.pop())
        .await
        .expect("timeout");
    assert_eq!(frame.as_bytes(), &[1, 2, 3, 4, 5]);

    peer.await.unwrap();
    receiver.shutdown().await.unwrap();
}

// ── Cancellation ─────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_while_blocked() {
    let queue = Arc::new(FrameQueue::unbounded());
    let sender_status = StatusReporter::new();
    let config = SenderConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        frame_size: 8,
        ..SenderConfig::default()
    };
    let sender = FrameSender::bind(&config, Arc::clone(&queue), sender_status.clone())
        .await
        .unwrap();
    let sender = RelayTask::spawn_sender(sender, CancellationToken::new());

    // Sender blocks in accept: a frame is queued but nobody connects.
    queue.push(Frame::new(vec![0u8; 8]));
    // Receiver blocks in read: connected, but no frame will come.
    let (idle_sender, _idle_queue, idle_port) = spawn_sender(8).await;
    let (receiver, _queue, receiver_status) = spawn_receiver(receiver_config(idle_port, 8));
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::time::timeout(TIMEOUT, sender.shutdown())
        .await
        .expect("sender did not stop")
        .unwrap();
    tokio::time::timeout(TIMEOUT, receiver.shutdown())
        .await
        .expect("receiver did not stop")
        .unwrap();
    assert_eq!(sender_status.current(), Status::Stopped);
    assert_eq!(receiver_status.current(), Status::Stopped);

    idle_sender.shutdown().await.unwrap();
}
