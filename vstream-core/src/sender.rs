//! Server role: serves queued frames, one frame per inbound connection.
//!
//! For every frame taken from the queue the sender accepts exactly one
//! connection, writes the frame's bytes in full and closes the stream.
//! The receiver treats that end-of-stream as the frame boundary.
//!
//! Only the initial bind is fatal. Accept and write failures are logged,
//! reported through the [`StatusReporter`], and the loop moves on to the
//! next frame.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::VstreamError;
use crate::frame::{Frame, FrameFormat, validate_frame_size};
use crate::queue::FrameQueue;
use crate::stats::{RelayStats, ThroughputMeter};
use crate::status::{Status, StatusReporter};

/// Well-known port shared by sender and receiver defaults.
pub const DEFAULT_PORT: u16 = 3333;

// ── SenderConfig ─────────────────────────────────────────────────

/// Configuration for [`FrameSender`].
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Exact byte length of every frame.
    pub frame_size: usize,
    /// Listen backlog.
    pub backlog: u32,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            frame_size: FrameFormat::default().frame_size(),
            backlog: 16,
        }
    }
}

// ── FrameSender ──────────────────────────────────────────────────

/// Listening side of the relay.
///
/// # Lifetime
///
/// [`bind`](Self::bind) creates the listener (fatal on failure), then
/// [`run`](Self::run) serves frames until the token is cancelled.
pub struct FrameSender {
    listener: TcpListener,
    local_addr: SocketAddr,
    queue: Arc<FrameQueue<Frame>>,
    frame_size: usize,
    status: StatusReporter,
    meter: ThroughputMeter,
    stats_tx: watch::Sender<RelayStats>,
    stats_rx: watch::Receiver<RelayStats>,
}

impl FrameSender {
    /// Bind the listening socket with address reuse enabled.
    pub async fn bind(
        config: &SenderConfig,
        queue: Arc<FrameQueue<Frame>>,
        status: StatusReporter,
    ) -> Result<Self, VstreamError> {
        let frame_size = validate_frame_size(config.frame_size)?;
        let addr = config.bind_addr;

        let listener = Self::listen(addr, config.backlog)
            .map_err(|source| VstreamError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| VstreamError::Bind { addr, source })?;

        info!("frame sender listening on {local_addr} ({frame_size} bytes/frame)");
        status.set(Status::Listening(local_addr));

        let (stats_tx, stats_rx) = watch::channel(RelayStats::default());
        Ok(Self {
            listener,
            local_addr,
            queue,
            frame_size,
            status,
            meter: ThroughputMeter::new(),
            stats_tx,
            stats_rx,
        })
    }

    /// The address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Obtain a `watch::Receiver` for delivery statistics.
    pub fn stats_receiver(&self) -> watch::Receiver<RelayStats> {
        self.stats_rx.clone()
    }

    /// Run the serve loop until `cancel` fires.
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use tokio_util::sync::CancellationToken;
    /// # use vstream_core::{FrameQueue, FrameSender, SenderConfig, StatusReporter};
    /// # async fn example() -> Result<(), vstream_core::VstreamError> {
    /// let queue = Arc::new(FrameQueue::default());
    /// let sender = FrameSender::bind(&SenderConfig::default(), queue, StatusReporter::new()).await?;
    /// let cancel = CancellationToken::new();
    /// tokio::spawn(sender.run(cancel.clone()));
    /// // … later …
    /// cancel.cancel();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), VstreamError> {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = self.queue.pop() => frame,
            };

            if frame.len() != self.frame_size {
                let err = VstreamError::FrameLength {
                    expected: self.frame_size,
                    actual: frame.len(),
                };
                warn!("dropping frame from producer: {err}");
                self.status.fail(&err);
                continue;
            }

            if self.status.current() != Status::Streaming {
                self.status.set(Status::Waiting);
            }

            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        let err = VstreamError::Accept(e);
                        warn!("{err}");
                        self.status.fail(&err);
                        continue;
                    }
                },
            };

            debug!("delivering {} bytes to {peer}", frame.len());
            let delivered = tokio::select! {
                _ = cancel.cancelled() => break,
                result = Self::deliver(stream, &frame) => result,
            };

            match delivered {
                Ok(()) => {
                    self.meter.record(frame.len() as u64);
                    self.stats_tx.send_replace(self.meter.snapshot());
                    self.status.set(Status::Streaming);
                }
                Err(e) => {
                    warn!("frame delivery to {peer} failed: {e}");
                    self.status.fail(&e);
                }
            }
        }

        self.status.set(Status::Stopped);
        info!("frame sender on {} stopped", self.local_addr);
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    fn listen(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(backlog)
    }

    /// Write one frame and close. The stream is dropped on every path.
    async fn deliver(mut stream: TcpStream, frame: &Frame) -> Result<(), VstreamError> {
        stream.set_nodelay(true)?;
        stream.write_all(frame.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
