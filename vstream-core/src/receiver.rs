//! Client role: pulls frames from a sender, one connection per frame.
//!
//! Each iteration resolves the sender, connects to the first endpoint
//! that accepts, reads until the sender closes the stream and publishes
//! the accumulated bytes as one [`Frame`]. Any failure along the way is
//! written to the status and the loop starts over immediately; the
//! sender may come and go at any time.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::VstreamError;
use crate::frame::{Frame, FrameFormat, validate_frame_size};
use crate::queue::FrameQueue;
use crate::sender::DEFAULT_PORT;
use crate::stats::{RelayStats, ThroughputMeter};
use crate::status::{Status, StatusReporter};

/// Size of the reusable read buffer.
const SCRATCH_SIZE: usize = 64 * 1024;

/// A lenient read gives up once a transfer reaches this many frames' worth
/// of bytes.
const LENIENT_OVERRUN_FACTOR: usize = 4;

// ── LengthPolicy ─────────────────────────────────────────────────

/// How the receiver treats a transfer whose length differs from the
/// agreed frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    /// A mismatch is a retryable transfer error; nothing is published.
    #[default]
    Strict,
    /// Whatever arrived before end-of-stream is published as-is.
    Lenient,
}

// ── ReceiverConfig ───────────────────────────────────────────────

/// Configuration for [`FrameReceiver`].
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Sender host name or IP address.
    pub host: String,
    /// Sender TCP port.
    pub port: u16,
    /// Agreed byte length of every frame.
    pub frame_size: usize,
    /// Discard IPv6 candidates after resolution.
    pub ipv4_only: bool,
    /// Deadline for each individual connect attempt.
    pub connect_timeout: Duration,
    /// Pause between failed attempts. Zero retries immediately.
    pub retry_delay: Duration,
    pub length_policy: LengthPolicy,
}

impl ReceiverConfig {
    /// `host:port` as shown in logs and status text.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            frame_size: FrameFormat::default().frame_size(),
            ipv4_only: true,
            connect_timeout: Duration::from_secs(5),
            retry_delay: Duration::ZERO,
            length_policy: LengthPolicy::Strict,
        }
    }
}

// ── FrameReceiver ────────────────────────────────────────────────

/// Connecting side of the relay.
///
/// Completed frames are pushed into the destination queue as freshly
/// allocated buffers; the consumer owns whatever it pops.
pub struct FrameReceiver {
    config: ReceiverConfig,
    queue: Arc<FrameQueue<Frame>>,
    status: StatusReporter,
    scratch: Vec<u8>,
    meter: ThroughputMeter,
    stats_tx: watch::Sender<RelayStats>,
    stats_rx: watch::Receiver<RelayStats>,
}

impl FrameReceiver {
    pub fn new(
        config: ReceiverConfig,
        queue: Arc<FrameQueue<Frame>>,
        status: StatusReporter,
    ) -> Result<Self, VstreamError> {
        validate_frame_size(config.frame_size)?;
        if config.host.trim().is_empty() {
            return Err(VstreamError::InvalidConfig("sender host is empty".into()));
        }

        let (stats_tx, stats_rx) = watch::channel(RelayStats::default());
        Ok(Self {
            config,
            queue,
            status,
            scratch: vec![0u8; SCRATCH_SIZE],
            meter: ThroughputMeter::new(),
            stats_tx,
            stats_rx,
        })
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Obtain a `watch::Receiver` for receive statistics.
    pub fn stats_receiver(&self) -> watch::Receiver<RelayStats> {
        self.stats_rx.clone()
    }

    /// Run the receive loop until `cancel` fires.
    ///
    /// Transfer errors never end the loop; they are recorded in the
    /// status and the next attempt starts right away.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), VstreamError> {
        let target = self.config.target();
        info!(
            "receiving frames from {target} ({} bytes/frame)",
            self.config.frame_size
        );
        self.status.set(Status::Connecting(target));

        while !cancel.is_cancelled() {
            match self.receive_one(&cancel).await {
                Ok(frame) => {
                    let len = frame.len();
                    self.queue.push(frame);
                    self.meter.record(len as u64);
                    self.stats_tx.send_replace(self.meter.snapshot());
                    self.status.set(Status::Capturing);
                    debug!("received frame of {len} bytes");
                }
                Err(VstreamError::Cancelled) => break,
                Err(e) => {
                    // Keep the log readable while the sender is down.
                    if self.status.consecutive_failures() == 0 {
                        warn!("frame receive failed: {e}; retrying");
                    } else {
                        debug!("frame receive failed: {e}");
                    }
                    self.status.fail(&e);
                    self.backoff(&cancel).await;
                }
            }
        }

        self.status.set(Status::Stopped);
        info!("frame receiver stopped");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// One connection attempt: resolve, connect, read to end-of-stream.
    async fn receive_one(&mut self, cancel: &CancellationToken) -> Result<Frame, VstreamError> {
        let mut stream = self.connect(cancel).await?;
        let frame_size = self.config.frame_size;
        let policy = self.config.length_policy;

        let data = tokio::select! {
            _ = cancel.cancelled() => return Err(VstreamError::Cancelled),
            result = read_frame(&mut stream, &mut self.scratch, frame_size, policy) => result?,
        };
        Ok(Frame::new(data))
    }

    async fn connect(&self, cancel: &CancellationToken) -> Result<TcpStream, VstreamError> {
        let endpoints = tokio::select! {
            _ = cancel.cancelled() => return Err(VstreamError::Cancelled),
            result = resolve(&self.config.host, self.config.port, self.config.ipv4_only) => result?,
        };
        connect_any(&endpoints, self.config.connect_timeout, cancel).await
    }

    async fn backoff(&self, cancel: &CancellationToken) {
        let delay = self.config.retry_delay;
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Try each endpoint in order and return the first stream that connects.
///
/// Every attempt gets its own `connect_timeout`. If all of them fail,
/// the error from the last attempt is returned.
pub async fn connect_any(
    endpoints: &[SocketAddr],
    connect_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<TcpStream, VstreamError> {
    let mut last_error = None;
    for &addr in endpoints {
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VstreamError::Cancelled),
            result = tokio::time::timeout(connect_timeout, TcpStream::connect(addr)) => result,
        };
        match attempt {
            Ok(Ok(stream)) => {
                debug!("connected to {addr}");
                return Ok(stream);
            }
            Ok(Err(source)) => {
                debug!("connect to {addr} failed: {source}");
                last_error = Some(VstreamError::Connect {
                    target: addr.to_string(),
                    source,
                });
            }
            Err(_) => {
                debug!("connect to {addr} timed out after {connect_timeout:?}");
                last_error = Some(VstreamError::Timeout {
                    target: addr.to_string(),
                    after: connect_timeout,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| VstreamError::NoEndpoints("empty endpoint list".into())))
}

/// Resolve `host:port` into candidate endpoints, in resolver order.
pub async fn resolve(
    host: &str,
    port: u16,
    ipv4_only: bool,
) -> Result<Vec<SocketAddr>, VstreamError> {
    let target = format!("{host}:{port}");
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| VstreamError::Resolve {
            target: target.clone(),
            source,
        })?;

    let addrs: Vec<SocketAddr> = addrs.filter(|a| !ipv4_only || a.is_ipv4()).collect();
    if addrs.is_empty() {
        return Err(VstreamError::NoEndpoints(target));
    }
    Ok(addrs)
}

/// Read until end-of-stream, accumulating into a fresh buffer.
///
/// Under [`LengthPolicy::Strict`] an overlong transfer fails as soon as
/// it passes `frame_size`, and a short one fails at end-of-stream.
/// [`LengthPolicy::Lenient`] accepts any length up to
/// `LENIENT_OVERRUN_FACTOR * frame_size`.
pub async fn read_frame<R>(
    reader: &mut R,
    scratch: &mut [u8],
    frame_size: usize,
    policy: LengthPolicy,
) -> Result<Bytes, VstreamError>
where
    R: AsyncRead + Unpin,
{
    let limit = match policy {
        LengthPolicy::Strict => frame_size,
        LengthPolicy::Lenient => frame_size.saturating_mul(LENIENT_OVERRUN_FACTOR),
    };
    let mut frame = BytesMut::with_capacity(frame_size);
    loop {
        let n = reader.read(scratch).await?;
        if n == 0 {
            break;
        }
        frame.extend_from_slice(&scratch[..n]);
        if frame.len() > limit {
            return Err(VstreamError::FrameLength {
                expected: frame_size,
                actual: frame.len(),
            });
        }
    }

    if policy == LengthPolicy::Strict && frame.len() != frame_size {
        return Err(VstreamError::FrameLength {
            expected: frame_size,
            actual: frame.len(),
        });
    }
    Ok(frame.freeze())
}

// ── Tests ────────────────────────────────────────────────────────
