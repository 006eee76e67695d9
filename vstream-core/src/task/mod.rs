//! Owning handles for running relay loops.
//!
//! A relay loop performs all of its blocking socket waits off the host's
//! main loop. [`RelayTask`] runs it as a Tokio task for async hosts;
//! [`RelayThread`] gives it a dedicated OS thread with its own
//! current-thread runtime for hosts that are not async (a render loop,
//! a capture callback). Both pair the loop with a `CancellationToken`
//! so shutdown cancels and joins deterministically.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::VstreamError;
use crate::frame::Frame;
use crate::queue::FrameQueue;
use crate::receiver::{FrameReceiver, ReceiverConfig};
use crate::sender::{FrameSender, SenderConfig};
use crate::status::StatusReporter;

type RelayResult = Result<(), VstreamError>;

// ── RelayTask ────────────────────────────────────────────────────

/// A relay loop spawned on the current Tokio runtime.
pub struct RelayTask {
    handle: JoinHandle<RelayResult>,
    cancel: CancellationToken,
}

impl RelayTask {
    /// Spawn a bound sender. `cancel` may be a child of an
    /// application-wide token.
    pub fn spawn_sender(sender: FrameSender, cancel: CancellationToken) -> Self {
        let handle = tokio::spawn(sender.run(cancel.clone()));
        Self { handle, cancel }
    }

    pub fn spawn_receiver(mut receiver: FrameReceiver, cancel: CancellationToken) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move { receiver.run(token).await });
        Self { handle, cancel }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) -> RelayResult {
        self.cancel.cancel();
        self.handle.await?
    }
}

// ── RelayThread ──────────────────────────────────────────────────

/// A relay loop on its own OS thread.
///
/// Dropping the handle cancels the loop and joins the thread.
pub struct RelayThread {
    handle: Option<thread::JoinHandle<RelayResult>>,
    cancel: CancellationToken,
}

impl RelayThread {
    /// Bind and start a sender on a dedicated thread.
    ///
    /// Returns once the listener is bound, so a bind failure reaches the
    /// caller instead of dying on the background thread.
    pub fn spawn_sender(
        config: SenderConfig,
        queue: Arc<FrameQueue<Frame>>,
        status: StatusReporter,
    ) -> Result<Self, VstreamError> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<RelayResult>(1);

        let handle = thread::Builder::new()
            .name("vstream-sender".into())
            .spawn(move || {
                let rt = match build_runtime() {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return Ok(());
                    }
                };
                rt.block_on(async move {
                    match FrameSender::bind(&config, queue, status).await {
                        Ok(sender) => {
                            let _ = ready_tx.send(Ok(()));
                            sender.run(token).await
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            Ok(())
                        }
                    }
                })
            })
            .map_err(|e| VstreamError::Task(format!("failed to spawn sender thread: {e}")))?;

        let mut relay = Self {
            handle: Some(handle),
            cancel,
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(relay),
            Ok(Err(e)) => {
                let _ = relay.join_inner();
                Err(e)
            }
            Err(_) => {
                let joined = relay.join_inner();
                Err(joined.err().unwrap_or_else(|| {
                    VstreamError::Task("sender thread exited during startup".into())
                }))
            }
        }
    }

    /// Start a receiver on a dedicated thread.
    pub fn spawn_receiver(
        config: ReceiverConfig,
        queue: Arc<FrameQueue<Frame>>,
        status: StatusReporter,
    ) -> Result<Self, VstreamError> {
        let mut receiver = FrameReceiver::new(config, queue, status)?;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name("vstream-receiver".into())
            .spawn(move || {
                let rt = build_runtime()?;
                rt.block_on(receiver.run(token))
            })
            .map_err(|e| VstreamError::Task(format!("failed to spawn receiver thread: {e}")))?;

        Ok(Self {
            handle: Some(handle),
            cancel,
        })
    }

    /// Cancel the loop and join the thread.
    pub fn shutdown(mut self) -> RelayResult {
        self.cancel.cancel();
        self.join_inner()
    }

    fn join_inner(&mut self) -> RelayResult {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VstreamError::Task("relay thread panicked".into()))?,
            None => Ok(()),
        }
    }
}

impl Drop for RelayThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
            if let Err(e) = self.join_inner() {
                warn!("relay thread exited with error: {e}");
            }
        }
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime, VstreamError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| VstreamError::Task(format!("failed to build runtime: {e}")))
}

// ── Tests ────────────────────────────────────────────────────────
