//! Coarse link status shared with the host application.
//!
//! The network side owns a [`StatusReporter`] and replaces the whole
//! [`Status`] value on every transition; the host holds a
//! [`StatusWatcher`] and reads the latest value or awaits the next
//! change. Values are published through a `tokio::sync::watch` channel,
//! so a reader never observes a partially written status.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

// ── Status ───────────────────────────────────────────────────────

/// Current state of a sender or receiver loop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Created, loop not yet running.
    #[default]
    Starting,
    /// Sender bound and waiting for the producer.
    Listening(SocketAddr),
    /// Sender holds a frame and waits for a receiver to connect.
    Waiting,
    /// Receiver resolving / connecting to the sender.
    Connecting(String),
    /// Receiver completed at least one frame on the latest attempt.
    Capturing,
    /// Sender delivered the latest frame.
    Streaming,
    /// Last attempt failed; the loop retries.
    Failed(String),
    /// Loop exited after cancellation.
    Stopped,
}

impl Status {
    pub fn is_failed(&self) -> bool {
        matches!(self, Status::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Starting => f.write_str("Starting"),
            Status::Listening(addr) => write!(f, "Listening on {addr}"),
            Status::Waiting => f.write_str("Waiting for client"),
            Status::Connecting(target) => write!(f, "Connecting to {target}"),
            Status::Capturing => f.write_str("Capturing"),
            Status::Streaming => f.write_str("Streaming"),
            Status::Failed(reason) => f.write_str(reason),
            Status::Stopped => f.write_str("Stopped"),
        }
    }
}

// ── StatusReporter ───────────────────────────────────────────────

/// Write side of the status channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    tx: Arc<watch::Sender<Status>>,
    failures: Arc<AtomicU64>,
}

impl StatusReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Status::Starting);
        Self {
            tx: Arc::new(tx),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the current status.
    ///
    /// A `Failed` status bumps the consecutive failure counter; `Capturing`
    /// and `Streaming` reset it.
    pub fn set(&self, status: Status) {
        match &status {
            Status::Failed(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            Status::Capturing | Status::Streaming => {
                self.failures.store(0, Ordering::Relaxed);
            }
            _ => {}
        }
        // `send_replace` keeps the value even when no watcher exists yet.
        self.tx.send_replace(status);
    }

    /// Record a failure description.
    pub fn fail(&self, reason: impl fmt::Display) {
        self.set(Status::Failed(reason.to_string()));
    }

    /// Latest published status.
    pub fn current(&self) -> Status {
        self.tx.borrow().clone()
    }

    /// Failures since the last successful transfer.
    pub fn consecutive_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Obtain a read handle for the host application.
    pub fn subscribe(&self) -> StatusWatcher {
        StatusWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

// ── StatusWatcher ────────────────────────────────────────────────

/// Read side of the status channel.
#[derive(Debug, Clone)]
pub struct StatusWatcher {
    rx: watch::Receiver<Status>,
}

impl StatusWatcher {
    /// Latest published status, marking it as seen.
    pub fn current(&mut self) -> Status {
        self.rx.borrow_and_update().clone()
    }

    /// Whether a status newer than the last one read has been published.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next status change and return it.
    ///
    /// Returns `None` once every reporter has been dropped.
    pub async fn changed(&mut self) -> Option<Status> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until `pred` holds for the current status and return it.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&Status) -> bool) -> Option<Status> {
        self.rx.wait_for(|s| pred(s)).await.ok().map(|s| (*s).clone())
    }
}

// ── Tests ────────────────────────────────────────────────────────
