//! Domain-specific error types for the vstream relay.
//!
//! All fallible operations return `Result<T, VstreamError>`.
//! Errors split into two groups: startup failures that must reach the
//! caller, and steady-state transfer failures that the relay loops
//! record and retry.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the vstream relay.
#[derive(Debug, Error)]
pub enum VstreamError {
    // ── Startup Errors ───────────────────────────────────────────
    /// The listening socket could not be created, bound, or put into
    /// listen mode.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Connection Errors ────────────────────────────────────────
    /// Host name resolution failed.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no usable endpoint.
    #[error("no usable address for {0}")]
    NoEndpoints(String),

    /// Every resolved endpoint refused or timed out.
    #[error("could not connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting an inbound connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The TCP/IO layer reported an error mid-transfer.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A connect attempt exceeded its deadline.
    #[error("connect to {target} timed out after {after:?}")]
    Timeout { target: String, after: Duration },

    // ── Frame Errors ─────────────────────────────────────────────
    /// The transferred frame is shorter or longer than the agreed size.
    #[error("invalid frame length: expected {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// The operation was interrupted by a cancellation request.
    #[error("cancelled")]
    Cancelled,

    /// A relay task panicked or was aborted.
    #[error("relay task failed: {0}")]
    Task(String),
}

impl VstreamError {
    /// Whether the relay loops should record this error and try again.
    ///
    /// Only startup failures and explicit cancellation are terminal.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            VstreamError::Bind { .. }
                | VstreamError::InvalidConfig(_)
                | VstreamError::Cancelled
                | VstreamError::Task(_)
        )
    }
}

impl From<tokio::task::JoinError> for VstreamError {
    fn from(e: tokio::task::JoinError) -> Self {
        VstreamError::Task(e.to_string())
    }
}
