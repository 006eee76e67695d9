//! # vstream-core
//!
//! Relay library for streaming fixed-size raw video frames over plain
//! TCP, one frame per connection.
//!
//! ```text
//! capture ─► FrameQueue ─► FrameSender ──TCP──► FrameReceiver ─► FrameQueue ─► render
//! ```
//!
//! This crate contains:
//! - **Frame** (`Frame`, `FrameFormat`, `PixelFormat`): immutable frame buffers and size agreement
//! - **Queue** (`FrameQueue`): non-blocking FIFO handoff between a host thread and a network task
//! - **Sender** (`FrameSender`): accepts one connection per queued frame and writes it in full
//! - **Receiver** (`FrameReceiver`): reconnecting client that reads each frame to end-of-stream
//! - **Status** (`StatusReporter` / `StatusWatcher`): atomically published link status
//! - **Stats** (`ThroughputMeter`, `RelayStats`): fps and bytes/second accounting
//! - **Task** (`RelayTask`, `RelayThread`): cancellable owners for the relay loops
//! - **Error** (`VstreamError`): typed, `thiserror`-based error hierarchy

pub mod error;
pub mod frame;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod status;
pub mod task;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::VstreamError;
pub use frame::{Frame, FrameFormat, PixelFormat, validate_frame_size};
pub use queue::{DEFAULT_FRAME_QUEUE_CAPACITY, FrameQueue};
pub use receiver::{FrameReceiver, LengthPolicy, ReceiverConfig};
pub use sender::{DEFAULT_PORT, FrameSender, SenderConfig};
pub use stats::{RelayStats, ThroughputMeter};
pub use status::{Status, StatusReporter, StatusWatcher};
pub use task::{RelayTask, RelayThread};

pub use tokio_util::sync::CancellationToken;
