//! Frame sink: the display side of the receiver.
//!
//! Stands in for a renderer. Each display tick takes at most one frame
//! from the receive queue, keeps it as the current surface and refreshes
//! the status line shown to the user.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use vstream_core::{Frame, FrameQueue, StatusWatcher, ThroughputMeter};

pub struct FrameSink {
    queue: Arc<FrameQueue<Frame>>,
    status: StatusWatcher,
    surface: Option<Frame>,
    /// Counts display ticks, not received frames.
    ticks: ThroughputMeter,
    frames_shown: u64,
    status_line: String,
}

impl FrameSink {
    pub fn new(queue: Arc<FrameQueue<Frame>>, status: StatusWatcher) -> Self {
        Self {
            queue,
            status,
            surface: None,
            ticks: ThroughputMeter::new(),
            frames_shown: 0,
            status_line: "Starting".into(),
        }
    }

    /// One display tick. Returns `true` if a new frame replaced the
    /// surface.
    pub fn update(&mut self) -> bool {
        self.ticks.record(0);
        let fresh = match self.queue.try_pop() {
            Some(frame) => {
                self.surface = Some(frame);
                self.frames_shown += 1;
                true
            }
            None => false,
        };
        self.status_line = format!(
            "Client: {} fps: {}",
            self.ticks.fps() as u64,
            self.status.current()
        );
        fresh
    }

    /// The frame currently on screen.
    pub fn surface(&self) -> Option<&Frame> {
        self.surface.as_ref()
    }

    /// How long ago the frame on screen was completed by the receiver.
    pub fn surface_age(&self) -> Option<Duration> {
        self.surface.as_ref().map(|frame| frame.timestamp().elapsed())
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    /// `"Client: <fps> fps: <receiver status>"`, as of the last update.
    pub fn status_line(&self) -> &str {
        &self.status_line
    }

    /// Write the current surface to `path` as raw bytes.
    ///
    /// Returns `false` without touching the file if nothing has been
    /// shown yet.
    pub async fn dump(&self, path: &Path) -> std::io::Result<bool> {
        match &self.surface {
            Some(frame) => {
                tokio::fs::write(path, frame.as_bytes()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
