//! Receiver service: a [`FrameReceiver`] feeding a [`FrameSink`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vstream_core::{
    Frame, FrameQueue, FrameReceiver, RelayStats, RelayTask, StatusReporter, StatusWatcher,
};

use crate::config::ReceiverFileConfig;
use crate::sink::FrameSink;

// ── ReceiverService ──────────────────────────────────────────────

/// The top-level receiver service.
pub struct ReceiverService {
    config: ReceiverFileConfig,
    status: StatusReporter,
}

impl ReceiverService {
    pub fn new(config: ReceiverFileConfig) -> Self {
        Self {
            config,
            status: StatusReporter::new(),
        }
    }

    /// A read handle on the receiver's status.
    pub fn status(&self) -> StatusWatcher {
        self.status.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// The receive loop runs as its own task; this task drives the sink
    /// at the display rate and logs the status line once per second.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let receiver_config = self.config.to_receiver_config()?;
        let queue: Arc<FrameQueue<Frame>> =
            Arc::new(FrameQueue::bounded(self.config.queue_capacity()));

        let receiver = FrameReceiver::new(receiver_config, Arc::clone(&queue), self.status.clone())?;
        let stats = receiver.stats_receiver();
        let relay = RelayTask::spawn_receiver(receiver, cancel.child_token());

        let mut sink = FrameSink::new(Arc::clone(&queue), self.status.subscribe());
        let dump_path = self.config.display.dump_path();

        let fps = self.config.display.fps.clamp(1, 240);
        let mut display = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        display.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut report = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = display.tick() => {
                    sink.update();
                }
                _ = report.tick() => {
                    self.report(&sink, &stats, &queue);
                    if let Some(path) = &dump_path {
                        if let Err(e) = sink.dump(path).await {
                            warn!("failed to dump frame to {}: {e}", path.display());
                        }
                    }
                }
            }
        }

        info!("stopping receiver after {} frames shown", sink.frames_shown());
        relay.shutdown().await?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    fn report(&self, sink: &FrameSink, stats: &watch::Receiver<RelayStats>, queue: &FrameQueue<Frame>) {
        let s = *stats.borrow();
        let age = sink
            .surface_age()
            .map(|age| format!("{} ms", age.as_millis()))
            .unwrap_or_else(|| "-".into());
        info!(
            "{} | {:.1} frames/s in, {} kB/s, {} received, {} dropped, frame age {age}",
            sink.status_line(),
            s.fps,
            s.bytes_per_sec / 1000,
            s.total_frames,
            queue.dropped()
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────
