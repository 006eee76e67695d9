//! Sender service: test-pattern source feeding a [`FrameSender`].
//!
//! The source renders frames at the configured rate and pushes them
//! into a bounded queue; the sender task serves them to whichever
//! receiver connects. Once per second the service logs the sender's
//! status and throughput.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vstream_core::{
    Frame, FrameQueue, FrameSender, RelayStats, RelayTask, StatusReporter, StatusWatcher,
};

use crate::config::SenderFileConfig;
use crate::source::TestPattern;

// ── SenderService ────────────────────────────────────────────────

/// The top-level sender service.
pub struct SenderService {
    config: SenderFileConfig,
    status: StatusReporter,
}

impl SenderService {
    pub fn new(config: SenderFileConfig) -> Self {
        Self {
            config,
            status: StatusReporter::new(),
        }
    }

    /// A read handle on the sender's status.
    pub fn status(&self) -> StatusWatcher {
        self.status.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// 1. Binds the listener (an error here is returned to the caller).
    /// 2. Spawns the sender loop.
    /// 3. Renders test-pattern frames into the queue at the target rate.
    /// 4. On cancellation, stops the sender and waits for it.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
        let sender_config = self.config.to_sender_config()?;
        let queue: Arc<FrameQueue<Frame>> =
            Arc::new(FrameQueue::bounded(self.config.queue_capacity()));

        let sender = FrameSender::bind(&sender_config, Arc::clone(&queue), self.status.clone()).await?;
        let stats = sender.stats_receiver();
        let relay = RelayTask::spawn_sender(sender, cancel.child_token());

        let fmt = self.config.frame.format();
        if fmt.frame_size() != sender_config.frame_size {
            warn!(
                "frame_size override ({}) does not match {}x{} {:?}; generated frames will be rejected",
                sender_config.frame_size, fmt.width, fmt.height, fmt.pixel_format
            );
        }
        let mut pattern = TestPattern::new(fmt);
        let fps = self.config.source.fps.clamp(1, 240);
        let frame_interval = Duration::from_secs_f64(1.0 / fps as f64);
        let mut report = tokio::time::interval(Duration::from_secs(1));

        info!("generating {}x{} {:?} frames at {fps} fps", fmt.width, fmt.height, fmt.pixel_format);

        'frames: loop {
            let deadline = Self::next_deadline(Instant::now(), frame_interval);
            queue.push(pattern.next_frame());

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break 'frames,
                    _ = report.tick() => self.report(&stats, &queue),
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }
        }

        info!("stopping sender after {} frames", pattern.frame_number());
        relay.shutdown().await?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────

    fn report(&self, stats: &watch::Receiver<RelayStats>, queue: &FrameQueue<Frame>) {
        let s = *stats.borrow();
        info!(
            "{} {:.1} fps, {} kB/s, {} frames sent, {} dropped",
            self.status.current(),
            s.fps,
            s.bytes_per_sec / 1000,
            s.total_frames,
            queue.dropped()
        );
    }

    /// When the next frame is due.
    fn next_deadline(loop_start: Instant, interval: Duration) -> tokio::time::Instant {
        tokio::time::Instant::from_std(loop_start + interval)
    }
}

// ── Tests ────────────────────────────────────────────────────────
