//! Throughput accounting for delivered frames.
//!
//! [`ThroughputMeter`] keeps `(timestamp, bytes)` samples over a rolling
//! window and derives frames per second and bytes per second from them.
//! The sender and receiver publish a [`RelayStats`] snapshot after every
//! frame so the host can render an "N fps, M kB/s" line.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Snapshot of relay throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RelayStats {
    /// Frames transferred since start.
    pub total_frames: u64,
    /// Payload bytes transferred since start.
    pub total_bytes: u64,
    /// Frames per second over the rolling window.
    pub fps: f64,
    /// Bytes per second over the rolling window.
    pub bytes_per_sec: u64,
}

/// Rolling-window frame and byte counter.
#[derive(Debug)]
pub struct ThroughputMeter {
    /// Samples: `(when, bytes)`.
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    /// Bytes currently inside the window.
    window_bytes: u64,
    total_frames: u64,
    total_bytes: u64,
}

impl ThroughputMeter {
    /// A meter with a 1-second rolling window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(128),
            window,
            window_bytes: 0,
            total_frames: 0,
            total_bytes: 0,
        }
    }

    /// Record one frame of `bytes` transferred now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    /// Record with an explicit timestamp (useful for testing).
    pub fn record_at(&mut self, when: Instant, bytes: u64) {
        self.samples.push_back((when, bytes));
        self.window_bytes += bytes;
        self.total_frames += 1;
        self.total_bytes += bytes;
        self.evict(when);
    }

    /// Frames per second over the window.
    ///
    /// Measured between the first and last sample, so a single sample
    /// yields zero.
    pub fn fps(&self) -> f64 {
        let span = self.span();
        if self.samples.len() < 2 || span.is_zero() {
            return 0.0;
        }
        (self.samples.len() - 1) as f64 / span.as_secs_f64()
    }

    /// Bytes per second over the window.
    pub fn bytes_per_sec(&self) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let span = self.span();
        let secs = if span.is_zero() {
            Duration::from_millis(1).as_secs_f64()
        } else {
            span.as_secs_f64()
        };
        (self.window_bytes as f64 / secs) as u64
    }

    pub fn snapshot(&self) -> RelayStats {
        RelayStats {
            total_frames: self.total_frames,
            total_bytes: self.total_bytes,
            fps: self.fps(),
            bytes_per_sec: self.bytes_per_sec(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────

    fn span(&self) -> Duration {
        match (self.samples.front(), self.samples.back()) {
            (Some((first, _)), Some((last, _))) => last.duration_since(*first),
            _ => Duration::ZERO,
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(ts, bytes)) = self.samples.front() {
            if now.duration_since(ts) > self.window {
                self.samples.pop_front();
                self.window_bytes = self.window_bytes.saturating_sub(bytes);
            } else {
                break;
            }
        }
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_meter_returns_zero() {
        let meter = ThroughputMeter::new();
        assert_eq!(meter.bytes_per_sec(), 0);
        assert_eq!(meter.fps(), 0.0);
        assert_eq!(meter.snapshot(), RelayStats::default());
    }

    #[test]
    fn thirty_frames_per_second() {
        let mut meter = ThroughputMeter::with_window(Duration::from_secs(5));
        let t0 = Instant::now();
        for i in 0..31u64 {
            meter.record_at(t0 + Duration::from_millis(i * 1000 / 30), 1000);
        }
        let fps = meter.fps();
        assert!((29.0..=31.5).contains(&fps), "fps = {fps}");
        assert_eq!(meter.snapshot().total_frames, 31);
        assert_eq!(meter.snapshot().total_bytes, 31_000);
    }

    #[test]
    fn two_samples_one_second_apart() {
        let mut meter = ThroughputMeter::with_window(Duration::from_secs(5));
        let t0 = Instant::now();
        meter.record_at(t0, 1_000_000);
        meter.record_at(t0 + Duration::from_secs(1), 1_000_000);
        let bps = meter.bytes_per_sec();
        assert!((1_900_000..=2_100_000).contains(&bps), "bps = {bps}");
    }

    #[test]
    fn evicts_old_samples_but_keeps_totals() {
        let mut meter = ThroughputMeter::with_window(Duration::from_millis(500));
        let t0 = Instant::now();
        meter.record_at(t0, 1000);
        meter.record_at(t0 + Duration::from_secs(1), 500);
        // Only the newest sample is left, so there is no span to measure.
        assert_eq!(meter.fps(), 0.0);
        let stats = meter.snapshot();
        assert_eq!(stats.total_frames, 2);
        assert_eq!(stats.total_bytes, 1500);
    }
}
