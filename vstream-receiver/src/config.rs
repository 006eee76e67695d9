//! Configuration for the vstream receiver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vstream_core::{FrameFormat, LengthPolicy, PixelFormat, ReceiverConfig, VstreamError};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReceiverFileConfig {
    /// Where the sender lives.
    pub network: NetworkConfig,
    /// Frame geometry shared with the sender.
    pub frame: FrameConfig,
    /// Display loop settings.
    pub display: DisplayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Sender host name or IP address.
    pub host: String,
    /// Sender TCP port.
    pub port: u16,
    /// Ignore IPv6 results when resolving `host`.
    pub ipv4_only: bool,
    /// Per-endpoint connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Pause between failed attempts in milliseconds (0 = none).
    pub retry_delay_ms: u64,
    /// Frames held before the oldest is dropped.
    pub queue_capacity: usize,
}

/// Frame geometry. Must match the sender exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Explicit byte size; 0 derives it from the geometry.
    pub frame_size: usize,
    /// "strict" drops transfers of the wrong length, "lenient" keeps them.
    pub length_policy: LengthPolicy,
}

/// Display loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display updates per second.
    pub fps: u32,
    /// Write the newest frame here once per second. Empty disables.
    pub dump_path: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: vstream_core::DEFAULT_PORT,
            ipv4_only: true,
            connect_timeout_ms: 5000,
            retry_delay_ms: 0,
            queue_capacity: vstream_core::DEFAULT_FRAME_QUEUE_CAPACITY,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        let fmt = FrameFormat::default();
        Self {
            width: fmt.width,
            height: fmt.height,
            pixel_format: fmt.pixel_format,
            frame_size: 0,
            length_policy: LengthPolicy::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            dump_path: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl FrameConfig {
    pub fn format(&self) -> FrameFormat {
        FrameFormat::new(self.width, self.height, self.pixel_format)
    }

    pub fn frame_size(&self) -> usize {
        if self.frame_size > 0 {
            self.frame_size
        } else {
            self.format().frame_size()
        }
    }
}

impl DisplayConfig {
    pub fn dump_path(&self) -> Option<PathBuf> {
        if self.dump_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.dump_path))
        }
    }
}

impl ReceiverFileConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Convert network and frame settings into a core `ReceiverConfig`.
    pub fn to_receiver_config(&self) -> Result<ReceiverConfig, VstreamError> {
        if self.network.host.trim().is_empty() {
            return Err(VstreamError::InvalidConfig("network.host is empty".into()));
        }
        Ok(ReceiverConfig {
            host: self.network.host.clone(),
            port: self.network.port,
            frame_size: self.frame.frame_size(),
            ipv4_only: self.network.ipv4_only,
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms.max(1)),
            retry_delay: Duration::from_millis(self.network.retry_delay_ms),
            length_policy: self.frame.length_policy,
        })
    }

    pub fn queue_capacity(&self) -> usize {
        self.network.queue_capacity.max(1)
    }
}

// ── Tests ────────────────────────────────────────────────────────
