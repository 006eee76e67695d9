//! Configuration for the vstream sender.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use vstream_core::{FrameFormat, PixelFormat, SenderConfig, VstreamError};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SenderFileConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Frame geometry shared with the receiver.
    pub frame: FrameConfig,
    /// Test-pattern source settings.
    pub source: SourceConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to listen on.
    pub bind_address: String,
    /// TCP port receivers connect to.
    pub port: u16,
    /// Listen backlog.
    pub backlog: u32,
    /// Frames held before the oldest is dropped.
    pub queue_capacity: usize,
}

/// Frame geometry. Must match the receiver exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    /// "rgb8", "rgba8", "bgra8" or "gray8".
    pub pixel_format: PixelFormat,
    /// Explicit byte size; 0 derives it from the geometry.
    pub frame_size: usize,
}

/// Synthetic frame source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Frames generated per second.
    pub fps: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: vstream_core::DEFAULT_PORT,
            backlog: 16,
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
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { fps: 30 }
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

    /// The agreed frame size: the explicit override, else the geometry.
    pub fn frame_size(&self) -> usize {
        if self.frame_size > 0 {
            self.frame_size
        } else {
            self.format().frame_size()
        }
    }
}

impl SenderFileConfig {
    /// Load configuration from a TOML file, falling back to defaults.
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

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Convert network and frame settings into a core `SenderConfig`.
    pub fn to_sender_config(&self) -> Result<SenderConfig, VstreamError> {
        let ip: IpAddr = self.network.bind_address.parse().map_err(|e| {
            VstreamError::InvalidConfig(format!(
                "bind_address {:?}: {e}",
                self.network.bind_address
            ))
        })?;
        Ok(SenderConfig {
            bind_addr: SocketAddr::new(ip, self.network.port),
            frame_size: self.frame.frame_size(),
            backlog: self.network.backlog.max(1),
        })
    }

    pub fn queue_capacity(&self) -> usize {
        self.network.queue_capacity.max(1)
    }
}

// ── Tests ────────────────────────────────────────────────────────
