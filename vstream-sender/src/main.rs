//! vstream sender: entry point.
//!
//! ```text
//! vstream-sender                  Serve frames with defaults (port 3333)
//! vstream-sender --config <path>  Load a custom config TOML
//! vstream-sender --port 4000      Override the listen port
//! vstream-sender --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vstream_sender::config::SenderFileConfig;
use vstream_sender::service::SenderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vstream-sender", about = "Serve raw video frames over TCP")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "vstream-sender.toml")]
    config: PathBuf,

    /// Listen port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    init_config: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderFileConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init_config {
        SenderFileConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    // Load config.
    let mut config = SenderFileConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("vstream-sender v{}", env!("CARGO_PKG_VERSION"));
    info!("listen: {}:{}", config.network.bind_address, config.network.port);
    info!(
        "frame: {}x{} {:?} ({} bytes)",
        config.frame.width,
        config.frame.height,
        config.frame.pixel_format,
        config.frame.frame_size()
    );

    let service = SenderService::new(config);
    let cancel = CancellationToken::new();

    // Ctrl-C handler.
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run(cancel).await?;

    Ok(())
}
