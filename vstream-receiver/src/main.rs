//! vstream receiver: entry point.
//!
//! ```text
//! vstream-receiver                    Pull frames from localhost:3333
//! vstream-receiver --host <h> -p <n>  Pull from another sender
//! vstream-receiver --dump frame.raw   Write the newest frame once per second
//! vstream-receiver --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vstream_receiver::config::ReceiverFileConfig;
use vstream_receiver::service::ReceiverService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vstream-receiver", about = "Receive raw video frames over TCP")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "vstream-receiver.toml")]
    config: PathBuf,

    /// Sender host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Sender port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Raw frame dump path (overrides config).
    #[arg(short, long)]
    dump: Option<PathBuf>,

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

    if cli.gen_config {
        let text = toml::to_string_pretty(&ReceiverFileConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init_config {
        ReceiverFileConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = ReceiverFileConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(dump) = cli.dump {
        config.display.dump_path = dump.to_string_lossy().into_owned();
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("vstream-receiver v{}", env!("CARGO_PKG_VERSION"));
    info!("sender: {}:{}", config.network.host, config.network.port);

    let service = ReceiverService::new(config);
    let cancel = CancellationToken::new();

    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.cancel();
    });

    service.run(cancel).await?;

    Ok(())
}
