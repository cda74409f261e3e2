use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tracing::{error, info};

use caretwin_bridge::standalone::{LogTopicRegistry, LogTransport, SeedBroker, SeedDirectory};
use caretwin_bridge::{Bridge, observability};
use caretwin_config::BridgeConfig;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From CARETWIN_CONFIG environment variable
    EnvironmentVariable,
    /// Defaults (no caretwin.toml present)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (CARETWIN_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present; its absence is not an error.
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let (config_path, source) = resolve_config_path();
    let cfg = match BridgeConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    observability::init_tracing(&cfg.logging.level);
    info!(
        path = %config_path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
        source = %source,
        "Configuration loaded"
    );

    let bridge = match Bridge::builder(cfg)
        .with_directory(Arc::new(SeedDirectory::empty()))
        .with_resource_broker(Arc::new(SeedBroker::empty()))
        .with_transport(Arc::new(LogTransport))
        .with_topic_registry(Arc::new(LogTopicRegistry))
        .build()
    {
        Ok(bridge) => bridge,
        Err(e) => {
            eprintln!("Bridge initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&bridge).await {
        error!(error = %err, "Bridge error");
    }
    bridge.shutdown();
}

/// Standalone ingest loop: one protocol event per stdin line.
async fn run(bridge: &Bridge) -> anyhow::Result<()> {
    info!("Reading protocol events from stdin (one JSON event per line)");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => {
                        let uow = bridge.ingest(line.as_bytes()).await;
                        info!(uow = %uow.id(), outcome = ?uow.outcome(), "Ingested event");
                    }
                    None => {
                        info!("Input closed, stopping");
                        return Ok(());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping");
                return Ok(());
            }
        }
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: CARETWIN_CONFIG
/// 3. caretwin.toml in the working directory, when present
fn resolve_config_path() -> (Option<PathBuf>, ConfigSource) {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (Some(PathBuf::from(path)), ConfigSource::CliArgument);
            }
        }
    }
    if let Ok(path) = std::env::var("CARETWIN_CONFIG") {
        return (Some(PathBuf::from(path)), ConfigSource::EnvironmentVariable);
    }
    let default = PathBuf::from("caretwin.toml");
    if default.exists() {
        (Some(default), ConfigSource::Default)
    } else {
        (None, ConfigSource::Default)
    }
}
