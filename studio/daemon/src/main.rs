//! novel-studio - Generation Daemon
//!
//! Serves the novel-studio generation endpoints over HTTP, proxying to an
//! OpenAI-compatible completion API.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (reads ~/.config/novel-studio/studio.toml)
//! DEEPSEEK_API_KEY=sk-... novel-studio
//!
//! # Custom listen address and upstream
//! novel-studio --bind 0.0.0.0:8080 --base-url http://localhost:8000/v1
//!
//! # Verbose logging
//! RUST_LOG=debug novel-studio
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use studio_core::{
    default_config_path, load_config_from_path, ConfigOverrides, NovelGenerator,
    OpenAiCompatibleBackend,
};
use studio_daemon::{run_server, AppState};

/// novel-studio - AI novel generation daemon
#[derive(Parser, Debug)]
#[command(name = "novel-studio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "STUDIO_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'b', long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Completion API root
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Model for structure and outline generation
    #[arg(long, value_name = "MODEL")]
    chat_model: Option<String>,

    /// Model for chapter text
    #[arg(long, value_name = "MODEL")]
    reasoner_model: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STUDIO_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_addr: self.bind,
            base_url: self.base_url.clone(),
            chat_model: self.chat_model.clone(),
            reasoner_model: self.reasoner_model.clone(),
        }
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "studio_daemon={level},studio_core={level},novel_studio={level},tower_http={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating shutdown"),
        () = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("novel-studio starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        base_url = %config.upstream.base_url,
        chat_model = %config.upstream.chat_model,
        reasoner_model = %config.upstream.reasoner_model,
        "Configuration loaded"
    );

    let backend = OpenAiCompatibleBackend::from_config(&config.upstream)
        .context("Failed to create completion backend")?;
    let generator =
        NovelGenerator::new(Arc::new(backend), config.upstream.generation_settings());

    let result = run_server(AppState::new(generator), config.bind_addr, shutdown_signal()).await;

    match result {
        Ok(()) => {
            info!("novel-studio stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "novel-studio stopped with error");
            Err(e)
        }
    }
}
