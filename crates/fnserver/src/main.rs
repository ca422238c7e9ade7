use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fnserver_core::Server;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod functions;
mod transport;

use config::{FnServerConfig, LogFormat};

#[derive(Parser)]
#[command(
    name = "fn-server",
    about = "Composition function server that routes each call to a named server function"
)]
struct Cli {
    /// Path to a config file (default: ./fnserver.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long, env = "FNSERVER_ADDRESS")]
    address: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Log output format, overriding the config file
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) =
        FnServerConfig::discover(cli.config.as_deref()).context("Failed to load config")?;

    // Logs go to stderr. FNSERVER_LOG takes precedence over --debug and the config
    let level = if cli.debug { "debug" } else { config.log.level.as_str() };
    let filter = EnvFilter::try_from_env("FNSERVER_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match cli.log_format.unwrap_or(config.log.format) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    if let Some(path) = &source {
        tracing::debug!(path = %path.display(), "Loaded config");
    }

    let server = Arc::new(Server::new(functions::all()));
    let address = cli.address.unwrap_or(config.server.address);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to listen on {address}"))?;

    tracing::info!(
        address = %listener.local_addr()?,
        functions = ?server.registry().names(),
        "Starting function server"
    );

    transport::serve(listener, server)
        .await
        .context("Function server failed")?;

    tracing::info!("Function server stopped");
    Ok(())
}
