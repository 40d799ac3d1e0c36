//! Manifold CLI — expose one stdio MCP server to many WebSocket clients.
//!
//! ```text
//! manifold --port 8000 --stdio npx -y @modelcontextprotocol/server-filesystem /data
//! ```
//!
//! Everything after `--stdio` is the subprocess argv, so `--port` must
//! come first. The `PORT` environment variable overrides `--port`.

use anyhow::{Context, Result};
use clap::Parser;
use manifold_gateway::{Gateway, GatewayConfig, config};

#[derive(Parser)]
#[command(
    name = "manifold",
    version,
    about = "Expose a stdio MCP server to WebSocket clients"
)]
struct Cli {
    /// WebSocket listener port (health checks are served on port + 1)
    #[arg(long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Command that launches the MCP server; everything after --stdio is
    /// passed to the subprocess
    #[arg(
        long,
        required = true,
        num_args = 1..,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    stdio: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let port = config::resolve_port(cli.port, std::env::var("PORT").ok().as_deref());
    let gateway_config = GatewayConfig::new(port, cli.stdio);

    let gateway = Gateway::start(gateway_config)
        .await
        .context("failed to start gateway")?;
    tracing::info!("WebSocket endpoint: ws://localhost:{}", gateway.port);
    tracing::info!(
        "health endpoint: http://localhost:{}/health",
        gateway.health_port
    );

    gateway.run(shutdown_signal()).await?;
    tracing::info!("shut down cleanly");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
