//! hostscaled: host-group scaler for the storage cluster.
//!
//! # Usage
//!
//! ```text
//! hostscaled tick --input group.json
//! hostscaled plan --input - < group.json
//! hostscaled --config /etc/hostscale.toml serve --port 8080
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use hostscale_engine::Scaler;
use hostscaled::api::{AppState, build_router};
use hostscaled::{ConnectorFactory, HttpConnectorFactory, load_config, read_group};

#[derive(Parser)]
#[command(name = "hostscaled", about = "Storage cluster host-group scaler")]
struct Cli {
    /// TOML config file. Defaults to ./hostscale.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single scale tick and print the response.
    Tick {
        /// HostGroupInfo JSON document, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Print what a tick would do without changing the cluster.
    Plan {
        /// HostGroupInfo JSON document, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
    /// Serve the scale endpoint over HTTP.
    Serve {
        /// Port to listen on. Overrides `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hostscale=debug,hostscaled=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let scaler = Scaler::new(config.thresholds()?);
    let connectors = HttpConnectorFactory::from_config(&config)?;

    match cli.command {
        Command::Tick { input } => {
            let group = read_group(&input)?;
            let connector = connectors.connector_for(&group);
            let response = scaler
                .tick(&group, connector, &mut StdRng::from_entropy(), Utc::now())
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Plan { input } => {
            let group = read_group(&input)?;
            let connector = connectors.connector_for(&group);
            let report = scaler
                .plan(&group, connector, &mut StdRng::from_entropy(), Utc::now())
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Serve { port } => {
            serve(port.unwrap_or(config.server.port), AppState::new(scaler, connectors)).await
        }
    }
}

async fn serve(port: u16, state: AppState<HttpConnectorFactory>) -> anyhow::Result<()> {
    let router = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "scale endpoint starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("hostscaled stopped");
    Ok(())
}
