//! tempod — run an axum server behind a self-tuning admission gate.
//!
//! # Usage
//!
//! ```text
//! tempod serve --port 8080 --target-latency-ms 20 --initial-capacity 200
//! tempod serve --config /etc/tempo/tempod.toml
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tempo_gate::{Throttle, ThrottleSettings};
use tempod::{build_router, DaemonConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "tempod", about = "Tempo admission-control demo daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the demo workload behind the throttle.
    Serve {
        /// TOML config file with `[server]` and `[throttle]` tables.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        #[command(flatten)]
        throttle: ThrottleArgs,
    },
}

/// Throttle overrides. Zero or negative values fall back to defaults.
#[derive(Args)]
struct ThrottleArgs {
    /// Target average request duration in milliseconds.
    #[arg(long, allow_negative_numbers = true)]
    target_latency_ms: Option<i64>,

    /// Tuning interval in milliseconds.
    #[arg(long, allow_negative_numbers = true)]
    sample_interval_ms: Option<i64>,

    /// Capacity before the first tuning cycle.
    #[arg(long, allow_negative_numbers = true)]
    initial_capacity: Option<i64>,

    /// Upper bound for the tuned capacity.
    #[arg(long, allow_negative_numbers = true)]
    max_capacity: Option<i64>,
}

impl From<ThrottleArgs> for ThrottleSettings {
    fn from(args: ThrottleArgs) -> Self {
        ThrottleSettings {
            target_latency_ms: args.target_latency_ms,
            sample_interval_ms: args.sample_interval_ms,
            initial_capacity: args.initial_capacity,
            max_capacity: args.max_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tempod=debug,tempo_gate=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            throttle,
        } => {
            let mut daemon = DaemonConfig::load(config.as_deref())?;
            if let Some(port) = port {
                daemon.server.port = port;
            }
            daemon.throttle = daemon.throttle.merge(throttle.into());
            serve(daemon).await
        }
    }
}

async fn serve(daemon: DaemonConfig) -> anyhow::Result<()> {
    let config = daemon.throttle.into_config();
    let (throttle, tuner) = Throttle::start(config);
    info!(
        target_ms = config.target_latency.as_millis() as u64,
        interval_ms = config.sample_interval.as_millis() as u64,
        initial_capacity = config.initial_capacity,
        max_capacity = config.max_capacity,
        "throttle started"
    );

    let addr = daemon.server.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "tempod listening");

    axum::serve(listener, build_router(throttle))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    tuner.shutdown().await;
    info!("tempod stopped");
    Ok(())
}
