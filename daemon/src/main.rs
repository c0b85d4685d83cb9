//! Blaze daemon: entry point for running the subnet service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use blaze_node::{
    init_logging, spawn_sweeper, BlazeService, LogFormat, NodeConfig, ShutdownController,
};
use blaze_rpc::{RpcServer, RpcState};
use blaze_types::NetworkId;
use clap::Parser;

#[derive(Parser)]
#[command(name = "blaze-daemon", about = "Blaze subnet transfer service")]
struct Cli {
    /// Network to sign and broadcast for: "mainnet" or "testnet".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "BLAZE_NETWORK", global = true)]
    network: Option<String>,

    /// Address the HTTP API binds to.
    #[arg(long, env = "BLAZE_LISTEN_ADDR", global = true)]
    listen: Option<String>,

    /// REST endpoint of the shared key-value store.
    #[arg(long, env = "KV_REST_API_URL", global = true)]
    kv_url: Option<String>,

    #[arg(long, env = "KV_REST_API_TOKEN", hide_env_values = true, global = true)]
    kv_token: Option<String>,

    /// Hex-encoded service signing key.
    #[arg(long, env = "BLAZE_PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    #[arg(long, env = "STACKS_API_URL", global = true)]
    stacks_api_url: Option<String>,

    #[arg(long, env = "STACKS_API_KEY", hide_env_values = true, global = true)]
    stacks_api_key: Option<String>,

    /// Secret chainhook deliveries and manual sweeps must present.
    #[arg(long, env = "BLAZE_EVENTS_SECRET", hide_env_values = true, global = true)]
    events_secret: Option<String>,

    /// Drain a queue during intake once it holds a full batch.
    #[arg(long, env = "BLAZE_AUTO_PROCESS", global = true)]
    auto_process: bool,

    /// Seconds between background queue sweeps; 0 disables the sweeper.
    #[arg(long, env = "BLAZE_SWEEP_INTERVAL_SECS", global = true)]
    sweep_interval: Option<u64>,

    /// Disable the Prometheus `/metrics` endpoint.
    #[arg(long, env = "BLAZE_DISABLE_METRICS", global = true)]
    disable_metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "BLAZE_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BLAZE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "BLAZE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP API (and the sweeper when an interval is set).
    Serve,
    /// Drain every ready queue once and print the report.
    Process {
        /// Also drain short batches that meet the minimum batch size.
        #[arg(long)]
        flush: bool,
    },
    /// Print the service principal derived from the signing key.
    Address,
    /// Print the effective configuration (secrets omitted).
    Config,
}

/// Load the file config (if any) and layer CLI/env values over it.
fn resolve_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path).with_context(|| format!("loading {path}"))?
        }
        None => NodeConfig::default(),
    };

    if let Some(network) = &cli.network {
        config.network = network
            .parse::<NetworkId>()
            .map_err(|e| anyhow::anyhow!("invalid network {network:?}: {e}"))?;
    }
    if let Some(listen) = &cli.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(url) = &cli.kv_url {
        config.kv_url = url.clone();
    }
    if let Some(token) = &cli.kv_token {
        config.kv_token = token.clone();
    }
    if cli.private_key.is_some() {
        config.private_key = cli.private_key.clone();
    }
    if cli.stacks_api_url.is_some() {
        config.stacks_api_url = cli.stacks_api_url.clone();
    }
    if cli.stacks_api_key.is_some() {
        config.stacks_api_key = cli.stacks_api_key.clone();
    }
    if cli.events_secret.is_some() {
        config.events_secret = cli.events_secret.clone();
    }
    config.auto_process |= cli.auto_process;
    if let Some(secs) = cli.sweep_interval {
        config.sweep_interval_secs = secs;
    }
    config.enable_metrics &= !cli.disable_metrics;
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

async fn serve(config: NodeConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen_addr {:?}", config.listen_addr))?;
    let service = Arc::new(BlazeService::from_config(&config)?);
    if config.events_secret.is_none() {
        tracing::warn!("events_secret is not set; chainhook deliveries and manual sweeps will be refused");
    }

    let shutdown = ShutdownController::new();
    let sweeper = (config.sweep_interval_secs > 0).then(|| {
        spawn_sweeper(
            service.clone(),
            Duration::from_secs(config.sweep_interval_secs),
            shutdown.subscribe(),
        )
    });
    let mut server_shutdown = shutdown.subscribe();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.wait_for_signal().await });

    tracing::info!(
        network = config.network.as_str(),
        %addr,
        auto_process = config.auto_process,
        sweep_interval_secs = config.sweep_interval_secs,
        "starting Blaze service"
    );
    let state = RpcState::new(service, config.events_secret.clone());
    let result = RpcServer::new(addr, state, config.enable_metrics)
        .serve_with_shutdown(async move {
            let _ = server_shutdown.recv().await;
        })
        .await;

    // Stop the sweeper even when the server failed to start.
    shutdown.shutdown();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "sweeper task ended abnormally");
        }
    }
    result.context("HTTP server failed")?;
    tracing::info!("Blaze daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);

    match cli.command {
        Command::Serve => serve(config).await?,
        Command::Process { flush } => {
            let service = BlazeService::from_config(&config)?;
            let report = if flush {
                service.flush_all_queues().await?
            } else {
                service.process_all_queues().await?
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Address => {
            let signing = config.signing_config()?;
            println!("{}", signing.principal());
        }
        Command::Config => print!("{}", config.to_toml_string()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("blaze-daemon").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--network",
            "testnet",
            "--listen",
            "127.0.0.1:4000",
            "--auto-process",
            "--sweep-interval",
            "30",
            "serve",
        ]);
        let config = resolve_config(&cli).expect("resolves");
        assert_eq!(config.network, NetworkId::Testnet);
        assert_eq!(config.listen_addr, "127.0.0.1:4000");
        assert!(config.auto_process);
        assert_eq!(config.sweep_interval_secs, 30);
        assert!(config.enable_metrics);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&["process", "--flush", "--disable-metrics"]);
        assert!(matches!(cli.command, Command::Process { flush: true }));
        let config = resolve_config(&cli).expect("resolves");
        assert!(!config.enable_metrics);
    }

    #[test]
    fn unknown_network_is_rejected() {
        let cli = parse(&["--network", "moonnet", "config"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/blaze.toml", "serve"]);
        assert!(resolve_config(&cli).is_err());
    }
}
