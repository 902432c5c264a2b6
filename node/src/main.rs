// Copyright (c) 2026 Community Cash Contributors. MIT License.
// See LICENSE for details.

//! # Community Cash Node
//!
//! Entry point for the `cash-node` binary. Loads the node configuration,
//! deploys or restores the token ledger, and serves it over HTTP until a
//! shutdown signal arrives.
//!
//! - `run`: host the ledger
//! - `init`: write a starter `config.toml`
//! - `version`: print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use cash_ledger::config::LEDGER_VERSION;
use cash_ledger::{Ledger, LedgerSnapshot, SharedLedger};

use cli::{CashNodeCli, Commands};
use config::NodeConfig;
use logging::LogFormat;
use metrics::LedgerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CashNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_config(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Applies command-line overrides on top of the file's `[node]` table.
fn apply_overrides(config: &mut NodeConfig, args: &cli::RunArgs) {
    if let Some(port) = args.rpc_port {
        config.node.rpc_port = port;
    }
    if let Some(port) = args.metrics_port {
        config.node.metrics_port = port;
    }
    if let Some(path) = &args.state_file {
        config.node.state_file = Some(path.clone());
    }
    if let Some(format) = &args.log_format {
        config.node.log_format = format.clone();
    }
    if let Some(filter) = &args.log_filter {
        config.node.log_filter = filter.clone();
    }
}

/// Restores the ledger from `state_file` when it exists, otherwise deploys a
/// fresh one from the `[token]` table.
fn open_ledger(config: &NodeConfig) -> Result<Ledger> {
    if let Some(path) = config.node.state_file.as_deref().filter(|p| p.exists()) {
        let snapshot = LedgerSnapshot::load(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let ledger = Ledger::from_snapshot(snapshot)
            .with_context(|| format!("snapshot {} is not a valid ledger", path.display()))?;
        if ledger.symbol() != config.token.symbol || ledger.decimals() != config.token.decimals {
            tracing::warn!(
                snapshot_symbol = %ledger.symbol(),
                config_symbol = %config.token.symbol,
                "snapshot metadata differs from [token]; the snapshot wins"
            );
        }
        tracing::info!(
            path = %path.display(),
            holders = ledger.holder_count(),
            next_seq = ledger.next_seq(),
            "ledger restored"
        );
        return Ok(ledger);
    }

    config
        .token
        .deploy()
        .context("failed to deploy token ledger")
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    let mut config = NodeConfig::load(&args.config)?;
    apply_overrides(&mut config, &args);

    logging::init_logging(
        &config.node.log_filter,
        LogFormat::from_str_lossy(&config.node.log_format),
    )?;

    tracing::info!(
        config = %args.config.display(),
        rpc_port = config.node.rpc_port,
        metrics_port = config.node.metrics_port,
        "starting cash-node"
    );

    // --- Ledger ---
    let ledger = SharedLedger::new(open_ledger(&config)?);

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState::new(
        format!("{} (ledger {})", env!("CARGO_PKG_VERSION"), LEDGER_VERSION),
        ledger.clone(),
        Arc::clone(&ledger_metrics),
    );
    // The deployment event is still queued on a fresh ledger.
    for record in ledger.flush_events() {
        tracing::info!(seq = record.seq, event = ?record.event, "initial event");
    }

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", config.node.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.node.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(path) = &config.node.state_file {
        ledger
            .snapshot()
            .save(path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    }

    tracing::info!("cash-node stopped");
    Ok(())
}

/// Writes a starter configuration owned by `--deployer`.
fn init_config(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("cash_node=info", LogFormat::Pretty)?;
    write_starter_config(&args.output, NodeConfig::for_deployer(args.deployer), args.force)?;

    println!("Configuration written.");
    println!("  File     : {}", args.output.display());
    println!("  Deployer : {}", args.deployer);
    Ok(())
}

fn write_starter_config(path: &Path, config: NodeConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    let rendered = config.to_toml_string()?;
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "starter config written");
    Ok(())
}

fn print_version() {
    println!("cash-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger    {}", LEDGER_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
