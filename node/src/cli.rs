//! # CLI Interface
//!
//! Defines the command-line argument structure for `cash-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cash_ledger::Address;

/// Community Cash development node.
///
/// Deploys (or restores) a single token ledger and serves it over REST,
/// JSON-RPC and WebSocket, with Prometheus metrics on a side port.
#[derive(Parser, Debug)]
#[command(
    name = "cash-node",
    about = "Community Cash development node",
    version,
    propagate_version = true
)]
pub struct CashNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Write a starter configuration file.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand. Flags override the config file.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (TOML).
    #[arg(long, short = 'c', env = "CASH_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Port for the REST / JSON-RPC API.
    #[arg(long, env = "CASH_RPC_PORT")]
    pub rpc_port: Option<u16>,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CASH_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Snapshot file to restore from on start and write on shutdown.
    #[arg(long, env = "CASH_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "CASH_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// `tracing` filter directives, e.g. `cash_ledger=debug`.
    #[arg(long, env = "CASH_LOG_FILTER")]
    pub log_filter: Option<String>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Account that receives the entire initial supply.
    #[arg(long, env = "CASH_DEPLOYER")]
    pub deployer: Address,

    /// Where to write the configuration.
    #[arg(long, short = 'o', default_value = "config.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        CashNodeCli::command().debug_assert();
    }

    #[test]
    fn init_parses_deployer_address() {
        let cli = CashNodeCli::try_parse_from([
            "cash-node",
            "init",
            "--deployer",
            "0x00000000000000000000000000000000000000a1",
        ])
        .unwrap();
        match cli.command {
            Commands::Init(args) => {
                assert_eq!(
                    args.deployer,
                    "0x00000000000000000000000000000000000000a1".parse().unwrap()
                );
                assert_eq!(args.output, PathBuf::from("config.toml"));
                assert!(!args.force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn init_rejects_malformed_deployer() {
        assert!(CashNodeCli::try_parse_from(["cash-node", "init", "--deployer", "0x12"]).is_err());
    }
}
