//! # Node Configuration
//!
//! The node reads one TOML file with two tables: `[token]`, the deployment
//! parameters handed straight to [`TokenConfig`], and `[node]`, the host's
//! own settings. Every `[node]` field has a default, and each can also be
//! overridden from the command line or a `CASH_*` environment variable.
//!
//! ```toml
//! [token]
//! name = "Community Cash"
//! symbol = "RENT"
//! decimals = 18
//! initial_supply = "1000000"
//! deployer = "0x00000000000000000000000000000000000000a1"
//!
//! [node]
//! rpc_port = 8545
//! metrics_port = 9615
//! state_file = "ledger-state.json"
//! log_format = "pretty"
//! log_filter = "cash_node=info,cash_ledger=debug"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cash_ledger::{Address, TokenConfig};

/// Default port for the REST / JSON-RPC API.
pub const DEFAULT_RPC_PORT: u16 = 8545;

/// Default port for the Prometheus endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9615;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub token: TokenConfig,
    #[serde(default)]
    pub node: NodeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSettings {
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Where the ledger snapshot is kept between runs. No persistence when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// `tracing` filter directives. `RUST_LOG` still takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_rpc_port() -> u16 {
    DEFAULT_RPC_PORT
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_filter() -> String {
    crate::logging::DEFAULT_DIRECTIVES.to_string()
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            rpc_port: DEFAULT_RPC_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            state_file: None,
            log_format: default_log_format(),
            log_filter: default_log_filter(),
        }
    }
}

impl NodeConfig {
    /// Starter config: the default token owned by `deployer`.
    pub fn for_deployer(deployer: Address) -> Self {
        Self {
            token: TokenConfig::with_deployer(deployer),
            node: NodeSettings {
                state_file: Some(PathBuf::from("ledger-state.json")),
                ..NodeSettings::default()
            },
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: NodeConfig = toml::from_str(s).context("invalid node config")?;
        config
            .token
            .validate()
            .context("invalid [token] section")?;
        crate::logging::parse_filter(&config.node.log_filter)
            .context("invalid [node] log_filter")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render node config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_table_is_optional() {
        let config = NodeConfig::from_toml_str(
            "[token]\ndeployer = \"0x00000000000000000000000000000000000000a1\"\n",
        )
        .unwrap();
        assert_eq!(config.node, NodeSettings::default());
        assert_eq!(config.token.symbol, "RENT");
    }

    #[test]
    fn partial_node_table_fills_defaults() {
        let config = NodeConfig::from_toml_str(
            "[token]\ndeployer = \"0x00000000000000000000000000000000000000a1\"\n\n[node]\nrpc_port = 1234\n",
        )
        .unwrap();
        assert_eq!(config.node.rpc_port, 1234);
        assert_eq!(config.node.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.node.state_file, None);
    }

    #[test]
    fn invalid_token_section_rejected() {
        let err = NodeConfig::from_toml_str(
            "[token]\nsymbol = \"\"\ndeployer = \"0x00000000000000000000000000000000000000a1\"\n",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("symbol"));
    }

    #[test]
    fn log_filter_is_read_and_checked() {
        let config = NodeConfig::from_toml_str(
            "[token]\ndeployer = \"0x00000000000000000000000000000000000000a1\"\n\n[node]\nlog_filter = \"cash_ledger=debug\"\n",
        )
        .unwrap();
        assert_eq!(config.node.log_filter, "cash_ledger=debug");

        let err = NodeConfig::from_toml_str(
            "[token]\ndeployer = \"0x00000000000000000000000000000000000000a1\"\n\n[node]\nlog_filter = \"cash_ledger=chatty\"\n",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("log_filter"));
    }

    #[test]
    fn starter_config_round_trips() {
        let config = NodeConfig::for_deployer(Address::repeat_byte(0xa1));
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(NodeConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = NodeConfig::for_deployer(Address::repeat_byte(0xa1));
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }
}
