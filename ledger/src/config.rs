//! # Token Configuration & Constants
//!
//! Every deployment parameter of the token lives here: the defaults that
//! match the original Community Cash deployment, and [`TokenConfig`], the
//! TOML-loadable description of a deployment.
//!
//! ```toml
//! name = "Community Cash"
//! symbol = "RENT"
//! decimals = 18
//! initial_supply = "1000000"
//! deployer = "0x00000000000000000000000000000000000000a1"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::LedgerResult;
use crate::ledger::Ledger;
use crate::types::{Address, Amount};

/// Version of the ledger library, reported by hosts.
pub const LEDGER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Display name of the default deployment.
pub const DEFAULT_TOKEN_NAME: &str = "Community Cash";

/// Ticker of the default deployment.
pub const DEFAULT_TOKEN_SYMBOL: &str = "RENT";

/// Decimal places. 18 is the convention for divisible tokens of this kind,
/// so one whole token is `10^18` smallest units.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Initial supply in whole tokens, before scaling by `10^decimals`.
pub const DEFAULT_INITIAL_SUPPLY: u64 = 1_000_000;

/// Largest `decimals` for which `10^decimals` still fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("token name must not be empty")]
    EmptyName,

    #[error("token symbol must not be empty")]
    EmptySymbol,

    #[error("decimals must be at most {max}, got {decimals}")]
    DecimalsTooLarge { decimals: u8, max: u8 },

    #[error("deployer must not be the null account")]
    NullDeployer,
}

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Everything needed to deploy a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Whole tokens; scaled by `10^decimals` at deployment.
    #[serde(default = "default_initial_supply")]
    pub initial_supply: Amount,
    /// Receives the entire initial supply.
    pub deployer: Address,
}

fn default_name() -> String {
    DEFAULT_TOKEN_NAME.to_string()
}

fn default_symbol() -> String {
    DEFAULT_TOKEN_SYMBOL.to_string()
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

fn default_initial_supply() -> Amount {
    Amount::from(DEFAULT_INITIAL_SUPPLY)
}

impl TokenConfig {
    /// The default deployment, owned by `deployer`.
    pub fn with_deployer(deployer: Address) -> Self {
        Self {
            name: default_name(),
            symbol: default_symbol(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: default_initial_supply(),
            deployer,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::DecimalsTooLarge {
                decimals: self.decimals,
                max: MAX_DECIMALS,
            });
        }
        if self.deployer.is_null() {
            return Err(ConfigError::NullDeployer);
        }
        Ok(())
    }

    /// Parses and validates.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TokenConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Constructs the ledger this config describes.
    pub fn deploy(&self) -> LedgerResult<Ledger> {
        Ledger::new(
            self.name.clone(),
            self.symbol.clone(),
            self.decimals,
            self.initial_supply,
            self.deployer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEPLOYER: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn minimal_config_takes_defaults() {
        let config = TokenConfig::from_toml_str(&format!("deployer = \"{}\"", DEPLOYER)).unwrap();
        assert_eq!(config.name, "Community Cash");
        assert_eq!(config.symbol, "RENT");
        assert_eq!(config.decimals, 18);
        assert_eq!(config.initial_supply, Amount::from(1_000_000u64));
        assert_eq!(config.deployer, DEPLOYER.parse().unwrap());
    }

    #[test]
    fn integer_supply_accepted() {
        let toml = format!(
            "name = \"Test\"\nsymbol = \"TST\"\ndecimals = 6\ninitial_supply = 500\ndeployer = \"{}\"",
            DEPLOYER
        );
        let config = TokenConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.initial_supply, Amount::from(500u64));

        let ledger = config.deploy().unwrap();
        assert_eq!(ledger.total_supply(), Amount::from(500_000_000u64));
    }

    #[test]
    fn missing_deployer_rejected() {
        assert!(matches!(
            TokenConfig::from_toml_str("name = \"X\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validation_failures() {
        let mut config = TokenConfig::with_deployer(Address::repeat_byte(1));
        config.name = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyName)));

        let mut config = TokenConfig::with_deployer(Address::repeat_byte(1));
        config.symbol.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptySymbol)));

        let mut config = TokenConfig::with_deployer(Address::repeat_byte(1));
        config.decimals = 78;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DecimalsTooLarge { decimals: 78, max: 77 })
        ));

        let config = TokenConfig::with_deployer(Address::NULL);
        assert!(matches!(config.validate(), Err(ConfigError::NullDeployer)));
    }

    #[test]
    fn render_then_load_from_file() {
        let config = TokenConfig::with_deployer(Address::repeat_byte(0xa1));
        let rendered = config.to_toml_string().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        assert_eq!(TokenConfig::load(file.path()).unwrap(), config);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = TokenConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
