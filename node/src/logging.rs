//! # Structured Logging
//!
//! One `tracing` subscriber per process, writing to stderr. The filter comes
//! from `RUST_LOG` when set, otherwise from `[node] log_filter`; the output
//! shape from `[node] log_format`.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when neither `RUST_LOG` nor `[node] log_filter` says otherwise.
pub const DEFAULT_DIRECTIVES: &str = "cash_node=info,cash_ledger=info,tower_http=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, multi-field lines for a terminal.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; anything else falls back to pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Parses configured directives such as `cash_ledger=debug,tower_http=warn`.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter {:?}", directives))
}

/// `RUST_LOG` wins when it is set and non-empty.
fn resolve_filter(configured: &str) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if !from_env.trim().is_empty() => {
            parse_filter(&from_env).context("RUST_LOG is not a valid filter")
        }
        _ => parse_filter(configured),
    }
}

/// Installs the global subscriber. Fails if one is already installed or the
/// filter does not parse.
///
/// Rejected ledger operations are logged by `cash_ledger` at `debug`, so
/// `cash_ledger=debug` shows every refusal with its reason.
pub fn init_logging(configured_filter: &str, format: LogFormat) -> Result<()> {
    let filter = resolve_filter(configured_filter)?;

    let output = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::debug!(?format, filter = configured_filter, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_is_lenient() {
        assert_eq!(LogFormat::from_str_lossy("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
    }

    #[test]
    fn configured_filters_parse() {
        assert!(parse_filter(DEFAULT_DIRECTIVES).is_ok());
        assert!(parse_filter("cash_ledger=debug,tower_http=warn").is_ok());
        assert!(parse_filter("warn").is_ok());
    }

    #[test]
    fn unparsable_level_is_reported() {
        let err = parse_filter("cash_ledger=chatty").unwrap_err();
        assert!(format!("{:#}", err).contains("cash_ledger=chatty"));
    }
}
