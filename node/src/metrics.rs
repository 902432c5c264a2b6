//! # Prometheus Metrics
//!
//! Ledger-level counters served at `/metrics` on the metrics port. Everything
//! lives in a private [`prometheus::Registry`] with the `cash` prefix.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Successful `transfer` and `transferFrom` calls.
    pub transfers_total: IntCounter,
    /// Successful `approve` calls.
    pub approvals_total: IntCounter,
    /// Rejected mutations, labelled by error kind.
    pub rejections_total: IntCounterVec,
    /// Accounts currently holding a non-zero balance.
    pub holders: IntGauge,
    /// Wall time spent inside a ledger mutation, lock wait included.
    pub operation_latency_seconds: Histogram,
}

impl LedgerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("cash".into()), None)?;

        let transfers_total = IntCounter::new(
            "transfers_total",
            "Total number of successful token transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let approvals_total = IntCounter::new(
            "approvals_total",
            "Total number of successful allowance approvals",
        )?;
        registry.register(Box::new(approvals_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new(
                "rejections_total",
                "Total number of rejected ledger operations",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let holders = IntGauge::new("holders", "Accounts with a non-zero balance")?;
        registry.register(Box::new(holders.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Ledger mutation latency in seconds",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            transfers_total,
            approvals_total,
            rejections_total,
            holders,
            operation_latency_seconds,
        })
    }

    /// Count one rejected mutation.
    pub fn record_rejection(&self, kind: &str) {
        self.rejections_total.with_label_values(&[kind]).inc();
    }

    /// Text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<LedgerMetrics>;

/// `GET /metrics`
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_output_carries_prefix_and_labels() {
        let metrics = LedgerMetrics::new().unwrap();
        metrics.transfers_total.inc();
        metrics.record_rejection("InsufficientBalance");
        metrics.holders.set(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("cash_transfers_total 1"));
        assert!(text.contains("cash_rejections_total{kind=\"InsufficientBalance\"} 1"));
        assert!(text.contains("cash_holders 3"));
    }
}
