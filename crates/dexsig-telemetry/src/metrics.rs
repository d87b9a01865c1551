//! Prometheus metrics for the signing pipeline.
//!
//! # Panics
//!
//! Registration uses `unwrap()`. A failure means duplicate metric names,
//! which is a startup configuration error. It only happens during static
//! initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Actions signed, by chain and action kind.
pub static ACTIONS_SIGNED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexsig_actions_signed_total",
        "Total actions signed",
        &["chain", "kind"]
    )
    .unwrap()
});

/// Broadcast outcomes. Labels: chain, outcome (accepted/rejected/error)
pub static BROADCASTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexsig_broadcasts_total",
        "Total broadcasts by outcome",
        &["chain", "outcome"]
    )
    .unwrap()
});

/// Requests rejected before anything was signed.
pub static VALIDATION_REJECTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexsig_validation_rejects_total",
        "Requests rejected by local validation",
        &["reason"]
    )
    .unwrap()
});

/// Simulated gas per dYdX transaction.
pub static GAS_USED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dexsig_gas_used",
        "Simulated gas used per transaction",
        vec![50_000.0, 100_000.0, 150_000.0, 200_000.0, 300_000.0, 500_000.0, 1_000_000.0]
    )
    .unwrap()
});

/// Node and exchange request latency.
pub static NODE_REQUEST_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dexsig_node_request_seconds",
        "Node and exchange request latency in seconds",
        &["method"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn action_signed(chain: &str, kind: &str) {
        ACTIONS_SIGNED_TOTAL.with_label_values(&[chain, kind]).inc();
    }

    pub fn broadcast(chain: &str, outcome: &str) {
        BROADCASTS_TOTAL.with_label_values(&[chain, outcome]).inc();
    }

    pub fn validation_reject(reason: &str) {
        VALIDATION_REJECTS_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn gas_used(gas: u64) {
        GAS_USED.observe(gas as f64);
    }

    pub fn node_request(method: &str, seconds: f64) {
        NODE_REQUEST_SECONDS
            .with_label_values(&[method])
            .observe(seconds);
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn gather_metrics() -> TelemetryResult<String> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| crate::TelemetryError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_recorded_metrics() {
        Metrics::action_signed("dydx", "place_order");
        Metrics::broadcast("hyperliquid", "rejected");
        Metrics::gas_used(120_000);

        let text = gather_metrics().unwrap();
        assert!(text.contains("dexsig_actions_signed_total"));
        assert!(text.contains(r#"chain="dydx""#));
        assert!(text.contains("dexsig_broadcasts_total"));
        assert!(text.contains("dexsig_gas_used_bucket"));
    }

    #[test]
    fn test_counter_increments() {
        let before = VALIDATION_REJECTS_TOTAL
            .with_label_values(&["arguments_required"])
            .get();
        Metrics::validation_reject("arguments_required");
        let after = VALIDATION_REJECTS_TOTAL
            .with_label_values(&["arguments_required"])
            .get();
        assert_eq!(after - before, 1.0);
    }
}
