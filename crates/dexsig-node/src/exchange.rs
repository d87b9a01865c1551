//! Hyperliquid `/exchange` endpoint.

use std::time::{Duration, Instant};

use dexsig_telemetry::Metrics;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{NodeError, NodeResult};
use crate::rpc::BoxFuture;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

pub fn api_url(is_mainnet: bool) -> &'static str {
    if is_mainnet {
        MAINNET_API_URL
    } else {
        TESTNET_API_URL
    }
}

/// Raw `/exchange` reply.
///
/// `{"status":"ok","response":{"type":"order","data":{"statuses":[...]}}}`
/// or `{"status":"err","response":"<message>"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExchangeResponse {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

impl ExchangeResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Top-level failure message, or the first per-order `error` status.
    pub fn error_message(&self) -> Option<String> {
        if !self.is_ok() {
            return Some(match &self.response {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        self.response
            .pointer("/data/statuses")
            .and_then(Value::as_array)?
            .iter()
            .find_map(|s| s.get("error").and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// Posts signed actions.
pub trait ExchangeApi: Send + Sync {
    fn post_action(&self, payload: Value) -> BoxFuture<'_, NodeResult<ExchangeResponse>>;
}

/// reqwest-backed exchange client.
pub struct HttpExchangeClient {
    client: Client,
    exchange_url: String,
}

impl HttpExchangeClient {
    /// `base_url` without the `/exchange` suffix, e.g. [`MAINNET_API_URL`].
    pub fn new(base_url: &str, timeout: Duration) -> NodeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            exchange_url: format!("{}/exchange", base_url.trim_end_matches('/')),
        })
    }

    pub fn exchange_url(&self) -> &str {
        &self.exchange_url
    }
}

impl ExchangeApi for HttpExchangeClient {
    fn post_action(&self, payload: Value) -> BoxFuture<'_, NodeResult<ExchangeResponse>> {
        Box::pin(async move {
            let started = Instant::now();
            let response = self.client.post(&self.exchange_url).json(&payload).send().await;
            Metrics::node_request("exchange", started.elapsed().as_secs_f64());
            let response = response?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                warn!(%status, body = %body, "Exchange request failed");
                return Err(NodeError::exchange(format!("HTTP {status}: {body}")));
            }
            debug!(body = %body, "Exchange response");
            Ok(serde_json::from_str(&body)?)
        })
    }
}
