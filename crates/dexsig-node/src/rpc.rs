//! dYdX node access: CometBFT JSON-RPC and the cosmos REST gateway.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use dexsig_telemetry::Metrics;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{NodeError, NodeResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `broadcast_tx_sync` result (CheckTx outcome).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastTxResponse {
    pub code: u32,
    pub hash: String,
    pub log: String,
    pub codespace: String,
}

/// `simulate` result. `gas_used` is `None` when the node omitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulateResponse {
    pub gas_used: Option<u64>,
}

/// Auth module account state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub account_number: u64,
    pub sequence: u64,
    /// Base64 compressed public key; `None` until the account has signed.
    pub pub_key: Option<String>,
}

/// Node operations the signing pipeline needs.
pub trait NodeRpc: Send + Sync {
    fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<BroadcastTxResponse>>;

    /// Latest committed block height.
    fn abci_info(&self) -> BoxFuture<'_, NodeResult<u64>>;

    fn simulate(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<SimulateResponse>>;

    fn account_info<'a>(&'a self, address: &'a str) -> BoxFuture<'a, NodeResult<AccountInfo>>;
}

// =============================================================================
// Response parsing
// =============================================================================

/// Read a u64 that cosmos may encode as a JSON string or number.
fn u64_at(value: &Value, pointer: &str) -> NodeResult<u64> {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| NodeError::Decode(format!("{pointer} is not an integer: {s}"))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| NodeError::Decode(format!("{pointer} is not a u64: {n}"))),
        _ => Err(NodeError::MissingField(pointer.to_string())),
    }
}

fn str_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// JSON-RPC envelopes carry failures in `error`.
fn rpc_result(mut body: Value) -> NodeResult<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        return Err(NodeError::exchange(error.to_string()));
    }
    match body.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(NodeError::MissingField("result".to_string())),
    }
}

pub(crate) fn parse_broadcast(body: Value) -> NodeResult<BroadcastTxResponse> {
    let result = rpc_result(body)?;
    let code = match result.get("code") {
        Some(_) => u64_at(&result, "/code")?,
        None => 0,
    };
    Ok(BroadcastTxResponse {
        code: u32::try_from(code).map_err(|_| NodeError::Decode(format!("code {code} out of range")))?,
        hash: str_at(&result, "/hash"),
        log: str_at(&result, "/log"),
        codespace: str_at(&result, "/codespace"),
    })
}

pub(crate) fn parse_abci_info(body: Value) -> NodeResult<u64> {
    let result = rpc_result(body)?;
    u64_at(&result, "/response/last_block_height")
}

pub(crate) fn parse_simulate(body: &Value) -> NodeResult<SimulateResponse> {
    let gas_used = match u64_at(body, "/gas_info/gas_used") {
        Ok(gas) => Some(gas),
        Err(NodeError::MissingField(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(SimulateResponse { gas_used })
}

pub(crate) fn parse_account_info(body: &Value) -> NodeResult<AccountInfo> {
    let info = body
        .get("info")
        .ok_or_else(|| NodeError::MissingField("info".to_string()))?;
    Ok(AccountInfo {
        address: str_at(info, "/address"),
        account_number: u64_at(info, "/account_number")?,
        sequence: u64_at(info, "/sequence")?,
        pub_key: info
            .pointer("/pub_key/key")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

// =============================================================================
// HttpNodeClient
// =============================================================================

/// reqwest-backed node client.
pub struct HttpNodeClient {
    client: Client,
    /// CometBFT JSON-RPC endpoint
    rpc_url: String,
    /// Cosmos REST (gRPC gateway) endpoint
    rest_url: String,
}

impl HttpNodeClient {
    pub fn new(rpc_url: impl Into<String>, rest_url: impl Into<String>, timeout: Duration) -> NodeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into().trim_end_matches('/').to_string(),
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn json_rpc(&self, method: &'static str, params: Value) -> NodeResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let started = Instant::now();
        let response = self.client.post(&self.rpc_url).json(&body).send().await;
        Metrics::node_request(method, started.elapsed().as_secs_f64());
        decode(response?, method).await
    }

    async fn rest_get(&self, method: &'static str, path: &str) -> NodeResult<Value> {
        let url = format!("{}{}", self.rest_url, path);
        let started = Instant::now();
        let response = self.client.get(&url).send().await;
        Metrics::node_request(method, started.elapsed().as_secs_f64());
        decode(response?, method).await
    }

    async fn rest_post(&self, method: &'static str, path: &str, body: &Value) -> NodeResult<Value> {
        let url = format!("{}{}", self.rest_url, path);
        let started = Instant::now();
        let response = self.client.post(&url).json(body).send().await;
        Metrics::node_request(method, started.elapsed().as_secs_f64());
        decode(response?, method).await
    }
}

/// Non-2xx bodies are surfaced as exchange errors: cosmos REST puts the
/// chain's reason in `message`.
async fn decode(response: reqwest::Response, method: &str) -> NodeResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        warn!(method, %status, message = %message, "Node request failed");
        return Err(NodeError::exchange(format!("HTTP {status}: {message}")));
    }
    Ok(response.json::<Value>().await?)
}

impl NodeRpc for HttpNodeClient {
    fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<BroadcastTxResponse>> {
        Box::pin(async move {
            let params = json!({ "tx": STANDARD.encode(&tx_bytes) });
            let body = self.json_rpc("broadcast_tx_sync", params).await?;
            let result = parse_broadcast(body)?;
            debug!(code = result.code, hash = %result.hash, "broadcast_tx_sync");
            Ok(result)
        })
    }

    fn abci_info(&self) -> BoxFuture<'_, NodeResult<u64>> {
        Box::pin(async move {
            let body = self.json_rpc("abci_info", json!({})).await?;
            parse_abci_info(body)
        })
    }

    fn simulate(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<SimulateResponse>> {
        Box::pin(async move {
            let request = json!({ "tx_bytes": STANDARD.encode(&tx_bytes) });
            let body = self
                .rest_post("simulate", "/cosmos/tx/v1beta1/simulate", &request)
                .await?;
            parse_simulate(&body)
        })
    }

    fn account_info<'a>(&'a self, address: &'a str) -> BoxFuture<'a, NodeResult<AccountInfo>> {
        Box::pin(async move {
            let path = format!("/cosmos/auth/v1beta1/account_info/{address}");
            let body = self.rest_get("account_info", &path).await?;
            parse_account_info(&body)
        })
    }
}
