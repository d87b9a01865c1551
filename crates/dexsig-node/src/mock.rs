//! In-memory node and exchange for tests.

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{NodeError, NodeResult};
use crate::exchange::{ExchangeApi, ExchangeResponse};
use crate::rpc::{AccountInfo, BoxFuture, BroadcastTxResponse, NodeRpc, SimulateResponse};

/// A recorded node call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCall {
    BroadcastTxSync(Vec<u8>),
    AbciInfo,
    Simulate(Vec<u8>),
    AccountInfo(String),
}

/// Mock dYdX node.
#[derive(Debug)]
pub struct MockNode {
    calls: Mutex<Vec<NodeCall>>,
    broadcast_response: Mutex<BroadcastTxResponse>,
    block_height: Mutex<u64>,
    gas_used: Mutex<Option<u64>>,
    account: Mutex<AccountInfo>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    /// Height 1000, 100k gas, account 1 at sequence 0, broadcasts accepted.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            broadcast_response: Mutex::new(BroadcastTxResponse {
                code: 0,
                hash: "MOCKHASH".to_string(),
                log: String::new(),
                codespace: String::new(),
            }),
            block_height: Mutex::new(1_000),
            gas_used: Mutex::new(Some(100_000)),
            account: Mutex::new(AccountInfo {
                address: String::new(),
                account_number: 1,
                sequence: 0,
                pub_key: None,
            }),
        }
    }

    pub fn set_broadcast_response(&self, response: BroadcastTxResponse) {
        *self.broadcast_response.lock() = response;
    }

    pub fn set_block_height(&self, height: u64) {
        *self.block_height.lock() = height;
    }

    pub fn set_gas_used(&self, gas_used: Option<u64>) {
        *self.gas_used.lock() = gas_used;
    }

    pub fn set_account(&self, account_number: u64, sequence: u64) {
        let mut account = self.account.lock();
        account.account_number = account_number;
        account.sequence = sequence;
    }

    pub fn calls(&self) -> Vec<NodeCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn broadcast_txs(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                NodeCall::BroadcastTxSync(tx) => Some(tx.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn simulated_txs(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                NodeCall::Simulate(tx) => Some(tx.clone()),
                _ => None,
            })
            .collect()
    }
}

impl NodeRpc for MockNode {
    fn broadcast_tx_sync(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<BroadcastTxResponse>> {
        Box::pin(async move {
            self.calls.lock().push(NodeCall::BroadcastTxSync(tx_bytes));
            Ok(self.broadcast_response.lock().clone())
        })
    }

    fn abci_info(&self) -> BoxFuture<'_, NodeResult<u64>> {
        Box::pin(async move {
            self.calls.lock().push(NodeCall::AbciInfo);
            Ok(*self.block_height.lock())
        })
    }

    fn simulate(&self, tx_bytes: Vec<u8>) -> BoxFuture<'_, NodeResult<SimulateResponse>> {
        Box::pin(async move {
            self.calls.lock().push(NodeCall::Simulate(tx_bytes));
            Ok(SimulateResponse {
                gas_used: *self.gas_used.lock(),
            })
        })
    }

    fn account_info<'a>(&'a self, address: &'a str) -> BoxFuture<'a, NodeResult<AccountInfo>> {
        Box::pin(async move {
            self.calls.lock().push(NodeCall::AccountInfo(address.to_string()));
            let mut account = self.account.lock().clone();
            account.address = address.to_string();
            Ok(account)
        })
    }
}

/// Mock Hyperliquid `/exchange`.
#[derive(Debug)]
pub struct MockExchange {
    posts: Mutex<Vec<Value>>,
    response: Mutex<Value>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Replies `{"status":"ok"}` until told otherwise.
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            response: Mutex::new(json!({"status": "ok", "response": {"type": "default"}})),
        }
    }

    pub fn set_response(&self, response: Value) {
        *self.response.lock() = response;
    }

    pub fn posts(&self) -> Vec<Value> {
        self.posts.lock().clone()
    }
}

impl ExchangeApi for MockExchange {
    fn post_action(&self, payload: Value) -> BoxFuture<'_, NodeResult<ExchangeResponse>> {
        Box::pin(async move {
            self.posts.lock().push(payload);
            let response = self.response.lock().clone();
            serde_json::from_value(response).map_err(|e| NodeError::Decode(e.to_string()))
        })
    }
}
