//! Network side of the pipeline.
//!
//! - `NodeRpc` / `HttpNodeClient`: dYdX broadcast, block height, simulation,
//!   account state
//! - `ExchangeApi` / `HttpExchangeClient`: Hyperliquid `/exchange`
//! - `FeeEstimator`: simulated gas → `Fee`
//! - `TxSubmitter`: one-shot broadcast of signed envelopes
//! - `MockNode` / `MockExchange`: call-recording fakes

pub mod error;
pub mod exchange;
pub mod fee;
pub mod mock;
pub mod rpc;
pub mod submit;

pub use error::{NodeError, NodeResult};
pub use exchange::{api_url, ExchangeApi, ExchangeResponse, HttpExchangeClient};
pub use fee::{FeeDenom, FeeEstimator};
pub use mock::{MockExchange, MockNode, NodeCall};
pub use rpc::{AccountInfo, BoxFuture, BroadcastTxResponse, HttpNodeClient, NodeRpc, SimulateResponse, DEFAULT_TIMEOUT};
pub use submit::{BroadcastResult, TxSubmitter};
