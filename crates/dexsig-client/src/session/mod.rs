//! Per-wallet signing sessions.
//!
//! A session runs the pipeline in order: validate → quantize → expiry →
//! canonicalize → sign → broadcast. Each stage takes the previous stage's
//! typed output, so a request cannot reach the signer unvalidated.

mod dydx;
mod hyperliquid;

pub use self::dydx::DydxSession;
pub use self::hyperliquid::HyperliquidSession;

use std::collections::HashMap;

use dashmap::DashMap;
use dexsig_core::{ClientOrderId, CoreError, MarketMeta, OrderIdentity, PlacedOrder};
use dexsig_node::BroadcastResult;
use dexsig_telemetry::Metrics;
use tracing::debug;

use crate::error::AppResult;

/// Result of a place or modify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub identity: OrderIdentity,
    pub client_id: ClientOrderId,
    pub result: BroadcastResult,
}

/// Markets by symbol.
#[derive(Debug, Clone, Default)]
pub struct Markets(HashMap<String, MarketMeta>);

impl Markets {
    pub fn new(markets: impl IntoIterator<Item = MarketMeta>) -> Self {
        Self(markets.into_iter().map(|m| (m.symbol.clone(), m)).collect())
    }

    pub fn get(&self, symbol: &str) -> Result<&MarketMeta, CoreError> {
        self.0
            .get(symbol)
            .ok_or_else(|| CoreError::BadRequest(format!("unknown market {symbol}")))
    }

    pub fn pair_id(&self, symbol: &str) -> Result<u32, CoreError> {
        self.get(symbol).map(|m| m.pair_id)
    }
}

/// Orders this session placed, keyed by (subaccount, client id, pair).
#[derive(Debug, Default)]
pub struct PlacedOrders(DashMap<(u32, u32, u32), PlacedOrder>);

impl PlacedOrders {
    pub fn record(&self, placed: PlacedOrder) {
        debug!(identity = %placed.identity, flags = %placed.flags, "Recorded placed order");
        self.0
            .insert((placed.subaccount, placed.client_id.value(), placed.pair_id), placed);
    }

    pub fn get(&self, subaccount: u32, client_id: ClientOrderId, pair_id: u32) -> Option<PlacedOrder> {
        self.0
            .get(&(subaccount, client_id.value(), pair_id))
            .map(|entry| *entry)
    }

    pub fn remove(&self, subaccount: u32, client_id: ClientOrderId, pair_id: u32) {
        self.0.remove(&(subaccount, client_id.value(), pair_id));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Count local validation failures before handing the result back.
pub(crate) fn track<T>(result: AppResult<T>) -> AppResult<T> {
    if let Err(e) = &result {
        if let Some(core) = e.as_core().filter(|c| c.is_validation()) {
            Metrics::validation_reject(core.reason());
        }
    }
    result
}

pub(crate) fn now_seconds() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
