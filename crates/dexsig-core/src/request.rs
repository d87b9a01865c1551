//! Non-placement requests: cancels, modifies, transfers and account updates.

use crate::decimal::parse_decimal;
use crate::error::{CoreError, Result};
use crate::expiry::OrderFlags;
use crate::identity::OrderIdentity;
use crate::order::{ClientOrderId, OrderRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only settlement asset either chain accepts for transfers.
pub const COLLATERAL_SYMBOL: &str = "USDC";

/// Chain action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PlaceOrder,
    CancelOrder,
    CancelBatch,
    ModifyOrder,
    Transfer,
    Withdraw,
    UpdateLeverage,
    UpdateMargin,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlaceOrder => "place_order",
            Self::CancelOrder => "cancel_order",
            Self::CancelBatch => "cancel_batch",
            Self::ModifyOrder => "modify_order",
            Self::Transfer => "transfer",
            Self::Withdraw => "withdraw",
            Self::UpdateLeverage => "update_leverage",
            Self::UpdateMargin => "update_margin",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a placed order, kept so a later cancel can be checked against
/// the flags the order was placed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub identity: OrderIdentity,
    pub client_id: ClientOrderId,
    pub flags: OrderFlags,
    pub pair_id: u32,
    pub subaccount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub symbol: String,
    pub client_id: ClientOrderId,
    /// Must equal the flags the order was placed with.
    pub order_flags: OrderFlags,
    #[serde(default)]
    pub subaccount: u32,
    /// Short-term cancels only.
    pub good_til_block: Option<u32>,
    /// Long-term and conditional cancels only.
    pub good_til_secs: Option<u64>,
    /// Exchange-assigned order id, where the chain has one.
    pub exchange_order_id: Option<u64>,
}

impl CancelRequest {
    pub fn new(symbol: impl Into<String>, client_id: ClientOrderId, order_flags: OrderFlags) -> Self {
        Self {
            symbol: symbol.into(),
            client_id,
            order_flags,
            subaccount: 0,
            good_til_block: None,
            good_til_secs: None,
            exchange_order_id: None,
        }
    }

    pub fn with_subaccount(mut self, subaccount: u32) -> Self {
        self.subaccount = subaccount;
        self
    }

    pub fn with_good_til_block(mut self, block: u32) -> Self {
        self.good_til_block = Some(block);
        self
    }

    pub fn with_good_til_secs(mut self, secs: u64) -> Self {
        self.good_til_secs = Some(secs);
        self
    }

    /// Reject a cancel whose flags differ from the placement's.
    pub fn check_against(&self, placed: &PlacedOrder) -> Result<()> {
        if self.order_flags != placed.flags {
            return Err(CoreError::InvalidOrder(format!(
                "order {} was placed with flags {} but cancel uses flags {}",
                placed.client_id, placed.flags, self.order_flags
            )));
        }
        Ok(())
    }
}

/// Cancel several orders in one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCancelRequest {
    #[serde(default)]
    pub subaccount: u32,
    pub orders: Vec<CancelRequest>,
    pub good_til_block: Option<u32>,
}

impl BatchCancelRequest {
    pub fn validate(&self) -> Result<()> {
        if self.orders.is_empty() {
            return Err(CoreError::ArgumentsRequired(
                "batch cancel needs at least one order".to_string(),
            ));
        }
        if let Some(bad) = self.orders.iter().find(|o| o.subaccount != self.subaccount) {
            return Err(CoreError::BadRequest(format!(
                "order {} belongs to subaccount {}, batch is for {}",
                bad.client_id, bad.subaccount, self.subaccount
            )));
        }
        Ok(())
    }
}

/// Which order a modify replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyTarget {
    ExchangeId(u64),
    Identity(OrderIdentity),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub target: ModifyTarget,
    pub order: OrderRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferSource {
    /// The wallet's free balance (a deposit, on dYdX).
    Wallet,
    Subaccount(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferTarget {
    Subaccount { address: String, number: u32 },
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub currency: String,
    pub amount: String,
    pub source: TransferSource,
    pub target: TransferTarget,
}

impl TransferRequest {
    /// Parsed amount, after checking the currency is the collateral asset.
    pub fn collateral_amount(&self) -> Result<Decimal> {
        collateral_amount(&self.currency, &self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub currency: String,
    pub amount: String,
    #[serde(default)]
    pub subaccount: u32,
    pub destination: String,
}

impl WithdrawRequest {
    pub fn collateral_amount(&self) -> Result<Decimal> {
        collateral_amount(&self.currency, &self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverageRequest {
    pub symbol: String,
    pub leverage: u32,
    #[serde(default = "default_true")]
    pub is_cross: bool,
}

fn default_true() -> bool {
    true
}

impl LeverageRequest {
    pub fn validate(&self) -> Result<()> {
        if self.leverage == 0 {
            return Err(CoreError::BadRequest(
                "leverage must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginDirection {
    Add,
    Remove,
}

/// Move collateral into or out of an isolated position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginRequest {
    pub symbol: String,
    pub amount: String,
    pub direction: MarginDirection,
}

impl MarginRequest {
    pub fn amount(&self) -> Result<Decimal> {
        positive_amount(&self.amount)
    }
}

fn collateral_amount(currency: &str, amount: &str) -> Result<Decimal> {
    if !currency.eq_ignore_ascii_case(COLLATERAL_SYMBOL) {
        return Err(CoreError::BadRequest(format!(
            "only {COLLATERAL_SYMBOL} transfers are supported, got {currency}"
        )));
    }
    positive_amount(amount)
}

fn positive_amount(amount: &str) -> Result<Decimal> {
    let value = parse_decimal(amount)?;
    if value <= Decimal::ZERO {
        return Err(CoreError::BadRequest(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(value)
}
