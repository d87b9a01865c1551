//! Order requests and their validation.
//!
//! An [`OrderRequest`] is what the caller asks for. [`OrderRequest::validate`]
//! turns it into a [`ValidatedOrder`], the only form later stages accept:
//! prices are parsed, trigger flags are resolved into a single
//! [`TriggerKind`] and the order-flag class is fixed.

use crate::decimal::{parse_decimal, Price, Size};
use crate::error::{CoreError, Result};
use crate::expiry::OrderFlags;
use crate::market::{DydxScale, HyperliquidScale, MarketMeta};
use crate::precision::Quantized;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    /// Market order. Still carries a worst acceptable price.
    Market,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Time-in-force for orders. Post-only is a separate flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-til-time (rests on the book until its expiry).
    #[default]
    Gtt,
    /// Immediate-or-cancel.
    Ioc,
    /// Fill-or-kill. Rejected; neither chain supports it any more.
    Fok,
}

/// Direction the market must move through the trigger price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerDirection {
    /// Fires when the price rises to the trigger.
    Ascending,
    /// Fires when the price falls to the trigger.
    Descending,
}

/// Resolved trigger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    StopLoss,
    TakeProfit,
}

impl TriggerKind {
    /// A sell triggered on a falling price (or a buy on a rising one) cuts a
    /// loss; the opposite direction takes profit.
    pub fn from_direction(side: OrderSide, direction: TriggerDirection) -> Self {
        match (side, direction) {
            (OrderSide::Sell, TriggerDirection::Descending) => Self::StopLoss,
            (OrderSide::Buy, TriggerDirection::Ascending) => Self::StopLoss,
            (OrderSide::Sell, TriggerDirection::Ascending) => Self::TakeProfit,
            (OrderSide::Buy, TriggerDirection::Descending) => Self::TakeProfit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub price: Price,
}

/// Client order id: a caller-chosen 32-bit integer.
///
/// dYdX carries it as a `fixed32` in the order id; on Hyperliquid it feeds
/// the derived cloid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(pub u32);

impl ClientOrderId {
    /// Random id, kept below 10^9 so it reads as a nine-digit number.
    pub fn random() -> Self {
        let raw = Uuid::new_v4().as_u128() as u32;
        Self(raw % 1_000_000_000)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trading intent as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    /// Decimal string.
    pub amount: String,
    /// Decimal string. Required for limit orders and as the worst price for
    /// market orders.
    pub price: Option<String>,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub post_only: bool,
    #[serde(default)]
    pub reduce_only: bool,
    pub trigger_price: Option<String>,
    pub trigger_direction: Option<TriggerDirection>,
    pub stop_loss_price: Option<String>,
    pub take_profit_price: Option<String>,
    pub client_id: Option<ClientOrderId>,
    #[serde(default)]
    pub subaccount: u32,
    /// Lifetime in seconds for long-term and conditional orders.
    pub good_til_secs: Option<u64>,
}

impl OrderRequest {
    pub fn new(symbol: impl Into<String>, side: OrderSide, kind: OrderKind, amount: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind,
            amount: amount.into(),
            price: None,
            time_in_force: TimeInForce::default(),
            post_only: false,
            reduce_only: false,
            trigger_price: None,
            trigger_direction: None,
            stop_loss_price: None,
            take_profit_price: None,
            client_id: None,
            subaccount: 0,
            good_til_secs: None,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: OrderSide, amount: impl Into<String>, price: impl Into<String>) -> Self {
        Self::new(symbol, side, OrderKind::Limit, amount).with_price(price)
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, amount: impl Into<String>, price: impl Into<String>) -> Self {
        Self::new(symbol, side, OrderKind::Market, amount).with_price(price)
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    pub fn with_trigger_price(mut self, price: impl Into<String>) -> Self {
        self.trigger_price = Some(price.into());
        self
    }

    pub fn with_trigger_direction(mut self, direction: TriggerDirection) -> Self {
        self.trigger_direction = Some(direction);
        self
    }

    pub fn with_stop_loss(mut self, price: impl Into<String>) -> Self {
        self.stop_loss_price = Some(price.into());
        self
    }

    pub fn with_take_profit(mut self, price: impl Into<String>) -> Self {
        self.take_profit_price = Some(price.into());
        self
    }

    pub fn with_client_id(mut self, id: u32) -> Self {
        self.client_id = Some(ClientOrderId(id));
        self
    }

    pub fn with_subaccount(mut self, subaccount: u32) -> Self {
        self.subaccount = subaccount;
        self
    }

    pub fn with_good_til_secs(mut self, secs: u64) -> Self {
        self.good_til_secs = Some(secs);
        self
    }

    /// Check the request and resolve its flags.
    ///
    /// Runs before any quantization, network or signing work.
    pub fn validate(&self) -> Result<ValidatedOrder> {
        let size = Size::new(parse_decimal(&self.amount)?);
        if !size.is_positive() {
            return Err(CoreError::BadRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }

        let price = match &self.price {
            Some(p) => parse_positive_price(p, "price")?,
            None => {
                return Err(CoreError::ArgumentsRequired(format!(
                    "price is required for {} orders",
                    self.kind
                )))
            }
        };

        let trigger = self.resolve_trigger()?;

        if self.time_in_force == TimeInForce::Fok {
            return Err(CoreError::InvalidOrder(
                "fill-or-kill orders are not supported".to_string(),
            ));
        }
        if self.post_only && self.kind == OrderKind::Market {
            return Err(CoreError::InvalidOrder(
                "market orders cannot be post-only".to_string(),
            ));
        }
        if self.post_only && self.time_in_force == TimeInForce::Ioc {
            return Err(CoreError::InvalidOrder(
                "post-only orders cannot be immediate-or-cancel".to_string(),
            ));
        }

        let time_in_force = match self.kind {
            OrderKind::Market => TimeInForce::Ioc,
            OrderKind::Limit => self.time_in_force,
        };
        let flags = if trigger.is_some() {
            OrderFlags::Conditional
        } else if time_in_force == TimeInForce::Ioc {
            OrderFlags::ShortTerm
        } else {
            OrderFlags::LongTerm
        };

        Ok(ValidatedOrder {
            symbol: self.symbol.clone(),
            side: self.side,
            kind: self.kind,
            size,
            price,
            time_in_force,
            post_only: self.post_only,
            reduce_only: self.reduce_only,
            trigger,
            flags,
            client_id: self.client_id.unwrap_or_else(ClientOrderId::random),
            subaccount: self.subaccount,
            good_til_secs: self.good_til_secs,
        })
    }

    /// At most one of trigger / stop-loss / take-profit may be set. A bare
    /// trigger price needs a direction to become one of the other two.
    fn resolve_trigger(&self) -> Result<Option<Trigger>> {
        let set = [
            self.trigger_price.is_some(),
            self.stop_loss_price.is_some(),
            self.take_profit_price.is_some(),
        ]
        .iter()
        .filter(|s| **s)
        .count();
        if set > 1 {
            return Err(CoreError::InvalidOrder(
                "only one of trigger_price, stop_loss_price and take_profit_price may be set"
                    .to_string(),
            ));
        }

        if let Some(p) = &self.trigger_price {
            let direction = self.trigger_direction.ok_or_else(|| {
                CoreError::ArgumentsRequired(
                    "trigger_price requires a trigger_direction (ascending or descending)"
                        .to_string(),
                )
            })?;
            return Ok(Some(Trigger {
                kind: TriggerKind::from_direction(self.side, direction),
                price: parse_positive_price(p, "trigger_price")?,
            }));
        }
        if let Some(p) = &self.stop_loss_price {
            return Ok(Some(Trigger {
                kind: TriggerKind::StopLoss,
                price: parse_positive_price(p, "stop_loss_price")?,
            }));
        }
        if let Some(p) = &self.take_profit_price {
            return Ok(Some(Trigger {
                kind: TriggerKind::TakeProfit,
                price: parse_positive_price(p, "take_profit_price")?,
            }));
        }
        Ok(None)
    }
}

fn parse_positive_price(raw: &str, field: &str) -> Result<Price> {
    let price = Price::new(parse_decimal(raw)?);
    if !price.is_positive() {
        return Err(CoreError::BadRequest(format!(
            "{field} must be positive, got {raw}"
        )));
    }
    Ok(price)
}

/// An order that passed validation. Only [`OrderRequest::validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    symbol: String,
    side: OrderSide,
    kind: OrderKind,
    size: Size,
    price: Price,
    time_in_force: TimeInForce,
    post_only: bool,
    reduce_only: bool,
    trigger: Option<Trigger>,
    flags: OrderFlags,
    client_id: ClientOrderId,
    subaccount: u32,
    good_til_secs: Option<u64>,
}

impl ValidatedOrder {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    pub fn post_only(&self) -> bool {
        self.post_only
    }

    pub fn reduce_only(&self) -> bool {
        self.reduce_only
    }

    pub fn trigger(&self) -> Option<Trigger> {
        self.trigger
    }

    pub fn flags(&self) -> OrderFlags {
        self.flags
    }

    pub fn client_id(&self) -> ClientOrderId {
        self.client_id
    }

    pub fn subaccount(&self) -> u32 {
        self.subaccount
    }

    pub fn good_til_secs(&self) -> Option<u64> {
        self.good_til_secs
    }

    /// Convert size and prices into dYdX quantums and subticks.
    pub fn quantize_dydx(self, scale: &DydxScale) -> Result<QuantizedOrder> {
        let quantums = scale.quantize_size(self.size)?;
        if quantums.is_zero() {
            return Err(CoreError::InvalidOrder(format!(
                "amount {} is below the minimum order step",
                self.size
            )));
        }
        let subticks = nonzero_price(scale.quantize_price(self.price, self.side)?, self.price)?;
        let trigger_subticks = match self.trigger {
            Some(t) => nonzero_price(scale.quantize_price(t.price, self.side)?, t.price)?,
            None => Quantized::ZERO,
        };
        Ok(QuantizedOrder {
            quantums: quantums.to_u64()?,
            subticks: subticks.to_u64()?,
            trigger_subticks: trigger_subticks.to_u64()?,
            order: self,
        })
    }

    /// Format size and prices as Hyperliquid wire strings.
    pub fn quantize_hyperliquid(self, meta: &MarketMeta, scale: &HyperliquidScale) -> Result<FormattedOrder> {
        let size = scale.format_size(self.size, meta.step_size);
        if size == "0" {
            return Err(CoreError::InvalidOrder(format!(
                "amount {} is below the minimum size for {}",
                self.size, meta.symbol
            )));
        }
        let price = nonzero_wire_price(
            scale.format_price(self.price, self.side, meta.tick_size)?,
            self.price,
            &meta.symbol,
        )?;
        let trigger_price = match self.trigger {
            Some(t) => Some(nonzero_wire_price(
                scale.format_price(t.price, self.side, meta.tick_size)?,
                t.price,
                &meta.symbol,
            )?),
            None => None,
        };
        Ok(FormattedOrder {
            size,
            price,
            trigger_price,
            order: self,
        })
    }
}

fn nonzero_price(units: Quantized, price: Price) -> Result<Quantized> {
    if units.is_zero() {
        return Err(CoreError::InvalidOrder(format!(
            "price {price} is below one tick"
        )));
    }
    Ok(units)
}

fn nonzero_wire_price(formatted: String, price: Price, symbol: &str) -> Result<String> {
    if formatted == "0" {
        return Err(CoreError::InvalidOrder(format!(
            "price {price} rounds to zero for {symbol}"
        )));
    }
    Ok(formatted)
}

/// A dYdX order with integer quantums and subticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedOrder {
    pub quantums: u64,
    pub subticks: u64,
    /// Zero unless the order is conditional.
    pub trigger_subticks: u64,
    pub order: ValidatedOrder,
}

/// A Hyperliquid order with canonical decimal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedOrder {
    pub size: String,
    pub price: String,
    pub trigger_price: Option<String>,
    pub order: ValidatedOrder,
}
