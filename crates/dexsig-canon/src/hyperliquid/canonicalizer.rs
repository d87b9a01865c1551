//! Validated requests → Hyperliquid actions.

use dexsig_core::{
    quantize_decimal, BatchCancelRequest, CancelRequest, CoreError, FormattedOrder,
    LeverageRequest, MarginDirection, MarginRequest, ModifyTarget, OrderIdentity, OrderKind,
    PlacedOrder, Rounding, TimeInForce, TransferRequest, TransferSource, TransferTarget,
    TriggerKind, ValidatedOrder, WithdrawRequest, DEFAULT_ORDER_NAMESPACE, USDC_DECIMALS,
};
use dexsig_signer::USER_SIGNED_CHAIN_ID;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;
use uuid::Uuid;

use super::wire::*;
use crate::action::ChainAction;
use crate::error::Result;

/// Builds Hyperliquid actions for one wallet.
#[derive(Debug, Clone)]
pub struct HyperliquidCanonicalizer {
    is_mainnet: bool,
    address: String,
    namespace: Uuid,
}

impl HyperliquidCanonicalizer {
    /// `address` is the wallet the order ids are derived for.
    pub fn new(is_mainnet: bool, address: impl Into<String>) -> Self {
        Self {
            is_mainnet,
            address: address.into(),
            namespace: DEFAULT_ORDER_NAMESPACE,
        }
    }

    pub fn with_namespace(mut self, namespace: Uuid) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    /// "Mainnet" / "Testnet", as user-signed actions name the chain.
    pub fn chain_name(&self) -> &'static str {
        if self.is_mainnet {
            "Mainnet"
        } else {
            "Testnet"
        }
    }

    pub fn identity(&self, order: &ValidatedOrder, asset: u32) -> OrderIdentity {
        OrderIdentity::derive(
            &self.namespace,
            &self.address,
            order.subaccount(),
            order.client_id(),
            order.flags(),
            asset,
        )
    }

    fn order_wire(&self, formatted: &FormattedOrder, asset: u32) -> OrderWire {
        let order = &formatted.order;
        let order_type = match (order.trigger(), &formatted.trigger_price) {
            (Some(trigger), Some(trigger_px)) => OrderTypeWire::trigger(
                order.kind() == OrderKind::Market,
                trigger_px.clone(),
                match trigger.kind {
                    TriggerKind::StopLoss => "sl",
                    TriggerKind::TakeProfit => "tp",
                },
            ),
            _ if order.post_only() => OrderTypeWire::alo(),
            _ if order.time_in_force() == TimeInForce::Ioc => OrderTypeWire::ioc(),
            _ => OrderTypeWire::gtc(),
        };
        OrderWire {
            asset,
            is_buy: order.side().is_buy(),
            limit_px: formatted.price.clone(),
            sz: formatted.size.clone(),
            reduce_only: order.reduce_only(),
            order_type,
            cloid: Some(self.identity(order, asset).to_cloid()),
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Market orders go out as IOC limits at the caller's price bound.
    pub fn place_order(&self, formatted: &FormattedOrder, asset: u32) -> Result<ChainAction> {
        let wire = self.order_wire(formatted, asset);
        debug!(
            symbol = %formatted.order.symbol(),
            asset,
            px = %wire.limit_px,
            sz = %wire.sz,
            cloid = ?wire.cloid,
            "Built order action"
        );
        Ok(ChainAction::hyperliquid(Action::Order {
            orders: vec![wire],
            grouping: GROUPING_NA.to_string(),
        }))
    }

    /// Cancel by exchange order id when one is given, otherwise by cloid.
    pub fn cancel_order(&self, req: &CancelRequest, asset: u32, placed: Option<&PlacedOrder>) -> Result<ChainAction> {
        if let Some(placed) = placed {
            req.check_against(placed)?;
        }
        let action = match req.exchange_order_id {
            Some(oid) => Action::Cancel {
                cancels: vec![CancelWire { asset, oid }],
            },
            None => Action::CancelByCloid {
                cancels: vec![self.cancel_by_cloid(req, asset)],
            },
        };
        Ok(ChainAction::hyperliquid(action))
    }

    fn cancel_by_cloid(&self, req: &CancelRequest, asset: u32) -> CancelByCloidWire {
        let identity = OrderIdentity::derive(
            &self.namespace,
            &self.address,
            req.subaccount,
            req.client_id,
            req.order_flags,
            asset,
        );
        CancelByCloidWire {
            asset,
            cloid: identity.to_cloid(),
        }
    }

    pub fn batch_cancel<F>(&self, req: &BatchCancelRequest, mut asset: F) -> Result<ChainAction>
    where
        F: FnMut(&str) -> dexsig_core::Result<u32>,
    {
        req.validate()?;
        let cancels = req
            .orders
            .iter()
            .map(|c| Ok(self.cancel_by_cloid(c, asset(&c.symbol)?)))
            .collect::<dexsig_core::Result<Vec<_>>>()?;
        Ok(ChainAction::hyperliquid(Action::CancelByCloid { cancels }))
    }

    pub fn modify_order(&self, target: ModifyTarget, formatted: &FormattedOrder, asset: u32) -> Result<ChainAction> {
        let oid = match target {
            ModifyTarget::ExchangeId(oid) => OrderRef::Oid(oid),
            ModifyTarget::Identity(identity) => OrderRef::Cloid(identity.to_cloid()),
        };
        Ok(ChainAction::hyperliquid(Action::BatchModify {
            modifies: vec![ModifyWire {
                oid,
                order: self.order_wire(formatted, asset),
            }],
        }))
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub fn update_leverage(&self, req: &LeverageRequest, asset: u32) -> Result<ChainAction> {
        req.validate()?;
        Ok(ChainAction::hyperliquid(Action::UpdateLeverage {
            asset,
            is_cross: req.is_cross,
            leverage: req.leverage,
        }))
    }

    pub fn update_margin(&self, req: &MarginRequest, asset: u32) -> Result<ChainAction> {
        let amount = req.amount()?;
        let units = quantize_decimal(amount, USDC_DECIMALS, Rounding::Down)?;
        if units.is_zero() {
            return Err(CoreError::BadRequest(format!("margin amount {amount} is below one USDC unit")).into());
        }
        let units = units.to_u64()?;
        let units = i64::try_from(units)
            .map_err(|_| CoreError::Overflow(format!("margin amount {amount} does not fit in int64")))?;
        let ntli = match req.direction {
            MarginDirection::Add => units,
            MarginDirection::Remove => -units,
        };
        Ok(ChainAction::hyperliquid(Action::UpdateIsolatedMargin {
            asset,
            is_buy: true,
            ntli,
        }))
    }

    /// `usdSend` to another address. `time_ms` becomes the nonce.
    pub fn usd_send(&self, req: &TransferRequest, time_ms: u64) -> Result<ChainAction> {
        let amount = req.collateral_amount()?;
        if req.source != TransferSource::Wallet {
            return Err(CoreError::NotSupported(
                "Hyperliquid transfers are sent from the wallet balance".to_string(),
            )
            .into());
        }
        let destination = match &req.target {
            TransferTarget::Address(addr) => addr.clone(),
            TransferTarget::Subaccount { .. } => {
                return Err(CoreError::BadRequest(
                    "Hyperliquid transfers need a destination address".to_string(),
                )
                .into())
            }
        };
        Ok(ChainAction::hyperliquid(Action::UsdSend(
            self.user_transfer(destination, amount, time_ms)?,
        )))
    }

    /// `withdraw3` to an address on the bridge chain.
    pub fn withdraw(&self, req: &WithdrawRequest, time_ms: u64) -> Result<ChainAction> {
        let amount = req.collateral_amount()?;
        Ok(ChainAction::hyperliquid(Action::Withdraw3(self.user_transfer(
            req.destination.clone(),
            amount,
            time_ms,
        )?)))
    }

    /// USDC amounts are truncated to six decimals.
    fn user_transfer(&self, destination: String, amount: Decimal, time_ms: u64) -> Result<UserTransferWire> {
        let truncated = amount.round_dp_with_strategy(USDC_DECIMALS as u32, RoundingStrategy::ToZero);
        if truncated.is_zero() {
            return Err(CoreError::InvalidOrder(format!("amount {amount} is below one USDC unit")).into());
        }
        Ok(UserTransferWire {
            signature_chain_id: format!("{USER_SIGNED_CHAIN_ID:#x}"),
            hyperliquid_chain: self.chain_name().to_string(),
            destination,
            amount: truncated.normalize().to_string(),
            time: time_ms,
        })
    }
}
