//! Validated requests → dYdX protobuf messages.

use std::collections::BTreeMap;

use dexsig_core::{
    quantize_decimal, BatchCancelRequest, CancelRequest, CoreError, ExpiryWindow, LeverageRequest,
    MarginRequest, ModifyRequest, OrderFlags, OrderKind, PlacedOrder, QuantizedOrder, Rounding,
    TimeInForce as OrderTif, TransferRequest, TransferSource, TransferTarget, ValidatedOrder,
    WithdrawRequest, USDC_DECIMALS,
};
use rust_decimal::Decimal;
use tracing::debug;

use super::messages::*;
use crate::action::ChainAction;
use crate::error::Result;

/// Default `order_router_address` stamped on placed orders.
pub const DEFAULT_ORDER_ROUTER: &str = "dydx165sfn2k3vucvq7gklauy2r3agyjw4c3m60ascn";

const ADDRESS_PREFIX: &str = "dydx1";

/// Builds dYdX messages for one wallet.
#[derive(Debug, Clone)]
pub struct DydxCanonicalizer {
    owner: String,
    router_address: String,
}

impl DydxCanonicalizer {
    /// `owner` must be a `dydx1...` address.
    pub fn new(owner: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        if !owner.starts_with(ADDRESS_PREFIX) {
            return Err(CoreError::BadRequest(format!(
                "dYdX address must start with {ADDRESS_PREFIX}, got {owner}"
            ))
            .into());
        }
        Ok(Self {
            owner,
            router_address: DEFAULT_ORDER_ROUTER.to_string(),
        })
    }

    /// Override the router; an empty string leaves the field unset.
    pub fn with_router_address(mut self, router: impl Into<String>) -> Self {
        self.router_address = router.into();
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn router_address(&self) -> &str {
        &self.router_address
    }

    fn subaccount(&self, number: u32) -> SubaccountId {
        SubaccountId::new(self.owner.clone(), number)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub fn place_order(&self, quantized: &QuantizedOrder, pair_id: u32, expiry: ExpiryWindow) -> Result<ChainAction> {
        let order = &quantized.order;
        check_expiry(order.flags(), expiry)?;

        let trigger = order.trigger();
        let msg = MsgPlaceOrder {
            order: Order {
                order_id: OrderId {
                    subaccount_id: self.subaccount(order.subaccount()),
                    client_id: order.client_id().value(),
                    order_flags: order.flags(),
                    clob_pair_id: pair_id,
                },
                side: order.side().into(),
                quantums: quantized.quantums,
                subticks: quantized.subticks,
                good_til: expiry,
                time_in_force: time_in_force(order),
                reduce_only: order.reduce_only(),
                client_metadata: u32::from(order.kind() == OrderKind::Market),
                condition_type: trigger.map(|t| t.kind).into(),
                conditional_order_trigger_subticks: quantized.trigger_subticks,
                order_router_address: self.router_address.clone(),
            },
        };

        debug!(
            symbol = %order.symbol(),
            side = %order.side(),
            quantums = quantized.quantums,
            subticks = quantized.subticks,
            flags = order.flags().value(),
            ?expiry,
            "Built MsgPlaceOrder"
        );
        Ok(ChainAction::dydx(DydxMsg::PlaceOrder(msg)))
    }

    /// Cancel by `(subaccount, client_id, flags, pair)`. When the placement is
    /// known its flags must match the request's.
    pub fn cancel_order(
        &self,
        req: &CancelRequest,
        pair_id: u32,
        placed: Option<&PlacedOrder>,
        expiry: ExpiryWindow,
    ) -> Result<ChainAction> {
        if let Some(placed) = placed {
            req.check_against(placed)?;
        }
        check_expiry(req.order_flags, expiry)?;

        let msg = MsgCancelOrder {
            order_id: OrderId {
                subaccount_id: self.subaccount(req.subaccount),
                client_id: req.client_id.value(),
                order_flags: req.order_flags,
                clob_pair_id: pair_id,
            },
            good_til: expiry,
        };
        Ok(ChainAction::dydx(DydxMsg::CancelOrder(msg)))
    }

    /// Short-term orders only, grouped by clob pair.
    pub fn batch_cancel<F>(&self, req: &BatchCancelRequest, mut pair_id: F, good_til_block: u32) -> Result<ChainAction>
    where
        F: FnMut(&str) -> dexsig_core::Result<u32>,
    {
        req.validate()?;

        let mut groups: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for cancel in &req.orders {
            if cancel.order_flags != OrderFlags::ShortTerm {
                return Err(CoreError::InvalidOrder(format!(
                    "batch cancel only accepts short-term orders, order {} has flags {}",
                    cancel.client_id, cancel.order_flags
                ))
                .into());
            }
            groups
                .entry(pair_id(&cancel.symbol)?)
                .or_default()
                .push(cancel.client_id.value());
        }

        let msg = MsgBatchCancel {
            subaccount_id: self.subaccount(req.subaccount),
            short_term_cancels: groups
                .into_iter()
                .map(|(clob_pair_id, client_ids)| OrderBatch {
                    clob_pair_id,
                    client_ids,
                })
                .collect(),
            good_til_block,
        };
        Ok(ChainAction::dydx(DydxMsg::BatchCancel(msg)))
    }

    pub fn modify_order(&self, _req: &ModifyRequest) -> Result<ChainAction> {
        Err(not_supported("modify_order"))
    }

    // =========================================================================
    // Collateral
    // =========================================================================

    pub fn transfer(&self, req: &TransferRequest) -> Result<ChainAction> {
        let quantums = usdc_quantums(req.collateral_amount()?)?;

        let msg = match (&req.source, &req.target) {
            (TransferSource::Wallet, TransferTarget::Subaccount { address, number }) => {
                DydxMsg::DepositToSubaccount(MsgDepositToSubaccount {
                    sender: self.owner.clone(),
                    recipient: SubaccountId::new(address.clone(), *number),
                    asset_id: USDC_ASSET_ID,
                    quantums,
                })
            }
            (TransferSource::Subaccount(from), TransferTarget::Subaccount { address, number }) => {
                DydxMsg::CreateTransfer(MsgCreateTransfer {
                    transfer: Transfer {
                        sender: self.subaccount(*from),
                        recipient: SubaccountId::new(address.clone(), *number),
                        asset_id: USDC_ASSET_ID,
                        amount: quantums,
                    },
                })
            }
            (TransferSource::Subaccount(from), TransferTarget::Address(recipient)) => {
                DydxMsg::WithdrawFromSubaccount(MsgWithdrawFromSubaccount {
                    sender: self.subaccount(*from),
                    recipient: recipient.clone(),
                    asset_id: USDC_ASSET_ID,
                    quantums,
                })
            }
            (TransferSource::Wallet, TransferTarget::Address(_)) => {
                return Err(not_supported("wallet to wallet transfer"));
            }
        };
        Ok(ChainAction::dydx(msg))
    }

    pub fn withdraw(&self, req: &WithdrawRequest) -> Result<ChainAction> {
        let quantums = usdc_quantums(req.collateral_amount()?)?;
        let msg = MsgWithdrawFromSubaccount {
            sender: self.subaccount(req.subaccount),
            recipient: req.destination.clone(),
            asset_id: USDC_ASSET_ID,
            quantums,
        };
        Ok(ChainAction::dydx(DydxMsg::WithdrawFromSubaccount(msg)))
    }

    pub fn update_leverage(&self, _req: &LeverageRequest) -> Result<ChainAction> {
        Err(not_supported("update_leverage"))
    }

    pub fn update_margin(&self, _req: &MarginRequest) -> Result<ChainAction> {
        Err(not_supported("update_margin"))
    }
}

fn not_supported(what: &str) -> crate::error::CanonError {
    CoreError::NotSupported(format!("{what} is not available on dYdX")).into()
}

/// Short-term orders carry a block height; the others carry a block time.
fn check_expiry(flags: OrderFlags, expiry: ExpiryWindow) -> dexsig_core::Result<()> {
    let matches = match expiry {
        ExpiryWindow::GoodTilBlock(_) => flags.is_short_term(),
        ExpiryWindow::GoodTilBlockTime(_) => !flags.is_short_term(),
    };
    if !matches {
        return Err(CoreError::InvalidOrder(format!(
            "expiry {expiry:?} does not match order flags {flags}"
        )));
    }
    Ok(())
}

fn time_in_force(order: &ValidatedOrder) -> TimeInForce {
    match order.flags() {
        OrderFlags::ShortTerm => TimeInForce::Ioc,
        OrderFlags::Conditional
            if order.kind() == OrderKind::Market || order.time_in_force() == OrderTif::Ioc =>
        {
            TimeInForce::Ioc
        }
        _ if order.post_only() => TimeInForce::PostOnly,
        _ => TimeInForce::Unspecified,
    }
}

fn usdc_quantums(amount: Decimal) -> dexsig_core::Result<u64> {
    let quantums = quantize_decimal(amount, USDC_DECIMALS, Rounding::Down)?;
    if quantums.is_zero() {
        return Err(CoreError::BadRequest(format!(
            "amount {amount} is below one USDC quantum"
        )));
    }
    quantums.to_u64()
}
