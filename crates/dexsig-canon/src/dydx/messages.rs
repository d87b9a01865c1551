//! dYdX v4 protobuf messages (`dydxprotocol.clob`, `dydxprotocol.sending`).

use dexsig_core::{ActionKind, ExpiryWindow, OrderFlags, OrderSide, TriggerKind};

use crate::cosmos::Any;
use crate::proto::ProtoWriter;

/// Asset id of USDC in `dydxprotocol.assets`.
pub const USDC_ASSET_ID: u32 = 0;

// =============================================================================
// Identifiers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubaccountId {
    /// Bech32 `dydx1...` address.
    pub owner: String,
    pub number: u32,
}

impl SubaccountId {
    pub fn new(owner: impl Into<String>, number: u32) -> Self {
        Self {
            owner: owner.into(),
            number,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.owner)
            .uint32(2, self.number)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderId {
    pub subaccount_id: SubaccountId,
    pub client_id: u32,
    pub order_flags: OrderFlags,
    pub clob_pair_id: u32,
}

impl OrderId {
    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .length_delimited(1, &self.subaccount_id.encode())
            .fixed32(2, self.client_id)
            .uint32(3, self.order_flags.value())
            .uint32(4, self.clob_pair_id)
            .finish()
    }
}

// =============================================================================
// Order enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Side {
    Buy = 1,
    Sell = 2,
}

impl From<OrderSide> for Side {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Buy,
            OrderSide::Sell => Self::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum TimeInForce {
    Unspecified = 0,
    Ioc = 1,
    PostOnly = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ConditionType {
    Unspecified = 0,
    StopLoss = 1,
    TakeProfit = 2,
}

impl From<Option<TriggerKind>> for ConditionType {
    fn from(kind: Option<TriggerKind>) -> Self {
        match kind {
            None => Self::Unspecified,
            Some(TriggerKind::StopLoss) => Self::StopLoss,
            Some(TriggerKind::TakeProfit) => Self::TakeProfit,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub quantums: u64,
    pub subticks: u64,
    pub good_til: ExpiryWindow,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub client_metadata: u32,
    pub condition_type: ConditionType,
    pub conditional_order_trigger_subticks: u64,
    pub order_router_address: String,
}

impl Order {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        w.length_delimited(1, &self.order_id.encode())
            .int32(2, self.side as i32)
            .uint64(3, self.quantums)
            .uint64(4, self.subticks);
        write_good_til(&mut w, 5, 6, self.good_til);
        w.int32(7, self.time_in_force as i32)
            .bool(8, self.reduce_only)
            .uint32(9, self.client_metadata)
            .int32(10, self.condition_type as i32)
            .uint64(11, self.conditional_order_trigger_subticks)
            .string(14, &self.order_router_address);
        w.finish()
    }
}

/// `good_til_oneof`: block height as uint32, or block time as fixed32.
fn write_good_til(w: &mut ProtoWriter, block_field: u32, time_field: u32, good_til: ExpiryWindow) {
    match good_til {
        ExpiryWindow::GoodTilBlock(block) => w.oneof_uint32(block_field, block),
        ExpiryWindow::GoodTilBlockTime(time) => w.oneof_fixed32(time_field, time),
    };
}

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgPlaceOrder {
    pub order: Order,
}

impl MsgPlaceOrder {
    pub const TYPE_URL: &'static str = "/dydxprotocol.clob.MsgPlaceOrder";

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .length_delimited(1, &self.order.encode())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgCancelOrder {
    pub order_id: OrderId,
    pub good_til: ExpiryWindow,
}

impl MsgCancelOrder {
    pub const TYPE_URL: &'static str = "/dydxprotocol.clob.MsgCancelOrder";

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        w.length_delimited(1, &self.order_id.encode());
        write_good_til(&mut w, 2, 3, self.good_til);
        w.finish()
    }
}

/// Short-term client ids on one clob pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBatch {
    pub clob_pair_id: u32,
    pub client_ids: Vec<u32>,
}

impl OrderBatch {
    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .uint32(1, self.clob_pair_id)
            .packed_uint32(2, &self.client_ids)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgBatchCancel {
    pub subaccount_id: SubaccountId,
    pub short_term_cancels: Vec<OrderBatch>,
    pub good_til_block: u32,
}

impl MsgBatchCancel {
    pub const TYPE_URL: &'static str = "/dydxprotocol.clob.MsgBatchCancel";

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        w.length_delimited(1, &self.subaccount_id.encode());
        for batch in &self.short_term_cancels {
            w.length_delimited(2, &batch.encode());
        }
        w.uint32(3, self.good_til_block);
        w.finish()
    }
}

/// Subaccount to subaccount transfer (`dydxprotocol.sending.Transfer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub sender: SubaccountId,
    pub recipient: SubaccountId,
    pub asset_id: u32,
    pub amount: u64,
}

impl Transfer {
    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .length_delimited(1, &self.sender.encode())
            .length_delimited(2, &self.recipient.encode())
            .uint32(3, self.asset_id)
            .uint64(4, self.amount)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgCreateTransfer {
    pub transfer: Transfer,
}

impl MsgCreateTransfer {
    pub const TYPE_URL: &'static str = "/dydxprotocol.sending.MsgCreateTransfer";

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .length_delimited(1, &self.transfer.encode())
            .finish()
    }
}

/// Wallet to subaccount deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgDepositToSubaccount {
    pub sender: String,
    pub recipient: SubaccountId,
    pub asset_id: u32,
    pub quantums: u64,
}

impl MsgDepositToSubaccount {
    pub const TYPE_URL: &'static str = "/dydxprotocol.sending.MsgDepositToSubaccount";

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.sender)
            .length_delimited(2, &self.recipient.encode())
            .uint32(3, self.asset_id)
            .uint64(4, self.quantums)
            .finish()
    }
}

/// Subaccount to wallet withdrawal. The proto declares `recipient = 1`
/// after `sender = 2`; fields are written in number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgWithdrawFromSubaccount {
    pub sender: SubaccountId,
    pub recipient: String,
    pub asset_id: u32,
    pub quantums: u64,
}

impl MsgWithdrawFromSubaccount {
    pub const TYPE_URL: &'static str = "/dydxprotocol.sending.MsgWithdrawFromSubaccount";

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.recipient)
            .length_delimited(2, &self.sender.encode())
            .uint32(3, self.asset_id)
            .uint64(4, self.quantums)
            .finish()
    }
}

// =============================================================================
// DydxMsg
// =============================================================================

/// Every message this crate can put in a dYdX transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DydxMsg {
    PlaceOrder(MsgPlaceOrder),
    CancelOrder(MsgCancelOrder),
    BatchCancel(MsgBatchCancel),
    CreateTransfer(MsgCreateTransfer),
    DepositToSubaccount(MsgDepositToSubaccount),
    WithdrawFromSubaccount(MsgWithdrawFromSubaccount),
}

impl DydxMsg {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::PlaceOrder(_) => ActionKind::PlaceOrder,
            Self::CancelOrder(_) => ActionKind::CancelOrder,
            Self::BatchCancel(_) => ActionKind::CancelBatch,
            Self::CreateTransfer(_) | Self::DepositToSubaccount(_) => ActionKind::Transfer,
            Self::WithdrawFromSubaccount(_) => ActionKind::Withdraw,
        }
    }

    /// CLOB messages pay no gas fee.
    pub fn is_clob(&self) -> bool {
        matches!(self, Self::PlaceOrder(_) | Self::CancelOrder(_) | Self::BatchCancel(_))
    }

    /// Short-term CLOB messages skip the ante handler's sequence check and
    /// leave the account sequence where it was.
    pub fn is_short_term(&self) -> bool {
        match self {
            Self::PlaceOrder(m) => m.order.order_id.order_flags.is_short_term(),
            Self::CancelOrder(m) => m.order_id.order_flags.is_short_term(),
            Self::BatchCancel(_) => true,
            _ => false,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            Self::PlaceOrder(_) => MsgPlaceOrder::TYPE_URL,
            Self::CancelOrder(_) => MsgCancelOrder::TYPE_URL,
            Self::BatchCancel(_) => MsgBatchCancel::TYPE_URL,
            Self::CreateTransfer(_) => MsgCreateTransfer::TYPE_URL,
            Self::DepositToSubaccount(_) => MsgDepositToSubaccount::TYPE_URL,
            Self::WithdrawFromSubaccount(_) => MsgWithdrawFromSubaccount::TYPE_URL,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::PlaceOrder(m) => m.encode(),
            Self::CancelOrder(m) => m.encode(),
            Self::BatchCancel(m) => m.encode(),
            Self::CreateTransfer(m) => m.encode(),
            Self::DepositToSubaccount(m) => m.encode(),
            Self::WithdrawFromSubaccount(m) => m.encode(),
        }
    }

    pub fn to_any(&self) -> Any {
        Any::new(self.type_url(), self.encode())
    }
}
