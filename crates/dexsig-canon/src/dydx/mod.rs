//! dYdX v4: protobuf messages and the canonicalizer that builds them.

mod canonicalizer;
mod messages;

pub use canonicalizer::{DydxCanonicalizer, DEFAULT_ORDER_ROUTER};
pub use messages::{
    ConditionType, DydxMsg, MsgBatchCancel, MsgCancelOrder, MsgCreateTransfer,
    MsgDepositToSubaccount, MsgPlaceOrder, MsgWithdrawFromSubaccount, Order, OrderBatch, OrderId,
    Side, SubaccountId, TimeInForce, Transfer, USDC_ASSET_ID,
};
