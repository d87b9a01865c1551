//! Hyperliquid actions: msgpack-hashed L1 actions and EIP-712 user actions.

mod canonicalizer;
mod wire;

pub use canonicalizer::HyperliquidCanonicalizer;
pub use wire::{
    Action, CancelByCloidWire, CancelWire, LimitOrderType, ModifyWire, OrderRef, OrderTypeWire,
    OrderWire, SigningInput, TriggerOrderType, UserTransferWire, GROUPING_NA,
};
