//! Core domain types for on-chain order signing.
//!
//! This crate provides the chain-independent front half of the pipeline:
//! - `Price`, `Size`: precision-safe numeric types
//! - `quantize` / `dequantize`: exact decimal to integer-unit conversion
//! - `MarketMeta`: per-market scale parameters
//! - `OrderRequest` → `ValidatedOrder`: validation and flag resolution
//! - `OrderIdentity`: deterministic client-side order ids
//! - `ExpiryPolicy`: good-til-block / good-til-block-time windows

pub mod decimal;
pub mod error;
pub mod expiry;
pub mod identity;
pub mod market;
pub mod order;
pub mod precision;
pub mod request;

pub use decimal::{parse_decimal, Price, Size};
pub use error::{CoreError, Result};
pub use expiry::{ChainClock, ExpiryPolicy, ExpiryWindow, OrderFlags, DEFAULT_GOOD_TIL_SECS, SHORT_BLOCK_WINDOW};
pub use identity::{subaccount_uuid, OrderIdentity, DEFAULT_ORDER_NAMESPACE};
pub use market::{ChainScale, DydxScale, HyperliquidScale, MarketMeta, USDC_DECIMALS};
pub use order::{
    ClientOrderId, FormattedOrder, OrderKind, OrderRequest, OrderSide, QuantizedOrder,
    TimeInForce, Trigger, TriggerDirection, TriggerKind, ValidatedOrder,
};
pub use precision::{dequantize, quantize, quantize_decimal, Quantized, Rounding};
pub use request::{
    ActionKind, BatchCancelRequest, CancelRequest, LeverageRequest, MarginDirection,
    MarginRequest, ModifyRequest, ModifyTarget, PlacedOrder, TransferRequest, TransferSource,
    TransferTarget, WithdrawRequest, COLLATERAL_SYMBOL,
};
