//! Chain-native encoding of validated requests.
//!
//! - `DydxCanonicalizer`: protobuf messages for the dYdX v4 cosmos chain
//! - `HyperliquidCanonicalizer`: msgpack-hashed actions for Hyperliquid
//! - `CosmosTxBuilder`: `TxBody` / `AuthInfo` / `SignDoc` / `TxRaw`
//! - `sign_cosmos`, `sign_l1_action`, `sign_user_action`: signed envelopes

pub mod action;
pub mod cosmos;
pub mod dydx;
pub mod envelope;
pub mod error;
pub mod hyperliquid;
pub mod proto;

pub use action::{ActionBody, ChainAction};
pub use cosmos::{Any, Coin, CosmosTxBuilder, Fee, SignDoc, TxRaw, UnsignedTx};
pub use dydx::{DydxCanonicalizer, DydxMsg};
pub use envelope::{
    sign_cosmos, sign_l1_action, sign_user_action, simulation_tx, AccountParams, CosmosEnvelope,
    HyperliquidEnvelope, SignedEnvelope,
};
pub use error::{CanonError, Result};
pub use hyperliquid::{Action, HyperliquidCanonicalizer, SigningInput};
