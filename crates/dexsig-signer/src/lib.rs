//! Signing for on-chain order actions.
//!
//! - `Credentials`: secp256k1 key, compressed public key, EVM address
//! - `PayloadSigner`: structured-data (EIP-712 phantom agent) or raw-hash
//!   signing, chosen at construction
//! - `TypedMessage`: hand-encoded EIP-712 messages (onboarding, transfers)
//! - `NonceManager` / `SequenceCounter`: replay protection

pub mod error;
pub mod key;
pub mod nonce;
pub mod scheme;
pub mod typed;

pub use error::{Result, SignerError};
pub use key::{Credentials, KeySource};
pub use nonce::{Clock, NonceManager, SequenceCounter, SystemClock};
pub use scheme::{
    sign_digest, HashKind, PayloadSigner, RawHashSigner, SignatureParts, SigningScheme,
    StructuredDataSigner, WireSignature,
};
pub use typed::{
    onboard, onboarding_domain, onboarding_message, sign_typed, usd_send_message,
    user_signed_domain, withdraw_message, Onboarding, TypedMessage, TypedValue,
    USER_SIGNED_CHAIN_ID,
};

// Re-exported so downstream crates name the same primitive types.
pub use alloy::primitives::{Address, B256};
