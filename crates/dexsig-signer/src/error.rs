//! Error types for dexsig-signer.

use alloy::primitives::Address;
use thiserror::Error;

/// Key handling and signing errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("Cosmos address mismatch: configured {configured}, key derives {derived}")]
    CosmosAddressMismatch { configured: String, derived: String },

    #[error("Invalid bech32 prefix {0:?}")]
    InvalidPrefix(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Time drift too large: {0}ms")]
    TimeDriftTooLarge(i64),
}

/// Result type alias for signer operations.
pub type Result<T> = std::result::Result<T, SignerError>;
