//! Error types for dexsig-canon.

use dexsig_core::CoreError;
use dexsig_signer::SignerError;
use thiserror::Error;

/// Canonicalization and envelope errors.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl From<rmp_serde::encode::Error> for CanonError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<serde_json::Error> for CanonError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

/// Result type alias for canon operations.
pub type Result<T> = std::result::Result<T, CanonError>;
