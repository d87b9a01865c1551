//! Application error types.

use dexsig_canon::CanonError;
use dexsig_core::CoreError;
use dexsig_node::NodeError;
use dexsig_signer::SignerError;
use dexsig_telemetry::TelemetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// The validation error underneath, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(e) | Self::Canon(CanonError::Core(e)) => Some(e),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
