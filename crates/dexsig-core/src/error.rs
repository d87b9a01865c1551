//! Error types for dexsig-core.

use thiserror::Error;

/// Core error types.
///
/// `BadRequest`, `ArgumentsRequired`, `InvalidOrder`, `NotSupported` and
/// `InvalidDecimal` are raised before any network or cryptographic work and
/// are always fixable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Arguments required: {0}")]
    ArgumentsRequired(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("Numeric overflow: {0}")]
    Overflow(String),
}

impl CoreError {
    /// True for errors caused by caller input.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Overflow(_))
    }

    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::ArgumentsRequired(_) => "arguments_required",
            Self::InvalidOrder(_) => "invalid_order",
            Self::NotSupported(_) => "not_supported",
            Self::InvalidDecimal(_) => "invalid_decimal",
            Self::Overflow(_) => "overflow",
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
