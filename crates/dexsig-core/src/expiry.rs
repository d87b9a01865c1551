//! Order-flag classes and expiry windows.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocks a short-term order may stay valid past the latest height.
pub const SHORT_BLOCK_WINDOW: u32 = 20;

/// Default lifetime of long-term and conditional orders (30 days).
pub const DEFAULT_GOOD_TIL_SECS: u64 = 30 * 24 * 60 * 60;

/// Order-flag class. Selects the expiry field and the cancel route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum OrderFlags {
    /// Market and IOC orders, expiring by block height.
    ShortTerm,
    /// Conditional (trigger) orders.
    Conditional,
    /// Resting limit orders.
    LongTerm,
}

impl OrderFlags {
    pub fn value(&self) -> u32 {
        match self {
            Self::ShortTerm => 0,
            Self::Conditional => 32,
            Self::LongTerm => 64,
        }
    }

    pub fn is_short_term(&self) -> bool {
        matches!(self, Self::ShortTerm)
    }
}

impl TryFrom<u32> for OrderFlags {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::ShortTerm),
            32 => Ok(Self::Conditional),
            64 => Ok(Self::LongTerm),
            other => Err(CoreError::InvalidOrder(format!(
                "order flags must be 0, 32 or 64, got {other}"
            ))),
        }
    }
}

impl From<OrderFlags> for u32 {
    fn from(flags: OrderFlags) -> Self {
        flags.value()
    }
}

impl fmt::Display for OrderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Validity window of an order or cancel. Exactly one branch exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryWindow {
    /// Last block height at which the message is valid.
    GoodTilBlock(u32),
    /// Unix seconds after which the message is invalid.
    GoodTilBlockTime(u32),
}

impl ExpiryWindow {
    pub fn good_til_block(&self) -> Option<u32> {
        match self {
            Self::GoodTilBlock(h) => Some(*h),
            Self::GoodTilBlockTime(_) => None,
        }
    }

    pub fn good_til_block_time(&self) -> Option<u32> {
        match self {
            Self::GoodTilBlockTime(t) => Some(*t),
            Self::GoodTilBlock(_) => None,
        }
    }
}

/// Chain-state inputs for an expiry computation.
///
/// `latest_block_height` must come from a fresh `abci_info` call made just
/// before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainClock {
    pub latest_block_height: u32,
    pub now_seconds: u64,
}

/// Computes expiry windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    short_block_window: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            short_block_window: SHORT_BLOCK_WINDOW,
        }
    }
}

impl ExpiryPolicy {
    pub fn new(short_block_window: u32) -> Self {
        Self { short_block_window }
    }

    /// Compute the window for `flags`.
    ///
    /// - short-term: `explicit_good_til_block`, or latest + window. An
    ///   explicit block must lie in `(latest, latest + window]`.
    /// - long-term / conditional: `now + good_til_secs`. Requires positive
    ///   seconds and forbids an explicit block.
    pub fn compute(
        &self,
        flags: OrderFlags,
        clock: ChainClock,
        good_til_secs: Option<u64>,
        explicit_good_til_block: Option<u32>,
    ) -> Result<ExpiryWindow> {
        match flags {
            OrderFlags::ShortTerm => self.short_term(clock.latest_block_height, explicit_good_til_block),
            OrderFlags::LongTerm | OrderFlags::Conditional => {
                if let Some(block) = explicit_good_til_block.filter(|b| *b > 0) {
                    return Err(CoreError::InvalidOrder(format!(
                        "good_til_block {block} cannot be used with order flags {flags}"
                    )));
                }
                let secs = good_til_secs.filter(|s| *s > 0).ok_or_else(|| {
                    CoreError::ArgumentsRequired(format!(
                        "order flags {flags} require a positive good_til_secs"
                    ))
                })?;
                let deadline = clock
                    .now_seconds
                    .checked_add(secs)
                    .and_then(|t| u32::try_from(t).ok())
                    .ok_or_else(|| {
                        CoreError::Overflow(format!(
                            "expiry {} + {secs} does not fit in uint32 seconds",
                            clock.now_seconds
                        ))
                    })?;
                Ok(ExpiryWindow::GoodTilBlockTime(deadline))
            }
        }
    }

    fn short_term(&self, latest: u32, explicit: Option<u32>) -> Result<ExpiryWindow> {
        let max = latest.checked_add(self.short_block_window).ok_or_else(|| {
            CoreError::Overflow(format!("block height {latest} + {}", self.short_block_window))
        })?;
        match explicit {
            None => Ok(ExpiryWindow::GoodTilBlock(max)),
            Some(block) if block > latest && block <= max => Ok(ExpiryWindow::GoodTilBlock(block)),
            Some(block) => Err(CoreError::InvalidOrder(format!(
                "good_til_block {block} must be within ({latest}, {max}] for short-term orders"
            ))),
        }
    }
}
