//! Signing sessions for dYdX v4 and Hyperliquid.
//!
//! Wires the pipeline crates together:
//! - `AppConfig`: TOML configuration
//! - `DydxSession`: cosmos transactions with fee simulation and account
//!   sequence tracking
//! - `HyperliquidSession`: phantom-agent L1 actions and user-signed transfers

pub mod config;
pub mod error;
pub mod session;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{DydxSession, HyperliquidSession, Markets, OrderOutcome, PlacedOrders};
