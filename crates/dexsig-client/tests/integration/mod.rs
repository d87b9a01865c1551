//! Integration tests for dexsig-client.
//!
//! These run whole signing sessions against the in-memory node and exchange:
//! - dYdX place / cancel / transfer through simulation and broadcast
//! - Hyperliquid L1 and user-signed actions through `/exchange`

pub mod common;
