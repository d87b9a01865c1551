//! Shared configuration, key and clock for session tests.

use dexsig_client::AppConfig;
use dexsig_core::{DydxScale, MarketMeta};
use dexsig_signer::{Clock, Credentials};

pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const DYDX_OWNER: &str = "dydx15428vq2uzwhm3taey9sr9x5vm6tk78ewsdmmww";

/// 2023-11-14T22:13:20Z
pub const NOW_MS: u64 = 1_700_000_000_000;

const CONFIG: &str = r#"
[network]
testnet = true

[dydx]
address = "dydx15428vq2uzwhm3taey9sr9x5vm6tk78ewsdmmww"

[[markets]]
symbol = "BTC-USD"
pair_id = 0
tick_size = "1"
step_size = "0.0001"

[markets.scale]
chain = "dydx"
atomic_resolution = -10
quantum_conversion_exponent = -9
step_base_quantums = 1000000
subticks_per_tick = 100000

[[markets]]
symbol = "ETH"
pair_id = 1
tick_size = "0.1"
step_size = "0.0001"

[markets.scale]
chain = "hyperliquid"
sz_decimals = 4
max_sig_figs = 5
max_price_decimals = 2
"#;

pub fn config() -> AppConfig {
    AppConfig::from_toml(CONFIG).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials::from_hex(TEST_KEY, None).unwrap()
}

pub fn btc_scale() -> DydxScale {
    DydxScale {
        atomic_resolution: -10,
        quantum_conversion_exponent: -9,
        step_base_quantums: 1_000_000,
        subticks_per_tick: 100_000,
    }
}

pub fn eth_market() -> MarketMeta {
    config()
        .markets
        .into_iter()
        .find(|m| m.symbol == "ETH")
        .unwrap()
}

/// Clock that never moves.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}
