//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::Address;
use dexsig_core::{MarketMeta, DEFAULT_GOOD_TIL_SECS};
use dexsig_node::FeeDenom;
use dexsig_signer::KeySource;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DEFAULT_KEY_VAR: &str = "DEXSIG_PRIVATE_KEY";

const DYDX_MAINNET_RPC: &str = "https://dydx-ops-rpc.kingnodes.com";
const DYDX_MAINNET_REST: &str = "https://dydx-ops-rest.kingnodes.com";
const DYDX_TESTNET_RPC: &str = "https://dydx-testnet-rpc.polkachu.com";
const DYDX_TESTNET_REST: &str = "https://dydx-testnet-api.polkachu.com";

/// Top-level configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub dydx: DydxConfig,

    #[serde(default)]
    pub hyperliquid: HyperliquidConfig,

    #[serde(default)]
    pub key: KeyConfig,

    #[serde(default)]
    pub markets: Vec<MarketMeta>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn is_mainnet(&self) -> bool {
        !self.network.testnet
    }
}

// =============================================================================
// [network]
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_testnet")]
    pub testnet: bool,

    /// CometBFT JSON-RPC endpoint. Defaults per network.
    #[serde(default)]
    pub dydx_rpc_url: Option<String>,

    /// Cosmos REST endpoint. Defaults per network.
    #[serde(default)]
    pub dydx_rest_url: Option<String>,

    /// Hyperliquid API base URL. Defaults per network.
    #[serde(default)]
    pub hyperliquid_api_url: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_testnet() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            testnet: default_testnet(),
            dydx_rpc_url: None,
            dydx_rest_url: None,
            hyperliquid_api_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn dydx_rpc_url(&self) -> &str {
        match &self.dydx_rpc_url {
            Some(url) => url,
            None if self.testnet => DYDX_TESTNET_RPC,
            None => DYDX_MAINNET_RPC,
        }
    }

    pub fn dydx_rest_url(&self) -> &str {
        match &self.dydx_rest_url {
            Some(url) => url,
            None if self.testnet => DYDX_TESTNET_REST,
            None => DYDX_MAINNET_REST,
        }
    }

    pub fn hyperliquid_api_url(&self) -> &str {
        match &self.hyperliquid_api_url {
            Some(url) => url,
            None => dexsig_node::api_url(!self.testnet),
        }
    }
}

// =============================================================================
// [dydx]
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DydxConfig {
    /// Bech32 `dydx1...` address of the signing wallet.
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub subaccount: u32,

    #[serde(default)]
    pub fee_denom: FeeDenom,

    #[serde(default = "default_gas_multiplier")]
    pub gas_multiplier: Decimal,

    /// Lifetime of long-term and conditional orders.
    #[serde(default = "default_good_til_secs")]
    pub good_til_secs: u64,

    /// UUID namespace for order identities.
    #[serde(default)]
    pub order_namespace: Option<Uuid>,

    /// Order router address; an empty string omits the field.
    #[serde(default)]
    pub router_address: Option<String>,

    #[serde(default)]
    pub memo: String,
}

fn default_gas_multiplier() -> Decimal {
    dexsig_node::fee::DEFAULT_GAS_MULTIPLIER
}

fn default_good_til_secs() -> u64 {
    DEFAULT_GOOD_TIL_SECS
}

impl Default for DydxConfig {
    fn default() -> Self {
        Self {
            address: None,
            subaccount: 0,
            fee_denom: FeeDenom::default(),
            gas_multiplier: default_gas_multiplier(),
            good_til_secs: default_good_til_secs(),
            order_namespace: None,
            router_address: None,
            memo: String::new(),
        }
    }
}

impl DydxConfig {
    pub fn address(&self) -> AppResult<&str> {
        self.address
            .as_deref()
            .ok_or_else(|| AppError::Config("[dydx] address is required".to_string()))
    }
}

// =============================================================================
// [hyperliquid]
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidConfig {
    /// Trade on behalf of a vault or subaccount.
    #[serde(default)]
    pub vault_address: Option<String>,

    /// Market orders are sent as IOC limits this far through the given price.
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,

    /// When set, actions expire this many milliseconds after their nonce.
    #[serde(default)]
    pub expires_after_ms: Option<u64>,
}

fn default_slippage() -> Decimal {
    Decimal::new(5, 2)
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            vault_address: None,
            slippage: default_slippage(),
            expires_after_ms: None,
        }
    }
}

impl HyperliquidConfig {
    pub fn vault_address(&self) -> AppResult<Option<Address>> {
        self.vault_address
            .as_deref()
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| AppError::Config(format!("invalid vault_address {s}: {e}")))
            })
            .transpose()
    }
}

// =============================================================================
// [key]
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    #[default]
    Env,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default)]
    pub source: KeyKind,

    /// Environment variable holding the hex key (`source = "env"`).
    #[serde(default = "default_key_var")]
    pub var: String,

    /// Key file path (`source = "file"`).
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Refuse to start if the key derives a different EVM address.
    #[serde(default)]
    pub expected_address: Option<String>,
}

fn default_key_var() -> String {
    DEFAULT_KEY_VAR.to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            source: KeyKind::Env,
            var: default_key_var(),
            path: None,
            expected_address: None,
        }
    }
}

impl KeyConfig {
    pub fn key_source(&self) -> AppResult<KeySource> {
        match self.source {
            KeyKind::Env => Ok(KeySource::EnvVar {
                var_name: self.var.clone(),
            }),
            KeyKind::File => {
                let path = self
                    .path
                    .clone()
                    .ok_or_else(|| AppError::Config("[key] path is required for source = \"file\"".to_string()))?;
                Ok(KeySource::File { path })
            }
        }
    }

    pub fn expected_address(&self) -> AppResult<Option<Address>> {
        self.expected_address
            .as_deref()
            .map(|s| {
                s.parse::<Address>()
                    .map_err(|e| AppError::Config(format!("invalid expected_address {s}: {e}")))
            })
            .transpose()
    }
}
