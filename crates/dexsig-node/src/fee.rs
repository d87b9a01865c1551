//! Gas simulation and fee computation for dYdX transactions.

use dexsig_canon::{Coin, Fee};
use dexsig_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NodeError, NodeResult};
use crate::rpc::NodeRpc;

/// Noble USDC bridged over IBC.
pub const USDC_DENOM: &str = "ibc/8E27BA2D5493AF5636760E354E46004562C46AB7EC0CC4C1CA14E9E20E2545B5";
pub const MAINNET_NATIVE_DENOM: &str = "adydx";
pub const TESTNET_NATIVE_DENOM: &str = "adv4tnt";

/// 0.025 USDC base units per gas.
pub const USDC_GAS_PRICE: Decimal = Decimal::from_parts(25, 0, 0, false, 3);
/// 25 gwei-equivalent of the 18-decimal native token per gas.
pub const NATIVE_GAS_PRICE: Decimal = Decimal::from_parts(0xD21D_BA00, 5, 0, false, 0);
/// 1.6
pub const DEFAULT_GAS_MULTIPLIER: Decimal = Decimal::from_parts(16, 0, 0, false, 1);

/// Token the fee is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeDenom {
    #[default]
    Usdc,
    Native,
}

/// Turns a simulated gas figure into a `Fee`.
#[derive(Debug, Clone)]
pub struct FeeEstimator {
    denom: String,
    gas_price: Decimal,
    multiplier: Decimal,
}

impl FeeEstimator {
    pub fn new(denom: FeeDenom, is_mainnet: bool) -> Self {
        let (denom, gas_price) = match denom {
            FeeDenom::Usdc => (USDC_DENOM, USDC_GAS_PRICE),
            FeeDenom::Native if is_mainnet => (MAINNET_NATIVE_DENOM, NATIVE_GAS_PRICE),
            FeeDenom::Native => (TESTNET_NATIVE_DENOM, NATIVE_GAS_PRICE),
        };
        Self {
            denom: denom.to_string(),
            gas_price,
            multiplier: DEFAULT_GAS_MULTIPLIER,
        }
    }

    pub fn with_multiplier(mut self, multiplier: Decimal) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// `gas_limit = ceil(gas_used * multiplier)`,
    /// `amount = ceil(gas_limit * gas_price)`.
    pub fn fee_for_gas(&self, gas_used: u64) -> NodeResult<Fee> {
        let gas_limit = (Decimal::from(gas_used) * self.multiplier)
            .ceil()
            .to_u64()
            .ok_or_else(|| NodeError::Decode(format!("gas limit for {gas_used} gas overflows u64")))?;
        let amount = (Decimal::from(gas_limit) * self.gas_price)
            .ceil()
            .to_u128()
            .ok_or_else(|| NodeError::Decode(format!("fee for {gas_limit} gas overflows u128")))?;
        Ok(Fee::new(Coin::new(self.denom.clone(), amount), gas_limit))
    }

    /// Simulate `sim_tx` (built with an empty signature) and price the result.
    pub async fn estimate(&self, node: &dyn NodeRpc, sim_tx: Vec<u8>) -> NodeResult<Fee> {
        let simulated = node.simulate(sim_tx).await?;
        let gas_used = simulated
            .gas_used
            .ok_or_else(|| NodeError::exchange("failed to simulate transaction: no gas_used"))?;
        Metrics::gas_used(gas_used);

        let fee = self.fee_for_gas(gas_used)?;
        debug!(
            gas_used,
            gas_limit = fee.gas_limit,
            denom = %self.denom,
            "Estimated fee"
        );
        Ok(fee)
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(FeeDenom::Usdc, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockNode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constants() {
        assert_eq!(USDC_GAS_PRICE, dec!(0.025));
        assert_eq!(NATIVE_GAS_PRICE, dec!(25000000000));
        assert_eq!(DEFAULT_GAS_MULTIPLIER, dec!(1.6));
    }

    #[test]
    fn test_usdc_fee_rounds_up() {
        // 86055 * 1.6 = 137688; 137688 * 0.025 = 3442.2 -> 3443
        let fee = FeeEstimator::default().fee_for_gas(86_055).unwrap();
        assert_eq!(fee.gas_limit, 137_688);
        assert_eq!(fee.amount[0].amount, "3443");
        assert_eq!(fee.amount[0].denom, USDC_DENOM);
    }

    #[test]
    fn test_gas_limit_ceil() {
        // 100001 * 1.6 = 160001.6 -> 160002
        let fee = FeeEstimator::default().fee_for_gas(100_001).unwrap();
        assert_eq!(fee.gas_limit, 160_002);
    }

    #[test]
    fn test_native_denoms() {
        let mainnet = FeeEstimator::new(FeeDenom::Native, true);
        let testnet = FeeEstimator::new(FeeDenom::Native, false);
        assert_eq!(mainnet.denom(), "adydx");
        assert_eq!(testnet.denom(), "adv4tnt");

        let fee = mainnet.fee_for_gas(100_000).unwrap();
        assert_eq!(fee.gas_limit, 160_000);
        assert_eq!(fee.amount[0].amount, "4000000000000000");
    }

    #[test]
    fn test_custom_multiplier() {
        let fee = FeeEstimator::default()
            .with_multiplier(dec!(1))
            .fee_for_gas(1_000)
            .unwrap();
        assert_eq!(fee.gas_limit, 1_000);
        assert_eq!(fee.amount[0].amount, "25");
    }

    #[tokio::test]
    async fn test_estimate_uses_simulation() {
        let node = MockNode::new();
        node.set_gas_used(Some(86_055));
        let fee = FeeEstimator::default().estimate(&node, vec![1, 2, 3]).await.unwrap();
        assert_eq!(fee.gas_limit, 137_688);
        assert_eq!(node.simulated_txs(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_missing_gas_used_is_exchange_error() {
        let node = MockNode::new();
        node.set_gas_used(None);
        match FeeEstimator::default().estimate(&node, vec![]).await.unwrap_err() {
            NodeError::Exchange { message } => assert!(message.contains("simulate")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
