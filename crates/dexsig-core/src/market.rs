//! Market metadata consumed by the signing pipeline.
//!
//! Metadata is fetched elsewhere and handed in read-only. Each chain carries
//! its own scale parameters:
//! - dYdX expresses sizes in quantums and prices in subticks, both derived
//!   from `atomic_resolution` and `quantum_conversion_exponent`.
//! - Hyperliquid takes decimal strings limited by `sz_decimals` and a
//!   significant-figure budget.

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use crate::order::OrderSide;
use crate::precision::{quantize_decimal, Quantized, Rounding};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// USDC base units per USDC (the quote and collateral asset on both chains).
pub const USDC_DECIMALS: i32 = 6;

/// Hyperliquid default maximum significant figures.
pub const HYPERLIQUID_MAX_SIG_FIGS: u8 = 5;

fn default_max_sig_figs() -> u8 {
    HYPERLIQUID_MAX_SIG_FIGS
}

/// Read-only description of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMeta {
    /// Symbol as the caller refers to it (e.g. "BTC-USD", "ETH").
    pub symbol: String,

    /// dYdX clob pair id, or Hyperliquid asset index.
    pub pair_id: u32,

    /// Minimum price increment.
    pub tick_size: Price,

    /// Minimum size increment.
    pub step_size: Size,

    /// Chain-specific scale parameters.
    pub scale: ChainScale,
}

impl MarketMeta {
    pub fn dydx_scale(&self) -> Result<&DydxScale> {
        match &self.scale {
            ChainScale::Dydx(scale) => Ok(scale),
            ChainScale::Hyperliquid(_) => Err(CoreError::BadRequest(format!(
                "{} is not a dYdX market",
                self.symbol
            ))),
        }
    }

    pub fn hyperliquid_scale(&self) -> Result<&HyperliquidScale> {
        match &self.scale {
            ChainScale::Hyperliquid(scale) => Ok(scale),
            ChainScale::Dydx(_) => Err(CoreError::BadRequest(format!(
                "{} is not a Hyperliquid market",
                self.symbol
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "snake_case")]
pub enum ChainScale {
    Dydx(DydxScale),
    Hyperliquid(HyperliquidScale),
}

/// dYdX v4 perpetual market parameters (from the indexer `perpetualMarkets`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DydxScale {
    pub atomic_resolution: i32,
    pub quantum_conversion_exponent: i32,
    pub step_base_quantums: u64,
    pub subticks_per_tick: u32,
}

impl DydxScale {
    /// quantums = size * 10^amount_exponent
    pub fn amount_exponent(&self) -> i32 {
        -self.atomic_resolution
    }

    /// subticks = price * 10^price_exponent
    pub fn price_exponent(&self) -> i32 {
        self.atomic_resolution - self.quantum_conversion_exponent + USDC_DECIMALS
    }

    /// Size in quantums, truncated to a multiple of `step_base_quantums`.
    pub fn quantize_size(&self, size: Size) -> Result<Quantized> {
        quantize_decimal(size.inner(), self.amount_exponent(), Rounding::Down)?
            .snap(u128::from(self.step_base_quantums), Rounding::Down)
    }

    /// Price in subticks, snapped to `subticks_per_tick` on the passive side.
    pub fn quantize_price(&self, price: Price, side: OrderSide) -> Result<Quantized> {
        let rounding = Rounding::passive(side);
        quantize_decimal(price.inner(), self.price_exponent(), rounding)?
            .snap(u128::from(self.subticks_per_tick), rounding)
    }
}

/// Hyperliquid perpetual precision parameters (from `meta`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperliquidScale {
    /// Size decimals (`szDecimals`).
    pub sz_decimals: u8,

    #[serde(default = "default_max_sig_figs")]
    pub max_sig_figs: u8,

    /// Perps allow `6 - szDecimals` price decimals.
    pub max_price_decimals: u8,
}

impl HyperliquidScale {
    /// Format size for the order wire: down to the lot step and
    /// `sz_decimals`. The significant-figure limit applies to prices only.
    pub fn format_size(&self, size: Size, step_size: Size) -> String {
        let stepped = size.round_to_lot(step_size).inner();
        let rounded = stepped.round_dp_with_strategy(u32::from(self.sz_decimals), RoundingStrategy::ToZero);
        format_without_trailing_zeros(rounded)
    }

    /// Format a limit or trigger price for the order wire.
    ///
    /// Rounds on the passive side (buy down, sell up) so the submitted limit
    /// is never worse than the requested one.
    pub fn format_price(&self, price: Price, side: OrderSide, tick_size: Price) -> Result<String> {
        let rounding = Rounding::passive(side);
        let ticked = match rounding {
            Rounding::Up => price.ceil_to_tick(tick_size),
            _ => price.floor_to_tick(tick_size),
        };
        let rounded = round_to_constraints(
            ticked.inner(),
            self.max_sig_figs,
            self.max_price_decimals,
            rounding,
        )?;
        Ok(format_without_trailing_zeros(rounded))
    }
}

/// Round to at most `max_sig_figs` significant figures and `max_decimals`
/// decimal places.
fn round_to_constraints(value: Decimal, max_sig_figs: u8, max_decimals: u8, rounding: Rounding) -> Result<Decimal> {
    if value.is_zero() || max_sig_figs == 0 {
        return Ok(Decimal::ZERO);
    }
    let by_sig_figs = i32::from(max_sig_figs) - magnitude(value) - 1;
    let scale = by_sig_figs.min(i32::from(max_decimals));
    round_at_scale(value, scale, rounding)
}

/// Order of magnitude of a nonzero decimal.
/// 12345 -> 4, 1234.5 -> 3, 0.123 -> -1, 0.00123 -> -3
fn magnitude(value: Decimal) -> i32 {
    let digits = value.mantissa().unsigned_abs().to_string().len() as i32;
    digits - value.scale() as i32 - 1
}

/// Negative scales round to a multiple of `10^-scale`.
fn round_at_scale(value: Decimal, scale: i32, rounding: Rounding) -> Result<Decimal> {
    let strategy = match rounding {
        Rounding::Down => RoundingStrategy::ToZero,
        Rounding::Up => RoundingStrategy::AwayFromZero,
        Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
    };
    if scale >= 0 {
        return Ok(value.round_dp_with_strategy(scale as u32, strategy));
    }
    let overflow = || CoreError::Overflow(format!("cannot round {value} at scale {scale}"));
    let factor = 10i128
        .checked_pow(scale.unsigned_abs())
        .and_then(|f| Decimal::try_from_i128_with_scale(f, 0).ok())
        .ok_or_else(overflow)?;
    value
        .checked_div(factor)
        .and_then(|units| units.round_dp_with_strategy(0, strategy).checked_mul(factor))
        .ok_or_else(overflow)
}

/// Format decimal without trailing zeros after decimal point.
fn format_without_trailing_zeros(value: Decimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usd() -> DydxScale {
        DydxScale {
            atomic_resolution: -10,
            quantum_conversion_exponent: -9,
            step_base_quantums: 1_000_000,
            subticks_per_tick: 100_000,
        }
    }

    fn hl(max_price_decimals: u8) -> HyperliquidScale {
        HyperliquidScale {
            sz_decimals: 3,
            max_sig_figs: 5,
            max_price_decimals,
        }
    }

    #[test]
    fn test_dydx_exponents() {
        let scale = btc_usd();
        assert_eq!(scale.amount_exponent(), 10);
        assert_eq!(scale.price_exponent(), 5);
    }

    #[test]
    fn test_dydx_quantize_size_truncates_to_step() {
        let scale = btc_usd();
        let q = scale.quantize_size(Size::new(dec!(0.01))).unwrap();
        assert_eq!(q.value(), 100_000_000);

        // 0.01234567 BTC = 123_456_700 quantums, stepped down to 123_000_000
        let q = scale.quantize_size(Size::new(dec!(0.01234567))).unwrap();
        assert_eq!(q.value(), 123_000_000);
    }

    #[test]
    fn test_dydx_quantize_price_passive() {
        let scale = btc_usd();
        // one tick is 100_000 subticks = $1
        let buy = scale
            .quantize_price(Price::new(dec!(50000.7)), OrderSide::Buy)
            .unwrap();
        let sell = scale
            .quantize_price(Price::new(dec!(50000.7)), OrderSide::Sell)
            .unwrap();
        assert_eq!(buy.value(), 5_000_000_000);
        assert_eq!(sell.value(), 5_000_100_000);
    }

    #[test]
    fn test_format_price_sig_figs() {
        let scale = hl(4);
        let tick = Price::new(dec!(0.0001));
        let buy = |p| scale.format_price(Price::new(p), OrderSide::Buy, tick).unwrap();

        assert_eq!(buy(dec!(123456.789)), "123450");
        assert_eq!(buy(dec!(12345.6789)), "12345");
        assert_eq!(buy(dec!(1234.5678)), "1234.5");
        assert_eq!(buy(dec!(123.45678)), "123.45");
        assert_eq!(buy(dec!(12.345678)), "12.345");
        assert_eq!(buy(dec!(1.2345678)), "1.2345");
    }

    #[test]
    fn test_format_price_passive_direction() {
        let scale = hl(2);
        let tick = Price::new(dec!(0.01));

        assert_eq!(scale.format_price(Price::new(dec!(100.001)), OrderSide::Buy, tick).unwrap(), "100");
        assert_eq!(scale.format_price(Price::new(dec!(100.001)), OrderSide::Sell, tick).unwrap(), "100.01");
        assert_eq!(scale.format_price(Price::new(dec!(1234.56)), OrderSide::Sell, tick).unwrap(), "1234.6");
        assert_eq!(scale.format_price(Price::new(dec!(123.45)), OrderSide::Sell, tick).unwrap(), "123.45");
    }

    #[test]
    fn test_format_price_small_values() {
        let scale = hl(8);
        let tick = Price::new(dec!(0.00000001));
        let buy = |p| scale.format_price(Price::new(p), OrderSide::Buy, tick).unwrap();

        assert_eq!(buy(dec!(0.00001234)), "0.00001234");
        assert_eq!(buy(dec!(0.0000123456)), "0.00001234");
    }

    #[test]
    fn test_format_size() {
        let scale = hl(3);
        let step = Size::new(dec!(0.001));

        assert_eq!(scale.format_size(Size::new(dec!(1.2345)), step), "1.234");
        assert_eq!(scale.format_size(Size::new(dec!(12.345)), step), "12.345");
        assert_eq!(scale.format_size(Size::new(dec!(123.456)), step), "123.456");
        assert_eq!(scale.format_size(Size::new(dec!(123456.7891)), step), "123456.789");
        assert_eq!(scale.format_size(Size::new(dec!(1.100)), step), "1.1");
        assert_eq!(scale.format_size(Size::new(dec!(1.0)), step), "1");
    }

    #[test]
    fn test_format_size_large_integer() {
        let scale = HyperliquidScale {
            sz_decimals: 0,
            max_sig_figs: 5,
            max_price_decimals: 6,
        };
        assert_eq!(scale.format_size(Size::new(dec!(123456)), Size::new(dec!(1))), "123456");
        assert_eq!(scale.format_size(Size::new(dec!(123456.9)), Size::new(dec!(1))), "123456");
    }

    #[test]
    fn test_format_zero() {
        let scale = hl(2);
        assert_eq!(scale.format_size(Size::ZERO, Size::new(dec!(0.001))), "0");
        assert_eq!(scale.format_price(Price::ZERO, OrderSide::Buy, Price::new(dec!(0.01))).unwrap(), "0");
    }

    #[test]
    fn test_round_at_scale_out_of_range_is_overflow() {
        assert_eq!(round_at_scale(dec!(123456), -2, Rounding::Down).unwrap(), dec!(123400));
        assert!(matches!(
            round_at_scale(dec!(123456), -30, Rounding::Down),
            Err(CoreError::Overflow(_))
        ));
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(magnitude(dec!(12345)), 4);
        assert_eq!(magnitude(dec!(1234.5)), 3);
        assert_eq!(magnitude(dec!(100.00)), 2);
        assert_eq!(magnitude(dec!(0.123)), -1);
        assert_eq!(magnitude(dec!(0.00123)), -3);
    }

    #[test]
    fn test_market_meta_scale_accessors() {
        let meta = MarketMeta {
            symbol: "BTC-USD".to_string(),
            pair_id: 0,
            tick_size: Price::new(dec!(1)),
            step_size: Size::new(dec!(0.0001)),
            scale: ChainScale::Dydx(btc_usd()),
        };
        assert!(meta.dydx_scale().is_ok());
        assert!(matches!(meta.hyperliquid_scale(), Err(CoreError::BadRequest(_))));
    }

    #[test]
    fn test_market_meta_from_toml_shape() {
        let json = r#"{
            "symbol": "ETH",
            "pair_id": 1,
            "tick_size": "0.1",
            "step_size": "0.0001",
            "scale": { "chain": "hyperliquid", "sz_decimals": 4, "max_price_decimals": 2 }
        }"#;
        let meta: MarketMeta = serde_json::from_str(json).unwrap();
        let scale = meta.hyperliquid_scale().unwrap();
        assert_eq!(scale.max_sig_figs, HYPERLIQUID_MAX_SIG_FIGS);
        assert_eq!(scale.sz_decimals, 4);
    }
}
