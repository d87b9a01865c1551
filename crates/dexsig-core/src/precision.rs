//! Conversion between human decimal values and integer chain units.
//!
//! A chain stores amounts as integer counts of a base unit (quantums,
//! subticks, micro-USDC). `exponent` is the number of powers of ten that
//! separate one human unit from one base unit:
//!
//! ```text
//! units = value * 10^exponent
//! ```
//!
//! Arithmetic is done on the decimal mantissa with checked `u128` math, so a
//! result is either exact (after the declared rounding) or an error.

use crate::decimal::parse_decimal;
use crate::error::{CoreError, Result};
use crate::order::OrderSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest power of ten representable in `u128`.
const MAX_POW10: u32 = 38;

/// Rounding applied when a value is not an exact multiple of the base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Toward zero. Used for all amounts.
    Down,
    /// Away from zero.
    Up,
    /// Nearest, ties away from zero.
    HalfUp,
}

impl Rounding {
    /// Price rounding that never makes a limit worse for the caller:
    /// buys round down, sells round up.
    pub fn passive(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Self::Down,
            OrderSide::Sell => Self::Up,
        }
    }
}

/// Integer count of a chain's base unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantized(u128);

impl Quantized {
    pub const ZERO: Self = Self(0);

    pub fn new(units: u128) -> Self {
        Self(units)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Narrow to a `uint64` wire field.
    pub fn to_u64(&self) -> Result<u64> {
        u64::try_from(self.0)
            .map_err(|_| CoreError::Overflow(format!("{} does not fit in uint64", self.0)))
    }

    /// Narrow to a `uint32` wire field.
    pub fn to_u32(&self) -> Result<u32> {
        u32::try_from(self.0)
            .map_err(|_| CoreError::Overflow(format!("{} does not fit in uint32", self.0)))
    }

    /// Round to a multiple of `step`. A zero step leaves the value unchanged.
    pub fn snap(&self, step: u128, rounding: Rounding) -> Result<Self> {
        if step <= 1 {
            return Ok(*self);
        }
        let quotient = divide(self.0, step, rounding);
        quotient
            .checked_mul(step)
            .map(Self)
            .ok_or_else(|| CoreError::Overflow(format!("{} snapped to step {step}", self.0)))
    }
}

impl fmt::Display for Quantized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantize a decimal string. See [`quantize_decimal`].
pub fn quantize(value: &str, exponent: i32, rounding: Rounding) -> Result<Quantized> {
    quantize_decimal(parse_decimal(value)?, exponent, rounding)
}

/// Convert `value` into integer base units: `value * 10^exponent`.
///
/// Negative values are rejected. Zero passes through as zero. Digits below
/// the base unit are resolved by `rounding`.
pub fn quantize_decimal(value: Decimal, exponent: i32, rounding: Rounding) -> Result<Quantized> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::BadRequest(format!(
            "value must not be negative: {value}"
        )));
    }
    let mantissa = value.mantissa().unsigned_abs();
    let shift = i64::from(exponent) - i64::from(value.scale());

    if shift >= 0 {
        let factor = pow10(shift as u64).ok_or_else(|| overflow(value, exponent))?;
        return mantissa
            .checked_mul(factor)
            .map(Quantized)
            .ok_or_else(|| overflow(value, exponent));
    }

    let digits = shift.unsigned_abs();
    match pow10(digits) {
        Some(divisor) => Ok(Quantized(divide(mantissa, divisor, rounding))),
        // Divisor exceeds any u128 mantissa, so the quotient is 0 and the
        // remainder is below half a unit.
        None => Ok(Quantized(match rounding {
            Rounding::Up if mantissa > 0 => 1,
            _ => 0,
        })),
    }
}

/// Convert integer base units back into a human decimal: `units / 10^exponent`.
pub fn dequantize(units: Quantized, exponent: i32) -> Result<Decimal> {
    let raw = units.value();
    let out_of_range =
        || CoreError::Overflow(format!("{raw} units at exponent {exponent} exceed decimal range"));

    let (mantissa, scale) = if exponent >= 0 {
        (raw, exponent as u32)
    } else {
        let factor = pow10(u64::from(exponent.unsigned_abs())).ok_or_else(out_of_range)?;
        (raw.checked_mul(factor).ok_or_else(out_of_range)?, 0)
    };
    let signed = i128::try_from(mantissa).map_err(|_| out_of_range())?;
    Decimal::try_from_i128_with_scale(signed, scale)
        .map(|d| d.normalize())
        .map_err(|_| out_of_range())
}

fn pow10(n: u64) -> Option<u128> {
    if n > u64::from(MAX_POW10) {
        return None;
    }
    10u128.checked_pow(n as u32)
}

fn divide(numerator: u128, divisor: u128, rounding: Rounding) -> u128 {
    let quotient = numerator / divisor;
    let remainder = numerator % divisor;
    if remainder == 0 {
        return quotient;
    }
    match rounding {
        Rounding::Down => quotient,
        Rounding::Up => quotient + 1,
        Rounding::HalfUp => {
            // remainder < divisor <= 10^38, so doubling stays below u128::MAX
            if remainder * 2 >= divisor {
                quotient + 1
            } else {
                quotient
            }
        }
    }
}

fn overflow(value: Decimal, exponent: i32) -> CoreError {
    CoreError::Overflow(format!("{value} * 10^{exponent} exceeds uint128"))
}
