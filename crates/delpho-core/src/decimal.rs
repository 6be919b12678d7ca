//! Precision-safe decimal types for trading.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Contract arguments are
//! scaled integers, so every conversion out of `Decimal` truncates toward
//! zero and never rounds up.

use crate::error::{CoreError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};
use std::str::FromStr;

/// Largest scale accepted by [`to_units`]; 10^18 still fits in a `u64`.
pub const MAX_UNIT_DECIMALS: u32 = 18;

/// Truncate `value` to `dp` decimal places (toward zero).
#[inline]
pub fn truncate_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Scale `value` by `10^decimals` and truncate to an unsigned integer.
///
/// Equivalent of `parseUnits` for on-chain arguments, except excess
/// precision is cut instead of rejected.
pub fn to_units(value: Decimal, decimals: u32) -> Result<u64> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CoreError::Overflow(format!(
            "negative value {value} cannot be scaled to units"
        )));
    }
    if decimals > MAX_UNIT_DECIMALS {
        return Err(CoreError::Overflow(format!(
            "{decimals} decimals exceeds the supported maximum of {MAX_UNIT_DECIMALS}"
        )));
    }
    let scale = Decimal::from(10u64.pow(decimals));
    value
        .checked_mul(scale)
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| CoreError::Overflow(format!("{value} x 10^{decimals} does not fit in u64")))
}

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate to `dp` decimal places. Never rounds up.
    #[inline]
    pub fn truncate_to_decimals(&self, dp: u32) -> Self {
        Self(truncate_dp(self.0, dp))
    }

    /// Scaled integer for contract arguments.
    pub fn to_units(&self, decimals: u32) -> Result<u64> {
        to_units(self.0, decimals)
    }

    /// Calculate basis points difference from another price.
    #[inline]
    pub fn bps_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::from(10000))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// Size/quantity with exact decimal precision.
///
/// Used both for order sizes (base asset) and transfer amounts (quote asset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Truncate to `dp` decimal places so an order never oversizes.
    #[inline]
    pub fn truncate_to_decimals(&self, dp: u32) -> Self {
        Self(truncate_dp(self.0, dp))
    }

    /// Scaled integer for contract arguments.
    pub fn to_units(&self, decimals: u32) -> Result<u64> {
        to_units(self.0, decimals)
    }

    /// Calculate notional value: size * price.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Size {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Size {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_truncate_never_rounds_up() {
        let price = Price::new(dec!(0.98509));
        assert_eq!(price.truncate_to_decimals(4).0, dec!(0.985));

        let size = Size::new(dec!(1.99999));
        assert_eq!(size.truncate_to_decimals(2).0, dec!(1.99));
    }

    #[test]
    fn test_to_units_truncates() {
        assert_eq!(to_units(dec!(1.5), 6).unwrap(), 1_500_000);
        assert_eq!(to_units(dec!(0.123456789), 6).unwrap(), 123_456);
        assert_eq!(to_units(dec!(0), 8).unwrap(), 0);
    }

    #[test]
    fn test_to_units_rejects_negative_and_overflow() {
        assert!(to_units(dec!(-1), 6).is_err());
        assert!(to_units(dec!(1), 19).is_err());
        assert!(to_units(dec!(100000000000000), 8).is_err());
    }

    #[test]
    fn test_price_bps() {
        let p1 = Price::new(dec!(100));
        let p2 = Price::new(dec!(101));

        let bps = p2.bps_from(p1).unwrap();
        assert_eq!(bps, dec!(100));
    }

    #[test]
    fn test_notional_calculation() {
        let size = Size::new(dec!(0.5));
        let price = Price::new(dec!(40));

        assert_eq!(size.notional(price), dec!(20));
    }
}
