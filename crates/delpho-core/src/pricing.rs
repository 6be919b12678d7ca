//! Slippage-adjusted pricing and minimum order sizing.
//!
//! Pure, synchronous helpers shared by the trade wizard and the loop-cycle
//! sequencer. Nothing here touches the network.

use crate::constants::MIN_ORDER_NOTIONAL;
use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mid-price adjusted by a slippage tolerance in the direction of the trade.
///
/// - aggressive (buy / long): `mid * (1 + slippage)`
/// - passive (sell / short): `mid * (1 - slippage)`
///
/// The result is truncated to `price_decimals`, so the submitted limit never
/// sits further from mid than the tolerance allows.
pub fn price_with_slippage(
    mid: Price,
    slippage: Decimal,
    aggressive: bool,
    price_decimals: u32,
) -> Result<Price> {
    if !mid.is_positive() {
        return Err(CoreError::InvalidPrice(format!(
            "mid price must be positive, got {mid}"
        )));
    }
    if slippage.is_sign_negative() && !slippage.is_zero() {
        return Err(CoreError::InvalidSlippage(format!(
            "slippage must be non-negative, got {slippage}"
        )));
    }
    if !aggressive && slippage >= Decimal::ONE {
        return Err(CoreError::InvalidSlippage(format!(
            "sell-side slippage must be below 1, got {slippage}"
        )));
    }

    let factor = if aggressive {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };
    let raw = mid
        .inner()
        .checked_mul(factor)
        .ok_or_else(|| CoreError::Overflow(format!("{mid} x {factor}")))?;

    Ok(Price::new(raw).truncate_to_decimals(price_decimals))
}

/// Smallest order size accepted at `price`: `MIN_ORDER_NOTIONAL / price`.
pub fn minimum_order_size(price: Price) -> Result<Size> {
    if !price.is_positive() {
        return Err(CoreError::InvalidPrice(format!(
            "cannot size a minimum order at non-positive price {price}"
        )));
    }
    Ok(Size::new(MIN_ORDER_NOTIONAL / price.inner()))
}

/// Reject `size` when it falls below the venue minimum at `price`.
pub fn check_minimum_order(size: Size, price: Price) -> Result<()> {
    if !size.is_positive() {
        return Err(CoreError::InvalidSize(format!(
            "order size must be positive, got {size}"
        )));
    }
    let minimum = minimum_order_size(price)?;
    if size < minimum {
        return Err(CoreError::BelowMinimumOrder {
            size: size.to_string(),
            minimum: minimum.inner().round_dp(6).to_string(),
        });
    }
    Ok(())
}

/// A limit price derived from a mid-price and slippage tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlippageAdjustedPrice {
    pub mid: Price,
    pub slippage: Decimal,
    pub aggressive: bool,
    /// Truncated limit price ready for submission.
    pub price: Price,
}

impl SlippageAdjustedPrice {
    pub fn compute(
        mid: Price,
        slippage: Decimal,
        aggressive: bool,
        price_decimals: u32,
    ) -> Result<Self> {
        Ok(Self {
            mid,
            slippage,
            aggressive,
            price: price_with_slippage(mid, slippage, aggressive, price_decimals)?,
        })
    }

    /// Distance from mid in basis points (positive for aggressive prices).
    pub fn offset_bps(&self) -> Option<Decimal> {
        self.price.bps_from(self.mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_aggressive_price_never_below_mid() {
        let mid = Price::new(dec!(25.1234));
        for s in [dec!(0), dec!(0.0001), dec!(0.001), dec!(0.01), dec!(0.5), dec!(2)] {
            let px = price_with_slippage(mid, s, true, 4).unwrap();
            assert!(px >= mid, "slippage {s} gave {px}");
        }
    }

    #[test]
    fn test_passive_price_never_above_mid() {
        let mid = Price::new(dec!(25.1234));
        for s in [dec!(0), dec!(0.0001), dec!(0.001), dec!(0.01), dec!(0.5)] {
            let px = price_with_slippage(mid, s, false, 4).unwrap();
            assert!(px <= mid, "slippage {s} gave {px}");
        }
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        let px = price_with_slippage(Price::new(dec!(100)), dec!(0.01), false, 4).unwrap();
        assert_eq!(px.inner(), dec!(99));
        assert!(px.inner() <= dec!(99.0000));

        // fifth decimal would round up
        let px = price_with_slippage(Price::new(dec!(1.99999)), dec!(0), false, 4).unwrap();
        assert_eq!(px.inner(), dec!(1.9999));
    }

    #[test]
    fn test_stable_swap_example() {
        let px = price_with_slippage(Price::new(dec!(0.995)), dec!(0.01), false, 5).unwrap();
        assert_eq!(px.inner(), dec!(0.98505));

        let px = price_with_slippage(Price::new(dec!(0.995)), dec!(0.01), false, 4).unwrap();
        assert_eq!(px.inner(), dec!(0.985));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert!(price_with_slippage(Price::ZERO, dec!(0.01), true, 4).is_err());
        assert!(price_with_slippage(Price::new(dec!(-1)), dec!(0.01), true, 4).is_err());
        assert!(price_with_slippage(Price::ONE, dec!(-0.01), true, 4).is_err());
        assert!(price_with_slippage(Price::ONE, dec!(1), false, 4).is_err());
    }

    #[test]
    fn test_minimum_order_size() {
        let min = minimum_order_size(Price::new(dec!(10.1))).unwrap();
        assert_eq!(min.inner(), dec!(1));

        let min = minimum_order_size(Price::new(dec!(40))).unwrap();
        assert_eq!(min.inner(), dec!(10.1) / dec!(40));

        assert!(minimum_order_size(Price::ZERO).is_err());
        assert!(minimum_order_size(Price::new(dec!(-5))).is_err());
    }

    #[test]
    fn test_check_minimum_order() {
        let price = Price::new(dec!(0.98505));
        assert!(check_minimum_order(Size::new(dec!(10)), price).is_err());
        assert!(check_minimum_order(Size::new(dec!(11)), price).is_ok());

        match check_minimum_order(Size::new(dec!(1)), Price::new(dec!(1))) {
            Err(CoreError::BelowMinimumOrder { size, .. }) => assert_eq!(size, "1"),
            other => panic!("expected BelowMinimumOrder, got {other:?}"),
        }

        assert!(matches!(
            check_minimum_order(Size::ZERO, price),
            Err(CoreError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_slippage_adjusted_price_offset() {
        let adjusted =
            SlippageAdjustedPrice::compute(Price::new(dec!(40)), dec!(0.01), true, 4).unwrap();
        assert_eq!(adjusted.price.inner(), dec!(40.4));
        assert_eq!(adjusted.offset_bps(), Some(dec!(100)));
    }
}
