//! Precision-safe decimal types for order entry.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Exchanges reject
//! prices and quantities that violate tick/lot granularity, so every value
//! placed on the wire goes through the fixed-precision rounding below.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept for prices.
pub const PRICE_DECIMALS: u32 = 8;

/// Fractional digits kept for base-asset quantities.
pub const QTY_DECIMALS: u32 = 6;

/// Half-up rounding at a fixed number of fractional digits.
#[inline]
fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `1 + pct/100` as an exact decimal factor.
#[inline]
fn pct_factor(pct: Decimal) -> Decimal {
    Decimal::ONE + pct / Decimal::ONE_HUNDRED
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

    /// Round half-up to the exchange price precision (8 dp).
    #[inline]
    pub fn round_exchange(&self) -> Self {
        Self(round_half_up(self.0, PRICE_DECIMALS))
    }

    /// Apply a percentage markup and round to exchange precision.
    ///
    /// `round(self * (1 + pct/100), 8)`. Used both for the buy limit above
    /// the best ask and for the take-profit above the fill price.
    #[inline]
    pub fn with_markup(&self, pct: Decimal) -> Self {
        Self(self.0 * pct_factor(pct)).round_exchange()
    }

    /// String form sent to the exchange (no trailing zeros).
    pub fn to_wire(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Base-asset quantity with exact decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

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

    /// Round half-up to the exchange quantity precision (6 dp).
    #[inline]
    pub fn round_exchange(&self) -> Self {
        Self(round_half_up(self.0, QTY_DECIMALS))
    }

    /// Quantity a quote-currency budget buys at `price`, rounded to 6 dp.
    ///
    /// Returns `None` for a non-positive price.
    pub fn from_budget(budget: Decimal, price: Price) -> Option<Self> {
        if !price.is_positive() {
            return None;
        }
        Some(Self(budget / price.0).round_exchange())
    }

    /// String form sent to the exchange (no trailing zeros).
    pub fn to_wire(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Size {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Size {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_markup_rounds_half_up_to_eight_places() {
        let ask = Price::new(dec!(100.123456789));
        let limit = ask.with_markup(dec!(20));
        // 100.123456789 * 1.2 = 120.1481481468
        assert_eq!(limit.inner(), dec!(120.14814815));
    }

    #[test]
    fn test_take_profit_markup() {
        let buy = Price::new(dec!(120.14814815));
        let sell = buy.with_markup(dec!(200));
        assert_eq!(sell.inner(), dec!(360.44444445));
    }

    #[test]
    fn test_size_from_budget_rounds_to_six_places() {
        let price = Price::new(dec!(120.14814815));
        let qty = Size::from_budget(dec!(2.0), price).unwrap();
        // 2.0 / 120.14814815 = 0.0166461159...
        assert_eq!(qty.inner(), dec!(0.016646));
    }

    #[test]
    fn test_size_from_budget_rejects_zero_price() {
        assert!(Size::from_budget(dec!(10), Price::ZERO).is_none());
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        let size = Size::new(dec!(0.0000005));
        assert_eq!(size.round_exchange().inner(), dec!(0.000001));

        let price = Price::new(dec!(1.000000005));
        assert_eq!(price.round_exchange().inner(), dec!(1.00000001));
    }

    #[test]
    fn test_wire_format_strips_trailing_zeros() {
        assert_eq!(Price::new(dec!(120.10000000)).to_wire(), "120.1");
        assert_eq!(Size::new(dec!(5.000000)).to_wire(), "5");
    }
}
