//! Run inputs: the listing being targeted and the account credentials.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// The listing this run targets.
///
/// Created once at startup and never mutated; owned by the orchestrator
/// for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    symbol: String,
    quote_amount: Decimal,
    t0: DateTime<Utc>,
    price_markup_pct: Decimal,
    profit_pct: Decimal,
}

impl ListingTarget {
    /// Validate and build a listing target. The symbol is upper-cased.
    ///
    /// # Errors
    /// `CoreError::InvalidListing` for an empty symbol, a non-positive
    /// budget, or a negative markup/profit percentage.
    pub fn new(
        symbol: &str,
        quote_amount: Decimal,
        t0: DateTime<Utc>,
        price_markup_pct: Decimal,
        profit_pct: Decimal,
    ) -> Result<Self> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::InvalidListing("symbol is empty".to_string()));
        }
        if quote_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidListing(format!(
                "quote_amount must be positive, got {quote_amount}"
            )));
        }
        if price_markup_pct.is_sign_negative() {
            return Err(CoreError::InvalidListing(format!(
                "price_markup_pct must not be negative, got {price_markup_pct}"
            )));
        }
        if profit_pct.is_sign_negative() {
            return Err(CoreError::InvalidListing(format!(
                "profit_pct must not be negative, got {profit_pct}"
            )));
        }

        Ok(Self {
            symbol,
            quote_amount,
            t0,
            price_markup_pct,
            profit_pct,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Quote-currency budget.
    pub fn quote_amount(&self) -> Decimal {
        self.quote_amount
    }

    /// Listing instant T0.
    pub fn t0(&self) -> DateTime<Utc> {
        self.t0
    }

    /// T0 in Unix milliseconds (exchange clock).
    pub fn t0_ms(&self) -> i64 {
        self.t0.timestamp_millis()
    }

    pub fn price_markup_pct(&self) -> Decimal {
        self.price_markup_pct
    }

    pub fn profit_pct(&self) -> Decimal {
        self.profit_pct
    }
}

/// API credentials for signed requests.
///
/// The secret lives in a zeroizing buffer and never appears in `Debug`.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: Zeroizing<String>,
}

impl Credentials {
    /// # Errors
    /// `CoreError::InvalidListing` if either part is empty.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let api_secret = Zeroizing::new(api_secret.into());
        if api_key.trim().is_empty() {
            return Err(CoreError::InvalidListing("api_key is empty".to_string()));
        }
        if api_secret.trim().is_empty() {
            return Err(CoreError::InvalidListing("api_secret is empty".to_string()));
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Secret used as the HMAC key. Never log this.
    pub fn expose_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 9, 11, 0, 0).unwrap()
    }

    #[test]
    fn test_symbol_is_uppercased() {
        let target = ListingTarget::new(" newusdt ", dec!(10), t0(), dec!(20), dec!(200)).unwrap();
        assert_eq!(target.symbol(), "NEWUSDT");
        assert_eq!(target.t0_ms(), 1_752_058_800_000);
    }

    #[test]
    fn test_rejects_non_positive_budget() {
        let result = ListingTarget::new("NEWUSDT", dec!(0), t0(), dec!(20), dec!(200));
        assert!(matches!(result, Err(CoreError::InvalidListing(_))));
    }

    #[test]
    fn test_rejects_negative_markup() {
        let result = ListingTarget::new("NEWUSDT", dec!(5), t0(), dec!(-1), dec!(200));
        assert!(matches!(result, Err(CoreError::InvalidListing(_))));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("key", "super-secret").unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("key"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_credentials_reject_empty_secret() {
        assert!(Credentials::new("key", "  ").is_err());
    }
}
