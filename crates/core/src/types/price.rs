//! Type-safe price representation using decimal arithmetic.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (pesos, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in Philippine pesos, the marketplace currency.
    #[must_use]
    pub const fn php(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::PHP)
    }
}

impl fmt::Display for Price {
    /// Formats as symbol plus two decimal places, e.g. `₱135.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    PHP,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::PHP => "₱",
            Self::USD => "$",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::php(Decimal::new(135, 0)).to_string(), "₱135.00");
        assert_eq!(Price::php(Decimal::new(4550, 2)).to_string(), "₱45.50");
    }

    #[test]
    fn test_display_rounds() {
        assert_eq!(Price::php(Decimal::new(19999, 3)).to_string(), "₱20.00");
    }

    #[test]
    fn test_default_currency_is_php() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::PHP);
    }
}
