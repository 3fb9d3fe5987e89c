//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are held in the currency's standard unit (dollars, not cents)
/// as a [`Decimal`]; conversion to minor units happens only at the payment
/// boundary via [`Price::minor_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
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

    /// Whether the amount is strictly greater than zero.
    ///
    /// Catalog products must have a positive price; this is checked before
    /// any store mutation.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// The amount in the currency's minor unit (e.g., cents), rounded to
    /// the nearest whole unit.
    ///
    /// Payment APIs expect minor units; everything else in the system
    /// stays in decimal standard units.
    #[must_use]
    pub fn minor_units(&self) -> i64 {
        let scaled = self.amount * Decimal::from(100);
        scaled.round().try_into().unwrap_or(0)
    }
}

impl fmt::Display for Price {
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
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// ISO 4217 code as a string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }

    /// Lowercase code, as payment APIs expect.
    #[must_use]
    pub fn lowercase(self) -> String {
        self.code().to_ascii_lowercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn usd(s: &str) -> Price {
        Price::new(s.parse::<Decimal>().unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn positivity_check() {
        assert!(usd("0.01").is_positive());
        assert!(!usd("0").is_positive());
        assert!(!usd("-5").is_positive());
    }

    #[test]
    fn minor_units_round_to_cents() {
        assert_eq!(usd("19.99").minor_units(), 1999);
        assert_eq!(usd("10").minor_units(), 1000);
        assert_eq!(usd("0.005").minor_units(), 1);
    }

    #[test]
    fn display_formats_with_symbol() {
        assert_eq!(usd("19.9").to_string(), "$19.90");
        assert_eq!(
            Price::new(Decimal::from(7), CurrencyCode::EUR).to_string(),
            "\u{20ac}7.00"
        );
    }
}
