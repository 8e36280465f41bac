//! Amount - strictly positive decimal wrapper for wallet operations
//!
//! Every mutating wallet operation carries an `Amount`. The constructor
//! enforces both positivity and the currency's scale, so an amount that
//! exists is always safe to apply to a balance of the same currency.

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::currency::Currency;

/// Errors raised when validating operation amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must be positive: {0}")]
    NotPositive(Decimal),

    #[error("Amount {value} has more than {scale} decimal places for {currency}")]
    ScaleExceeded {
        value: Decimal,
        currency: Currency,
        scale: u32,
    },
}

/// A strictly positive amount, already validated against a currency scale.
///
/// # Invariant
/// The inner value is > 0 and carries at most `currency.scale()` decimal
/// places. Enforced by [`Amount::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Validate `value` as an operation amount in `currency`.
    ///
    /// Rejects zero, negatives, and values with excess precision
    /// (e.g. `1.005` USD, `100.5` JPY).
    pub fn new(value: Decimal, currency: &Currency) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let scale = currency.scale();
        // normalize() strips trailing zeros so "10.00" passes for JPY-like
        // currencies only when the fractional part is actually zero.
        if value.normalize().scale() > scale {
            return Err(AmountError::ScaleExceeded {
                value,
                currency: currency.clone(),
                scale,
            });
        }

        Ok(Self(value))
    }

    /// Get the inner decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_amount_accepted() {
        let amount = Amount::new(dec!(100.50), &Currency::Usd).unwrap();
        assert_eq!(amount.value(), dec!(100.50));
    }

    #[test]
    fn test_zero_rejected() {
        let result = Amount::new(Decimal::ZERO, &Currency::Usd);
        assert!(matches!(result, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_negative_rejected() {
        let result = Amount::new(dec!(-5), &Currency::Usd);
        assert!(matches!(result, Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_excess_precision_rejected() {
        let result = Amount::new(dec!(1.005), &Currency::Usd);
        assert!(matches!(result, Err(AmountError::ScaleExceeded { .. })));
    }

    #[test]
    fn test_jpy_rejects_fractions() {
        assert!(Amount::new(dec!(100.5), &Currency::Jpy).is_err());
        assert!(Amount::new(dec!(100), &Currency::Jpy).is_ok());
    }

    #[test]
    fn test_trailing_zeros_allowed() {
        // 100.00 JPY is still a whole number of yen
        assert!(Amount::new(dec!(100.00), &Currency::Jpy).is_ok());
    }
}
