//! Currency - ISO-4217 style currency codes with wallet scale rules
//!
//! Common operator currencies are pre-defined; anything else falls back to
//! the `Other` variant with the default scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing currency codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("Empty currency code")]
    EmptyCode,

    #[error("Currency code must be 3 letters: {0}")]
    InvalidFormat(String),
}

/// Currency codes accepted by the wallet engine.
///
/// The scale (number of decimal places) is a property of the currency:
/// a JPY wallet holds whole yen, a USD wallet holds cents.
///
/// # Examples
/// ```
/// use playgate_core::Currency;
///
/// let usd: Currency = "USD".parse().unwrap();
/// assert_eq!(usd, Currency::Usd);
/// assert_eq!(usd.scale(), 2);
/// assert_eq!(Currency::Jpy.scale(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// British Pound
    Gbp,
    /// Chinese Yuan
    Cny,
    /// South Korean Won
    Krw,
    /// Japanese Yen
    Jpy,
    /// Any other 3-letter code
    Other(String),
}

impl Currency {
    /// Returns the currency code as a string slice
    pub fn code(&self) -> &str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cny => "CNY",
            Currency::Krw => "KRW",
            Currency::Jpy => "JPY",
            Currency::Other(s) => s.as_str(),
        }
    }

    /// Number of decimal places amounts in this currency may carry.
    ///
    /// Zero-decimal currencies (JPY) reject fractional amounts outright.
    pub fn scale(&self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();

        if s.is_empty() {
            return Err(CurrencyError::EmptyCode);
        }

        if s.len() != 3 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidFormat(s));
        }

        Ok(match s.as_str() {
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            "GBP" => Currency::Gbp,
            "CNY" => Currency::Cny,
            "KRW" => Currency::Krw,
            "JPY" => Currency::Jpy,
            _ => Currency::Other(s),
        })
    }
}

impl TryFrom<String> for Currency {
    type Error = CurrencyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_currencies() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!("jpy".parse::<Currency>().unwrap(), Currency::Jpy);
    }

    #[test]
    fn test_parse_other_currency() {
        let brl: Currency = "BRL".parse().unwrap();
        assert_eq!(brl, Currency::Other("BRL".to_string()));
        assert_eq!(brl.code(), "BRL");
        assert_eq!(brl.scale(), 2);
    }

    #[test]
    fn test_scale() {
        assert_eq!(Currency::Usd.scale(), 2);
        assert_eq!(Currency::Krw.scale(), 2);
        assert_eq!(Currency::Jpy.scale(), 0);
    }

    #[test]
    fn test_invalid_codes() {
        assert!(matches!(
            "".parse::<Currency>(),
            Err(CurrencyError::EmptyCode)
        ));
        assert!(matches!(
            "DOLLARS".parse::<Currency>(),
            Err(CurrencyError::InvalidFormat(_))
        ));
        assert!(matches!(
            "US1".parse::<Currency>(),
            Err(CurrencyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip() {
        for currency in [Currency::Usd, Currency::Jpy, Currency::Other("BRL".into())] {
            let json = serde_json::to_string(&currency).unwrap();
            let parsed: Currency = serde_json::from_str(&json).unwrap();
            assert_eq!(currency, parsed);
        }
    }
}
