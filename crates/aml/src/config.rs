//! Analyzer configuration

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-currency large-value thresholds and the fallback.
///
/// Loaded from `aml-large-value-thresholds` at startup; these defaults
/// reflect the common regulatory reporting lines.
#[derive(Debug, Clone)]
pub struct AmlConfig {
    pub large_value_thresholds: HashMap<String, Decimal>,
    pub default_threshold: Decimal,
}

impl Default for AmlConfig {
    fn default() -> Self {
        let mut thresholds = HashMap::new();
        thresholds.insert("USD".to_string(), dec!(10_000));
        thresholds.insert("EUR".to_string(), dec!(9_000));
        thresholds.insert("GBP".to_string(), dec!(8_000));
        thresholds.insert("KRW".to_string(), dec!(12_000_000));
        thresholds.insert("JPY".to_string(), dec!(1_000_000));
        Self {
            large_value_thresholds: thresholds,
            default_threshold: dec!(10_000),
        }
    }
}

impl AmlConfig {
    pub fn threshold_for(&self, currency_code: &str) -> Decimal {
        self.large_value_thresholds
            .get(currency_code)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}
