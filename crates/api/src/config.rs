//! Environment-driven configuration
//!
//! Every option is a `PLAYGATE_*` environment variable read once at
//! startup. The encryption key is the only required value: without it the
//! process refuses to start rather than run with unsealed amounts.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Startup configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Base64-encoded 32-byte AES key (`PLAYGATE_ENCRYPTION_KEY`)
    pub encryption_key: String,
    pub allowed_ip_enforcement: bool,
    /// Requests per minute per (partner, endpoint class)
    pub default_rate_limit: u64,
    pub auth_exclude_paths: Vec<String>,
    pub aml_large_value_thresholds: HashMap<String, Decimal>,
    pub event_queue_capacity: usize,
    pub operation_deadline: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: parse_var("PLAYGATE_BIND_ADDR", "0.0.0.0:8080".parse().unwrap())?,
            database_url: std::env::var("PLAYGATE_DATABASE_URL")
                .map_err(|_| ConfigError::Missing("PLAYGATE_DATABASE_URL"))?,
            encryption_key: std::env::var("PLAYGATE_ENCRYPTION_KEY")
                .map_err(|_| ConfigError::Missing("PLAYGATE_ENCRYPTION_KEY"))?,
            allowed_ip_enforcement: parse_var("PLAYGATE_ALLOWED_IP_ENFORCEMENT", true)?,
            default_rate_limit: parse_var("PLAYGATE_DEFAULT_RATE_LIMIT", 100)?,
            auth_exclude_paths: list_var("PLAYGATE_AUTH_EXCLUDE_PATHS", &["/health"]),
            aml_large_value_thresholds: threshold_var("PLAYGATE_AML_LARGE_VALUE_THRESHOLDS")?,
            event_queue_capacity: parse_var("PLAYGATE_EVENT_QUEUE_CAPACITY", 10_000)?,
            operation_deadline: Duration::from_secs(parse_var(
                "PLAYGATE_OPERATION_DEADLINE_SECS",
                5,
            )?),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn list_var(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// `"USD=10000,EUR=9000,JPY=1000000"` → per-currency thresholds.
/// Unset leaves the analyzer on its built-in defaults.
fn threshold_var(name: &'static str) -> Result<HashMap<String, Decimal>, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(HashMap::new());
    };

    let mut thresholds = HashMap::new();
    for pair in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let (code, value) = pair.split_once('=').ok_or_else(|| ConfigError::Invalid {
            name,
            value: pair.to_string(),
        })?;
        let amount: Decimal = value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: pair.to_string(),
        })?;
        thresholds.insert(code.trim().to_uppercase(), amount);
    }
    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // Env-var tests mutate process state; keep them serialized by testing
    // the pure parsers instead.

    #[test]
    fn test_threshold_parsing() {
        std::env::set_var("PLAYGATE_TEST_THRESHOLDS_OK", "USD=10000, eur=9000");
        let parsed = threshold_var("PLAYGATE_TEST_THRESHOLDS_OK").unwrap();
        assert_eq!(parsed["USD"], dec!(10000));
        assert_eq!(parsed["EUR"], dec!(9000));

        std::env::set_var("PLAYGATE_TEST_THRESHOLDS_BAD", "USD:10000");
        assert!(threshold_var("PLAYGATE_TEST_THRESHOLDS_BAD").is_err());
    }

    #[test]
    fn test_list_parsing() {
        std::env::set_var("PLAYGATE_TEST_LIST", "/health, /openapi.json,");
        assert_eq!(
            list_var("PLAYGATE_TEST_LIST", &["/health"]),
            vec!["/health".to_string(), "/openapi.json".to_string()]
        );
        assert_eq!(
            list_var("PLAYGATE_TEST_LIST_UNSET", &["/health"]),
            vec!["/health".to_string()]
        );
    }
}
