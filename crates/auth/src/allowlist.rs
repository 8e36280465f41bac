//! Partner IP allowlists
//!
//! Entries are exact addresses (`10.0.0.5`, `2001:db8::1`) or CIDR ranges
//! (`10.0.0.0/24`, `2001:db8::/32`). An empty allowlist admits any caller.

use std::net::IpAddr;
use std::str::FromStr;

use tracing::warn;

/// A single parsed allowlist entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpRule {
    Exact(IpAddr),
    Network { addr: IpAddr, prefix: u8 },
}

impl IpRule {
    /// Parse one entry. Returns `None` for garbage, which the caller
    /// logs and skips rather than turning into an open door.
    pub fn parse(entry: &str) -> Option<IpRule> {
        let entry = entry.trim();
        match entry.split_once('/') {
            None => IpAddr::from_str(entry).ok().map(IpRule::Exact),
            Some((addr, prefix)) => {
                let addr = IpAddr::from_str(addr).ok()?;
                let prefix: u8 = prefix.parse().ok()?;
                let max = match addr {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                (prefix <= max).then_some(IpRule::Network { addr, prefix })
            }
        }
    }

    /// Whether `ip` falls under this rule. Address families never match
    /// across each other.
    pub fn matches(&self, ip: IpAddr) -> bool {
        match self {
            IpRule::Exact(rule_ip) => *rule_ip == ip,
            IpRule::Network { addr, prefix } => match (addr, ip) {
                (IpAddr::V4(net), IpAddr::V4(ip)) => {
                    let mask = if *prefix == 0 {
                        0
                    } else {
                        u32::MAX << (32 - *prefix as u32)
                    };
                    (u32::from(*net) & mask) == (u32::from(ip) & mask)
                }
                (IpAddr::V6(net), IpAddr::V6(ip)) => {
                    let mask = if *prefix == 0 {
                        0
                    } else {
                        u128::MAX << (128 - *prefix as u32)
                    };
                    (u128::from(*net) & mask) == (u128::from(ip) & mask)
                }
                _ => false,
            },
        }
    }
}

/// Evaluate a partner's raw allowlist entries against the caller address.
pub fn ip_allowed(entries: &[String], ip: IpAddr) -> bool {
    if entries.is_empty() {
        return true;
    }
    entries.iter().any(|entry| match IpRule::parse(entry) {
        Some(rule) => rule.matches(ip),
        None => {
            warn!(entry, "skipping unparseable allowlist entry");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_match() {
        let rule = IpRule::parse("10.0.0.5").unwrap();
        assert!(rule.matches(ip("10.0.0.5")));
        assert!(!rule.matches(ip("10.0.0.6")));
    }

    #[test]
    fn test_cidr_v4() {
        let rule = IpRule::parse("10.0.0.0/24").unwrap();
        assert!(rule.matches(ip("10.0.0.5")));
        assert!(rule.matches(ip("10.0.0.255")));
        assert!(!rule.matches(ip("10.0.1.5")));
    }

    #[test]
    fn test_cidr_v6() {
        let rule = IpRule::parse("2001:db8::/32").unwrap();
        assert!(rule.matches(ip("2001:db8::1")));
        assert!(!rule.matches(ip("2001:db9::1")));
    }

    #[test]
    fn test_zero_prefix_matches_everything() {
        let rule = IpRule::parse("0.0.0.0/0").unwrap();
        assert!(rule.matches(ip("192.168.1.1")));
        assert!(rule.matches(ip("8.8.8.8")));
    }

    #[test]
    fn test_family_mismatch() {
        let rule = IpRule::parse("10.0.0.0/8").unwrap();
        assert!(!rule.matches(ip("::1")));
    }

    #[test]
    fn test_garbage_entries() {
        assert!(IpRule::parse("not-an-ip").is_none());
        assert!(IpRule::parse("10.0.0.0/33").is_none());
        assert!(IpRule::parse("10.0.0.0/").is_none());
    }

    #[test]
    fn test_empty_allowlist_admits_all() {
        assert!(ip_allowed(&[], ip("203.0.113.9")));
    }

    #[test]
    fn test_allowlist_any_entry_admits() {
        let entries = vec!["10.0.0.0/24".to_string(), "192.168.1.1".to_string()];
        assert!(ip_allowed(&entries, ip("10.0.0.5")));
        assert!(ip_allowed(&entries, ip("192.168.1.1")));
        assert!(!ip_allowed(&entries, ip("10.0.1.5")));
    }

    #[test]
    fn test_unparseable_entry_denies_rather_than_admits() {
        let entries = vec!["garbage".to_string()];
        assert!(!ip_allowed(&entries, ip("10.0.0.5")));
    }
}
