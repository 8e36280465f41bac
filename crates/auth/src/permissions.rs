//! Permission strings and wildcard matching
//!
//! Grants are flat strings with an optional trailing wildcard segment:
//! `*` grants everything, `wallet:*` grants every wallet operation,
//! `wallet:bet` grants exactly one.

/// Read balance and transaction history
pub const WALLET_READ: &str = "wallet:read";
pub const WALLET_DEPOSIT: &str = "wallet:deposit";
pub const WALLET_WITHDRAW: &str = "wallet:withdraw";
pub const WALLET_BET: &str = "wallet:bet";
pub const WALLET_WIN: &str = "wallet:win";
pub const WALLET_ROLLBACK: &str = "wallet:rollback";
/// Read alerts and risk profiles
pub const AML_READ: &str = "aml:read";
/// Drive the alert investigation workflow
pub const AML_MANAGE: &str = "aml:manage";

/// Does a single grant cover `required`?
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }
    // "wallet:*" covers "wallet:bet" but not "walletx:bet" or "wallet"
    if let Some(prefix) = granted.strip_suffix(":*") {
        return required
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with(':'));
    }
    false
}

/// Does any grant in the set cover `required`?
pub fn has_permission(granted: &[String], required: &str) -> bool {
    granted.iter().any(|g| permission_matches(g, required))
}
