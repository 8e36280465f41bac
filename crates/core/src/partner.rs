//! Partner and API key records
//!
//! A partner is a business client (operator, aggregator, affiliate). Its API
//! keys carry the permission set and the stored hashes; the raw key is shown
//! exactly once at issuance and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Partner lifecycle status.
///
/// Transitions only move away from `Active`; a suspended partner is never
/// reactivated through the wallet surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PartnerStatus {
    Active,
    Inactive,
    Suspended,
}

/// A partner operator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    pub id: Uuid,
    /// Unique, immutable short code (e.g. "LUCKYSPIN")
    pub code: String,
    pub name: String,
    pub status: PartnerStatus,
    /// Permitted caller addresses: exact IPs or CIDR ranges ("10.0.0.0/24").
    /// Empty means any address is accepted.
    pub allowed_ips: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Partner {
    pub fn is_active(&self) -> bool {
        self.status == PartnerStatus::Active
    }
}

/// A stored API key.
///
/// `lookup_digest` is the deterministic SHA-256 of the raw key and carries
/// the unique index used by the auth pipeline's hash lookup. `secret_hash`
/// is the salted Argon2 hash verified in constant time after the lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub lookup_digest: String,
    pub secret_hash: String,
    /// Permission strings, wildcard-capable: `*`, `wallet:*`, `wallet:bet`
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// A key authenticates only while active and unexpired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }
}
