//! Playgate auth pipeline
//!
//! Turns an incoming request's API key and source address into an
//! authenticated [`PartnerContext`], or exactly one typed error from the
//! platform taxonomy. The pipeline order is fixed: key extraction, hash
//! lookup (cache first), partner and key validity, IP allowlist, permission
//! match, then an asynchronous rate-limited `last_used_at` bump.

pub mod allowlist;
pub mod authenticator;
pub mod error;
pub mod permissions;

pub use allowlist::{ip_allowed, IpRule};
pub use authenticator::{AuthConfig, Authenticator, PartnerContext};
pub use error::{AuthError, AuthResult};
