//! Auth pipeline errors

use std::net::IpAddr;

use playgate_core::ErrorCode;
use playgate_store::StoreError;
use thiserror::Error;

/// Every way the auth pipeline can reject a request.
///
/// The pipeline is total: a request either produces a partner context or
/// exactly one of these.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or invalid API key")]
    Unauthenticated,

    #[error("IP address {0} is not allowed for this partner")]
    IpNotAllowed(IpAddr),

    #[error("API key lacks permission: {0}")]
    PermissionDenied(String),

    #[error("Auth store unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::IpNotAllowed(_) => ErrorCode::IpNotAllowed,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Unavailable(_) => ErrorCode::DependencyUnavailable,
        }
    }
}
