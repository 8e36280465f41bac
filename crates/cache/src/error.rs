//! Cache layer errors

use thiserror::Error;

/// Cache failures.
///
/// There is intentionally only one interesting case: the backend being
/// unreachable. Callers degrade to the store or fail open.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
