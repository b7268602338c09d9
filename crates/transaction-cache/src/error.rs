//! Transaction cache errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TTL out of range: {0:?}")]
    InvalidTtl(std::time::Duration),
}
