//! Score cache: a key/value store keyed by request fingerprint.
//!
//! Two backends implement `ResultCache`:
//! - `MemoryCache`: process-local TTL map with a periodic sweep.
//! - `RedisCache`: shared across instances, expiry enforced by Redis (`SET .. EX`).
//!
//! The backend is chosen once at startup from `CACHE_BACKEND`. Callers treat every
//! `CacheError` as a miss; a cache outage never fails a scoring request.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::scoring::fingerprint::Fingerprint;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Returns the stored value, or `None` when absent or expired. Must not mutate state.
    async fn get(&self, key: Fingerprint) -> Result<Option<String>, CacheError>;

    /// Stores `value`, replacing any previous value. `None` means no expiry.
    async fn set(
        &self,
        key: Fingerprint,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Backend label for logs and `/health`.
    fn backend(&self) -> &'static str;
}
