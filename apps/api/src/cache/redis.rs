//! Redis-backed score cache. Expiry is delegated to Redis.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::{CacheError, ResultCache};
use crate::scoring::fingerprint::Fingerprint;

const DEFAULT_PREFIX: &str = "screener:score:";

pub struct RedisCache {
    client: redis::Client,
    prefix: String,
}

impl RedisCache {
    /// Creates a cache for the given Redis URL. No connection is opened until first use.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            prefix: DEFAULT_PREFIX.to_string(),
        })
    }

    fn make_key(&self, key: Fingerprint) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

/// Redis `EX` takes whole seconds; sub-second TTLs round up so they still expire.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: Fingerprint) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.make_key(key)).await?;
        Ok(value)
    }

    async fn set(
        &self,
        key: Fingerprint,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.make_key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_seconds(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
