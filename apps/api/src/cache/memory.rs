//! In-process TTL cache.
//!
//! Expired entries are invisible to `get` immediately and are physically removed
//! by a background sweep task every `sweep_interval`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheError, ResultCache};
use crate::scoring::fingerprint::Fingerprint;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

type Entries = RwLock<HashMap<Fingerprint, Entry>>;

pub struct MemoryCache {
    entries: Arc<Entries>,
    sweeper: Option<JoinHandle<()>>,
}

impl MemoryCache {
    /// A cache without a sweeper. Expired entries are hidden from `get` but stay in
    /// memory until overwritten.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweeper: None,
        }
    }

    /// A cache that purges expired entries every `sweep_interval`.
    /// Must be called from inside a Tokio runtime. The sweep task ends when the cache is dropped.
    pub fn with_sweeper(sweep_interval: Duration) -> Self {
        let entries: Arc<Entries> = Arc::new(RwLock::new(HashMap::new()));
        let sweeper = tokio::spawn(sweep_loop(Arc::downgrade(&entries), sweep_interval));
        Self {
            entries,
            sweeper: Some(sweeper),
        }
    }

    /// Removes every expired entry and returns how many were removed.
    #[cfg(test)]
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries, Instant::now())
    }

    /// Number of stored entries, expired ones included until purged.
    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

fn purge(entries: &Entries, now: Instant) -> usize {
    let mut map = entries.write();
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now));
    before - map.len()
}

async fn sweep_loop(entries: Weak<Entries>, sweep_interval: Duration) {
    let mut ticker = tokio::time::interval(sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
            break;
        };
        let removed = purge(&entries, Instant::now());
        if removed > 0 {
            debug!("Cache sweep removed {removed} expired entries");
        }
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: Fingerprint) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(&key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: Fingerprint,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .insert(key, Entry { value, expires_at });
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
