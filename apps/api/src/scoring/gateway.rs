//! Resume scoring gateway: result cache and credit metering around the AI scorer.
//!
//! Per resume:
//! 1. Validate requirements and pages.
//! 2. Fingerprint `(requirements, pages)` and try the cache. A hit is free.
//! 3. On a miss, reserve one credit per page against the balance minus the pages
//!    already reserved by in-flight misses of the same user, call the scorer, then
//!    charge with an atomic decrement-if-sufficient. Only then is the result cached.
//!
//! Reservations keep concurrent resumes of one batch from all passing the pre-check
//! against the same balance. The conditional decrement still guards races between
//! gateway instances.
//!
//! A batch fans out one future per resume and settles each independently: a
//! failed resume becomes an error marker in its own slot.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::billing::{ConsumeOutcome, CreditLedger, LedgerError};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::scoring::fingerprint::Fingerprint;
use crate::scoring::models::{BatchRequest, ScoreResult, ScoreSlot, ScoredResume, SlotError};
use crate::scoring::scorer::ResumeScorer;
use crate::sessions::{SessionRecord, SessionStore};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{0}")]
    Validation(String),

    #[error("Resume scoring failed: {0}")]
    Upstream(String),

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i32, available: i32 },

    #[error("User {0} not found")]
    UnknownUser(Uuid),

    #[error("Credit ledger error: {0}")]
    Ledger(String),
}

impl ScoringError {
    /// Stable machine-readable code, shared with the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::Validation(_) => "VALIDATION_ERROR",
            ScoringError::Upstream(_) => "UPSTREAM_SCORING_ERROR",
            ScoringError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            ScoringError::UnknownUser(_) => "NOT_FOUND",
            ScoringError::Ledger(_) => "LEDGER_ERROR",
        }
    }
}

impl From<LedgerError> for ScoringError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownUser(id) => ScoringError::UnknownUser(id),
            LedgerError::Database(e) => ScoringError::Ledger(e.to_string()),
        }
    }
}

impl From<&ScoringError> for SlotError {
    fn from(err: &ScoringError) -> Self {
        SlotError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Feature flags and limits for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub caching_enabled: bool,
    pub billing_enabled: bool,
    pub cache_ttl: Duration,
    pub max_requirements_len: usize,
    pub max_pages_per_resume: usize,
    pub max_resumes_per_batch: usize,
}

impl GatewayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            caching_enabled: config.cache_enabled,
            billing_enabled: config.billing_enabled,
            cache_ttl: config.cache_ttl,
            max_requirements_len: config.max_job_description_length,
            max_pages_per_resume: config.max_pages_per_resume,
            max_resumes_per_batch: config.max_resumes_per_batch,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

/// Result of one batch: slots in submission order plus the credits actually charged.
#[derive(Debug)]
pub struct BatchOutcome {
    pub slots: Vec<ScoreSlot>,
    pub credits_consumed: i32,
}

type Reservations = Mutex<HashMap<Uuid, i32>>;

/// Credits held by one in-flight cache miss. Released on drop.
struct Reservation<'a> {
    reservations: &'a Reservations,
    user_id: Uuid,
    credits: i32,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut reserved = self.reservations.lock();
        if let Entry::Occupied(mut held) = reserved.entry(self.user_id) {
            *held.get_mut() -= self.credits;
            if *held.get() <= 0 {
                held.remove();
            }
        }
    }
}

pub struct ScoringGateway {
    scorer: Arc<dyn ResumeScorer>,
    cache: Arc<dyn ResultCache>,
    ledger: Arc<dyn CreditLedger>,
    sessions: Arc<dyn SessionStore>,
    options: GatewayOptions,
    /// Pages of uncharged misses per user.
    reservations: Reservations,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScoringGateway {
    pub fn new(
        scorer: Arc<dyn ResumeScorer>,
        cache: Arc<dyn ResultCache>,
        ledger: Arc<dyn CreditLedger>,
        sessions: Arc<dyn SessionStore>,
        options: GatewayOptions,
    ) -> Self {
        Self {
            scorer,
            cache,
            ledger,
            sessions,
            options,
            reservations: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    pub fn cache_backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Scores a single resume.
    pub async fn score_resume(
        &self,
        pages: &[String],
        requirements: &str,
        user_id: Uuid,
    ) -> Result<ScoreResult, ScoringError> {
        self.validate_requirements(requirements)?;
        let cost = self.validate_pages(pages)?;
        let key = Fingerprint::of(requirements, pages);

        if self.options.caching_enabled {
            if let Some(scored) = self.lookup(key).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {key}");
                return Ok(ScoreResult::new(scored, true));
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss for {key}");
        }

        let reservation = if self.options.billing_enabled {
            let balance = self.ledger.balance(user_id).await?;
            Some(self.reserve(user_id, balance, cost)?)
        } else {
            None
        };

        let scored = self.scorer.score(requirements, pages).await.map_err(|e| {
            warn!("{} scorer failed for {key}: {e}", self.scorer.backend());
            ScoringError::Upstream(e.to_string())
        })?;

        if self.options.billing_enabled {
            match self.ledger.try_consume(user_id, cost).await? {
                ConsumeOutcome::Charged { remaining } => {
                    debug!("Charged {cost} credits to user {user_id}, {remaining} left");
                }
                // Another request drained the balance while this one was being scored.
                ConsumeOutcome::Insufficient { available } => {
                    return Err(ScoringError::InsufficientCredits {
                        required: cost,
                        available,
                    });
                }
            }
        }
        drop(reservation);

        if self.options.caching_enabled {
            self.store(key, &scored).await;
        }

        Ok(ScoreResult::new(scored, false))
    }

    /// Scores every resume of a batch concurrently and records one history session.
    ///
    /// Fails as a whole only for an unknown user or an invalid batch shape.
    pub async fn score_batch(
        &self,
        user_id: Uuid,
        request: &BatchRequest,
    ) -> Result<BatchOutcome, ScoringError> {
        self.ledger.balance(user_id).await?;
        self.validate_requirements(&request.requirements)?;

        if request.img_urls.is_empty() {
            return Err(ScoringError::Validation(
                "imgUrls must contain at least one resume".to_string(),
            ));
        }
        if request.img_urls.len() > self.options.max_resumes_per_batch {
            return Err(ScoringError::Validation(format!(
                "at most {} resumes may be scored per request, got {}",
                self.options.max_resumes_per_batch,
                request.img_urls.len()
            )));
        }

        debug!(
            "Scoring {} resumes ({} pages) for user {user_id}",
            request.img_urls.len(),
            request.total_pages()
        );

        let settled = join_all(
            request
                .img_urls
                .iter()
                .map(|pages| self.score_resume(pages, &request.requirements, user_id)),
        )
        .await;

        let mut credits_consumed = 0;
        let mut slots = Vec::with_capacity(settled.len());
        for (index, (pages, outcome)) in request.img_urls.iter().zip(settled).enumerate() {
            match outcome {
                Ok(result) => {
                    credits_consumed += self.credits_charged(pages, &result);
                    slots.push(ScoreSlot::Scored(result));
                }
                Err(err) => {
                    warn!("Resume {index} for user {user_id} failed: {err}");
                    slots.push(ScoreSlot::Failed {
                        error: SlotError::from(&err),
                    });
                }
            }
        }

        let scored = slots.iter().filter(|slot| slot.is_scored()).count();
        info!(
            "Scored {scored}/{} resumes for user {user_id}, {credits_consumed} credits consumed",
            slots.len()
        );

        self.record_session(user_id, &request.requirements, credits_consumed)
            .await;

        Ok(BatchOutcome {
            slots,
            credits_consumed,
        })
    }

    /// Holds `cost` credits for `user_id` if the balance still covers them after
    /// subtracting what other in-flight misses have reserved.
    fn reserve(
        &self,
        user_id: Uuid,
        balance: i32,
        cost: i32,
    ) -> Result<Reservation<'_>, ScoringError> {
        let mut reserved = self.reservations.lock();
        let held = reserved.get(&user_id).copied().unwrap_or(0);
        let available = (balance - held).max(0);
        if available < cost {
            return Err(ScoringError::InsufficientCredits {
                required: cost,
                available,
            });
        }
        *reserved.entry(user_id).or_insert(0) += cost;

        Ok(Reservation {
            reservations: &self.reservations,
            user_id,
            credits: cost,
        })
    }

    /// Credits a successful result cost: one per page on a billed miss, nothing otherwise.
    fn credits_charged(&self, pages: &[String], result: &ScoreResult) -> i32 {
        if result.is_cache_hit || !self.options.billing_enabled {
            0
        } else {
            i32::try_from(pages.len()).unwrap_or(i32::MAX)
        }
    }

    fn validate_requirements(&self, requirements: &str) -> Result<(), ScoringError> {
        if requirements.trim().is_empty() {
            return Err(ScoringError::Validation(
                "requirements cannot be empty".to_string(),
            ));
        }
        let len = requirements.chars().count();
        if len > self.options.max_requirements_len {
            return Err(ScoringError::Validation(format!(
                "requirements must be at most {} characters, got {len}",
                self.options.max_requirements_len
            )));
        }
        Ok(())
    }

    /// Returns the credit cost of the resume.
    fn validate_pages(&self, pages: &[String]) -> Result<i32, ScoringError> {
        if pages.is_empty() {
            return Err(ScoringError::Validation(
                "a resume must have at least one page".to_string(),
            ));
        }
        if pages.len() > self.options.max_pages_per_resume {
            return Err(ScoringError::Validation(format!(
                "a resume may have at most {} pages, got {}",
                self.options.max_pages_per_resume,
                pages.len()
            )));
        }
        if let Some(index) = pages.iter().position(|page| page.trim().is_empty()) {
            return Err(ScoringError::Validation(format!("page {index} is empty")));
        }
        i32::try_from(pages.len())
            .map_err(|_| ScoringError::Validation("too many pages".to_string()))
    }

    /// Cache read. Any backend or decode failure counts as a miss.
    async fn lookup(&self, key: Fingerprint) -> Option<ScoredResume> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(scored) => Some(scored),
                Err(e) => {
                    warn!("Discarding undecodable cache entry {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(
                    "{} cache read failed for {key}, scoring without cache: {e}",
                    self.cache.backend()
                );
                None
            }
        }
    }

    async fn store(&self, key: Fingerprint, scored: &ScoredResume) {
        let raw = match serde_json::to_string(scored) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not serialize score for {key}: {e}");
                return;
            }
        };
        if let Err(e) = self
            .cache
            .set(key, raw, Some(self.options.cache_ttl))
            .await
        {
            warn!("{} cache write failed for {key}: {e}", self.cache.backend());
        }
    }

    async fn record_session(&self, user_id: Uuid, requirements: &str, consumed_credits: i32) {
        let record = SessionRecord {
            user_id,
            created_at: Utc::now(),
            job_description: requirements.to_string(),
            consumed_credits,
        };
        if let Err(e) = self.sessions.record(&record).await {
            warn!("Failed to record scoring session for user {user_id}: {e:#}");
        }
    }
}
