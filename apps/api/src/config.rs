use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

/// Which store backs the score cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(anyhow!("unknown cache backend '{other}' (expected memory|redis)")),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub cache_enabled: bool,
    pub billing_enabled: bool,
    pub cache_backend: CacheBackend,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub max_job_description_length: usize,
    pub max_pages_per_resume: usize,
    pub max_resumes_per_batch: usize,
    pub scorer_timeout: Duration,
    pub scorer_max_retries: u32,
    pub session_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_backend: CacheBackend = parse_or(&lookup, "CACHE_BACKEND", CacheBackend::Memory)?;
        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());

        if cache_backend == CacheBackend::Redis && redis_url.is_none() {
            bail!("CACHE_BACKEND=redis requires REDIS_URL to be set");
        }

        let config = Config {
            database_url: require(&lookup, "DATABASE_URL")?,
            redis_url,
            gemini_api_key: require(&lookup, "GEMINI_API_KEY")?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            cache_enabled: parse_or(&lookup, "CACHE_ENABLED", true)?,
            billing_enabled: parse_or(&lookup, "BILLING_ENABLED", true)?,
            cache_backend,
            cache_ttl: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", 3600)?),
            cache_sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_SWEEP_INTERVAL_SECS",
                30,
            )?),
            max_job_description_length: parse_or(&lookup, "MAX_JOB_DESCRIPTION_LENGTH", 5000)?,
            max_pages_per_resume: parse_or(&lookup, "MAX_PAGES_PER_RESUME", 10)?,
            max_resumes_per_batch: parse_or(&lookup, "MAX_RESUMES_PER_BATCH", 50)?,
            scorer_timeout: Duration::from_secs(parse_or(&lookup, "SCORER_TIMEOUT_SECS", 60)?),
            scorer_max_retries: parse_or(&lookup, "SCORER_MAX_RETRIES", 3)?,
            session_retention_days: parse_or(&lookup, "SESSION_RETENTION_DAYS", 7)?,
        };

        if config.cache_sweep_interval.is_zero() {
            bail!("CACHE_SWEEP_INTERVAL_SECS must be greater than zero");
        }
        if config.scorer_max_retries == 0 {
            bail!("SCORER_MAX_RETRIES must be at least 1");
        }

        Ok(config)
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
    }
}
