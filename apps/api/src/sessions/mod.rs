// Session history: one record per batch scoring request.

pub mod handlers;
pub mod store;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::session::SessionRow;

pub use store::PgSessionStore;

/// A completed batch, as written to history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_description: String,
    pub consumed_credits: i32,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn record(&self, record: &SessionRecord) -> Result<()>;

    /// Sessions created at or after `since`, newest first.
    async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<SessionRow>>;
}
