use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{SessionRecord, SessionStore};
use crate::models::session::SessionRow;

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn record(&self, record: &SessionRecord) -> Result<()> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO scoring_sessions (id, user_id, job_description, consumed_credits, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(record.user_id)
        .bind(&record.job_description)
        .bind(record.consumed_credits)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Recorded scoring session {id} for user {}", record.user_id);
        Ok(())
    }

    async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<SessionRow>> {
        Ok(sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, job_description, consumed_credits, created_at
            FROM scoring_sessions
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?)
    }
}
