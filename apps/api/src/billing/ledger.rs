use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{ConsumeOutcome, CreditLedger, LedgerError};

/// Credit ledger over the `users.credits_left` column.
#[derive(Clone)]
pub struct PgCreditLedger {
    pool: PgPool,
}

impl PgCreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CreditLedger for PgCreditLedger {
    async fn balance(&self, user_id: Uuid) -> Result<i32, LedgerError> {
        sqlx::query_scalar::<_, i32>("SELECT credits_left FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LedgerError::UnknownUser(user_id))
    }

    async fn try_consume(
        &self,
        user_id: Uuid,
        amount: i32,
    ) -> Result<ConsumeOutcome, LedgerError> {
        // The balance check and the decrement happen in one statement, so concurrent
        // requests for the same user can never drive the balance below zero.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET credits_left = credits_left - $2
            WHERE id = $1 AND credits_left >= $2
            RETURNING credits_left
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(remaining) => {
                info!("Charged {amount} credits to user {user_id} ({remaining} left)");
                Ok(ConsumeOutcome::Charged { remaining })
            }
            None => {
                let available = self.balance(user_id).await?;
                Ok(ConsumeOutcome::Insufficient { available })
            }
        }
    }
}
