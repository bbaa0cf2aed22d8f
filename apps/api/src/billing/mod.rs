// Credit metering: one credit per scored resume page.
// Balances live in the `users` table; every decrement is a single conditional UPDATE.

pub mod handlers;
pub mod ledger;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use ledger::PgCreditLedger;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User {0} not found")]
    UnknownUser(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a decrement-if-sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Charged { remaining: i32 },
    Insufficient { available: i32 },
}

#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn balance(&self, user_id: Uuid) -> Result<i32, LedgerError>;

    /// Atomically subtracts `amount` only if the balance covers it.
    async fn try_consume(&self, user_id: Uuid, amount: i32)
        -> Result<ConsumeOutcome, LedgerError>;
}
