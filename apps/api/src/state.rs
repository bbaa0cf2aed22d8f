use std::sync::Arc;

use crate::billing::CreditLedger;
use crate::config::Config;
use crate::scoring::gateway::ScoringGateway;
use crate::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every handle is constructed once in `main` and passed in; nothing is a global.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<ScoringGateway>,
    /// Balance lookups for the credits and history endpoints.
    pub ledger: Arc<dyn CreditLedger>,
    pub sessions: Arc<dyn SessionStore>,
}
