//! In-memory collaborators for gateway and route tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;
use uuid::Uuid;

use crate::billing::{ConsumeOutcome, CreditLedger, LedgerError};
use crate::cache::{CacheError, MemoryCache, ResultCache};
use crate::config::Config;
use crate::llm_client::LlmError;
use crate::models::session::SessionRow;
use crate::routes::build_router;
use crate::scoring::fingerprint::Fingerprint;
use crate::scoring::gateway::{GatewayOptions, ScoringGateway};
use crate::scoring::models::ScoredResume;
use crate::scoring::scorer::ResumeScorer;
use crate::sessions::{SessionRecord, SessionStore};
use crate::state::AppState;

pub fn pages(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/screener_test".to_string()),
        "GEMINI_API_KEY" => Some("test-key".to_string()),
        "MAX_JOB_DESCRIPTION_LENGTH" => Some("200".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

/// Deterministic scorer. Fails with a 503 for any resume containing a page in `failing_pages`.
#[derive(Default)]
pub struct StubScorer {
    calls: AtomicUsize,
    failing_pages: HashSet<String>,
}

impl StubScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pages: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing_pages: pages.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reason_for(requirements: &str, pages: &[String]) -> String {
        format!(
            "Checked {} page(s) against '{requirements}': {}",
            pages.len(),
            pages.join("+")
        )
    }
}

#[async_trait]
impl ResumeScorer for StubScorer {
    async fn score(
        &self,
        requirements: &str,
        pages: &[String],
    ) -> Result<ScoredResume, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if pages.iter().any(|p| self.failing_pages.contains(p)) {
            return Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }

        Ok(ScoredResume {
            score: 72,
            reason: Self::reason_for(requirements, pages),
            email: "--".to_string(),
            name: "--".to_string(),
        })
    }

    fn backend(&self) -> &'static str {
        "stub"
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<Uuid, i32>>,
}

impl InMemoryLedger {
    pub fn add_user(&self, credits: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.balances.lock().insert(id, credits);
        id
    }

    pub fn credits(&self, user_id: Uuid) -> i32 {
        self.balances.lock()[&user_id]
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn balance(&self, user_id: Uuid) -> Result<i32, LedgerError> {
        self.balances
            .lock()
            .get(&user_id)
            .copied()
            .ok_or(LedgerError::UnknownUser(user_id))
    }

    async fn try_consume(
        &self,
        user_id: Uuid,
        amount: i32,
    ) -> Result<ConsumeOutcome, LedgerError> {
        let mut balances = self.balances.lock();
        let balance = balances
            .get_mut(&user_id)
            .ok_or(LedgerError::UnknownUser(user_id))?;
        if *balance < amount {
            return Ok(ConsumeOutcome::Insufficient {
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(ConsumeOutcome::Charged {
            remaining: *balance,
        })
    }
}

#[derive(Default)]
pub struct InMemorySessions {
    records: Mutex<Vec<SessionRecord>>,
    fail_writes: bool,
}

impl InMemorySessions {
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records.lock().clone()
    }

    pub fn push(&self, record: SessionRecord) {
        self.records.lock().push(record);
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn record(&self, record: &SessionRecord) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("session store offline"));
        }
        self.push(record.clone());
        Ok(())
    }

    async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<SessionRow>> {
        let mut rows: Vec<SessionRow> = self
            .records
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .map(|r| SessionRow {
                id: Uuid::new_v4(),
                user_id: r.user_id,
                job_description: r.job_description.clone(),
                consumed_credits: r.consumed_credits,
                created_at: r.created_at,
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

/// A cache whose backend is always unreachable.
pub struct FailingCache;

fn connection_refused() -> CacheError {
    CacheError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl ResultCache for FailingCache {
    async fn get(&self, _key: Fingerprint) -> Result<Option<String>, CacheError> {
        Err(connection_refused())
    }

    async fn set(
        &self,
        _key: Fingerprint,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(connection_refused())
    }

    fn backend(&self) -> &'static str {
        "unreachable"
    }
}

/// A router wired to in-memory collaborators, plus handles to inspect them.
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<InMemoryLedger>,
    pub sessions: Arc<InMemorySessions>,
}

impl TestApp {
    pub fn new(scorer: StubScorer) -> Self {
        let config = test_config();
        let ledger = Arc::new(InMemoryLedger::default());
        let sessions = Arc::new(InMemorySessions::default());
        let gateway = ScoringGateway::new(
            Arc::new(scorer),
            Arc::new(MemoryCache::new()),
            ledger.clone(),
            sessions.clone(),
            GatewayOptions::from_config(&config),
        );
        let router = build_router(AppState {
            config,
            gateway: Arc::new(gateway),
            ledger: ledger.clone(),
            sessions: sessions.clone(),
        });

        Self {
            router,
            ledger,
            sessions,
        }
    }

    /// Sends one request and returns the status and JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, body)
    }
}

/// Local HTTP/1.1 server that answers every request with the same status and JSON
/// body, or holds the connection open without answering when `reply` is `None`.
/// Returns the base URL and the number of requests received so far.
pub async fn canned_http_server(reply: Option<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("test server binds");
    let addr = listener.local_addr().expect("test server has an address");
    let requests = Arc::new(AtomicUsize::new(0));

    let counter = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);

                let Some((status, body)) = reply else {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    return;
                };
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\n\
                     content-type: application/json\r\n\
                     content-length: {}\r\n\
                     connection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), requests)
}

/// Reads one request, headers and `content-length` body.
async fn read_request(socket: &mut TcpStream) {
    let mut received = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        received.extend_from_slice(&chunk[..n]);

        let Some(header_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&received[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= header_end + 4 + content_length {
            return;
        }
    }
}
