//! Data access layer.
//!
//! Everything above this module speaks one contract:
//! `query(text, params) -> QueryResult { rows, row_count }` with positional
//! `$1`-style placeholders. The contract is served either by PostgreSQL
//! ([`postgres::PgBackend`]) or by the in-memory [`mock::MockStore`], and
//! callers never branch on which one is active.
//!
//! Backend selection at startup:
//! - `MOCK_DB=true` forces the mock store unconditionally.
//! - Otherwise the real connection is attempted; if it fails outside
//!   production the mock store takes over with a warning, in production the
//!   failure is surfaced unchanged.
//!
//! A query that fails against the live backend also falls back per call in
//! non-production configuration, so a database that dies mid-session
//! degrades the same way as one that was never reachable.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Environment, ServerConfig};

pub mod mock;
pub mod postgres;

pub use mock::{classify, normalize, MockStore, StatementKind};
pub use mock::{ADMIN_PASSWORD_HASH, DEMO_PASSWORD_HASH};

/// One result row. Field set depends on the statement that produced it.
pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    Connection(#[source] tokio_postgres::Error),

    #[error("database connection timed out after {0}ms")]
    ConnectTimeout(u64),

    #[error("query failed: {0}")]
    Query(#[source] tokio_postgres::Error),
}

/// Result of one statement: ordered rows plus their count.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        QueryResult::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        QueryResult { rows, row_count }
    }

    /// First row, if any. Most lookups expect at most one.
    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// The query contract shared by every backend.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, text: &str, params: &[Value]) -> Result<QueryResult, DbError>;
}

#[async_trait]
impl QueryExecutor for MockStore {
    async fn query(&self, text: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        Ok(self.execute(text, params))
    }
}

enum Backend {
    Mock,
    Postgres(postgres::PgBackend),
}

/// The application's single database handle.
///
/// Owns the mock store in every mode so the non-production fallback path
/// always has somewhere to land.
pub struct Database {
    backend: Backend,
    mock: MockStore,
    environment: Environment,
}

impl Database {
    /// Select and initialize a backend per the configuration.
    pub async fn connect(config: &ServerConfig) -> Result<Self, DbError> {
        let mock = MockStore::new();

        if config.mock_db {
            log::info!("mock mode forced (MOCK_DB=true); serving from in-memory store");
            return Ok(Database {
                backend: Backend::Mock,
                mock,
                environment: config.environment,
            });
        }

        match postgres::PgBackend::connect(config).await {
            Ok(pg) => {
                log::info!(
                    "connected to postgres at {}:{}/{}",
                    config.db_host,
                    config.db_port,
                    config.db_name
                );
                Ok(Database {
                    backend: Backend::Postgres(pg),
                    mock,
                    environment: config.environment,
                })
            }
            Err(e) if config.environment != Environment::Production => {
                log::warn!("database connection failed, using mock store: {}", e);
                Ok(Database {
                    backend: Backend::Mock,
                    mock,
                    environment: config.environment,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// A database handle served entirely by the mock store. Used by tests
    /// and by demo deployments that never configure PostgreSQL.
    pub fn mock() -> Self {
        Database {
            backend: Backend::Mock,
            mock: MockStore::new(),
            environment: Environment::Development,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.backend, Backend::Mock)
    }
}

#[async_trait]
impl QueryExecutor for Database {
    async fn query(&self, text: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        match &self.backend {
            Backend::Mock => Ok(self.mock.execute(text, params)),
            Backend::Postgres(pg) => match pg.query(text, params).await {
                Ok(result) => Ok(result),
                Err(e) if self.environment != Environment::Production => {
                    log::warn!(
                        "query failed against postgres, serving from mock store: {} ({})",
                        e,
                        mock::normalize(text)
                            .chars()
                            .take(100)
                            .collect::<String>()
                    );
                    Ok(self.mock.execute(text, params))
                }
                Err(e) => Err(e),
            },
        }
    }
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// The two fixed seed-account hashes are special-cased before the real
/// comparison so the demo accounts work without a bcrypt round trip.
/// Verification errors (malformed hash) count as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if hash == DEMO_PASSWORD_HASH && password == "demo123" {
        return true;
    }
    if hash == ADMIN_PASSWORD_HASH && password == "admin123" {
        return true;
    }
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Read a string field off a row.
pub fn field_str<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}
