//! # Pool and Transactions
//!
//! `Database` owns the SQLite pool and is the only way into the
//! repositories. Writes go through a transaction, reads through a plain
//! connection; repositories never pick one themselves.
//!
//! ```text
//! DbConfig::new(path) / DbConfig::in_memory()
//!        │
//!        ▼
//! Database::new ── open pool (WAL, foreign keys, busy timeout) ── migrate
//!        │
//!        ├── begin()   → Transaction<'static, Sqlite>   write workflows
//!        │                  └── commit(tx), or drop to roll back
//!        └── acquire() → PoolConnection<Sqlite>         reads
//! ```
//!
//! A `:memory:` database lives inside its single pooled connection, so
//! every `Database` built from [`DbConfig::in_memory`] is private, and a
//! caller must release one connection before asking for the next.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    BranchRepository, CashRepository, CreditRepository, CustomerRepository, ProductRepository,
    PurchaseRepository, SaleRepository, StockRepository, SupplierRepository, TransferRepository,
};

const IN_MEMORY: &str = ":memory:";

/// Where the database lives and how the pool around it behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/almacen/almacen.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open, or `:memory:`.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// A fresh private database, used by tests and `database.path = ":memory:"`.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            // Closing the only connection would drop the database.
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = if self.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", self.database_path.display())
        };

        Ok(SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true))
    }
}

/// Handle to the engine's database. Cheap to clone.
///
/// Repositories are stateless and run on the connection they are handed,
/// which is how one workflow composes several of them atomically:
///
/// ```rust,ignore
/// let mut tx = db.begin().await?;
/// db.stock().decrement(&mut tx, &stock.id, qty).await?;
/// db.cash().insert(&mut tx, &movement).await?;
/// db.commit(tx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = config.connect_options()?;
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);
        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Pool ready");

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    /// The raw pool, for ad-hoc queries outside the repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction. Dropping it without [`Database::commit`] rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub async fn commit(&self, tx: Transaction<'static, Sqlite>) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// A plain connection for reads.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// True when the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub fn branches(&self) -> BranchRepository {
        BranchRepository::new()
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new()
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new()
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new()
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::new()
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new()
    }

    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new()
    }

    pub fn credit(&self) -> CreditRepository {
        CreditRepository::new()
    }

    pub fn cash(&self) -> CashRepository {
        CashRepository::new()
    }

    pub fn transfers(&self) -> TransferRepository {
        TransferRepository::new()
    }
}
