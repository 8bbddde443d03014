//! SQLite database module for CLA org documents
//!
//! ## Architecture
//!
//! - One row per CLA org document in `cla_orgs`
//! - Individual signings live as a JSON array in the `individuals` column
//! - Writes run in `BEGIN IMMEDIATE` transactions on a pooled connection
//!
//! ## Tables
//!
//! - `cla_orgs` - CLA org documents (platform, org, repo, apply_to, individuals)
//! - `schema_version` - Schema version marker

pub mod diesel_schema;
pub mod documents;
pub mod individual_signing;
pub mod models;
pub mod schema;
pub mod scope;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::StorageError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection PRAGMAs applied when the pool hands out a connection
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout_ms: u64,
    wal: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        let mut pragmas = format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms);
        if self.wal {
            // WAL for concurrent readers alongside the single writer
            pragmas.push_str(" PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;");
        }
        conn.batch_execute(&pragmas)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// SQLite database holding CLA org documents
#[derive(Clone)]
pub struct ClaDb {
    pool: DbPool,
}

impl ClaDb {
    /// Open or create the database described by `config`
    pub fn open(config: &Config) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.storage_dir)?;

        let db_path = config.db_path();
        info!("Opening SQLite database at {:?}", db_path);

        let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
        let pool = Pool::builder()
            .max_size(config.pool_max_size.max(1))
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout_ms: config.busy_timeout_ms,
                wal: true,
            }))
            .build(manager)?;

        Self::from_pool(pool)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Backed by a single connection that is never recycled, since every
    /// SQLite in-memory connection is its own database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        debug!("Opening in-memory SQLite database");

        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .max_lifetime(None)
            .idle_timeout(None)
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout_ms: 0,
                wal: false,
            }))
            .build(manager)?;

        Self::from_pool(pool)
    }

    fn from_pool(pool: DbPool) -> Result<Self, StorageError> {
        let db = Self { pool };
        db.with_conn(schema::init_schema)?;
        Ok(db)
    }

    /// Get the connection pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `f` on a pooled connection outside any transaction
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError>,
    {
        let mut conn = self.pool.get()?;
        f(&mut conn)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is held from the first read, so a check made in `f`
    /// still holds when `f` writes. Commits when `f` returns `Ok`, rolls back
    /// otherwise. Lock contention past the busy timeout surfaces as a
    /// database error and is not retried here.
    pub fn do_transaction<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError>,
    {
        let mut conn = self.pool.get()?;
        conn.immediate_transaction(f)
    }
}

// Re-exports
pub use documents::{DocFilter, DocumentMatch, ElementFilter, RepoFilter};
pub use models::{
    corporation_id_of, IndividualSigningBasicInfo, IndividualSigningDoc, IndividualSigningInfo,
    IndividualSigningListOption, NewClaOrg,
};
pub use scope::SigningScope;
