//! `SQLite` plumbing shared by the vault stores.
//!
//! Provides [`DatabaseError`], [`unix_timestamp`] and [`connect`], which
//! applies the pragmas every ledger connection needs.

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// How long a writer waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool size for on-disk databases.
const FILE_POOL_SIZE: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Where a pool's database lives.
#[derive(Debug, Clone, Copy)]
pub enum Location<'a> {
    /// A file, created with its parent directory if missing.
    File(&'a Path),
    /// A private in-memory database, used by tests.
    Memory,
}

/// Open a pool with foreign keys enforced.
///
/// File databases run in WAL mode with a busy timeout. The in-memory database
/// is pinned to a single connection that is never recycled, since closing it
/// would discard the data.
pub async fn connect(location: Location<'_>) -> Result<Pool<Sqlite>, DatabaseError> {
    let pool = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
            }
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .foreign_keys(true)
                .busy_timeout(BUSY_TIMEOUT);
            let pool = SqlitePoolOptions::new()
                .max_connections(FILE_POOL_SIZE)
                .connect_with(options)
                .await
                .map_err(|e| DatabaseError::Connection(e.to_string()))?;
            info!(path = %path.display(), "Database opened");
            pool
        }
        Location::Memory => {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DatabaseError::Connection(e.to_string()))?
                .foreign_keys(true);
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .map_err(|e| DatabaseError::Connection(e.to_string()))?
        }
    };
    Ok(pool)
}

/// Seconds since the Unix epoch.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
