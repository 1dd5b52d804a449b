//! Vault database handle.

use std::path::Path;

use docvault_core::db::{self, Location};
use sqlx::{Pool, Sqlite};
use tracing::info;

pub use docvault_core::db::DatabaseError;

/// Cheaply cloneable handle to the vault's `SQLite` pool.
#[derive(Clone)]
pub struct VaultDatabase {
    pool: Pool<Sqlite>,
}

impl VaultDatabase {
    /// Open or create the database file and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::connect(Location::File(path)).await
    }

    /// Fresh in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::connect(Location::Memory).await
    }

    async fn connect(location: Location<'_>) -> Result<Self, DatabaseError> {
        let pool = db::connect(location).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        info!("Vault schema up to date");
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_all_tables() {
        let db = VaultDatabase::open_in_memory().await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' \
             AND name <> 'sqlite_sequence' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, vec!["activity_log", "documents", "payments", "users"]);
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        let db = VaultDatabase::open(&path).await.unwrap();
        db.create_user("u1", "Ada", "ada@vault.test", "hash").await.unwrap();
        db.pool().close().await;

        let reopened = VaultDatabase::open(&path).await.unwrap();
        assert_eq!(reopened.get_user("u1").await.unwrap().email, "ada@vault.test");
    }
}
