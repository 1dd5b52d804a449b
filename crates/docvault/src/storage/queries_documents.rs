//! Document catalog queries.
//!
//! Rows with a non-null `deleted_at` are tombstones: their blob removal has not
//! been confirmed yet. Tombstones are invisible to listing, lookup and counting.

use docvault_core::db::unix_timestamp;

use super::db::{DatabaseError, VaultDatabase};
use super::models::Document;

/// Parameters for recording an uploaded document.
pub struct NewDocument<'a> {
    pub id: &'a str,
    pub owner_id: &'a str,
    pub display_name: &'a str,
    pub storage_handle: &'a str,
    pub file_type: &'a str,
    pub size_bytes: i64,
    pub category: &'a str,
    pub notes: Option<&'a str>,
    pub expiry_date: Option<&'a str>,
}

/// Listing filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Case-insensitive substring over display name and notes.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

impl VaultDatabase {
    // =========================================================================
    // Document queries
    // =========================================================================

    /// Record document metadata.
    pub async fn insert_document(&self, doc: &NewDocument<'_>) -> Result<Document, DatabaseError> {
        sqlx::query(
            "INSERT INTO documents (id, owner_id, display_name, storage_handle, file_type, size_bytes, category, notes, expiry_date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(doc.id)
        .bind(doc.owner_id)
        .bind(doc.display_name)
        .bind(doc.storage_handle)
        .bind(doc.file_type)
        .bind(doc.size_bytes)
        .bind(doc.category)
        .bind(doc.notes)
        .bind(doc.expiry_date)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_document(doc.owner_id, doc.id).await
    }

    /// Get a live document owned by `owner_id`.
    pub async fn get_document(&self, owner_id: &str, id: &str) -> Result<Document, DatabaseError> {
        sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE id = ? AND owner_id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Document {id}")))
    }

    /// List live documents for an owner, newest first.
    pub async fn list_documents(
        &self,
        owner_id: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, DatabaseError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let category = filter
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

        let docs = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents \
             WHERE owner_id = ? AND deleted_at IS NULL \
               AND (? IS NULL OR lower(display_name) LIKE ? OR lower(COALESCE(notes, '')) LIKE ?) \
               AND (? IS NULL OR category = ?) \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(owner_id)
        .bind(search.as_deref())
        .bind(search.as_deref())
        .bind(search.as_deref())
        .bind(category)
        .bind(category)
        .fetch_all(self.pool())
        .await?;

        Ok(docs)
    }

    /// Count live documents for an owner.
    pub async fn count_documents(&self, owner_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM documents WHERE owner_id = ? AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }

    /// Turn a live document into a tombstone.
    ///
    /// Returns the document if this call marked it, `None` if it does not exist,
    /// belongs to someone else, or is already a tombstone.
    pub async fn mark_document_deleted(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let doc = sqlx::query_as::<_, Document>(
            "UPDATE documents SET deleted_at = ? \
             WHERE id = ? AND owner_id = ? AND deleted_at IS NULL \
             RETURNING *",
        )
        .bind(unix_timestamp())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(doc)
    }

    /// Bring a tombstone back to life after its blob removal failed.
    pub async fn restore_document(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE documents SET deleted_at = NULL WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Drop a tombstoned row once its blob is gone.
    pub async fn purge_document(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND deleted_at IS NOT NULL")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All tombstones, oldest first.
    pub async fn list_tombstones(&self) -> Result<Vec<Document>, DatabaseError> {
        let docs = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE deleted_at IS NOT NULL ORDER BY deleted_at ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(docs)
    }
}
