//! Activity log queries.

use docvault_core::db::unix_timestamp;

use super::db::{DatabaseError, VaultDatabase};
use super::models::ActivityEntry;

impl VaultDatabase {
    // =========================================================================
    // Activity log queries
    // =========================================================================

    /// Append an entry to a user's activity log.
    pub async fn log_activity(
        &self,
        user_id: &str,
        action: &str,
        doc_id: Option<&str>,
        details: Option<&str>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO activity_log (user_id, action, doc_id, details, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(doc_id)
        .bind(details)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Most recent activity for a user, newest first.
    pub async fn recent_activity(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ActivityEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            "SELECT * FROM activity_log WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }
}
