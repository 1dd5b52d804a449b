//! User queries for the vault database.

use docvault_core::db::unix_timestamp;

use super::db::{DatabaseError, VaultDatabase};
use super::models::User;

/// Normalise an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl VaultDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user on the free plan.
    pub async fn create_user(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, full_name, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(full_name.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        let email = normalize_email(email);
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {email}")))
    }

    /// List users, newest first, optionally filtered by a name/email substring.
    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<User>, DatabaseError> {
        let users = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                let like = format!("%{}%", term.to_lowercase());
                sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE lower(full_name) LIKE ? OR email LIKE ? ORDER BY created_at DESC, rowid DESC",
                )
                .bind(&like)
                .bind(&like)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, rowid DESC")
                    .fetch_all(self.pool())
                    .await?
            }
        };

        Ok(users)
    }

    /// Replace a user's password hash.
    pub async fn update_password_hash(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(unix_timestamp())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        Ok(())
    }

    /// Set the user's emergency contact.
    pub async fn update_emergency_contact(
        &self,
        id: &str,
        name: &str,
        email: &str,
        relation: &str,
    ) -> Result<User, DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET emergency_name = ?, emergency_email = ?, emergency_relation = ?, updated_at = ? WHERE id = ?",
        )
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(relation.trim())
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {id}")));
        }
        self.get_user(id).await
    }

    /// Users on a paid plan whose subscription ends exactly on `date` (`YYYY-MM-DD`).
    pub async fn users_with_subscription_end(
        &self,
        date: &str,
    ) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE subscription_end = ? AND upper(plan) <> 'FREE' ORDER BY email",
        )
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }
}
