//! Error taxonomy for vault operations.

use docvault_core::db::DatabaseError;
use docvault_core::policy::DenyReason;

use crate::blob::BlobError;

/// Errors surfaced by vault operations.
///
/// Business failures (`Authorization` through `AccessDenied`) are reported to
/// the user as rejection messages. The rest are infrastructure failures; see
/// [`VaultError::is_infrastructure`].
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Non-admin invoking an admin-only operation.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Malformed input: non-positive amount, empty reference, bad dates, ...
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced user, document or submission does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored data is inconsistent, e.g. a submission with no owner.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// The requested transition conflicts with the current state.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// The access policy refused the action.
    #[error("Access denied: {0}")]
    AccessDenied(DenyReason),

    /// Email/password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Credential store error: {0}")]
    Credential(String),

    /// Building an export archive failed.
    #[error("Archive error: {0}")]
    Archive(String),
}

impl VaultError {
    /// True when the failure is the system's fault rather than a refusal.
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Blob(_) | Self::Credential(_) | Self::Archive(_)
        )
    }
}

impl From<DatabaseError> for VaultError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Conflict(what) => Self::StateConflict(what),
            other => Self::Database(other),
        }
    }
}
