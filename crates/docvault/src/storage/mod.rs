//! SQLite storage for the vault.
//!
//! Provides persistence for users (credentials and subscription ledger),
//! document metadata, payment submissions, and the activity log.

mod db;
mod models;
mod queries;
mod queries_activity;
mod queries_documents;
mod queries_payments;


pub use db::{DatabaseError, VaultDatabase};
pub use models::*;
pub use queries::normalize_email;
pub use queries_documents::{DocumentFilter, NewDocument};
pub use queries_payments::{ApprovalParams, LedgerWrite, NewSubmission};
