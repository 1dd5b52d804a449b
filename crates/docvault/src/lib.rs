//! `DocVault` Library
//!
//! Document vault with a capped free tier and an admin-approved annual plan:
//! - SQLite subscription ledger, document catalog and activity log
//! - Per-request access gating through the policy engine
//! - Payment submission and admin review workflow
//! - Filesystem blob store and renewal reminders

pub mod access;
pub mod app;
pub mod auth;
pub mod billing;
pub mod blob;
pub mod catalog;
pub mod clock;
pub mod commands;
pub mod error;
pub mod locks;
pub mod notifications;
pub mod storage;

pub use app::Vault;
pub use error::VaultError;
