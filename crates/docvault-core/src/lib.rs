//! `DocVault` Core Library
//!
//! Shared functionality for `DocVault` components:
//! - Configuration resolution and hierarchy
//! - Subscription window arithmetic
//! - Access policy engine (upload/view gating)
//! - Common error and database types

pub mod config;
pub mod db;
pub mod error;
pub mod policy;
pub mod subscription;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use policy::{AccessPolicy, Action, Decision, DenyReason, Warning};
pub use subscription::{PaymentStatus, Plan, SubscriptionStatus};
