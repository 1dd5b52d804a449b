//! Admin authorization by configured allow-list.
//!
//! A user is an admin iff their email is in the allow-list loaded from
//! configuration. There is no stored role flag and no way to self-elevate
//! from inside the application.

use std::collections::BTreeSet;

use docvault_core::config::AdminConfig;
use tracing::warn;

use crate::error::VaultError;
use crate::storage::normalize_email;

use super::Identity;

/// Proof that the holder passed the admin check.
///
/// Coordinator mutations and admin listings take one of these, so they cannot
/// be called without going through [`AdminAllowList::require_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCapability {
    email: String,
}

impl AdminCapability {
    /// Email of the acting admin, recorded as the reviewer.
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Configured set of admin email addresses.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize_email(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(&config.emails)
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.emails.contains(&normalize_email(identity.email()))
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    /// Gate an admin-only operation.
    pub fn require_admin(&self, identity: &Identity) -> Result<AdminCapability, VaultError> {
        if self.is_admin(identity) {
            return Ok(AdminCapability {
                email: normalize_email(identity.email()),
            });
        }
        warn!(
            user_id = %identity.user_id(),
            email = %identity.email(),
            "Admin operation refused"
        );
        Err(VaultError::Authorization(
            "admin privileges required".to_string(),
        ))
    }
}
