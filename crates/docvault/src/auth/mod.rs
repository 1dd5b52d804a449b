//! Authentication and authorization.
//!
//! - [`CredentialStore`]: registration and argon2id password verification
//! - [`Identity`]: an authenticated caller, passed explicitly to every operation
//! - [`AdminAllowList`]: the single source of truth for the admin role

pub mod admin;
pub mod credentials;

pub use admin::{AdminAllowList, AdminCapability};
pub use credentials::CredentialStore;

use serde::{Deserialize, Serialize};

use crate::storage::User;

/// An authenticated caller.
///
/// Only obtainable from a successful credential check (or, inside the crate,
/// from a stored user record), so holding one proves who is acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: String,
    email: String,
}

impl Identity {
    pub(crate) fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
