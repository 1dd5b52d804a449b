//! Credential store: user registration and password verification.
//!
//! Passwords are hashed with argon2id and a random salt. Registration never
//! grants any role; admin membership is decided by [`super::AdminAllowList`].

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::{info, instrument, warn};

use crate::error::VaultError;
use crate::storage::{DatabaseError, User, VaultDatabase, normalize_email};

use super::Identity;

const MIN_PASSWORD_LEN: usize = 8;

fn hash_password(password: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| VaultError::Credential(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, VaultError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| VaultError::Credential(format!("Stored hash is unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn validate_password(password: &str) -> Result<(), VaultError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Opaque "create user / verify user" store over the users table.
#[derive(Clone)]
pub struct CredentialStore {
    db: VaultDatabase,
}

impl CredentialStore {
    pub const fn new(db: VaultDatabase) -> Self {
        Self { db }
    }

    /// Register a new free-plan user.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, VaultError> {
        let email = normalize_email(email);
        if full_name.trim().is_empty() {
            return Err(VaultError::Validation("Name is required".into()));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(VaultError::Validation(format!("Invalid email address: {email}")));
        }
        validate_password(password)?;

        match self.db.get_user_by_email(&email).await {
            Ok(_) => {
                return Err(VaultError::StateConflict(format!(
                    "Email {email} is already registered"
                )));
            }
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let hash = hash_password(password)?;
        let user_id = uuid::Uuid::new_v4().to_string();
        let user = self
            .db
            .create_user(&user_id, full_name, &email, &hash)
            .await?;

        info!(user_id = %user.id, email = %user.email, "User registered");
        Ok(user)
    }

    /// Check an email/password pair and return the caller's identity.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, email: &str, password: &str) -> Result<Identity, VaultError> {
        let user = match self.db.get_user_by_email(email).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                warn!(email = %normalize_email(email), "Login for unknown email");
                return Err(VaultError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(email = %user.email, "Failed login attempt");
            return Err(VaultError::InvalidCredentials);
        }

        Ok(Identity::from_user(&user))
    }

    /// Replace the caller's password after re-checking the current one.
    #[instrument(skip(self, current, new_password), fields(user_id = %identity.user_id()))]
    pub async fn change_password(
        &self,
        identity: &Identity,
        current: &str,
        new_password: &str,
    ) -> Result<(), VaultError> {
        let user = self.db.get_user(identity.user_id()).await?;
        if !verify_password(current, &user.password_hash)? {
            return Err(VaultError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let hash = hash_password(new_password)?;
        self.db.update_password_hash(&user.id, &hash).await?;

        info!(user_id = %user.id, "Password changed");
        Ok(())
    }
}
