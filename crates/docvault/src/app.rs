//! Service wiring.
//!
//! [`Vault`] owns one database handle and hands clones of it to each service,
//! together with the shared per-user lock table and clock.

use std::path::PathBuf;
use std::sync::Arc;

use docvault_core::Config;
use docvault_core::policy::AccessPolicy;
use serde::Serialize;
use tracing::info;

use crate::access::AccessGate;
use crate::auth::{AdminAllowList, CredentialStore, Identity};
use crate::billing::PaymentWorkflow;
use crate::blob::{BlobStore, FsBlobStore};
use crate::catalog::DocumentCatalog;
use crate::clock::Clock;
use crate::error::VaultError;
use crate::locks::UserLocks;
use crate::notifications::{LogReminderSink, ReminderSink, RenewalReminderJob};
use crate::storage::{ActivityEntry, User, VaultDatabase};

/// Admin view of a registered user.
#[derive(Debug, Clone, Serialize)]
pub struct UserOverview {
    #[serde(flatten)]
    pub user: User,
    pub is_admin: bool,
    pub documents: u64,
}

/// Emergency contact details supplied by the owner.
#[derive(Debug, Clone)]
pub struct EmergencyContact {
    pub name: String,
    pub email: String,
    pub relation: String,
}

#[derive(Clone)]
pub struct Vault {
    db: VaultDatabase,
    credentials: CredentialStore,
    gate: AccessGate,
    catalog: DocumentCatalog,
    payments: PaymentWorkflow,
    reminders: RenewalReminderJob,
}

impl Vault {
    /// Open the on-disk database and upload root named by `config`.
    pub async fn open(config: &Config) -> Result<Self, VaultError> {
        let db_path = config.storage.database_path().ok_or_else(|| {
            VaultError::Validation("No database path configured and no data directory".into())
        })?;
        let upload_root = config.storage.upload_root().ok_or_else(|| {
            VaultError::Validation("No upload root configured and no data directory".into())
        })?;
        let db = VaultDatabase::open(&db_path).await?;
        info!(db = %db_path.display(), uploads = %upload_root.display(), "Vault opened");
        Ok(Self::assemble(
            db,
            config,
            Arc::new(FsBlobStore::new(upload_root)),
            Arc::new(LogReminderSink),
            Clock::system(),
        ))
    }

    /// In-memory database with blobs under `upload_root` and a pinned clock.
    pub async fn open_in_memory(
        config: &Config,
        upload_root: impl Into<PathBuf>,
        clock: Clock,
    ) -> Result<Self, VaultError> {
        let db = VaultDatabase::open_in_memory().await?;
        Ok(Self::assemble(
            db,
            config,
            Arc::new(FsBlobStore::new(upload_root)),
            Arc::new(LogReminderSink),
            clock,
        ))
    }

    /// Wire services over an already-open database.
    pub fn assemble(
        db: VaultDatabase,
        config: &Config,
        blobs: Arc<dyn BlobStore>,
        sink: Arc<dyn ReminderSink>,
        clock: Clock,
    ) -> Self {
        let locks = UserLocks::new();
        let admins = AdminAllowList::from_config(&config.admin);
        let gate = AccessGate::new(
            db.clone(),
            AccessPolicy::from_config(&config.billing),
            clock.clone(),
        );
        Self {
            credentials: CredentialStore::new(db.clone()),
            catalog: DocumentCatalog::new(db.clone(), blobs, gate.clone(), locks.clone()),
            payments: PaymentWorkflow::new(db.clone(), admins, locks),
            reminders: RenewalReminderJob::new(
                db.clone(),
                sink,
                clock,
                &config.reminders.offsets_days,
            ),
            gate,
            db,
        }
    }

    pub const fn database(&self) -> &VaultDatabase {
        &self.db
    }

    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub const fn access(&self) -> &AccessGate {
        &self.gate
    }

    pub const fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    pub const fn payments(&self) -> &PaymentWorkflow {
        &self.payments
    }

    pub const fn reminders(&self) -> &RenewalReminderJob {
        &self.reminders
    }

    pub fn is_admin(&self, identity: &Identity) -> bool {
        self.payments.admins().is_admin(identity)
    }

    /// The caller's stored record.
    pub async fn profile(&self, identity: &Identity) -> Result<User, VaultError> {
        Ok(self.db.get_user(identity.user_id()).await?)
    }

    pub async fn set_emergency_contact(
        &self,
        identity: &Identity,
        contact: &EmergencyContact,
    ) -> Result<User, VaultError> {
        if contact.name.trim().is_empty() || !contact.email.contains('@') {
            return Err(VaultError::Validation(
                "Emergency contact needs a name and a valid email".into(),
            ));
        }
        let user = self
            .db
            .update_emergency_contact(
                identity.user_id(),
                &contact.name,
                &contact.email,
                &contact.relation,
            )
            .await?;
        info!(user_id = %user.id, "Emergency contact updated");
        Ok(user)
    }

    /// The caller's most recent activity, newest first.
    pub async fn activity(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<ActivityEntry>, VaultError> {
        Ok(self.db.recent_activity(identity.user_id(), limit).await?)
    }

    /// All users, optionally filtered by name or email. Admin only.
    pub async fn list_users(
        &self,
        admin: &Identity,
        search: Option<&str>,
    ) -> Result<Vec<UserOverview>, VaultError> {
        let admins = self.payments.admins();
        admins.require_admin(admin)?;

        let mut overview = Vec::new();
        for user in self.db.list_users(search).await? {
            let documents = u64::try_from(self.db.count_documents(&user.id).await?)
                .unwrap_or_default();
            overview.push(UserOverview {
                is_admin: admins.is_admin(&Identity::from_user(&user)),
                documents,
                user,
            });
        }
        Ok(overview)
    }
}
