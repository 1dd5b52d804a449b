//! Per-request access gating.
//!
//! Every decision reads the user row and the live document count fresh from
//! the database, since admin approvals change the outcome out-of-band.

use docvault_core::policy::{AccessPolicy, Action, Decision, Warning};
use docvault_core::subscription::{self, PaymentStatus, Plan, SubscriptionStatus};
use serde::Serialize;
use tracing::debug;

use crate::auth::Identity;
use crate::clock::Clock;
use crate::error::VaultError;
use crate::storage::{User, VaultDatabase};

/// Dashboard view of an account's standing.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub user_id: String,
    pub email: String,
    pub plan: Plan,
    pub payment_status: Option<PaymentStatus>,
    pub subscription_start: Option<String>,
    pub subscription_end: Option<String>,
    /// `None` for free accounts.
    pub subscription_status: Option<SubscriptionStatus>,
    pub days_left: Option<i64>,
    pub documents_used: u64,
    /// `None` when the plan is not capped.
    pub document_limit: Option<u64>,
    pub view: Decision,
    pub upload: Decision,
}

#[derive(Clone)]
pub struct AccessGate {
    db: VaultDatabase,
    policy: AccessPolicy,
    clock: Clock,
}

impl AccessGate {
    pub const fn new(db: VaultDatabase, policy: AccessPolicy, clock: Clock) -> Self {
        Self { db, policy, clock }
    }

    pub const fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    async fn snapshot(&self, identity: &Identity) -> Result<(User, u64), VaultError> {
        let user = self.db.get_user(identity.user_id()).await?;
        let used = self.db.count_documents(&user.id).await?;
        Ok((user, u64::try_from(used).unwrap_or_default()))
    }

    /// Evaluate `action` for the caller against fresh state.
    pub async fn evaluate(
        &self,
        identity: &Identity,
        action: Action,
    ) -> Result<Decision, VaultError> {
        let (user, used) = self.snapshot(identity).await?;
        let decision = self
            .policy
            .decide(&user.subscription(), used, action, self.clock.today());
        debug!(user_id = %user.id, %action, used, ?decision, "Access evaluated");
        Ok(decision)
    }

    /// Evaluate and turn a denial into [`VaultError::AccessDenied`].
    pub async fn require(
        &self,
        identity: &Identity,
        action: Action,
    ) -> Result<Option<Warning>, VaultError> {
        match self.evaluate(identity, action).await? {
            Decision::Allow => Ok(None),
            Decision::AllowWithWarning(w) => Ok(Some(w)),
            Decision::Deny(reason) => Err(VaultError::AccessDenied(reason)),
        }
    }

    /// Plan, window, usage and current decisions for the caller.
    pub async fn summary(&self, identity: &Identity) -> Result<AccountSummary, VaultError> {
        let (user, used) = self.snapshot(identity).await?;
        let today = self.clock.today();
        let account = user.subscription();
        let plan = account.plan;

        Ok(AccountSummary {
            plan,
            payment_status: user.payment_status(),
            subscription_status: self.policy.status(&account, today),
            days_left: if plan.is_free() {
                None
            } else {
                subscription::days_left(account.subscription_end, today)
            },
            documents_used: used,
            document_limit: plan.is_free().then(|| self.policy.free_limit()),
            view: self.policy.decide(&account, used, Action::View, today),
            upload: self.policy.decide(&account, used, Action::Upload, today),
            subscription_start: user.subscription_start.clone(),
            subscription_end: user.subscription_end.clone(),
            user_id: user.id,
            email: user.email,
        })
    }
}
