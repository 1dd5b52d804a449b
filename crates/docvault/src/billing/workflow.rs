//! Payment workflow coordinator.
//!
//! Per-user state machine over `payment_status`:
//!
//! ```text
//! NONE ──submit──▶ PENDING ──approve──▶ ACTIVE ──(time)──▶ expired
//!                     │                                       │
//!                     └──reject──▶ REJECTED ──submit──▶ PENDING ◀──submit──┘
//! ```
//!
//! Approval is the only path that sets `plan = ANNUAL` or writes the
//! subscription window. Approve and reject require an admin capability.

use chrono::NaiveDate;
use docvault_core::subscription::{SubmissionStatus, format_date};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::auth::{AdminAllowList, AdminCapability, Identity};
use crate::error::VaultError;
use crate::locks::UserLocks;
use crate::storage::{
    ApprovalParams, DatabaseError, LedgerWrite, NewSubmission, PaymentSubmission,
    PendingSubmission, User, VaultDatabase,
};

/// A user's report of a payment they made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub provider: String,
    pub currency: String,
    pub amount: f64,
    pub reference: String,
}

/// What the admin grants when approving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalTerms {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub provider: String,
}

impl ApprovalTerms {
    /// Terms that confirm the submission as reported, for the given window.
    pub fn confirming(submission: &PaymentSubmission, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            amount: submission.amount,
            currency: submission.currency.clone(),
            provider: submission.provider.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// The subscription window was written by this call.
    Activated,
    /// Same submission was already approved with the same window; nothing changed.
    AlreadyApproved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionOutcome {
    Rejected,
    AlreadyRejected,
}

fn normalize_request(request: &PaymentRequest) -> Result<PaymentRequest, VaultError> {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return Err(VaultError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    let reference = request.reference.trim();
    if reference.is_empty() {
        return Err(VaultError::Validation("Payment reference is required".into()));
    }
    let provider = request.provider.trim().to_lowercase();
    if provider.is_empty() {
        return Err(VaultError::Validation("Payment provider is required".into()));
    }
    let currency = request.currency.trim().to_uppercase();
    if currency.is_empty() {
        return Err(VaultError::Validation("Currency is required".into()));
    }
    Ok(PaymentRequest {
        provider,
        currency,
        amount: request.amount,
        reference: reference.to_string(),
    })
}

fn validate_terms(terms: &ApprovalTerms) -> Result<(), VaultError> {
    if terms.start > terms.end {
        return Err(VaultError::Validation(format!(
            "Subscription end {} is before start {}",
            terms.end, terms.start
        )));
    }
    if !terms.amount.is_finite() || terms.amount < 0.0 {
        return Err(VaultError::Validation("Amount must not be negative".into()));
    }
    if terms.currency.trim().is_empty() || terms.provider.trim().is_empty() {
        return Err(VaultError::Validation(
            "Currency and provider are required".into(),
        ));
    }
    Ok(())
}

/// Owner of a submission, or a data integrity error for orphans.
fn owner_of(submission: &PaymentSubmission) -> Result<String, VaultError> {
    match submission.user_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => {
            error!(submission_id = %submission.id, "Payment submission has no owner");
            Err(VaultError::DataIntegrity(format!(
                "Payment submission {} has no user associated with it",
                submission.id
            )))
        }
    }
}

#[derive(Clone)]
pub struct PaymentWorkflow {
    db: VaultDatabase,
    admins: AdminAllowList,
    locks: UserLocks,
}

impl PaymentWorkflow {
    pub const fn new(db: VaultDatabase, admins: AdminAllowList, locks: UserLocks) -> Self {
        Self { db, admins, locks }
    }

    pub const fn admins(&self) -> &AdminAllowList {
        &self.admins
    }

    /// Record a payment reference and put the caller's account in PENDING.
    ///
    /// Resubmission is always allowed, whatever the current state.
    #[instrument(skip(self, request), fields(user_id = %identity.user_id()))]
    pub async fn submit(
        &self,
        identity: &Identity,
        request: &PaymentRequest,
    ) -> Result<PaymentSubmission, VaultError> {
        let request = normalize_request(request)?;
        let _guard = self.locks.lock(identity.user_id()).await;

        let id = uuid::Uuid::new_v4().to_string();
        let submission = self
            .db
            .create_submission(&NewSubmission {
                id: &id,
                user_id: identity.user_id(),
                provider: &request.provider,
                currency: &request.currency,
                amount: request.amount,
                reference: &request.reference,
            })
            .await?;

        self.log(
            identity.user_id(),
            "payment_submitted",
            &format!(
                "{} {} via {} (ref {})",
                request.currency, request.amount, request.provider, request.reference
            ),
        )
        .await;
        info!(
            submission_id = %submission.id,
            currency = %submission.currency,
            amount = submission.amount,
            "Payment submitted for review"
        );
        Ok(submission)
    }

    /// The caller's own submissions, newest first.
    pub async fn my_submissions(
        &self,
        identity: &Identity,
    ) -> Result<Vec<PaymentSubmission>, VaultError> {
        Ok(self.db.list_user_submissions(identity.user_id()).await?)
    }

    /// Actionable submissions awaiting review, newest first.
    pub async fn list_pending(
        &self,
        admin: &Identity,
    ) -> Result<Vec<PendingSubmission>, VaultError> {
        self.admins.require_admin(admin)?;
        Ok(self.db.list_pending_submissions().await?)
    }

    /// Pending submissions that have lost their owner and cannot be reviewed.
    pub async fn list_orphaned(
        &self,
        admin: &Identity,
    ) -> Result<Vec<PaymentSubmission>, VaultError> {
        self.admins.require_admin(admin)?;
        Ok(self.db.list_orphaned_submissions().await?)
    }

    /// Approve a submission and activate its owner's annual plan.
    ///
    /// Only the owner's latest pending submission can be approved. Re-approving
    /// an approved submission with the same window succeeds without writing;
    /// an older pending submission or any other transition out of a resolved
    /// one is a [`VaultError::StateConflict`].
    #[instrument(skip(self, terms), fields(admin = %admin.email()))]
    pub async fn approve(
        &self,
        admin: &Identity,
        submission_id: &str,
        terms: &ApprovalTerms,
    ) -> Result<ApprovalOutcome, VaultError> {
        let cap = self.admins.require_admin(admin)?;
        validate_terms(terms)?;

        let (submission, owner) = self.resolve_owner(submission_id).await?;
        let _guard = self.locks.lock(&owner.id).await;

        let start = format_date(terms.start);
        let end = format_date(terms.end);
        let currency = terms.currency.trim().to_uppercase();
        let provider = terms.provider.trim().to_lowercase();

        let write = self
            .db
            .apply_approval(&ApprovalParams {
                submission_id: &submission.id,
                user_id: &owner.id,
                reviewer: cap.email(),
                subscription_start: &start,
                subscription_end: &end,
                amount: terms.amount,
                currency: &currency,
                provider: &provider,
            })
            .await?;

        match write {
            LedgerWrite::Applied => {
                self.log(
                    &owner.id,
                    "payment_approved",
                    &format!("Annual plan active {start} to {end} (approved by {})", cap.email()),
                )
                .await;
                info!(
                    submission_id = %submission.id,
                    user_id = %owner.id,
                    start = %start,
                    end = %end,
                    "Payment approved, subscription activated"
                );
                Ok(ApprovalOutcome::Activated)
            }
            LedgerWrite::AlreadyResolved(SubmissionStatus::Approved) => {
                let current = self.db.get_user(&owner.id).await?;
                let same_window = current.subscription_start.as_deref() == Some(start.as_str())
                    && current.subscription_end.as_deref() == Some(end.as_str());
                if same_window {
                    info!(submission_id = %submission.id, "Repeat approval, ledger unchanged");
                    Ok(ApprovalOutcome::AlreadyApproved)
                } else {
                    Err(conflict(&submission.id, SubmissionStatus::Approved, &cap))
                }
            }
            LedgerWrite::AlreadyResolved(status) => Err(conflict(&submission.id, status, &cap)),
            LedgerWrite::NotLatest => Err(not_latest(&submission.id, &owner.id, &cap)),
        }
    }

    /// Reject the owner's latest pending submission. Plan and subscription
    /// window are left as they are.
    #[instrument(skip(self), fields(admin = %admin.email()))]
    pub async fn reject(
        &self,
        admin: &Identity,
        submission_id: &str,
    ) -> Result<RejectionOutcome, VaultError> {
        let cap = self.admins.require_admin(admin)?;

        let (submission, owner) = self.resolve_owner(submission_id).await?;
        let _guard = self.locks.lock(&owner.id).await;

        match self
            .db
            .apply_rejection(&submission.id, &owner.id, cap.email())
            .await?
        {
            LedgerWrite::Applied => {
                self.log(
                    &owner.id,
                    "payment_rejected",
                    &format!("Reference {} rejected by {}", submission.reference, cap.email()),
                )
                .await;
                info!(submission_id = %submission.id, user_id = %owner.id, "Payment rejected");
                Ok(RejectionOutcome::Rejected)
            }
            LedgerWrite::AlreadyResolved(SubmissionStatus::Rejected) => {
                Ok(RejectionOutcome::AlreadyRejected)
            }
            LedgerWrite::AlreadyResolved(status) => Err(conflict(&submission.id, status, &cap)),
            LedgerWrite::NotLatest => Err(not_latest(&submission.id, &owner.id, &cap)),
        }
    }

    /// Load a submission and its owner, failing on orphans.
    async fn resolve_owner(
        &self,
        submission_id: &str,
    ) -> Result<(PaymentSubmission, User), VaultError> {
        let submission = self.db.get_submission(submission_id).await?;
        let owner_id = owner_of(&submission)?;
        match self.db.get_user(&owner_id).await {
            Ok(user) => Ok((submission, user)),
            Err(DatabaseError::NotFound(_)) => {
                error!(submission_id, owner_id = %owner_id, "Payment submission owner does not exist");
                Err(VaultError::DataIntegrity(format!(
                    "Payment submission {submission_id} belongs to missing user {owner_id}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn log(&self, user_id: &str, action: &str, details: &str) {
        if let Err(e) = self
            .db
            .log_activity(user_id, action, None, Some(details))
            .await
        {
            warn!(user_id, action, error = %e, "Failed to record activity");
        }
    }
}

fn conflict(submission_id: &str, status: SubmissionStatus, cap: &AdminCapability) -> VaultError {
    warn!(submission_id, %status, admin = %cap.email(), "Review of resolved submission refused");
    VaultError::StateConflict(format!(
        "Payment submission {submission_id} is already {status}"
    ))
}

fn not_latest(submission_id: &str, user_id: &str, cap: &AdminCapability) -> VaultError {
    warn!(submission_id, user_id, admin = %cap.email(), "Review of outdated submission refused");
    VaultError::StateConflict(format!(
        "Payment submission {submission_id} was superseded by a newer submission"
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::float_cmp)]
#[path = "workflow_tests.rs"]
mod tests;
