//! Payment submission and subscription ledger queries.
//!
//! Every ledger mutation runs in one transaction whose first statement is a
//! write, so `SQLite` takes the write lock up front and concurrent reviews of
//! the same submission serialize instead of interleaving.

use docvault_core::db::unix_timestamp;
use docvault_core::subscription::{PaymentStatus, Plan, SubmissionStatus};

use super::db::{DatabaseError, VaultDatabase};
use super::models::{PaymentSubmission, PendingSubmission};

/// Parameters for recording a payment submission.
pub struct NewSubmission<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub provider: &'a str,
    pub currency: &'a str,
    pub amount: f64,
    pub reference: &'a str,
}

/// Parameters for an approved payment.
pub struct ApprovalParams<'a> {
    pub submission_id: &'a str,
    pub user_id: &'a str,
    pub reviewer: &'a str,
    pub subscription_start: &'a str,
    pub subscription_end: &'a str,
    pub amount: f64,
    pub currency: &'a str,
    pub provider: &'a str,
}

/// Result of a conditional ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    /// The submission was pending and has been resolved by this call.
    Applied,
    /// The submission was already resolved; nothing was written.
    AlreadyResolved(SubmissionStatus),
    /// The submission is pending but a newer one from the same user is
    /// waiting; only the latest is reviewable. Nothing was written.
    NotLatest,
}

impl VaultDatabase {
    // =========================================================================
    // Payment submission queries
    // =========================================================================

    /// Record a submission and mark its owner as pending, atomically.
    pub async fn create_submission(
        &self,
        sub: &NewSubmission<'_>,
    ) -> Result<PaymentSubmission, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let owner = sqlx::query("UPDATE users SET payment_status = ?, updated_at = ? WHERE id = ?")
            .bind(PaymentStatus::Pending.as_str())
            .bind(now)
            .bind(sub.user_id)
            .execute(&mut *tx)
            .await?;
        if owner.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("User {}", sub.user_id)));
        }

        sqlx::query(
            "INSERT INTO payments (id, user_id, provider, currency, amount, reference, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sub.id)
        .bind(sub.user_id)
        .bind(sub.provider)
        .bind(sub.currency)
        .bind(sub.amount)
        .bind(sub.reference)
        .bind(SubmissionStatus::Pending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_submission(sub.id).await
    }

    /// Get a submission by ID.
    pub async fn get_submission(&self, id: &str) -> Result<PaymentSubmission, DatabaseError> {
        sqlx::query_as::<_, PaymentSubmission>("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Payment submission {id}")))
    }

    /// All submissions of one user, newest first.
    pub async fn list_user_submissions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PaymentSubmission>, DatabaseError> {
        let subs = sqlx::query_as::<_, PaymentSubmission>(
            "SELECT * FROM payments WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(subs)
    }

    /// The actionable submission per pending user: the latest pending one,
    /// newest first across users.
    pub async fn list_pending_submissions(&self) -> Result<Vec<PendingSubmission>, DatabaseError> {
        let rows = sqlx::query_as::<_, PendingSubmission>(
            "SELECT p.id, p.user_id, u.full_name, u.email, u.plan, u.subscription_end, \
                    p.provider, p.currency, p.amount, p.reference, p.created_at \
             FROM payments p \
             JOIN users u ON u.id = p.user_id \
             WHERE p.status = 'pending' AND u.payment_status = 'pending' \
               AND p.rowid = ( \
                   SELECT p2.rowid FROM payments p2 \
                   WHERE p2.user_id = p.user_id AND p2.status = 'pending' \
                   ORDER BY p2.created_at DESC, p2.rowid DESC LIMIT 1) \
             ORDER BY p.created_at DESC, p.rowid DESC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Pending submissions with no owner. These cannot be reviewed and need
    /// manual repair.
    pub async fn list_orphaned_submissions(
        &self,
    ) -> Result<Vec<PaymentSubmission>, DatabaseError> {
        let subs = sqlx::query_as::<_, PaymentSubmission>(
            "SELECT * FROM payments WHERE user_id IS NULL AND status = 'pending' \
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(subs)
    }

    // =========================================================================
    // Ledger transitions
    // =========================================================================

    /// Approve the owner's latest pending submission and activate the annual
    /// plan.
    ///
    /// In one transaction: the submission becomes `approved`, the owner gets
    /// `plan = ANNUAL`, the new window and `payment_status = active`, and the
    /// owner's other pending submissions become `superseded`.
    pub async fn apply_approval(
        &self,
        approval: &ApprovalParams<'_>,
    ) -> Result<LedgerWrite, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let claim = claim_latest_pending(
            &mut tx,
            approval.submission_id,
            approval.user_id,
            SubmissionStatus::Approved,
            approval.reviewer,
            now,
        )
        .await?;
        if let Some(write) = claim {
            tx.rollback().await?;
            return Ok(write);
        }

        let owner = sqlx::query(
            "UPDATE users SET plan = ?, subscription_start = ?, subscription_end = ?, payment_status = ?, \
                 last_payment_amount = ?, last_payment_currency = ?, last_payment_provider = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(Plan::Annual.as_str())
        .bind(approval.subscription_start)
        .bind(approval.subscription_end)
        .bind(PaymentStatus::Active.as_str())
        .bind(approval.amount)
        .bind(approval.currency)
        .bind(approval.provider)
        .bind(now)
        .bind(approval.user_id)
        .execute(&mut *tx)
        .await?;
        if owner.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(format!("User {}", approval.user_id)));
        }

        supersede_pending(&mut tx, approval.user_id, approval.reviewer, now).await?;

        tx.commit().await?;
        Ok(LedgerWrite::Applied)
    }

    /// Reject the owner's latest pending submission.
    ///
    /// In one transaction: the submission becomes `rejected`, the owner's
    /// `payment_status` becomes `rejected` (plan and window untouched), and the
    /// owner's other pending submissions become `superseded`.
    pub async fn apply_rejection(
        &self,
        submission_id: &str,
        user_id: &str,
        reviewer: &str,
    ) -> Result<LedgerWrite, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let claim = claim_latest_pending(
            &mut tx,
            submission_id,
            user_id,
            SubmissionStatus::Rejected,
            reviewer,
            now,
        )
        .await?;
        if let Some(write) = claim {
            tx.rollback().await?;
            return Ok(write);
        }

        let owner = sqlx::query("UPDATE users SET payment_status = ?, updated_at = ? WHERE id = ?")
            .bind(PaymentStatus::Rejected.as_str())
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if owner.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::NotFound(format!("User {user_id}")));
        }

        supersede_pending(&mut tx, user_id, reviewer, now).await?;

        tx.commit().await?;
        Ok(LedgerWrite::Applied)
    }
}

/// Resolve the submission to `status` if it is its owner's latest pending one.
///
/// Returns `None` when the row was claimed, or the reason nothing was written.
async fn claim_latest_pending(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    submission_id: &str,
    user_id: &str,
    status: SubmissionStatus,
    reviewer: &str,
    now: i64,
) -> Result<Option<LedgerWrite>, DatabaseError> {
    let claimed = sqlx::query(
        "UPDATE payments SET status = ?, reviewed_by = ?, reviewed_at = ? \
         WHERE id = ? AND user_id = ? AND status = 'pending' \
           AND rowid = ( \
               SELECT rowid FROM payments \
               WHERE user_id = ? AND status = 'pending' \
               ORDER BY created_at DESC, rowid DESC LIMIT 1)",
    )
    .bind(status.as_str())
    .bind(reviewer)
    .bind(now)
    .bind(submission_id)
    .bind(user_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    if claimed.rows_affected() == 1 {
        return Ok(None);
    }

    let current: Option<String> =
        sqlx::query_scalar("SELECT status FROM payments WHERE id = ? AND user_id = ?")
            .bind(submission_id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    resolved_state(submission_id, current).map(Some)
}

async fn supersede_pending(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
    reviewer: &str,
    now: i64,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE payments SET status = ?, reviewed_by = ?, reviewed_at = ? \
         WHERE user_id = ? AND status = 'pending'",
    )
    .bind(SubmissionStatus::Superseded.as_str())
    .bind(reviewer)
    .bind(now)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

fn resolved_state(
    submission_id: &str,
    current: Option<String>,
) -> Result<LedgerWrite, DatabaseError> {
    let Some(status) = current else {
        return Err(DatabaseError::NotFound(format!(
            "Payment submission {submission_id}"
        )));
    };
    SubmissionStatus::parse(&status)
        .map(|status| match status {
            SubmissionStatus::Pending => LedgerWrite::NotLatest,
            resolved => LedgerWrite::AlreadyResolved(resolved),
        })
        .ok_or_else(|| {
            DatabaseError::Query(format!(
                "Payment submission {submission_id} has unknown status {status}"
            ))
        })
}
