//! Payment subcommands: submit, history, pending, orphaned, approve, reject.

use std::io::{self, Write};

use chrono::{Days, NaiveDate};

use crate::Vault;
use crate::billing::{ApprovalOutcome, ApprovalTerms, PaymentRequest, RejectionOutcome};
use crate::error::VaultError;

use super::Login;

/// Default length of an approved subscription window.
const DEFAULT_TERM_DAYS: u64 = 365;

/// Payment subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum PayAction {
    /// Report a payment for admin review.
    Submit {
        /// Payment provider (e.g. paystack, bank).
        #[arg(long)]
        provider: String,
        /// Currency code (NGN, USD, ...).
        #[arg(long)]
        currency: String,
        /// Amount paid.
        #[arg(long)]
        amount: f64,
        /// Provider transaction reference.
        #[arg(long)]
        reference: String,
    },
    /// Show your own submissions.
    History,
    /// List submissions awaiting review (admin).
    Pending,
    /// List pending submissions with no owner (admin).
    Orphaned,
    /// Approve a submission and activate the annual plan (admin).
    Approve {
        /// Submission ID.
        submission_id: String,
        /// Subscription start; defaults to today.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Subscription end; defaults to start plus one year.
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Confirmed amount; defaults to the reported one.
        #[arg(long)]
        amount: Option<f64>,
        /// Confirmed currency; defaults to the reported one.
        #[arg(long)]
        currency: Option<String>,
        /// Confirmed provider; defaults to the reported one.
        #[arg(long)]
        provider: Option<String>,
    },
    /// Reject a submission (admin).
    Reject {
        /// Submission ID.
        submission_id: String,
    },
}

/// Execute a payment subcommand.
pub async fn run(action: PayAction, vault: &Vault, login: &Login) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let payments = vault.payments();
    let mut out = io::stdout();

    match action {
        PayAction::Submit {
            provider,
            currency,
            amount,
            reference,
        } => {
            let sub = payments
                .submit(
                    &identity,
                    &PaymentRequest {
                        provider,
                        currency,
                        amount,
                        reference,
                    },
                )
                .await?;
            writeln!(
                out,
                "Submitted {} {} via {} (ref {}); awaiting admin review. ID: {}",
                sub.currency, sub.amount, sub.provider, sub.reference, sub.id
            )?;
        }
        PayAction::History => {
            let subs = payments.my_submissions(&identity).await?;
            if subs.is_empty() {
                writeln!(out, "No payment submissions")?;
                return Ok(());
            }
            writeln!(out, "{:<36} {:<10} {:>10} {:<4} REFERENCE", "ID", "STATUS", "AMOUNT", "CUR")?;
            for s in &subs {
                writeln!(
                    out,
                    "{:<36} {:<10} {:>10.2} {:<4} {}",
                    s.id, s.status, s.amount, s.currency, s.reference
                )?;
            }
        }
        PayAction::Pending => {
            let pending = payments.list_pending(&identity).await?;
            if pending.is_empty() {
                writeln!(out, "No pending payments")?;
                return Ok(());
            }
            writeln!(
                out,
                "{:<36} {:<28} {:>10} {:<4} {:<10} {:<12} REFERENCE",
                "ID", "EMAIL", "AMOUNT", "CUR", "PROVIDER", "CURRENT END"
            )?;
            for p in &pending {
                writeln!(
                    out,
                    "{:<36} {:<28} {:>10.2} {:<4} {:<10} {:<12} {}",
                    p.id,
                    p.email,
                    p.amount,
                    p.currency,
                    p.provider,
                    p.subscription_end.as_deref().unwrap_or("-"),
                    p.reference
                )?;
            }
        }
        PayAction::Orphaned => {
            let orphans = payments.list_orphaned(&identity).await?;
            if orphans.is_empty() {
                writeln!(out, "No orphaned submissions")?;
                return Ok(());
            }
            for o in &orphans {
                writeln!(out, "{}  {} {}  ref {}", o.id, o.currency, o.amount, o.reference)?;
            }
        }
        PayAction::Approve {
            submission_id,
            start,
            end,
            amount,
            currency,
            provider,
        } => {
            payments.admins().require_admin(&identity)?;
            let submission = vault.database().get_submission(&submission_id).await?;
            let start = start.unwrap_or_else(|| vault.access().clock().today());
            let end = match end {
                Some(end) => end,
                None => default_end(start)?,
            };
            let mut terms = ApprovalTerms::confirming(&submission, start, end);
            if let Some(amount) = amount {
                terms.amount = amount;
            }
            if let Some(currency) = currency {
                terms.currency = currency;
            }
            if let Some(provider) = provider {
                terms.provider = provider;
            }

            match payments.approve(&identity, &submission_id, &terms).await? {
                ApprovalOutcome::Activated => {
                    writeln!(out, "Approved {submission_id}: annual plan active {start} to {end}")?;
                }
                ApprovalOutcome::AlreadyApproved => {
                    writeln!(out, "{submission_id} was already approved for {start} to {end}")?;
                }
            }
        }
        PayAction::Reject { submission_id } => {
            match payments.reject(&identity, &submission_id).await? {
                RejectionOutcome::Rejected => writeln!(out, "Rejected {submission_id}")?,
                RejectionOutcome::AlreadyRejected => {
                    writeln!(out, "{submission_id} was already rejected")?;
                }
            }
        }
    }
    Ok(())
}

/// End of a default-length window starting at `start`.
fn default_end(start: NaiveDate) -> Result<NaiveDate, VaultError> {
    start
        .checked_add_days(Days::new(DEFAULT_TERM_DAYS))
        .ok_or_else(|| {
            VaultError::Validation(format!(
                "Start {start} is too late for a {DEFAULT_TERM_DAYS}-day window; pass --end"
            ))
        })
}
