#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end subscription scenarios: free limit, payment approval, lockout
//! after grace, and admin-only review.

use chrono::NaiveDate;
use docvault::Vault;
use docvault::auth::Identity;
use docvault::billing::{ApprovalOutcome, ApprovalTerms, PaymentRequest};
use docvault::catalog::UploadRequest;
use docvault::clock::Clock;
use docvault::error::VaultError;
use docvault::storage::DocumentFilter;
use docvault_core::Config;
use docvault_core::policy::{Action, Decision, DenyReason, Warning};
use docvault_core::subscription::{PaymentStatus, Plan};

const ADMIN_EMAIL: &str = "admin@vault.test";
const PASSWORD: &str = "correct horse";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct Harness {
    vault: Vault,
    admin: Identity,
    _uploads: tempfile::TempDir,
}

async fn harness(today: &str) -> Harness {
    let mut config = Config::default();
    config.admin.emails = vec![ADMIN_EMAIL.to_string()];
    let uploads = tempfile::tempdir().unwrap();
    let vault = Vault::open_in_memory(&config, uploads.path(), Clock::fixed(date(today)))
        .await
        .unwrap();
    let admin = register(&vault, "Admin", ADMIN_EMAIL).await;
    Harness {
        vault,
        admin,
        _uploads: uploads,
    }
}

async fn register(vault: &Vault, name: &str, email: &str) -> Identity {
    vault
        .credentials()
        .register(name, email, PASSWORD)
        .await
        .unwrap();
    vault.credentials().verify(email, PASSWORD).await.unwrap()
}

fn upload(name: &str) -> UploadRequest {
    UploadRequest {
        file_name: name.to_string(),
        bytes: format!("contents of {name}").into_bytes(),
        category: "Identity".to_string(),
        notes: None,
        expiry_date: None,
    }
}

fn naira(reference: &str) -> PaymentRequest {
    PaymentRequest {
        provider: "paystack".into(),
        currency: "NGN".into(),
        amount: 35_000.0,
        reference: reference.into(),
    }
}

/// Submit a payment and have the admin approve it for `start..=end`.
async fn activate(h: &Harness, user: &Identity, start: &str, end: &str) {
    let sub = h.vault.payments().submit(user, &naira("ACT")).await.unwrap();
    let terms = ApprovalTerms::confirming(&sub, date(start), date(end));
    h.vault
        .payments()
        .approve(&h.admin, &sub.id, &terms)
        .await
        .unwrap();
}

#[tokio::test]
async fn free_user_is_capped_at_five_documents() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Free User", "free@vault.test").await;

    for i in 1..=5 {
        let outcome = h
            .vault
            .catalog()
            .upload(&user, upload(&format!("doc{i}.pdf")))
            .await
            .unwrap();
        assert!(outcome.warning.is_none());
    }

    let sixth = h.vault.catalog().upload(&user, upload("doc6.pdf")).await;
    assert!(matches!(
        sixth,
        Err(VaultError::AccessDenied(DenyReason::FreeLimitReached { limit: 5 }))
    ));
    assert_eq!(
        h.vault.access().evaluate(&user, Action::View).await.unwrap(),
        Decision::Allow
    );

    let (docs, _) = h
        .vault
        .catalog()
        .browse(&user, &DocumentFilter::default())
        .await
        .unwrap();
    assert_eq!(docs.len(), 5);
}

#[tokio::test]
async fn approved_payment_lifts_the_free_limit() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Payer", "payer@vault.test").await;
    for i in 1..=5 {
        h.vault
            .catalog()
            .upload(&user, upload(&format!("doc{i}.pdf")))
            .await
            .unwrap();
    }

    let sub = h
        .vault
        .payments()
        .submit(&user, &naira("ABC123"))
        .await
        .unwrap();
    let pending = h.vault.payments().list_pending(&h.admin).await.unwrap();
    assert!(pending.iter().any(|p| p.id == sub.id && p.reference == "ABC123"));

    let terms = ApprovalTerms::confirming(&sub, date("2025-01-01"), date("2026-01-01"));
    let outcome = h
        .vault
        .payments()
        .approve(&h.admin, &sub.id, &terms)
        .await
        .unwrap();
    assert_eq!(outcome, ApprovalOutcome::Activated);

    let profile = h.vault.profile(&user).await.unwrap();
    assert_eq!(profile.plan(), Plan::Annual);
    assert_eq!(profile.payment_status(), Some(PaymentStatus::Active));
    assert_eq!(
        h.vault.access().evaluate(&user, Action::Upload).await.unwrap(),
        Decision::Allow
    );
    h.vault
        .catalog()
        .upload(&user, upload("doc6.pdf"))
        .await
        .unwrap();
}

#[tokio::test]
async fn lapsed_subscription_locks_after_grace() {
    let h = harness("2025-06-15").await;
    let user = register(&h.vault, "Lapsed", "lapsed@vault.test").await;
    activate(&h, &user, "2024-06-05", "2025-06-05").await;

    let gate = h.vault.access();
    let locked = Decision::Deny(DenyReason::SubscriptionExpired);
    assert_eq!(gate.evaluate(&user, Action::View).await.unwrap(), locked);
    assert_eq!(gate.evaluate(&user, Action::Upload).await.unwrap(), locked);

    assert!(matches!(
        h.vault
            .catalog()
            .browse(&user, &DocumentFilter::default())
            .await,
        Err(VaultError::AccessDenied(DenyReason::SubscriptionExpired))
    ));
    assert!(matches!(
        h.vault.catalog().upload(&user, upload("late.pdf")).await,
        Err(VaultError::AccessDenied(DenyReason::SubscriptionExpired))
    ));
}

#[tokio::test]
async fn grace_period_allows_with_warning() {
    let h = harness("2025-06-06").await;
    let user = register(&h.vault, "Grace", "grace@vault.test").await;
    activate(&h, &user, "2024-06-05", "2025-06-05").await;

    let outcome = h
        .vault
        .catalog()
        .upload(&user, upload("grace.pdf"))
        .await
        .unwrap();
    assert_eq!(
        outcome.warning,
        Some(Warning::GracePeriod { days_remaining: 6 })
    );
}

#[tokio::test]
async fn renewal_is_reported_near_the_end_date() {
    let h = harness("2025-12-29").await;
    let user = register(&h.vault, "Renew", "renew@vault.test").await;
    activate(&h, &user, "2025-01-01", "2026-01-01").await;

    let summary = h.vault.access().summary(&user).await.unwrap();
    assert_eq!(summary.days_left, Some(3));
    assert_eq!(
        summary.upload,
        Decision::AllowWithWarning(Warning::RenewalDue { days_left: 3 })
    );
    assert_eq!(summary.document_limit, None);
}

#[tokio::test]
async fn non_admin_cannot_approve() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Sneaky", "sneaky@vault.test").await;
    let sub = h
        .vault
        .payments()
        .submit(&user, &naira("SELF"))
        .await
        .unwrap();

    let terms = ApprovalTerms::confirming(&sub, date("2025-01-01"), date("2026-01-01"));
    let result = h.vault.payments().approve(&user, &sub.id, &terms).await;
    assert!(matches!(result, Err(VaultError::Authorization(_))));

    let profile = h.vault.profile(&user).await.unwrap();
    assert_eq!(profile.plan(), Plan::Free);
    assert_eq!(profile.payment_status(), Some(PaymentStatus::Pending));
    assert!(profile.subscription_end.is_none());
    assert!(matches!(
        h.vault.list_users(&user, None).await,
        Err(VaultError::Authorization(_))
    ));
}

#[tokio::test]
async fn second_identical_approval_leaves_ledger_unchanged() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Twice", "twice@vault.test").await;
    let sub = h
        .vault
        .payments()
        .submit(&user, &naira("TWICE"))
        .await
        .unwrap();
    let terms = ApprovalTerms::confirming(&sub, date("2025-01-01"), date("2026-01-01"));

    h.vault
        .payments()
        .approve(&h.admin, &sub.id, &terms)
        .await
        .unwrap();
    let once = h.vault.profile(&user).await.unwrap();

    let again = h
        .vault
        .payments()
        .approve(&h.admin, &sub.id, &terms)
        .await
        .unwrap();
    assert_eq!(again, ApprovalOutcome::AlreadyApproved);

    let twice = h.vault.profile(&user).await.unwrap();
    assert_eq!(once.subscription_start, twice.subscription_start);
    assert_eq!(once.subscription_end, twice.subscription_end);
    assert_eq!(once.payment_status, twice.payment_status);
    assert_eq!(once.plan, twice.plan);
}

#[tokio::test]
async fn submission_round_trips_through_pending_list() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Round", "round@vault.test").await;

    let sub = h
        .vault
        .payments()
        .submit(&user, &naira("ROUND"))
        .await
        .unwrap();
    let pending = h.vault.payments().list_pending(&h.admin).await.unwrap();
    assert!(pending.iter().any(|p| p.id == sub.id));

    let terms = ApprovalTerms::confirming(&sub, date("2025-03-01"), date("2026-03-01"));
    h.vault
        .payments()
        .approve(&h.admin, &sub.id, &terms)
        .await
        .unwrap();
    let pending = h.vault.payments().list_pending(&h.admin).await.unwrap();
    assert!(pending.iter().all(|p| p.id != sub.id));
}

#[tokio::test]
async fn approvals_for_different_users_proceed_independently() {
    let h = harness("2025-03-01").await;
    let a = register(&h.vault, "A", "a@vault.test").await;
    let b = register(&h.vault, "B", "b@vault.test").await;
    let sa = h.vault.payments().submit(&a, &naira("A")).await.unwrap();
    let sb = h.vault.payments().submit(&b, &naira("B")).await.unwrap();

    let ta = ApprovalTerms::confirming(&sa, date("2025-03-01"), date("2026-03-01"));
    let tb = ApprovalTerms::confirming(&sb, date("2025-03-01"), date("2026-03-01"));
    let payments = h.vault.payments();
    let (ra, rb) = tokio::join!(
        payments.approve(&h.admin, &sa.id, &ta),
        payments.approve(&h.admin, &sb.id, &tb)
    );
    assert_eq!(ra.unwrap(), ApprovalOutcome::Activated);
    assert_eq!(rb.unwrap(), ApprovalOutcome::Activated);

    for user in [&a, &b] {
        assert_eq!(h.vault.profile(user).await.unwrap().plan(), Plan::Annual);
    }
}

#[tokio::test]
async fn admin_user_listing_reports_usage() {
    let h = harness("2025-03-01").await;
    let user = register(&h.vault, "Counted", "counted@vault.test").await;
    h.vault
        .catalog()
        .upload(&user, upload("one.pdf"))
        .await
        .unwrap();

    let users = h.vault.list_users(&h.admin, Some("counted")).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].documents, 1);
    assert!(!users[0].is_admin);

    let admins = h.vault.list_users(&h.admin, Some("admin@")).await.unwrap();
    assert!(admins[0].is_admin);
}
