//! Data models for vault storage.

use docvault_core::policy::SubscriptionSnapshot;
use docvault_core::subscription::{PaymentStatus, Plan, SubmissionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub plan: String,
    pub subscription_start: Option<String>,
    pub subscription_end: Option<String>,
    pub payment_status: Option<String>,
    pub last_payment_amount: Option<f64>,
    pub last_payment_currency: Option<String>,
    pub last_payment_provider: Option<String>,
    pub emergency_name: Option<String>,
    pub emergency_email: Option<String>,
    pub emergency_relation: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn plan(&self) -> Plan {
        Plan::from_stored(Some(&self.plan))
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_stored(self.payment_status.as_deref())
    }

    /// The fields the access policy reads.
    pub fn subscription(&self) -> SubscriptionSnapshot<'_> {
        SubscriptionSnapshot {
            plan: self.plan(),
            subscription_end: self.subscription_end.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub display_name: String,
    pub storage_handle: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub category: String,
    pub notes: Option<String>,
    pub expiry_date: Option<String>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// A user-reported payment. Immutable apart from its review fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentSubmission {
    pub id: String,
    pub user_id: Option<String>,
    pub provider: String,
    pub currency: String,
    pub amount: f64,
    pub reference: String,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<i64>,
    pub created_at: i64,
}

impl PaymentSubmission {
    pub fn status(&self) -> Option<SubmissionStatus> {
        SubmissionStatus::parse(&self.status)
    }
}

/// Actionable submission joined with its owner, as shown to admins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PendingSubmission {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub plan: String,
    pub subscription_end: Option<String>,
    pub provider: String,
    pub currency: String,
    pub amount: f64,
    pub reference: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: String,
    pub action: String,
    pub doc_id: Option<String>,
    pub details: Option<String>,
    pub created_at: i64,
}
