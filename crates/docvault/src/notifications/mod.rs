//! Outbound renewal reminders.
//!
//! Delivery is best-effort: a failed send is logged and skipped, and never
//! touches the subscription ledger.

mod reminders;

pub use reminders::{ReminderReport, RenewalReminderJob};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// One reminder for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub subscription_end: String,
    /// Days until the subscription ends; negative once it has ended.
    pub days_left: i64,
}

impl Reminder {
    pub fn subject(&self) -> String {
        match self.days_left {
            d if d > 0 => format!("Your vault subscription ends in {d} day(s)"),
            0 => "Your vault subscription ends today".to_string(),
            d => format!("Your vault subscription ended {} day(s) ago", -d),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Delivery to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

/// Where reminders go.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn send(&self, reminder: &Reminder) -> Result<(), NotificationError>;
}

/// Writes reminders to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReminderSink;

#[async_trait]
impl ReminderSink for LogReminderSink {
    async fn send(&self, reminder: &Reminder) -> Result<(), NotificationError> {
        info!(
            user_id = %reminder.user_id,
            email = %reminder.email,
            subscription_end = %reminder.subscription_end,
            days_left = reminder.days_left,
            subject = %reminder.subject(),
            "Renewal reminder"
        );
        Ok(())
    }
}
