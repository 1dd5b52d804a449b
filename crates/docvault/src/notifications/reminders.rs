use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;
use docvault_core::subscription::format_date;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::VaultError;
use crate::storage::VaultDatabase;

use super::{Reminder, ReminderSink};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends a reminder to every paid user whose subscription ends exactly
/// `offset` days from today, for each configured offset.
#[derive(Clone)]
pub struct RenewalReminderJob {
    db: VaultDatabase,
    sink: Arc<dyn ReminderSink>,
    clock: Clock,
    offsets: Vec<i64>,
}

impl RenewalReminderJob {
    pub fn new(
        db: VaultDatabase,
        sink: Arc<dyn ReminderSink>,
        clock: Clock,
        offsets: &[i64],
    ) -> Self {
        // Descending: soonest-ending reminders first, then the grace period.
        let offsets: BTreeSet<i64> = offsets.iter().copied().collect();
        Self {
            db,
            sink,
            clock,
            offsets: offsets.into_iter().rev().collect(),
        }
    }

    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ReminderReport, VaultError> {
        let today = self.clock.today();
        let mut report = ReminderReport::default();

        for &offset in &self.offsets {
            let Some(target) = today.checked_add_signed(Duration::days(offset)) else {
                continue;
            };
            let end = format_date(target);

            for user in self.db.users_with_subscription_end(&end).await? {
                let reminder = Reminder {
                    user_id: user.id,
                    email: user.email,
                    full_name: user.full_name,
                    subscription_end: end.clone(),
                    days_left: offset,
                };
                match self.sink.send(&reminder).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        warn!(user_id = %reminder.user_id, offset, error = %e, "Reminder not delivered");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "Reminder run complete");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tokio::sync::Mutex;

    use super::*;
    use crate::notifications::NotificationError;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Reminder>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl ReminderSink for RecordingSink {
        async fn send(&self, reminder: &Reminder) -> Result<(), NotificationError> {
            if self.fail_for.as_deref() == Some(reminder.email.as_str()) {
                return Err(NotificationError::Delivery {
                    recipient: reminder.email.clone(),
                    reason: "mailbox full".into(),
                });
            }
            self.sent.lock().await.push(reminder.clone());
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    async fn paid_user(db: &VaultDatabase, id: &str, end: &str) {
        db.create_user(id, id, &format!("{id}@vault.test"), "x")
            .await
            .unwrap();
        sqlx::query("UPDATE users SET plan = 'ANNUAL', subscription_start = '2024-06-01', subscription_end = ? WHERE id = ?")
            .bind(end)
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn sends_for_matching_offsets_only() {
        let db = VaultDatabase::open_in_memory().await.unwrap();
        paid_user(&db, "week", "2025-06-08").await;
        paid_user(&db, "today", "2025-06-01").await;
        paid_user(&db, "lapsed", "2025-05-29").await;
        paid_user(&db, "later", "2025-07-01").await;
        db.create_user("free", "free", "free@vault.test", "x")
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::default());
        let job = RenewalReminderJob::new(
            db,
            sink.clone(),
            Clock::fixed(today()),
            &[7, 3, 1, 0, -3, -7],
        );

        let report = job.run().await.unwrap();
        assert_eq!(report, ReminderReport { sent: 3, failed: 0 });

        let sent = sink.sent.lock().await;
        let days: Vec<(String, i64)> = sent
            .iter()
            .map(|r| (r.user_id.clone(), r.days_left))
            .collect();
        assert_eq!(
            days,
            vec![
                ("week".to_string(), 7),
                ("today".to_string(), 0),
                ("lapsed".to_string(), -3)
            ]
        );
    }

    #[tokio::test]
    async fn failed_delivery_is_counted_and_skipped() {
        let db = VaultDatabase::open_in_memory().await.unwrap();
        paid_user(&db, "a", "2025-06-04").await;
        paid_user(&db, "b", "2025-06-04").await;

        let sink = Arc::new(RecordingSink {
            fail_for: Some("a@vault.test".into()),
            ..RecordingSink::default()
        });
        let job = RenewalReminderJob::new(db.clone(), sink.clone(), Clock::fixed(today()), &[3]);

        let report = job.run().await.unwrap();
        assert_eq!(report, ReminderReport { sent: 1, failed: 1 });
        assert_eq!(sink.sent.lock().await[0].user_id, "b");

        // The ledger is untouched by a failed send.
        let a = db.get_user("a").await.unwrap();
        assert_eq!(a.subscription_end.as_deref(), Some("2025-06-04"));
        assert_eq!(a.plan, "ANNUAL");
    }

    #[tokio::test]
    async fn offsets_are_deduplicated_and_descending() {
        let db = VaultDatabase::open_in_memory().await.unwrap();
        let job = RenewalReminderJob::new(
            db,
            Arc::new(crate::notifications::LogReminderSink),
            Clock::fixed(today()),
            &[0, 7, -3, 7],
        );
        assert_eq!(job.offsets(), &[7, 0, -3]);
    }
}
