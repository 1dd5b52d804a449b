//! Access policy engine.
//!
//! Decides, per request, whether a user may upload or view documents given a
//! fresh snapshot of their subscription fields and document count. Rules are
//! evaluated in order and the first match wins:
//!
//! 1. Free plan: viewing is always allowed, uploading is capped at the free limit.
//! 2. Paid plan: active window allows (with a renewal warning near the end),
//!    grace allows with a warning, expired locks both actions.
//!
//! Denial is a normal return value, never an error.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BillingConfig;
use crate::subscription::{self, Plan, SubscriptionStatus};

/// A protected action the caller wants to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Store a new document.
    Upload,
    /// Open the dashboard, list or download existing documents.
    View,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upload => "upload",
            Self::View => "view",
        })
    }
}

/// Non-blocking notice attached to an allowed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// Subscription is active but ends soon.
    RenewalDue { days_left: i64 },
    /// Subscription ended; access continues until the grace period runs out.
    GracePeriod { days_remaining: i64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenewalDue { days_left } => write!(
                f,
                "subscription expires in {days_left} day(s), renew to avoid lockout"
            ),
            Self::GracePeriod { days_remaining } => write!(
                f,
                "subscription is in its grace period ({days_remaining} day(s) left), renew soon"
            ),
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Free plan user already stores `limit` documents.
    FreeLimitReached { limit: u64 },
    /// Paid subscription lapsed past grace; locked until an admin reactivates it.
    SubscriptionExpired,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FreeLimitReached { limit } => write!(
                f,
                "free limit reached ({limit} documents), upgrade to continue uploading"
            ),
            Self::SubscriptionExpired => {
                f.write_str("subscription expired, locked until admin reactivation")
            }
        }
    }
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    AllowWithWarning(Warning),
    Deny(DenyReason),
}

impl Decision {
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Deny(_))
    }

    pub const fn warning(&self) -> Option<Warning> {
        match self {
            Self::AllowWithWarning(w) => Some(*w),
            _ => None,
        }
    }

    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Deny(r) => Some(*r),
            _ => None,
        }
    }
}

/// The subscription fields the engine reads from a user record.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionSnapshot<'a> {
    pub plan: Plan,
    pub subscription_end: Option<&'a str>,
}

/// Pure access policy over subscription snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    free_limit: u64,
    grace_days: u32,
    renewal_warning_days: i64,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&BillingConfig::default())
    }
}

impl AccessPolicy {
    pub const fn new(free_limit: u64, grace_days: u32, renewal_warning_days: i64) -> Self {
        Self {
            free_limit,
            grace_days,
            renewal_warning_days,
        }
    }

    pub fn from_config(config: &BillingConfig) -> Self {
        Self::new(
            config.free_limit,
            config.grace_days,
            i64::from(config.renewal_warning_days),
        )
    }

    pub const fn free_limit(&self) -> u64 {
        self.free_limit
    }

    pub const fn grace_days(&self) -> u32 {
        self.grace_days
    }

    /// Window status for a paid account, `None` for free accounts.
    pub fn status(
        &self,
        account: &SubscriptionSnapshot<'_>,
        today: NaiveDate,
    ) -> Option<SubscriptionStatus> {
        if account.plan.is_free() {
            return None;
        }
        Some(subscription::subscription_status(
            account.subscription_end,
            today,
            self.grace_days,
        ))
    }

    /// Decide whether `action` is allowed right now.
    pub fn decide(
        &self,
        account: &SubscriptionSnapshot<'_>,
        used_documents: u64,
        action: Action,
        today: NaiveDate,
    ) -> Decision {
        let Some(status) = self.status(account, today) else {
            return self.decide_free(used_documents, action);
        };

        match status {
            SubscriptionStatus::Active => {
                match subscription::days_left(account.subscription_end, today) {
                    Some(days_left) if days_left <= self.renewal_warning_days => {
                        Decision::AllowWithWarning(Warning::RenewalDue { days_left })
                    }
                    _ => Decision::Allow,
                }
            }
            SubscriptionStatus::Grace => {
                let past_end = subscription::days_left(account.subscription_end, today)
                    .map_or(0, |d| -d);
                Decision::AllowWithWarning(Warning::GracePeriod {
                    days_remaining: i64::from(self.grace_days) - past_end,
                })
            }
            SubscriptionStatus::Expired => Decision::Deny(DenyReason::SubscriptionExpired),
        }
    }

    const fn decide_free(&self, used_documents: u64, action: Action) -> Decision {
        match action {
            Action::View => Decision::Allow,
            Action::Upload if used_documents < self.free_limit => Decision::Allow,
            Action::Upload => Decision::Deny(DenyReason::FreeLimitReached {
                limit: self.free_limit,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        subscription::parse_date("2025-06-15").unwrap()
    }

    fn free() -> SubscriptionSnapshot<'static> {
        SubscriptionSnapshot {
            plan: Plan::Free,
            subscription_end: None,
        }
    }

    fn annual(end: &str) -> SubscriptionSnapshot<'_> {
        SubscriptionSnapshot {
            plan: Plan::Annual,
            subscription_end: Some(end),
        }
    }

    #[test]
    fn free_upload_under_limit_allowed() {
        let policy = AccessPolicy::default();
        for used in 0..5 {
            assert_eq!(
                policy.decide(&free(), used, Action::Upload, today()),
                Decision::Allow
            );
        }
    }

    #[test]
    fn free_upload_at_limit_denied() {
        let policy = AccessPolicy::default();
        for used in [5, 6, 100] {
            assert_eq!(
                policy.decide(&free(), used, Action::Upload, today()),
                Decision::Deny(DenyReason::FreeLimitReached { limit: 5 })
            );
        }
    }

    #[test]
    fn free_view_always_allowed() {
        let policy = AccessPolicy::default();
        for used in [0, 5, 500] {
            assert_eq!(
                policy.decide(&free(), used, Action::View, today()),
                Decision::Allow
            );
        }
    }

    #[test]
    fn free_ignores_stale_subscription_fields() {
        let policy = AccessPolicy::default();
        let account = SubscriptionSnapshot {
            plan: Plan::Free,
            subscription_end: Some("2001-01-01"),
        };
        assert_eq!(
            policy.decide(&account, 0, Action::View, today()),
            Decision::Allow
        );
    }

    #[test]
    fn annual_active_ignores_document_count() {
        let policy = AccessPolicy::default();
        assert_eq!(
            policy.decide(&annual("2026-01-01"), 10_000, Action::Upload, today()),
            Decision::Allow
        );
    }

    #[test]
    fn annual_near_end_warns() {
        let policy = AccessPolicy::default();
        assert_eq!(
            policy.decide(&annual("2025-06-20"), 0, Action::View, today()),
            Decision::AllowWithWarning(Warning::RenewalDue { days_left: 5 })
        );
        assert_eq!(
            policy.decide(&annual("2025-06-15"), 0, Action::Upload, today()),
            Decision::AllowWithWarning(Warning::RenewalDue { days_left: 0 })
        );
    }

    #[test]
    fn annual_in_grace_warns_for_both_actions() {
        let policy = AccessPolicy::default();
        for action in [Action::View, Action::Upload] {
            let decision = policy.decide(&annual("2025-06-14"), 0, action, today());
            assert_eq!(
                decision,
                Decision::AllowWithWarning(Warning::GracePeriod { days_remaining: 6 })
            );
        }
    }

    #[test]
    fn annual_past_grace_locks_both_actions() {
        let policy = AccessPolicy::default();
        for action in [Action::View, Action::Upload] {
            assert_eq!(
                policy.decide(&annual("2025-06-05"), 0, action, today()),
                Decision::Deny(DenyReason::SubscriptionExpired)
            );
        }
    }

    #[test]
    fn annual_without_parseable_end_fails_closed() {
        let policy = AccessPolicy::default();
        let account = SubscriptionSnapshot {
            plan: Plan::Annual,
            subscription_end: Some("31/12/2025"),
        };
        assert_eq!(
            policy.decide(&account, 0, Action::View, today()),
            Decision::Deny(DenyReason::SubscriptionExpired)
        );
    }

    #[test]
    fn custom_limit_is_respected() {
        let policy = AccessPolicy::new(2, 0, 7);
        assert!(policy.decide(&free(), 1, Action::Upload, today()).is_allowed());
        assert!(!policy.decide(&free(), 2, Action::Upload, today()).is_allowed());
    }
}
