//! Subscription plans, payment states and window arithmetic.
//!
//! The subscription window is never stored as a state. It is derived from
//! `subscription_end` and the configured grace period each time it is needed:
//!
//! - `Active`  : `today <= end`
//! - `Grace`   : `end < today <= end + grace_days`
//! - `Expired` : anything later, or a missing/unparseable end date

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used for persisted subscription dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Billing tier assigned to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Unpaid tier, capped by the free document limit.
    #[default]
    Free,
    /// Paid annual tier, gated by the subscription window.
    Annual,
}

impl Plan {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Annual => "ANNUAL",
        }
    }

    /// Interpret a stored plan column.
    ///
    /// Missing or `FREE` (any case) is the free tier. Every other value is a
    /// paid plan and goes through the subscription window checks.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Free,
            Some(v) if v.eq_ignore_ascii_case("FREE") => Self::Free,
            Some(_) => Self::Annual,
        }
    }

    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user's current payment status, mirrored from the latest resolved
/// submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Active,
    Rejected,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored status column. Unknown values read as no status.
    pub fn from_stored(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("pending") => Some(Self::Pending),
            Some("active") => Some(Self::Active),
            Some("rejected") => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a single payment submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Awaiting admin review.
    Pending,
    /// Approved; the owner's subscription window was written.
    Approved,
    /// Rejected by an admin.
    Rejected,
    /// An older pending submission resolved together with a newer one.
    Superseded,
}

impl SubmissionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Superseded => "superseded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "superseded" => Some(Self::Superseded),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived position of `today` relative to the subscription window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Grace,
    Expired,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Grace => "grace",
            Self::Expired => "expired",
        })
    }
}

/// Parse a persisted `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Format a date the way the ledger stores it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Compute the subscription status for `today`.
///
/// Fails closed: a missing or unparseable end date is `Expired`.
pub fn subscription_status(
    subscription_end: Option<&str>,
    today: NaiveDate,
    grace_days: u32,
) -> SubscriptionStatus {
    let Some(end) = subscription_end.and_then(parse_date) else {
        return SubscriptionStatus::Expired;
    };
    if today <= end {
        return SubscriptionStatus::Active;
    }
    let grace_end = end
        .checked_add_days(Days::new(u64::from(grace_days)))
        .unwrap_or(NaiveDate::MAX);
    if today <= grace_end {
        SubscriptionStatus::Grace
    } else {
        SubscriptionStatus::Expired
    }
}

/// Whole days from `today` until the subscription end (negative once past).
pub fn days_left(subscription_end: Option<&str>, today: NaiveDate) -> Option<i64> {
    subscription_end
        .and_then(parse_date)
        .map(|end| (end - today).num_days())
}
