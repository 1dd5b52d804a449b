//! Source of "today" for subscription decisions.

use std::sync::Arc;

use chrono::NaiveDate;

/// Calendar clock. Production uses the local date; tests pin a fixed one.
#[derive(Clone)]
pub struct Clock {
    today: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl Clock {
    pub fn system() -> Self {
        Self {
            today: Arc::new(|| chrono::Local::now().date_naive()),
        }
    }

    pub fn fixed(date: NaiveDate) -> Self {
        Self {
            today: Arc::new(move || date),
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock").field("today", &self.today()).finish()
    }
}
