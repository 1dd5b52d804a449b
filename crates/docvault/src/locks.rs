//! Per-user mutation locks.
//!
//! Ledger and catalog mutations for one user run one at a time; different
//! users proceed in parallel. There is no global lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of async mutexes keyed by user ID.
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s records.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.inner.lock().await;
            // Drop entries nobody holds or waits on.
            table.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(
                table
                    .entry(user_id.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
