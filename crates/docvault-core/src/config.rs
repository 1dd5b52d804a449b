//! Configuration resolution for `DocVault`.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/docvault/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete `DocVault` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// Plan limits and subscription window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Documents a free-plan user may store.
    pub free_limit: u64,
    /// Days after `subscription_end` during which access continues with a warning.
    pub grace_days: u32,
    /// Active subscriptions ending within this many days get a renewal warning.
    pub renewal_warning_days: u32,
    /// Annual price in NGN. Display only.
    pub annual_price_ngn: u64,
    /// Annual price in USD. Display only.
    pub annual_price_usd: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            free_limit: 5,
            grace_days: 7,
            renewal_warning_days: 7,
            annual_price_ngn: 35_000,
            annual_price_usd: 20.0,
        }
    }
}

/// Admin allow-list. Membership is the only way to hold the admin role.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    pub emails: Vec<String>,
}

/// Where the ledger database and uploaded blobs live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub upload_root: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured database path, falling back to the platform data directory.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| data_dir().map(|d| d.join("vault.db")))
    }

    /// Configured upload root, falling back to the platform data directory.
    pub fn upload_root(&self) -> Option<PathBuf> {
        self.upload_root
            .clone()
            .or_else(|| data_dir().map(|d| d.join("uploads")))
    }
}

/// Renewal reminder schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Offsets in days from today; a user whose subscription ends on
    /// `today + offset` gets a reminder. Negative offsets cover the grace period.
    pub offsets_days: Vec<i64>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            offsets_days: vec![7, 3, 1, 0, -3, -7],
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        merge_config(&mut config, load_config_file(path)?);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    normalize_admin_emails(&mut config.admin);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("docvault").join("settings.json"))
}

/// Platform data directory for the database and uploads.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("docvault"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    base.billing = overlay.billing;
    base.reminders = overlay.reminders;

    if !overlay.admin.emails.is_empty() {
        base.admin.emails = overlay.admin.emails;
    }
    if overlay.storage.database_path.is_some() {
        base.storage.database_path = overlay.storage.database_path;
    }
    if overlay.storage.upload_root.is_some() {
        base.storage.upload_root = overlay.storage.upload_root;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(n) = var("VAULT_FREE_LIMIT").and_then(|v| v.parse().ok()) {
        config.billing.free_limit = n;
    }
    if let Some(n) = var("VAULT_GRACE_DAYS").and_then(|v| v.parse().ok()) {
        config.billing.grace_days = n;
    }
    if let Some(n) = var("VAULT_RENEWAL_WARNING_DAYS").and_then(|v| v.parse().ok()) {
        config.billing.renewal_warning_days = n;
    }
    if let Some(n) = var("VAULT_ANNUAL_PRICE_NGN").and_then(|v| v.parse().ok()) {
        config.billing.annual_price_ngn = n;
    }
    if let Some(n) = var("VAULT_ANNUAL_PRICE_USD").and_then(|v| v.parse().ok()) {
        config.billing.annual_price_usd = n;
    }
    if let Some(val) = var("VAULT_ADMIN_EMAILS") {
        config.admin.emails = val.split(',').map(str::to_string).collect();
    }
    if let Some(val) = var("VAULT_DB_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("VAULT_UPLOAD_ROOT") {
        config.storage.upload_root = Some(PathBuf::from(val));
    }
}

fn normalize_admin_emails(admin: &mut AdminConfig) {
    admin.emails = admin
        .emails
        .iter()
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    admin.emails.sort();
    admin.emails.dedup();
}
