//! Command-line subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

pub mod account_cmd;
pub mod admin_cmd;
pub mod document_cmd;
pub mod pay_cmd;

use docvault_core::policy::Decision;

use crate::Vault;
use crate::auth::Identity;

/// Caller credentials, checked against the credential store on every run.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Login {
    /// Account email.
    #[arg(long, global = true, env = "VAULT_EMAIL")]
    pub email: Option<String>,

    /// Account password.
    #[arg(long, global = true, env = "VAULT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl Login {
    /// Email and password, or an error naming what is missing.
    pub fn pair(&self) -> anyhow::Result<(&str, &str)> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--email (or VAULT_EMAIL) is required"))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--password (or VAULT_PASSWORD) is required"))?;
        Ok((email, password))
    }

    pub async fn authenticate(&self, vault: &Vault) -> anyhow::Result<Identity> {
        let (email, password) = self.pair()?;
        Ok(vault.credentials().verify(email, password).await?)
    }
}

/// One-line rendering of a policy decision.
pub fn describe(decision: Decision) -> String {
    match decision {
        Decision::Allow => "allowed".to_string(),
        Decision::AllowWithWarning(w) => format!("allowed ({w})"),
        Decision::Deny(reason) => format!("denied: {reason}"),
    }
}

/// Human-readable byte count.
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes.max(0) as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}
