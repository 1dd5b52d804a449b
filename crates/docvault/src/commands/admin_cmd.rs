//! Admin and maintenance subcommands: users, reminders, purge.

use std::io::{self, Write};

use crate::Vault;

use super::Login;

pub async fn users(vault: &Vault, login: &Login, search: Option<&str>) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let users = vault.list_users(&identity, search).await?;
    let mut out = io::stdout();
    if users.is_empty() {
        writeln!(out, "No users")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<28} {:<24} {:<7} {:<12} {:<9} {:>4}",
        "EMAIL", "NAME", "PLAN", "ENDS", "PAYMENT", "DOCS"
    )?;
    for u in &users {
        let marker = if u.is_admin { " (admin)" } else { "" };
        writeln!(
            out,
            "{:<28} {:<24} {:<7} {:<12} {:<9} {:>4}{marker}",
            u.user.email,
            u.user.full_name,
            u.user.plan,
            u.user.subscription_end.as_deref().unwrap_or("-"),
            u.user.payment_status.as_deref().unwrap_or("-"),
            u.documents
        )?;
    }
    Ok(())
}

/// Send today's renewal reminders. Meant for a daily scheduler running with
/// admin credentials.
pub async fn reminders(vault: &Vault, login: &Login) -> anyhow::Result<()> {
    require_admin(vault, login).await?;
    let report = vault.reminders().run().await?;
    writeln!(
        io::stdout(),
        "Reminders sent: {}, failed: {}",
        report.sent,
        report.failed
    )?;
    Ok(())
}

/// Finish interrupted document deletions.
pub async fn purge(vault: &Vault, login: &Login) -> anyhow::Result<()> {
    require_admin(vault, login).await?;
    let purged = vault.catalog().purge_tombstones().await?;
    writeln!(io::stdout(), "Purged {purged} interrupted deletion(s)")?;
    Ok(())
}

async fn require_admin(vault: &Vault, login: &Login) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    vault.payments().admins().require_admin(&identity)?;
    Ok(())
}
