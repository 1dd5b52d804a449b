//! Account subcommands: register, password, emergency contact, status, activity.

use std::io::{self, Write};

use crate::Vault;
use crate::app::EmergencyContact;

use super::{Login, describe};

/// Register a new free-plan account with the global --email/--password.
pub async fn register(vault: &Vault, login: &Login, name: &str) -> anyhow::Result<()> {
    let (email, password) = login.pair()?;
    let user = vault.credentials().register(name, email, password).await?;
    writeln!(
        io::stdout(),
        "Registered {} <{}> on the {} plan",
        user.full_name,
        user.email,
        user.plan()
    )?;
    Ok(())
}

pub async fn change_password(vault: &Vault, login: &Login, new_password: &str) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let (_, current) = login.pair()?;
    vault
        .credentials()
        .change_password(&identity, current, new_password)
        .await?;
    writeln!(io::stdout(), "Password updated")?;
    Ok(())
}

pub async fn emergency(
    vault: &Vault,
    login: &Login,
    contact: &EmergencyContact,
) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let user = vault.set_emergency_contact(&identity, contact).await?;
    writeln!(
        io::stdout(),
        "Emergency contact: {} <{}> ({})",
        user.emergency_name.unwrap_or_default(),
        user.emergency_email.unwrap_or_default(),
        user.emergency_relation.unwrap_or_default()
    )?;
    Ok(())
}

/// Dashboard banner: plan, window, usage and what the caller may do now.
pub async fn status(vault: &Vault, login: &Login, json: bool) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let summary = vault.access().summary(&identity).await?;
    let mut out = io::stdout();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    match summary.subscription_status {
        Some(status) => writeln!(out, "Plan:         {} ({status})", summary.plan)?,
        None => writeln!(out, "Plan:         {}", summary.plan)?,
    }
    if let (Some(start), Some(end)) = (&summary.subscription_start, &summary.subscription_end) {
        let left = summary
            .days_left
            .map(|d| format!(", {d} day(s) left"))
            .unwrap_or_default();
        writeln!(out, "Subscription: {start} to {end}{left}")?;
    }
    if let Some(payment) = summary.payment_status {
        writeln!(out, "Payment:      {payment}")?;
    }
    match summary.document_limit {
        Some(limit) => writeln!(out, "Documents:    {} / {limit}", summary.documents_used)?,
        None => writeln!(out, "Documents:    {}", summary.documents_used)?,
    }
    writeln!(out, "View:         {}", describe(summary.view))?;
    writeln!(out, "Upload:       {}", describe(summary.upload))?;
    if vault.is_admin(&identity) {
        writeln!(out, "Role:         admin")?;
    }
    Ok(())
}

pub async fn activity(vault: &Vault, login: &Login, limit: u32) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let entries = vault.activity(&identity, limit).await?;
    let mut out = io::stdout();
    if entries.is_empty() {
        writeln!(out, "No activity yet")?;
        return Ok(());
    }
    writeln!(out, "{:<12} {:<18} DETAILS", "WHEN", "ACTION")?;
    for e in &entries {
        writeln!(
            out,
            "{:<12} {:<18} {}",
            e.created_at,
            e.action,
            e.details.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}
