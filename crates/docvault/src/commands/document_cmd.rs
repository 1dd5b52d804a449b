//! Document subcommands: upload, list, download, delete, export.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;

use crate::Vault;
use crate::catalog::UploadRequest;
use crate::storage::DocumentFilter;

use super::{Login, human_size};

/// Options for `docvault upload`.
#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// File to store.
    pub file: PathBuf,

    /// Category to file the document under.
    #[arg(long, default_value = "Other")]
    pub category: String,

    /// Free-form notes.
    #[arg(long)]
    pub notes: Option<String>,

    /// Date the document itself expires (YYYY-MM-DD).
    #[arg(long)]
    pub expiry: Option<NaiveDate>,
}

pub async fn upload(vault: &Vault, login: &Login, args: UploadArgs) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("{} is not a file", args.file.display()))?;
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let outcome = vault
        .catalog()
        .upload(
            &identity,
            UploadRequest {
                file_name,
                bytes,
                category: args.category,
                notes: args.notes,
                expiry_date: args.expiry,
            },
        )
        .await?;

    let mut out = io::stdout();
    writeln!(
        out,
        "Uploaded {} ({}) as {}",
        outcome.document.display_name,
        human_size(outcome.document.size_bytes),
        outcome.document.id
    )?;
    if let Some(warning) = outcome.warning {
        writeln!(out, "Note: {warning}")?;
    }
    Ok(())
}

pub async fn list(vault: &Vault, login: &Login, filter: &DocumentFilter) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let (docs, warning) = vault.catalog().browse(&identity, filter).await?;
    let mut out = io::stdout();
    if let Some(warning) = warning {
        writeln!(out, "Note: {warning}")?;
    }
    if docs.is_empty() {
        writeln!(out, "No documents")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<36} {:<24} {:<22} {:>9} EXPIRES",
        "ID", "NAME", "CATEGORY", "SIZE"
    )?;
    for d in &docs {
        writeln!(
            out,
            "{:<36} {:<24} {:<22} {:>9} {}",
            d.id,
            d.display_name,
            d.category,
            human_size(d.size_bytes),
            d.expiry_date.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

pub async fn download(
    vault: &Vault,
    login: &Login,
    id: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let (doc, bytes) = vault.catalog().download(&identity, id).await?;
    let target = output.map_or_else(|| PathBuf::from(&doc.display_name), Path::to_path_buf);
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    writeln!(
        io::stdout(),
        "Saved {} to {}",
        doc.display_name,
        target.display()
    )?;
    Ok(())
}

pub async fn delete(vault: &Vault, login: &Login, id: &str) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    if vault.catalog().delete(&identity, id).await? {
        writeln!(io::stdout(), "Deleted {id}")?;
    } else {
        anyhow::bail!("No document {id}");
    }
    Ok(())
}

/// Default file name for a full export.
pub const EXPORT_FILE_NAME: &str = "docvault_backup.zip";

pub async fn export(vault: &Vault, login: &Login, output: Option<&Path>) -> anyhow::Result<()> {
    let identity = login.authenticate(vault).await?;
    let archive = vault.catalog().export(&identity).await?;
    let target = output.map_or_else(|| PathBuf::from(EXPORT_FILE_NAME), Path::to_path_buf);
    tokio::fs::write(&target, &archive)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    writeln!(
        io::stdout(),
        "Saved backup ({}) to {}; keep it somewhere safe",
        human_size(i64::try_from(archive.len()).unwrap_or(i64::MAX)),
        target.display()
    )?;
    Ok(())
}
