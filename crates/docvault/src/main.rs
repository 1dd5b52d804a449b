//! `DocVault` CLI
//!
//! Personal document vault: a capped free tier, an annual plan activated by
//! admin-approved payments, and the maintenance jobs that go with them.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use docvault::Vault;
use docvault::app::EmergencyContact;
use docvault::commands::document_cmd::UploadArgs;
use docvault::commands::pay_cmd::PayAction;
use docvault::commands::{Login, account_cmd, admin_cmd, document_cmd, pay_cmd};
use docvault::storage::DocumentFilter;

#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(version, about = "Document vault with subscription gating", long_about = None)]
struct Cli {
    /// Settings file layered over the global one.
    #[arg(long, global = true, env = "VAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Database file path.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory for uploaded document bytes.
    #[arg(long, global = true)]
    upload_root: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true, env = "VAULT_LOG_JSON")]
    log_json: bool,

    #[command(flatten)]
    login: Login,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account on the free plan.
    Register {
        /// Full name.
        #[arg(long)]
        name: String,
    },
    /// Change your password.
    Password {
        /// New password (at least 8 characters).
        #[arg(long, env = "VAULT_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// Set your emergency contact.
    Emergency {
        /// Contact's name.
        #[arg(long)]
        name: String,
        /// Contact's email.
        #[arg(long)]
        contact_email: String,
        /// Relationship to you.
        #[arg(long, default_value = "")]
        relation: String,
    },
    /// Show plan, subscription window, usage and access.
    Status {
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Store a document.
    Upload(UploadArgs),
    /// List your documents.
    Documents {
        /// Substring of the name or notes.
        #[arg(long)]
        search: Option<String>,
        /// Only this category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Save a document to disk.
    Download {
        /// Document ID.
        id: String,
        /// Output path; defaults to the document's name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a document.
    Delete {
        /// Document ID.
        id: String,
    },
    /// Save every document you have stored into one zip archive.
    Export {
        /// Archive path; defaults to docvault_backup.zip.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show your recent activity.
    Activity {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Submit and review payments.
    Pay {
        #[command(subcommand)]
        action: PayAction,
    },
    /// List users (admin).
    Users {
        /// Substring of the name or email.
        #[arg(long)]
        search: Option<String>,
    },
    /// Send today's renewal reminders (admin).
    Reminders,
    /// Finish interrupted document deletions (admin).
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    docvault_core::tracing_init::init_tracing("docvault=info", cli.log_json);

    let mut config = docvault_core::config::load_config(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        config.storage.database_path = Some(path);
    }
    if let Some(root) = cli.upload_root {
        config.storage.upload_root = Some(root);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting docvault");
    let vault = Vault::open(&config).await?;
    let login = &cli.login;

    match cli.command {
        Command::Register { name } => account_cmd::register(&vault, login, &name).await,
        Command::Password { new_password } => {
            account_cmd::change_password(&vault, login, &new_password).await
        }
        Command::Emergency {
            name,
            contact_email,
            relation,
        } => {
            let contact = EmergencyContact {
                name,
                email: contact_email,
                relation,
            };
            account_cmd::emergency(&vault, login, &contact).await
        }
        Command::Status { json } => account_cmd::status(&vault, login, json).await,
        Command::Upload(args) => document_cmd::upload(&vault, login, args).await,
        Command::Documents { search, category } => {
            let filter = DocumentFilter { search, category };
            document_cmd::list(&vault, login, &filter).await
        }
        Command::Download { id, output } => {
            document_cmd::download(&vault, login, &id, output.as_deref()).await
        }
        Command::Delete { id } => document_cmd::delete(&vault, login, &id).await,
        Command::Export { output } => document_cmd::export(&vault, login, output.as_deref()).await,
        Command::Activity { limit } => account_cmd::activity(&vault, login, limit).await,
        Command::Pay { action } => pay_cmd::run(action, &vault, login).await,
        Command::Users { search } => admin_cmd::users(&vault, login, search.as_deref()).await,
        Command::Reminders => admin_cmd::reminders(&vault, login).await,
        Command::Purge => admin_cmd::purge(&vault, login).await,
    }
}
