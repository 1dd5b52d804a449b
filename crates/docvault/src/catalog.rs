//! Document catalog: metadata per owner plus the blob each row points at.
//!
//! The metadata row and its blob live in different stores, so both directions
//! are compensated:
//! - upload: blob first, then row; a failed row insert deletes the blob.
//! - delete: row becomes a tombstone, then the blob goes, then the row goes.
//!   A failed blob removal restores the row; a failed final purge leaves a
//!   tombstone that [`DocumentCatalog::purge_tombstones`] finishes later.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::NaiveDate;
use docvault_core::policy::{Action, Warning};
use docvault_core::subscription::format_date;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::access::AccessGate;
use crate::auth::Identity;
use crate::blob::{BlobHandle, BlobStore};
use crate::error::VaultError;
use crate::locks::UserLocks;
use crate::storage::{Document, DocumentFilter, NewDocument, VaultDatabase};

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "csv", "txt", "png", "jpg", "jpeg",
];

/// Categories a document can be filed under.
pub const CATEGORIES: &[&str] = &[
    "Identity",
    "Banking & Finance",
    "Property & Assets",
    "Medical / Health",
    "School / Certificates",
    "Legal",
    "Other",
];

/// A document to store.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub category: String,
    pub notes: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

/// Metadata for a blob that is already stored.
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub display_name: String,
    pub handle: BlobHandle,
    pub file_type: String,
    pub size_bytes: u64,
    pub category: String,
    pub notes: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub document: Document,
    pub warning: Option<Warning>,
}

/// Lower-cased extension of `file_name` if it is on the allow-list.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Canonical spelling of a known category (case-insensitive match).
pub fn canonical_category(category: &str) -> Option<&'static str> {
    let category = category.trim();
    CATEGORIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(category))
}

#[derive(Clone)]
pub struct DocumentCatalog {
    db: VaultDatabase,
    blobs: Arc<dyn BlobStore>,
    gate: AccessGate,
    locks: UserLocks,
}

impl DocumentCatalog {
    pub fn new(
        db: VaultDatabase,
        blobs: Arc<dyn BlobStore>,
        gate: AccessGate,
        locks: UserLocks,
    ) -> Self {
        Self {
            db,
            blobs,
            gate,
            locks,
        }
    }

    // =========================================================================
    // Catalog primitives (ownership-checked, not policy-gated)
    // =========================================================================

    /// Record metadata for an already-stored blob.
    pub async fn record(
        &self,
        owner: &Identity,
        meta: &DocumentMeta,
    ) -> Result<Document, VaultError> {
        let id = uuid::Uuid::new_v4().to_string();
        let expiry = meta.expiry_date.map(format_date);
        let doc = self
            .db
            .insert_document(&NewDocument {
                id: &id,
                owner_id: owner.user_id(),
                display_name: &meta.display_name,
                storage_handle: meta.handle.as_str(),
                file_type: &meta.file_type,
                size_bytes: i64::try_from(meta.size_bytes).unwrap_or(i64::MAX),
                category: &meta.category,
                notes: meta.notes.as_deref(),
                expiry_date: expiry.as_deref(),
            })
            .await?;
        Ok(doc)
    }

    pub async fn list(
        &self,
        owner: &Identity,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, VaultError> {
        Ok(self.db.list_documents(owner.user_id(), filter).await?)
    }

    /// Live document count; the input to the free-limit check.
    pub async fn count(&self, owner: &Identity) -> Result<u64, VaultError> {
        let n = self.db.count_documents(owner.user_id()).await?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    /// Delete one of the owner's documents, blob included.
    ///
    /// Returns `false` when the owner has no such document. Other users'
    /// documents are never touched.
    #[instrument(skip(self), fields(user_id = %owner.user_id()))]
    pub async fn remove(&self, owner: &Identity, id: &str) -> Result<bool, VaultError> {
        let _guard = self.locks.lock(owner.user_id()).await;

        let Some(doc) = self.db.mark_document_deleted(owner.user_id(), id).await? else {
            return Ok(false);
        };

        let handle = BlobHandle::new(doc.storage_handle.clone());
        if let Err(e) = self.blobs.delete(&handle).await {
            warn!(doc_id = %doc.id, error = %e, "Blob removal failed, restoring document");
            if let Err(restore) = self.db.restore_document(&doc.id).await {
                error!(
                    doc_id = %doc.id,
                    error = %restore,
                    "Could not restore document; tombstone left for purge"
                );
            }
            return Err(e.into());
        }

        if let Err(e) = self.db.purge_document(&doc.id).await {
            warn!(doc_id = %doc.id, error = %e, "Blob removed but row purge failed; tombstone left for purge");
        }

        self.log(owner.user_id(), "delete", Some(&doc.id), &format!("Deleted {}", doc.display_name))
            .await;
        info!(doc_id = %doc.id, "Document deleted");
        Ok(true)
    }

    // =========================================================================
    // Policy-gated operations
    // =========================================================================

    /// Store a new document if the access policy allows an upload right now.
    #[instrument(skip(self, request), fields(user_id = %owner.user_id(), file = %request.file_name))]
    pub async fn upload(
        &self,
        owner: &Identity,
        request: UploadRequest,
    ) -> Result<UploadOutcome, VaultError> {
        let file_type = allowed_extension(&request.file_name).ok_or_else(|| {
            VaultError::Validation(format!(
                "Unsupported file type for {}; allowed: {}",
                request.file_name,
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
        let category = canonical_category(&request.category).ok_or_else(|| {
            VaultError::Validation(format!(
                "Unknown category {}; expected one of: {}",
                request.category,
                CATEGORIES.join(", ")
            ))
        })?;
        if request.bytes.is_empty() {
            return Err(VaultError::Validation("File is empty".into()));
        }

        // Count and insert under the same lock so two uploads cannot both
        // take the last free slot.
        let _guard = self.locks.lock(owner.user_id()).await;
        let warning = self.gate.require(owner, Action::Upload).await?;

        let handle = self
            .blobs
            .save(owner.user_id(), &request.file_name, &request.bytes)
            .await?;

        let meta = DocumentMeta {
            display_name: request.file_name.clone(),
            handle,
            file_type,
            size_bytes: u64::try_from(request.bytes.len()).unwrap_or(u64::MAX),
            category: category.to_string(),
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            expiry_date: request.expiry_date,
        };

        let document = match self.record(owner, &meta).await {
            Ok(doc) => doc,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&meta.handle).await {
                    error!(handle = %meta.handle, error = %cleanup, "Orphaned blob after failed insert");
                }
                return Err(e);
            }
        };

        self.log(
            owner.user_id(),
            "upload",
            Some(&document.id),
            &format!("Uploaded {}", document.display_name),
        )
        .await;
        info!(doc_id = %document.id, size = document.size_bytes, "Document uploaded");

        Ok(UploadOutcome { document, warning })
    }

    /// List the owner's documents if viewing is allowed.
    pub async fn browse(
        &self,
        owner: &Identity,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, Option<Warning>), VaultError> {
        let warning = self.gate.require(owner, Action::View).await?;
        Ok((self.list(owner, filter).await?, warning))
    }

    /// Fetch a document's bytes if viewing is allowed.
    pub async fn download(
        &self,
        owner: &Identity,
        id: &str,
    ) -> Result<(Document, Vec<u8>), VaultError> {
        self.gate.require(owner, Action::View).await?;
        let doc = self.db.get_document(owner.user_id(), id).await?;
        let bytes = self
            .blobs
            .read(&BlobHandle::new(doc.storage_handle.clone()))
            .await?;
        Ok((doc, bytes))
    }

    /// Delete a document if the owner may currently access the vault.
    pub async fn delete(&self, owner: &Identity, id: &str) -> Result<bool, VaultError> {
        self.gate.require(owner, Action::View).await?;
        self.remove(owner, id).await
    }

    /// Pack every live document of the owner into one zip archive.
    ///
    /// Entries are named after the documents' display names; repeated names
    /// get a ` (2)`, ` (3)`, ... suffix before the extension.
    #[instrument(skip(self), fields(user_id = %owner.user_id()))]
    pub async fn export(&self, owner: &Identity) -> Result<Vec<u8>, VaultError> {
        self.gate.require(owner, Action::View).await?;
        let docs = self.list(owner, &DocumentFilter::default()).await?;

        let mut taken = HashSet::new();
        let mut entries = Vec::with_capacity(docs.len());
        for doc in &docs {
            let bytes = self
                .blobs
                .read(&BlobHandle::new(doc.storage_handle.clone()))
                .await?;
            entries.push((archive_name(&doc.display_name, &mut taken), bytes));
        }
        let archive = pack_zip(&entries)?;

        self.log(
            owner.user_id(),
            "export_zip",
            None,
            &format!("Full export of {} document(s)", docs.len()),
        )
        .await;
        info!(documents = docs.len(), bytes = archive.len(), "Vault exported");
        Ok(archive)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Finish interrupted deletions. Returns how many tombstones were purged.
    #[instrument(skip(self))]
    pub async fn purge_tombstones(&self) -> Result<usize, VaultError> {
        let mut purged = 0;
        for doc in self.db.list_tombstones().await? {
            let handle = BlobHandle::new(doc.storage_handle.clone());
            match self.blobs.delete(&handle).await {
                Ok(()) => {
                    if self.db.purge_document(&doc.id).await? {
                        purged += 1;
                    }
                }
                Err(e) => warn!(doc_id = %doc.id, error = %e, "Tombstone blob still not removable"),
            }
        }
        if purged > 0 {
            info!(purged, "Tombstones purged");
        }
        Ok(purged)
    }

    async fn log(&self, user_id: &str, action: &str, doc_id: Option<&str>, details: &str) {
        if let Err(e) = self
            .db
            .log_activity(user_id, action, doc_id, Some(details))
            .await
        {
            warn!(user_id, action, error = %e, "Failed to record activity");
        }
    }
}

/// Unique entry name for `display_name` within one archive.
fn archive_name(display_name: &str, taken: &mut HashSet<String>) -> String {
    let clean: String = display_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let clean = if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    };
    let (stem, ext) = match clean.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (clean.clone(), String::new()),
    };

    let mut candidate = clean;
    let mut n = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{stem} ({n}){ext}");
        n += 1;
    }
    candidate
}

fn pack_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, VaultError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| VaultError::Archive(format!("{name}: {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| VaultError::Archive(format!("{name}: {e}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| VaultError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_are_deduplicated() {
        let mut taken = HashSet::new();
        assert_eq!(archive_name("will.pdf", &mut taken), "will.pdf");
        assert_eq!(archive_name("will.pdf", &mut taken), "will (2).pdf");
        assert_eq!(archive_name("will.pdf", &mut taken), "will (3).pdf");
        assert_eq!(archive_name("notes", &mut taken), "notes");
        assert_eq!(archive_name("notes", &mut taken), "notes (2)");
    }

    #[test]
    fn archive_names_stay_flat() {
        let mut taken = HashSet::new();
        assert_eq!(archive_name("../etc/passwd.txt", &mut taken), ".._etc_passwd.txt");
        assert_eq!(archive_name("  ", &mut taken), "document");
    }

    #[test]
    fn empty_archive_is_valid() {
        let bytes = pack_zip(&[]).unwrap_or_default();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).map(|a| a.is_empty());
        assert_eq!(archive.ok(), Some(true));
    }
}
