#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for the document catalog: validation, ownership,
//! download, and deletion compensation when the blob store misbehaves.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use docvault::Vault;
use docvault::auth::Identity;
use docvault::blob::{BlobError, BlobHandle, BlobStore, FsBlobStore};
use docvault::catalog::UploadRequest;
use docvault::clock::Clock;
use docvault::error::VaultError;
use docvault::notifications::LogReminderSink;
use docvault::storage::{DocumentFilter, VaultDatabase};
use docvault_core::Config;

/// Filesystem store whose deletes can be made to fail on demand.
struct FlakyStore {
    inner: FsBlobStore,
    fail_deletes: AtomicBool,
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn save(
        &self,
        owner_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<BlobHandle, BlobError> {
        self.inner.save(owner_id, file_name, bytes).await
    }

    async fn read(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        self.inner.read(handle).await
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<(), BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other("device busy")));
        }
        self.inner.delete(handle).await
    }
}

struct Harness {
    vault: Vault,
    store: Arc<FlakyStore>,
    dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlakyStore {
        inner: FsBlobStore::new(dir.path()),
        fail_deletes: AtomicBool::new(false),
    });
    let db = VaultDatabase::open_in_memory().await.unwrap();
    let vault = Vault::assemble(
        db,
        &Config::default(),
        store.clone(),
        Arc::new(LogReminderSink),
        Clock::fixed(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
    );
    Harness { vault, store, dir }
}

async fn register(vault: &Vault, email: &str) -> Identity {
    vault
        .credentials()
        .register("Owner", email, "password123")
        .await
        .unwrap();
    vault.credentials().verify(email, "password123").await.unwrap()
}

fn request(name: &str, category: &str) -> UploadRequest {
    UploadRequest {
        file_name: name.to_string(),
        bytes: b"payload".to_vec(),
        category: category.to_string(),
        notes: Some("kept in the safe".to_string()),
        expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1),
    }
}

fn blob_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|owner| std::fs::read_dir(owner.path()).map_or(0, Iterator::count))
                .sum()
        })
        .unwrap_or(0)
}

#[tokio::test]
async fn upload_validates_type_and_category() {
    let h = harness().await;
    let user = register(&h.vault, "owner@vault.test").await;

    let exe = h.vault.catalog().upload(&user, request("setup.exe", "Other")).await;
    assert!(matches!(exe, Err(VaultError::Validation(_))));

    let bad_category = h
        .vault
        .catalog()
        .upload(&user, request("a.pdf", "Recipes"))
        .await;
    assert!(matches!(bad_category, Err(VaultError::Validation(_))));

    let ok = h
        .vault
        .catalog()
        .upload(&user, request("Scan.JPG", "banking & finance"))
        .await
        .unwrap();
    assert_eq!(ok.document.file_type, "jpg");
    assert_eq!(ok.document.category, "Banking & Finance");
    assert_eq!(ok.document.expiry_date.as_deref(), Some("2030-01-01"));
    assert_eq!(blob_count(h.dir.path()), 1);
}

#[tokio::test]
async fn download_returns_stored_bytes_to_owner_only() {
    let h = harness().await;
    let owner = register(&h.vault, "owner@vault.test").await;
    let other = register(&h.vault, "other@vault.test").await;
    let doc = h
        .vault
        .catalog()
        .upload(&owner, request("will.pdf", "Legal"))
        .await
        .unwrap()
        .document;

    let (meta, bytes) = h.vault.catalog().download(&owner, &doc.id).await.unwrap();
    assert_eq!(meta.display_name, "will.pdf");
    assert_eq!(bytes, b"payload");

    assert!(matches!(
        h.vault.catalog().download(&other, &doc.id).await,
        Err(VaultError::NotFound(_))
    ));
    assert!(!h.vault.catalog().delete(&other, &doc.id).await.unwrap());
}

#[tokio::test]
async fn delete_removes_row_and_blob() {
    let h = harness().await;
    let user = register(&h.vault, "owner@vault.test").await;
    let doc = h
        .vault
        .catalog()
        .upload(&user, request("old.pdf", "Other"))
        .await
        .unwrap()
        .document;

    assert!(h.vault.catalog().delete(&user, &doc.id).await.unwrap());
    assert_eq!(h.vault.catalog().count(&user).await.unwrap(), 0);
    assert_eq!(blob_count(h.dir.path()), 0);
    assert!(!h.vault.catalog().delete(&user, &doc.id).await.unwrap());

    let actions: Vec<String> = h
        .vault
        .activity(&user, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec!["delete", "upload"]);
}

#[tokio::test]
async fn failed_blob_removal_keeps_the_document() {
    let h = harness().await;
    let user = register(&h.vault, "owner@vault.test").await;
    let doc = h
        .vault
        .catalog()
        .upload(&user, request("keep.pdf", "Other"))
        .await
        .unwrap()
        .document;

    h.store.fail_deletes.store(true, Ordering::SeqCst);
    let result = h.vault.catalog().delete(&user, &doc.id).await;
    assert!(matches!(result, Err(VaultError::Blob(_))));
    assert!(result.unwrap_err().is_infrastructure());

    // Row restored, blob still readable.
    let (docs, _) = h
        .vault
        .catalog()
        .browse(&user, &DocumentFilter::default())
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    h.vault.catalog().download(&user, &doc.id).await.unwrap();

    h.store.fail_deletes.store(false, Ordering::SeqCst);
    assert!(h.vault.catalog().delete(&user, &doc.id).await.unwrap());
    assert_eq!(blob_count(h.dir.path()), 0);
}

#[tokio::test]
async fn purge_finishes_interrupted_deletions() {
    let h = harness().await;
    let user = register(&h.vault, "owner@vault.test").await;
    let doc = h
        .vault
        .catalog()
        .upload(&user, request("stuck.pdf", "Other"))
        .await
        .unwrap()
        .document;

    // Simulate a crash between marking and blob removal.
    h.vault
        .database()
        .mark_document_deleted(user.user_id(), &doc.id)
        .await
        .unwrap();
    assert_eq!(h.vault.catalog().count(&user).await.unwrap(), 0);

    h.store.fail_deletes.store(true, Ordering::SeqCst);
    assert_eq!(h.vault.catalog().purge_tombstones().await.unwrap(), 0);
    assert_eq!(blob_count(h.dir.path()), 1);

    h.store.fail_deletes.store(false, Ordering::SeqCst);
    assert_eq!(h.vault.catalog().purge_tombstones().await.unwrap(), 1);
    assert_eq!(blob_count(h.dir.path()), 0);
    assert!(h.vault.database().list_tombstones().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_frees_a_free_plan_slot() {
    let h = harness().await;
    let user = register(&h.vault, "owner@vault.test").await;
    let mut first = None;
    for i in 0..5 {
        let doc = h
            .vault
            .catalog()
            .upload(&user, request(&format!("f{i}.pdf"), "Other"))
            .await
            .unwrap()
            .document;
        first.get_or_insert(doc.id);
    }
    assert!(matches!(
        h.vault.catalog().upload(&user, request("f5.pdf", "Other")).await,
        Err(VaultError::AccessDenied(_))
    ));

    h.vault
        .catalog()
        .delete(&user, &first.unwrap())
        .await
        .unwrap();
    h.vault
        .catalog()
        .upload(&user, request("f5.pdf", "Other"))
        .await
        .unwrap();
}

#[tokio::test]
async fn export_packs_only_live_documents_of_the_owner() {
    let h = harness().await;
    let owner = register(&h.vault, "owner@vault.test").await;
    let other = register(&h.vault, "other@vault.test").await;
    let catalog = h.vault.catalog();

    catalog.upload(&owner, request("will.pdf", "Legal")).await.unwrap();
    catalog.upload(&owner, request("will.pdf", "Legal")).await.unwrap();
    catalog.upload(&owner, request("notes.txt", "Other")).await.unwrap();
    let gone = catalog
        .upload(&owner, request("gone.pdf", "Other"))
        .await
        .unwrap()
        .document;
    h.vault
        .database()
        .mark_document_deleted(owner.user_id(), &gone.id)
        .await
        .unwrap();
    catalog.upload(&other, request("theirs.pdf", "Other")).await.unwrap();

    let bytes = catalog.export(&owner).await.unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["notes.txt", "will (2).pdf", "will.pdf"]);

    let mut contents = String::new();
    archive
        .by_name("notes.txt")
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "payload");

    let actions: Vec<String> = h
        .vault
        .activity(&owner, 1)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions, vec!["export_zip"]);
}
