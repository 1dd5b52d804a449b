//! Blob storage for uploaded document bytes.
//!
//! The catalog stores only an opaque [`BlobHandle`]; the store maps handles
//! to bytes. [`FsBlobStore`] keeps one directory per owner under a root.

mod fs;

pub use fs::FsBlobStore;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque reference to stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob name or handle: {0}")]
    InvalidName(String),

    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Save, read and delete document bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` for `owner_id` under a name derived from `file_name`.
    async fn save(
        &self,
        owner_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<BlobHandle, BlobError>;

    async fn read(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError>;

    /// Remove the blob. Removing a blob that is already gone is not an error.
    async fn delete(&self, handle: &BlobHandle) -> Result<(), BlobError>;
}
