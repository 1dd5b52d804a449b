//! Filesystem-backed blob store: `<root>/<owner_id>/<timestamp>_<tag>_<name>`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{BlobError, BlobHandle, BlobStore};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a handle to a path, refusing anything that escapes the root.
    fn resolve(&self, handle: &BlobHandle) -> Result<PathBuf, BlobError> {
        let rel = Path::new(handle.as_str());
        let safe = !handle.as_str().is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidName(handle.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

/// Keep only the final path segment and replace characters that are awkward
/// on common filesystems.
fn sanitize_file_name(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(
        &self,
        owner_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<BlobHandle, BlobError> {
        if !is_safe_segment(owner_id) {
            return Err(BlobError::InvalidName(owner_id.to_string()));
        }
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| BlobError::InvalidName(file_name.to_string()))?;

        let ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
        let tag = uuid::Uuid::new_v4().simple().to_string();
        let handle = BlobHandle::new(format!("{owner_id}/{ts}_{}_{name}", &tag[..8]));

        let path = self.resolve(&handle)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(handle = %handle, size = bytes.len(), "Blob saved");
        Ok(handle)
    }

    async fn read(&self, handle: &BlobHandle) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(handle)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(handle.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, handle: &BlobHandle) -> Result<(), BlobError> {
        let path = self.resolve(handle)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(handle = %handle, "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        let handle = store.save("u1", "passport.pdf", b"%PDF-1.7").await.unwrap();
        assert!(handle.as_str().starts_with("u1/"));
        assert!(handle.as_str().ends_with("_passport.pdf"));
        assert_eq!(store.read(&handle).await.unwrap(), b"%PDF-1.7");

        store.delete(&handle).await.unwrap();
        assert!(matches!(
            store.read(&handle).await,
            Err(BlobError::NotFound(_))
        ));
        // Second delete is a no-op.
        store.delete(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let a = store.save("u1", "id.png", b"a").await.unwrap();
        let b = store.save("u1", "id.png", b"b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.read(&a).await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn path_components_in_name_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let handle = store
            .save("u1", "../../etc/passwd", b"x")
            .await
            .unwrap();
        assert!(handle.as_str().starts_with("u1/"));
        assert!(handle.as_str().ends_with("_passwd"));
    }

    #[tokio::test]
    async fn escaping_handles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        for bad in ["../outside", "/etc/passwd", ""] {
            assert!(matches!(
                store.read(&BlobHandle::new(bad)).await,
                Err(BlobError::InvalidName(_))
            ));
        }
        assert!(matches!(
            store.save("..", "a.txt", b"x").await,
            Err(BlobError::InvalidName(_))
        ));
    }

    #[test]
    fn sanitize_rejects_empty_names() {
        assert_eq!(sanitize_file_name("   "), None);
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name("a b$c.txt").as_deref(), Some("a b_c.txt"));
    }
}
