use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::{EngineError, ReceiptUpload, ResultEngine};

use super::{BlobStore, StoredBlob, checksum, validate_upload};

const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

/// Filesystem blob store.
///
/// Files live flat under `root` as `<uuid-v7>_receipt.pdf`; the locator
/// handed back is `<public_prefix>/<name>`, e.g. `/uploads/<name>`.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
        }
    }

    /// Overrides the prefix used to build locators (e.g. a CDN base URL).
    #[must_use]
    pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.public_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a locator to a file inside `root`.
    ///
    /// Only the last path component is used, so a locator can never point
    /// outside of the store.
    pub fn path_for(&self, locator: &str) -> Option<PathBuf> {
        let name = locator.trim().rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
            return None;
        }
        Some(self.root.join(name))
    }

    fn locator_for(&self, name: &str) -> String {
        format!("{}/{}", self.public_prefix, name)
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> EngineError {
    tracing::warn!(path = %path.display(), error = %err, "blob store: {action} failed");
    EngineError::Storage(format!("cannot {action} {}: {err}", path.display()))
}

/// Writes `bytes` to `temp_path`, syncs it and renames it to `full_path`.
/// Once the temp file exists, every failure removes it.
async fn write_then_rename(temp_path: &Path, full_path: &Path, bytes: &[u8]) -> ResultEngine<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|err| storage_error("create", temp_path, err))?;

    let written = async {
        file.write_all(bytes)
            .await
            .map_err(|err| storage_error("write", temp_path, err))?;
        file.sync_all()
            .await
            .map_err(|err| storage_error("sync", temp_path, err))?;
        drop(file);
        fs::rename(temp_path, full_path)
            .await
            .map_err(|err| storage_error("rename", temp_path, err))
    }
    .await;

    if written.is_err() {
        let _ = fs::remove_file(temp_path).await;
    }
    written
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, upload: &ReceiptUpload) -> ResultEngine<StoredBlob> {
        validate_upload(upload)?;
        let checksum = checksum(&upload.bytes);

        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| storage_error("create uploads dir", &self.root, err))?;

        let name = format!("{}_receipt.pdf", Uuid::now_v7().simple());
        let full_path = self.root.join(&name);
        let temp_path = full_path.with_extension("tmp");

        write_then_rename(&temp_path, &full_path, &upload.bytes).await?;

        tracing::debug!(
            name = %name,
            size = upload.bytes.len(),
            checksum = %checksum,
            "blob store: saved receipt"
        );

        Ok(StoredBlob {
            locator: self.locator_for(&name),
            name,
            checksum,
        })
    }

    async fn delete(&self, locator: &str) -> ResultEngine<()> {
        if locator.trim().is_empty() {
            return Ok(());
        }
        let path = self
            .path_for(locator)
            .ok_or_else(|| EngineError::Storage(format!("invalid locator: {locator}")))?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(locator, "blob store: deleted receipt");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error("remove", &path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(bytes: &[u8]) -> ReceiptUpload {
        ReceiptUpload::new("receipt.pdf", bytes.to_vec())
    }

    #[tokio::test]
    async fn save_writes_file_and_returns_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let blob = store.save(&pdf(b"%PDF-1.4 receipt")).await.unwrap();

        assert_eq!(blob.checksum, checksum(b"%PDF-1.4 receipt"));
        assert_eq!(blob.locator, format!("/uploads/{}", blob.name));
        assert!(blob.name.ends_with("_receipt.pdf"));
        let on_disk = std::fs::read(dir.path().join(&blob.name)).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4 receipt");
    }

    #[tokio::test]
    async fn identical_content_is_not_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let first = store.save(&pdf(b"same")).await.unwrap();
        let second = store.save(&pdf(b"same")).await.unwrap();

        assert_eq!(first.checksum, second.checksum);
        assert_ne!(first.name, second.name);
        assert!(dir.path().join(&first.name).exists());
        assert!(dir.path().join(&second.name).exists());
    }

    #[tokio::test]
    async fn save_rejects_non_pdf_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("uploads"));

        let err = store
            .save(&ReceiptUpload::new("photo.jpg", b"jpeg".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert!(!dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let blob = store.save(&pdf(b"bytes")).await.unwrap();

        store.delete(&blob.locator).await.unwrap();
        assert!(!dir.path().join(&blob.name).exists());
        store.delete(&blob.locator).await.unwrap();
        store.delete("").await.unwrap();
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("blob.tmp");
        let full_path = dir.path().join("taken");
        std::fs::create_dir(&full_path).unwrap();
        std::fs::write(full_path.join("inside"), b"x").unwrap();

        let err = write_then_rename(&temp_path, &full_path, b"%PDF-1.4")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Storage(_)));
        assert!(!temp_path.exists());
        assert!(full_path.is_dir());
    }

    #[test]
    fn locators_cannot_escape_root() {
        let store = LocalBlobStore::new("/srv/uploads").public_prefix("https://cdn.example/r/");
        assert_eq!(
            store.path_for("/uploads/../../etc/passwd"),
            Some(PathBuf::from("/srv/uploads/passwd"))
        );
        assert_eq!(store.path_for("/uploads/.."), None);
        assert_eq!(store.locator_for("a.pdf"), "https://cdn.example/r/a.pdf");
    }
}
