//! Receipt file persistence.
//!
//! The blob store never touches the database: every call is a side effect on
//! the file store only, outside of any transaction. Consistency with the
//! `receipts` rows is the job of the record service.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::{EngineError, ReceiptUpload, ResultEngine};

mod local;

pub use local::LocalBlobStore;

/// Result of a successful [`BlobStore::save`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Unique name generated by the store, independent of the content.
    pub name: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub checksum: String,
    /// Stable locator to persist alongside the receipt.
    pub locator: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Validates and writes a receipt payload.
    ///
    /// Two uploads with the same bytes are stored as two independent blobs.
    async fn save(&self, upload: &ReceiptUpload) -> ResultEngine<StoredBlob>;

    /// Removes the blob behind `locator`. Deleting a missing blob succeeds.
    async fn delete(&self, locator: &str) -> ResultEngine<()>;
}

/// Hex SHA-256 fingerprint of a payload.
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Only readable PDF payloads are accepted as receipts.
pub(crate) fn validate_upload(upload: &ReceiptUpload) -> ResultEngine<()> {
    let is_pdf = std::path::Path::new(upload.file_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(EngineError::Validation(
            "only PDF files are allowed".to_string(),
        ));
    }
    if upload.bytes.is_empty() {
        return Err(EngineError::Validation(
            "cannot read uploaded file: empty payload".to_string(),
        ));
    }
    Ok(())
}
