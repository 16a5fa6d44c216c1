//! Seam between the pipeline and the blob store.

use crate::errors::BlobStoreError;
use crate::models::copy::CopyStatus;
use async_trait::async_trait;

/// Object storage operations the migration needs.
///
/// The concrete client is constructed once at startup and handed to the
/// pipeline; nothing here is process-global.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob with this name exists in the container.
    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError>;

    /// Start a server-side copy of `source` into `dest`.
    ///
    /// Returns once the store has accepted the copy, not once it has
    /// finished; completion is observed through [`BlobStore::copy_status`].
    async fn begin_copy(&self, source: &str, dest: &str) -> Result<(), BlobStoreError>;

    /// Current status of the copy operation that produced `dest`.
    async fn copy_status(&self, dest: &str) -> Result<CopyStatus, BlobStoreError>;

    /// Delete a blob if present. A missing blob is not an error; the
    /// return value says whether anything was actually removed.
    async fn delete_if_exists(&self, name: &str) -> Result<bool, BlobStoreError>;
}
