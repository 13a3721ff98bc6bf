//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use menuboard_core::Origin;

/// A place menu images live: a local directory or a remote bucket.
///
/// Keys are flat file names relative to the backend's root or prefix
/// (`menu1.jpg`, `admin-menu.png`).
#[async_trait]
pub trait AssetStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List object keys with a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// URL the object is displayed under: absolute for remote stores,
    /// root-relative for directories this process serves.
    fn public_url(&self, key: &str) -> String;

    /// Origin assigned to numbered images from this backend.
    fn origin(&self) -> Origin;

    /// URL path this process serves the backend under, if any.
    fn mount_path(&self) -> Option<&str> {
        None
    }

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
