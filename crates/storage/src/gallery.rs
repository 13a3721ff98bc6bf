//! The menu gallery: one ordered image list over several backends, and the
//! admin image lifecycle on the backend that accepts writes.

use crate::error::StorageError;
use crate::traits::AssetStore;
use bytes::Bytes;
use futures::future::join_all;
use menuboard_core::image::{self, ImageRecord, classify_key, is_admin_name};
use menuboard_core::Classified;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Gallery operation errors.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(#[from] StorageError),
}

pub type GalleryResult<T> = std::result::Result<T, GalleryError>;

/// Result of a resolution pass.
#[derive(Clone, Debug, Default)]
pub struct Resolved {
    /// Admin image first, then numbered images by ordinal.
    pub images: Vec<ImageRecord>,
    /// Names of the backends whose listing failed and counted as empty.
    pub failed_backends: Vec<&'static str>,
}

/// A freshly stored admin image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

/// Backends in priority order plus the index of the one that takes writes.
#[derive(Clone)]
pub struct Gallery {
    backends: Vec<Arc<dyn AssetStore>>,
    writer: usize,
}

impl std::fmt::Debug for Gallery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.backends.iter().map(|b| b.backend_name()).collect();
        f.debug_struct("Gallery")
            .field("backends", &names)
            .field("writer", &self.writer)
            .finish()
    }
}

impl Gallery {
    pub fn new(backends: Vec<Arc<dyn AssetStore>>, writer: usize) -> Result<Self, StorageError> {
        if writer >= backends.len() {
            return Err(StorageError::Config(format!(
                "write backend index {writer} out of range for {} backends",
                backends.len()
            )));
        }
        Ok(Self { backends, writer })
    }

    pub fn backends(&self) -> &[Arc<dyn AssetStore>] {
        &self.backends
    }

    pub fn writer(&self) -> &Arc<dyn AssetStore> {
        &self.backends[self.writer]
    }

    pub fn writer_index(&self) -> usize {
        self.writer
    }

    /// Resolve the display list, swallowing backend failures.
    pub async fn resolve(&self) -> Vec<ImageRecord> {
        self.resolve_report().await.images
    }

    /// Resolve the display list and report which backends failed.
    ///
    /// Listings run concurrently; a failing backend contributes nothing. The
    /// admin image is only taken from the write backend, so what is displayed
    /// is always what `upload` replaces and `delete` removes. A numbered
    /// identity seen in an earlier backend shadows later ones, then numbered
    /// images are ordered by ordinal.
    #[instrument(skip(self), fields(backends = self.backends.len()))]
    pub async fn resolve_report(&self) -> Resolved {
        let listings = join_all(self.backends.iter().enumerate().map(
            |(idx, backend)| async move {
                let result = backend.list("").await;
                (idx, backend, result)
            },
        ))
        .await;

        let mut failed_backends = Vec::new();
        let mut admin: Option<ImageRecord> = None;
        let mut numbered: Vec<ImageRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, backend, result) in listings {
            let mut keys = match result {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(
                        backend = backend.backend_name(),
                        error = %e,
                        "Image listing failed; treating backend as empty"
                    );
                    failed_backends.push(backend.backend_name());
                    continue;
                }
            };
            keys.sort();

            for key in keys {
                let Some(classified) = classify_key(&key) else {
                    debug!(backend = backend.backend_name(), key = %key, "Skipping unrecognized entry");
                    continue;
                };
                match classified {
                    Classified::Admin if idx != self.writer => {
                        debug!(
                            backend = backend.backend_name(),
                            key = %key,
                            "Ignoring admin image outside the write backend"
                        );
                    }
                    Classified::Admin if admin.is_none() => {
                        admin = Some(ImageRecord::new(
                            classified,
                            backend.public_url(&key),
                            backend.origin(),
                        ));
                    }
                    Classified::Admin => {}
                    Classified::Numbered { .. } => {
                        if seen.insert(classified.identity()) {
                            numbered.push(ImageRecord::new(
                                classified,
                                backend.public_url(&key),
                                backend.origin(),
                            ));
                        }
                    }
                }
            }
        }

        // Stable: equal ordinals keep backend priority.
        numbered.sort_by_key(|record| record.ordinal);

        let images = admin.into_iter().chain(numbered).collect();
        Resolved {
            images,
            failed_backends,
        }
    }

    /// Keys of admin images currently held by the write backend.
    async fn admin_keys(&self) -> Result<Vec<String>, StorageError> {
        let keys = self.writer().list("").await?;
        Ok(keys.into_iter().filter(|key| is_admin_name(key)).collect())
    }

    /// Replace the admin image.
    ///
    /// The payload must be declared as an image; other content types are
    /// rejected before storage is touched. Previous admin images stored
    /// under another extension are removed best-effort.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload(&self, data: Bytes, content_type: &str) -> GalleryResult<StoredImage> {
        let extension = image::extension_for_mime(content_type).map_err(|_| {
            GalleryError::InvalidInput(format!(
                "only image uploads are accepted (got '{content_type}')"
            ))
        })?;
        if data.is_empty() {
            return Err(GalleryError::InvalidInput("uploaded file is empty".to_string()));
        }

        let key = image::admin_key(extension);
        let writer = self.writer();

        match self.admin_keys().await {
            Ok(previous) => {
                for old in previous.iter().filter(|old| **old != key) {
                    if let Err(e) = writer.delete(old).await {
                        warn!(key = %old, error = %e, "Failed to remove previous admin image");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Could not list previous admin images"),
        }

        writer.put(&key, data, content_type).await?;
        let url = writer.public_url(&key);
        tracing::info!(key = %key, backend = writer.backend_name(), "Admin image stored");

        Ok(StoredImage { key, url })
    }

    /// Remove the admin image. Only the admin image can be deleted.
    ///
    /// Returns the removed keys.
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> GalleryResult<Vec<String>> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(GalleryError::InvalidInput("no filename specified".to_string()));
        }
        if !is_admin_name(filename) {
            return Err(GalleryError::InvalidInput(
                "only the admin image may be deleted".to_string(),
            ));
        }

        let keys = self.admin_keys().await?;
        if keys.is_empty() {
            return Err(GalleryError::NotFound("admin image not found".to_string()));
        }

        let writer = self.writer();
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            match writer.delete(&key).await {
                Ok(()) => removed.push(key),
                // Raced with another delete.
                Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed.is_empty() {
            return Err(GalleryError::NotFound("admin image not found".to_string()));
        }

        tracing::info!(keys = ?removed, backend = writer.backend_name(), "Admin image deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilesystemBackend;
    use menuboard_core::Origin;

    async fn local_gallery(dir: &std::path::Path) -> Gallery {
        let backend = FilesystemBackend::new(dir, "/menu").await.unwrap();
        Gallery::new(vec![Arc::new(backend)], 0).unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_out_of_range_writer() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path(), "/menu").await.unwrap();
        assert!(Gallery::new(vec![Arc::new(backend)], 1).is_err());
        assert!(Gallery::new(Vec::new(), 0).is_err());
    }

    #[tokio::test]
    async fn test_upload_then_resolve_puts_admin_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("menu1.jpg"), b"1").unwrap();
        let gallery = local_gallery(dir.path()).await;

        let stored = gallery
            .upload(Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(stored.key, "admin-menu.png");
        assert_eq!(stored.url, "/menu/admin-menu.png");

        let images = gallery.resolve().await;
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].origin, Origin::Admin);
        assert_eq!(images[1].identity, "menu1");
    }

    #[tokio::test]
    async fn test_upload_replaces_other_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin-menu.jpg"), b"old").unwrap();
        let gallery = local_gallery(dir.path()).await;

        gallery
            .upload(Bytes::from_static(b"new"), "image/webp")
            .await
            .unwrap();

        assert!(!dir.path().join("admin-menu.jpg").exists());
        assert!(dir.path().join("admin-menu.webp").exists());
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = local_gallery(dir.path()).await;

        let err = gallery.upload(Bytes::new(), "image/png").await.unwrap_err();
        assert!(matches!(err, GalleryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_admin_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin-menu.png"), b"a").unwrap();
        let gallery = local_gallery(dir.path()).await;

        let removed = gallery.delete("admin-menu.png").await.unwrap();
        assert_eq!(removed, vec!["admin-menu.png".to_string()]);
        assert!(gallery.resolve().await.is_empty());

        let err = gallery.delete("admin-menu.png").await.unwrap_err();
        assert!(matches!(err, GalleryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_rejects_blank_filename() {
        let dir = tempfile::tempdir().unwrap();
        let gallery = local_gallery(dir.path()).await;

        let err = gallery.delete("  ").await.unwrap_err();
        match err {
            GalleryError::InvalidInput(msg) => assert_eq!(msg, "no filename specified"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }
}
