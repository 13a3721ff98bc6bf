//! Asset storage for menuboard.
//!
//! This crate provides:
//! - The [`AssetStore`] abstraction with local directory and S3-compatible backends
//! - The [`Gallery`], which resolves one ordered image list across backends
//!   and manages the admin image on the write backend

pub mod backends;
pub mod error;
pub mod gallery;
pub mod traits;

pub use backends::{
    filesystem::FilesystemBackend,
    s3::{S3Backend, S3Settings},
};
pub use error::{StorageError, StorageResult};
pub use gallery::{Gallery, GalleryError, GalleryResult, Resolved, StoredImage};
pub use traits::AssetStore;

use menuboard_core::config::{BackendConfig, StorageConfig};
use percent_encoding::{AsciiSet, CONTROLS};
use std::sync::Arc;

/// Characters escaped in a URL path segment.
pub(crate) const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Create a single backend from configuration.
pub async fn backend_from_config(config: &BackendConfig) -> StorageResult<Arc<dyn AssetStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        BackendConfig::Filesystem {
            path, public_path, ..
        } => {
            let backend = FilesystemBackend::new(path, public_path.clone()).await?;
            Ok(Arc::new(backend))
        }
        BackendConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
            public_base_url,
            ..
        } => {
            let backend = S3Backend::new(S3Settings {
                bucket: bucket.clone(),
                endpoint: endpoint.clone(),
                region: region.clone(),
                prefix: prefix.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                force_path_style: *force_path_style,
                public_base_url: public_base_url.clone(),
            })
            .await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Create the gallery from configuration, backends in configured order.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Gallery> {
    config.validate().map_err(StorageError::Config)?;

    let mut backends = Vec::with_capacity(config.backends.len());
    for backend in &config.backends {
        backends.push(backend_from_config(backend).await?);
    }
    let writer = config
        .writer_index()
        .ok_or_else(|| StorageError::Config("no storage backend configured".to_string()))?;

    Gallery::new(backends, writer)
}
