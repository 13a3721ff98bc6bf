use async_trait::async_trait;
use bytes::Bytes;
use menuboard_core::Origin;
use menuboard_storage::AssetStore;
use menuboard_storage::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory backend that counts mutating calls.
#[allow(dead_code)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, Bytes>>,
    origin: Origin,
    base_url: String,
    pub writes: AtomicUsize,
    pub deletes: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryBackend {
    pub fn local(keys: &[&str]) -> Arc<Self> {
        Self::with_keys(Origin::Local, "/menu", keys)
    }

    pub fn remote(keys: &[&str]) -> Arc<Self> {
        Self::with_keys(Origin::Remote, "https://cdn.test/menu", keys)
    }

    fn with_keys(origin: Origin, base_url: &str, keys: &[&str]) -> Arc<Self> {
        let objects = keys
            .iter()
            .map(|k| (k.to_string(), Bytes::from(k.to_string())))
            .collect();
        Arc::new(Self {
            objects: Mutex::new(objects),
            origin,
            base_url: base_url.to_string(),
            writes: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn mutations(&self) -> usize {
        self.writes.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn backend_name(&self) -> &'static str {
        match self.origin {
            Origin::Remote => "memory-remote",
            _ => "memory-local",
        }
    }
}

/// Backend whose every operation fails, like an unreachable bucket.
#[allow(dead_code)]
pub struct FailingBackend;

#[allow(dead_code)]
impl FailingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }

    fn unavailable() -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "backend unreachable",
        ))
    }
}

#[async_trait]
impl AssetStore for FailingBackend {
    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Err(Self::unavailable())
    }

    async fn get(&self, _key: &str) -> StorageResult<Bytes> {
        Err(Self::unavailable())
    }

    async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
        Err(Self::unavailable())
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(Self::unavailable())
    }

    async fn list(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        Err(Self::unavailable())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://unreachable.test/{key}")
    }

    fn origin(&self) -> Origin {
        Origin::Remote
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn health_check(&self) -> StorageResult<()> {
        Err(Self::unavailable())
    }
}
