//! In-process object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::RwLock;

use cronkeep_protocols::{stream_from_bytes, ByteStream, FileInfo, Storage, StorageError};

/// Object store held in memory. Counts uploads and can be told to fail them.
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
    uploads: AtomicUsize,
    fail_uploads: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
            fail_uploads: AtomicBool::new(false),
        }
    }

    /// Number of successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, name: &str) -> Option<Bytes> {
        self.objects.read().await.get(name).cloned()
    }

    pub async fn put(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().await.insert(name.into(), data.into());
    }

    fn url(name: &str) -> String {
        format!("memory://{}", name)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_files(&self) -> Result<Vec<FileInfo>, StorageError> {
        let objects = self.objects.read().await;
        let mut files: Vec<_> = objects
            .keys()
            .map(|name| FileInfo::new(name.clone(), Self::url(name)))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn download_file(&self, name: &str) -> Result<ByteStream, StorageError> {
        let data = self
            .get(name)
            .await
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        Ok(stream_from_bytes(data))
    }

    async fn upload_file(&self, name: &str, mut data: ByteStream) -> Result<FileInfo, StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload(format!("{} rejected", name)));
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = data.next().await {
            buf.extend_from_slice(&chunk?);
        }

        self.put(name, buf.freeze()).await;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(FileInfo::new(name, Self::url(name)))
    }

    async fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        self.objects
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.write().await;
        let data = objects
            .remove(old_name)
            .ok_or_else(|| StorageError::NotFound(old_name.to_string()))?;
        objects.insert(new_name.to_string(), data);
        Ok(())
    }
}
