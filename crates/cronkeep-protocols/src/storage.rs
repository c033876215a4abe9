//! Remote object storage protocol definitions.
//!
//! Backups only depend on this capability, never on a concrete provider.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Streaming object body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// A stored object and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub url: String,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Core trait for remote object stores.
#[async_trait]
pub trait Storage: Send + Sync {
    /// List all stored objects.
    async fn list_files(&self) -> Result<Vec<FileInfo>, StorageError>;

    /// Stream an object's content. Missing objects yield [`StorageError::NotFound`].
    async fn download_file(&self, name: &str) -> Result<ByteStream, StorageError>;

    /// Store an object, replacing any existing one with the same name.
    async fn upload_file(&self, name: &str, data: ByteStream) -> Result<FileInfo, StorageError>;

    /// Delete an object.
    async fn delete_file(&self, name: &str) -> Result<(), StorageError>;

    /// Rename an object.
    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), StorageError>;
}

/// Wrap an in-memory buffer as a single-chunk stream.
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_from_bytes() {
        let mut stream = stream_from_bytes(Bytes::from_static(b"hello"));
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"hello");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_file_info_serde() {
        let info = FileInfo::new("jobs.db", "file:///tmp/jobs.db");
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"name\":\"jobs.db\""));
        assert!(json.contains("\"url\""));
    }
}
