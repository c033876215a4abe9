//! A local directory used as an object store.
//!
//! Object names map to relative paths under the root; `/` in a name creates
//! subdirectories. Uploads land in a `.part` file and are renamed into place.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use cronkeep_protocols::{ByteStream, FileInfo, Storage, StorageError};

pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object name, rejecting anything that escapes the root.
    fn object_path(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        valid.then(|| self.root.join(relative))
    }

    fn url(path: &Path) -> String {
        format!("file://{}", path.display())
    }

    async fn ensure_parent(path: &Path) -> std::io::Result<()> {
        match path.parent() {
            Some(parent) => fs::create_dir_all(parent).await,
            None => Ok(()),
        }
    }
}

fn not_found_or(err: std::io::Error, name: &str, other: fn(String) -> StorageError) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(name.to_string())
    } else {
        other(format!("{}: {}", name, err))
    }
}

#[async_trait]
impl Storage for LocalDirStorage {
    async fn list_files(&self) -> Result<Vec<FileInfo>, StorageError> {
        let mut files = Vec::new();
        if !fs::try_exists(&self.root).await? {
            return Ok(files);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().is_some_and(|ext| ext == "part") {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push(FileInfo::new(name, Self::url(&path)));
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    async fn download_file(&self, name: &str) -> Result<ByteStream, StorageError> {
        let path = self
            .object_path(name)
            .ok_or_else(|| StorageError::Download(format!("invalid object name: {}", name)))?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or(e, name, StorageError::Download))?;
        Ok(Box::pin(ReaderStream::new(file).map_err(StorageError::from)))
    }

    async fn upload_file(&self, name: &str, mut data: ByteStream) -> Result<FileInfo, StorageError> {
        let path = self
            .object_path(name)
            .ok_or_else(|| StorageError::Upload(format!("invalid object name: {}", name)))?;
        Self::ensure_parent(&path).await?;

        let mut part = path.clone().into_os_string();
        part.push(".part");
        let part = PathBuf::from(part);

        let written = async {
            let mut file = fs::File::create(&part).await?;
            while let Some(chunk) = data.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, StorageError>(())
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&part).await;
            return Err(StorageError::Upload(format!("{}: {}", name, e)));
        }
        fs::rename(&part, &path).await?;

        debug!(path = %path.display(), "Stored object {}", name);
        Ok(FileInfo::new(name, Self::url(&path)))
    }

    async fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        let path = self
            .object_path(name)
            .ok_or_else(|| StorageError::Delete(format!("invalid object name: {}", name)))?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(e, name, StorageError::Delete))
    }

    async fn rename_file(&self, old_name: &str, new_name: &str) -> Result<(), StorageError> {
        let (Some(from), Some(to)) = (self.object_path(old_name), self.object_path(new_name)) else {
            return Err(StorageError::Rename(format!(
                "invalid object name: {} -> {}",
                old_name, new_name
            )));
        };
        Self::ensure_parent(&to).await?;
        fs::rename(&from, &to)
            .await
            .map_err(|e| not_found_or(e, old_name, StorageError::Rename))
    }
}
