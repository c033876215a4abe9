//! Checksum-gated backup and atomic restore.
//!
//! The digest of the last uploaded content lives in a sidecar marker file
//! next to the database. A backup whose digest matches the marker is skipped.
//! A restore streams into `<db>.tmp`, syncs it, and renames it over the
//! database, so the target path only ever holds a complete file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use cronkeep_protocols::{ByteStream, Storage, StorageError};

use crate::error::BackupError;

/// File name of the checksum marker, in the database's directory.
pub const CHECKSUM_MARKER: &str = ".last_checksum";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Result of [`BackupCoordinator::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Uploaded { checksum: String },
    /// Content matched the last uploaded digest.
    Skipped { checksum: String },
}

impl BackupOutcome {
    pub fn checksum(&self) -> &str {
        match self {
            BackupOutcome::Uploaded { checksum } | BackupOutcome::Skipped { checksum } => checksum,
        }
    }

    pub fn uploaded(&self) -> bool {
        matches!(self, BackupOutcome::Uploaded { .. })
    }
}

/// Result of [`BackupCoordinator::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { checksum: String, bytes: u64 },
    /// No usable remote copy; local state was left alone.
    StartedFresh,
}

/// Where the checksum marker for `local_path` lives.
pub fn checksum_marker_path(local_path: &Path) -> PathBuf {
    match local_path.parent() {
        Some(parent) => parent.join(CHECKSUM_MARKER),
        None => PathBuf::from(CHECKSUM_MARKER),
    }
}

/// Hex SHA-256 of a file's content.
pub async fn file_checksum(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn temp_path(local_path: &Path) -> PathBuf {
    let mut name = OsString::from(local_path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

async fn read_marker(marker: &Path) -> Option<String> {
    fs::read_to_string(marker)
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

enum DownloadFailure {
    Remote(StorageError),
    Local(std::io::Error),
}

/// Moves the local database to and from a [`Storage`].
pub struct BackupCoordinator {
    storage: Arc<dyn Storage>,
}

impl BackupCoordinator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Upload `local_path` as `remote_name` unless its content is unchanged
    /// since the last upload.
    ///
    /// The marker is only rewritten after a successful upload.
    pub async fn backup(
        &self,
        local_path: &Path,
        remote_name: &str,
    ) -> Result<BackupOutcome, BackupError> {
        let checksum = file_checksum(local_path).await?;
        let marker = checksum_marker_path(local_path);

        if read_marker(&marker).await.as_deref() == Some(checksum.as_str()) {
            debug!(remote = %remote_name, checksum = %checksum, "Backup skipped, content unchanged");
            return Ok(BackupOutcome::Skipped { checksum });
        }

        let file = fs::File::open(local_path).await?;
        let body: ByteStream = Box::pin(ReaderStream::new(file).map_err(StorageError::from));
        let stored = self.storage.upload_file(remote_name, body).await?;

        fs::write(&marker, &checksum).await?;
        info!(
            remote = %remote_name,
            checksum = %checksum,
            "Backed up {} to {}",
            local_path.display(),
            stored.url
        );
        Ok(BackupOutcome::Uploaded { checksum })
    }

    /// Replace `local_path` with the remote copy, if there is one.
    ///
    /// A missing or unreadable remote copy is not an error: the temp file is
    /// removed and [`RestoreOutcome::StartedFresh`] is returned.
    pub async fn restore(
        &self,
        local_path: &Path,
        remote_name: &str,
    ) -> Result<RestoreOutcome, BackupError> {
        let stream = match self.storage.download_file(remote_name).await {
            Ok(stream) => stream,
            Err(e) if e.is_not_found() => {
                info!(remote = %remote_name, "No remote backup found, starting fresh");
                return Ok(RestoreOutcome::StartedFresh);
            }
            Err(e) => {
                warn!(remote = %remote_name, "Could not fetch remote backup, starting fresh: {}", e);
                return Ok(RestoreOutcome::StartedFresh);
            }
        };

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp = temp_path(local_path);
        let (checksum, bytes) = match download_into(stream, &tmp).await {
            Ok(done) => done,
            Err(failure) => {
                if let Err(e) = fs::remove_file(&tmp).await {
                    debug!(path = %tmp.display(), "Temp file cleanup: {}", e);
                }
                return match failure {
                    DownloadFailure::Remote(e) => {
                        warn!(remote = %remote_name, "Remote backup download failed, starting fresh: {}", e);
                        Ok(RestoreOutcome::StartedFresh)
                    }
                    DownloadFailure::Local(e) => Err(e.into()),
                };
            }
        };

        if let Err(e) = fs::rename(&tmp, local_path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        fs::write(checksum_marker_path(local_path), &checksum).await?;

        info!(
            remote = %remote_name,
            checksum = %checksum,
            "Restored {} bytes into {}",
            bytes,
            local_path.display()
        );
        Ok(RestoreOutcome::Restored { checksum, bytes })
    }
}

/// Stream into `tmp`, hashing as we go, then flush and fsync.
async fn download_into(
    mut stream: ByteStream,
    tmp: &Path,
) -> Result<(String, u64), DownloadFailure> {
    let mut file = fs::File::create(tmp).await.map_err(DownloadFailure::Local)?;
    let mut hasher = Sha256::new();
    let mut bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(DownloadFailure::Remote)?;
        hasher.update(&chunk);
        file.write_all(&chunk).await.map_err(DownloadFailure::Local)?;
        bytes += chunk.len() as u64;
    }

    file.flush().await.map_err(DownloadFailure::Local)?;
    file.sync_all().await.map_err(DownloadFailure::Local)?;
    Ok((hex::encode(hasher.finalize()), bytes))
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
