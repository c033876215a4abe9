use super::*;
use async_trait::async_trait;
use bytes::Bytes;
use cronkeep_protocols::{stream_from_bytes, FileInfo};
use tempfile::TempDir;

use crate::memory::MemoryStorage;

const REMOTE: &str = "cronos_backups/cron_jobs.db";

fn setup() -> (TempDir, PathBuf, Arc<MemoryStorage>, BackupCoordinator) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cron_jobs.db");
    let storage = Arc::new(MemoryStorage::new());
    let coordinator = BackupCoordinator::new(storage.clone());
    (dir, db, storage, coordinator)
}

/// Storage whose downloads break after the first chunk.
struct BrokenDownloadStorage;

#[async_trait]
impl Storage for BrokenDownloadStorage {
    async fn list_files(&self) -> Result<Vec<FileInfo>, StorageError> {
        Ok(Vec::new())
    }

    async fn download_file(&self, _name: &str) -> Result<ByteStream, StorageError> {
        let chunks: Vec<Result<Bytes, StorageError>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::Download("connection reset".to_string())),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn upload_file(&self, name: &str, _data: ByteStream) -> Result<FileInfo, StorageError> {
        Err(StorageError::Upload(name.to_string()))
    }

    async fn delete_file(&self, _name: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn rename_file(&self, _old: &str, _new: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[test]
fn test_checksum_marker_path() {
    assert_eq!(
        checksum_marker_path(Path::new("/var/lib/cronkeep/cron_jobs.db")),
        PathBuf::from("/var/lib/cronkeep/.last_checksum")
    );
    assert_eq!(
        checksum_marker_path(Path::new("cron_jobs.db")),
        PathBuf::from(".last_checksum")
    );
}

#[test]
fn test_temp_path() {
    assert_eq!(
        temp_path(Path::new("/data/cron_jobs.db")),
        PathBuf::from("/data/cron_jobs.db.tmp")
    );
}

#[tokio::test]
async fn test_file_checksum() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("f");
    std::fs::write(&path, b"abc").unwrap();

    assert_eq!(
        file_checksum(&path).await.unwrap(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[tokio::test]
async fn test_backup_skips_unchanged_content() {
    let (_dir, db, storage, coordinator) = setup();
    std::fs::write(&db, b"version one").unwrap();

    let first = coordinator.backup(&db, REMOTE).await.unwrap();
    assert!(first.uploaded());
    assert_eq!(storage.upload_count(), 1);
    assert_eq!(
        std::fs::read_to_string(checksum_marker_path(&db)).unwrap(),
        first.checksum()
    );

    let second = coordinator.backup(&db, REMOTE).await.unwrap();
    assert_eq!(
        second,
        BackupOutcome::Skipped {
            checksum: first.checksum().to_string()
        }
    );
    assert_eq!(storage.upload_count(), 1);

    std::fs::write(&db, b"version two").unwrap();
    let third = coordinator.backup(&db, REMOTE).await.unwrap();
    assert!(third.uploaded());
    assert_ne!(third.checksum(), first.checksum());
    assert_eq!(storage.upload_count(), 2);
    assert_eq!(
        std::fs::read_to_string(checksum_marker_path(&db)).unwrap(),
        third.checksum()
    );
    assert_eq!(storage.get(REMOTE).await.unwrap(), Bytes::from_static(b"version two"));
}

#[tokio::test]
async fn test_backup_missing_local_file() {
    let (_dir, db, storage, coordinator) = setup();
    let err = coordinator.backup(&db, REMOTE).await.unwrap_err();
    assert!(matches!(err, BackupError::Io(_)));
    assert_eq!(storage.upload_count(), 0);
}

#[tokio::test]
async fn test_failed_upload_leaves_marker() {
    let (_dir, db, storage, coordinator) = setup();
    std::fs::write(&db, b"one").unwrap();
    let first = coordinator.backup(&db, REMOTE).await.unwrap();

    std::fs::write(&db, b"two").unwrap();
    storage.set_fail_uploads(true);
    let err = coordinator.backup(&db, REMOTE).await.unwrap_err();
    assert!(matches!(err, BackupError::Storage(_)));
    assert_eq!(
        std::fs::read_to_string(checksum_marker_path(&db)).unwrap(),
        first.checksum()
    );

    // The next attempt retries the upload.
    storage.set_fail_uploads(false);
    assert!(coordinator.backup(&db, REMOTE).await.unwrap().uploaded());
}

#[tokio::test]
async fn test_restore_without_remote_starts_fresh() {
    let (_dir, db, _storage, coordinator) = setup();
    std::fs::write(&db, b"local state").unwrap();

    let outcome = coordinator.restore(&db, REMOTE).await.unwrap();
    assert_eq!(outcome, RestoreOutcome::StartedFresh);
    assert_eq!(std::fs::read(&db).unwrap(), b"local state");
    assert!(!checksum_marker_path(&db).exists());
}

#[tokio::test]
async fn test_restore_replaces_local_file() {
    let (_dir, db, storage, coordinator) = setup();
    std::fs::write(&db, b"stale local").unwrap();
    storage.put(REMOTE, &b"remote copy"[..]).await;

    let outcome = coordinator.restore(&db, REMOTE).await.unwrap();
    let expected = file_checksum(&db).await.unwrap();
    assert_eq!(
        outcome,
        RestoreOutcome::Restored {
            checksum: expected.clone(),
            bytes: 11
        }
    );
    assert_eq!(std::fs::read(&db).unwrap(), b"remote copy");
    assert!(!temp_path(&db).exists());
    assert_eq!(
        std::fs::read_to_string(checksum_marker_path(&db)).unwrap(),
        expected
    );

    // Restored content is already backed up.
    assert!(!coordinator.backup(&db, REMOTE).await.unwrap().uploaded());
}

#[tokio::test]
async fn test_restore_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested").join("cron_jobs.db");
    let storage = Arc::new(MemoryStorage::new());
    storage.put(REMOTE, &b"remote"[..]).await;

    let coordinator = BackupCoordinator::new(storage);
    let outcome = coordinator.restore(&db, REMOTE).await.unwrap();
    assert!(matches!(outcome, RestoreOutcome::Restored { bytes: 6, .. }));
    assert_eq!(std::fs::read(&db).unwrap(), b"remote");
}

#[tokio::test]
async fn test_restore_mid_stream_failure_keeps_local() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cron_jobs.db");
    std::fs::write(&db, b"intact").unwrap();

    let coordinator = BackupCoordinator::new(Arc::new(BrokenDownloadStorage));
    let outcome = coordinator.restore(&db, REMOTE).await.unwrap();

    assert_eq!(outcome, RestoreOutcome::StartedFresh);
    assert_eq!(std::fs::read(&db).unwrap(), b"intact");
    assert!(!temp_path(&db).exists());
    assert!(!checksum_marker_path(&db).exists());
}

#[tokio::test]
async fn test_backup_upload_streams_whole_file() {
    let (_dir, db, storage, coordinator) = setup();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&db, &content).unwrap();

    coordinator.backup(&db, REMOTE).await.unwrap();
    assert_eq!(storage.get(REMOTE).await.unwrap(), Bytes::from(content));

    let stream = stream_from_bytes(Bytes::from_static(b"x"));
    assert!(coordinator.storage().upload_file("other", stream).await.is_ok());
}
