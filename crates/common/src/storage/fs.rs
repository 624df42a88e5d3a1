use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::provider::StringStorage;

const RECORD_EXTENSION: &str = "json";
/// Records hold private key material
#[cfg(unix)]
const RECORD_MODE: u32 = 0o600;

/// String storage keeping one file per key under a root directory
///
/// Keys are arbitrary strings, so file names are the hex SHA-256 of the key.
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never observes a partially written record. On unix, record files are
/// readable by their owner only.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum FsStorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsStorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        FsStorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl FsStorage {
    /// Open storage rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, FsStorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| FsStorageError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root
            .join(format!("{}.{}", hex::encode(digest), RECORD_EXTENSION))
    }
}

async fn write_record(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(RECORD_MODE);

    let mut file = options.open(path).await?;
    if let Err(e) = file.write_all(contents).await {
        let _ = tokio::fs::remove_file(path).await;
        return Err(e);
    }
    file.sync_all().await
}

#[async_trait]
impl StringStorage for FsStorage {
    type Error = FsStorageError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FsStorageError::io(&path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.tmp", Uuid::new_v4()));

        write_record(&tmp, value.as_bytes())
            .await
            .map_err(|e| FsStorageError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(FsStorageError::io(&path, e));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsStorageError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("grants");
        let storage = FsStorage::open(&root).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(storage.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_file_name_is_key_digest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).await.unwrap();
        let path = storage.path_for("0xAbC:0x12");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + 5);
        assert!(name.ends_with(".json"));
        assert_ne!(path, storage.path_for("0xabc:0x12"));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).await.unwrap();
        storage.set("k", "one".to_string()).await.unwrap();
        storage.set("k", "two".to_string()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(storage.get("k").await.unwrap(), Some("two".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_records_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).await.unwrap();
        storage.set("k", "secret".to_string()).await.unwrap();
        storage.set("k", "rotated".to_string()).await.unwrap();

        let mode = std::fs::metadata(storage.path_for("k"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
