use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::{KeyValueStore, Result, check_key};

/// One owner-readable file per key inside a directory.
///
/// Native builds keep the credential here.
pub struct SecureFileStore {
    dir: PathBuf,
}

impl SecureFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.dir.join(key))
    }

    /// Keys never start with `.`, so this cannot collide with a stored key.
    fn staging_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{key}.tmp"))
    }

    async fn create_dir(&self) -> std::io::Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&self.dir).await
    }

    /// Writes `value` to a fresh file that is owner-only from creation.
    async fn write_staged(staging: &Path, value: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(staging).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(staging).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl KeyValueStore for SecureFileStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key)?;
        let staging = self.staging_path(key);
        self.create_dir().await?;

        // Rename replaces any existing file along with its permissions.
        let written = match Self::write_staged(&staging, value).await {
            Ok(()) => tokio::fs::rename(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
