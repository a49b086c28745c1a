use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{KeyValueStore, Result, check_key};

/// All keys in a single JSON object file, like a browser's local storage.
///
/// Writes rewrite the whole file; the lock keeps read-modify-write cycles
/// from interleaving within one process.
pub struct LocalStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(entries)?).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        let _guard = self.lock.lock().await;

        Ok(self.load().await?.remove(key))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keys_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        let store = LocalStore::new(&path);

        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.remove("a").await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));

        let on_disk: BTreeMap<String, String> =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LocalStore::new(&path);
        assert!(matches!(store.get("a").await, Err(crate::Error::Json(_))));
    }
}
