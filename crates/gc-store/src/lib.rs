//! Local persistence for the console: a small key/value capability with
//! two interchangeable backends, plus typed helpers for the saved token
//! and the cached instance list.

pub mod local;
pub mod models;
pub mod secure;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

pub use models::{APP_STATE_KEY, AppStateStorage, CachedState, TOKEN_KEY, TokenStorage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Failed to store token securely")]
    TokenNotStored(#[source] Box<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Deployment target the store is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Native,
    Web,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Web => "web",
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "native" => Ok(Self::Native),
            "web" => Ok(Self::Web),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// String key/value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// `None` if the key has never been set or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Open the backend for `platform`, rooted at `dir`.
pub fn open_store(platform: Platform, dir: impl AsRef<Path>) -> Arc<dyn KeyValueStore> {
    let dir = dir.as_ref();
    tracing::debug!(%platform, dir = %dir.display(), "opening key/value store");

    match platform {
        Platform::Native => Arc::new(secure::SecureFileStore::new(dir)),
        Platform::Web => Arc::new(local::LocalStore::new(dir.join("local-storage.json"))),
    }
}

/// Keys become file names, so only a conservative character set is allowed.
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}
