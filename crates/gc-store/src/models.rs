use std::sync::Arc;

use chrono::{DateTime, Utc};
use genesis_api::Instance;
use serde::{Deserialize, Serialize};

use crate::{Error, KeyValueStore, Result};

pub const TOKEN_KEY: &str = "genesis_cloud_token";
pub const APP_STATE_KEY: &str = "genesis_cloud_app_state";

// ── Token ───────────────────────────────────────────────────────────

/// The saved bearer token.
///
/// Only `set_token` reports failure; reads and removals log and degrade,
/// since the user can always enter the token again.
#[derive(Clone)]
pub struct TokenStorage {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token).await.map_err(|e| {
            tracing::error!(error = %e, "error storing token");
            Error::TokenNotStored(Box::new(e))
        })
    }

    pub async fn get_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "error retrieving token");
                None
            }
        }
    }

    pub async fn remove_token(&self) {
        if let Err(e) = self.store.remove(TOKEN_KEY).await {
            tracing::error!(error = %e, "error removing token");
        }
    }
}

// ── Cached state ────────────────────────────────────────────────────

/// Last successfully fetched instance list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedState {
    pub instances: Vec<Instance>,
    pub last_fetched: DateTime<Utc>,
}

impl CachedState {
    pub fn now(instances: Vec<Instance>) -> Self {
        Self {
            instances,
            last_fetched: Utc::now(),
        }
    }
}

/// Cached instance list. Every operation logs and degrades on failure.
#[derive(Clone)]
pub struct AppStateStorage {
    store: Arc<dyn KeyValueStore>,
}

impl AppStateStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn set_app_state(&self, state: &CachedState) {
        let result = match serde_json::to_string(state) {
            Ok(json) => self.store.set(APP_STATE_KEY, &json).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "error storing app state");
        }
    }

    pub async fn get_app_state(&self) -> Option<CachedState> {
        let json = match self.store.get(APP_STATE_KEY).await {
            Ok(json) => json?,
            Err(e) => {
                tracing::error!(error = %e, "error retrieving app state");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::error!(error = %e, "error decoding app state");
                None
            }
        }
    }

    pub async fn remove_app_state(&self) {
        if let Err(e) = self.store.remove(APP_STATE_KEY).await {
            tracing::error!(error = %e, "error removing app state");
        }
    }
}
