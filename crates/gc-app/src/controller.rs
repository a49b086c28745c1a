use std::sync::Arc;

use chrono::Utc;
use gc_store::{AppStateStorage, CachedState, KeyValueStore, TokenStorage};
use genesis_api::{GenesisClient, Instance, InstanceAction, sanitize_input, validate_token};

use crate::config::AppConfig;
use crate::session::Session;
use crate::{Error, Result};

/// Owns the session and runs every user-initiated flow against it.
pub struct Controller {
    session: Session,
    client: GenesisClient,
    tokens: TokenStorage,
    cache: AppStateStorage,
}

impl Controller {
    pub fn new(client: GenesisClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            session: Session::default(),
            client,
            tokens: TokenStorage::new(store.clone()),
            cache: AppStateStorage::new(store),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let store = gc_store::open_store(config.platform, &config.data_dir);
        Self::new(config.client(), store)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Restore the saved token and cached instances. Missing or unreadable
    /// data leaves the session empty.
    pub async fn load_saved_data(&mut self) {
        if let Some(token) = self.tokens.get_token().await {
            self.session.token = token;
        }

        if let Some(cached) = self.cache.get_app_state().await {
            tracing::debug!(count = cached.instances.len(), "restored cached instances");
            self.session.instances = cached.instances;
            self.session.last_fetched = Some(cached.last_fetched);
        }
    }

    /// Validate `raw`, fetch instances with it and persist both on success.
    ///
    /// On failure the session keeps the error message and drops its
    /// instance list.
    pub async fn submit_token(&mut self, raw: &str) -> Result<&[Instance]> {
        let token = sanitize_input(raw);
        self.session.token = token.clone();
        self.session.error = None;

        match self.fetch_and_persist(&token).await {
            Ok(()) => Ok(&self.session.instances),
            Err(e) => {
                self.session.error = Some(e.to_string());
                self.session.instances.clear();
                Err(e)
            }
        }
    }

    async fn fetch_and_persist(&mut self, token: &str) -> Result<()> {
        validate_token(token)?;

        let instances = self.client.list_instances(token).await?;
        tracing::info!(count = instances.len(), "fetched instances");

        self.tokens.set_token(token).await?;

        let cached = CachedState::now(instances);
        self.cache.set_app_state(&cached).await;

        self.session.instances = cached.instances;
        self.session.last_fetched = Some(cached.last_fetched);
        Ok(())
    }

    /// Re-run the fetch with the token already in the session.
    pub async fn refresh(&mut self) -> Result<&[Instance]> {
        let token = self.require_token()?.to_string();
        self.submit_token(&token).await
    }

    pub async fn show_instance(&self, instance_id: &str) -> Result<Instance> {
        let token = self.require_token()?;
        Ok(self.client.get_instance(token, instance_id).await?)
    }

    /// Run `action` on an instance and replace the local copy with the
    /// provider's answer.
    pub async fn perform_action(
        &mut self,
        instance_id: &str,
        action: InstanceAction,
    ) -> Result<Instance> {
        let token = self.require_token()?;
        let updated = self
            .client
            .perform_instance_action(token, instance_id, action)
            .await?;

        if !self.session.replace_instance(updated.clone()) {
            tracing::debug!(instance_id, "instance not in local list");
        }

        let cached = CachedState {
            instances: self.session.instances.clone(),
            last_fetched: Utc::now(),
        };
        self.cache.set_app_state(&cached).await;
        self.session.last_fetched = Some(cached.last_fetched);

        tracing::info!(instance_id, %action, status = %updated.status, "instance action accepted");
        Ok(updated)
    }

    pub async fn start_instance(&mut self, instance_id: &str) -> Result<Instance> {
        self.perform_action(instance_id, InstanceAction::Start).await
    }

    /// Forget the token and everything cached with it.
    pub async fn clear(&mut self) {
        self.session = Session::default();
        self.tokens.remove_token().await;
        self.cache.remove_app_state().await;
    }

    /// Pretty-printed JSON of the current instance list.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.session.instances)?)
    }

    fn require_token(&self) -> Result<&str> {
        if self.session.has_token() {
            Ok(&self.session.token)
        } else {
            Err(Error::NoToken)
        }
    }
}
