//! Typed Rust client for the Genesis Cloud compute API.
//!
//! Covers the subset the console needs: list instances, fetch one
//! instance and run a lifecycle action on it. Every failure is normalized
//! into [`Error`].

mod error;
mod token;
mod types;

pub use error::{Error, NETWORK_ERROR_MESSAGE, Result, UNEXPECTED_ERROR_MESSAGE};
pub use token::{TokenError, format_token, sanitize_input, validate_token};
pub use types::*;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::types::ActionRequest;

/// Direct provider endpoint.
pub const PROVIDER_URL: &str = "https://api.genesiscloud.com/compute/v1";

/// Same-origin relay endpoint used by browser builds during development.
pub const RELAY_URL: &str = "http://localhost:3001/api/genesis";

/// Where requests are sent. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Direct,
    Relay,
}

impl Target {
    /// Browser builds in development go through the relay; everything
    /// else talks to the provider directly.
    pub fn for_platform(web: bool, dev: bool) -> Self {
        if web && dev { Self::Relay } else { Self::Direct }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Direct => PROVIDER_URL,
            Self::Relay => RELAY_URL,
        }
    }
}

/// Client for the Genesis Cloud compute REST API.
///
/// Holds no credentials: the bearer token is supplied per call.
#[derive(Clone)]
pub struct GenesisClient {
    base_url: String,
    http: reqwest::Client,
}

impl GenesisClient {
    pub fn new(target: Target) -> Self {
        Self::with_base_url(target.base_url())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL extended by `segments`, each percent-encoded as exactly one
    /// path segment.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let invalid = |reason: &str| Error::Unexpected {
            details: format!("invalid base url {}: {reason}", self.base_url),
        };

        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        token: &str,
    ) -> Result<reqwest::RequestBuilder> {
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .header(AUTHORIZATION, format_token(token))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json"))
    }

    async fn send<T: DeserializeOwned>(
        req: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::from_response(endpoint, status, &body));
        }

        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| Error::Unexpected {
            details: format!("{endpoint}: {e}"),
        })
    }

    /// Request under `/instances/{id}`. Ids that would not stay a single
    /// path segment are rejected before anything is sent.
    fn instance_request(
        &self,
        method: reqwest::Method,
        instance_id: &str,
        rest: &[&str],
        token: &str,
    ) -> Result<reqwest::RequestBuilder> {
        if matches!(instance_id.trim(), "" | "." | "..") {
            return Err(Error::InvalidInstanceId(instance_id.to_string()));
        }

        let mut segments = vec!["instances", instance_id];
        segments.extend_from_slice(rest);
        self.request(method, &segments, token)
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn list_instances(&self, token: &str) -> Result<Vec<Instance>> {
        let result = match self.request(reqwest::Method::GET, &["instances"], token) {
            Ok(req) => Self::send::<InstanceList>(req, "list instances").await,
            Err(e) => Err(e),
        };

        match result {
            Ok(list) => Ok(list.instances),
            Err(e) => {
                tracing::error!(error = %e, status = ?e.status(), "error fetching instances");
                Err(e)
            }
        }
    }

    pub async fn get_instance(&self, token: &str, instance_id: &str) -> Result<Instance> {
        let result = match self.instance_request(reqwest::Method::GET, instance_id, &[], token) {
            Ok(req) => Self::send::<InstanceEnvelope>(req, "get instance").await,
            Err(e) => Err(e),
        };

        match result {
            Ok(envelope) => Ok(envelope.instance),
            Err(e) => {
                tracing::error!(instance_id, error = %e, status = ?e.status(), "error fetching instance");
                Err(e)
            }
        }
    }

    pub async fn perform_instance_action(
        &self,
        token: &str,
        instance_id: &str,
        action: InstanceAction,
    ) -> Result<Instance> {
        let result =
            match self.instance_request(reqwest::Method::POST, instance_id, &["actions"], token) {
                Ok(req) => {
                    let req = req.json(&ActionRequest { action });
                    Self::send::<InstanceEnvelope>(req, "instance action").await
                }
                Err(e) => Err(e),
            };

        match result {
            Ok(envelope) => Ok(envelope.instance),
            Err(e) => {
                tracing::error!(
                    instance_id,
                    %action,
                    error = %e,
                    status = ?e.status(),
                    "error performing instance action"
                );
                Err(e)
            }
        }
    }

    pub async fn start_instance(&self, token: &str, instance_id: &str) -> Result<Instance> {
        self.perform_instance_action(token, instance_id, InstanceAction::Start)
            .await
    }

    /// Returns `true` if the token can list instances.
    pub async fn test_connection(&self, token: &str) -> bool {
        self.list_instances(token).await.is_ok()
    }
}
