use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Instance types ───────────────────────────────────────────────────

/// Snapshot of a compute instance as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    /// Free-form lifecycle status ("running", "stopped", "starting", ...).
    pub status: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub image: ResourceRef,
    #[serde(default)]
    pub ssh_keys: Vec<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub region: ResourceRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `{id, name}` reference to an image, SSH key or region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
}

// ── Response envelopes ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceList {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceEnvelope {
    pub instance: Instance,
}

// ── Actions ──────────────────────────────────────────────────────────

/// Lifecycle action accepted by `POST /instances/{id}/actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceAction {
    Start,
    Stop,
    Restart,
    Reboot,
}

impl InstanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Reboot => "reboot",
        }
    }
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown instance action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for InstanceAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "reboot" => Ok(Self::Reboot),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActionRequest {
    pub action: InstanceAction,
}
