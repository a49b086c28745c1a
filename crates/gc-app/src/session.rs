use chrono::{DateTime, Utc};
use genesis_api::Instance;

/// Everything the console knows about the current user session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: String,
    pub instances: Vec<Instance>,
    /// Message of the last failed fetch, ready for display.
    pub error: Option<String>,
    pub last_fetched: Option<DateTime<Utc>>,
}

impl Session {
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Swap in a fresh copy of an instance. Returns `false` if no instance
    /// with that id is held.
    pub fn replace_instance(&mut self, updated: Instance) -> bool {
        match self.instances.iter_mut().find(|i| i.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }
}
