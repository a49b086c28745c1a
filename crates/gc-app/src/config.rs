use std::env;
use std::path::PathBuf;

use gc_store::Platform;
use genesis_api::{GenesisClient, Target};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub platform: Platform,
    pub dev: bool,
    pub data_dir: PathBuf,
    /// Overrides the base URL picked from `platform`/`dev`.
    pub api_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            platform: env::var("GENESIS_PLATFORM")
                .unwrap_or_else(|_| "native".into())
                .parse()
                .expect("GENESIS_PLATFORM must be `native` or `web`"),
            dev: env::var("GENESIS_DEV")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            data_dir: env::var("GENESIS_DATA_DIR")
                .unwrap_or_else(|_| ".genesis".into())
                .into(),
            api_url: env::var("GENESIS_API_URL").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn target(&self) -> Target {
        Target::for_platform(self.platform.is_web(), self.dev)
    }

    pub fn client(&self) -> GenesisClient {
        match &self.api_url {
            Some(url) => GenesisClient::with_base_url(url.clone()),
            None => GenesisClient::new(self.target()),
        }
    }
}
