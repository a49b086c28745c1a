use std::env;
use std::net::SocketAddr;

/// Direct provider endpoint the relay forwards to by default.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.genesiscloud.com/compute/v1";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub upstream_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3001".into())
                .parse()
                .expect("LISTEN_ADDR must be a valid socket address"),
            upstream_url: env::var("GENESIS_API_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.into())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}
