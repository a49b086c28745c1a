use crate::config::AppConfig;

const USER_AGENT: &str = concat!("genesis-cloud-relay/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { config, http })
    }
}
