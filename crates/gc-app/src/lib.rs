//! Console state and flows on top of the Genesis Cloud client.

pub mod config;
pub mod controller;
pub mod session;

pub use config::AppConfig;
pub use controller::Controller;
pub use session::Session;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] genesis_api::Error),

    #[error(transparent)]
    Store(#[from] gc_store::Error),

    #[error("No token available. Please enter your API token.")]
    NoToken,

    #[error("failed to encode instances: {0}")]
    Export(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<genesis_api::TokenError> for Error {
    fn from(e: genesis_api::TokenError) -> Self {
        Self::Api(e.into())
    }
}
