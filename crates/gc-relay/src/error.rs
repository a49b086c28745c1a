use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Authorization header is required")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Proxy server error")]
    Upstream(#[from] reqwest::Error),

    #[error("Proxy server error")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": self.to_string() }),
            ),
            RelayError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": self.to_string() }),
            ),
            RelayError::Upstream(e) => {
                tracing::error!(error = %e, "relay upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    serde_json::json!({ "error": self.to_string(), "details": e.to_string() }),
                )
            }
            RelayError::Internal(details) => {
                tracing::error!(%details, "relay internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": self.to_string(), "details": details }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
