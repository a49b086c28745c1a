use reqwest::StatusCode;

use crate::token::TokenError;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your internet connection.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Every failure the client can report.
///
/// Each variant renders a message fit for direct display and exposes the
/// `status`/`details` pair callers use to tell failures apart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally; no request was made.
    #[error("{0}")]
    InvalidToken(#[from] TokenError),

    /// Rejected locally; the id cannot name a single instance.
    #[error("Instance ID is invalid")]
    InvalidInstanceId(String),

    /// The request never reached the provider.
    #[error("Network error. Please check your internet connection.")]
    Transport(#[source] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("{message}")]
    Provider {
        endpoint: &'static str,
        status: StatusCode,
        message: String,
        details: Option<String>,
    },

    #[error("An unexpected error occurred")]
    Unexpected { details: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status of the failure. `Some(0)` marks a transport failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(_) => Some(0),
            Self::Provider { status, .. } => Some(status.as_u16()),
            Self::InvalidToken(_) | Self::InvalidInstanceId(_) | Self::Unexpected { .. } => None,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Provider { details, .. } => details.as_deref(),
            Self::Unexpected { details } => Some(details),
            Self::InvalidInstanceId(id) => Some(id),
            Self::InvalidToken(_) | Self::Transport(_) => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Build a provider error from a failed response's status and raw body.
    ///
    /// The body's `message` field wins, then `error`, then a synthesized
    /// `HTTP <code>: <reason>` line. A body that is not JSON is ignored.
    pub(crate) fn from_response(endpoint: &'static str, status: StatusCode, body: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or_default();

        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| field_text(&value, "message").or_else(|| field_text(&value, "error")))
            .unwrap_or_else(|| format!("HTTP {}: {reason}", status.as_u16()));

        Self::Provider {
            endpoint,
            status,
            message,
            details: Some(reason.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            Self::Transport(e)
        } else {
            Self::Unexpected {
                details: e.to_string(),
            }
        }
    }
}

/// Text of a non-empty, non-null field. Non-string values use their JSON form.
fn field_text(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key)? {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_prefers_message_field() {
        let err = Error::from_response(
            "list instances",
            StatusCode::UNAUTHORIZED,
            r#"{"message":"invalid token","error":"ignored"}"#,
        );
        assert_eq!(err.message(), "invalid token");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.details(), Some("Unauthorized"));
    }

    #[test]
    fn provider_message_falls_back_to_error_field() {
        let err = Error::from_response(
            "get instance",
            StatusCode::NOT_FOUND,
            r#"{"error":"instance not found"}"#,
        );
        assert_eq!(err.message(), "instance not found");
    }

    #[test]
    fn provider_message_synthesized_for_unparseable_body() {
        let err = Error::from_response(
            "list instances",
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>oops</html>",
        );
        assert_eq!(err.message(), "HTTP 500: Internal Server Error");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn provider_message_synthesized_for_empty_fields() {
        let err = Error::from_response(
            "list instances",
            StatusCode::FORBIDDEN,
            r#"{"message":"","error":null}"#,
        );
        assert_eq!(err.message(), "HTTP 403: Forbidden");
    }

    #[test]
    fn invalid_token_carries_no_status() {
        let err = Error::from(TokenError::TooShort);
        assert_eq!(err.message(), "Token appears to be too short");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn unexpected_keeps_details() {
        let err = Error::Unexpected {
            details: "expected value at line 1".into(),
        };
        assert_eq!(err.message(), UNEXPECTED_ERROR_MESSAGE);
        assert_eq!(err.details(), Some("expected value at line 1"));
        assert_eq!(err.status(), None);
    }
}
