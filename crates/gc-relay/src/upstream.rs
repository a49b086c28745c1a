use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};

use crate::error::RelayError;
use crate::state::AppState;

/// Caller's `Authorization` header, copied through untouched.
pub fn authorization(headers: &HeaderMap) -> Result<String, RelayError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(str::to_owned)
        .ok_or(RelayError::Unauthorized)
}

/// Upstream base URL extended by `segments`, each percent-encoded as one
/// path segment.
pub fn upstream_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, RelayError> {
    let invalid = |reason: String| RelayError::Internal(format!("invalid upstream url {base}: {reason}"));

    let mut url = reqwest::Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base".into()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Forward one request to the provider and relay its status and body.
pub async fn forward(
    state: &AppState,
    method: reqwest::Method,
    segments: &[&str],
    authorization: &str,
    body: Option<Value>,
) -> Result<Response, RelayError> {
    let url = upstream_url(&state.config.upstream_url, segments)?;
    let path = url.path().to_string();

    let mut req = state
        .http
        .request(method, url)
        .header(AUTHORIZATION, authorization)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json");
    if let Some(body) = body {
        req = req.json(&body);
    }

    let resp = req.send().await?;
    let upstream_status = resp.status();
    let text = resp.text().await?;

    tracing::info!(%path, status = upstream_status.as_u16(), "provider responded");

    let status = StatusCode::from_u16(upstream_status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = relay_body(status, &text);

    Ok((status, Json(body)).into_response())
}

/// JSON bodies pass through verbatim. Anything else is wrapped: successes
/// as `raw_response`, failures as an `error`/`details` pair.
fn relay_body(status: StatusCode, text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }

    if status.is_success() {
        json!({ "raw_response": text })
    } else {
        json!({
            "error": format!(
                "Genesis Cloud API error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            ),
            "details": text,
        })
    }
}
