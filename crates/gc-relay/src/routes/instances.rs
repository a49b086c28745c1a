use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::{Value, json};

use crate::error::RelayError;
use crate::state::AppState;
use crate::upstream::{authorization, forward};

const DEFAULT_ACTION: &str = "start";

fn check_instance_id(id: &str) -> Result<&str, RelayError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RelayError::BadRequest("Instance ID is required".into()));
    }
    if matches!(id, "." | "..") || id.contains(['/', '?', '#']) {
        return Err(RelayError::BadRequest("Instance ID is invalid".into()));
    }
    Ok(id)
}

/// `action` from the request body. An empty body, a missing field or a
/// falsy value (`null`, `false`, `0`, `""`) means `start`; anything else
/// is forwarded untouched for the provider to judge.
fn requested_action(body: &[u8]) -> Result<Value, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::from(DEFAULT_ACTION));
    }

    let body: Value = serde_json::from_slice(body)
        .map_err(|_| RelayError::BadRequest("Request body must be JSON".into()))?;

    let action = match body.get("action") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(other) => Some(other.clone()),
    };
    Ok(action.unwrap_or_else(|| Value::from(DEFAULT_ACTION)))
}

pub async fn list_instances(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let auth = authorization(&headers)?;

    tracing::info!("relaying instance list");
    forward(&state, reqwest::Method::GET, &["instances"], &auth, None).await
}

pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let auth = authorization(&headers)?;
    let id = check_instance_id(&id)?;

    tracing::info!(instance_id = id, "relaying instance fetch");
    forward(&state, reqwest::Method::GET, &["instances", id], &auth, None).await
}

pub async fn instance_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    let auth = authorization(&headers)?;
    let id = check_instance_id(&id)?;
    let action = requested_action(&body)?;

    tracing::info!(instance_id = id, %action, "relaying instance action");
    forward(
        &state,
        reqwest::Method::POST,
        &["instances", id, "actions"],
        &auth,
        Some(json!({ "action": action })),
    )
    .await
}
