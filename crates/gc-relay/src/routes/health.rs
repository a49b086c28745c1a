use axum::Json;
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Genesis Cloud relay is running",
    }))
}
