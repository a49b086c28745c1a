pub mod health;
pub mod instances;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn relay_router(state: AppState) -> Router {
    let genesis = Router::new()
        .route("/instances", get(instances::list_instances))
        .route("/instances/{id}", get(instances::get_instance))
        .route("/instances/{id}/actions", post(instances::instance_action));

    Router::new()
        .nest("/api/genesis", genesis)
        .route("/health", get(health::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::body::Body;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, Request, StatusCode};
    use axum::response::IntoResponse;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    #[derive(Default)]
    struct Upstream {
        hits: AtomicUsize,
        last_auth: Mutex<Option<String>>,
        last_body: Mutex<Option<Value>>,
    }

    type Shared = Arc<Upstream>;

    fn record(upstream: &Upstream, headers: &HeaderMap, body: Option<Value>) {
        upstream.hits.fetch_add(1, Ordering::SeqCst);
        *upstream.last_auth.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        *upstream.last_body.lock().unwrap() = body;
    }

    async fn fake_list(State(up): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
        record(&up, &headers, None);
        if headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer good") {
            (StatusCode::OK, axum::Json(json!({"instances": []}))).into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({"message": "invalid token"})),
            )
                .into_response()
        }
    }

    async fn fake_show(
        State(up): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        record(&up, &headers, None);
        format!("instance {id} as text")
    }

    async fn fake_action(
        State(up): State<Shared>,
        Path(id): Path<String>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<Value>,
    ) -> impl IntoResponse {
        let requested = body["action"].clone();
        record(&up, &headers, Some(body));
        axum::Json(json!({"instance": {"id": id, "status": "starting", "requested": requested}}))
    }

    async fn spawn_upstream() -> (SocketAddr, Shared) {
        let shared = Shared::default();
        let app = Router::new()
            .route("/instances", get(fake_list))
            .route("/instances/{id}", get(fake_show))
            .route("/instances/{id}/actions", post(fake_action))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, shared)
    }

    fn relay_for(upstream_url: String) -> Router {
        let config = AppConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            upstream_url,
        };
        relay_router(AppState::new(config).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = relay_for("http://127.0.0.1:9".into());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "OK");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_action_without_auth_never_reaches_upstream() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genesis/instances/i-1/actions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"start"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Authorization header is required"})
        );
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_without_auth_is_rejected() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_copies_authorization_through() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"instances": []}));
        assert_eq!(
            upstream.last_auth.lock().unwrap().as_deref(),
            Some("Bearer good")
        );
    }

    #[tokio::test]
    async fn test_upstream_error_status_and_body_are_relayed() {
        let (addr, _upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances")
                    .header("authorization", "Bearer bad")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"message": "invalid token"}));
    }

    #[tokio::test]
    async fn test_non_json_success_is_wrapped() {
        let (addr, _upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances/i-9")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"raw_response": "instance i-9 as text"})
        );
    }

    #[tokio::test]
    async fn test_action_defaults_to_start() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genesis/instances/i-3/actions")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *upstream.last_body.lock().unwrap(),
            Some(json!({"action": "start"}))
        );
        let body = body_json(response).await;
        assert_eq!(body["instance"]["id"], "i-3");
    }

    #[tokio::test]
    async fn test_action_passes_requested_action() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genesis/instances/i-3/actions")
                    .header("authorization", "Bearer good")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"stop"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *upstream.last_body.lock().unwrap(),
            Some(json!({"action": "stop"}))
        );
    }

    #[tokio::test]
    async fn test_action_keeps_non_string_action() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genesis/instances/i-3/actions")
                    .header("authorization", "Bearer good")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":5}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *upstream.last_body.lock().unwrap(),
            Some(json!({"action": 5}))
        );
    }

    #[tokio::test]
    async fn test_malformed_action_body_never_reaches_upstream() {
        let (addr, upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/genesis/instances/i-3/actions")
                    .header("authorization", "Bearer good")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Request body must be JSON"})
        );
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dot_segment_id_never_reaches_upstream() {
        let (addr, upstream) = spawn_upstream().await;

        for uri in [
            "/api/genesis/instances/%2E%2E/actions",
            "/api/genesis/instances/%2e",
        ] {
            let method = if uri.ends_with("/actions") { "POST" } else { "GET" };
            let response = relay_for(format!("http://{addr}"))
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .header("authorization", "Bearer good")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                body_json(response).await,
                json!({"error": "Instance ID is invalid"})
            );
        }
        assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_instance_id_is_forwarded_as_one_segment() {
        let (addr, _upstream) = spawn_upstream().await;
        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances/i%209%25")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"raw_response": "instance i 9% as text"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let app = relay_for(format!("http://{addr}"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/genesis/instances")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Proxy server error");
        assert!(body["details"].is_string());
    }
}
