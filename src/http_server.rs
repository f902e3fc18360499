//! HTTP server implementation using Axum.

use crate::result::ExecutionResult;
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server on the given port with the provided state.
pub async fn run_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await
}

async fn health() -> &'static str {
    "OK"
}

/// Always 200: execution failures are part of the result body.
async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Json<ExecutionResult> {
    info!("POST /execute - session: {:?}", req.session_id);
    let result = state
        .executor
        .execute(&req.code, req.session_id.as_deref())
        .await;
    info!("POST /execute - status: {:?}", result.status);
    Json(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::executor::Executor;
    use crate::testing::{FakeManager, Script};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(manager: Arc<FakeManager>, sessions: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.sandbox.sessions_root = sessions.to_path_buf();
        router(AppState::new(Executor::new(config, manager)))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let sessions = tempfile::tempdir().unwrap();
        let app = app(Arc::new(FakeManager::new(Script::exits(0))), sessions.path());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn execute_returns_result_json() {
        let sessions = tempfile::tempdir().unwrap();
        let manager = Arc::new(FakeManager::new(
            Script::exits(0).stdout(br#"[{"type":"text","data":"hello\n"}]"#),
        ));
        let app = app(manager.clone(), sessions.path());

        let request = Request::post("/execute")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"print('hello')","session_id":"web"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "status": "success",
                "content": [{"type": "text", "text": "hello"}]
            })
        );
        assert!(sessions.path().join("web").is_dir());
        assert_eq!(manager.spawn_count(), 1);
    }

    #[tokio::test]
    async fn validation_failure_is_still_200() {
        let sessions = tempfile::tempdir().unwrap();
        let manager = Arc::new(FakeManager::new(Script::exits(0)));
        let app = app(manager.clone(), sessions.path());

        let request = Request::post("/execute")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code":"   "}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "validation_failure");
        assert_eq!(manager.spawn_count(), 0);
    }
}
