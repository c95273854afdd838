//! Axum HTTP server for the command surface.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Json;
use axum::routing::{get, post};
use sluice_rpc::errors::{FORBIDDEN_ORIGIN, PARSE_ERROR};
use sluice_rpc::{MethodRegistry, RpcContext, RpcRequest, RpcResponse};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::health::{self, HealthResponse};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// RPC method registry.
    pub registry: Arc<MethodRegistry>,
    /// Context handed to every handler.
    pub ctx: RpcContext,
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    addr: &str,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<std::io::Result<()>>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    });
    Ok((local_addr, handle))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.ctx.start_time,
        state.registry.methods().len(),
        state.ctx.rules.last_report(),
    ))
}

/// POST /rpc
///
/// Browsers attach `Origin` to cross-site posts; only pages served from this
/// machine may drive the agent. The body must be `application/json`.
async fn rpc_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RpcRequest>, JsonRejection>,
) -> (StatusCode, Json<RpcResponse>) {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let origin = origin.to_str().unwrap_or_default();
        if !is_local_origin(origin) {
            warn!(origin, "rejected cross-origin rpc request");
            return (
                StatusCode::FORBIDDEN,
                Json(RpcResponse::error(
                    "",
                    FORBIDDEN_ORIGIN,
                    format!("Origin not allowed: {origin}"),
                )),
            );
        }
    }
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "malformed rpc request");
            return (
                rejection.status(),
                Json(RpcResponse::error(
                    "",
                    PARSE_ERROR,
                    format!("Invalid request: {}", rejection.body_text()),
                )),
            );
        }
    };
    let response = state.registry.dispatch(request, &state.ctx).await;
    (StatusCode::OK, Json(response))
}

/// Whether `origin` is a loopback page (`localhost`, `127.0.0.1`, `[::1]`).
fn is_local_origin(origin: &str) -> bool {
    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let host = match authority.strip_prefix('[') {
        Some(v6) => v6.split(']').next().unwrap_or_default(),
        None => authority.split(':').next().unwrap_or_default(),
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use sluice_history::ComposerHistory;
    use sluice_rpc::{ChangeTracker, register_all};
    use sluice_rules::{Collaborators, NoRemote, RulesService, Stores};
    use sluice_settings::RulesSettings;
    use sluice_store::MemoryStorage;
    use tower::ServiceExt;

    use crate::hosts::FileHostsWriter;
    use crate::interpreter::SnapshotInterpreter;

    fn make_state(dir: &std::path::Path) -> AppState {
        let properties = Arc::new(MemoryStorage::new());
        let rules = Arc::new(RulesService::new(
            RulesSettings::default(),
            dir.to_path_buf(),
            Stores {
                rules: Arc::new(MemoryStorage::new()),
                values: Arc::new(MemoryStorage::new()),
                properties: properties.clone(),
            },
            Collaborators {
                fetcher: Arc::new(NoRemote),
                interpreter: Arc::new(SnapshotInterpreter::new(Arc::new(MemoryStorage::new()))),
                hosts: Arc::new(FileHostsWriter::new(dir.join("hosts"))),
            },
        ));
        let mut registry = MethodRegistry::new();
        register_all(&mut registry);
        AppState {
            registry: Arc::new(registry),
            ctx: RpcContext {
                rules,
                history: ComposerHistory::load(properties, Duration::from_millis(10)),
                changes: Arc::new(ChangeTracker::new()),
                start_time: Instant::now(),
            },
        }
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn rpc(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["methods"], 36);
        assert!(parsed["last_composition"].is_null());
    }

    #[tokio::test]
    async fn rpc_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app
            .oneshot(rpc(r#"{"id":"1","method":"system.ping"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["id"], "1");
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["result"]["pong"], true);
    }

    #[tokio::test]
    async fn rpc_round_trip_through_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let add = json!({"id": "a", "method": "rules.add", "params": {"name": "dev", "value": "x"}});
        let resp = app.clone().oneshot(rpc(&add.to_string())).await.unwrap();
        assert_eq!(body_json(resp).await["result"]["changed"], true);

        let get = json!({"id": "b", "method": "rules.get", "params": {"name": "dev"}});
        let resp = app.oneshot(rpc(&get.to_string())).await.unwrap();
        assert_eq!(body_json(resp).await["result"]["value"], "x");
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app.oneshot(rpc("{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"]["code"], PARSE_ERROR);
    }

    fn hosts_text(dir: &std::path::Path) -> String {
        std::fs::read_to_string(dir.join("hosts")).unwrap_or_default()
    }

    fn set_hosts_request(origin: Option<&str>, content_type: &str) -> Request<Body> {
        let body = json!({
            "id": "h",
            "method": "rules.setSysHosts",
            "params": {"hosts": "6.6.6.6 bank.test"}
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", content_type);
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn cross_origin_post_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app
            .oneshot(set_hosts_request(Some("https://evil.test"), "text/plain"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(resp.headers().get("access-control-allow-origin").is_none());
        let parsed = body_json(resp).await;
        assert_eq!(parsed["error"]["code"], FORBIDDEN_ORIGIN);
        assert_eq!(hosts_text(dir.path()), "");
    }

    #[tokio::test]
    async fn cross_origin_json_post_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app
            .oneshot(set_hosts_request(
                Some("http://localhost.evil.test"),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(hosts_text(dir.path()), "");
    }

    #[tokio::test]
    async fn non_json_content_type_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app
            .oneshot(set_hosts_request(None, "text/plain"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body_json(resp).await["error"]["code"], PARSE_ERROR);
        assert_eq!(hosts_text(dir.path()), "");
    }

    #[tokio::test]
    async fn local_origin_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let resp = app
            .oneshot(set_hosts_request(
                Some("http://127.0.0.1:8899"),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["success"], true);
        assert!(hosts_text(dir.path()).contains("6.6.6.6 bank.test"));
    }

    #[test]
    fn local_origins() {
        assert!(is_local_origin("http://localhost"));
        assert!(is_local_origin("http://localhost:3000"));
        assert!(is_local_origin("https://127.0.0.1:8899"));
        assert!(is_local_origin("http://[::1]:8899"));
        assert!(!is_local_origin("null"));
        assert!(!is_local_origin("https://evil.test"));
        assert!(!is_local_origin("http://localhost.evil.test"));
        assert!(!is_local_origin("http://127.0.0.1@evil.test"));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(make_state(dir.path()));
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serve_binds_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let (addr, handle) = serve("127.0.0.1:0", router(make_state(dir.path())), async {
            let _ = rx.await;
        })
        .await
        .unwrap();
        assert_ne!(addr.port(), 0);
        let _ = tx.send(());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
