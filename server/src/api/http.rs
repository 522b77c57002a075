//! HTTP transport (§6): `POST /mcp` with a `{tool_name, arguments}` JSON
//! body, plus a `GET /health` liveness probe.
//!
//! Grounded on the teacher's `api::server::ApiServer` — one `axum::Router`
//! built from route modules and served with `axum::serve`. TrendRadar has no
//! auth, rate limiting, or multi-tenant routing to layer on, so the router
//! collapses to the two endpoints §6 actually names.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::core::constants::MCP_HTTP_PATH;

use super::dispatch::{Dispatcher, ToolRequest, wrap_response};
use super::routes::health::health;

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(MCP_HTTP_PATH, post(call_tool))
        .with_state(Arc::new(dispatcher))
        .layer(TraceLayer::new_for_http())
}

async fn call_tool(State(dispatcher): State<Arc<Dispatcher>>, Json(request): Json<ToolRequest>) -> Json<serde_json::Value> {
    tracing::debug!(tool = %request.tool_name, "http tool call");
    let outcome = dispatcher.dispatch(&request.tool_name, request.arguments).await;
    Json(wrap_response(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::NullFetcher;
    use crate::core::storage::AppStorage;
    use crate::data::backend::StorageBackend;
    use crate::data::local::LocalStorageBackend;
    use crate::data::ttl_cache::TtlCache;
    use crate::domain::keywords::KeywordRules;
    use crate::domain::weight::WeightConfig;
    use crate::facade::Facade;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_router() -> (Router, tempfile::TempDir) {
        let (storage, tmp) = AppStorage::init_for_test();
        let storage = Arc::new(storage);
        let backend = Arc::new(StorageBackend::Local(Arc::new(LocalStorageBackend::new(storage.clone()))));
        let facade = Arc::new(Facade::new(
            backend,
            storage,
            Arc::new(TtlCache::new()),
            KeywordRules::default(),
            WeightConfig::default(),
            crate::domain::time::resolve_timezone(None),
            30,
            std::path::PathBuf::from("frequency_words.txt"),
        ));
        let dispatcher = Dispatcher::new(facade, Arc::new(NullFetcher));
        (router(dispatcher), tmp)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (app, _tmp) = make_router();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mcp_endpoint_wraps_a_tool_call() {
        let (app, _tmp) = make_router();
        let body = serde_json::json!({"tool_name": "resolve_date_range", "arguments": {"expression": "today"}});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn mcp_endpoint_reports_unknown_tool() {
        let (app, _tmp) = make_router();
        let body = serde_json::json!({"tool_name": "not_a_tool", "arguments": {}});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert_eq!(value["error"]["code"], serde_json::json!("INVALID_ARGUMENT"));
    }
}
