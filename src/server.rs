/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{ErrorBody, ErrorResponse, ProofError, ProofResult},
    metrics,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Maximum accepted request body
const MAX_BODY_BYTES: usize = 100 * 1024;

/// Build the main application router
/// Returns Router<()> because state is already provided
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(crate::api::routes())
        // Provide state - converts Router<AppContext> to Router<()>
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus scrape endpoint
async fn metrics_handler() -> String {
    metrics::render_metrics()
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: ErrorBody {
                code: "NOT_FOUND".to_string(),
                message: "Endpoint not found".to_string(),
            },
        }),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> ProofResult<()> {
    let addr = ctx.config.bind_address();

    info!("ENS proof service listening on {}", addr);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ProofError::Io(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ProofError::Io(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::identity::resolver::tests::StubResolver;
    use crate::identity::{NameResolver, UpstreamError};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const DEAD: &str = "0x000000000000000000000000000000000000dEaD";
    const ALICE: &str = "0x00000000000000000000000000000000000a11ce";

    fn app_with(stub: Option<Arc<StubResolver>>) -> Router {
        let upstream = stub.map(|s| {
            let upstream: Arc<dyn NameResolver> = s;
            upstream
        });
        build_router(AppContext::with_upstream(ServerConfig::default(), upstream))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app_with(None), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::get("/nope").body(Body::empty()).unwrap();
        let (status, body) = send(app_with(None), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app_with(None);
        let _ = send(
            app.clone(),
            post_json("/api/proof", json!({ "ensOrAddress": DEAD })),
        )
        .await;

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("proofs_generated_total"));
    }

    #[tokio::test]
    async fn test_proof_for_address() {
        let (status, body) = send(
            app_with(None),
            post_json("/api/proof", json!({ "ensOrAddress": DEAD })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "input": {
                    "ensOrAddress": DEAD,
                    "resolvedAddress": "0x000000000000000000000000000000000000dead",
                    "source": "address"
                },
                "proof": {
                    "proofHash": "0xcb2e22be9e6680345098bb96bae57fab9b12f5605e2360470cac9b1876b4eb19",
                    "score": 1,
                    "tags": ["usage:low", "farming-risk:high"]
                },
                "meta": { "deterministic": true, "version": "v1" }
            })
        );
    }

    #[tokio::test]
    async fn test_proof_respects_chain_id() {
        let (_, body) = send(
            app_with(None),
            post_json("/api/proof", json!({ "ensOrAddress": DEAD, "chainId": "10" })),
        )
        .await;

        assert_eq!(body["proof"]["score"], 43);
        assert_eq!(body["proof"]["tags"][1], "farming-risk:low");

        // Empty chain id falls back to the default
        let (_, body) = send(
            app_with(None),
            post_json("/api/proof", json!({ "ensOrAddress": DEAD, "chainId": "" })),
        )
        .await;
        assert_eq!(body["proof"]["score"], 1);
    }

    #[tokio::test]
    async fn test_proof_for_name() {
        let stub = Arc::new(StubResolver::default().with_answer("alice.eth", ALICE));
        let (status, body) = send(
            app_with(Some(stub)),
            post_json("/api/proof", json!({ "ensOrAddress": "Alice.ETH" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["input"]["ensOrAddress"], "Alice.ETH");
        assert_eq!(body["input"]["resolvedAddress"], ALICE);
        assert_eq!(body["input"]["source"], "ens");
    }

    #[tokio::test]
    async fn test_proof_errors() {
        let (status, body) = send(
            app_with(None),
            post_json("/api/proof", json!({ "ensOrAddress": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(body["error"]["message"], "ensOrAddress is required.");

        let (status, body) = send(app_with(None), post_json("/api/proof", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");

        let (status, body) = send(
            app_with(Some(Arc::new(StubResolver::default()))),
            post_json("/api/proof", json!({ "ensOrAddress": "nobody.eth" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "ENS_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_name_without_rpc_urls() {
        let (status, body) = send(
            app_with(None),
            post_json("/api/proof", json!({ "ensOrAddress": "alice.eth" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "RPC_URL_MISSING");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_reported() {
        let stub = Arc::new(
            StubResolver::default().with_failures(vec![UpstreamError::transport("connection reset")]),
        );
        let (status, body) = send(
            app_with(Some(stub)),
            post_json("/api/proof", json!({ "ensOrAddress": "alice.eth" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "ENS_RESOLVE_FAILED");
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_input() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/proof")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app_with(None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_batch_endpoint() {
        let stub = Arc::new(StubResolver::default().with_answer("alice.eth", ALICE));
        let (status, body) = send(
            app_with(Some(stub)),
            post_json(
                "/api/proof/batch",
                json!({ "inputs": [DEAD, "not a valid anything", "nonexistent.eth", "alice.eth"] }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"], json!({ "deterministic": true, "version": "v1" }));

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0]["input"], DEAD);
        assert_eq!(results[0]["score"], 1);
        assert_eq!(results[1]["error"]["code"], "INVALID_INPUT");
        assert_eq!(results[2]["error"]["code"], "ENS_NOT_FOUND");
        assert_eq!(results[3]["resolvedAddress"], ALICE);
    }

    #[tokio::test]
    async fn test_batch_input_validation() {
        let (status, body) = send(
            app_with(None),
            post_json("/api/proof/batch", json!({ "inputs": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");

        let (status, _) = send(app_with(None), post_json("/api/proof/batch", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app_with(None),
            post_json("/api/proof/batch", json!({ "inputs": "alice.eth" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let too_many: Vec<&str> = vec![DEAD; 51];
        let (status, body) = send(
            app_with(None),
            post_json("/api/proof/batch", json!({ "inputs": too_many })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "inputs must contain at most 50 items.");
    }
}
