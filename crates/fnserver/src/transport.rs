//! JSON-over-HTTP transport for the function server.
//!
//! `POST /v1/run-function` takes a `RunFunctionRequest` and answers with a
//! `RunFunctionResponse`. `GET /healthz` lists the registered functions.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fnserver_core::proto::{RunFunctionRequest, RunFunctionResponse};
use fnserver_core::{Server, ServerError};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/v1/run-function", post(run_function))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Serve `server` on `listener` until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, server: Arc<Server>) -> std::io::Result<()> {
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn run_function(
    State(server): State<Arc<Server>>,
    payload: Result<Json<RunFunctionRequest>, JsonRejection>,
) -> Result<Json<RunFunctionResponse>, ApiError> {
    let Json(req) = payload?;
    server
        .run_function(&req)
        .await
        .map(Json)
        .map_err(ApiError::Server)
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    functions: Vec<&'a str>,
}

async fn healthz(State(server): State<Arc<Server>>) -> Response {
    let health = HealthResponse {
        status: "ok",
        functions: server.registry().names(),
    };
    Json(health).into_response()
}

/// Maps request failures onto an HTTP status and a JSON error body.
enum ApiError {
    /// The body is not a well-formed `RunFunctionRequest`.
    Body(JsonRejection),
    Server(ServerError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error = %rejection.body_text(), "Cannot decode request body");
        ApiError::Body(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Server(e) if e.is_decode() => StatusCode::BAD_REQUEST,
            ApiError::Server(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Body(rejection) => {
                format!("cannot decode request: {}", rejection.body_text())
            }
            ApiError::Server(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use fnserver_core::{from_fn, with_function};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(Arc::new(Server::new([
            with_function("greet", crate::functions::greet::Greet),
            with_function(
                "fails",
                from_fn(|_req, _res| Err("exploded".into())),
            ),
        ])))
    }

    async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/run-function")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn call(function_name: &str, input: Value) -> Value {
        json!({
            "observed": {"composite": {"resource": {"kind": "XGreeting"}}},
            "input": {
                "apiVersion": "server.fn.crossplane.io/v1alpha1",
                "kind": "ServerInput",
                "spec": {"functionName": function_name, "input": input}
            }
        })
    }

    #[tokio::test]
    async fn runs_registered_function() {
        let (status, body) = post_json(test_router(), call("greet", json!({"name": "Ada"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["context"], json!({"greeting": "hello Ada"}));
        assert_eq!(body["desired"]["composite"]["resource"]["kind"], "XGreeting");
    }

    #[tokio::test]
    async fn unknown_function_is_404() {
        let (status, body) = post_json(test_router(), call("unknown", json!({}))).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no function with name \"unknown\"");
    }

    #[tokio::test]
    async fn malformed_server_input_is_400() {
        let (status, body) = post_json(test_router(), json!({"input": {"spec": 1}})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("cannot decode input"));
    }

    #[tokio::test]
    async fn malformed_request_body_is_400_with_json_error() {
        let (status, body) = post_json(
            test_router(),
            json!({"observed": "nope", "input": {"spec": {"functionName": "greet"}}}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("cannot decode request: "), "{error}");
        assert!(error.contains("observed"), "{error}");
    }

    #[tokio::test]
    async fn non_json_body_is_400_with_json_error() {
        let resp = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/run-function")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("cannot decode request: "));
    }

    #[tokio::test]
    async fn failing_function_is_500() {
        let (status, body) = post_json(test_router(), call("fails", json!({}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "error while running server function \"fails\": exploded"
        );
    }

    #[tokio::test]
    async fn healthz_lists_functions() {
        let resp = test_router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "ok", "functions": ["fails", "greet"]}));
    }
}
