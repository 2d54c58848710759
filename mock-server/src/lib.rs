//! Fixture HTTP server for exercising API clients end to end.
//!
//! Every route answers with a fixed shape so tests can hit each stage of a
//! client call: a JSON success body, an echo of the request, an arbitrary
//! status, an empty body, a truncated body, a delayed answer and an
//! oversized JSON string.

use std::time::Duration;

use axum::{
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Body served by `/success` and `/slow/{ms}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Success {
    pub success: bool,
}

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Error payload attached to `/status/{code}` answers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub const TRUNCATED_BODY: &str = r#"{"success": tr"#;

/// Largest payload `/large/{bytes}` will produce.
pub const MAX_LARGE_BYTES: usize = 64 * 1024 * 1024;

pub fn app() -> Router {
    Router::new()
        .route("/success", get(success))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/empty", get(empty))
        .route("/truncated", get(truncated))
        .route("/slow/{ms}", get(slow))
        .route("/large/{bytes}", get(large))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn success() -> Json<Success> {
    Json(Success { success: true })
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(Echo {
        method: method.to_string(),
        body,
        content_type: header_value(header::CONTENT_TYPE),
        user_agent: header_value(header::USER_AGENT),
    })
}

async fn status(Path(code): Path<u16>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let error = status.canonical_reason().unwrap_or("unknown").to_string();
    (status, Json(ErrorBody { error })).into_response()
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn truncated() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        TRUNCATED_BODY,
    )
}

async fn slow(Path(ms): Path<u64>) -> Json<Success> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(Success { success: true })
}

/// A JSON string of `bytes` ASCII `x` characters.
async fn large(Path(bytes): Path<usize>) -> Response {
    if bytes > MAX_LARGE_BYTES {
        return StatusCode::BAD_REQUEST.into_response();
    }
    let mut body = String::with_capacity(bytes + 2);
    body.push('"');
    body.extend(std::iter::repeat('x').take(bytes));
    body.push('"');
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_to_json() {
        let json = serde_json::to_value(Success { success: true }).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }

    #[test]
    fn echo_omits_missing_headers() {
        let echo = Echo {
            method: "GET".to_string(),
            body: String::new(),
            content_type: None,
            user_agent: None,
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json, serde_json::json!({ "method": "GET", "body": "" }));
    }

    #[test]
    fn echo_deserializes_without_optional_fields() {
        let echo: Echo = serde_json::from_str(r#"{"method":"POST","body":"x"}"#).unwrap();
        assert_eq!(echo.method, "POST");
        assert!(echo.content_type.is_none());
    }

    #[test]
    fn truncated_body_is_not_json() {
        assert!(serde_json::from_str::<Success>(TRUNCATED_BODY).is_err());
    }
}
