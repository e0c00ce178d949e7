//! Proxy route — forwards documented requests to their original host
//! so the proxy-addressed OpenAPI document stays runnable.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/proxy", any(forward))
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    target: Option<String>,
}

/// Headers never forwarded upstream; reqwest computes its own.
const STRIPPED_HEADERS: &[&str] = &["host", "content-length", "accept-encoding", "connection"];

async fn forward(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
    method: Method,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response {
    let Some(target) = query.target.filter(|t| t.starts_with("http")) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing or invalid target URL" })),
        )
            .into_response();
    };
    let Ok(target_url) = url::Url::parse(&target) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing or invalid target URL" })),
        )
            .into_response();
    };
    let target_host = target_url.host_str().unwrap_or_default().to_string();

    let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let is_get = method == reqwest::Method::GET;

    let mut request = state.http.request(method, target.clone());
    for (name, value) in headers.iter() {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            request = request.header(name.as_str(), value);
        }
    }
    if !is_get {
        // The upstream sees a same-origin request.
        request = request
            .header("origin", format!("https://{}", target_host))
            .header("referer", format!("https://{}/", target_host))
            .body(body.to_vec());
    }

    match request.send().await {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = upstream
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
            let bytes = upstream.bytes().await.unwrap_or_default();

            let mut response = (status, bytes.to_vec()).into_response();
            if let Some(content_type) = content_type {
                response.headers_mut().insert(header::CONTENT_TYPE, content_type);
            }
            response.headers_mut().insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
            response
        }
        Err(e) => {
            warn!("Proxy request to {} failed: {}", target, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Proxy Error" })),
            )
                .into_response()
        }
    }
}
