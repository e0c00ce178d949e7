//! Documentation routes — serve synthesized OpenAPI and Markdown for
//! the caller's cached scan.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::error;

use apiscope_capture::EndpointRecord;
use apiscope_docs::{generate_markdown, generate_openapi};

use crate::state::{session_key, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/docs/openapi", get(openapi_direct))
        .route("/docs/openapi.json", get(openapi_proxied))
        .route("/docs/markdown", get(markdown))
}

/// Load the caller's cached endpoint list, or the 404 to return in
/// its place. An empty list counts as "no endpoints found".
fn load_endpoints(
    state: &AppState,
    headers: &HeaderMap,
    peer: SocketAddr,
    not_found: Response,
) -> Result<Vec<EndpointRecord>, Response> {
    let key = session_key(headers, peer);
    match state.store.retrieve(&key) {
        Ok(Some(endpoints)) if !endpoints.is_empty() => Ok(endpoints),
        Ok(_) => Err(not_found),
        Err(e) => {
            error!("Failed to load endpoints for {}: {}", key, e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Error loading endpoints").into_response())
        }
    }
}

/// OpenAPI document addressed at the original hosts directly.
async fn openapi_direct(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let not_found = (StatusCode::NOT_FOUND, "No endpoints found").into_response();
    let endpoints = match load_endpoints(&state, &headers, peer, not_found) {
        Ok(endpoints) => endpoints,
        Err(response) => return response,
    };

    match generate_openapi(&endpoints, true) {
        Some(doc) => Json(doc).into_response(),
        None => (StatusCode::NOT_FOUND, "No endpoints found").into_response(),
    }
}

/// OpenAPI document addressed through the local proxy route, for
/// "try it" flows that cannot reach arbitrary remote hosts.
async fn openapi_proxied(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let not_found = (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "No OpenAPI data available" })),
    )
        .into_response();
    let endpoints = match load_endpoints(&state, &headers, peer, not_found) {
        Ok(endpoints) => endpoints,
        Err(response) => return response,
    };

    match generate_openapi(&endpoints, false) {
        Some(doc) => Json(doc).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No OpenAPI data available" })),
        )
            .into_response(),
    }
}

async fn markdown(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let not_found = (StatusCode::NOT_FOUND, "No endpoints found").into_response();
    let endpoints = match load_endpoints(&state, &headers, peer, not_found) {
        Ok(endpoints) => endpoints,
        Err(response) => return response,
    };

    match generate_markdown(&endpoints) {
        Some(md) => ([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], md).into_response(),
        None => (StatusCode::NOT_FOUND, "No endpoints found").into_response(),
    }
}
