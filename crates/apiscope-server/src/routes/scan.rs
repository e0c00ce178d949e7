//! Scan route — drive a browser session and cache the endpoint list.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use apiscope_browser::ScanOptions;
use apiscope_core::Error;

use crate::state::{session_key, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/scan", post(run_scan))
}

#[derive(Debug, Deserialize)]
struct ScanBody {
    url: Option<String>,
    /// Post-load settle delay in milliseconds.
    #[serde(default)]
    delay: u64,
    #[serde(default)]
    headful: bool,
}

async fn run_scan(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<ScanBody>,
) -> Response {
    let Some(url) = body.url.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL parameter is required" })),
        )
            .into_response();
    };

    let key = session_key(&headers, peer);
    info!("Scan requested: {} (session {})", url, key);

    let opts = ScanOptions {
        url,
        delay_ms: body.delay,
        headful: body.headful,
        navigation_timeout_ms: state.config.navigation_timeout_ms,
    };

    let endpoints = match apiscope_browser::scan(&state.config.data_paths.profiles, opts).await {
        Ok(endpoints) => endpoints,
        Err(Error::NavigationTimeout) => {
            error!("Scan failed: navigation timed out");
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "Navigation timed out" })),
            )
                .into_response();
        }
        Err(e) => {
            error!("Scan failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    if let Err(e) = state.store.store(&key, &endpoints) {
        error!("Failed to cache endpoints for {}: {}", key, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    info!("Scan finished: {} endpoints (session {})", endpoints.len(), key);
    Json(endpoints).into_response()
}
