//! Shared application state.

use std::net::SocketAddr;

use axum::http::HeaderMap;

use apiscope_core::ApiscopeConfig;
use apiscope_store::EndpointStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ApiscopeConfig,
    pub store: EndpointStore,
    /// Outbound client for the proxy route.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: ApiscopeConfig, store: EndpointStore) -> Self {
        Self {
            config,
            store,
            http: reqwest::Client::new(),
        }
    }
}

/// Cache key isolating one caller's scan results from another's:
/// first `X-Forwarded-For` hop when present, else the socket peer.
pub fn session_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| peer.ip().to_string());
    format!("endpoints:{}", client_ip)
}
