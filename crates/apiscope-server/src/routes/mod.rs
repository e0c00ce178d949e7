//! HTTP route handlers.

pub mod docs;
pub mod proxy;
pub mod scan;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(scan::routes())
        .merge(docs::routes())
        .merge(proxy::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> String {
    format!("Hello from worker {}", std::process::id())
}
