//! apiscope — passive API discovery server: scan a page, reconstruct
//! its XHR/fetch traffic, serve generated documentation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("APISCOPE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = apiscope_core::ApiscopeConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = apiscope_store::EndpointStore::open(&config.data_paths.endpoints_db)
        .map_err(|e| anyhow::anyhow!("Failed to open endpoint store: {}", e))?;

    let state = Arc::new(AppState::new(config, store));

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("apiscope server listening on {}", addr);

    // ConnectInfo gives handlers the peer address for session keying.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
