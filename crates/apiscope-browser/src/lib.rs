//! Browser session controller — drives a Chrome instance over CDP and
//! captures the API traffic one navigation produces.

pub mod cdp;
pub mod launcher;
pub mod session;

pub use launcher::ChromeProcess;
pub use session::ScanSession;

use std::path::Path;

use apiscope_capture::EndpointRecord;
use apiscope_core::Result;

/// Options for one scan session.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Page to navigate to.
    pub url: String,
    /// Fixed post-load settle delay in milliseconds.
    pub delay_ms: u64,
    /// Run Chrome with a visible window.
    pub headful: bool,
    /// Maximum page-load wait in milliseconds.
    pub navigation_timeout_ms: u64,
}

/// Run one full scan session: launch Chrome, navigate, capture the
/// traffic, tear the browser down, and return the finalized endpoint
/// list in first-observed order.
pub async fn scan(profiles_dir: &Path, opts: ScanOptions) -> Result<Vec<EndpointRecord>> {
    let chrome = ChromeProcess::launch(profiles_dir, opts.headful).await?;
    let result = run_session(&chrome, &opts).await;
    chrome.close().await;
    result
}

async fn run_session(chrome: &ChromeProcess, opts: &ScanOptions) -> Result<Vec<EndpointRecord>> {
    let (conn, events) = cdp::CdpConnection::connect(&chrome.ws_url).await?;
    let session = ScanSession::attach(conn, events).await?;
    session
        .run(&opts.url, opts.delay_ms, opts.navigation_timeout_ms)
        .await
}
