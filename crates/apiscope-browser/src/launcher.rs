//! Chrome lifecycle — locate a binary, spawn with a DevTools port,
//! tear down when the session ends.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info, warn};

use apiscope_core::{Error, Result};

const LAUNCH_WAIT: Duration = Duration::from_secs(30);

const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Locate a Chrome/Chromium binary. `APISCOPE_CHROME` overrides the probe.
pub fn find_chrome() -> Result<String> {
    if let Ok(path) = std::env::var("APISCOPE_CHROME") {
        return Ok(path);
    }
    for candidate in CHROME_CANDIDATES {
        if which_exists(candidate) {
            return Ok(candidate.to_string());
        }
    }
    Err(Error::Browser(
        "no Chrome/Chromium binary found; set APISCOPE_CHROME".to_string(),
    ))
}

fn which_exists(cmd: &str) -> bool {
    std::process::Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A running Chrome process and its DevTools WebSocket endpoint.
pub struct ChromeProcess {
    child: Child,
    pub ws_url: String,
    /// Removed together with the process.
    _user_data_dir: tempfile::TempDir,
}

impl ChromeProcess {
    /// Spawn Chrome with a random DevTools port and wait for the
    /// `DevTools listening on ws://...` line on stderr.
    pub async fn launch(profiles_dir: &Path, headful: bool) -> Result<Self> {
        let binary = find_chrome()?;
        let user_data_dir = tempfile::Builder::new()
            .prefix("scan-")
            .tempdir_in(profiles_dir)
            .map_err(Error::Io)?;

        let mut cmd = Command::new(&binary);
        cmd.arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", user_data_dir.path().display()))
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !headful {
            cmd.arg("--headless=new");
        }
        cmd.arg("about:blank");

        info!("Launching {} (headful={})", binary, headful);
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Browser(format!("failed to spawn {}: {}", binary, e)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Browser("no stderr handle on Chrome process".to_string()))?;
        let ws_url = tokio::time::timeout(LAUNCH_WAIT, read_devtools_url(stderr))
            .await
            .map_err(|_| Error::Browser("timed out waiting for DevTools endpoint".to_string()))??;

        debug!("DevTools endpoint: {}", ws_url);
        Ok(Self {
            child,
            ws_url,
            _user_data_dir: user_data_dir,
        })
    }

    /// Tear the process down. `kill_on_drop` covers error paths where
    /// this is never reached.
    pub async fn close(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill Chrome: {}", e);
        }
    }
}

async fn read_devtools_url(stderr: ChildStderr) -> Result<String> {
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await.map_err(Error::Io)? {
        if let Some(rest) = line.strip_prefix("DevTools listening on ") {
            return Ok(rest.trim().to_string());
        }
    }
    Err(Error::Browser(
        "Chrome exited before exposing a DevTools endpoint".to_string(),
    ))
}
