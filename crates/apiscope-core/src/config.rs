//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all apiscope data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Endpoint cache database directory (`data/endpoints/`).
    pub endpoints_db: PathBuf,
    /// Chrome user-data directories for scan sessions (`data/profiles/`).
    pub profiles: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            endpoints_db: root.join("endpoints"),
            profiles: root.join("profiles"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.endpoints_db)?;
        std::fs::create_dir_all(&self.profiles)?;
        Ok(())
    }
}

/// Top-level apiscope configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiscopeConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Maximum page-load wait in milliseconds.
    pub navigation_timeout_ms: u64,
}

impl ApiscopeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            navigation_timeout_ms: 120_000,
        })
    }
}
