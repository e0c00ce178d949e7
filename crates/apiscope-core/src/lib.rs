//! Apiscope Core — shared error type and configuration.

pub mod config;
pub mod error;

pub use config::{ApiscopeConfig, DataPaths};
pub use error::{Error, Result};
