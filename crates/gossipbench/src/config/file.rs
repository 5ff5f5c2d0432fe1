//! TOML configuration file layer.
//!
//! Every key is optional; values present in the file override the built-in
//! defaults and are in turn overridden by explicit command-line flags.

use std::{fs, path};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ConfigError;

/// On-disk configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub count: Option<u64>,
    pub target: Option<usize>,
    pub degree: Option<usize>,
    pub interval_ms: Option<u64>,
    pub size: Option<usize>,
    pub messages: Option<usize>,
    pub listen_port: Option<u16>,
    pub topic: Option<String>,
    pub settle_secs: Option<u64>,
    pub dial_timeout_ms: Option<u64>,
    /// Absolute rendezvous instant, wins over `publish_after_secs`
    pub publish_at: Option<DateTime<Utc>>,
    pub publish_after_secs: Option<u64>,
    pub backoff_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub max_failures: Option<u64>,
    pub history_length: Option<usize>,
    pub history_gossip: Option<usize>,
    pub max_transmit_size: Option<usize>,
    pub outbound_queue_size: Option<usize>,
    pub validate_queue_size: Option<usize>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

impl FileConfig {
    /// Read a configuration file
    ///
    /// Unlike the defaults, a missing file is an error: the path was asked for
    /// explicitly.
    pub fn load(path: impl AsRef<path::Path>) -> Result<Self, ConfigError> {
        let path = normalize_toml_path(path.as_ref());
        let raw = fs::read_to_string(&path)
            .map_err(|source| ConfigError::ReadFailed { path: path.clone(), source })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed { path, source })
    }
}
