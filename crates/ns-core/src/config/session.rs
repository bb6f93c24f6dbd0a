//! Session configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Configuration for a node session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the node's HTTP RPC API
    pub api_address: String,

    /// Period between peer-count queries while observing
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Upper bound on a single peer-count query; an overrun drops the tick
    #[serde(with = "duration_secs")]
    pub query_timeout: Duration,

    /// Upper bound on a single HTTP request to the node
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Catalog document to fetch from
    pub catalog_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_address: "http://127.0.0.1:5001".to_string(),
            poll_interval: Duration::from_secs(1),
            query_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            catalog_path: None,
        }
    }
}

impl SessionConfig {
    /// Catalog path, falling back to `catalog.json` in the config directory
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| super::default_config_dir().join("catalog.json"))
    }
}
