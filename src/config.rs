//! Configuration types for the prerender agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default snapshot service endpoint.
pub const DEFAULT_API_URL: &str = "https://snapsearch.io/api/v1/robot";

/// Main configuration for the prerender agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrerenderConfig {
    /// Robot detection settings
    pub detection: DetectionConfig,

    /// Snapshot service client settings
    pub client: ClientConfig,

    /// Snapshot cache settings
    pub cache: CacheConfig,

    /// Response shaping settings
    pub response: ResponseConfig,
}

/// Detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Route patterns that are never intercepted
    pub ignored_routes: Vec<String>,

    /// Route patterns that may be intercepted; empty means all routes
    pub matched_routes: Vec<String>,

    /// Skip paths whose file extension is not in the extension table
    pub check_file_extensions: bool,

    /// Trust X-Forwarded-Proto and X-Forwarded-Host
    pub trusted_proxy: bool,

    /// Override path for the robot signature database
    pub robots_json: Option<PathBuf>,

    /// Override path for the extension table
    pub extensions_json: Option<PathBuf>,
}

/// Snapshot service client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Snapshot API endpoint
    pub api_url: String,

    /// Account email used for basic auth
    pub email: String,

    /// API key used for basic auth
    pub key: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Extra parameters sent with every snapshot request
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            email: String::new(),
            key: String::new(),
            timeout_seconds: 30,
            parameters: serde_json::Map::new(),
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve repeated URLs from memory
    pub enabled: bool,

    /// Maximum cached snapshots
    pub max_entries: u64,

    /// Snapshot TTL in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: 1_000,
            ttl_seconds: 3600,
        }
    }
}

/// Response shaping settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Forward every snapshot header instead of only `Location`
    pub forward_all_headers: bool,
}
