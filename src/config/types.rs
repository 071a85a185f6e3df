use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExporterConfig {
    #[serde(default)]
    pub servers: HashMap<String, ServerConfig>,
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub exporter: ListenConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Base URL of the fleet-management service.
    pub address: String,
    /// Optional collection path segment appended to the address.
    pub collection: Option<String>,
    /// Access token; overridable per server via environment variable.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub use_proxy: bool,
    /// Skip hosted (non-operator-managed) pools.
    #[serde(default = "default_true")]
    pub exclude_hosted: bool,
    /// Cap on concurrent per-pool agent fetches; absent means one worker
    /// per pool with no cap.
    pub max_concurrent_fetches: Option<usize>,
    /// Wall-clock deadline for one collection cycle, in seconds.
    pub cycle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            endpoint: default_endpoint(),
        }
    }
}

impl ListenConfig {
    /// Endpoint with a guaranteed leading slash.
    pub fn endpoint_path(&self) -> String {
        if self.endpoint.starts_with('/') {
            self.endpoint.clone()
        } else {
            format!("/{}", self.endpoint)
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_endpoint() -> String {
    "/metrics".to_string()
}
