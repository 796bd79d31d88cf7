//! Persisted client settings

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::network::{self, NetworkProfile};

/// Default overall decryption timeout in milliseconds
pub const DEFAULT_DECRYPT_TIMEOUT_MS: u64 = 30_000;

/// Default spacing between decryption polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Settings for building a client, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Registry key of the network profile
    pub network: String,
    /// Gateway endpoint overriding the profile's
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// ACL contract overriding the profile's
    #[serde(default)]
    pub acl_address: Option<Address>,
    /// Verifier contract overriding the profile's
    #[serde(default)]
    pub verifier_address: Option<Address>,
    /// Chain RPC endpoint used to confirm the chain id
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub decrypt_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout for gateway calls
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_DECRYPT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

impl ClientSettings {
    /// Settings for a registry network with all defaults
    pub fn for_network(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            gateway_url: None,
            acl_address: None,
            verifier_address: None,
            rpc_url: None,
            decrypt_timeout_ms: DEFAULT_DECRYPT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            http_timeout_ms: default_http_timeout_ms(),
        }
    }

    pub fn with_gateway(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Resolve the network key against the registry
    pub fn profile(&self) -> crate::Result<NetworkProfile> {
        network::lookup(&self.network)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::for_network(network::SEPOLIA)
    }
}
