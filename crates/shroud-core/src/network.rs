//! Network profile registry
//!
//! Static deployment topology for the networks the SDK knows about. The table
//! is built once on first access and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Connection parameters for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    /// EVM chain id
    pub chain_id: u64,
    /// Human readable name
    pub name: String,
    /// JSON-RPC endpoint of the chain
    pub rpc_url: String,
    /// Gateway serving the public key and decryption results
    #[serde(default)]
    pub gateway_url: Option<String>,
    /// On-chain access control list contract
    #[serde(default)]
    pub acl_address: Option<Address>,
    /// On-chain verifier contract for input proofs
    #[serde(default)]
    pub verifier_address: Option<Address>,
}

impl NetworkProfile {
    /// Create a profile with no gateway or contract addresses
    pub fn new(chain_id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            rpc_url: rpc_url.into(),
            gateway_url: None,
            acl_address: None,
            verifier_address: None,
        }
    }

    pub fn with_gateway(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn with_acl(mut self, acl: Address) -> Self {
        self.acl_address = Some(acl);
        self
    }

    pub fn with_verifier(mut self, verifier: Address) -> Self {
        self.verifier_address = Some(verifier);
        self
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (chain {})", self.name, self.chain_id)
    }
}

/// Registry key for Ethereum Sepolia
pub const SEPOLIA: &str = "sepolia";
/// Registry key for the Zama devnet
pub const ZAMA_DEVNET: &str = "zamaDevnet";
/// Registry key for a local development node
pub const LOCALHOST: &str = "localhost";

static REGISTRY: LazyLock<BTreeMap<&'static str, NetworkProfile>> = LazyLock::new(|| {
    let mut profiles = BTreeMap::new();

    profiles.insert(
        SEPOLIA,
        NetworkProfile::new(
            11_155_111,
            "Sepolia",
            "https://ethereum-sepolia-rpc.publicnode.com",
        )
        .with_gateway("https://gateway.sepolia.zama.ai")
        .with_acl(address!("0xFee8407e2f5e3Ee68ad77cAE98c434e637f516e5"))
        .with_verifier(address!("0x9D6891A6240D6130c54ae243d8005063D05fE14b")),
    );

    profiles.insert(
        ZAMA_DEVNET,
        NetworkProfile::new(9_000, "Zama Devnet", "https://devnet.zama.ai")
            .with_gateway("https://gateway.devnet.zama.ai")
            .with_acl(address!("0x2Fb4341027eb1d2aD8B5D9708187df8633cAFA92"))
            .with_verifier(address!("0x12B064FB845C1cc05e9493856a1D637a73e944bE")),
    );

    // Local nodes run their own gateway, so the caller supplies the endpoint.
    profiles.insert(
        LOCALHOST,
        NetworkProfile::new(31_337, "Localhost", "http://127.0.0.1:8545"),
    );

    profiles
});

/// Look up a pre-registered network profile by key
pub fn lookup(name: &str) -> Result<NetworkProfile> {
    REGISTRY
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownNetwork(name.to_string()))
}

/// All registered network keys, in sorted order
pub fn network_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// Iterate over every registered profile
pub fn profiles() -> impl Iterator<Item = (&'static str, &'static NetworkProfile)> {
    REGISTRY.iter().map(|(name, profile)| (*name, profile))
}
