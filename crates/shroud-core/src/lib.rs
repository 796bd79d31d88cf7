//! shroud-core: Network profiles and value domains for the shroud FHE client
//!
//! This crate holds everything that needs no I/O:
//! - The network profile registry (chain id, RPC, gateway, ACL and verifier addresses)
//! - Type tags and domain validation for values headed to the FHE engine
//! - Coercion of gateway plaintexts back into typed values
//! - Persisted client settings
//!
//! Encryption itself is performed by an external engine and decryption by a
//! remote gateway; see `shroud-client` for the glue.

mod config;
mod error;
pub mod network;
mod plaintext;
mod value;

pub use alloy_primitives::Address;
pub use config::{ClientSettings, DEFAULT_DECRYPT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
pub use error::Error;
pub use network::{lookup, NetworkProfile};
pub use plaintext::Plaintext;
pub use value::{parse_address, RawValue, TypeTag, TypedValue};

pub type Result<T> = std::result::Result<T, Error>;
