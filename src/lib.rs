//! shroud: client SDK for FHE-enabled chains
//!
//! Re-exports the workspace crates under one name:
//! - [`shroud_core`]: network profiles, type tags, value validation, settings
//! - [`shroud_client`]: engine lifecycle, encryption, input batches, decryption polling

pub use shroud_client;
pub use shroud_core;

pub use shroud_client::{Client, ClientConfig, ClientError, EncryptedInput, PollOptions};
pub use shroud_core::{lookup, NetworkProfile, Plaintext, TypeTag};
