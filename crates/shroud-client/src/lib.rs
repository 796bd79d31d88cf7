//! shroud-client: Encrypted-operation client for FHE-enabled chains
//!
//! Wraps an external FHE engine and a remote decryption gateway:
//! 1. Lazily initializes one engine per client (public key fetched from the gateway)
//! 2. Validates and encrypts typed values
//! 3. Batches values into handles plus a proof via [`InputBuilder`]
//! 4. Polls the gateway for decryption results
//!
//! ## Usage
//!
//! ```no_run
//! use shroud_client::{Client, ClientConfig, DevEngineFactory};
//! use shroud_core::{lookup, Address};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new(lookup("zamaDevnet")?);
//!     let client = Client::new(config, DevEngineFactory::default());
//!
//!     let mut input = client.input(Address::repeat_byte(1), Address::repeat_byte(2));
//!     input.add_u32(500)?.add_u8(10)?.add_bool(true)?;
//!     let encrypted = input.finalize().await?;
//!     println!("{} handles", encrypted.handles.len());
//!     Ok(())
//! }
//! ```

pub mod chain;
mod client;
pub mod codec;
pub mod decrypt;
#[cfg(feature = "dev-engine")]
pub mod dev_engine;
pub mod engine;
mod error;
pub mod gateway;
mod input;
pub mod metrics;

pub use chain::{ChainConnection, RpcConnection, StaticChain};
pub use client::{Client, ClientConfig};
pub use decrypt::{
    DecryptionOutcome, DecryptionRequest, FailureReason, LocalRequestIds, PollOptions,
    RequestIdSource,
};
#[cfg(feature = "dev-engine")]
pub use dev_engine::{DevEngine, DevEngineFactory};
pub use engine::{
    EncryptedInput, EncryptedScalar, EngineError, EngineFactory, EngineInputBuilder, EngineParams,
    FheEngine,
};
pub use error::{ClientError, Result};
pub use gateway::{GatewayClient, PollStatus, PublicKeyResponse};
pub use input::InputBuilder;
