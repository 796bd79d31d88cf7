//! Seam to the underlying FHE engine
//!
//! The engine performs the actual encryption and proof generation; this crate
//! only validates inputs, sequences calls and manages the engine's lifetime.
//! Engines are synchronous: the client runs their calls on the blocking pool.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shroud_core::TypeTag;

/// Failure reported by an engine implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine rejected empty batch")]
    EmptyBatch,

    #[error("{0}")]
    Rejected(String),
}

/// Everything an engine needs to come up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub chain_id: u64,
    pub public_key: String,
    pub gateway_url: String,
    pub acl_address: Option<Address>,
    pub verifier_address: Option<Address>,
}

/// Creates engine handles; called at most once per client
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: FheEngine;

    fn create(&self, params: EngineParams) -> Result<Self::Engine, EngineError>;
}

/// An initialized engine
pub trait FheEngine: Send + Sync + 'static {
    type InputBuilder: EngineInputBuilder;

    fn encrypt_u8(&self, value: u8) -> Result<Vec<u8>, EngineError>;
    fn encrypt_u16(&self, value: u16) -> Result<Vec<u8>, EngineError>;
    fn encrypt_u32(&self, value: u32) -> Result<Vec<u8>, EngineError>;
    fn encrypt_u64(&self, value: u64) -> Result<Vec<u8>, EngineError>;
    fn encrypt_bool(&self, value: bool) -> Result<Vec<u8>, EngineError>;
    fn encrypt_address(&self, value: Address) -> Result<Vec<u8>, EngineError>;

    /// Start a batch bound to a contract and the user submitting it
    fn input_builder(&self, contract: Address, user: Address) -> Self::InputBuilder;
}

/// The engine's own batch builder
pub trait EngineInputBuilder: Send {
    fn add_u8(&mut self, value: u8);
    fn add_u16(&mut self, value: u16);
    fn add_u32(&mut self, value: u32);
    fn add_u64(&mut self, value: u64);
    fn add_bool(&mut self, value: bool);
    fn add_address(&mut self, value: Address);

    /// Encrypt the batch and produce handles plus a joint proof
    fn finalize(self) -> Result<EncryptedInput, EngineError>;
}

/// A single ciphertext produced by direct encryption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedScalar {
    pub tag: TypeTag,
    pub ciphertext: Bytes,
}

impl EncryptedScalar {
    pub fn len(&self) -> usize {
        self.ciphertext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

/// Handles for a finalized batch, in append order, plus their validity proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handles: Vec<Bytes>,
    pub proof: Bytes,
}

impl EncryptedInput {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
