//! Development engine
//!
//! Deterministic stand-in for a real FHE engine, for local wiring and demos.
//! It performs NO encryption: ciphertexts and handles are keccak digests and
//! the proof is a digest over the batch. Never use it with real data.
//!
//! Handles follow the 32-byte on-chain layout:
//! ```text
//! [0..21)  digest prefix
//! [21]     index within the batch
//! [22..30) chain id, big endian
//! [30]     type code
//! [31]     handle version
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes};
use tiny_keccak::{Hasher, Keccak};

use shroud_core::TypeTag;

use crate::engine::{EncryptedInput, EngineError, EngineFactory, EngineInputBuilder, EngineParams, FheEngine};

pub const HANDLE_VERSION: u8 = 0;

/// Largest batch a single proof can describe
pub const MAX_BATCH: usize = u8::MAX as usize;

/// Wire code for each type tag
pub fn type_code(tag: TypeTag) -> u8 {
    match tag {
        TypeTag::Bool => 0,
        TypeTag::U8 => 2,
        TypeTag::U16 => 3,
        TypeTag::U32 => 4,
        TypeTag::U64 => 5,
        TypeTag::Address => 7,
    }
}

pub fn tag_from_code(code: u8) -> Option<TypeTag> {
    TypeTag::ALL.into_iter().find(|tag| type_code(*tag) == code)
}

/// Fields recoverable from a development handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleInfo {
    pub index: u8,
    pub chain_id: u64,
    pub tag: TypeTag,
    pub version: u8,
}

/// Decode the metadata bytes of a 32-byte handle
pub fn decode_handle(handle: &[u8]) -> Option<HandleInfo> {
    if handle.len() != 32 {
        return None;
    }
    let chain_id = u64::from_be_bytes(handle[22..30].try_into().ok()?);
    Some(HandleInfo {
        index: handle[21],
        chain_id,
        tag: tag_from_code(handle[30])?,
        version: handle[31],
    })
}

fn keccak(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

fn value_bytes(tag: TypeTag, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(type_code(tag));
    out.extend_from_slice(bytes);
    out
}

/// Factory for [`DevEngine`]
#[derive(Debug, Clone, Default)]
pub struct DevEngineFactory {
    /// Mirror engines that refuse empty batches
    pub reject_empty: bool,
}

impl EngineFactory for DevEngineFactory {
    type Engine = DevEngine;

    fn create(&self, params: EngineParams) -> Result<DevEngine, EngineError> {
        if params.public_key.trim().is_empty() {
            return Err(EngineError::Rejected("public key is empty".into()));
        }
        Ok(DevEngine {
            key_digest: keccak(&[params.public_key.as_bytes()]),
            chain_id: params.chain_id,
            reject_empty: self.reject_empty,
            nonce: AtomicU64::new(0),
        })
    }
}

/// Keccak-based engine with the same surface as a real one
pub struct DevEngine {
    key_digest: [u8; 32],
    chain_id: u64,
    reject_empty: bool,
    nonce: AtomicU64,
}

impl DevEngine {
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn ciphertext(&self, tag: TypeTag, bytes: &[u8]) -> Vec<u8> {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed).to_be_bytes();
        let digest = keccak(&[&self.key_digest, &value_bytes(tag, bytes), &nonce]);

        let mut out = Vec::with_capacity(33);
        out.push(type_code(tag));
        out.extend_from_slice(&digest);
        out
    }
}

impl FheEngine for DevEngine {
    type InputBuilder = DevInputBuilder;

    fn encrypt_u8(&self, value: u8) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::U8, &value.to_be_bytes()))
    }

    fn encrypt_u16(&self, value: u16) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::U16, &value.to_be_bytes()))
    }

    fn encrypt_u32(&self, value: u32) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::U32, &value.to_be_bytes()))
    }

    fn encrypt_u64(&self, value: u64) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::U64, &value.to_be_bytes()))
    }

    fn encrypt_bool(&self, value: bool) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::Bool, &[value as u8]))
    }

    fn encrypt_address(&self, value: Address) -> Result<Vec<u8>, EngineError> {
        Ok(self.ciphertext(TypeTag::Address, value.as_slice()))
    }

    fn input_builder(&self, contract: Address, user: Address) -> DevInputBuilder {
        DevInputBuilder {
            key_digest: self.key_digest,
            chain_id: self.chain_id,
            reject_empty: self.reject_empty,
            contract,
            user,
            entries: Vec::new(),
        }
    }
}

/// Batch builder for [`DevEngine`]
pub struct DevInputBuilder {
    key_digest: [u8; 32],
    chain_id: u64,
    reject_empty: bool,
    contract: Address,
    user: Address,
    entries: Vec<Vec<u8>>,
}

impl DevInputBuilder {
    fn push(&mut self, tag: TypeTag, bytes: &[u8]) {
        self.entries.push(value_bytes(tag, bytes));
    }
}

impl EngineInputBuilder for DevInputBuilder {
    fn add_u8(&mut self, value: u8) {
        self.push(TypeTag::U8, &value.to_be_bytes());
    }

    fn add_u16(&mut self, value: u16) {
        self.push(TypeTag::U16, &value.to_be_bytes());
    }

    fn add_u32(&mut self, value: u32) {
        self.push(TypeTag::U32, &value.to_be_bytes());
    }

    fn add_u64(&mut self, value: u64) {
        self.push(TypeTag::U64, &value.to_be_bytes());
    }

    fn add_bool(&mut self, value: bool) {
        self.push(TypeTag::Bool, &[value as u8]);
    }

    fn add_address(&mut self, value: Address) {
        self.push(TypeTag::Address, value.as_slice());
    }

    fn finalize(self) -> Result<EncryptedInput, EngineError> {
        if self.entries.is_empty() && self.reject_empty {
            return Err(EngineError::EmptyBatch);
        }
        // Count and indices are single bytes in the proof and handles
        if self.entries.len() > MAX_BATCH {
            return Err(EngineError::Rejected(format!(
                "batch of {} values exceeds {}",
                self.entries.len(),
                MAX_BATCH
            )));
        }

        let mut batch = Vec::new();
        for entry in &self.entries {
            batch.extend_from_slice(entry);
        }
        let batch_digest = keccak(&[
            &self.key_digest,
            self.contract.as_slice(),
            self.user.as_slice(),
            &batch,
        ]);

        let handles: Vec<Bytes> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let digest = keccak(&[&batch_digest, &(index as u64).to_be_bytes()]);
                let mut handle = [0u8; 32];
                handle[..21].copy_from_slice(&digest[..21]);
                handle[21] = index as u8;
                handle[22..30].copy_from_slice(&self.chain_id.to_be_bytes());
                handle[30] = entry[0];
                handle[31] = HANDLE_VERSION;
                Bytes::copy_from_slice(&handle)
            })
            .collect();

        let mut proof = Vec::with_capacity(1 + 32 * (handles.len() + 1));
        proof.push(handles.len() as u8);
        for handle in &handles {
            proof.extend_from_slice(handle);
        }
        proof.extend_from_slice(&batch_digest);

        Ok(EncryptedInput {
            handles,
            proof: Bytes::from(proof),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DevEngine {
        DevEngineFactory::default()
            .create(EngineParams {
                chain_id: 9_000,
                public_key: "0xabcdef".into(),
                gateway_url: "http://localhost".into(),
                acl_address: None,
                verifier_address: None,
            })
            .unwrap()
    }

    #[test]
    fn test_rejects_empty_key() {
        let err = DevEngineFactory::default()
            .create(EngineParams {
                chain_id: 1,
                public_key: "  ".into(),
                gateway_url: String::new(),
                acl_address: None,
                verifier_address: None,
            })
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Rejected(_)));
    }

    #[test]
    fn test_ciphertexts_are_tagged_and_fresh() {
        let engine = engine();
        let a = engine.encrypt_u32(500).unwrap();
        let b = engine.encrypt_u32(500).unwrap();
        assert_eq!(a[0], type_code(TypeTag::U32));
        assert_eq!(a.len(), 33);
        assert_ne!(a, b);
    }

    #[test]
    fn test_handles_follow_append_order() {
        let engine = engine();
        let mut builder = engine.input_builder(Address::repeat_byte(1), Address::repeat_byte(2));
        builder.add_u32(500);
        builder.add_u8(10);
        builder.add_bool(true);
        let input = builder.finalize().unwrap();

        assert_eq!(input.handles.len(), 3);
        let tags: Vec<TypeTag> = input
            .handles
            .iter()
            .map(|h| decode_handle(h).unwrap().tag)
            .collect();
        assert_eq!(tags, vec![TypeTag::U32, TypeTag::U8, TypeTag::Bool]);

        for (i, handle) in input.handles.iter().enumerate() {
            let info = decode_handle(handle).unwrap();
            assert_eq!(info.index as usize, i);
            assert_eq!(info.chain_id, 9_000);
            assert_eq!(info.version, HANDLE_VERSION);
        }
        assert_eq!(input.proof[0], 3);
    }

    #[test]
    fn test_proof_binds_contract_and_user() {
        let engine = engine();
        let batch = |contract: Address| {
            let mut builder = engine.input_builder(contract, Address::repeat_byte(2));
            builder.add_u8(1);
            builder.finalize().unwrap()
        };
        assert_ne!(batch(Address::repeat_byte(1)).proof, batch(Address::repeat_byte(3)).proof);
    }

    #[test]
    fn test_empty_batch() {
        let engine = engine();
        let input = engine.input_builder(Address::ZERO, Address::ZERO).finalize().unwrap();
        assert!(input.handles.is_empty());
        assert_eq!(input.proof[0], 0);

        let strict = DevEngineFactory { reject_empty: true }
            .create(EngineParams {
                chain_id: 1,
                public_key: "k".into(),
                gateway_url: String::new(),
                acl_address: None,
                verifier_address: None,
            })
            .unwrap();
        let err = strict.input_builder(Address::ZERO, Address::ZERO).finalize().unwrap_err();
        assert_eq!(err, EngineError::EmptyBatch);
    }

    #[test]
    fn test_batch_size_limit() {
        let engine = engine();
        let batch = |count: usize| {
            let mut builder = engine.input_builder(Address::ZERO, Address::ZERO);
            for i in 0..count {
                builder.add_u32(i as u32);
            }
            builder.finalize()
        };

        let full = batch(MAX_BATCH).unwrap();
        assert_eq!(full.handles.len(), 255);
        assert_eq!(full.proof[0], 255);
        let last = decode_handle(full.handles.last().unwrap()).unwrap();
        assert_eq!(last.index, 254);

        let err = batch(MAX_BATCH + 1).unwrap_err();
        assert!(matches!(err, EngineError::Rejected(ref reason) if reason.contains("256")));
    }

    #[test]
    fn test_type_code_round_trip() {
        for tag in TypeTag::ALL {
            assert_eq!(tag_from_code(type_code(tag)), Some(tag));
        }
        assert_eq!(tag_from_code(1), None);
    }
}
