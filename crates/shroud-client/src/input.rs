//! Encrypted input builder
//!
//! Accumulates validated values for one (contract, user) pair and replays them
//! against the engine's batch builder on finalize. Handle order always matches
//! append order, since callers pass handles positionally into contract calls.

use std::fmt;
use std::time::Instant;

use alloy_primitives::Address;
use tracing::debug;

use shroud_core::{RawValue, TypeTag, TypedValue};

use crate::client::Client;
use crate::codec;
use crate::engine::{EncryptedInput, EngineError, EngineFactory, EngineInputBuilder, FheEngine};
use crate::error::{ClientError, Result};
use crate::metrics;

/// Append-only batch of values, finalized exactly once
pub struct InputBuilder<'a, F: EngineFactory> {
    client: &'a Client<F>,
    contract: Address,
    user: Address,
    values: Vec<TypedValue>,
    finalized: bool,
}

impl<F: EngineFactory> fmt::Debug for InputBuilder<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBuilder")
            .field("contract", &self.contract)
            .field("user", &self.user)
            .field("tags", &self.tags())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl<'a, F: EngineFactory> InputBuilder<'a, F> {
    pub(crate) fn new(client: &'a Client<F>, contract: Address, user: Address) -> Self {
        Self {
            client,
            contract,
            user,
            values: Vec::new(),
            finalized: false,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn user(&self) -> Address {
        self.user
    }

    /// Number of values appended so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Tags of the appended values, in order
    pub fn tags(&self) -> Vec<TypeTag> {
        self.values.iter().map(TypedValue::tag).collect()
    }

    /// Validate and append a value; the engine is not touched yet
    pub fn add(&mut self, tag: TypeTag, value: impl Into<RawValue>) -> Result<&mut Self> {
        if self.finalized {
            return Err(ClientError::BuilderAlreadyFinalized);
        }
        self.values.push(TypedValue::parse(tag, value)?);
        Ok(self)
    }

    pub fn add_u8(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::U8, value)
    }

    pub fn add_u16(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::U16, value)
    }

    pub fn add_u32(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::U32, value)
    }

    pub fn add_u64(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::U64, value)
    }

    pub fn add_bool(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::Bool, value)
    }

    pub fn add_address(&mut self, value: impl Into<RawValue>) -> Result<&mut Self> {
        self.add(TypeTag::Address, value)
    }

    /// Encrypt the batch, producing one handle per appended value plus a proof
    ///
    /// The builder is spent once the engine batch has been attempted; any later
    /// call fails with `BuilderAlreadyFinalized`. If engine initialization
    /// itself fails the builder is left untouched and may be finalized again.
    pub async fn finalize(&mut self) -> Result<EncryptedInput> {
        if self.finalized {
            return Err(ClientError::BuilderAlreadyFinalized);
        }

        let engine = self.client.engine().await?;
        self.finalized = true;

        let values = std::mem::take(&mut self.values);
        let count = values.len();
        let (contract, user) = (self.contract, self.user);
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            replay(&*engine, contract, user, &values)
        })
        .await?;

        let input = match result {
            Ok(input) => input,
            Err(EngineError::EmptyBatch) => return Err(ClientError::EmptyBatchRejected),
            Err(e) => return Err(ClientError::EncryptionFailed(e)),
        };

        if input.handles.len() != count {
            return Err(ClientError::EncryptionFailed(EngineError::Rejected(format!(
                "engine returned {} handles for {} values",
                input.handles.len(),
                count
            ))));
        }

        metrics::record_input_batch(count, started.elapsed());
        debug!(
            contract = %contract,
            user = %user,
            handles = count,
            proof_bytes = input.proof.len(),
            "Finalized encrypted input"
        );

        Ok(input)
    }
}

fn replay<E: FheEngine>(
    engine: &E,
    contract: Address,
    user: Address,
    values: &[TypedValue],
) -> std::result::Result<EncryptedInput, EngineError> {
    let mut builder = engine.input_builder(contract, user);
    for value in values {
        codec::push_value(&mut builder, *value);
    }
    builder.finalize()
}
