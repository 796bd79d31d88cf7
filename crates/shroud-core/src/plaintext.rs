//! Decrypted plaintext values returned by the gateway

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{parse_address, parse_int_text};
use crate::{Error, Result, TypeTag};

/// A decrypted value, shaped by the type of the ciphertext it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Plaintext {
    Bool(bool),
    Uint(u64),
    Address(Address),
}

impl Plaintext {
    /// Coerce a gateway JSON value into a plaintext
    ///
    /// With a known tag the value must fit that tag's domain. Without one, the
    /// JSON shape decides: booleans stay booleans, numbers and numeric strings
    /// become integers, and address strings become addresses.
    pub fn from_json(value: &Value, tag: Option<TypeTag>) -> Result<Self> {
        match tag {
            Some(TypeTag::Bool) => json_to_bool(value).map(Plaintext::Bool),
            Some(TypeTag::Address) => json_to_address(value).map(Plaintext::Address),
            Some(tag) => json_to_uint(value, tag.max_value().unwrap_or(u64::MAX), tag)
                .map(Plaintext::Uint),
            None => infer(value),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Plaintext::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Plaintext::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Plaintext::Address(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Plaintext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plaintext::Bool(v) => write!(f, "{}", v),
            Plaintext::Uint(v) => write!(f, "{}", v),
            Plaintext::Address(v) => write!(f, "{}", v.to_checksum(None)),
        }
    }
}

fn invalid(expected: impl fmt::Display, value: &Value) -> Error {
    Error::InvalidPlaintext {
        expected: expected.to_string(),
        value: value.to_string(),
    }
}

fn json_to_uint(value: &Value, max: u64, tag: TypeTag) -> Result<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_int_text(s).and_then(|v| u64::try_from(v).ok()),
        _ => None,
    };
    parsed
        .filter(|v| *v <= max)
        .ok_or_else(|| invalid(tag, value))
}

fn json_to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid(TypeTag::Bool, value)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(invalid(TypeTag::Bool, value)),
        },
        _ => Err(invalid(TypeTag::Bool, value)),
    }
}

fn json_to_address(value: &Value) -> Result<Address> {
    match value {
        Value::String(s) => parse_address(s).map_err(|_| invalid(TypeTag::Address, value)),
        _ => Err(invalid(TypeTag::Address, value)),
    }
}

fn infer(value: &Value) -> Result<Plaintext> {
    match value {
        Value::Bool(b) => Ok(Plaintext::Bool(*b)),
        Value::Number(_) => json_to_uint(value, u64::MAX, TypeTag::U64).map(Plaintext::Uint),
        Value::String(s) if s.len() == 42 && s.starts_with("0x") => {
            json_to_address(value).map(Plaintext::Address)
        }
        Value::String(_) => json_to_uint(value, u64::MAX, TypeTag::U64).map(Plaintext::Uint),
        _ => Err(invalid("plaintext", value)),
    }
}
