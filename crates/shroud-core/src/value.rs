//! Type tags and domain validation for values headed to the engine

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Semantic kind of an encrypted value
///
/// Selects both the engine primitive used to encrypt a value and the domain
/// rule used to validate it beforehand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    U8,
    U16,
    U32,
    U64,
    Bool,
    Address,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::U8,
        TypeTag::U16,
        TypeTag::U32,
        TypeTag::U64,
        TypeTag::Bool,
        TypeTag::Address,
    ];

    /// Bit width for unsigned integer tags
    pub fn bits(&self) -> Option<u32> {
        match self {
            TypeTag::U8 => Some(8),
            TypeTag::U16 => Some(16),
            TypeTag::U32 => Some(32),
            TypeTag::U64 => Some(64),
            TypeTag::Bool | TypeTag::Address => None,
        }
    }

    /// Largest value accepted by an unsigned integer tag
    pub fn max_value(&self) -> Option<u64> {
        self.bits().map(|bits| {
            if bits == 64 {
                u64::MAX
            } else {
                (1u64 << bits) - 1
            }
        })
    }

    pub fn is_uint(&self) -> bool {
        self.bits().is_some()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Address => write!(f, "address"),
        }
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let normalized = normalized.strip_prefix('e').unwrap_or(&normalized);
        match normalized {
            "u8" | "uint8" | "8" => Ok(TypeTag::U8),
            "u16" | "uint16" | "16" => Ok(TypeTag::U16),
            "u32" | "uint32" | "32" => Ok(TypeTag::U32),
            "u64" | "uint64" | "64" => Ok(TypeTag::U64),
            "bool" | "boolean" => Ok(TypeTag::Bool),
            "address" => Ok(TypeTag::Address),
            _ => Err(Error::UnknownTypeTag(s.to_string())),
        }
    }
}

/// Caller-supplied value before validation
///
/// Mirrors the loose inputs accepted at the API surface: signed integers (so
/// negative values can be rejected rather than wrapping), booleans, strings
/// and addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Int(i128),
    Bool(bool),
    Text(String),
    Address(Address),
}

macro_rules! raw_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RawValue {
                fn from(value: $ty) -> Self {
                    RawValue::Int(value as i128)
                }
            }
        )*
    };
}

raw_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, i128);

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<Address> for RawValue {
    fn from(value: Address) -> Self {
        RawValue::Address(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{}", v),
            RawValue::Bool(v) => write!(f, "{}", v),
            RawValue::Text(v) => write!(f, "{:?}", v),
            RawValue::Address(v) => write!(f, "{}", v),
        }
    }
}

/// A value that has passed domain validation for its tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Address(Address),
}

impl TypedValue {
    /// Validate `raw` against the domain of `tag`
    pub fn parse(tag: TypeTag, raw: impl Into<RawValue>) -> Result<Self> {
        let raw = raw.into();
        match tag {
            TypeTag::Bool => parse_bool(&raw).map(TypedValue::Bool),
            TypeTag::Address => parse_address_value(&raw).map(TypedValue::Address),
            TypeTag::U8 => parse_uint(tag, &raw).map(|v| TypedValue::U8(v as u8)),
            TypeTag::U16 => parse_uint(tag, &raw).map(|v| TypedValue::U16(v as u16)),
            TypeTag::U32 => parse_uint(tag, &raw).map(|v| TypedValue::U32(v as u32)),
            TypeTag::U64 => parse_uint(tag, &raw).map(TypedValue::U64),
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            TypedValue::U8(_) => TypeTag::U8,
            TypedValue::U16(_) => TypeTag::U16,
            TypedValue::U32(_) => TypeTag::U32,
            TypedValue::U64(_) => TypeTag::U64,
            TypedValue::Bool(_) => TypeTag::Bool,
            TypedValue::Address(_) => TypeTag::Address,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::U8(v) => write!(f, "{}u8", v),
            TypedValue::U16(v) => write!(f, "{}u16", v),
            TypedValue::U32(v) => write!(f, "{}u32", v),
            TypedValue::U64(v) => write!(f, "{}u64", v),
            TypedValue::Bool(v) => write!(f, "{}", v),
            TypedValue::Address(v) => write!(f, "{}", v),
        }
    }
}

fn out_of_range(tag: TypeTag, raw: &RawValue) -> Error {
    Error::ValueOutOfRange {
        tag,
        value: raw.to_string(),
    }
}

fn parse_uint(tag: TypeTag, raw: &RawValue) -> Result<u64> {
    let max = tag.max_value().unwrap_or(u64::MAX) as i128;
    let value = match raw {
        RawValue::Int(v) => *v,
        RawValue::Text(s) => parse_int_text(s).ok_or_else(|| out_of_range(tag, raw))?,
        RawValue::Bool(_) | RawValue::Address(_) => return Err(out_of_range(tag, raw)),
    };

    if value < 0 || value > max {
        return Err(out_of_range(tag, raw));
    }
    Ok(value as u64)
}

/// Parse a decimal or `0x`-prefixed hex integer
pub(crate) fn parse_int_text(s: &str) -> Option<i128> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return None;
        }
        return u128::from_str_radix(hex, 16)
            .ok()
            .and_then(|v| i128::try_from(v).ok());
    }
    s.parse::<i128>().ok()
}

fn parse_bool(raw: &RawValue) -> Result<bool> {
    match raw {
        RawValue::Bool(v) => Ok(*v),
        RawValue::Int(v) => Ok(*v != 0),
        RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(out_of_range(TypeTag::Bool, raw)),
        },
        RawValue::Address(_) => Err(out_of_range(TypeTag::Bool, raw)),
    }
}

fn parse_address_value(raw: &RawValue) -> Result<Address> {
    match raw {
        RawValue::Address(addr) => Ok(*addr),
        RawValue::Text(s) => parse_address(s),
        other => Err(Error::InvalidAddressFormat(other.to_string())),
    }
}

/// Parse a canonical `0x`-prefixed, 40 hex digit address
///
/// All-lowercase and all-uppercase forms are accepted; mixed case must match
/// the EIP-55 checksum.
pub fn parse_address(s: &str) -> Result<Address> {
    let invalid = || Error::InvalidAddressFormat(s.to_string());

    let digits = s.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let bytes: [u8; 20] = hex::decode(digits)
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;
    let address = Address::from(bytes);

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && address.to_checksum(None) != s {
        return Err(invalid());
    }

    Ok(address)
}
