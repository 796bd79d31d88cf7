//! Maps validated values onto the engine primitive for their type tag

use shroud_core::TypedValue;

use crate::engine::{EngineError, EngineInputBuilder, FheEngine};

/// Encrypt one validated value with the engine primitive matching its tag
pub fn encrypt_value<E: FheEngine>(engine: &E, value: TypedValue) -> Result<Vec<u8>, EngineError> {
    match value {
        TypedValue::U8(v) => engine.encrypt_u8(v),
        TypedValue::U16(v) => engine.encrypt_u16(v),
        TypedValue::U32(v) => engine.encrypt_u32(v),
        TypedValue::U64(v) => engine.encrypt_u64(v),
        TypedValue::Bool(v) => engine.encrypt_bool(v),
        TypedValue::Address(v) => engine.encrypt_address(v),
    }
}

/// Append one validated value to an engine batch builder
pub fn push_value<B: EngineInputBuilder>(builder: &mut B, value: TypedValue) {
    match value {
        TypedValue::U8(v) => builder.add_u8(v),
        TypedValue::U16(v) => builder.add_u16(v),
        TypedValue::U32(v) => builder.add_u32(v),
        TypedValue::U64(v) => builder.add_u64(v),
        TypedValue::Bool(v) => builder.add_bool(v),
        TypedValue::Address(v) => builder.add_address(v),
    }
}
