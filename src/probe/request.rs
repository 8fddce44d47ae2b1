// src/probe/request.rs
//! Scalar requests and the placeholder values offered for them.

use serde::de::Visitor;

use super::ProbeError;
use crate::shape::Primitive;

// ------------------------------- Policy ---------------------------------- //

/// Offered in order; later entries only after a decoder rejected earlier ones.
const STRING_PLACEHOLDERS: &[&str] = &[
    "",
    "0",
    "1970-01-01T00:00:00Z",
    "1970-01-01",
    "00000000-0000-0000-0000-000000000000",
    "http://localhost/",
];
const CHAR_PLACEHOLDERS: &[char] = &['a', '0'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Char,
    Str,
    String,
    Bytes,
    ByteBuf,
    Unit,
    Identifier,
}

impl Request {
    pub(crate) fn kind(self) -> Primitive {
        match self {
            Request::Bool => Primitive::Bool,
            Request::I8 => Primitive::Int8,
            Request::I16 => Primitive::Int16,
            Request::I32 => Primitive::Int32,
            Request::I64 | Request::I128 => Primitive::Int64,
            Request::U8 => Primitive::UInt8,
            Request::U16 => Primitive::UInt16,
            Request::U32 => Primitive::UInt32,
            Request::U64 | Request::U128 => Primitive::UInt64,
            Request::F32 => Primitive::Float,
            Request::F64 => Primitive::Double,
            Request::Char
            | Request::Str
            | Request::String
            | Request::Bytes
            | Request::ByteBuf
            | Request::Identifier => Primitive::String,
            Request::Unit => Primitive::Null,
        }
    }

    /// How many distinct placeholders exist for this request.
    pub(crate) fn candidates(self) -> usize {
        match self {
            Request::Str | Request::String | Request::Identifier => STRING_PLACEHOLDERS.len(),
            Request::Char => CHAR_PLACEHOLDERS.len(),
            Request::Bytes | Request::ByteBuf | Request::Unit => 1,
            _ => 2,
        }
    }

    /// Feeds placeholder number `attempt` (zero, then one, and so on).
    pub(crate) fn feed<'de, V: Visitor<'de>>(self, attempt: usize, visitor: V) -> Result<V::Value, ProbeError> {
        let n = attempt.min(self.candidates() - 1);
        let one = n == 1;
        match self {
            Request::Bool => visitor.visit_bool(one),
            Request::I8 => visitor.visit_i8(i8::from(one)),
            Request::I16 => visitor.visit_i16(i16::from(one)),
            Request::I32 => visitor.visit_i32(i32::from(one)),
            Request::I64 => visitor.visit_i64(i64::from(one)),
            Request::I128 => visitor.visit_i128(i128::from(one)),
            Request::U8 => visitor.visit_u8(u8::from(one)),
            Request::U16 => visitor.visit_u16(u16::from(one)),
            Request::U32 => visitor.visit_u32(u32::from(one)),
            Request::U64 => visitor.visit_u64(u64::from(one)),
            Request::U128 => visitor.visit_u128(u128::from(one)),
            Request::F32 => visitor.visit_f32(if one { 1.0 } else { 0.0 }),
            Request::F64 => visitor.visit_f64(if one { 1.0 } else { 0.0 }),
            Request::Char => visitor.visit_char(CHAR_PLACEHOLDERS[n]),
            Request::Str | Request::Identifier => visitor.visit_str(STRING_PLACEHOLDERS[n]),
            Request::String => visitor.visit_string(STRING_PLACEHOLDERS[n].to_string()),
            Request::Bytes => visitor.visit_bytes(b""),
            Request::ByteBuf => visitor.visit_byte_buf(Vec::new()),
            Request::Unit => visitor.visit_unit(),
        }
    }
}
