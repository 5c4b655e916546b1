//! The KMIP JSON encoding of TTLV.
//!
//! Every block renders as `{"tag": ..., "type": ..., "value": ...}`, with
//! `type` omitted for Structures. Integer values that cannot survive a
//! double-precision JSON parser (|v| at or beyond 2^52) are emitted as
//! `"0x..."` hex strings of the raw value bytes instead of numbers.

mod deserializer;
mod serializer;

pub use deserializer::TtlvJsonDeserializer;
pub use serializer::TtlvJsonSerializer;

/// Largest magnitude emitted as a JSON number.
pub(crate) const MAX_JSON_INT: i64 = 1 << 52;
