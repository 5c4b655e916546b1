//! The KMIP XML encoding of TTLV.
//!
//! Element names are canonical tag names (`<TTLV tag="0x...">` for
//! unregistered tags); `type` and `value` attributes are omitted for
//! Structures, whose children nest as child elements.

mod deserializer;
mod serializer;

pub use deserializer::TtlvXmlDeserializer;
pub use serializer::TtlvXmlSerializer;
