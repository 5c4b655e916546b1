//! Core codec for the KMIP TTLV (Tag-Type-Length-Value) wire encoding.
//!
//! Three encodings interoperate losslessly: the canonical binary form, the
//! KMIP XML encoding, and the KMIP JSON encoding. Binary blobs are
//! inspected zero-copy through [`Ttlv`] views; [`EncBuf`] builds new blobs;
//! the text codecs translate in both directions through an injected
//! [`Registry`] that maps tags, enumerations, and bitmask values to their
//! canonical names, including the context-sensitive
//! AttributeName/AttributeValue coupling.

#![deny(
    nonstandard_style,
    refining_impl_trait,
    future_incompatible,
    keyword_idents,
    unreachable_pub,
    unsafe_code,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic,

    // restriction lints
    clippy::unwrap_used,
    clippy::get_unwrap,
    clippy::expect_used,
    clippy::unwrap_in_result,
    clippy::assertions_on_result_states,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::verbose_file_reads,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::unreachable,
    clippy::print_stdout,
    clippy::map_err_ignore,
    clippy::redundant_clone,
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::redundant_pub_crate,
    clippy::cognitive_complexity
)]

mod big_int;
pub mod error;
pub mod json;
mod registry;
mod wire;
pub mod xml;

pub use big_int::TtlvBigInt;
pub use error::{
    result::{TtlvResult, TtlvResultHelper},
    TtlvError,
};
pub use json::{TtlvJsonDeserializer, TtlvJsonSerializer};
pub use registry::{normalize_name, EnumDescriptor, Registry, Tag, TtlvType};
pub use wire::{print, print_pretty_hex, Children, EncBuf, StructureHandle, Ttlv, TtlvValue};
pub use xml::{TtlvXmlDeserializer, TtlvXmlSerializer};

/// Convert a hex string to bytes, stripping any non-hex characters first.
/// Convenient for the whitespace-and-pipe annotated hex used in test
/// vectors and protocol traces.
pub fn hex_to_bytes(s: &str) -> TtlvResult<Vec<u8>> {
    let filtered: String = s.chars().filter(char::is_ascii_hexdigit).collect();
    Ok(hex::decode(filtered)?)
}

#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::as_conversions
)]
#[cfg(test)]
mod tests;
