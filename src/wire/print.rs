//! Best-effort diagnostic rendering of TTLV buffers.
//!
//! Both printers tolerate damaged input: the tree view shows the error and
//! the offending region inline, then gives up on the rest of the stream
//! (there are no markers to pick back up again past a bad block).

use std::fmt::{self, Write};

use super::view::Ttlv;
use crate::{
    error::TtlvError,
    registry::{Registry, TtlvType},
};

/// Render the block as an indented tree, one line per node, with registry
/// names for tags and enumeration values.
pub fn print<W: Write>(
    w: &mut W,
    prefix: &str,
    indent: &str,
    t: Ttlv<'_>,
    registry: &Registry,
) -> fmt::Result {
    let tag = t.tag();
    let type_name = t
        .item_type()
        .map_or_else(|_e| format!("0x{:02x}", t.type_byte()), |tp| tp.to_string());

    write!(
        w,
        "{prefix}{} ({type_name}/{}):",
        registry.format_tag(tag),
        t.len()
    )?;

    if let Err(err) = t.valid() {
        write!(w, " ({err})")?;
        // a bare sentinel means this block itself is damaged; a wrapped
        // error means a descendant is, and the recursion below will show
        // the fault in place
        match err {
            TtlvError::HeaderTruncated => {
                // as much of the truncated header as we have
                return write!(w, " 0x{}", hex::encode(t.as_bytes()));
            }
            TtlvError::InvalidLen
            | TtlvError::ValueTruncated
            | TtlvError::InvalidTag
            | TtlvError::InvalidType => {
                return write!(w, " 0x{}", hex::encode(t.value_raw()));
            }
            _ => {}
        }
    }

    match t.item_type() {
        Ok(TtlvType::Structure) => {
            let child_prefix = format!("{prefix}{indent}");
            for child in t.children() {
                writeln!(w)?;
                print(w, &child_prefix, indent, child, registry)?;
            }
            Ok(())
        }
        Ok(TtlvType::Enumeration) => {
            write!(w, " {}", registry.format_enum(tag, t.value_enumeration()))
        }
        Ok(TtlvType::Integer) => {
            write!(w, " {}", registry.format_int(tag, t.value_integer()))
        }
        Ok(TtlvType::LongInteger) => write!(w, " {}", t.value_long_integer()),
        Ok(TtlvType::BigInteger) => write!(w, " {}", t.value_big_integer()),
        Ok(TtlvType::Boolean) => write!(w, " {}", t.value_boolean()),
        Ok(TtlvType::TextString) => match t.value_text_string() {
            Ok(s) => write!(w, " {s}"),
            Err(e) => write!(w, " ({e})"),
        },
        Ok(TtlvType::ByteString) => write!(w, " 0x{}", hex::encode(t.value_byte_string())),
        Ok(TtlvType::DateTime) => match t.value_date_time() {
            Ok(dt) => write!(w, " {dt}"),
            Err(e) => write!(w, " ({e})"),
        },
        Ok(TtlvType::DateTimeExtended) => match t.value_date_time_extended() {
            Ok(dt) => write!(w, " {dt}"),
            Err(e) => write!(w, " ({e})"),
        },
        Ok(TtlvType::Interval) => write!(w, " {}", t.value_interval()),
        Err(_) => Ok(()),
    }
}

/// Render the block as a `tag | type | length | value` hex dump, nested
/// structures indented. Invalid input renders as `??? <hex>`.
pub fn print_pretty_hex<W: Write>(
    w: &mut W,
    prefix: &str,
    indent: &str,
    t: Ttlv<'_>,
) -> fmt::Result {
    if t.valid().is_err() {
        return write!(w, "??? {}", hex::encode(t.as_bytes()));
    }
    let bytes = t.as_bytes();
    write!(
        w,
        "{prefix}{} | {} | {}",
        hex::encode(&bytes[0..3]),
        hex::encode(&bytes[3..4]),
        hex::encode(&bytes[4..8])
    )?;

    if matches!(t.item_type(), Ok(TtlvType::Structure)) {
        let child_prefix = format!("{prefix}{indent}");
        for child in t.children() {
            writeln!(w)?;
            print_pretty_hex(w, &child_prefix, indent, child)?;
        }
        Ok(())
    } else {
        // the value segment including its trailing padding
        let full = t.full_len().map_err(|_e| fmt::Error)?;
        write!(w, " | {}", hex::encode(&bytes[8..full]))
    }
}

impl fmt::Display for Ttlv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print(f, "", "  ", *self, &Registry::new())
    }
}
