use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::trace;

use crate::{
    big_int::TtlvBigInt,
    error::{result::TtlvResult, TtlvError},
    registry::{normalize_name, Registry, Tag, TtlvType},
    ttlv_error,
    wire::{EncBuf, Ttlv},
};

pub struct TtlvJsonDeserializer;

impl TtlvJsonDeserializer {
    /// Parse a KMIP JSON value tree into canonical binary TTLV.
    pub fn from_json(value: &Value, registry: &Registry) -> TtlvResult<Vec<u8>> {
        let mut buf = EncBuf::new();
        Self::decode_node(&mut buf, value, registry, Tag::NONE)?;
        Ok(buf.into_vec())
    }

    /// Parse a KMIP JSON document into canonical binary TTLV.
    pub fn from_json_str(json: &str, registry: &Registry) -> TtlvResult<Vec<u8>> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value, registry)
    }

    /// A `"0x..."` escape holding exactly `width` bytes, or `None` when the
    /// string has no `0x` prefix.
    fn hex_value(s: &str, width: usize) -> TtlvResult<Option<Vec<u8>>> {
        let Some(digits) = s.strip_prefix("0x") else {
            return Ok(None);
        };
        let bytes = hex::decode(digits)?;
        if bytes.len() != width {
            return Err(TtlvError::InvalidNumber(s.to_owned()));
        }
        Ok(Some(bytes))
    }

    fn decode_node(
        buf: &mut EncBuf,
        value: &Value,
        registry: &Registry,
        attr_tag: Tag,
    ) -> TtlvResult<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| ttlv_error!("expected a JSON object"))?;
        let tag_str = obj
            .get("tag")
            .and_then(Value::as_str)
            .ok_or_else(|| ttlv_error!("missing tag"))?;
        let tag = registry
            .parse_tag(tag_str)
            .map_err(|e| e.context("invalid tag"))?;
        // a missing type member means Structure
        let item_type = match obj.get("type") {
            None => TtlvType::Structure,
            Some(Value::String(s)) => registry
                .parse_type(s)
                .map_err(|e| e.context("invalid type"))?,
            Some(_) => return Err(ttlv_error!("type must be a string")),
        };
        let v = obj
            .get("value")
            .ok_or_else(|| ttlv_error!("missing value"))?;
        trace!(tag = %registry.format_tag(tag), item_type = %item_type, "json member");

        let syntax =
            |e: TtlvError| e.context(format!("{}: invalid {item_type}", registry.format_tag(tag)));

        match item_type {
            TtlvType::Structure => {
                let children = v
                    .as_array()
                    .ok_or_else(|| syntax(ttlv_error!("must be an array")))?;
                let handle = buf.begin(tag);
                let mut child_attr_tag = Tag::NONE;
                for child in children {
                    let offset = buf.len();
                    Self::decode_node(buf, child, registry, child_attr_tag)?;
                    let written = Ttlv::new(&buf.bytes()[offset..]);
                    if written.tag() == Tag::ATTRIBUTE_NAME {
                        child_attr_tag = written
                            .value_text_string()
                            .ok()
                            .and_then(|s| registry.parse_tag(&normalize_name(s)).ok())
                            .unwrap_or(Tag::NONE);
                    }
                }
                buf.end(handle)?;
            }
            TtlvType::Boolean => match v {
                Value::Bool(b) => buf.encode_bool(tag, *b)?,
                Value::String(s) => match s.as_str() {
                    "0x0000000000000001" => buf.encode_bool(tag, true)?,
                    "0x0000000000000000" => buf.encode_bool(tag, false)?,
                    _ => {
                        return Err(syntax(ttlv_error!(
                            "hex string for Boolean value must be either 0x0000000000000001 \
                             (true) or 0x0000000000000000 (false)"
                        )))
                    }
                },
                _ => return Err(syntax(ttlv_error!("must be boolean or hex string"))),
            },
            TtlvType::TextString => {
                let s = v
                    .as_str()
                    .ok_or_else(|| syntax(ttlv_error!("must be string")))?;
                buf.encode_text_string(tag, s)?;
            }
            TtlvType::ByteString => {
                let s = v
                    .as_str()
                    .ok_or_else(|| syntax(ttlv_error!("must be hex string")))?;
                if s.starts_with("0x") {
                    return Err(syntax(TtlvError::InvalidHexPrefix));
                }
                let b = hex::decode(s).map_err(|e| syntax(e.into()))?;
                buf.encode_byte_string(tag, &b)?;
            }
            TtlvType::Interval => match v {
                Value::Number(n) => {
                    let seconds = n
                        .as_u64()
                        .and_then(|u| u32::try_from(u).ok())
                        .ok_or_else(|| syntax(TtlvError::InvalidNumber(n.to_string())))?;
                    buf.encode_interval(tag, seconds)?;
                }
                Value::String(s) => {
                    let bytes = Self::hex_value(s, 4)
                        .map_err(syntax)?
                        .ok_or_else(|| syntax(ttlv_error!("hex value must start with 0x")))?;
                    let mut raw = [0_u8; 4];
                    raw.copy_from_slice(&bytes);
                    buf.encode_interval(tag, u32::from_be_bytes(raw))?;
                }
                _ => return Err(syntax(ttlv_error!("must be number or hex string"))),
            },
            TtlvType::DateTime | TtlvType::DateTimeExtended => {
                let s = v
                    .as_str()
                    .ok_or_else(|| syntax(ttlv_error!("must be string")))?;
                let dt = match Self::hex_value(s, 8).map_err(syntax)? {
                    Some(bytes) => {
                        let mut raw = [0_u8; 8];
                        raw.copy_from_slice(&bytes);
                        let units = i64::from_be_bytes(raw);
                        let nanos = if item_type == TtlvType::DateTime {
                            i128::from(units) * 1_000_000_000
                        } else {
                            i128::from(units) * 1_000
                        };
                        OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|e| syntax(e.into()))?
                    }
                    None => OffsetDateTime::parse(s, &Rfc3339).map_err(|_e| {
                        syntax(TtlvError::InvalidDateTime(format!(
                            "must be ISO8601 format: {s}"
                        )))
                    })?,
                };
                if item_type == TtlvType::DateTime {
                    buf.encode_date_time(tag, dt)?;
                } else {
                    buf.encode_date_time_extended(tag, dt)?;
                }
            }
            TtlvType::Integer => {
                let eff = if tag == Tag::ATTRIBUTE_VALUE && attr_tag != Tag::NONE {
                    attr_tag
                } else {
                    tag
                };
                match v {
                    Value::Number(n) => {
                        let i = n
                            .as_i64()
                            .and_then(|i| i32::try_from(i).ok())
                            .ok_or_else(|| syntax(TtlvError::InvalidNumber(n.to_string())))?;
                        buf.encode_int(tag, i)?;
                    }
                    Value::String(s) => {
                        let i = registry.parse_int(eff, s).map_err(syntax)?;
                        buf.encode_int(tag, i)?;
                    }
                    _ => {
                        return Err(syntax(ttlv_error!(
                            "must be number, hex string, or mask value name"
                        )))
                    }
                }
            }
            TtlvType::LongInteger => match v {
                Value::Number(n) => {
                    let i = n
                        .as_i64()
                        .ok_or_else(|| syntax(TtlvError::InvalidNumber(n.to_string())))?;
                    buf.encode_long_int(tag, i)?;
                }
                Value::String(s) => {
                    let bytes = Self::hex_value(s, 8)
                        .map_err(syntax)?
                        .ok_or_else(|| syntax(ttlv_error!("hex value must start with 0x")))?;
                    let mut raw = [0_u8; 8];
                    raw.copy_from_slice(&bytes);
                    buf.encode_long_int(tag, i64::from_be_bytes(raw))?;
                }
                _ => return Err(syntax(ttlv_error!("must be number or hex string"))),
            },
            TtlvType::BigInteger => match v {
                Value::Number(n) => {
                    let i = n
                        .as_i64()
                        .ok_or_else(|| syntax(TtlvError::InvalidNumber(n.to_string())))?;
                    buf.encode_big_int(tag, &TtlvBigInt::from(i))?;
                }
                Value::String(s) => {
                    let digits = s
                        .strip_prefix("0x")
                        .ok_or_else(|| syntax(ttlv_error!("hex value must start with 0x")))?;
                    let b = hex::decode(digits).map_err(|e| syntax(e.into()))?;
                    if b.is_empty() || b.len() % 8 != 0 {
                        return Err(syntax(TtlvError::BigIntegerBadAlignment));
                    }
                    buf.encode_big_int(tag, &TtlvBigInt::from_bytes_be(&b))?;
                }
                _ => return Err(syntax(ttlv_error!("must be number or hex string"))),
            },
            TtlvType::Enumeration => {
                let eff = if tag == Tag::ATTRIBUTE_VALUE && attr_tag != Tag::NONE {
                    attr_tag
                } else {
                    tag
                };
                match v {
                    Value::Number(n) => {
                        let e = n
                            .as_u64()
                            .and_then(|u| u32::try_from(u).ok())
                            .ok_or_else(|| syntax(TtlvError::InvalidNumber(n.to_string())))?;
                        buf.encode_enum(tag, e)?;
                    }
                    Value::String(s) => {
                        let e = registry.parse_enum(eff, s).map_err(syntax)?;
                        buf.encode_enum(tag, e)?;
                    }
                    _ => return Err(syntax(ttlv_error!("must be number or string"))),
                }
            }
        }
        Ok(())
    }
}
