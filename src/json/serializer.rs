use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;

use super::MAX_JSON_INT;
use crate::{
    error::result::TtlvResult,
    registry::{normalize_name, EnumDescriptor, Registry, Tag, TtlvType},
    wire::Ttlv,
};

pub struct TtlvJsonSerializer;

impl TtlvJsonSerializer {
    /// Render a valid TTLV block as a KMIP JSON value tree.
    pub fn to_json(t: Ttlv<'_>, registry: &Registry) -> TtlvResult<Value> {
        t.valid()?;
        Self::node_value(t, registry, t.tag())
    }

    /// Render a valid TTLV block as a KMIP JSON string.
    pub fn to_json_string(t: Ttlv<'_>, registry: &Registry) -> TtlvResult<String> {
        Ok(serde_json::to_string(&Self::to_json(t, registry)?)?)
    }

    fn node_value(t: Ttlv<'_>, registry: &Registry, effective_tag: Tag) -> TtlvResult<Value> {
        let tag = t.tag();
        let item_type = t.item_type()?;

        let mut obj = Map::new();
        obj.insert("tag".to_owned(), Value::String(registry.format_tag(tag)));
        if item_type != TtlvType::Structure {
            obj.insert("type".to_owned(), Value::String(item_type.to_string()));
        }

        let value = match item_type {
            TtlvType::Structure => {
                let mut children = Vec::new();
                let mut attr_tag = Tag::NONE;
                for child in t.children() {
                    if child.tag() == Tag::ATTRIBUTE_NAME {
                        attr_tag = child
                            .value_text_string()
                            .ok()
                            .and_then(|s| registry.parse_tag(&normalize_name(s)).ok())
                            .unwrap_or(Tag::NONE);
                    }
                    let eff = if child.tag() == Tag::ATTRIBUTE_VALUE && attr_tag != Tag::NONE {
                        attr_tag
                    } else {
                        child.tag()
                    };
                    children.push(Self::node_value(child, registry, eff)?);
                }
                Value::Array(children)
            }
            TtlvType::Integer => {
                if registry
                    .enum_for_tag(effective_tag)
                    .is_some_and(EnumDescriptor::is_bitmask)
                {
                    Value::String(registry.format_int(effective_tag, t.value_integer()))
                } else {
                    Value::from(t.value_integer())
                }
            }
            TtlvType::LongInteger => {
                let v = t.value_long_integer();
                if v <= -MAX_JSON_INT || v >= MAX_JSON_INT {
                    Self::hex_escape(t)
                } else {
                    Value::from(v)
                }
            }
            TtlvType::BigInteger => {
                let v = t.value_big_integer();
                match v.to_i64() {
                    Some(small) if small > -MAX_JSON_INT && small < MAX_JSON_INT => {
                        Value::from(small)
                    }
                    _ => Self::hex_escape(t),
                }
            }
            TtlvType::Enumeration => {
                Value::String(registry.format_enum(effective_tag, t.value_enumeration()))
            }
            TtlvType::Boolean => Value::Bool(t.value_boolean()),
            TtlvType::TextString => Value::String(t.value_text_string()?.to_owned()),
            TtlvType::ByteString => Value::String(hex::encode(t.value_byte_string())),
            TtlvType::DateTime => Value::String(t.value_date_time()?.format(&Rfc3339)?),
            TtlvType::DateTimeExtended => {
                Value::String(t.value_date_time_extended()?.format(&Rfc3339)?)
            }
            TtlvType::Interval => Value::from(t.value_interval()),
        };
        obj.insert("value".to_owned(), value);
        Ok(Value::Object(obj))
    }

    /// The raw value bytes as a `"0x..."` string, protecting integers from
    /// silent precision loss in JSON numeric parsers.
    fn hex_escape(t: Ttlv<'_>) -> Value {
        Value::String(format!("0x{}", hex::encode(t.value_raw())))
    }
}
