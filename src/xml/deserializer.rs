use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::trace;

use crate::{
    big_int::TtlvBigInt,
    error::{
        result::{TtlvResult, TtlvResultHelper},
        TtlvError,
    },
    registry::{normalize_name, Registry, Tag, TtlvType},
    ttlv_error,
    wire::{EncBuf, Ttlv},
};

/// One parsed XML element: KMIP XML carries everything in attributes, so
/// text content is ignored.
#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    tag_attr: Option<String>,
    type_attr: Option<String>,
    value: String,
    children: Vec<XmlNode>,
}

pub struct TtlvXmlDeserializer;

impl TtlvXmlDeserializer {
    /// Parse KMIP XML into canonical binary TTLV.
    pub fn from_xml(xml: &str, registry: &Registry) -> TtlvResult<Vec<u8>> {
        let root = Self::parse_tree(xml)?;
        let mut buf = EncBuf::new();
        Self::encode_node(&mut buf, &root, registry, Tag::NONE)?;
        Ok(buf.into_vec())
    }

    fn node_from(e: &BytesStart<'_>) -> TtlvResult<XmlNode> {
        let mut node = XmlNode {
            name: String::from_utf8(e.name().as_ref().to_vec())?,
            ..XmlNode::default()
        };
        for attr in e.attributes() {
            let attr = attr.context("XML attribute error")?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.as_ref() {
                b"tag" => node.tag_attr = Some(value),
                b"type" => node.type_attr = Some(value),
                b"value" => node.value = value,
                _ => {}
            }
        }
        Ok(node)
    }

    fn parse_tree(xml: &str) -> TtlvResult<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlNode> = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => stack.push(Self::node_from(&e)?),
                Ok(Event::Empty(e)) => {
                    let node = Self::node_from(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack.pop().ok_or_else(|| ttlv_error!("unbalanced XML"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
            buf.clear();
        }
        Err(ttlv_error!("no root element"))
    }

    fn encode_node(
        buf: &mut EncBuf,
        node: &XmlNode,
        registry: &Registry,
        attr_tag: Tag,
    ) -> TtlvResult<()> {
        let tag_str = node.tag_attr.as_deref().unwrap_or(&node.name);
        let tag = registry
            .parse_tag(tag_str)
            .map_err(|e| e.context("invalid tag"))?;
        // a missing type attribute means Structure
        let item_type = match node.type_attr.as_deref() {
            None => TtlvType::Structure,
            Some(s) => registry
                .parse_type(s)
                .map_err(|e| e.context("invalid type"))?,
        };
        trace!(tag = %registry.format_tag(tag), item_type = %item_type, "xml element");

        let syntax =
            |e: TtlvError| e.context(format!("{}: invalid {item_type}", registry.format_tag(tag)));
        let value = node.value.as_str();

        match item_type {
            TtlvType::Structure => {
                let handle = buf.begin(tag);
                let mut child_attr_tag = Tag::NONE;
                for child in &node.children {
                    let offset = buf.len();
                    Self::encode_node(buf, child, registry, child_attr_tag)?;
                    // if the child we just encoded is an AttributeName, its
                    // text selects the effective tag for the sibling
                    // AttributeValue
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
            TtlvType::Boolean => {
                let b = match value {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(syntax(ttlv_error!("must be 0, 1, true, or false"))),
                };
                buf.encode_bool(tag, b)?;
            }
            TtlvType::TextString => buf.encode_text_string(tag, value)?,
            TtlvType::ByteString => {
                if value.starts_with("0x") {
                    return Err(syntax(TtlvError::InvalidHexPrefix));
                }
                let b = hex::decode(value).map_err(|e| syntax(e.into()))?;
                buf.encode_byte_string(tag, &b)?;
            }
            TtlvType::Interval => {
                let v = value
                    .parse::<u32>()
                    .map_err(|_e| syntax(TtlvError::InvalidNumber(value.to_owned())))?;
                buf.encode_interval(tag, v)?;
            }
            TtlvType::DateTime | TtlvType::DateTimeExtended => {
                let dt = OffsetDateTime::parse(value, &Rfc3339).map_err(|_e| {
                    syntax(TtlvError::InvalidDateTime(format!(
                        "must be ISO8601 format: {value}"
                    )))
                })?;
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
                let v = registry
                    .parse_int(eff, &value.replace(' ', "|"))
                    .map_err(syntax)?;
                buf.encode_int(tag, v)?;
            }
            TtlvType::LongInteger => {
                let v = value
                    .parse::<i64>()
                    .map_err(|_e| syntax(TtlvError::InvalidNumber(value.to_owned())))?;
                buf.encode_long_int(tag, v)?;
            }
            TtlvType::BigInteger => {
                if value.starts_with("0x") {
                    return Err(syntax(TtlvError::InvalidHexPrefix));
                }
                let b = hex::decode(value).map_err(|e| syntax(e.into()))?;
                if b.is_empty() || b.len() % 8 != 0 {
                    return Err(syntax(TtlvError::BigIntegerBadAlignment));
                }
                buf.encode_big_int(tag, &TtlvBigInt::from_bytes_be(&b))?;
            }
            TtlvType::Enumeration => {
                let eff = if tag == Tag::ATTRIBUTE_VALUE && attr_tag != Tag::NONE {
                    attr_tag
                } else {
                    tag
                };
                let v = registry.parse_enum(eff, value).map_err(syntax)?;
                buf.encode_enum(tag, v)?;
            }
        }
        Ok(())
    }
}
