use quick_xml::{
    events::{BytesStart, Event},
    Writer,
};
use time::format_description::well_known::Rfc3339;

use crate::{
    error::{result::TtlvResult, TtlvError},
    registry::{normalize_name, Registry, Tag, TtlvType},
    wire::Ttlv,
};

pub struct TtlvXmlSerializer;

impl TtlvXmlSerializer {
    /// Render a valid TTLV block as KMIP XML.
    pub fn to_xml(t: Ttlv<'_>, registry: &Registry) -> TtlvResult<String> {
        t.valid()?;
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        Self::write_node(&mut writer, t, registry, t.tag())?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_node(
        w: &mut Writer<Vec<u8>>,
        t: Ttlv<'_>,
        registry: &Registry,
        effective_tag: Tag,
    ) -> TtlvResult<()> {
        let tag = t.tag();
        let item_type = t.item_type()?;

        // unregistered tags fall back to a generic element with a tag
        // attribute, per the KMIP XML profile
        let name = registry
            .name_of(tag)
            .map_or_else(|| "TTLV".to_owned(), str::to_owned);
        let mut elem = BytesStart::new(name.clone());
        if registry.name_of(tag).is_none() {
            elem.push_attribute(("tag", tag.to_string().as_str()));
        }

        if item_type == TtlvType::Structure {
            w.write_event(Event::Start(elem))?;
            let mut attr_tag = Tag::NONE;
            for child in t.children() {
                if child.tag() == Tag::ATTRIBUTE_NAME {
                    // the attribute name decides how the sibling
                    // AttributeValue renders its enumeration or mask
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
                Self::write_node(w, child, registry, eff)?;
            }
            w.write_event(Event::End(BytesStart::new(name).to_end()))?;
            return Ok(());
        }

        elem.push_attribute(("type", item_type.to_string().as_str()));
        let value = Self::primitive_value(t, item_type, registry, effective_tag)?;
        elem.push_attribute(("value", value.as_str()));
        w.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn primitive_value(
        t: Ttlv<'_>,
        item_type: TtlvType,
        registry: &Registry,
        effective_tag: Tag,
    ) -> TtlvResult<String> {
        Ok(match item_type {
            TtlvType::Structure => {
                return Err(TtlvError::Syntax(
                    "cannot render a Structure as an XML value attribute".to_owned(),
                ));
            }
            // XML uses a space separator between mask value names
            TtlvType::Integer => registry
                .format_int(effective_tag, t.value_integer())
                .replace('|', " "),
            TtlvType::LongInteger => t.value_long_integer().to_string(),
            TtlvType::BigInteger => hex::encode_upper(t.value_raw()),
            TtlvType::Enumeration => registry.format_enum(effective_tag, t.value_enumeration()),
            TtlvType::Boolean => t.value_boolean().to_string(),
            TtlvType::TextString => t.value_text_string()?.to_owned(),
            TtlvType::ByteString => hex::encode(t.value_byte_string()),
            TtlvType::DateTime => t.value_date_time()?.format(&Rfc3339)?,
            TtlvType::DateTimeExtended => t.value_date_time_extended()?.format(&Rfc3339)?,
            TtlvType::Interval => t.value_interval().to_string(),
        })
    }
}
