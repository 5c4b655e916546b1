use time::macros::datetime;

use crate::{
    hex_to_bytes, EncBuf, Registry, Tag, Ttlv, TtlvBigInt, TtlvError, TtlvXmlDeserializer,
    TtlvXmlSerializer,
};

fn round_trip(bytes: &[u8], registry: &Registry) -> String {
    let xml = TtlvXmlSerializer::to_xml(Ttlv::new(bytes), registry).unwrap();
    let back = TtlvXmlDeserializer::from_xml(&xml, registry).unwrap();
    assert_eq!(back, bytes, "XML round trip diverged:\n{xml}");
    xml
}

#[test]
fn test_every_type_round_trips() {
    let registry = Registry::baseline();
    let mut buf = EncBuf::new();
    let root = buf.begin(Tag::new(0x42_0078));
    buf.encode_int(Tag::new(0x42_000D), 42).unwrap();
    buf.encode_long_int(Tag::new(0x54_0001), -9_000_000_000).unwrap();
    buf.encode_big_int(
        Tag::new(0x54_0002),
        &TtlvBigInt::from(num_bigint_dig::BigInt::from(i64::MAX) * num_bigint_dig::BigInt::from(3)),
    )
    .unwrap();
    buf.encode_enum(Tag::new(0x42_005C), 0x18).unwrap();
    buf.encode_bool(Tag::new(0x54_0003), false).unwrap();
    buf.encode_text_string(Tag::new(0x42_0094), "pubkey").unwrap();
    buf.encode_byte_string(Tag::new(0x42_0093), &[0x36, 0x00, 0x01]).unwrap();
    buf.encode_date_time(Tag::new(0x54_0004), datetime!(2008-03-14 11:56:40 UTC))
        .unwrap();
    buf.encode_date_time_extended(
        Tag::new(0x54_0005),
        datetime!(2008-03-14 11:56:40.123456 UTC),
    )
    .unwrap();
    buf.encode_interval(Tag::new(0x54_0006), 864_000).unwrap();
    buf.end(root).unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(xml.contains("<RequestMessage>"));
    assert!(xml.contains(r#"<Operation type="Enumeration" value="Query"/>"#));
    assert!(xml.contains(r#"<UniqueIdentifier type="TextString" value="pubkey"/>"#));
    // unregistered tags render as the generic element
    assert!(xml.contains(r#"<TTLV tag="0x540001" type="LongInteger" value="-9000000000"/>"#));
    assert!(xml.contains(r#"value="2008-03-14T11:56:40Z""#));
    assert!(xml.contains(r#"value="2008-03-14T11:56:40.123456Z""#));
    assert!(xml.contains(r#"value="360001""#));
}

#[test]
fn test_mask_values_are_space_separated() {
    let registry = Registry::baseline();
    let mut buf = EncBuf::new();
    buf.encode_int(Tag::new(0x42_002C), 0x0C).unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(
        xml.contains(r#"<CryptographicUsageMask type="Integer" value="Encrypt Decrypt"/>"#),
        "{xml}"
    );
}

#[test]
fn test_attribute_name_selects_effective_tag() {
    let registry = Registry::baseline();
    let mut buf = EncBuf::new();
    let attr = buf.begin(Tag::new(0x42_0008));
    buf.encode_text_string(Tag::ATTRIBUTE_NAME, "Key Format Type")
        .unwrap();
    buf.encode_enum(Tag::ATTRIBUTE_VALUE, 2).unwrap();
    buf.end(attr).unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(
        xml.contains(r#"<AttributeValue type="Enumeration" value="X_509"/>"#),
        "{xml}"
    );

    // the coupling also resolves mask names on the value side
    let mut buf = EncBuf::new();
    let attr = buf.begin(Tag::new(0x42_0008));
    buf.encode_text_string(Tag::ATTRIBUTE_NAME, "Cryptographic Usage Mask")
        .unwrap();
    buf.encode_int(Tag::ATTRIBUTE_VALUE, 0x03).unwrap();
    buf.end(attr).unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(
        xml.contains(r#"<AttributeValue type="Integer" value="Sign Verify"/>"#),
        "{xml}"
    );
}

#[test]
fn test_big_integer_renders_padded_upper_hex() {
    let registry = Registry::baseline();
    let mut buf = EncBuf::new();
    buf.encode_big_int(
        Tag::new(0x54_0002),
        &TtlvBigInt::from(num_bigint_dig::BigInt::from(1_234_567_890)),
    )
    .unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(xml.contains(r#"value="00000000499602D2""#), "{xml}");
}

#[test]
fn test_byte_string_rejects_hex_prefix() {
    let registry = Registry::baseline();
    let xml = r#"<UniqueBatchItemID type="ByteString" value="0x360001"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert!(matches!(err.root_cause(), TtlvError::InvalidHexPrefix));
    assert_eq!(
        err.to_string(),
        "UniqueBatchItemID: invalid ByteString: should not have 0x prefix"
    );
}

#[test]
fn test_big_integer_rejects_hex_prefix_and_bad_alignment() {
    let registry = Registry::baseline();
    let xml = r#"<TTLV tag="0x540002" type="BigInteger" value="0x00000000499602D2"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert!(matches!(err.root_cause(), TtlvError::InvalidHexPrefix));

    let xml = r#"<TTLV tag="0x540002" type="BigInteger" value="499602D2"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        TtlvError::BigIntegerBadAlignment
    ));
}

#[test]
fn test_syntax_errors_name_tag_and_type() {
    let registry = Registry::baseline();

    let xml = r#"<KeyFormatType type="Enumeration" value="NoSuchVariant"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert_eq!(
        err.to_string(),
        "KeyFormatType: invalid Enumeration: unknown name: NoSuchVariant"
    );

    let xml = r#"<BatchItem type="Boolean" value="maybe"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert_eq!(
        err.to_string(),
        "BatchItem: invalid Boolean: must be 0, 1, true, or false"
    );

    let xml = r#"<NoSuchTag type="Integer" value="1"/>"#;
    let err = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap_err();
    assert!(matches!(err.root_cause(), TtlvError::UnknownTag(_)));
    assert!(err.to_string().starts_with("invalid tag:"));
}

#[test]
fn test_parse_accepts_nested_document() {
    let registry = Registry::baseline();
    let xml = r#"<RequestMessage>
  <RequestHeader>
    <ProtocolVersion>
      <ProtocolVersionMajor type="Integer" value="2"/>
      <ProtocolVersionMinor type="Integer" value="1"/>
    </ProtocolVersion>
    <BatchCount type="Integer" value="1"/>
  </RequestHeader>
  <BatchItem>
    <Operation type="Enumeration" value="Activate"/>
    <RequestPayload>
      <UniqueIdentifier type="TextString" value="uid-0"/>
    </RequestPayload>
  </BatchItem>
</RequestMessage>"#;

    let bytes = TtlvXmlDeserializer::from_xml(xml, &registry).unwrap();
    let t = Ttlv::new(&bytes);
    t.valid().unwrap();
    assert_eq!(t.tag(), Tag::new(0x42_0078));
    // RequestHeader / ProtocolVersion / ProtocolVersionMajor
    let header = t.value_structure();
    let version = header.value_structure();
    assert_eq!(version.tag(), Tag::new(0x42_0069));
    assert_eq!(version.value_structure().value_integer(), 2);

    // and the emitted form converges
    round_trip(&bytes, &registry);
}

#[test]
fn test_unknown_tag_element_round_trips() {
    let registry = Registry::baseline();
    let mut buf = EncBuf::new();
    let root = buf.begin(Tag::new(0x54_0010));
    buf.encode_int(Tag::new(0x54_0011), 7).unwrap();
    buf.end(root).unwrap();
    let bytes = buf.into_vec();

    let xml = round_trip(&bytes, &registry);
    assert!(xml.contains(r#"<TTLV tag="0x540010">"#), "{xml}");
}

#[test]
fn test_canonical_scenario_bytes_round_trip() {
    let registry = Registry::baseline();
    let bytes = hex_to_bytes(
        "42 00 20 | 01 | 00 00 00 20 | 42 00 04 | 05 | 00 00 00 04 | 00 00 00 FE 00 00 00 00 | \
         42 00 05 | 02 | 00 00 00 04 | 00 00 00 FF 00 00 00 00",
    )
    .unwrap();
    round_trip(&bytes, &registry);
}
