use std::{collections::HashMap, fmt};

use crate::{
    error::{result::TtlvResult, TtlvError},
    ttlv_ensure,
};

/// A KMIP tag: a 24-bit field identifier.
///
/// Canonical tags have the high byte `0x42`; vendor extensions use `0x54`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Tag(u32);

impl Tag {
    pub const NONE: Self = Self(0);
    pub const ATTRIBUTE_NAME: Self = Self(0x0042_000A);
    pub const ATTRIBUTE_VALUE: Self = Self(0x0042_000B);

    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

/// The KMIP item type octet.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::FromRepr,
)]
#[repr(u8)]
pub enum TtlvType {
    Structure = 0x01,
    Integer = 0x02,
    LongInteger = 0x03,
    BigInteger = 0x04,
    Enumeration = 0x05,
    Boolean = 0x06,
    TextString = 0x07,
    ByteString = 0x08,
    DateTime = 0x09,
    Interval = 0x0A,
    DateTimeExtended = 0x0B,
}

impl TryFrom<u8> for TtlvType {
    type Error = TtlvError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(TtlvError::InvalidType)
    }
}

/// Transform a name into its canonical form: alphanumeric words, each with
/// its initial letter capitalized, concatenated. `"Key Format Type"`
/// becomes `"KeyFormatType"`.
#[must_use]
pub fn normalize_name(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if word_start {
                out.extend(c.to_uppercase());
                word_start = false;
            } else {
                out.push(c);
            }
        } else {
            word_start = true;
        }
    }
    out
}

/// The case-insensitive lookup key of a name: its alphanumerics, lowercased.
fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The enumeration or bitmask binding of a tag.
#[derive(Debug, Clone, Default)]
pub struct EnumDescriptor {
    bitmask: bool,
    by_value: HashMap<u32, String>,
    by_key: HashMap<String, u32>,
    // ascending, drives deterministic mask formatting
    values: Vec<u32>,
}

impl EnumDescriptor {
    fn new(bitmask: bool, variants: &[(u32, &str)]) -> Self {
        let mut desc = Self {
            bitmask,
            ..Self::default()
        };
        for (value, name) in variants {
            desc.by_value.insert(*value, (*name).to_owned());
            desc.by_key.insert(normalize_key(name), *value);
            desc.values.push(*value);
        }
        desc.values.sort_unstable();
        desc
    }

    #[must_use]
    pub fn is_bitmask(&self) -> bool {
        self.bitmask
    }

    #[must_use]
    pub fn name_of(&self, value: u32) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }

    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.by_key.get(&normalize_key(name)).copied()
    }

    #[must_use]
    pub fn values(&self) -> &[u32] {
        &self.values
    }
}

/// Bidirectional tag/enumeration/bitmask name dictionary.
///
/// The registry is deterministic and side-effect-free: populate it once,
/// then share it immutably. Codecs take `&Registry` so tests can inject
/// their own. Population from KMIP profile documents is the caller's
/// concern; [`Registry::baseline`] ships the canonical tags this crate's
/// own tests rely on.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    names: HashMap<Tag, String>,
    tags: HashMap<String, Tag>,
    enums: HashMap<Tag, EnumDescriptor>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tag(&mut self, tag: Tag, name: &str) {
        self.names.insert(tag, name.to_owned());
        self.tags.insert(normalize_key(name), tag);
    }

    pub fn register_enum(&mut self, tag: Tag, variants: &[(u32, &str)]) {
        self.enums.insert(tag, EnumDescriptor::new(false, variants));
    }

    pub fn register_mask(&mut self, tag: Tag, variants: &[(u32, &str)]) {
        self.enums.insert(tag, EnumDescriptor::new(true, variants));
    }

    /// The canonical name of a tag, when registered.
    #[must_use]
    pub fn name_of(&self, tag: Tag) -> Option<&str> {
        self.names.get(&tag).map(String::as_str)
    }

    /// The canonical name of a tag, or its `0x`-prefixed six-hex-digit form.
    #[must_use]
    pub fn format_tag(&self, tag: Tag) -> String {
        self.name_of(tag)
            .map_or_else(|| tag.to_string(), str::to_owned)
    }

    /// Parse a tag from its canonical name, a normalized variant of it
    /// (spaces/hyphens removed, any case), or a `0x`-prefixed six-hex-digit
    /// value.
    pub fn parse_tag(&self, s: &str) -> TtlvResult<Tag> {
        if let Some(hex_digits) = s.strip_prefix("0x") {
            ttlv_ensure!(
                hex_digits.len() == 6,
                TtlvError::InvalidNumber(s.to_owned())
            );
            let value = u32::from_str_radix(hex_digits, 16)
                .map_err(|_e| TtlvError::InvalidNumber(s.to_owned()))?;
            return Ok(Tag::new(value));
        }
        self.tags
            .get(&normalize_key(s))
            .copied()
            .ok_or_else(|| TtlvError::UnknownTag(s.to_owned()))
    }

    /// Parse a type from its name or a `0x`-prefixed octet value.
    pub fn parse_type(&self, s: &str) -> TtlvResult<TtlvType> {
        if let Some(hex_digits) = s.strip_prefix("0x") {
            let value = u8::from_str_radix(hex_digits, 16)
                .map_err(|_e| TtlvError::InvalidNumber(s.to_owned()))?;
            return TtlvType::try_from(value);
        }
        s.parse::<TtlvType>().map_err(|_e| TtlvError::InvalidType)
    }

    /// The name of an enumeration value under this tag, or its
    /// `0x`-prefixed eight-hex-digit form.
    #[must_use]
    pub fn format_enum(&self, tag: Tag, value: u32) -> String {
        self.enums
            .get(&tag)
            .and_then(|desc| desc.name_of(value))
            .map_or_else(|| format!("0x{value:08x}"), str::to_owned)
    }

    /// Parse an enumeration value from its name or a `0x`-prefixed
    /// eight-hex-digit value.
    pub fn parse_enum(&self, tag: Tag, s: &str) -> TtlvResult<u32> {
        if let Some(hex_digits) = s.strip_prefix("0x") {
            ttlv_ensure!(
                hex_digits.len() == 8,
                TtlvError::InvalidNumber(s.to_owned())
            );
            return u32::from_str_radix(hex_digits, 16)
                .map_err(|_e| TtlvError::InvalidNumber(s.to_owned()));
        }
        self.enums
            .get(&tag)
            .and_then(|desc| desc.value_of(s))
            .ok_or_else(|| TtlvError::UnknownEnum(s.to_owned()))
    }

    /// Render an Integer under this tag: the `|`-joined mask value names
    /// when the tag carries a bitmask binding, the decimal value otherwise.
    /// Unnamed leftover bits render as one final `0x`-prefixed segment.
    #[must_use]
    pub fn format_int(&self, tag: Tag, value: i32) -> String {
        match self.enums.get(&tag) {
            Some(desc) if desc.is_bitmask() => {
                let mut remaining = u32::from_be_bytes(value.to_be_bytes());
                let mut parts = Vec::new();
                for &m in desc.values() {
                    if m != 0 && remaining & m == m {
                        if let Some(name) = desc.name_of(m) {
                            parts.push(name.to_owned());
                            remaining &= !m;
                        }
                    }
                }
                if remaining != 0 || parts.is_empty() {
                    parts.push(format!("0x{remaining:08x}"));
                }
                parts.join("|")
            }
            _ => value.to_string(),
        }
    }

    /// Parse an Integer under this tag: a decimal value, or `|`-separated
    /// segments each of which is a mask value name, a decimal value, or a
    /// `0x`-prefixed hex value, OR-ed together.
    pub fn parse_int(&self, tag: Tag, s: &str) -> TtlvResult<i32> {
        if let Ok(v) = s.parse::<i32>() {
            return Ok(v);
        }
        let desc = self.enums.get(&tag);
        let mut acc: u32 = 0;
        for part in s.split('|') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let v = if let Some(hex_digits) = part.strip_prefix("0x") {
                u32::from_str_radix(hex_digits, 16)
                    .map_err(|_e| TtlvError::InvalidNumber(part.to_owned()))?
            } else if let Ok(v) = part.parse::<u32>() {
                v
            } else {
                desc.and_then(|d| d.value_of(part))
                    .ok_or_else(|| TtlvError::UnknownMaskBit(part.to_owned()))?
            };
            acc |= v;
        }
        Ok(i32::from_be_bytes(acc.to_be_bytes()))
    }

    /// The enumeration or bitmask descriptor bound to this tag, if any.
    #[must_use]
    pub fn enum_for_tag(&self, tag: Tag) -> Option<&EnumDescriptor> {
        self.enums.get(&tag)
    }

    /// A registry holding the canonical KMIP tags and bindings used by this
    /// crate's tests. Real deployments load the full profile tables instead.
    #[must_use]
    pub fn baseline() -> Self {
        let mut r = Self::new();

        for (value, name) in [
            (0x42_0008, "Attribute"),
            (0x42_000A, "AttributeName"),
            (0x42_000B, "AttributeValue"),
            (0x42_000D, "BatchCount"),
            (0x42_000F, "BatchItem"),
            (0x42_0028, "CryptographicAlgorithm"),
            (0x42_002C, "CryptographicUsageMask"),
            (0x42_0042, "KeyFormatType"),
            (0x42_0050, "MaximumResponseSize"),
            (0x42_0054, "NameType"),
            (0x42_0055, "NameValue"),
            (0x42_0057, "ObjectType"),
            (0x42_005C, "Operation"),
            (0x42_0069, "ProtocolVersion"),
            (0x42_006A, "ProtocolVersionMajor"),
            (0x42_006B, "ProtocolVersionMinor"),
            (0x42_0077, "RequestHeader"),
            (0x42_0078, "RequestMessage"),
            (0x42_0079, "RequestPayload"),
            (0x42_007C, "ResponsePayload"),
            (0x42_0093, "UniqueBatchItemID"),
            (0x42_0094, "UniqueIdentifier"),
            (0x42_009E, "WrappingMethod"),
        ] {
            r.register_tag(Tag::new(value), name);
        }

        r.register_enum(
            Tag::new(0x42_0042),
            &[
                (0x01, "Raw"),
                (0x02, "X_509"),
                (0x03, "PKCS_1"),
                (0x04, "PKCS_8"),
            ],
        );
        r.register_enum(
            Tag::new(0x42_0028),
            &[(0x01, "DES"), (0x02, "TripleDES"), (0x03, "AES"), (0x04, "RSA")],
        );
        r.register_enum(
            Tag::new(0x42_0057),
            &[
                (0x01, "Certificate"),
                (0x02, "SymmetricKey"),
                (0x03, "PublicKey"),
                (0x04, "PrivateKey"),
            ],
        );
        r.register_enum(
            Tag::new(0x42_005C),
            &[
                (0x01, "Create"),
                (0x02, "CreateKeyPair"),
                (0x03, "Register"),
                (0x0A, "Get"),
                (0x12, "Activate"),
                (0x18, "Query"),
            ],
        );
        r.register_enum(
            Tag::new(0x42_009E),
            &[(0x01, "Encrypt"), (0x02, "MACSign")],
        );
        r.register_mask(
            Tag::new(0x42_002C),
            &[
                (0x0001, "Sign"),
                (0x0002, "Verify"),
                (0x0004, "Encrypt"),
                (0x0008, "Decrypt"),
                (0x0010, "WrapKey"),
                (0x0020, "UnwrapKey"),
                (0x0040, "Export"),
                (0x0080, "MACGenerate"),
                (0x0100, "MACVerify"),
                (0x0200, "DeriveKey"),
            ],
        );

        r
    }
}
