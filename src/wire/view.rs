use time::OffsetDateTime;

use super::{LEN_HEADER, LEN_TAG};
use crate::{
    big_int::TtlvBigInt,
    error::{result::TtlvResult, TtlvError},
    registry::{Tag, TtlvType},
};

/// A byte slice that begins with a TTLV encoded block.
///
/// The methods operate on the block located at the beginning of the slice;
/// any bytes after its end are ignored. Use [`Ttlv::next`] to obtain a view
/// over the following sibling. A view borrows; it never allocates and it
/// holds no storage of its own.
///
/// The header accessors (`tag`, `type_byte`, `len`) never fault: they
/// return zero values when the header is truncated. Full validation is
/// opt-in through [`Ttlv::valid`]; the typed value accessors assume the
/// caller has checked the type and clip to the available bytes rather than
/// fault, so diagnostic tooling can walk damaged buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttlv<'a>(&'a [u8]);

fn be_i32(bytes: &[u8]) -> i32 {
    bytes
        .get(..4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .map_or(0, i32::from_be_bytes)
}

fn be_u32(bytes: &[u8]) -> u32 {
    bytes
        .get(..4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .map_or(0, u32::from_be_bytes)
}

fn be_i64(bytes: &[u8]) -> i64 {
    bytes
        .get(..8)
        .and_then(|s| <[u8; 8]>::try_from(s).ok())
        .map_or(0, i64::from_be_bytes)
}

impl<'a> Ttlv<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self(&[])
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The tag encoded in the header. `Tag::NONE` if the header is
    /// truncated.
    #[must_use]
    pub fn tag(&self) -> Tag {
        if self.0.len() < LEN_TAG {
            return Tag::NONE;
        }
        Tag::new(
            u32::from(self.0[0]) << 16 | u32::from(self.0[1]) << 8 | u32::from(self.0[2]),
        )
    }

    /// The raw type octet. 0 if the header is truncated.
    #[must_use]
    pub fn type_byte(&self) -> u8 {
        if self.0.len() < LEN_TAG + 1 {
            return 0;
        }
        self.0[LEN_TAG]
    }

    /// The type octet decoded to a [`TtlvType`].
    pub fn item_type(&self) -> TtlvResult<TtlvType> {
        TtlvType::try_from(self.type_byte())
    }

    /// The length encoded in the header: the value segment only, excluding
    /// the header and any trailing padding (see [`Ttlv::full_len`]). It is
    /// read from the header alone and is not checked against the slice.
    /// 0 if the header is truncated.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.0.len() < LEN_HEADER {
            return 0;
        }
        usize::try_from(be_u32(&self.0[4..LEN_HEADER])).unwrap_or(usize::MAX)
    }

    /// The expected size of the entire block (header + value + trailing
    /// padding), computed from the type and length in the header. Errs only
    /// when the type octet is unrecognized.
    pub fn full_len(&self) -> TtlvResult<usize> {
        let full = match self.item_type()? {
            TtlvType::Integer
            | TtlvType::LongInteger
            | TtlvType::Enumeration
            | TtlvType::Boolean
            | TtlvType::DateTime
            | TtlvType::DateTimeExtended
            | TtlvType::Interval => LEN_HEADER + 8,
            TtlvType::TextString | TtlvType::ByteString => {
                let l = LEN_HEADER + self.len();
                match l % 8 {
                    0 => l,
                    m => l + (8 - m),
                }
            }
            // a Big Integer's declared length is already a multiple of 8;
            // no further padding is ever added
            TtlvType::BigInteger | TtlvType::Structure => LEN_HEADER + self.len(),
        };
        Ok(full)
    }

    /// The raw bytes of the value segment, as declared by the header
    /// length. If the slice is shorter than declared, the remaining bytes
    /// are returned without faulting.
    #[must_use]
    pub fn value_raw(&self) -> &'a [u8] {
        let l = self.len();
        if l == 0 || self.0.len() <= LEN_HEADER {
            return &[];
        }
        let take = l.min(self.0.len() - LEN_HEADER);
        &self.0[LEN_HEADER..LEN_HEADER + take]
    }

    #[must_use]
    pub fn value_integer(&self) -> i32 {
        be_i32(self.value_raw())
    }

    #[must_use]
    pub fn value_long_integer(&self) -> i64 {
        be_i64(self.value_raw())
    }

    #[must_use]
    pub fn value_big_integer(&self) -> TtlvBigInt {
        TtlvBigInt::from_bytes_be(self.value_raw())
    }

    #[must_use]
    pub fn value_enumeration(&self) -> u32 {
        be_u32(self.value_raw())
    }

    /// Only the final byte of the 8-byte value carries the truth indicator.
    #[must_use]
    pub fn value_boolean(&self) -> bool {
        self.value_raw().get(7).is_some_and(|b| *b != 0)
    }

    /// The declared length is the string's exact byte count; trailing pad
    /// bytes are never part of the value. Structural validation does not
    /// look at the bytes, so this errs when they are not UTF-8.
    pub fn value_text_string(&self) -> TtlvResult<&'a str> {
        Ok(std::str::from_utf8(self.value_raw())?)
    }

    #[must_use]
    pub fn value_byte_string(&self) -> &'a [u8] {
        self.value_raw()
    }

    /// Signed seconds since the Unix epoch.
    pub fn value_date_time(&self) -> TtlvResult<OffsetDateTime> {
        Ok(OffsetDateTime::from_unix_timestamp(
            self.value_long_integer(),
        )?)
    }

    /// Signed microseconds since the Unix epoch.
    pub fn value_date_time_extended(&self) -> TtlvResult<OffsetDateTime> {
        let micros = i128::from(self.value_long_integer());
        Ok(OffsetDateTime::from_unix_timestamp_nanos(micros * 1_000)?)
    }

    /// Seconds.
    #[must_use]
    pub fn value_interval(&self) -> u32 {
        be_u32(self.value_raw())
    }

    /// A view over the first child block; its trailing bytes hold the
    /// remaining siblings.
    #[must_use]
    pub fn value_structure(&self) -> Ttlv<'a> {
        Self(self.value_raw())
    }

    /// The value projected into the matching variant of [`TtlvValue`].
    pub fn value(&self) -> TtlvResult<TtlvValue<'a>> {
        Ok(match self.item_type()? {
            TtlvType::Structure => TtlvValue::Structure(self.value_structure()),
            TtlvType::Integer => TtlvValue::Integer(self.value_integer()),
            TtlvType::LongInteger => TtlvValue::LongInteger(self.value_long_integer()),
            TtlvType::BigInteger => TtlvValue::BigInteger(self.value_big_integer()),
            TtlvType::Enumeration => TtlvValue::Enumeration(self.value_enumeration()),
            TtlvType::Boolean => TtlvValue::Boolean(self.value_boolean()),
            TtlvType::TextString => TtlvValue::TextString(self.value_text_string()?),
            TtlvType::ByteString => TtlvValue::ByteString(self.value_byte_string()),
            TtlvType::DateTime => TtlvValue::DateTime(self.value_date_time()?),
            TtlvType::Interval => TtlvValue::Interval(self.value_interval()),
            TtlvType::DateTimeExtended => {
                TtlvValue::DateTimeExtended(self.value_date_time_extended()?)
            }
        })
    }

    /// Validate the first stage only: header present, length admissible for
    /// the type, tag high byte canonical.
    pub fn valid_header(&self) -> TtlvResult<()> {
        if self.0.len() < LEN_HEADER {
            return Err(TtlvError::HeaderTruncated);
        }
        match self.item_type()? {
            TtlvType::Structure | TtlvType::TextString | TtlvType::ByteString => {}
            TtlvType::Integer | TtlvType::Enumeration | TtlvType::Interval => {
                if self.len() != 4 {
                    return Err(TtlvError::InvalidLen);
                }
            }
            TtlvType::LongInteger
            | TtlvType::Boolean
            | TtlvType::DateTime
            | TtlvType::DateTimeExtended => {
                if self.len() != 8 {
                    return Err(TtlvError::InvalidLen);
                }
            }
            TtlvType::BigInteger => {
                let l = self.len();
                if l == 0 || l % 8 != 0 {
                    return Err(TtlvError::InvalidLen);
                }
            }
        }
        if !matches!(self.0.first(), Some(0x42 | 0x54)) {
            return Err(TtlvError::InvalidTag);
        }
        Ok(())
    }

    /// Complete recursive validation. For a Structure, every child is
    /// validated and child errors are annotated with the enclosing tag.
    pub fn valid(&self) -> TtlvResult<()> {
        self.valid_header()?;

        if self.0.len() < self.full_len()? {
            return Err(TtlvError::ValueTruncated);
        }

        if self.item_type()? == TtlvType::Structure {
            let mut inner = self.value_structure();
            while !inner.is_empty() {
                inner
                    .valid()
                    .map_err(|e| e.context(self.tag().to_string()))?;
                inner = inner.next();
            }
        }

        Ok(())
    }

    /// The view over the bytes immediately following this block. Empty when
    /// no sibling remains, or when this block is invalid (the stream is
    /// unrecoverable past a bad block).
    #[must_use]
    pub fn next(&self) -> Ttlv<'a> {
        if self.valid().is_err() {
            return Self::empty();
        }
        let Ok(full) = self.full_len() else {
            return Self::empty();
        };
        Self(self.0.get(full..).unwrap_or_default())
    }

    /// Iterate the children of a Structure value. Stops at the end of the
    /// siblings, or silently at the first invalid block; run
    /// [`Ttlv::valid`] first when that distinction matters.
    #[must_use]
    pub fn children(&self) -> Children<'a> {
        Children {
            cur: self.value_structure(),
        }
    }
}

/// Sibling iterator returned by [`Ttlv::children`].
pub struct Children<'a> {
    cur: Ttlv<'a>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Ttlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_empty() {
            return None;
        }
        let item = self.cur;
        self.cur = item.next();
        Some(item)
    }
}

/// The value of a TTLV block projected into native shape, one variant per
/// primitive type. Typed accessors are the preferred path; this union
/// exists for diagnostic walking and pretty-printing.
#[derive(Debug, Clone, PartialEq)]
pub enum TtlvValue<'a> {
    Structure(Ttlv<'a>),
    Integer(i32),
    LongInteger(i64),
    BigInteger(TtlvBigInt),
    Enumeration(u32),
    Boolean(bool),
    TextString(&'a str),
    ByteString(&'a [u8]),
    DateTime(OffsetDateTime),
    Interval(u32),
    DateTimeExtended(OffsetDateTime),
}
