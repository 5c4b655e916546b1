use time::OffsetDateTime;

use crate::{
    big_int::TtlvBigInt,
    error::{result::TtlvResult, TtlvError},
    registry::{Tag, TtlvType},
};

/// Back-patch handle returned by [`EncBuf::begin`]: the buffer offset of a
/// pending Structure length field. Consumed by [`EncBuf::end`], so a handle
/// cannot be closed twice.
#[derive(Debug)]
pub struct StructureHandle(usize);

/// Append-only builder emitting well-formed TTLV.
///
/// Scalar encoders write header, value, and trailing padding atomically.
/// Structures are written with [`EncBuf::begin`]/[`EncBuf::end`]: the
/// length field is back-patched when the structure closes. Tags are encoded
/// verbatim; the builder never consults a registry. A mismatched begin/end
/// pairing is a program bug, checked in debug builds.
#[derive(Debug, Default)]
pub struct EncBuf {
    buf: Vec<u8>,
    #[cfg(debug_assertions)]
    open: usize,
}

impl EncBuf {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Hand the finished blob to the caller.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        #[cfg(debug_assertions)]
        debug_assert_eq!(self.open, 0, "unclosed structure");
        self.buf
    }

    fn write_header(&mut self, tag: Tag, item_type: TtlvType, len: u32) {
        let tag_bytes = tag.value().to_be_bytes();
        // only the lowest 3 bytes, big-endian
        self.buf.extend_from_slice(&tag_bytes[1..]);
        self.buf.push(item_type as u8);
        self.buf.extend_from_slice(&len.to_be_bytes());
    }

    fn value_len(len: usize) -> TtlvResult<u32> {
        u32::try_from(len).map_err(|_e| TtlvError::Syntax(format!("length too large: {len}")))
    }

    /// Open a Structure: write its header with a placeholder length and
    /// return the handle to patch on [`EncBuf::end`].
    #[must_use]
    pub fn begin(&mut self, tag: Tag) -> StructureHandle {
        self.write_header(tag, TtlvType::Structure, 0);
        #[cfg(debug_assertions)]
        {
            self.open += 1;
        }
        StructureHandle(self.buf.len() - 4)
    }

    /// Close a Structure: back-patch the length field with the bytes
    /// written since the matching [`EncBuf::begin`].
    pub fn end(&mut self, handle: StructureHandle) -> TtlvResult<()> {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.open > 0, "end without begin");
            self.open -= 1;
        }
        let len = Self::value_len(self.buf.len() - handle.0 - 4)?;
        self.buf[handle.0..handle.0 + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    pub fn encode_int(&mut self, tag: Tag, value: i32) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::Integer, 4);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self.buf.extend_from_slice(&[0_u8; 4]);
        Ok(())
    }

    pub fn encode_long_int(&mut self, tag: Tag, value: i64) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::LongInteger, 8);
        self.buf.extend_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// The value is sign-extension padded to a positive multiple of 8
    /// bytes; no trailing pad is added beyond that.
    pub fn encode_big_int(&mut self, tag: Tag, value: &TtlvBigInt) -> TtlvResult<()> {
        let bytes = value.to_bytes_be();
        self.write_header(tag, TtlvType::BigInteger, Self::value_len(bytes.len())?);
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    pub fn encode_enum(&mut self, tag: Tag, value: u32) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::Enumeration, 4);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self.buf.extend_from_slice(&[0_u8; 4]);
        Ok(())
    }

    pub fn encode_bool(&mut self, tag: Tag, value: bool) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::Boolean, 8);
        let mut buf = [0_u8; 8];
        buf[7] = u8::from(value);
        self.buf.extend_from_slice(&buf);
        Ok(())
    }

    pub fn encode_text_string(&mut self, tag: Tag, value: &str) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::TextString, Self::value_len(value.len())?);
        self.buf.extend_from_slice(value.as_bytes());
        self.pad_value(value.len());
        Ok(())
    }

    pub fn encode_byte_string(&mut self, tag: Tag, value: &[u8]) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::ByteString, Self::value_len(value.len())?);
        self.buf.extend_from_slice(value);
        self.pad_value(value.len());
        Ok(())
    }

    pub fn encode_date_time(&mut self, tag: Tag, value: OffsetDateTime) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::DateTime, 8);
        self.buf
            .extend_from_slice(&value.unix_timestamp().to_be_bytes());
        Ok(())
    }

    pub fn encode_date_time_extended(
        &mut self,
        tag: Tag,
        value: OffsetDateTime,
    ) -> TtlvResult<()> {
        let micros = i64::try_from(value.unix_timestamp_nanos() / 1_000)
            .map_err(|_e| TtlvError::InvalidDateTime(value.to_string()))?;
        self.write_header(tag, TtlvType::DateTimeExtended, 8);
        self.buf.extend_from_slice(&micros.to_be_bytes());
        Ok(())
    }

    pub fn encode_interval(&mut self, tag: Tag, seconds: u32) -> TtlvResult<()> {
        self.write_header(tag, TtlvType::Interval, 4);
        self.buf.extend_from_slice(&seconds.to_be_bytes());
        self.buf.extend_from_slice(&[0_u8; 4]);
        Ok(())
    }

    fn pad_value(&mut self, value_len: usize) {
        let m = value_len % 8;
        if m != 0 {
            self.buf.resize(self.buf.len() + (8 - m), 0);
        }
    }
}
