use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// An arbitrary-precision integer carrying the KMIP Big Integer encoding
/// rules, backed by `num_bigint_dig::BigInt`.
///
/// On the wire a Big Integer is big-endian two's complement, sign-extended
/// at the front until its length is a positive multiple of eight bytes;
/// the extension bytes count toward the declared item length. Decoding
/// strips the extension back off before interpreting the value.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TtlvBigInt(num_bigint_dig::BigInt);

impl From<num_bigint_dig::BigInt> for TtlvBigInt {
    fn from(big_int: num_bigint_dig::BigInt) -> Self {
        Self(big_int)
    }
}

impl From<TtlvBigInt> for num_bigint_dig::BigInt {
    fn from(val: TtlvBigInt) -> Self {
        val.0
    }
}

impl From<i64> for TtlvBigInt {
    fn from(v: i64) -> Self {
        Self(num_bigint_dig::BigInt::from(v))
    }
}

/// Strip the sign-extension pad bytes from a two's-complement big-endian
/// sequence: leading `0x00` bytes while the following byte's high bit is
/// clear, leading `0xFF` bytes while it is set. At least one byte always
/// remains.
#[must_use]
pub(crate) fn unpad(data: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 1 < data.len() {
        let keep_padding = match (data[i], data[i + 1] & 0x80) {
            (0x00, 0x00) => true,
            (0xFF, 0x80) => true,
            _ => false,
        };
        if !keep_padding {
            break;
        }
        i += 1;
    }
    &data[i..]
}

impl TtlvBigInt {
    /// Encode to the padded two's-complement big-endian form. The result
    /// length is always a positive multiple of 8 and the sign bit of the
    /// first byte matches the sign of the value.
    #[must_use]
    pub fn to_bytes_be(&self) -> Vec<u8> {
        let body = self.0.to_signed_bytes_be();
        let pad = (8 - body.len() % 8) % 8;
        if pad == 0 {
            return body;
        }
        let fill = if self.0.sign() == num_bigint_dig::Sign::Minus {
            0xFF
        } else {
            0x00
        };
        let mut out = vec![fill; pad];
        out.extend_from_slice(&body);
        out
    }

    /// Decode from a two's-complement big-endian sequence, stripping any
    /// sign-extension padding first.
    #[must_use]
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(num_bigint_dig::BigInt::from_signed_bytes_be(unpad(bytes)))
    }

    /// The value as an `i64` when it fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }
}

impl std::fmt::Display for TtlvBigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for TtlvBigInt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = "0x".to_owned() + &hex::encode_upper(self.to_bytes_be());
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for TtlvBigInt {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let hex_str = s.strip_prefix("0x").ok_or_else(|| {
            serde::de::Error::custom("invalid KMIP Big Integer string: it must start with '0x'")
        })?;
        let bytes = hex::decode(hex_str).map_err(serde::de::Error::custom)?;
        Ok(Self::from_bytes_be(&bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::panic)]
mod tests {
    use num_bigint_dig::BigInt;

    use crate::big_int::{unpad, TtlvBigInt};

    #[test]
    fn test_padded_byte_form() {
        let cases: [(i128, &str); 8] = [
            (0, "0000000000000000"),
            (1, "0000000000000001"),
            (-1, "FFFFFFFFFFFFFFFF"),
            (127, "000000000000007F"),
            (128, "0000000000000080"),
            (-128, "FFFFFFFFFFFFFF80"),
            (-129, "FFFFFFFFFFFFFF7F"),
            // 2^55: the body already fills eight bytes, no extension
            (36_028_797_018_963_968, "0080000000000000"),
        ];
        for (value, expected) in cases {
            let n = TtlvBigInt::from(BigInt::from(value));
            let bytes = n.to_bytes_be();
            assert_eq!(hex::encode_upper(&bytes), expected, "{value}");
            assert_eq!(TtlvBigInt::from_bytes_be(&bytes), n, "{value}");
        }
    }

    #[test]
    fn test_round_trips_across_pad_boundaries() {
        let one = BigInt::from(1);
        let mut values = vec![BigInt::from(0)];
        for bits in [7_usize, 8, 15, 16, 31, 32, 55, 56, 63, 64, 127, 128, 200] {
            let p: BigInt = one.clone() << bits;
            values.push(p.clone() - one.clone());
            values.push(p.clone());
            values.push(-p.clone());
            values.push(one.clone() - p);
        }
        for value in values {
            let n = TtlvBigInt::from(value.clone());
            let bytes = n.to_bytes_be();
            assert_eq!(bytes.len() % 8, 0, "{value}");
            assert!(!bytes.is_empty(), "{value}");
            let sign_bit = bytes[0] & 0x80 != 0;
            assert_eq!(sign_bit, value < BigInt::from(0), "{value}");
            assert_eq!(TtlvBigInt::from_bytes_be(&bytes), n, "{value}");
        }
    }

    #[test]
    fn test_unpad() {
        // positive with pad
        assert_eq!(unpad(&[0x00, 0x00, 0x00, 0x7F]), &[0x7F]);
        // the pad byte before a set high bit must stay
        assert_eq!(unpad(&[0x00, 0x80]), &[0x00, 0x80]);
        // negative with pad
        assert_eq!(unpad(&[0xFF, 0xFF, 0x80]), &[0x80]);
        // 0xFF before a clear high bit must stay
        assert_eq!(unpad(&[0xFF, 0x7F]), &[0xFF, 0x7F]);
        // always leave at least one byte
        assert_eq!(unpad(&[0x00]), &[0x00]);
        assert_eq!(unpad(&[0x00, 0x00]), &[0x00]);
        assert_eq!(unpad(&[0xFF, 0xFF]), &[0xFF]);
    }

    #[test]
    fn test_serde_hex_strings() {
        let n = TtlvBigInt::from(BigInt::from(0x0102_0304_0506_0708_i64));
        let s = serde_json::to_string(&n).unwrap();
        assert_eq!(s, "\"0x0102030405060708\"");
        let back: TtlvBigInt = serde_json::from_str(&s).unwrap();
        assert_eq!(back, n);

        let n = TtlvBigInt::from(BigInt::from(-2));
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"0xFFFFFFFFFFFFFFFE\"");

        // the 0x prefix is mandatory on input
        assert!(serde_json::from_str::<TtlvBigInt>("\"0102030405060708\"").is_err());
    }
}
