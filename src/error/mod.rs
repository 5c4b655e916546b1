use thiserror::Error;

pub mod result;

/// Errors surfaced by the TTLV codec.
///
/// The structural variants are stable sentinels produced by header and
/// length validation of binary TTLV. The semantic variants are produced by
/// the registry and the text codecs. `Context` wraps any of them with the
/// enclosing tag path or a `"Tag: invalid Type"` prefix so a caller can
/// locate the fault; use [`TtlvError::root_cause`] to match on the sentinel
/// underneath.
#[derive(Error, Debug)]
pub enum TtlvError {
    #[error("header truncated")]
    HeaderTruncated,

    #[error("value truncated")]
    ValueTruncated,

    #[error("invalid length")]
    InvalidLen,

    #[error("invalid KMIP type")]
    InvalidType,

    #[error("invalid tag")]
    InvalidTag,

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unknown name: {0}")]
    UnknownEnum(String),

    #[error("unknown mask value name: {0}")]
    UnknownMaskBit(String),

    #[error("should not have 0x prefix")]
    InvalidHexPrefix,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("invalid date-time: {0}")]
    InvalidDateTime(String),

    #[error("big integer must be a multiple of 8 bytes")]
    BigIntegerBadAlignment,

    #[error("{0}")]
    Syntax(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TtlvError>,
    },
}

impl TtlvError {
    /// Wrap this error with a location prefix, e.g. a tag path or
    /// `"KeyFormatType: invalid Enumeration"`.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Peel off every `Context` layer and return the underlying sentinel.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for TtlvError {
    fn from(e: std::io::Error) -> Self {
        Self::Syntax(e.to_string())
    }
}

impl From<quick_xml::Error> for TtlvError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Syntax(format!("XML parse error: {e}"))
    }
}

impl From<serde_json::Error> for TtlvError {
    fn from(e: serde_json::Error) -> Self {
        Self::Syntax(format!("JSON parse error: {e}"))
    }
}

impl From<hex::FromHexError> for TtlvError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Syntax(format!("invalid hex string: {e}"))
    }
}

impl From<std::string::FromUtf8Error> for TtlvError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Syntax(format!("invalid UTF-8: {e}"))
    }
}

impl From<std::str::Utf8Error> for TtlvError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::Syntax(format!("invalid UTF-8: {e}"))
    }
}

impl From<std::num::TryFromIntError> for TtlvError {
    fn from(e: std::num::TryFromIntError) -> Self {
        Self::InvalidNumber(e.to_string())
    }
}

impl From<time::error::ComponentRange> for TtlvError {
    fn from(e: time::error::ComponentRange) -> Self {
        Self::InvalidDateTime(e.to_string())
    }
}

impl From<time::error::Parse> for TtlvError {
    fn from(e: time::error::Parse) -> Self {
        Self::InvalidDateTime(e.to_string())
    }
}

impl From<time::error::Format> for TtlvError {
    fn from(e: time::error::Format) -> Self {
        Self::InvalidDateTime(e.to_string())
    }
}

/// Construct a [`TtlvError::Syntax`] from a format string.
#[macro_export]
macro_rules! ttlv_error {
    ($msg:literal) => {
        $crate::error::TtlvError::Syntax(::core::format_args!($msg).to_string())
    };
    ($err:expr $(,)?) => {
        $crate::error::TtlvError::Syntax($err.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::TtlvError::Syntax(::core::format_args!($fmt, $($arg)*).to_string())
    };
}

/// Return early with a [`TtlvError::Syntax`].
#[macro_export]
macro_rules! ttlv_bail {
    ($msg:literal) => {
        return ::core::result::Result::Err($crate::ttlv_error!($msg))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($err)
    };
    ($fmt:expr, $($arg:tt)*) => {
        return ::core::result::Result::Err($crate::ttlv_error!($fmt, $($arg)*))
    };
}

/// Return early with an error if a condition is not satisfied.
#[macro_export]
macro_rules! ttlv_ensure {
    ($cond:expr, $msg:literal $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::ttlv_error!($msg));
        }
    };
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return ::core::result::Result::Err($crate::ttlv_error!($fmt, $($arg)*));
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::TtlvError;

    #[test]
    fn test_error_interpolation() {
        let var = 42;
        let err = ttlv_error!("interpolate {var}");
        assert_eq!("interpolate 42", err.to_string());

        let err = bail();
        assert_eq!("interpolate 43", err.unwrap_err().to_string());

        let err = ensure();
        assert_eq!("interpolate 44", err.unwrap_err().to_string());
    }

    #[test]
    fn test_context_chain() {
        let err = TtlvError::UnknownEnum("Foo".to_owned())
            .context("KeyFormatType: invalid Enumeration");
        assert_eq!(
            "KeyFormatType: invalid Enumeration: unknown name: Foo",
            err.to_string()
        );
        assert!(matches!(err.root_cause(), TtlvError::UnknownEnum(_)));
    }

    fn bail() -> Result<(), TtlvError> {
        let var = 43;
        ttlv_bail!("interpolate {var}");
    }

    fn ensure() -> Result<(), TtlvError> {
        let var = 44;
        ttlv_ensure!(false, "interpolate {var}");
        Ok(())
    }
}
