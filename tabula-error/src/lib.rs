#![feature(error_generic_member_access)]
#![deny(missing_docs)]

//! This crate defines error & result types for Tabula.
//! It also contains a variety of useful macros for error handling.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("TABULA_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}\nBacktrace:\n{}", msg.into(), Backtrace::capture());
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for Tabula.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum TabulaError {
    /// A schema could not be compiled, or two schemas are incompatible.
    #[error("schema error: {0}\nBacktrace:\n{1}")]
    Schema(ErrString, Backtrace),
    /// A value, attribute or column failed validation.
    #[error("validation error: {0}\nBacktrace:\n{1}")]
    Validation(ErrString, Backtrace),
    /// An operation required contiguous storage but the table is fragmented.
    #[error("table is fragmented: {0}\nBacktrace:\n{1}")]
    Fragmented(ErrString, Backtrace),
    /// An index was out of bounds.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, Backtrace),
    /// An invalid argument was provided.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// Two types were expected to match but did not.
    #[error("expected type: {0} but instead got {1}\nBacktrace:\n{2}")]
    MismatchedTypes(ErrString, ErrString, Backtrace),
    /// An operation is not supported for the given type.
    #[error("function {0} not implemented for {1}\nBacktrace:\n{2}")]
    NotImplemented(ErrString, ErrString, Backtrace),
    /// An internal assertion failed.
    #[error("{0}\nBacktrace:\n{1}")]
    AssertionFailed(ErrString, Backtrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<TabulaError>),
    /// A wrapper for errors from the Arrow library.
    #[error("{0}\nBacktrace:\n{1}")]
    ArrowError(#[from] arrow_schema::ArrowError, Backtrace),
    /// A wrapper for errors from the Parquet library.
    #[cfg(feature = "parquet")]
    #[error("{0}\nBacktrace:\n{1}")]
    ParquetError(#[from] parquet::errors::ParquetError, Backtrace),
    /// A wrapper for IO errors.
    #[error("{0}\nBacktrace:\n{1}")]
    IOError(#[from] io::Error, Backtrace),
    /// A wrapper for UTF-8 decoding errors.
    #[error("{0}\nBacktrace:\n{1}")]
    Utf8Error(#[from] std::string::FromUtf8Error, Backtrace),
    /// A wrapper for hex decoding errors.
    #[error("{0}\nBacktrace:\n{1}")]
    HexError(#[from] hex::FromHexError, Backtrace),
}

impl TabulaError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        TabulaError::Context(msg.into(), Box::new(self))
    }

    /// Returns true if this error, or the error it wraps, is a schema error.
    pub fn is_schema_error(&self) -> bool {
        match self {
            TabulaError::Schema(..) => true,
            TabulaError::Context(_, inner) => inner.is_schema_error(),
            _ => false,
        }
    }

    /// Returns true if this error, or the error it wraps, is a validation error.
    pub fn is_validation_error(&self) -> bool {
        match self {
            TabulaError::Validation(..) => true,
            TabulaError::Context(_, inner) => inner.is_validation_error(),
            _ => false,
        }
    }

    /// Returns true if this error, or the error it wraps, signals a fragmented table.
    pub fn is_fragmented(&self) -> bool {
        match self {
            TabulaError::Fragmented(..) => true,
            TabulaError::Context(_, inner) => inner.is_fragmented(),
            _ => false,
        }
    }

    /// Returns true if this error, or the error it wraps, is an out of bounds access.
    pub fn is_out_of_bounds(&self) -> bool {
        match self {
            TabulaError::OutOfBounds(..) => true,
            TabulaError::Context(_, inner) => inner.is_out_of_bounds(),
            _ => false,
        }
    }
}

impl Debug for TabulaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return TabulaErrors as their error type.
pub type TabulaResult<T> = Result<T, TabulaError>;

/// A convenient macro for creating a TabulaError.
#[macro_export]
macro_rules! tabula_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
        )
    }};
    (NotImplemented: $func:expr, $by_whom:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::NotImplemented($func.into(), format!("{}", $by_whom).into(), Backtrace::capture())
        )
    }};
    (MismatchedTypes: $expected:literal, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::MismatchedTypes($expected.into(), $actual.to_string().into(), Backtrace::capture())
        )
    }};
    (MismatchedTypes: $expected:expr, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::MismatchedTypes($expected.to_string().into(), $actual.to_string().into(), Backtrace::capture())
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::TabulaError::Context($msg.into(), Box::new($err))
        )
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    ($variant:ident: $err:expr $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabulaError::$variant($err.into(), Backtrace::capture())
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::tabula_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenience macro for creating a TabulaError for an error that should be returned.
#[macro_export]
macro_rules! tabula_bail {
    ($($tt:tt)+) => {
        return Err($crate::tabula_err!($($tt)+))
    };
}

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    #[inline]
    #[cold]
    #[must_use]
    pub const fn must_use(s: crate::TabulaError) -> crate::TabulaError {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> TabulaResult<()> {
        tabula_bail!(Schema: "duplicate field name {}", "x")
    }

    #[test]
    fn bail_produces_variant() {
        let err = fails().unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().starts_with("schema error: duplicate field name x"));
    }

    #[test]
    fn context_preserves_kind() {
        let err = tabula_err!(Validation: "bad value").with_context("while building table");
        assert!(err.is_validation_error());
        assert!(!err.is_schema_error());
        assert!(err.to_string().starts_with("while building table: validation error: bad value"));
    }

    #[test]
    fn arrow_errors_convert() {
        let err: TabulaError =
            arrow_schema::ArrowError::InvalidArgumentError("boom".to_string()).into();
        assert!(matches!(err, TabulaError::ArrowError(..)));
    }
}
