use std::io;

use carray_expr::ExprError;
use carray_types::{ArrayError, DType};

use crate::codec::CodecError;

#[derive(Debug, thiserror::Error)]
/// An error that can occur when operating on a compressed array or table.
pub enum Error {
    #[error("type mismatch: cannot store {from} values in a {to} array")]
    /// Values of one element type cannot be stored without loss in
    /// an array of another.
    TypeMismatch { from: DType, to: DType },
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("length mismatch: expected {expected} but got {actual}")]
    /// A column, selection mask or appended block has the wrong length.
    LengthMismatch { expected: usize, actual: usize },
    #[error("unsupported: {0}")]
    /// The operation does not support the shape or type of its argument.
    Unsupported(String),
    #[error("expression error: {0}")]
    /// The expression failed to parse, evaluate, or references a name that
    /// could not be resolved.
    Expression(#[from] ExprError),
    #[error("data corrupted: {0}")]
    /// A chunk could not be restored to its recorded content.
    Corrupted(#[from] CodecError),
    #[error("unknown column: {0:?}")]
    UnknownColumn(String),
    #[error("column already exists: {0:?}")]
    DuplicateColumn(String),
    #[error("expected {expected} columns but got {actual}")]
    /// A row or set of columns does not match the table schema.
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("invalid format: {0}")]
    /// A persisted container is malformed.
    InvalidFormat(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// A coarse classification of an [Error].
///
/// Allows callers to tell programming errors (bad types, shapes and names)
/// from data corruption without matching on every variant.
pub enum ErrorKind {
    Type,
    Range,
    Length,
    Unsupported,
    NameResolution,
    Corruption,
    Schema,
    Io,
}

impl Error {
    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TypeMismatch { .. } => ErrorKind::Type,
            Error::IndexOutOfRange { .. } => ErrorKind::Range,
            Error::LengthMismatch { .. } => ErrorKind::Length,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Expression(e) => match e {
                ExprError::UnknownName(_) => ErrorKind::NameResolution,
                ExprError::LengthMismatch { .. } => ErrorKind::Length,
                _ => ErrorKind::Unsupported,
            },
            Error::Corrupted(_) | Error::InvalidFormat(_) | Error::Decode(_) => {
                ErrorKind::Corruption
            },
            Error::UnknownColumn(_)
            | Error::DuplicateColumn(_)
            | Error::ColumnCountMismatch { .. }
            | Error::InvalidParameter(_) => ErrorKind::Schema,
            Error::Io(_) | Error::Encode(_) => ErrorKind::Io,
        }
    }
}

impl From<ArrayError> for Error {
    fn from(error: ArrayError) -> Self {
        match error {
            ArrayError::Cast { from, to } => Error::TypeMismatch { from, to },
            ArrayError::LengthMismatch { expected, actual } => {
                Error::LengthMismatch { expected, actual }
            },
            ArrayError::DuplicateField(name) => Error::DuplicateColumn(name),
            ArrayError::ZeroStep => Error::InvalidParameter("slice step cannot be zero".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Error::TypeMismatch { from: DType::F64, to: DType::I32 }, ErrorKind::Type)]
    #[case(Error::IndexOutOfRange { index: 3, len: 3 }, ErrorKind::Range)]
    #[case(Error::LengthMismatch { expected: 3, actual: 2 }, ErrorKind::Length)]
    #[case(Error::Unsupported("x".into()), ErrorKind::Unsupported)]
    #[case(Error::Expression(ExprError::UnknownName("x".into())), ErrorKind::NameResolution)]
    #[case(Error::Expression(ExprError::Parse("x".into())), ErrorKind::Unsupported)]
    #[case(Error::UnknownColumn("x".into()), ErrorKind::Schema)]
    #[case(Error::InvalidFormat("x".into()), ErrorKind::Corruption)]
    fn test_error_kind(#[case] error: Error, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected, "Kind of {error}");
    }

    #[test]
    fn test_array_error_conversion() {
        let error = Error::from(ArrayError::Cast {
            from: DType::F64,
            to: DType::I8,
        });
        assert!(matches!(
            error,
            Error::TypeMismatch {
                from: DType::F64,
                to: DType::I8
            }
        ));
    }
}
