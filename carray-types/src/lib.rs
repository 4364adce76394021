//! Element types, scalars and dense arrays.
//!
//! These are the uncompressed values that flow in and out of compressed
//! arrays and tables: a dense [Array] is the canonical ingestion and
//! materialisation form, a [StructArray] is the row oriented view of a set of
//! equally long named columns.

/// Expands `$body` once per variant of an element-typed enum, binding the
/// variant payload to `$inner`.
macro_rules! dispatch {
    ($value:expr, $enum:ident, $inner:ident => $body:expr) => {
        match $value {
            $enum::Bool($inner) => $body,
            $enum::I8($inner) => $body,
            $enum::I16($inner) => $body,
            $enum::I32($inner) => $body,
            $enum::I64($inner) => $body,
            $enum::U8($inner) => $body,
            $enum::U16($inner) => $body,
            $enum::U32($inner) => $body,
            $enum::U64($inner) => $body,
            $enum::F32($inner) => $body,
            $enum::F64($inner) => $body,
        }
    };
}

/// Maps each variant of `$from` onto the variant of the same name in `$to`.
macro_rules! map_variant {
    ($value:expr, $from:ident => $to:ident, $inner:ident => $body:expr) => {
        match $value {
            $from::Bool($inner) => $to::Bool($body),
            $from::I8($inner) => $to::I8($body),
            $from::I16($inner) => $to::I16($body),
            $from::I32($inner) => $to::I32($body),
            $from::I64($inner) => $to::I64($body),
            $from::U8($inner) => $to::U8($body),
            $from::U16($inner) => $to::U16($body),
            $from::U32($inner) => $to::U32($body),
            $from::U64($inner) => $to::U64($body),
            $from::F32($inner) => $to::F32($body),
            $from::F64($inner) => $to::F64($body),
        }
    };
}

/// Matches two element-typed values that share the same variant.
macro_rules! zip_variants {
    (
        ($left:expr, $right:expr) as ($lenum:ident, $renum:ident),
        ($l:ident, $r:ident) => $body:expr,
        _ => $fallback:expr $(,)?
    ) => {
        match ($left, $right) {
            ($lenum::Bool($l), $renum::Bool($r)) => $body,
            ($lenum::I8($l), $renum::I8($r)) => $body,
            ($lenum::I16($l), $renum::I16($r)) => $body,
            ($lenum::I32($l), $renum::I32($r)) => $body,
            ($lenum::I64($l), $renum::I64($r)) => $body,
            ($lenum::U8($l), $renum::U8($r)) => $body,
            ($lenum::U16($l), $renum::U16($r)) => $body,
            ($lenum::U32($l), $renum::U32($r)) => $body,
            ($lenum::U64($l), $renum::U64($r)) => $body,
            ($lenum::F32($l), $renum::F32($r)) => $body,
            ($lenum::F64($l), $renum::F64($r)) => $body,
            _ => $fallback,
        }
    };
}

mod array;
mod dtype;
mod element;
mod record;
mod scalar;
mod slice;

pub use self::array::Array;
pub use self::dtype::{DType, Kind, UnknownDType};
pub use self::element::Element;
pub use self::record::StructArray;
pub use self::scalar::Scalar;
pub use self::slice::{Slice, SliceIndices};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// An error that can occur when building or converting dense values.
pub enum ArrayError {
    #[error("cannot cast {from} to {to} without loss")]
    /// The value cannot be represented by the target element type.
    Cast { from: DType, to: DType },
    #[error("length mismatch: expected {expected} values, got {actual}")]
    /// Two sets of values that must line up have different lengths.
    LengthMismatch { expected: usize, actual: usize },
    #[error("duplicate field name: {0:?}")]
    /// A structured array was given the same field name twice.
    DuplicateField(String),
    #[error("slice step cannot be zero")]
    ZeroStep,
}
