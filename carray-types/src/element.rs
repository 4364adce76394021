use std::fmt::Debug;

use crate::{Array, DType, Scalar};

/// A native Rust type that can be stored as an element of an [Array].
pub trait Element: Copy + PartialEq + Debug + Send + Sync + 'static {
    /// The element type this native type maps to.
    const DTYPE: DType;

    /// Wraps a vector of values into a dense [Array].
    fn into_array(values: Vec<Self>) -> Array;

    /// Returns the typed values of the array if it holds this type.
    fn slice_of(array: &Array) -> Option<&[Self]>;

    fn into_scalar(self) -> Scalar;

    /// Returns the native value if the scalar holds exactly this type.
    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

macro_rules! impl_element {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $native {
                const DTYPE: DType = DType::$variant;

                #[inline]
                fn into_array(values: Vec<Self>) -> Array {
                    Array::$variant(values)
                }

                #[inline]
                fn slice_of(array: &Array) -> Option<&[Self]> {
                    match array {
                        Array::$variant(values) => Some(values.as_slice()),
                        _ => None,
                    }
                }

                #[inline]
                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                #[inline]
                fn from_scalar(scalar: Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_element!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);
