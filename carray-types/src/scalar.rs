use std::fmt::{Display, Formatter};

use serde_derive::{Deserialize, Serialize};

use crate::{ArrayError, DType, Kind};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
/// A single element of one of the supported [DType]s.
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Bool(_) => DType::Bool,
            Scalar::I8(_) => DType::I8,
            Scalar::I16(_) => DType::I16,
            Scalar::I32(_) => DType::I32,
            Scalar::I64(_) => DType::I64,
            Scalar::U8(_) => DType::U8,
            Scalar::U16(_) => DType::U16,
            Scalar::U32(_) => DType::U32,
            Scalar::U64(_) => DType::U64,
            Scalar::F32(_) => DType::F32,
            Scalar::F64(_) => DType::F64,
        }
    }

    /// Returns the value widened to a `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(v) => v as u8 as f64,
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
            other => other.as_i128().unwrap_or_default() as f64,
        }
    }

    /// Returns the value widened to an `i128` if it is a boolean or integer.
    pub fn as_i128(&self) -> Option<i128> {
        let value = match *self {
            Scalar::Bool(v) => v as i128,
            Scalar::I8(v) => v as i128,
            Scalar::I16(v) => v as i128,
            Scalar::I32(v) => v as i128,
            Scalar::I64(v) => v as i128,
            Scalar::U8(v) => v as i128,
            Scalar::U16(v) => v as i128,
            Scalar::U32(v) => v as i128,
            Scalar::U64(v) => v as i128,
            Scalar::F32(_) | Scalar::F64(_) => return None,
        };
        Some(value)
    }

    /// Converts the scalar to the target type, looking at the value itself
    /// rather than only its type.
    ///
    /// An integer is accepted by any integer type able to hold it and by any
    /// float type, a float is accepted by any float type. Booleans widen
    /// into anything, but nothing narrows into a boolean.
    pub fn cast(self, to: DType) -> Result<Scalar, ArrayError> {
        let from = self.dtype();
        if from == to {
            return Ok(self);
        }

        let accepted = from.can_cast_to(to)
            || match (from.kind(), to.kind()) {
                (Kind::SignedInt | Kind::UnsignedInt, Kind::SignedInt | Kind::UnsignedInt) => {
                    self.as_i128().is_some_and(|v| fits_integer(v, to))
                },
                (Kind::SignedInt | Kind::UnsignedInt, Kind::Float) => true,
                (Kind::Float, Kind::Float) => true,
                _ => false,
            };

        if accepted {
            Ok(self.coerce(to))
        } else {
            Err(ArrayError::Cast { from, to })
        }
    }

    /// Converts the scalar with plain numeric conversion semantics.
    ///
    /// Callers are expected to have validated the conversion.
    pub(crate) fn coerce(self, to: DType) -> Scalar {
        if self.dtype().kind() == Kind::Float {
            let v = self.as_f64();
            return match to {
                DType::Bool => Scalar::Bool(v != 0.0),
                DType::I8 => Scalar::I8(v as i8),
                DType::I16 => Scalar::I16(v as i16),
                DType::I32 => Scalar::I32(v as i32),
                DType::I64 => Scalar::I64(v as i64),
                DType::U8 => Scalar::U8(v as u8),
                DType::U16 => Scalar::U16(v as u16),
                DType::U32 => Scalar::U32(v as u32),
                DType::U64 => Scalar::U64(v as u64),
                DType::F32 => Scalar::F32(v as f32),
                DType::F64 => Scalar::F64(v),
            };
        }

        let v = self.as_i128().unwrap_or_default();
        match to {
            DType::Bool => Scalar::Bool(v != 0),
            DType::I8 => Scalar::I8(v as i8),
            DType::I16 => Scalar::I16(v as i16),
            DType::I32 => Scalar::I32(v as i32),
            DType::I64 => Scalar::I64(v as i64),
            DType::U8 => Scalar::U8(v as u8),
            DType::U16 => Scalar::U16(v as u16),
            DType::U32 => Scalar::U32(v as u32),
            DType::U64 => Scalar::U64(v as u64),
            DType::F32 => Scalar::F32(v as f32),
            DType::F64 => Scalar::F64(v as f64),
        }
    }
}

fn fits_integer(value: i128, to: DType) -> bool {
    let (min, max) = match to {
        DType::I8 => (i8::MIN as i128, i8::MAX as i128),
        DType::I16 => (i16::MIN as i128, i16::MAX as i128),
        DType::I32 => (i32::MIN as i128, i32::MAX as i128),
        DType::I64 => (i64::MIN as i128, i64::MAX as i128),
        DType::U8 => (0, u8::MAX as i128),
        DType::U16 => (0, u16::MAX as i128),
        DType::U32 => (0, u32::MAX as i128),
        DType::U64 => (0, u64::MAX as i128),
        _ => return false,
    };
    (min..=max).contains(&value)
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        dispatch!(self, Scalar, v => write!(f, "{v}"))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::I32(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::I64(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::F32(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::F64(value)
    }
}
