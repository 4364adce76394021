use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
/// The element type of a column.
///
/// Every element of a column shares one fixed width type, these types have
/// no concept of nested structures. A structured record is represented as
/// an ordered set of columns instead.
pub enum DType {
    Bool = 1,
    I8 = 2,
    I16 = 3,
    I32 = 4,
    I64 = 5,
    U8 = 6,
    U16 = 7,
    U32 = 8,
    U64 = 9,
    F32 = 10,
    F64 = 11,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// The family a [DType] belongs to.
pub enum Kind {
    Bool,
    UnsignedInt,
    SignedInt,
    Float,
}

impl DType {
    /// All supported element types.
    pub const ALL: [DType; 11] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    #[inline]
    /// The size in bytes of a single element.
    pub const fn itemsize(self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    #[inline]
    pub const fn kind(self) -> Kind {
        match self {
            DType::Bool => Kind::Bool,
            DType::I8 | DType::I16 | DType::I32 | DType::I64 => Kind::SignedInt,
            DType::U8 | DType::U16 | DType::U32 | DType::U64 => Kind::UnsignedInt,
            DType::F32 | DType::F64 => Kind::Float,
        }
    }

    /// The canonical lower case name of the type, e.g. `int32`.
    pub const fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "int8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::U8 => "uint8",
            DType::U16 => "uint16",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }

    /// Returns if every value of `self` can be represented exactly by `to`.
    ///
    /// This follows the "safe" casting rules of typical array libraries,
    /// booleans widen into any type, integers widen into larger integers and
    /// into floats wide enough to hold them, floats only widen into floats.
    pub fn can_cast_to(self, to: DType) -> bool {
        if self == to {
            return true;
        }

        let (from_size, to_size) = (self.itemsize(), to.itemsize());
        match (self.kind(), to.kind()) {
            (Kind::Bool, _) => true,
            (_, Kind::Bool) => false,
            (Kind::UnsignedInt, Kind::UnsignedInt) => to_size >= from_size,
            (Kind::UnsignedInt, Kind::SignedInt) => to_size > from_size,
            (Kind::SignedInt, Kind::UnsignedInt) => false,
            (Kind::SignedInt, Kind::SignedInt) => to_size >= from_size,
            (Kind::UnsignedInt | Kind::SignedInt, Kind::Float) => {
                from_size <= 2 || to_size == 8
            },
            (Kind::Float, Kind::Float) => to_size >= from_size,
            (Kind::Float, _) => false,
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown element type: {0:?}")]
/// The provided string does not name a supported [DType].
pub struct UnknownDType(pub String);

impl FromStr for DType {
    type Err = UnknownDType;

    /// Parses either the canonical name (`float64`) or the short
    /// type code (`f8`, `i4`, `b1`...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dtype = match s {
            "bool" | "b1" | "?" => DType::Bool,
            "int8" | "i1" => DType::I8,
            "int16" | "i2" => DType::I16,
            "int32" | "i4" => DType::I32,
            "int64" | "i8" => DType::I64,
            "uint8" | "u1" => DType::U8,
            "uint16" | "u2" => DType::U16,
            "uint32" | "u4" => DType::U32,
            "uint64" | "u8" => DType::U64,
            "float32" | "f4" => DType::F32,
            "float64" | "f8" => DType::F64,
            other => return Err(UnknownDType(other.to_string())),
        };
        Ok(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(DType::Bool, DType::F64, true)]
    #[case(DType::I32, DType::I64, true)]
    #[case(DType::I64, DType::I32, false)]
    #[case(DType::I32, DType::F64, true)]
    #[case(DType::I32, DType::F32, false)]
    #[case(DType::I16, DType::F32, true)]
    #[case(DType::U8, DType::I16, true)]
    #[case(DType::U16, DType::I16, false)]
    #[case(DType::I8, DType::U64, false)]
    #[case(DType::F64, DType::F32, false)]
    #[case(DType::F32, DType::F64, true)]
    #[case(DType::F64, DType::I64, false)]
    #[case(DType::I64, DType::Bool, false)]
    fn test_safe_casting(#[case] from: DType, #[case] to: DType, #[case] expected: bool) {
        assert_eq!(
            from.can_cast_to(to),
            expected,
            "Expected cast {from} -> {to} to be safe={expected}"
        );
    }

    #[test]
    fn test_parse_dtype_names() {
        for dtype in DType::ALL {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
        assert_eq!("f8".parse::<DType>().unwrap(), DType::F64);
        assert_eq!("i4".parse::<DType>().unwrap(), DType::I32);
        assert!("complex128".parse::<DType>().is_err());
    }
}
