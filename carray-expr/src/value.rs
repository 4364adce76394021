use carray_types::{Array, DType, Element, Scalar};

use crate::ExprError;

#[derive(Debug, Clone, PartialEq)]
/// A value bound to a name, or produced by evaluating an expression.
pub enum Value {
    Scalar(Scalar),
    Array(Array),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Scalar(scalar) => scalar.dtype(),
            Value::Array(array) => array.dtype(),
        }
    }

    /// The number of values, or `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(array) => Some(array.len()),
        }
    }

    /// Converts the value into an array of `len` values, repeating
    /// a scalar as needed.
    pub fn into_array(self, len: usize) -> Array {
        match self {
            Value::Scalar(scalar) => Array::full(scalar, len),
            Value::Array(array) => array,
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl<T: Element> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(Array::from(values))
    }
}

macro_rules! value_from_native {
    ($($native:ty),*) => {
        $(
            impl From<$native> for Value {
                fn from(value: $native) -> Self {
                    Value::Scalar(value.into_scalar())
                }
            }
        )*
    };
}

value_from_native!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

#[derive(Debug, Clone, Default)]
/// The binding table an expression is evaluated against.
///
/// Maps every free identifier of the expression onto an array or a scalar.
pub struct Bindings {
    values: ahash::HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, returning the previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    /// Binds `name` to `value` and returns the updated table.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Either one value broadcast over every position, or one value per position.
pub(crate) enum Lane<T> {
    Scalar(T),
    Vector(Vec<T>),
}

impl<T: Copy> Lane<T> {
    pub(crate) fn map<R>(self, f: impl Fn(T) -> R) -> Lane<R> {
        match self {
            Lane::Scalar(v) => Lane::Scalar(f(v)),
            Lane::Vector(values) => Lane::Vector(values.into_iter().map(f).collect()),
        }
    }

    /// Combines two lanes elementwise, broadcasting scalars.
    pub(crate) fn zip<U: Copy, R>(
        self,
        other: Lane<U>,
        f: impl Fn(T, U) -> R,
    ) -> Result<Lane<R>, ExprError> {
        let lane = match (self, other) {
            (Lane::Scalar(a), Lane::Scalar(b)) => Lane::Scalar(f(a, b)),
            (Lane::Scalar(a), Lane::Vector(b)) => {
                Lane::Vector(b.into_iter().map(|b| f(a, b)).collect())
            },
            (Lane::Vector(a), Lane::Scalar(b)) => {
                Lane::Vector(a.into_iter().map(|a| f(a, b)).collect())
            },
            (Lane::Vector(a), Lane::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(ExprError::LengthMismatch {
                        left: a.len(),
                        right: b.len(),
                    });
                }
                Lane::Vector(a.into_iter().zip(b).map(|(a, b)| f(a, b)).collect())
            },
        };
        Ok(lane)
    }

    pub(crate) fn any(&self, predicate: impl Fn(T) -> bool) -> bool {
        match self {
            Lane::Scalar(v) => predicate(*v),
            Lane::Vector(values) => values.iter().any(|v| predicate(*v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// An intermediate value during evaluation.
///
/// All integer types are evaluated as `i64` and all floats as `f64`,
/// `u64` values that do not fit an `i64` are evaluated as floats.
pub(crate) enum Datum {
    Bool(Lane<bool>),
    Int(Lane<i64>),
    Float(Lane<f64>),
}

impl Datum {
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Scalar(scalar) => Self::from_scalar(*scalar),
            Value::Array(array) => Self::from_array(array),
        }
    }

    pub(crate) fn from_scalar(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(v) => Datum::Bool(Lane::Scalar(v)),
            Scalar::F32(v) => Datum::Float(Lane::Scalar(v as f64)),
            Scalar::F64(v) => Datum::Float(Lane::Scalar(v)),
            other => match other.as_i128().map(i64::try_from) {
                Some(Ok(v)) => Datum::Int(Lane::Scalar(v)),
                _ => Datum::Float(Lane::Scalar(other.as_f64())),
            },
        }
    }

    fn from_array(array: &Array) -> Self {
        fn ints<T: Copy>(values: &[T], f: impl Fn(T) -> i64) -> Datum {
            Datum::Int(Lane::Vector(values.iter().map(|v| f(*v)).collect()))
        }

        match array {
            Array::Bool(v) => Datum::Bool(Lane::Vector(v.clone())),
            Array::I8(v) => ints(v, |v| v as i64),
            Array::I16(v) => ints(v, |v| v as i64),
            Array::I32(v) => ints(v, |v| v as i64),
            Array::I64(v) => Datum::Int(Lane::Vector(v.clone())),
            Array::U8(v) => ints(v, |v| v as i64),
            Array::U16(v) => ints(v, |v| v as i64),
            Array::U32(v) => ints(v, |v| v as i64),
            Array::U64(v) if v.iter().all(|v| i64::try_from(*v).is_ok()) => ints(v, |v| v as i64),
            Array::U64(v) => Datum::Float(Lane::Vector(v.iter().map(|v| *v as f64).collect())),
            Array::F32(v) => Datum::Float(Lane::Vector(v.iter().map(|v| *v as f64).collect())),
            Array::F64(v) => Datum::Float(Lane::Vector(v.clone())),
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Datum::Bool(Lane::Scalar(v)) => Value::Scalar(Scalar::Bool(v)),
            Datum::Bool(Lane::Vector(v)) => Value::Array(Array::Bool(v)),
            Datum::Int(Lane::Scalar(v)) => Value::Scalar(Scalar::I64(v)),
            Datum::Int(Lane::Vector(v)) => Value::Array(Array::I64(v)),
            Datum::Float(Lane::Scalar(v)) => Value::Scalar(Scalar::F64(v)),
            Datum::Float(Lane::Vector(v)) => Value::Array(Array::F64(v)),
        }
    }

    #[inline]
    pub(crate) fn is_float(&self) -> bool {
        matches!(self, Datum::Float(_))
    }

    pub(crate) fn into_float(self) -> Lane<f64> {
        match self {
            Datum::Bool(lane) => lane.map(|v| v as u8 as f64),
            Datum::Int(lane) => lane.map(|v| v as f64),
            Datum::Float(lane) => lane,
        }
    }

    /// Returns the values as integers, booleans count as `0` and `1`.
    pub(crate) fn into_int(self) -> Option<Lane<i64>> {
        match self {
            Datum::Bool(lane) => Some(lane.map(|v| v as i64)),
            Datum::Int(lane) => Some(lane),
            Datum::Float(_) => None,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_zip_broadcasts() {
        let lane = Lane::Vector(vec![1i64, 2, 3])
            .zip(Lane::Scalar(10i64), |a, b| a * b)
            .unwrap();
        assert_eq!(lane, Lane::Vector(vec![10, 20, 30]));

        let lane = Lane::Scalar(1.5f64).zip(Lane::Scalar(2.0f64), |a, b| a + b).unwrap();
        assert_eq!(lane, Lane::Scalar(3.5));
    }

    #[test]
    fn test_lane_zip_length_mismatch() {
        let err = Lane::Vector(vec![1i64, 2])
            .zip(Lane::Vector(vec![1i64]), |a, b| a + b)
            .unwrap_err();
        assert_eq!(err, ExprError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_datum_roundtrip_widens() {
        let datum = Datum::from_value(&Value::from(vec![1i32, 2]));
        assert_eq!(datum.into_value(), Value::from(vec![1i64, 2]));

        let datum = Datum::from_value(&Value::from(vec![0.5f32]));
        assert_eq!(datum.into_value(), Value::from(vec![0.5f64]));
    }

    #[test]
    fn test_large_unsigned_values_do_not_wrap() {
        let datum = Datum::from_value(&Value::from(vec![u64::MAX, 1]));
        assert_eq!(
            datum,
            Datum::Float(Lane::Vector(vec![u64::MAX as f64, 1.0]))
        );

        let datum = Datum::from_scalar(Scalar::U64(u64::MAX));
        assert_eq!(datum, Datum::Float(Lane::Scalar(u64::MAX as f64)));

        let datum = Datum::from_value(&Value::from(vec![7u64]));
        assert_eq!(datum, Datum::Int(Lane::Vector(vec![7])));
    }

    #[test]
    fn test_bindings() {
        let bindings = Bindings::new().with("a", 1.5).with("b", vec![1i32, 2]);
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get("a"), Some(&Value::Scalar(Scalar::F64(1.5))));
        assert_eq!(bindings.get("b").and_then(Value::len), Some(2));
        assert!(!bindings.contains("c"));
    }
}
