use std::fmt::{Display, Formatter};
use std::ops::Range;

use crate::{ArrayError, DType, Element, Scalar};

/// How many values [Array]'s display shows before abbreviating.
const DISPLAY_EDGE_ITEMS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
/// A dense, uncompressed, contiguous run of values sharing one [DType].
pub enum Array {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Array {
    /// Creates a new empty array of the given type.
    pub fn empty(dtype: DType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    /// Creates a new empty array able to hold `capacity` values without
    /// reallocating.
    pub fn with_capacity(dtype: DType, capacity: usize) -> Self {
        match dtype {
            DType::Bool => Array::Bool(Vec::with_capacity(capacity)),
            DType::I8 => Array::I8(Vec::with_capacity(capacity)),
            DType::I16 => Array::I16(Vec::with_capacity(capacity)),
            DType::I32 => Array::I32(Vec::with_capacity(capacity)),
            DType::I64 => Array::I64(Vec::with_capacity(capacity)),
            DType::U8 => Array::U8(Vec::with_capacity(capacity)),
            DType::U16 => Array::U16(Vec::with_capacity(capacity)),
            DType::U32 => Array::U32(Vec::with_capacity(capacity)),
            DType::U64 => Array::U64(Vec::with_capacity(capacity)),
            DType::F32 => Array::F32(Vec::with_capacity(capacity)),
            DType::F64 => Array::F64(Vec::with_capacity(capacity)),
        }
    }

    /// Creates an array of `len` copies of `value`.
    pub fn full(value: Scalar, len: usize) -> Self {
        map_variant!(value, Scalar => Array, v => vec![v; len])
    }

    /// Builds an array of the given type from a set of scalars.
    ///
    /// Each scalar is converted with [Scalar::cast].
    pub fn from_scalars<I>(dtype: DType, values: I) -> Result<Self, ArrayError>
    where
        I: IntoIterator<Item = Scalar>,
    {
        let values = values.into_iter();
        let mut array = Self::with_capacity(dtype, values.size_hint().0);
        for value in values {
            array.push(value)?;
        }
        Ok(array)
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        match self {
            Array::Bool(_) => DType::Bool,
            Array::I8(_) => DType::I8,
            Array::I16(_) => DType::I16,
            Array::I32(_) => DType::I32,
            Array::I64(_) => DType::I64,
            Array::U8(_) => DType::U8,
            Array::U16(_) => DType::U16,
            Array::U32(_) => DType::U32,
            Array::U64(_) => DType::U64,
            Array::F32(_) => DType::F32,
            Array::F64(_) => DType::F64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        dispatch!(self, Array, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    /// The number of bytes the values occupy.
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype().itemsize()
    }

    /// Returns the value at the given position.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        dispatch!(self, Array, v => v.get(index).map(|value| value.into_scalar()))
    }

    /// Iterates over the values as [Scalar]s.
    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Returns the typed values if the array holds elements of type `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice_of(self)
    }

    /// Copies the values within `range` into a new array.
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Array {
        map_variant!(self, Array => Array, v => v[range.clone()].to_vec())
    }

    /// Gathers the values at the given positions into a new array.
    ///
    /// Panics if an index is out of bounds.
    pub fn take(&self, indices: &[usize]) -> Array {
        map_variant!(self, Array => Array, v => indices.iter().map(|&i| v[i]).collect())
    }

    /// Keeps the values whose mask entry is `true`.
    ///
    /// The mask must be exactly as long as the array.
    pub fn filter(&self, mask: &[bool]) -> Array {
        debug_assert_eq!(mask.len(), self.len(), "Mask length should match array");
        map_variant!(self, Array => Array, v => {
            v.iter()
                .zip(mask)
                .filter_map(|(value, keep)| keep.then_some(*value))
                .collect()
        })
    }

    /// Selects `count` values starting at `start` and moving by `step`,
    /// which may be negative.
    pub fn stride(&self, start: usize, step: isize, count: usize) -> Array {
        let indices: Vec<usize> = (0..count)
            .map(|k| (start as isize + k as isize * step) as usize)
            .collect();
        self.take(&indices)
    }

    /// Appends a single value, converting it with [Scalar::cast].
    pub fn push(&mut self, value: Scalar) -> Result<(), ArrayError> {
        let to = self.dtype();
        let value = value.cast(to)?;
        let from = value.dtype();
        zip_variants!(
            (self, value) as (Array, Scalar),
            (values, value) => values.push(value),
            _ => return Err(ArrayError::Cast { from, to }),
        );
        Ok(())
    }

    /// Appends all values of `other` to the end of this array.
    ///
    /// `other` must be of the same type or safely castable to it,
    /// the array is left untouched on error.
    pub fn extend(&mut self, other: &Array) -> Result<(), ArrayError> {
        if other.dtype() != self.dtype() {
            let converted = other.cast(self.dtype())?;
            return self.extend(&converted);
        }

        let (from, to) = (other.dtype(), self.dtype());
        zip_variants!(
            (self, other) as (Array, Array),
            (values, extra) => values.extend_from_slice(extra),
            _ => return Err(ArrayError::Cast { from, to }),
        );
        Ok(())
    }

    /// Converts the array to another type following the safe casting rules
    /// of [DType::can_cast_to].
    pub fn cast(&self, to: DType) -> Result<Array, ArrayError> {
        let from = self.dtype();
        if from == to {
            return Ok(self.clone());
        }
        if !from.can_cast_to(to) {
            return Err(ArrayError::Cast { from, to });
        }

        let mut converted = Array::with_capacity(to, self.len());
        for value in self.iter() {
            converted.push(value.coerce(to))?;
        }
        Ok(converted)
    }

    /// Returns the values as their native, in-memory byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Array::Bool(v) => v.iter().map(|&b| b as u8).collect(),
            Array::I8(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::I16(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::I32(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::I64(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::U8(v) => v.clone(),
            Array::U16(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::U32(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::U64(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::F32(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
            Array::F64(v) => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec(),
        }
    }

    /// Rebuilds an array from the representation produced by [Array::to_bytes].
    ///
    /// Returns `None` if the buffer does not hold a whole number of elements.
    pub fn from_bytes(dtype: DType, bytes: &[u8]) -> Option<Array> {
        if bytes.len() % dtype.itemsize() != 0 {
            return None;
        }

        let array = match dtype {
            DType::Bool => Array::Bool(bytes.iter().map(|&b| b != 0).collect()),
            DType::I8 => Array::I8(pod_vec(bytes)),
            DType::I16 => Array::I16(pod_vec(bytes)),
            DType::I32 => Array::I32(pod_vec(bytes)),
            DType::I64 => Array::I64(pod_vec(bytes)),
            DType::U8 => Array::U8(bytes.to_vec()),
            DType::U16 => Array::U16(pod_vec(bytes)),
            DType::U32 => Array::U32(pod_vec(bytes)),
            DType::U64 => Array::U64(pod_vec(bytes)),
            DType::F32 => Array::F32(pod_vec(bytes)),
            DType::F64 => Array::F64(pod_vec(bytes)),
        };
        Some(array)
    }
}

/// Copies the bytes into a correctly aligned vector of `T`.
fn pod_vec<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    let len = bytes.len() / std::mem::size_of::<T>();
    let mut values: Vec<T> = vec![bytemuck::Zeroable::zeroed(); len];
    bytemuck::cast_slice_mut::<T, u8>(values.as_mut_slice()).copy_from_slice(bytes);
    values
}

impl Display for Array {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let len = self.len();
        write!(f, "[")?;

        let abbreviate = len > DISPLAY_EDGE_ITEMS * 2;
        for (i, value) in self.iter().enumerate() {
            if abbreviate && i >= DISPLAY_EDGE_ITEMS && i < len - DISPLAY_EDGE_ITEMS {
                if i == DISPLAY_EDGE_ITEMS {
                    write!(f, ", ...")?;
                }
                continue;
            }
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }

        write!(f, "]")
    }
}

impl<T: Element> From<Vec<T>> for Array {
    fn from(values: Vec<T>) -> Self {
        T::into_array(values)
    }
}

impl<T: Element> From<&[T]> for Array {
    fn from(values: &[T]) -> Self {
        T::into_array(values.to_vec())
    }
}

impl<T: Element> FromIterator<T> for Array {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        T::into_array(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Array::from(vec![true, false, true]))]
    #[case(Array::from(vec![-3i8, 0, 7]))]
    #[case(Array::from(vec![1i32, -2, i32::MAX]))]
    #[case(Array::from(vec![u64::MAX, 0, 12]))]
    #[case(Array::from(vec![0.5f32, -1.25]))]
    #[case(Array::from(vec![f64::MIN, 0.0, 1e300]))]
    fn test_bytes_roundtrip(#[case] array: Array) {
        let bytes = array.to_bytes();
        assert_eq!(bytes.len(), array.nbytes());

        let restored = Array::from_bytes(array.dtype(), &bytes).expect("Whole elements");
        assert_eq!(restored, array);
    }

    #[test]
    fn test_from_bytes_rejects_partial_elements() {
        assert!(Array::from_bytes(DType::I32, &[0, 1, 2]).is_none());
    }

    #[test]
    fn test_extend_casts_safely() {
        let mut array = Array::from(vec![1i64, 2]);
        array
            .extend(&Array::from(vec![3i32, 4]))
            .expect("i32 widens into i64");
        assert_eq!(array, Array::from(vec![1i64, 2, 3, 4]));

        let err = array.extend(&Array::from(vec![1.5f64])).unwrap_err();
        assert_eq!(
            err,
            ArrayError::Cast {
                from: DType::F64,
                to: DType::I64
            }
        );
        assert_eq!(array.len(), 4, "Failed extend should not mutate");
    }

    #[test]
    fn test_push_casts_by_value() {
        let mut array = Array::from(vec![1i16]);
        array.push(Scalar::I64(300)).expect("300 fits an int16");
        array.push(Scalar::Bool(true)).expect("Booleans widen");
        assert_eq!(array, Array::from(vec![1i16, 300, 1]));

        let err = array.push(Scalar::I64(1 << 20)).unwrap_err();
        assert_eq!(
            err,
            ArrayError::Cast {
                from: DType::I64,
                to: DType::I16
            }
        );
        assert!(array.push(Scalar::F32(0.5)).is_err());
        assert_eq!(array.len(), 3, "Failed push should not mutate");
    }

    #[test]
    fn test_stride_negative_step() {
        let array: Array = (0..10i32).collect();
        assert_eq!(array.stride(9, -3, 4), Array::from(vec![9i32, 6, 3, 0]));
        assert_eq!(array.stride(2, 2, 3), Array::from(vec![2i32, 4, 6]));
    }

    #[test]
    fn test_filter_and_take() {
        let array: Array = (0..5u16).collect();
        let mask = [true, false, false, true, true];
        assert_eq!(array.filter(&mask), Array::from(vec![0u16, 3, 4]));
        assert_eq!(array.take(&[4, 0]), Array::from(vec![4u16, 0]));
    }

    #[test]
    fn test_display_abbreviates() {
        let array: Array = (0..10i64).collect();
        assert_eq!(array.to_string(), "[0, 1, 2, ..., 7, 8, 9]");
        let array: Array = (0..3i64).collect();
        assert_eq!(array.to_string(), "[0, 1, 2]");
    }
}
