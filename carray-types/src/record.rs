use std::fmt::{Display, Formatter};

use crate::{Array, ArrayError, DType, Scalar};

#[derive(Debug, Clone, Default, PartialEq)]
/// A structured (record) array.
///
/// This is a set of named, equally long [Array]s where the values at the
/// same position across all fields form one record. Field order is part of
/// the record type.
pub struct StructArray {
    fields: Vec<(String, Array)>,
}

impl StructArray {
    /// Creates a new structured array from the given named fields.
    ///
    /// All fields must be the same length and have unique names.
    pub fn new<N>(fields: Vec<(N, Array)>) -> Result<Self, ArrayError>
    where
        N: Into<String>,
    {
        let fields: Vec<(String, Array)> = fields
            .into_iter()
            .map(|(name, array)| (name.into(), array))
            .collect();

        if let Some((_, first)) = fields.first() {
            for (_, array) in fields.iter().skip(1) {
                if array.len() != first.len() {
                    return Err(ArrayError::LengthMismatch {
                        expected: first.len(),
                        actual: array.len(),
                    });
                }
            }
        }

        for (i, (name, _)) in fields.iter().enumerate() {
            if fields[..i].iter().any(|(existing, _)| existing == name) {
                return Err(ArrayError::DuplicateField(name.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// Builds a structured array from a record schema and a set of rows.
    ///
    /// Every row must provide one value per field, values are converted
    /// with [Scalar::cast].
    pub fn from_rows<N, I>(schema: &[(N, DType)], rows: I) -> Result<Self, ArrayError>
    where
        N: AsRef<str>,
        I: IntoIterator<Item = Vec<Scalar>>,
    {
        let mut columns: Vec<Array> = schema
            .iter()
            .map(|(_, dtype)| Array::empty(*dtype))
            .collect();

        for row in rows {
            if row.len() != columns.len() {
                return Err(ArrayError::LengthMismatch {
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value)?;
            }
        }

        let fields = schema
            .iter()
            .zip(columns)
            .map(|((name, _), column)| (name.as_ref().to_string(), column))
            .collect();
        Self::new(fields)
    }

    #[inline]
    /// The number of records.
    pub fn len(&self) -> usize {
        self.fields.first().map(|(_, array)| array.len()).unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// The field names in record order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// The field types in record order.
    pub fn dtypes(&self) -> Vec<DType> {
        self.fields.iter().map(|(_, array)| array.dtype()).collect()
    }

    /// Returns the values of the field with the given name.
    pub fn field(&self, name: &str) -> Option<&Array> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, array)| array)
    }

    #[inline]
    pub fn fields(&self) -> &[(String, Array)] {
        &self.fields
    }

    #[inline]
    pub fn into_fields(self) -> Vec<(String, Array)> {
        self.fields
    }

    /// Returns the record at the given position.
    pub fn row(&self, index: usize) -> Option<Vec<Scalar>> {
        if index >= self.len() {
            return None;
        }
        self.fields.iter().map(|(_, array)| array.get(index)).collect()
    }

    /// Iterates over all records in order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Scalar>> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}

impl Display for StructArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            write!(f, ")")?;
        }
        write!(f, "]")
    }
}
