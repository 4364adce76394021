use std::fmt::{Display, Formatter};
use std::mem;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::sync::Arc;

use carray_expr::Bindings;
use carray_types::{Array, DType, Element, Scalar, Slice, StructArray};
use tracing::{debug, info, instrument};

use crate::bridge::BoundExpression;
use crate::carray::StagedAppend;
use crate::config::{ArrayOptions, CopyOptions};
use crate::{CArray, Error};

/// Rows shown at each end of an abbreviated display.
const DISPLAY_EDGE_ROWS: usize = 3;

/// Returns the lowest `f{N}` name not already used by a column.
pub fn next_default_name<S: AsRef<str>>(names: &[S]) -> String {
    (0..)
        .map(|n: usize| format!("f{n}"))
        .find(|candidate| !names.iter().any(|name| name.as_ref() == candidate))
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
/// The values of a new column.
pub enum ColumnSource {
    /// Dense values, compressed with the table's options.
    Array(Array),
    CArray(CArray),
    /// An existing compressed array, shared rather than copied.
    Shared(Arc<CArray>),
}

impl ColumnSource {
    pub fn len(&self) -> usize {
        match self {
            ColumnSource::Array(array) => array.len(),
            ColumnSource::CArray(carray) => carray.len(),
            ColumnSource::Shared(carray) => carray.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_column(self, options: &ArrayOptions) -> Result<Arc<CArray>, Error> {
        match self {
            ColumnSource::Array(array) => {
                Ok(Arc::new(CArray::from_array(&array, options.clone())?))
            },
            ColumnSource::CArray(carray) => Ok(Arc::new(carray)),
            ColumnSource::Shared(carray) => Ok(carray),
        }
    }

    fn to_array(&self) -> Result<Array, Error> {
        match self {
            ColumnSource::Array(array) => Ok(array.clone()),
            ColumnSource::CArray(carray) => carray.to_array(),
            ColumnSource::Shared(carray) => carray.to_array(),
        }
    }
}

impl From<Array> for ColumnSource {
    fn from(value: Array) -> Self {
        ColumnSource::Array(value)
    }
}

impl<T: Element> From<Vec<T>> for ColumnSource {
    fn from(values: Vec<T>) -> Self {
        ColumnSource::Array(Array::from(values))
    }
}

impl From<CArray> for ColumnSource {
    fn from(value: CArray) -> Self {
        ColumnSource::CArray(value)
    }
}

impl From<Arc<CArray>> for ColumnSource {
    fn from(value: Arc<CArray>) -> Self {
        ColumnSource::Shared(value)
    }
}

#[derive(Debug, Clone)]
/// The rows appended to a table by [CTable::append].
pub enum AppendSource {
    /// A single row holding one value per column.
    Row(Vec<Scalar>),
    /// One set of values per column, all of the same length.
    Columns(Vec<ColumnSource>),
    /// A structured array whose fields map onto the columns by position.
    Struct(StructArray),
    /// Another table whose columns map onto the columns by position.
    Table(CTable),
}

impl From<Vec<Scalar>> for AppendSource {
    fn from(value: Vec<Scalar>) -> Self {
        AppendSource::Row(value)
    }
}

impl From<Vec<ColumnSource>> for AppendSource {
    fn from(value: Vec<ColumnSource>) -> Self {
        AppendSource::Columns(value)
    }
}

impl From<Vec<Array>> for AppendSource {
    fn from(value: Vec<Array>) -> Self {
        AppendSource::Columns(value.into_iter().map(ColumnSource::from).collect())
    }
}

impl From<StructArray> for AppendSource {
    fn from(value: StructArray) -> Self {
        AppendSource::Struct(value)
    }
}

impl From<CTable> for AppendSource {
    fn from(value: CTable) -> Self {
        AppendSource::Table(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Identifies a column by position or by name.
pub enum ColumnRef {
    Position(usize),
    Name(String),
}

impl From<usize> for ColumnRef {
    fn from(value: usize) -> Self {
        ColumnRef::Position(value)
    }
}

impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        ColumnRef::Name(value.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::Name(value)
    }
}

#[derive(Debug, Clone)]
/// A key accepted by [CTable::get].
pub enum Key {
    /// A single row.
    Index(usize),
    /// A range of rows.
    Slice(Slice),
    /// A column name, or a filter expression if no column has that name.
    Name(String),
    /// A set of columns, in the given order.
    Names(Vec<String>),
    /// A boolean mask selecting rows.
    Mask(Array),
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(value)
    }
}

impl From<Slice> for Key {
    fn from(value: Slice) -> Self {
        Key::Slice(value)
    }
}

impl From<Range<usize>> for Key {
    fn from(value: Range<usize>) -> Self {
        Key::Slice(value.into())
    }
}

impl From<RangeFrom<usize>> for Key {
    fn from(value: RangeFrom<usize>) -> Self {
        Key::Slice(value.into())
    }
}

impl From<RangeTo<usize>> for Key {
    fn from(value: RangeTo<usize>) -> Self {
        Key::Slice(value.into())
    }
}

impl From<RangeFull> for Key {
    fn from(value: RangeFull) -> Self {
        Key::Slice(value.into())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Name(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Name(value)
    }
}

impl From<Vec<&str>> for Key {
    fn from(value: Vec<&str>) -> Self {
        Key::Names(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Key {
    fn from(value: Vec<String>) -> Self {
        Key::Names(value)
    }
}

impl From<Array> for Key {
    fn from(value: Array) -> Self {
        Key::Mask(value)
    }
}

impl From<Vec<bool>> for Key {
    fn from(value: Vec<bool>) -> Self {
        Key::Mask(Array::Bool(value))
    }
}

#[derive(Debug, Clone)]
/// The result of [CTable::get].
pub enum Selection {
    /// A single record.
    Row(Vec<Scalar>),
    /// A set of records.
    Rows(StructArray),
    /// A column shared with the table.
    Column(Arc<CArray>),
    /// A table sharing a subset of the columns.
    Table(CTable),
}

impl Selection {
    pub fn into_row(self) -> Option<Vec<Scalar>> {
        match self {
            Selection::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Option<StructArray> {
        match self {
            Selection::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn into_column(self) -> Option<Arc<CArray>> {
        match self {
            Selection::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<CTable> {
        match self {
            Selection::Table(table) => Some(table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// A table of named, equally long compressed columns.
///
/// Columns are shared behind an [Arc], handing out a column never copies
/// its data. Mutating the table copies a column first if a handle on it is
/// still held elsewhere, so handles never observe a change made through
/// the table.
///
/// Every mutation is all or nothing: if one column cannot take part, no
/// column is changed.
pub struct CTable {
    names: Vec<String>,
    columns: Vec<Arc<CArray>>,
    len: usize,
    /// The options used for columns created by the table.
    options: ArrayOptions,
}

impl CTable {
    /// Creates a new table without any columns.
    pub fn new(options: ArrayOptions) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            len: 0,
            options,
        }
    }

    /// Creates a table from a set of columns.
    ///
    /// Without explicit names the columns are named `f0`, `f1`, ...
    pub fn from_columns<I, C>(
        columns: I,
        names: Option<&[&str]>,
        options: ArrayOptions,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnSource>,
    {
        let columns: Vec<ColumnSource> = columns.into_iter().map(Into::into).collect();
        if let Some(names) = names {
            if names.len() != columns.len() {
                return Err(Error::ColumnCountMismatch {
                    expected: columns.len(),
                    actual: names.len(),
                });
            }
        }

        let mut table = Self::new(options);
        for (i, column) in columns.into_iter().enumerate() {
            let name = names.map(|names| names[i]);
            table.addcol(column, name, None)?;
        }
        Ok(table)
    }

    /// Creates a table with one column per field of a structured array.
    pub fn from_struct_array(records: &StructArray, options: ArrayOptions) -> Result<Self, Error> {
        let mut table = Self::new(options);
        for (name, values) in records.fields() {
            table.addcol(values.clone(), Some(name.as_str()), None)?;
        }
        Ok(table)
    }

    #[inline]
    /// The number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    /// The column names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The column types in column order.
    pub fn dtypes(&self) -> Vec<DType> {
        self.columns.iter().map(|column| column.dtype()).collect()
    }

    #[inline]
    pub fn options(&self) -> &ArrayOptions {
        &self.options
    }

    /// The uncompressed size of all columns in bytes.
    pub fn nbytes(&self) -> usize {
        self.columns.iter().map(|column| column.nbytes()).sum()
    }

    /// The compressed size of all columns in bytes.
    pub fn cbytes(&self) -> usize {
        self.columns.iter().map(|column| column.cbytes()).sum()
    }

    /// The memory held by the table including the bookkeeping of the table
    /// and of each column.
    ///
    /// For small tables this is usually larger than [CTable::nbytes].
    pub fn size_in_memory(&self) -> usize {
        let columns: usize = self
            .names
            .iter()
            .zip(&self.columns)
            .map(|(name, column)| {
                mem::size_of::<String>()
                    + name.len()
                    + mem::size_of::<Arc<CArray>>()
                    + column.size_in_memory()
            })
            .sum();
        mem::size_of::<Self>() + columns
    }

    pub(crate) fn find_column(&self, name: &str) -> Option<&Arc<CArray>> {
        self.position(name).map(|pos| &self.columns[pos])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|existing| existing == name)
    }

    /// Returns a shared handle on the column with the given name.
    pub fn column(&self, name: &str) -> Result<Arc<CArray>, Error> {
        self.find_column(name)
            .cloned()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Iterates over the columns and their names in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Arc<CArray>)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    #[instrument(skip(self, source))]
    /// Adds a column to the table.
    ///
    /// Unless the table has no columns yet, the column must be as long as
    /// the table. Without a name the column gets the lowest unused `f{N}`
    /// name, without a position it is added after the last column.
    pub fn addcol(
        &mut self,
        source: impl Into<ColumnSource>,
        name: Option<&str>,
        pos: Option<usize>,
    ) -> Result<(), Error> {
        let source = source.into();
        if !self.columns.is_empty() && source.len() != self.len {
            return Err(Error::LengthMismatch {
                expected: self.len,
                actual: source.len(),
            });
        }

        let name = match name {
            Some(name) if self.position(name).is_some() => {
                return Err(Error::DuplicateColumn(name.to_string()))
            },
            Some(name) => name.to_string(),
            None => next_default_name(&self.names),
        };

        let pos = pos.unwrap_or(self.columns.len());
        if pos > self.columns.len() {
            return Err(Error::IndexOutOfRange {
                index: pos,
                len: self.columns.len(),
            });
        }

        let column = source.into_column(&self.options)?;
        debug!(name = %name, pos, dtype = %column.dtype(), "Adding column");

        self.len = column.len();
        self.names.insert(pos, name);
        self.columns.insert(pos, column);
        Ok(())
    }

    /// Removes a column from the table, returning it.
    ///
    /// The remaining columns keep their order and names.
    pub fn delcol(&mut self, column: impl Into<ColumnRef>) -> Result<Arc<CArray>, Error> {
        let pos = match column.into() {
            ColumnRef::Position(pos) if pos < self.columns.len() => pos,
            ColumnRef::Position(pos) => {
                return Err(Error::IndexOutOfRange {
                    index: pos,
                    len: self.columns.len(),
                })
            },
            ColumnRef::Name(name) => self
                .position(&name)
                .ok_or(Error::UnknownColumn(name))?,
        };

        let name = self.names.remove(pos);
        let column = self.columns.remove(pos);
        debug!(name = %name, pos, "Removed column");

        if self.columns.is_empty() {
            self.len = 0;
        }
        Ok(column)
    }

    #[instrument(skip_all, fields(table_rows = self.len))]
    /// Appends rows to every column.
    ///
    /// Either all columns grow by the same number of rows or, if any of the
    /// values cannot be stored in its column, the table is left unchanged.
    pub fn append(&mut self, rows: impl Into<AppendSource>) -> Result<(), Error> {
        let blocks = self.rows_to_blocks(rows.into())?;

        let num_rows = blocks.first().map(Array::len).unwrap_or(0);
        if let Some(block) = blocks.iter().find(|block| block.len() != num_rows) {
            return Err(Error::LengthMismatch {
                expected: num_rows,
                actual: block.len(),
            });
        }

        let staged = self
            .columns
            .iter()
            .zip(&blocks)
            .map(|(column, block)| column.stage_append(block))
            .collect::<Result<Vec<StagedAppend>, Error>>()?;

        for (column, staged) in self.columns.iter_mut().zip(staged) {
            Arc::make_mut(column).commit(staged);
        }
        self.len += num_rows;

        debug!(num_rows, "Appended rows");
        Ok(())
    }

    /// Splits the appended rows into one dense block per column.
    fn rows_to_blocks(&self, rows: AppendSource) -> Result<Vec<Array>, Error> {
        let expect_columns = |actual: usize| {
            if actual == self.columns.len() {
                Ok(())
            } else {
                Err(Error::ColumnCountMismatch {
                    expected: self.columns.len(),
                    actual,
                })
            }
        };

        match rows {
            AppendSource::Row(values) => {
                expect_columns(values.len())?;
                self.columns
                    .iter()
                    .zip(values)
                    .map(|(column, value)| {
                        Array::from_scalars(column.dtype(), [value]).map_err(Error::from)
                    })
                    .collect()
            },
            AppendSource::Columns(sources) => {
                expect_columns(sources.len())?;
                sources.iter().map(ColumnSource::to_array).collect()
            },
            AppendSource::Struct(records) => {
                expect_columns(records.num_fields())?;
                Ok(records.into_fields().into_iter().map(|(_, values)| values).collect())
            },
            AppendSource::Table(table) => {
                expect_columns(table.num_columns())?;
                table.columns.iter().map(|column| column.to_array()).collect()
            },
        }
    }

    #[instrument(skip(self), fields(rows = self.len))]
    /// Creates an independent copy of the table.
    ///
    /// The overrides in `options` apply to every column.
    pub fn copy(&self, options: CopyOptions) -> Result<CTable, Error> {
        let columns = self
            .columns
            .iter()
            .map(|column| column.copy(options).map(Arc::new))
            .collect::<Result<Vec<_>, Error>>()?;

        let table_options = ArrayOptions {
            cparams: options.apply(self.options.cparams)?,
            ..self.options.clone()
        };

        Ok(CTable {
            names: self.names.clone(),
            columns,
            len: self.len,
            options: table_options,
        })
    }

    /// Looks up rows or columns of the table.
    ///
    /// - an index returns that row.
    /// - a slice returns the rows it selects.
    /// - the name of a column returns the column.
    /// - any other string is evaluated as a filter expression and returns
    ///   the rows where it holds.
    /// - a list of names returns a table of those columns.
    /// - a boolean mask returns the rows where it is `true`.
    pub fn get(&self, key: impl Into<Key>) -> Result<Selection, Error> {
        match key.into() {
            Key::Index(index) => self.row(index).map(Selection::Row),
            Key::Slice(slice) => self.rows(slice).map(Selection::Rows),
            Key::Name(name) => match self.find_column(&name) {
                Some(column) => Ok(Selection::Column(column.clone())),
                None => self.filter(&name).map(Selection::Rows),
            },
            Key::Names(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                self.select(&names).map(Selection::Table)
            },
            Key::Mask(mask) => self.filter_mask(&mask).map(Selection::Rows),
        }
    }

    /// Returns the row at the given position.
    pub fn row(&self, index: usize) -> Result<Vec<Scalar>, Error> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.columns.iter().map(|column| column.get(index)).collect()
    }

    /// Returns the rows selected by a slice.
    pub fn rows(&self, slice: impl Into<Slice>) -> Result<StructArray, Error> {
        let slice = slice.into();
        let fields = self
            .columns()
            .map(|(name, column)| -> Result<(String, Array), Error> {
                Ok((name.to_string(), column.get_slice(slice)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(StructArray::new(fields)?)
    }

    /// Returns a table sharing the given columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<CTable, Error> {
        let mut seen = ahash::HashSet::default();
        let mut table = CTable::new(self.options.clone());
        for name in names {
            if !seen.insert(*name) {
                return Err(Error::DuplicateColumn(name.to_string()));
            }
            table.names.push(name.to_string());
            table.columns.push(self.column(name)?);
        }
        table.len = if table.columns.is_empty() { 0 } else { self.len };
        Ok(table)
    }

    #[instrument(skip(self), fields(rows = self.len))]
    /// Returns the rows where the boolean expression holds.
    pub fn filter(&self, expression: &str) -> Result<StructArray, Error> {
        let vars = Bindings::new();
        let bound = BoundExpression::bind(self, expression, &vars)?;

        let mut mask = Vec::with_capacity(self.len);
        bound.for_each_block(self.eval_block_len(), |block| match block {
            Array::Bool(values) => {
                mask.extend(values);
                Ok(())
            },
            other => Err(Error::Unsupported(format!(
                "filter expression must produce booleans, got {}",
                other.dtype()
            ))),
        })?;

        self.filter_mask(&Array::Bool(mask))
    }

    /// Returns the rows where the mask is `true`.
    ///
    /// The mask must be a boolean array exactly as long as the table.
    pub fn filter_mask(&self, mask: &Array) -> Result<StructArray, Error> {
        let Array::Bool(mask) = mask else {
            return Err(Error::Unsupported(format!(
                "rows can only be selected with a bool array, got {}",
                mask.dtype()
            )));
        };
        if mask.len() != self.len {
            return Err(Error::LengthMismatch {
                expected: self.len,
                actual: mask.len(),
            });
        }

        let fields = self
            .columns()
            .map(|(name, column)| -> Result<(String, Array), Error> {
                Ok((name.to_string(), column.filter(mask)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(StructArray::new(fields)?)
    }

    /// Evaluates an expression over the rows of the table.
    ///
    /// See [CTable::eval_with_options], the result is compressed with the
    /// table's options.
    pub fn eval(&self, expression: &str, vars: &Bindings) -> Result<CArray, Error> {
        self.eval_with_options(expression, vars, self.options.clone())
    }

    #[instrument(skip(self, vars, options), fields(rows = self.len))]
    /// Evaluates an expression over the rows of the table.
    ///
    /// Names in the expression refer to the columns of the table first,
    /// then to `vars`, then to the constants `pi`, `e`, `inf` and `nan`.
    /// Arrays in `vars` must be as long as the table.
    ///
    /// The table is evaluated block by block so only one block of each
    /// referenced column is decompressed at any time.
    pub fn eval_with_options(
        &self,
        expression: &str,
        vars: &Bindings,
        mut options: ArrayOptions,
    ) -> Result<CArray, Error> {
        let bound = BoundExpression::bind(self, expression, vars)?;
        if options.expected_len.is_none() {
            options.expected_len = Some(self.len);
        }

        let mut result: Option<CArray> = None;
        bound.for_each_block(self.eval_block_len(), |block| {
            if result.is_none() {
                result = Some(CArray::new(block.dtype(), options.clone())?);
            }
            match result.as_mut() {
                Some(carray) => carray.append(&block),
                None => Ok(()),
            }
        })?;

        info!(rows = self.len, "Evaluated expression");
        result.ok_or_else(|| Error::Unsupported("expression produced no result".to_string()))
    }

    /// The number of rows evaluated at once.
    fn eval_block_len(&self) -> usize {
        match self.options.chunk_len {
            Some(len) => len,
            None => crate::config::chunk_len_for(DType::F64, Some(self.len)),
        }
    }
}

impl Display for CTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let schema = self
            .columns()
            .map(|(name, column)| format!("('{name}', {})", column.dtype()))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "ctable(({},), [{schema}])", self.len)?;

        let ratio = if self.cbytes() == 0 {
            0.0
        } else {
            self.nbytes() as f64 / self.cbytes() as f64
        };
        writeln!(
            f,
            "  nbytes: {}; cbytes: {}; ratio: {ratio:.2}",
            self.nbytes(),
            self.cbytes(),
        )?;
        writeln!(f, "  {}", self.options.cparams)?;

        let preview = if self.len <= DISPLAY_EDGE_ROWS * 2 {
            self.rows(Slice::full()).map(|rows| rows.to_string())
        } else {
            self.rows(0..DISPLAY_EDGE_ROWS).and_then(|head| {
                let tail = self.rows(self.len - DISPLAY_EDGE_ROWS..)?;
                let head = head.to_string();
                let tail = tail.to_string();
                Ok(format!(
                    "{}, ..., {}",
                    head.trim_end_matches(']'),
                    tail.trim_start_matches('[')
                ))
            })
        };
        match preview {
            Ok(rows) => write!(f, "{rows}"),
            Err(e) => write!(f, "[<unreadable: {e}>]"),
        }
    }
}
