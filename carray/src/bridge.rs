//! Resolves the free names of an expression against a table.

use std::ops::Range;
use std::sync::Arc;

use carray_expr::{Bindings, ExprError, Expression, Value};
use carray_types::{Array, Scalar};
use tracing::trace;

use crate::{CArray, CTable, Error};

/// Where the value bound to a name comes from.
enum Source<'a> {
    /// A column of the table, decompressed one block at a time.
    Column(Arc<CArray>),
    /// An array supplied by the caller, as long as the table.
    Array(&'a Array),
    /// A scalar supplied by the caller or a built-in constant.
    Scalar(Scalar),
}

/// An expression whose free names have been resolved against a table.
pub(crate) struct BoundExpression<'a> {
    expression: Expression,
    sources: Vec<(String, Source<'a>)>,
    len: usize,
}

impl<'a> BoundExpression<'a> {
    /// Parses the expression and resolves each free name.
    ///
    /// Names resolve to a column of the table first, then to a
    /// caller supplied variable, then to a built-in constant.
    pub(crate) fn bind(
        table: &CTable,
        expression: &str,
        vars: &'a Bindings,
    ) -> Result<Self, Error> {
        let expression = Expression::parse(expression)?;
        let len = table.len();

        let mut sources = Vec::with_capacity(expression.names().len());
        for name in expression.names() {
            let source = if let Some(column) = table.find_column(name) {
                Source::Column(column.clone())
            } else if let Some(value) = vars.get(name) {
                match value {
                    Value::Scalar(scalar) => Source::Scalar(*scalar),
                    Value::Array(array) if array.len() == len => Source::Array(array),
                    Value::Array(array) => {
                        return Err(Error::LengthMismatch {
                            expected: len,
                            actual: array.len(),
                        })
                    },
                }
            } else if let Some(constant) = carray_expr::constant(name) {
                Source::Scalar(constant)
            } else {
                return Err(ExprError::UnknownName(name.clone()).into());
            };
            sources.push((name.clone(), source));
        }

        Ok(Self {
            expression,
            sources,
            len,
        })
    }

    /// Evaluates the expression over the rows within `range`.
    ///
    /// The result always holds one value per row.
    pub(crate) fn evaluate(&self, range: Range<usize>) -> Result<Array, Error> {
        let mut bindings = Bindings::new();
        for (name, source) in &self.sources {
            let value = match source {
                Source::Column(column) => Value::Array(column.get_range(range.start, range.end)?),
                Source::Array(array) => Value::Array(array.slice(range.clone())),
                Source::Scalar(scalar) => Value::Scalar(*scalar),
            };
            bindings.insert(name.as_str(), value);
        }

        trace!(
            expression = self.expression.source(),
            start = range.start,
            stop = range.end,
            "Evaluating block",
        );
        let result = self.expression.evaluate(&bindings)?;
        Ok(result.into_array(range.len()))
    }

    /// Evaluates the expression block by block, passing each result to `f`.
    ///
    /// An empty table is still evaluated once so the result type is known.
    pub(crate) fn for_each_block(
        &self,
        block_len: usize,
        mut f: impl FnMut(Array) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if self.len == 0 {
            return f(self.evaluate(0..0)?);
        }

        let block_len = block_len.max(1);
        for start in (0..self.len).step_by(block_len) {
            let stop = (start + block_len).min(self.len);
            f(self.evaluate(start..stop)?)?;
        }
        Ok(())
    }
}
