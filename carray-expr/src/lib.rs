//! Vectorised evaluation of string expressions.
//!
//! An [Expression] is parsed once and can then be evaluated any number of
//! times against a [Bindings] table mapping each of its free identifiers onto
//! an array or a scalar. Scalars broadcast against arrays, all arrays taking
//! part in one evaluation must have the same length.
//!
//! Integer inputs are evaluated as `i64`, floats as `f64`, so every result is
//! either a boolean, an `int64` or a `float64` value.
//!
//! ```
//! use carray_expr::{Bindings, Expression, Value};
//!
//! let expr = Expression::parse("a * 2 + b").unwrap();
//! let bindings = Bindings::new().with("a", vec![1i32, 2, 3]).with("b", 0.5);
//! let result = expr.evaluate(&bindings).unwrap();
//! assert_eq!(result, Value::from(vec![2.5f64, 4.5, 6.5]));
//! ```

use carray_types::Scalar;
use tracing::debug;

mod eval;
mod functions;
mod parser;
mod value;

pub use self::value::{Bindings, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
/// An error raised while parsing or evaluating an expression.
pub enum ExprError {
    #[error("failed to parse expression: {0}")]
    /// The source is not a well formed expression.
    Parse(String),
    #[error("name {0:?} is not defined")]
    /// The expression references an identifier that is not bound.
    UnknownName(String),
    #[error("unknown function: {0:?}")]
    UnknownFunction(String),
    #[error("{function}() takes {expected} argument(s) but {actual} were given")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("operands could not be broadcast together with lengths {left} and {right}")]
    /// Two array operands have different lengths.
    LengthMismatch { left: usize, right: usize },
    #[error("unsupported: {0}")]
    /// The construct or operand types are not supported.
    Unsupported(String),
    #[error("integers to negative integer powers are not allowed")]
    NegativeIntegerPower,
}

#[derive(Debug, Clone)]
/// A parsed expression.
pub struct Expression {
    source: String,
    root: parser::Node,
    names: Vec<String>,
}

impl Expression {
    /// Parses the given expression source.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let root = parser::parse(source).inspect_err(|e| {
            debug!(error = %e, expression = source, "Failed to parse expression");
        })?;

        let mut names = Vec::new();
        root.collect_names(&mut names);

        Ok(Self {
            source: source.to_string(),
            root,
            names,
        })
    }

    #[inline]
    /// The expression source as it was given.
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    /// The free identifiers of the expression in order of first appearance.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Evaluates the expression against the given bindings.
    ///
    /// Every free identifier must be bound, otherwise the first unbound name
    /// is reported with [ExprError::UnknownName].
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, ExprError> {
        if let Some(missing) = self.names.iter().find(|name| !bindings.contains(name)) {
            return Err(ExprError::UnknownName(missing.clone()));
        }
        eval::evaluate(&self.root, bindings).map(value::Datum::into_value)
    }
}

/// Parses and evaluates `source` against the given bindings in one step.
pub fn evaluate(source: &str, bindings: &Bindings) -> Result<Value, ExprError> {
    Expression::parse(source)?.evaluate(bindings)
}

/// Returns the value of a well known numeric constant.
///
/// These are `pi`, `e`, `inf` and `nan`.
pub fn constant(name: &str) -> Option<Scalar> {
    let value = match name {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        "inf" => f64::INFINITY,
        "nan" => f64::NAN,
        _ => return None,
    };
    Some(Scalar::F64(value))
}
