use crate::value::{Datum, Lane};
use crate::ExprError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// The functions callable from an expression.
pub(crate) enum Function {
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Arctan2,
    Sinh,
    Cosh,
    Tanh,
    Arcsinh,
    Arccosh,
    Arctanh,
    Exp,
    Expm1,
    Log,
    Log10,
    Log1p,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Where,
}

impl Function {
    const ALL: [Function; 23] = [
        Function::Sin,
        Function::Cos,
        Function::Tan,
        Function::Arcsin,
        Function::Arccos,
        Function::Arctan,
        Function::Arctan2,
        Function::Sinh,
        Function::Cosh,
        Function::Tanh,
        Function::Arcsinh,
        Function::Arccosh,
        Function::Arctanh,
        Function::Exp,
        Function::Expm1,
        Function::Log,
        Function::Log10,
        Function::Log1p,
        Function::Sqrt,
        Function::Abs,
        Function::Floor,
        Function::Ceil,
        Function::Where,
    ];

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Arcsin => "arcsin",
            Function::Arccos => "arccos",
            Function::Arctan => "arctan",
            Function::Arctan2 => "arctan2",
            Function::Sinh => "sinh",
            Function::Cosh => "cosh",
            Function::Tanh => "tanh",
            Function::Arcsinh => "arcsinh",
            Function::Arccosh => "arccosh",
            Function::Arctanh => "arctanh",
            Function::Exp => "exp",
            Function::Expm1 => "expm1",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Log1p => "log1p",
            Function::Sqrt => "sqrt",
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Where => "where",
        }
    }

    pub(crate) const fn arity(self) -> usize {
        match self {
            Function::Arctan2 => 2,
            Function::Where => 3,
            _ => 1,
        }
    }

    /// Applies the function to already evaluated arguments.
    pub(crate) fn apply(self, args: Vec<Datum>) -> Result<Datum, ExprError> {
        match self {
            Function::Arctan2 => {
                let [y, x] = self.arguments(args)?;
                Ok(Datum::Float(y.into_float().zip(x.into_float(), f64::atan2)?))
            },
            Function::Where => {
                let [condition, then, otherwise] = self.arguments(args)?;
                select(condition, then, otherwise)
            },
            Function::Abs => match self.arguments(args)? {
                [Datum::Int(lane)] => Ok(Datum::Int(lane.map(i64::wrapping_abs))),
                [Datum::Bool(lane)] => Ok(Datum::Bool(lane)),
                [other] => Ok(Datum::Float(other.into_float().map(f64::abs))),
            },
            unary => {
                let [arg] = self.arguments(args)?;
                Ok(Datum::Float(arg.into_float().map(unary.float_kernel())))
            },
        }
    }

    fn arguments<const N: usize>(self, args: Vec<Datum>) -> Result<[Datum; N], ExprError> {
        let actual = args.len();
        args.try_into().map_err(|_| ExprError::Arity {
            function: self.name(),
            expected: N,
            actual,
        })
    }

    fn float_kernel(self) -> fn(f64) -> f64 {
        match self {
            Function::Sin => f64::sin,
            Function::Cos => f64::cos,
            Function::Tan => f64::tan,
            Function::Arcsin => f64::asin,
            Function::Arccos => f64::acos,
            Function::Arctan => f64::atan,
            Function::Sinh => f64::sinh,
            Function::Cosh => f64::cosh,
            Function::Tanh => f64::tanh,
            Function::Arcsinh => f64::asinh,
            Function::Arccosh => f64::acosh,
            Function::Arctanh => f64::atanh,
            Function::Exp => f64::exp,
            Function::Expm1 => f64::exp_m1,
            Function::Log => f64::ln,
            Function::Log10 => f64::log10,
            Function::Log1p => f64::ln_1p,
            Function::Sqrt => f64::sqrt,
            Function::Floor => f64::floor,
            Function::Ceil => f64::ceil,
            Function::Abs => f64::abs,
            Function::Arctan2 | Function::Where => |v| v,
        }
    }
}

/// Picks `then` where the condition holds and `otherwise` elsewhere.
fn select(condition: Datum, then: Datum, otherwise: Datum) -> Result<Datum, ExprError> {
    let condition = match condition {
        Datum::Bool(lane) => lane,
        Datum::Int(lane) => lane.map(|v| v != 0),
        Datum::Float(_) => {
            return Err(ExprError::Unsupported(
                "where() condition must be boolean".to_string(),
            ))
        },
    };

    fn pick<T: Copy>(
        condition: Lane<bool>,
        then: Lane<T>,
        otherwise: Lane<T>,
    ) -> Result<Lane<T>, ExprError> {
        condition
            .zip(then, |c, t| (c, t))?
            .zip(otherwise, |(c, t), o| if c { t } else { o })
    }

    let datum = match (then, otherwise) {
        (Datum::Bool(t), Datum::Bool(o)) => Datum::Bool(pick(condition, t, o)?),
        (t, o) if t.is_float() || o.is_float() => {
            Datum::Float(pick(condition, t.into_float(), o.into_float())?)
        },
        (t, o) => {
            let (Some(t), Some(o)) = (t.into_int(), o.into_int()) else {
                return Err(ExprError::Unsupported("where() operands".to_string()));
            };
            Datum::Int(pick(condition, t, o)?)
        },
    };
    Ok(datum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("sin", Some(Function::Sin))]
    #[case("arctan2", Some(Function::Arctan2))]
    #[case("where", Some(Function::Where))]
    #[case("sine", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<Function>) {
        assert_eq!(Function::from_name(name), expected);
    }

    #[test]
    fn test_where_promotes() {
        let result = Function::Where
            .apply(vec![
                Datum::Bool(Lane::Vector(vec![true, false, true])),
                Datum::Int(Lane::Scalar(1)),
                Datum::Float(Lane::Vector(vec![0.5, 1.5, 2.5])),
            ])
            .unwrap();
        assert_eq!(result, Datum::Float(Lane::Vector(vec![1.0, 1.5, 1.0])));
    }

    #[test]
    fn test_abs_keeps_integers() {
        let result = Function::Abs
            .apply(vec![Datum::Int(Lane::Vector(vec![-2, 3]))])
            .unwrap();
        assert_eq!(result, Datum::Int(Lane::Vector(vec![2, 3])));
    }

    #[test]
    fn test_arctan2() {
        let result = Function::Arctan2
            .apply(vec![Datum::Int(Lane::Scalar(1)), Datum::Int(Lane::Scalar(1))])
            .unwrap();
        assert_eq!(
            result,
            Datum::Float(Lane::Scalar(std::f64::consts::FRAC_PI_4))
        );
    }
}
