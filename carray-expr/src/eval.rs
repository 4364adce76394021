use crate::parser::{BinaryOp, Literal, Node, UnaryOp};
use crate::value::{Datum, Lane};
use crate::{Bindings, ExprError};

/// Evaluates the tree against the bindings.
pub(crate) fn evaluate(node: &Node, bindings: &Bindings) -> Result<Datum, ExprError> {
    match node {
        Node::Ident(name) => bindings
            .get(name)
            .map(Datum::from_value)
            .ok_or_else(|| ExprError::UnknownName(name.clone())),
        Node::Literal(literal) => Ok(match *literal {
            Literal::Bool(v) => Datum::Bool(Lane::Scalar(v)),
            Literal::Int(v) => Datum::Int(Lane::Scalar(v)),
            Literal::Float(v) => Datum::Float(Lane::Scalar(v)),
        }),
        Node::Unary(op, inner) => unary(*op, evaluate(inner, bindings)?),
        Node::Binary(op, left, right) => {
            binary(*op, evaluate(left, bindings)?, evaluate(right, bindings)?)
        },
        Node::Call(function, args) => {
            let args = args
                .iter()
                .map(|arg| evaluate(arg, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            function.apply(args)
        },
    }
}

fn unary(op: UnaryOp, value: Datum) -> Result<Datum, ExprError> {
    let datum = match (op, value) {
        (UnaryOp::Pos, Datum::Bool(lane)) => Datum::Int(lane.map(|v| v as i64)),
        (UnaryOp::Pos, value) => value,
        (UnaryOp::Neg, Datum::Bool(lane)) => Datum::Int(lane.map(|v| -(v as i64))),
        (UnaryOp::Neg, Datum::Int(lane)) => Datum::Int(lane.map(i64::wrapping_neg)),
        (UnaryOp::Neg, Datum::Float(lane)) => Datum::Float(lane.map(|v| -v)),
        (UnaryOp::Not, Datum::Bool(lane)) => Datum::Bool(lane.map(|v| !v)),
        (UnaryOp::Not, Datum::Int(lane)) => Datum::Int(lane.map(|v| !v)),
        (UnaryOp::Not, Datum::Float(_)) => {
            return Err(ExprError::Unsupported(
                "logical negation of a float operand".to_string(),
            ))
        },
    };
    Ok(datum)
}

fn binary(op: BinaryOp, left: Datum, right: Datum) -> Result<Datum, ExprError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod => {
            arithmetic(op, left, right)
        },
        BinaryOp::Div => Ok(Datum::Float(
            left.into_float().zip(right.into_float(), |a, b| a / b)?,
        )),
        BinaryOp::Pow => power(left, right),
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => compare(op, left, right),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => logical(op, left, right),
    }
}

fn arithmetic(op: BinaryOp, left: Datum, right: Datum) -> Result<Datum, ExprError> {
    if left.is_float() || right.is_float() {
        let f: fn(f64, f64) -> f64 = match op {
            BinaryOp::Add => |a, b| a + b,
            BinaryOp::Sub => |a, b| a - b,
            BinaryOp::Mul => |a, b| a * b,
            _ => float_mod,
        };
        return Ok(Datum::Float(left.into_float().zip(right.into_float(), f)?));
    }

    let (Some(left), Some(right)) = (left.into_int(), right.into_int()) else {
        return Err(ExprError::Unsupported("arithmetic operands".to_string()));
    };
    let f: fn(i64, i64) -> i64 = match op {
        BinaryOp::Add => i64::wrapping_add,
        BinaryOp::Sub => i64::wrapping_sub,
        BinaryOp::Mul => i64::wrapping_mul,
        _ => int_mod,
    };
    Ok(Datum::Int(left.zip(right, f)?))
}

/// Floored modulo, the result takes the sign of the divisor.
fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}

/// Floored modulo, integer modulo by zero yields zero.
fn int_mod(a: i64, b: i64) -> i64 {
    if b == 0 {
        return 0;
    }
    let r = a.wrapping_rem(b);
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn power(base: Datum, exponent: Datum) -> Result<Datum, ExprError> {
    if base.is_float() || exponent.is_float() {
        return Ok(Datum::Float(
            base.into_float().zip(exponent.into_float(), f64::powf)?,
        ));
    }

    let (Some(base), Some(exponent)) = (base.into_int(), exponent.into_int()) else {
        return Err(ExprError::Unsupported("power operands".to_string()));
    };
    if exponent.any(|e| e < 0) {
        return Err(ExprError::NegativeIntegerPower);
    }
    Ok(Datum::Int(base.zip(exponent, |b, e| {
        b.wrapping_pow(e.min(u32::MAX as i64) as u32)
    })?))
}

fn compare(op: BinaryOp, left: Datum, right: Datum) -> Result<Datum, ExprError> {
    fn apply<T: Copy + PartialOrd>(op: BinaryOp) -> fn(T, T) -> bool {
        match op {
            BinaryOp::Eq => |a, b| a == b,
            BinaryOp::Ne => |a, b| a != b,
            BinaryOp::Lt => |a, b| a < b,
            BinaryOp::Le => |a, b| a <= b,
            BinaryOp::Gt => |a, b| a > b,
            _ => |a, b| a >= b,
        }
    }

    let lane = match (left, right) {
        (Datum::Bool(l), Datum::Bool(r)) => l.zip(r, apply::<bool>(op))?,
        (l, r) if l.is_float() || r.is_float() => {
            l.into_float().zip(r.into_float(), apply::<f64>(op))?
        },
        (l, r) => match (l.into_int(), r.into_int()) {
            (Some(l), Some(r)) => l.zip(r, apply::<i64>(op))?,
            _ => return Err(ExprError::Unsupported("comparison operands".to_string())),
        },
    };
    Ok(Datum::Bool(lane))
}

fn logical(op: BinaryOp, left: Datum, right: Datum) -> Result<Datum, ExprError> {
    match (left, right) {
        (Datum::Bool(l), Datum::Bool(r)) => {
            let f: fn(bool, bool) -> bool = match op {
                BinaryOp::And => |a, b| a & b,
                BinaryOp::Or => |a, b| a | b,
                _ => |a, b| a ^ b,
            };
            Ok(Datum::Bool(l.zip(r, f)?))
        },
        (l, r) if l.is_float() || r.is_float() => Err(ExprError::Unsupported(format!(
            "logical operator on {} and {} operands",
            l.kind_name(),
            r.kind_name()
        ))),
        (l, r) => {
            let (Some(l), Some(r)) = (l.into_int(), r.into_int()) else {
                return Err(ExprError::Unsupported("logical operands".to_string()));
            };
            let f: fn(i64, i64) -> i64 = match op {
                BinaryOp::And => |a, b| a & b,
                BinaryOp::Or => |a, b| a | b,
                _ => |a, b| a ^ b,
            };
            Ok(Datum::Int(l.zip(r, f)?))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(7.0, 3.0, 1.0)]
    #[case(-7.0, 3.0, 2.0)]
    #[case(7.0, -3.0, -2.0)]
    #[case(6.0, 3.0, 0.0)]
    fn test_float_mod(#[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        assert_eq!(float_mod(a, b), expected);
    }

    #[rstest::rstest]
    #[case(7, 3, 1)]
    #[case(-7, 3, 2)]
    #[case(7, -3, -2)]
    #[case(7, 0, 0)]
    fn test_int_mod(#[case] a: i64, #[case] b: i64, #[case] expected: i64) {
        assert_eq!(int_mod(a, b), expected);
    }

    #[test]
    fn test_division_is_true_division() {
        let result = binary(
            BinaryOp::Div,
            Datum::Int(Lane::Vector(vec![1, 4])),
            Datum::Int(Lane::Scalar(2)),
        )
        .unwrap();
        assert_eq!(result, Datum::Float(Lane::Vector(vec![0.5, 2.0])));
    }

    #[test]
    fn test_negative_integer_power() {
        let err = binary(
            BinaryOp::Pow,
            Datum::Int(Lane::Scalar(2)),
            Datum::Int(Lane::Vector(vec![1, -1])),
        )
        .unwrap_err();
        assert_eq!(err, ExprError::NegativeIntegerPower);
    }

    #[test]
    fn test_bool_arithmetic_promotes() {
        let result = binary(
            BinaryOp::Add,
            Datum::Bool(Lane::Vector(vec![true, false])),
            Datum::Bool(Lane::Scalar(true)),
        )
        .unwrap();
        assert_eq!(result, Datum::Int(Lane::Vector(vec![2, 1])));
    }

    #[test]
    fn test_logical_rejects_floats() {
        let err = binary(
            BinaryOp::And,
            Datum::Float(Lane::Scalar(1.0)),
            Datum::Bool(Lane::Scalar(true)),
        )
        .unwrap_err();
        assert!(matches!(err, ExprError::Unsupported(_)));
    }
}
