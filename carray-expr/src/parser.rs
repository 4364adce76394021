use sqlparser::ast::{
    BinaryOperator,
    Expr as SqlExpr,
    FunctionArg,
    FunctionArgExpr,
    FunctionArguments,
    UnaryOperator,
    Value as SqlValue,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::functions::Function;
use crate::ExprError;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, PartialEq)]
/// A parsed expression tree.
pub(crate) enum Node {
    Ident(String),
    Literal(Literal),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

impl Node {
    /// Collects the free identifiers of the tree in order of first appearance.
    pub(crate) fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Node::Ident(name) => {
                if !names.iter().any(|existing| existing == name) {
                    names.push(name.clone());
                }
            },
            Node::Literal(_) => {},
            Node::Unary(_, inner) => inner.collect_names(names),
            Node::Binary(_, left, right) => {
                left.collect_names(names);
                right.collect_names(names);
            },
            Node::Call(_, args) => {
                for arg in args {
                    arg.collect_names(names);
                }
            },
        }
    }
}

/// Parses the expression source into a [Node] tree.
///
/// The source uses the usual infix syntax: `**` is exponentiation,
/// `&`, `|` and `^` as well as `and`, `or` and `not` are the logical
/// operators, and `==` is equality.
pub(crate) fn parse(source: &str) -> Result<Node, ExprError> {
    let normalized = normalize(source);
    if normalized.trim().is_empty() {
        return Err(ExprError::Parse("expression is empty".to_string()));
    }

    let dialect = PostgreSqlDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(&normalized)
        .map_err(|e| ExprError::Parse(e.to_string()))?;
    let expr = parser
        .parse_expr()
        .map_err(|e| ExprError::Parse(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(ExprError::Parse(format!(
            "unexpected trailing input starting at {next}"
        )));
    }

    translate(&expr)
}

/// Rewrites the operators that differ from the SQL grammar.
///
/// `**` becomes `^` (highest binary precedence), the XOR `^` becomes `#`,
/// and `==` becomes `=`. Grouping that differs from the SQL grammar is
/// restored while translating.
fn normalize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push('^');
            },
            '^' => out.push('#'),
            '=' if chars.peek() == Some(&'=') => {
                chars.next();
                out.push('=');
            },
            other => out.push(other),
        }
    }
    out
}

/// The binding strength of the operators sharing the SQL grammar's single
/// left-associative level for `&`, `|` and `#`.
///
/// Higher binds tighter: `&` before xor before `|`.
fn bitwise_level(op: &BinaryOperator) -> Option<(u8, BinaryOp)> {
    match op {
        BinaryOperator::BitwiseOr => Some((1, BinaryOp::Or)),
        BinaryOperator::PGBitwiseXor => Some((2, BinaryOp::Xor)),
        BinaryOperator::BitwiseAnd => Some((3, BinaryOp::And)),
        _ => None,
    }
}

fn translate(expr: &SqlExpr) -> Result<Node, ExprError> {
    let node = match expr {
        SqlExpr::BinaryOp { op, .. } if bitwise_level(op).is_some() => {
            translate_bitwise(expr)?
        },
        SqlExpr::BinaryOp {
            op: BinaryOperator::PGExp,
            ..
        } => translate_power(expr)?,
        SqlExpr::Identifier(ident) => Node::Ident(ident.value.clone()),
        SqlExpr::Nested(inner) => translate(inner)?,
        SqlExpr::Value(value) => Node::Literal(literal(value)?),
        SqlExpr::UnaryOp { op, expr } => {
            let op = match op {
                UnaryOperator::Minus => UnaryOp::Neg,
                UnaryOperator::Plus => UnaryOp::Pos,
                UnaryOperator::Not | UnaryOperator::PGBitwiseNot => UnaryOp::Not,
                other => {
                    return Err(ExprError::Unsupported(format!("unary operator {other}")))
                },
            };
            Node::Unary(op, Box::new(translate(expr)?))
        },
        SqlExpr::BinaryOp { left, op, right } => {
            let op = match op {
                BinaryOperator::Plus => BinaryOp::Add,
                BinaryOperator::Minus => BinaryOp::Sub,
                BinaryOperator::Multiply => BinaryOp::Mul,
                BinaryOperator::Divide => BinaryOp::Div,
                BinaryOperator::Modulo => BinaryOp::Mod,
                BinaryOperator::Eq => BinaryOp::Eq,
                BinaryOperator::NotEq => BinaryOp::Ne,
                BinaryOperator::Lt => BinaryOp::Lt,
                BinaryOperator::LtEq => BinaryOp::Le,
                BinaryOperator::Gt => BinaryOp::Gt,
                BinaryOperator::GtEq => BinaryOp::Ge,
                BinaryOperator::And => BinaryOp::And,
                BinaryOperator::Or => BinaryOp::Or,
                BinaryOperator::Xor | BinaryOperator::BitwiseXor => BinaryOp::Xor,
                other => {
                    return Err(ExprError::Unsupported(format!("binary operator {other}")))
                },
            };
            Node::Binary(
                op,
                Box::new(translate(left)?),
                Box::new(translate(right)?),
            )
        },
        SqlExpr::Function(function) => {
            let name = function.name.to_string().to_ascii_lowercase();
            let function_kind = Function::from_name(&name)
                .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;

            let args = match &function.args {
                FunctionArguments::List(list) => list
                    .args
                    .iter()
                    .map(|arg| match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => translate(expr),
                        other => Err(ExprError::Unsupported(format!(
                            "function argument {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                FunctionArguments::None => Vec::new(),
                FunctionArguments::Subquery(_) => {
                    return Err(ExprError::Unsupported("subqueries".to_string()))
                },
            };

            if args.len() != function_kind.arity() {
                return Err(ExprError::Arity {
                    function: function_kind.name(),
                    expected: function_kind.arity(),
                    actual: args.len(),
                });
            }

            Node::Call(function_kind, args)
        },
        other => return Err(ExprError::Unsupported(format!("expression {other}"))),
    };
    Ok(node)
}

/// Translates a chain of `&`, `|` and `^` operators.
///
/// The SQL grammar parses the chain strictly left to right, it is split
/// back into its operands and regrouped by [bitwise_level].
fn translate_bitwise(expr: &SqlExpr) -> Result<Node, ExprError> {
    let mut operands = Vec::new();
    let mut operators = Vec::new();
    let mut current = expr;
    while let SqlExpr::BinaryOp { left, op, right } = current {
        let Some(level) = bitwise_level(op) else {
            break;
        };
        operands.push(right.as_ref());
        operators.push(level);
        current = left;
    }
    operands.push(current);
    operands.reverse();
    operators.reverse();

    let operands = operands
        .into_iter()
        .map(translate)
        .collect::<Result<Vec<_>, _>>()?;
    regroup(operands, operators)
}

/// Builds the tree for `operands` joined by `operators`, splitting at the
/// loosest, rightmost operator so equal operators group to the left.
fn regroup(
    mut operands: Vec<Node>,
    mut operators: Vec<(u8, BinaryOp)>,
) -> Result<Node, ExprError> {
    let Some(split) = (0..operators.len())
        .rev()
        .min_by_key(|&i| operators[i].0)
    else {
        return operands
            .pop()
            .ok_or_else(|| ExprError::Parse("operator is missing an operand".to_string()));
    };

    let right_operands = operands.split_off(split + 1);
    let right_operators = operators.split_off(split + 1);
    let Some((_, op)) = operators.pop() else {
        return Err(ExprError::Parse("operator is missing an operand".to_string()));
    };

    Ok(Node::Binary(
        op,
        Box::new(regroup(operands, operators)?),
        Box::new(regroup(right_operands, right_operators)?),
    ))
}

/// Translates a chain of `**` operators, which group to the right.
fn translate_power(expr: &SqlExpr) -> Result<Node, ExprError> {
    let mut exponents = Vec::new();
    let mut base = expr;
    while let SqlExpr::BinaryOp {
        left,
        op: BinaryOperator::PGExp,
        right,
    } = base
    {
        exponents.push(right.as_ref());
        base = left;
    }

    let mut node = translate(base)?;
    if let Some((rightmost, rest)) = exponents.split_first() {
        let mut exponent = translate(rightmost)?;
        for inner in rest {
            exponent = Node::Binary(
                BinaryOp::Pow,
                Box::new(translate(inner)?),
                Box::new(exponent),
            );
        }
        node = Node::Binary(BinaryOp::Pow, Box::new(node), Box::new(exponent));
    }
    Ok(node)
}

fn literal(value: &SqlValue) -> Result<Literal, ExprError> {
    match value {
        SqlValue::Boolean(v) => Ok(Literal::Bool(*v)),
        SqlValue::Number(text, _) => {
            let is_float = text.contains(['.', 'e', 'E']);
            if !is_float {
                if let Ok(v) = text.parse::<i64>() {
                    return Ok(Literal::Int(v));
                }
            }
            text.parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| ExprError::Parse(format!("invalid number literal {text:?}")))
        },
        other => Err(ExprError::Unsupported(format!("literal {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Node> {
        Box::new(Node::Ident(name.to_string()))
    }

    #[rstest::rstest]
    #[case("a ** 2", "a ^ 2")]
    #[case("a ^ b", "a # b")]
    #[case("a == b", "a = b")]
    #[case("a <= b", "a <= b")]
    #[case("a != b", "a != b")]
    fn test_normalize(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(normalize(source), expected);
    }

    #[test]
    fn test_power_binds_tighter_than_multiplication() {
        let node = parse("2 * x ** 3").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinaryOp::Mul,
                Box::new(Node::Literal(Literal::Int(2))),
                Box::new(Node::Binary(
                    BinaryOp::Pow,
                    ident("x"),
                    Box::new(Node::Literal(Literal::Int(3))),
                )),
            )
        );
    }

    #[test]
    fn test_power_groups_to_the_right() {
        let node = parse("a ** b ** c").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinaryOp::Pow,
                ident("a"),
                Box::new(Node::Binary(BinaryOp::Pow, ident("b"), ident("c"))),
            )
        );

        let node = parse("(a ** b) ** c").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinaryOp::Pow,
                Box::new(Node::Binary(BinaryOp::Pow, ident("a"), ident("b"))),
                ident("c"),
            )
        );
    }

    #[rstest::rstest]
    #[case("a | b & c", "(a | (b & c))")]
    #[case("a & b | c", "((a & b) | c)")]
    #[case("a ^ b & c", "(a ^ (b & c))")]
    #[case("a | b ^ c", "(a | (b ^ c))")]
    #[case("a & b ^ c | d & e", "(((a & b) ^ c) | (d & e))")]
    #[case("a | b | c", "((a | b) | c)")]
    #[case("(a | b) & c", "((a | b) & c)")]
    #[case("a & b == c", "((a & b) == c)")]
    #[case("a * b ^ c", "((a * b) ^ c)")]
    #[case("a > b and c | d", "((a > b) & (c | d))")]
    fn test_logical_grouping(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(render(&parse(source).unwrap()), expected, "Parse {source:?}");
    }

    /// Renders a tree fully parenthesised.
    fn render(node: &Node) -> String {
        match node {
            Node::Ident(name) => name.clone(),
            Node::Binary(op, left, right) => {
                let op = match op {
                    BinaryOp::And => "&",
                    BinaryOp::Or => "|",
                    BinaryOp::Xor => "^",
                    BinaryOp::Mul => "*",
                    BinaryOp::Eq => "==",
                    BinaryOp::Gt => ">",
                    other => return format!("{other:?}"),
                };
                format!("({} {op} {})", render(left), render(right))
            },
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("1").unwrap(), Node::Literal(Literal::Int(1)));
        assert_eq!(parse(".3").unwrap(), Node::Literal(Literal::Float(0.3)));
        assert_eq!(parse("2.5").unwrap(), Node::Literal(Literal::Float(2.5)));
        assert_eq!(parse("true").unwrap(), Node::Literal(Literal::Bool(true)));
    }

    #[test]
    fn test_names_in_first_appearance_order() {
        let node = parse("(2*x**3+.3*y**2+z+1)<0 and x > y").unwrap();
        let mut names = Vec::new();
        node.collect_names(&mut names);
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_function_call() {
        let node = parse("sin(a) + arctan2(a, b)").unwrap();
        let Node::Binary(BinaryOp::Add, left, right) = node else {
            panic!("Expected addition, got {node:?}");
        };
        assert_eq!(*left, Node::Call(Function::Sin, vec![Node::Ident("a".into())]));
        assert_eq!(
            *right,
            Node::Call(
                Function::Arctan2,
                vec![Node::Ident("a".into()), Node::Ident("b".into())]
            )
        );
    }

    #[rstest::rstest]
    #[case("")]
    #[case("a +")]
    #[case("a b")]
    #[case("(a")]
    fn test_malformed(#[case] source: &str) {
        assert!(
            matches!(parse(source), Err(ExprError::Parse(_))),
            "Expected parse error for {source:?}"
        );
    }

    #[test]
    fn test_unknown_function_and_arity() {
        assert_eq!(
            parse("frobnicate(a)").unwrap_err(),
            ExprError::UnknownFunction("frobnicate".to_string())
        );
        assert_eq!(
            parse("sin(a, b)").unwrap_err(),
            ExprError::Arity {
                function: "sin",
                expected: 1,
                actual: 2
            }
        );
    }
}
