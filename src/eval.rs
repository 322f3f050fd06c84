//! Tree-walking evaluation of parsed expressions.
//!
//! The parser bounds the nesting depth of every tree it produces. Flat
//! left-associative chains such as `1 + 2 + ... + n` are not nesting, so
//! their left spine is folded in a loop instead of recursing once per term.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::Real;
use crate::context::Environment;
use crate::error::{ExprError, Result};
use crate::functions;
use crate::types::{Argument, AstExpr, BinaryOp, LogicalOperator, UnaryOp};
use crate::value::{Value, int_to_real};

/// Evaluates an AST against an environment.
///
/// # Examples
///
/// ```
/// use calclark::context::Environment;
/// use calclark::engine::parse_expression;
/// use calclark::eval::eval_ast;
/// use calclark::value::Value;
///
/// let env = Environment::standard().unwrap();
/// let ast = parse_expression("7 // 2 + 7 % -2").unwrap();
/// assert_eq!(eval_ast(&ast, &env).unwrap(), Value::int(2));
/// ```
pub fn eval_ast(ast: &AstExpr, env: &Environment) -> Result<Value> {
    match ast {
        AstExpr::Int(n) => Ok(Value::Int(n.clone())),
        AstExpr::Float(f) => Ok(Value::Float(*f)),
        AstExpr::Str(s) => Ok(Value::Str(s.clone())),
        AstExpr::Identifier(name) => env
            .lookup(name)
            .ok_or_else(|| ExprError::UnknownVariable { name: name.clone() }),
        AstExpr::List(items) => {
            let values = items
                .iter()
                .map(|item| eval_ast(item, env))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::list(values))
        }
        AstExpr::Index { target, index } => {
            let target = eval_ast(target, env)?;
            let index = eval_ast(index, env)?;
            eval_index(&target, &index)
        }
        AstExpr::Call { callee, args } => eval_call(callee, args, env),
        AstExpr::Unary { op, operand } => {
            let operand = eval_ast(operand, env)?;
            apply_unary(*op, &operand)
        }
        AstExpr::Binary { .. } | AstExpr::LogicalOp { .. } => eval_chain(ast, env),
        AstExpr::Sequence(statements) => {
            let mut last = Value::None;
            for statement in statements {
                last = eval_ast(statement, env)?;
            }
            Ok(last)
        }
    }
}

/// One step of a left-associative chain: the operator and its right operand.
enum Link<'a> {
    Binary(BinaryOp, &'a AstExpr),
    Logical(LogicalOperator, &'a AstExpr),
}

/// Evaluates a left-leaning run of binary and logical operators.
fn eval_chain(ast: &AstExpr, env: &Environment) -> Result<Value> {
    let mut links = Vec::new();
    let mut leaf = ast;
    loop {
        match leaf {
            AstExpr::Binary { op, left, right } => {
                links.push(Link::Binary(*op, right));
                leaf = left;
            }
            AstExpr::LogicalOp { op, left, right } => {
                links.push(Link::Logical(*op, right));
                leaf = left;
            }
            _ => break,
        }
    }

    let mut acc = eval_ast(leaf, env)?;
    for link in links.into_iter().rev() {
        acc = match link {
            Link::Binary(op, right) => {
                let right = eval_ast(right, env)?;
                apply_binary(op, &acc, &right)?
            }
            Link::Logical(op, right) => match (op, acc.truth()) {
                (LogicalOperator::And, false) | (LogicalOperator::Or, true) => acc,
                _ => eval_ast(right, env)?,
            },
        };
    }
    Ok(acc)
}

fn eval_call(callee: &AstExpr, args: &[Argument], env: &Environment) -> Result<Value> {
    let function = match eval_ast(callee, env)? {
        Value::Function(function) => function,
        other => {
            return Err(ExprError::NotCallable {
                type_name: other.type_name(),
            });
        }
    };

    let mut positional = Vec::with_capacity(args.len());
    let mut keywords = Vec::new();
    for arg in args {
        match arg {
            Argument::Positional(expr) => positional.push(eval_ast(expr, env)?),
            Argument::Keyword { name, value } => keywords.push((name.clone(), eval_ast(value, env)?)),
        }
    }

    tracing::trace!(
        function = %function.name,
        positional = positional.len(),
        keywords = keywords.len(),
        "calling native function"
    );
    function.call(positional, keywords)
}

fn eval_index(target: &Value, index: &Value) -> Result<Value> {
    let Value::Int(index) = index else {
        return Err(ExprError::InvalidIndex {
            type_name: index.type_name(),
        });
    };
    match target {
        Value::List(items) => {
            let items = items.borrow();
            let idx = resolve_index(index, items.len())?;
            Ok(items[idx].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = resolve_index(index, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        other => Err(ExprError::NotIndexable {
            type_name: other.type_name(),
        }),
    }
}

/// Maps a possibly negative index onto `0..len`.
fn resolve_index(index: &BigInt, len: usize) -> Result<usize> {
    let out_of_bounds = || ExprError::IndexOutOfBounds {
        index: index.to_string(),
        len,
    };
    let adjusted = if index.is_negative() {
        index + BigInt::from(len)
    } else {
        index.clone()
    };
    adjusted
        .to_usize()
        .filter(|&idx| idx < len)
        .ok_or_else(out_of_bounds)
}

/// Applies a prefix operator.
pub fn apply_unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.truth())),
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Plus, value) if value.is_numeric() => Ok(value.clone()),
        (op, value) => Err(ExprError::UnsupportedUnaryOperation {
            op: op.symbol(),
            operand: value.type_name(),
        }),
    }
}

/// Numeric operands after promotion to a common type.
enum Numbers<'a> {
    Ints(&'a BigInt, &'a BigInt),
    Floats(Real, Real),
}

fn numbers<'a>(left: &'a Value, right: &'a Value) -> Result<Option<Numbers<'a>>> {
    Ok(Some(match (left, right) {
        (Value::Int(a), Value::Int(b)) => Numbers::Ints(a, b),
        (Value::Float(a), Value::Float(b)) => Numbers::Floats(*a, *b),
        (Value::Int(a), Value::Float(b)) => Numbers::Floats(int_to_real(a)?, *b),
        (Value::Float(a), Value::Int(b)) => Numbers::Floats(*a, int_to_real(b)?),
        _ => return Ok(None),
    }))
}

/// Applies an infix arithmetic or comparison operator.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let unsupported = || ExprError::UnsupportedBinaryOperation {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };

    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::Ne => return Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            return compare(op, left, right);
        }
        BinaryOp::Pow => {
            if !(left.is_numeric() && right.is_numeric()) {
                return Err(unsupported());
            }
            let base = functions::coerce(left, "**", None)?;
            let exponent = functions::coerce(right, "**", None)?;
            return Ok(Value::Float(functions::pow(base, exponent)));
        }
        _ => {}
    }

    if let Some(numbers) = numbers(left, right)? {
        return match numbers {
            Numbers::Ints(a, b) => int_arithmetic(op, a, b),
            Numbers::Floats(a, b) => float_arithmetic(op, a, b),
        };
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Mul, Value::Str(s), Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(s.repeat(repeat_count(n, s.len())?)))
        }
        (BinaryOp::Mul, Value::List(items), Value::Int(n))
        | (BinaryOp::Mul, Value::Int(n), Value::List(items)) => {
            let items = items.borrow();
            let count = repeat_count(n, items.len())?;
            Ok(Value::list(
                core::iter::repeat_n(items.iter(), count).flatten().cloned().collect(),
            ))
        }
        _ => Err(unsupported()),
    }
}

/// Upper bound on the length a repetition may produce, in bytes for strings
/// and elements for lists.
const MAX_REPEAT: u64 = 1 << 24;

/// Number of copies of a `unit_len`-long sequence to produce for `* n`.
fn repeat_count(n: &BigInt, unit_len: usize) -> Result<usize> {
    if n.is_negative() || unit_len == 0 {
        return Ok(0);
    }
    let too_large = || ExprError::Other(format!("repeated sequence is too large (repeat count {n})"));
    let count = n.to_u64().ok_or_else(too_large)?;
    let total = count.checked_mul(unit_len as u64).ok_or_else(too_large)?;
    if total > MAX_REPEAT {
        return Err(too_large());
    }
    usize::try_from(count).map_err(|_| too_large())
}

fn int_arithmetic(op: BinaryOp, a: &BigInt, b: &BigInt) -> Result<Value> {
    Ok(match op {
        BinaryOp::Add => Value::Int(a + b),
        BinaryOp::Sub => Value::Int(a - b),
        BinaryOp::Mul => Value::Int(a * b),
        BinaryOp::Div => {
            if b.is_zero() {
                return Err(ExprError::DivideByZero("division by zero"));
            }
            Value::Float(int_to_real(a)? / int_to_real(b)?)
        }
        BinaryOp::FloorDiv => {
            if b.is_zero() {
                return Err(ExprError::DivideByZero("integer division by zero"));
            }
            let quotient = a / b;
            let remainder = a % b;
            if !remainder.is_zero() && remainder.is_negative() != b.is_negative() {
                Value::Int(quotient - 1)
            } else {
                Value::Int(quotient)
            }
        }
        BinaryOp::Mod => {
            if b.is_zero() {
                return Err(ExprError::DivideByZero("integer modulo by zero"));
            }
            let remainder = a % b;
            if !remainder.is_zero() && remainder.is_negative() != b.is_negative() {
                Value::Int(remainder + b)
            } else {
                Value::Int(remainder)
            }
        }
        _ => unreachable!("{op:?} is handled before numeric promotion"),
    })
}

fn float_arithmetic(op: BinaryOp, a: Real, b: Real) -> Result<Value> {
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivideByZero("division by zero"));
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(ExprError::DivideByZero("floored division by zero"));
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(ExprError::DivideByZero("float modulo by zero"));
            }
            let remainder = a % b;
            if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                remainder + b
            } else {
                remainder
            }
        }
        _ => unreachable!("{op:?} is handled before numeric promotion"),
    }))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let Some(ordering) = left.compare(right) else {
        // NaN is unordered with every number
        if left.is_numeric() && right.is_numeric() {
            return Ok(Value::Bool(false));
        }
        return Err(ExprError::UnsupportedComparison {
            op: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        });
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!("{op:?} is not an ordering comparison"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::engine::interp;

    fn eval(expr: &str) -> Result<Value> {
        let env = Environment::standard()?;
        interp(expr, &env)
    }

    fn eval_str(expr: &str) -> String {
        eval(expr).unwrap().to_string()
    }

    #[test]
    fn test_integer_arithmetic_is_exact() {
        assert!(matches!(eval("3+4").unwrap(), Value::Int(n) if n == BigInt::from(7)));
        assert_eq!(eval_str("2 * 3 - 10"), "-4");
        assert_eq!(
            eval_str("12345678901234567890 * 98765432109876543210"),
            "1219326311370217952237463801111263526900"
        );
    }

    #[test]
    fn test_power_always_float() {
        assert!(matches!(eval("3**2").unwrap(), Value::Float(f) if f == 9.0));
        assert!(matches!(eval("-3**2").unwrap(), Value::Float(f) if f == -9.0));
        assert_eq!(eval_str("(-3)**2"), "9.0");
        assert_eq!(eval_str("2**-1"), "0.5");
        assert_eq!(eval_str("2**3**2"), "512.0");
        assert!(matches!(eval("'a'**2"), Err(ExprError::UnsupportedBinaryOperation { .. })));
    }

    #[test]
    fn test_division_semantics() {
        assert_eq!(eval_str("7 / 2"), "3.5");
        assert_eq!(eval_str("6 / 3"), "2.0");
        assert_eq!(eval_str("7 // 2"), "3");
        assert_eq!(eval_str("-7 // 2"), "-4");
        assert_eq!(eval_str("-7 % 3"), "2");
        assert_eq!(eval_str("7 % -3"), "-2");
        assert_eq!(eval_str("7.5 // 2"), "3.0");
        assert_eq!(eval_str("-7.5 % 2"), "0.5");

        for expr in ["1 / 0", "1 // 0", "1 % 0", "1.0 / 0", "1 % 0.0", "1.5 // 0.0"] {
            assert!(
                matches!(eval(expr), Err(ExprError::DivideByZero(_))),
                "{expr} should fail"
            );
        }
    }

    #[test]
    fn test_mixed_promotion() {
        assert!(matches!(eval("1 + 2.5").unwrap(), Value::Float(f) if f == 3.5));
        assert_eq!(eval_str("0.1 + 0.2"), "0.30000000000000004");
        assert_approx_eq!(eval("pi * 2").unwrap().as_float().unwrap(), 2.0 * crate::constants::PI);
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 == 1.0").unwrap(), Value::Bool(true));
        assert_eq!(eval("'a' < 'b'").unwrap(), Value::Bool(true));
        assert_eq!(eval("[1, 2] == [1, 2]").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 != 'a'").unwrap(), Value::Bool(true));
        assert_eq!(eval("float('nan') < 1").unwrap(), Value::Bool(false));
        assert!(matches!(eval("1 < 'a'"), Err(ExprError::UnsupportedComparison { .. })));

        assert_eq!(eval("0 or 5").unwrap(), Value::int(5));
        assert_eq!(eval("2 and 3").unwrap(), Value::int(3));
        assert_eq!(eval("0 and undefined_name").unwrap(), Value::int(0));
        assert_eq!(eval("not []").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_strings_and_lists() {
        assert_eq!(eval_str("'ab' + 'cd'"), "abcd");
        assert_eq!(eval_str("'ab' * 2"), "abab");
        assert_eq!(eval_str("[1] + [2.0]"), "[1, 2.0]");
        assert_eq!(eval_str("2 * [0]"), "[0, 0]");
        assert_eq!(eval_str("[1, 2, 3][-1]"), "3");
        assert_eq!(eval_str("'héllo'[1]"), "é");
        assert!(matches!(eval("'a' + 1"), Err(ExprError::UnsupportedBinaryOperation { .. })));
        assert!(matches!(eval("-'a'"), Err(ExprError::UnsupportedUnaryOperation { .. })));
    }

    #[test]
    fn test_repetition_is_bounded_by_result_length() {
        assert_eq!(eval_str("len('a' * 16777216)"), "16777216");
        assert!(matches!(eval("'a' * 16777216 * 2"), Err(ExprError::Other(_))));
        assert!(matches!(eval("'ab' * 16777216 * 16777216"), Err(ExprError::Other(_))));
        assert!(matches!(eval("'ab' * 8388609"), Err(ExprError::Other(_))));

        assert_eq!(eval_str("len([0] * 64 * 64)"), "4096");
        assert!(matches!(eval("[0] * 4096 * 4097"), Err(ExprError::Other(_))));
        assert!(matches!(eval("3 * [0, 0] * 8388608"), Err(ExprError::Other(_))));

        assert_eq!(eval_str("'' * 100000000000000000000000000000"), "");
        assert_eq!(eval_str("[1, 2] * -3"), "[]");
    }

    #[test]
    fn test_index_errors() {
        let err = eval("[1, 2][2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "index out of range (index is 2, but sequence has 2 elements)"
        );
        assert!(matches!(eval("[1][-2]"), Err(ExprError::IndexOutOfBounds { .. })));
        assert!(matches!(eval("[1][0.5]"), Err(ExprError::InvalidIndex { .. })));
        assert!(matches!(eval("3[0]"), Err(ExprError::NotIndexable { type_name: "int" })));
    }

    #[test]
    fn test_calls_and_names() {
        let err = eval("foo(1)").unwrap_err();
        assert_eq!(err.to_string(), "name 'foo' is not defined");
        assert!(matches!(eval("pi(1)"), Err(ExprError::NotCallable { type_name: "float" })));
        assert!(matches!(eval("sin(1, 2)"), Err(ExprError::InvalidFunctionCall { .. })));
        assert_approx_eq!(eval("pow(y=3, x=2)").unwrap().as_float().unwrap(), 8.0);
        assert_eq!(eval_str("1; 2; 3"), "3");
    }

    #[test]
    fn test_math_argument_errors_surface_unchanged() {
        let err = eval("sin('a')").unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::ArgumentType);
        let err = eval(&format!("exp(1{})", "0".repeat(400))).unwrap_err();
        assert!(matches!(err, ExprError::Coercion { .. }));
        // `**` works on doubles, so an oversized power overflows to infinity instead
        assert_eq!(eval_str("10**400"), "+inf");
    }
}
