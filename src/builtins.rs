//! General-purpose builtins available in every environment.
//!
//! These are the universe bindings a calculator user expects from the
//! language itself rather than from the math library: the constants `True`,
//! `False` and `None`, and the functions `abs`, `float`, `int`, `len`, `max`,
//! `min`, `str`, `sum` and `type`.

use core::cmp::Ordering;
use core::str::FromStr;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed};

use crate::context::EnvironmentBuilder;
use crate::error::{ExprError, Result};
use crate::eval::apply_binary;
use crate::types::{BinaryOp, CallArgs, NativeFunction, Param, Signature};
use crate::value::{Value, int_to_real};
use std::rc::Rc;

const X: &[Param] = &[Param::required("x")];
const OPTIONAL_X: &[Param] = &[Param::optional("x")];
const SUM_PARAMS: &[Param] = &[Param::required("iterable"), Param::optional("start")];

type Builtin = fn(&CallArgs<'_>) -> Result<Value>;

const BUILTINS: &[(&str, Signature, Builtin, &str)] = &[
    ("abs", Signature::Fixed(X), builtin_abs, "Returns the absolute value of a number."),
    (
        "float",
        Signature::Fixed(OPTIONAL_X),
        builtin_float,
        "Converts a number or string to a float.",
    ),
    (
        "int",
        Signature::Fixed(OPTIONAL_X),
        builtin_int,
        "Converts a number or string to an int, truncating toward zero.",
    ),
    ("len", Signature::Fixed(X), builtin_len, "Returns the length of a list or string."),
    (
        "max",
        Signature::Variadic { min: 1 },
        builtin_max,
        "Returns the largest of a list, or of two or more arguments.",
    ),
    (
        "min",
        Signature::Variadic { min: 1 },
        builtin_min,
        "Returns the smallest of a list, or of two or more arguments.",
    ),
    ("str", Signature::Fixed(X), builtin_str, "Returns the string form of a value."),
    (
        "sum",
        Signature::Fixed(SUM_PARAMS),
        builtin_sum,
        "Adds the numbers of a list to start (default 0).",
    ),
    ("type", Signature::Fixed(X), builtin_type, "Returns the name of a value's type."),
];

/// Binds the universe constants and builtin functions.
pub fn register_builtins(builder: &mut EnvironmentBuilder) -> Result<()> {
    builder
        .register_constant("True", true)?
        .register_constant("False", false)?
        .register_constant("None", Value::None)?;
    for &(name, signature, implementation, description) in BUILTINS {
        builder.register_function(NativeFunction {
            name: name.to_string(),
            signature,
            implementation: Rc::new(implementation),
            description: Some(description),
        })?;
    }
    Ok(())
}

fn builtin_abs(args: &CallArgs<'_>) -> Result<Value> {
    match args.required(0)? {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(wrong_type(args, "int or float", other)),
    }
}

fn builtin_float(args: &CallArgs<'_>) -> Result<Value> {
    let Some(value) = args.get(0) else {
        return Ok(Value::Float(0.0));
    };
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(n) => int_to_real(n).map(Value::Float),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => parse_float(s)
            .map(Value::Float)
            .ok_or_else(|| ExprError::invalid_value(args.function(), format!("invalid float literal: {s}"))),
        other => Err(wrong_type(args, "int, float or string", other)),
    }
}

fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match body.to_ascii_lowercase().as_str() {
        "inf" | "infinity" => f64::INFINITY,
        "nan" => f64::NAN,
        digits
            if digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
                && digits.chars().all(|c| c.is_ascii_digit() || "._e+-".contains(c)) =>
        {
            strip_digit_separators(digits)?.parse::<f64>().ok()?
        }
        _ => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Removes `_` digit separators, which may only sit between two digits.
fn strip_digit_separators(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let separated = |i: usize| {
        i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
    };
    let valid = bytes
        .iter()
        .enumerate()
        .all(|(i, &b)| b != b'_' || separated(i));
    valid.then(|| text.replace('_', ""))
}

fn builtin_int(args: &CallArgs<'_>) -> Result<Value> {
    let Some(value) = args.get(0) else {
        return Ok(Value::int(0));
    };
    match value {
        Value::Int(n) => Ok(Value::Int(n.clone())),
        Value::Bool(b) => Ok(Value::int(i64::from(*b))),
        Value::Float(f) => BigInt::from_f64(f.trunc()).map(Value::Int).ok_or_else(|| {
            ExprError::invalid_value(
                args.function(),
                format!("cannot convert float {} to integer", crate::value::format_float(*f)),
            )
        }),
        Value::Str(s) => strip_digit_separators(s.trim())
            .and_then(|digits| BigInt::from_str(&digits).ok())
            .map(Value::Int)
            .ok_or_else(|| ExprError::invalid_value(args.function(), format!("invalid int literal: {s}"))),
        other => Err(wrong_type(args, "int, float or string", other)),
    }
}

fn builtin_len(args: &CallArgs<'_>) -> Result<Value> {
    match args.required(0)? {
        Value::Str(s) => Ok(Value::int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::int(items.borrow().len() as i64)),
        other => Err(wrong_type(args, "list or string", other)),
    }
}

fn builtin_max(args: &CallArgs<'_>) -> Result<Value> {
    extremum(args, Ordering::Greater, ">")
}

fn builtin_min(args: &CallArgs<'_>) -> Result<Value> {
    extremum(args, Ordering::Less, "<")
}

/// Shared body of `min` and `max`: keeps the first candidate that compares
/// `wanted` against the current best.
fn extremum(args: &CallArgs<'_>, wanted: Ordering, op: &'static str) -> Result<Value> {
    let candidates: Vec<Value> = if args.len() == 1 {
        match args.required(0)? {
            Value::List(items) => items.borrow().clone(),
            other => return Err(wrong_type(args, "list", other)),
        }
    } else {
        args.values().cloned().collect()
    };

    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(ExprError::invalid_value(args.function(), "expected at least one item"));
    };
    for candidate in candidates {
        match candidate.compare(&best) {
            Some(ordering) if ordering == wanted => best = candidate,
            Some(_) => {}
            None => {
                return Err(ExprError::UnsupportedComparison {
                    op,
                    left: candidate.type_name(),
                    right: best.type_name(),
                });
            }
        }
    }
    Ok(best)
}

fn builtin_str(args: &CallArgs<'_>) -> Result<Value> {
    Ok(Value::string(args.required(0)?.to_string()))
}

fn builtin_type(args: &CallArgs<'_>) -> Result<Value> {
    Ok(Value::string(args.required(0)?.type_name()))
}

/// `sum(iterable, start=0)`.
///
/// An empty list yields `start` unchanged. Ints are added exactly until the
/// first float, after which the running total is a float.
fn builtin_sum(args: &CallArgs<'_>) -> Result<Value> {
    let items = match args.required(0)? {
        Value::List(items) => items.borrow().clone(),
        other => return Err(wrong_type(args, "list", other)),
    };
    let start = args.get(1).cloned().unwrap_or_else(|| Value::int(0));
    if !start.is_numeric() {
        return Err(ExprError::argument_type(args.function(), Some("start"), start.type_name()));
    }

    items.into_iter().try_fold(start, |total, item| {
        if !item.is_numeric() {
            return Err(ExprError::argument_type(args.function(), None, item.type_name()));
        }
        apply_binary(BinaryOp::Add, &total, &item)
    })
}

fn wrong_type(args: &CallArgs<'_>, expected: &'static str, value: &Value) -> ExprError {
    ExprError::WrongType {
        function: args.function().to_string(),
        expected,
        type_name: value.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::context::Environment;
    use crate::engine::interp;

    fn eval(expr: &str) -> Result<Value> {
        let env = Environment::standard()?;
        interp(expr, &env)
    }

    #[test]
    fn test_sum_typing_rules() {
        assert!(matches!(eval("sum([])").unwrap(), Value::Int(n) if n == BigInt::from(0)));
        assert!(matches!(eval("sum([], 10)").unwrap(), Value::Int(n) if n == BigInt::from(10)));
        assert!(matches!(eval("sum([], start=10)").unwrap(), Value::Int(n) if n == BigInt::from(10)));
        assert!(matches!(eval("sum([], start=3.5)").unwrap(), Value::Float(f) if f == 3.5));
        assert!(matches!(eval("sum([1, 2, 3])").unwrap(), Value::Int(n) if n == BigInt::from(6)));
        assert!(matches!(eval("sum([1, 2, 3], start=10)").unwrap(), Value::Int(n) if n == BigInt::from(16)));

        let Value::Float(f) = eval("sum([1, 2.1, 3])").unwrap() else {
            panic!("mixed list should sum to a float");
        };
        assert_approx_eq!(f, 6.1);
        let Value::Float(f) = eval("sum([1, 2, 3], start=3.5)").unwrap() else {
            panic!("float start should give a float");
        };
        assert_approx_eq!(f, 9.5);
    }

    #[test]
    fn test_sum_rejects_non_numbers() {
        let err = eval("sum([1, 'a'])").unwrap_err();
        assert_eq!(err.to_string(), "unsupported argument of sum: string");
        let err = eval("sum([1], start='a')").unwrap_err();
        assert_eq!(err.to_string(), "unsupported argument start of sum: string");
        assert!(matches!(eval("sum(3)"), Err(ExprError::WrongType { .. })));
        assert!(matches!(eval("sum()"), Err(ExprError::MissingArgument { .. })));
    }

    #[test]
    fn test_min_and_max() {
        assert_eq!(eval("max(1, 2.5, 2)").unwrap(), Value::float(2.5));
        assert_eq!(eval("min([3, 1, 2])").unwrap(), Value::int(1));
        assert_eq!(eval("max('a', 'b')").unwrap(), Value::string("b"));
        assert!(eval("max([])").is_err());
        assert!(matches!(eval("min(1, 'a')"), Err(ExprError::UnsupportedComparison { .. })));
        assert!(matches!(eval("max(1)"), Err(ExprError::WrongType { .. })));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(eval("float(3)").unwrap(), Value::float(3.0));
        assert_eq!(eval("float(' 2.5 ')").unwrap(), Value::float(2.5));
        assert!(eval("float('-inf')").unwrap().as_float().unwrap().is_infinite());
        assert!(eval("float('abc')").is_err());
        assert_eq!(eval("float()").unwrap(), Value::float(0.0));

        assert_eq!(eval("int(-2.7)").unwrap(), Value::int(-2));
        assert_eq!(eval("int('42')").unwrap(), Value::int(42));
        assert_eq!(eval("int(True)").unwrap(), Value::int(1));
        assert!(eval("int(float('nan'))").is_err());
        assert!(eval("int('4.2')").is_err());
    }

    #[test]
    fn test_digit_separators_only_between_digits() {
        assert_eq!(eval("float('1_000.5')").unwrap(), Value::float(1000.5));
        assert_eq!(eval("float('-2_5e1_0')").unwrap(), Value::float(-25e10));
        assert_eq!(eval("int('1_000')").unwrap(), Value::int(1000));
        assert_eq!(eval("int(' -4_2 ')").unwrap(), Value::int(-42));

        for bad in ["'1__2'", "'1_'", "'_1'", "'1_.5'", "'1._5'", "'1_e5'"] {
            let err = eval(&format!("float({bad})")).unwrap_err();
            assert!(matches!(err, ExprError::InvalidValue { .. }), "float({bad}): {err:?}");
        }
        for bad in ["'1__0'", "'1_'", "'_1'", "'-_1'"] {
            let err = eval(&format!("int({bad})")).unwrap_err();
            assert!(matches!(err, ExprError::InvalidValue { .. }), "int({bad}): {err:?}");
        }
    }

    #[test]
    fn test_misc_builtins() {
        assert_eq!(eval("abs(-3)").unwrap(), Value::int(3));
        assert_eq!(eval("abs(-2.5)").unwrap(), Value::float(2.5));
        assert_eq!(eval("len([1, 2, 3])").unwrap(), Value::int(3));
        assert_eq!(eval("len('héllo')").unwrap(), Value::int(5));
        assert_eq!(eval("str(1.0)").unwrap(), Value::string("1.0"));
        assert_eq!(eval("str([1, 'a'])").unwrap(), Value::string("[1, \"a\"]"));
        assert_eq!(eval("type(1)").unwrap(), Value::string("int"));
        assert_eq!(eval("type(sin)").unwrap(), Value::string("builtin_function_or_method"));
        assert_eq!(eval("True").unwrap(), Value::Bool(true));
        assert_eq!(eval("None").unwrap(), Value::None);
    }
}
