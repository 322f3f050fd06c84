//! Runtime values of the expression language.
//!
//! Integers are arbitrary precision, floats are IEEE doubles. Lists are shared
//! by reference so the session's output history can be handed to expressions
//! by identity rather than copied.

use core::cmp::Ordering;
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::Real;
use crate::error::{ExprError, Result};
use crate::types::NativeFunction;

/// Shared, interior-mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(BigInt),
    Float(Real),
    Str(String),
    List(ListRef),
    Function(Rc<NativeFunction>),
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    pub fn float(f: Real) -> Self {
        Value::Float(f)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "builtin_function_or_method",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<Real> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Truthiness as used by `not`, `and` and `or`.
    pub fn truth(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => !n.is_zero(),
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Function(_) => true,
        }
    }

    /// Orders two values, or `None` when the types have no mutual order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => compare_int_float(a, *b),
            (Value::Float(a), Value::Int(b)) => compare_int_float(b, *a).map(Ordering::reverse),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Returns a copy in which every occurrence of the list `target` (by
    /// identity) is replaced with a fresh list holding its current contents.
    pub fn detach_from(&self, target: &ListRef) -> Value {
        match self {
            Value::List(items) if Rc::ptr_eq(items, target) => {
                Value::list(items.borrow().clone())
            }
            Value::List(items) => {
                let contains_target = items.borrow().iter().any(|v| v.references(target));
                if contains_target {
                    Value::list(items.borrow().iter().map(|v| v.detach_from(target)).collect())
                } else {
                    self.clone()
                }
            }
            _ => self.clone(),
        }
    }

    fn references(&self, target: &ListRef) -> bool {
        match self {
            Value::List(items) => {
                Rc::ptr_eq(items, target) || items.borrow().iter().any(|v| v.references(target))
            }
            _ => false,
        }
    }

    /// The quoted representation, as used for list elements.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out);
        out
    }

    fn write_repr(&self, out: &mut String) {
        match self {
            Value::Str(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            Value::List(items) => {
                out.push('[');
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out);
                }
                out.push(']');
            }
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Function(func) => {
                out.push_str("<built-in function ");
                out.push_str(&func.name);
                out.push('>');
            }
        }
    }
}

/// Converts an integer to a double, failing when the result would not be finite.
pub fn int_to_real(n: &BigInt) -> Result<Real> {
    n.to_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| ExprError::Coercion {
            digits: n.magnitude().to_string().len(),
        })
}

fn compare_int_float(a: &BigInt, b: Real) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b.is_infinite() {
        return Some(if b > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    let floor = b.floor();
    let whole = BigInt::from_f64(floor)?;
    match a.cmp(&whole) {
        Ordering::Equal if b > floor => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (a, b) if a.is_numeric() && b.is_numeric() => a.compare(b) == Some(Ordering::Equal),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(BigInt::from(n))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Int(n)
    }
}

impl From<Real> for Value {
    fn from(f: Real) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Formats a float the way the language's `str()` does.
///
/// The shortest digit string that round-trips is used. Numbers whose decimal
/// exponent is below -4 or at least 16 are written in exponent form with a
/// signed, two-digit minimum exponent; all others positionally with at least
/// one digit after the point.
pub fn format_float(x: Real) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+inf" } else { "-inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{:e}", x.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let mut out = String::new();
    if x < 0.0 {
        out.push('-');
    }

    if !(-4..16).contains(&exp) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.abs()));
        return out;
    }

    let point = exp + 1;
    if point <= 0 {
        out.push_str("0.");
        out.extend(core::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let point = point as usize;
        if point >= digits.len() {
            out.push_str(&digits);
            out.extend(core::iter::repeat_n('0', point - digits.len()));
            out.push_str(".0");
        } else {
            out.push_str(&digits[..point]);
            out.push('.');
            out.push_str(&digits[point..]);
        }
    }
    out
}
