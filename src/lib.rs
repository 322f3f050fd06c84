#![doc = r#"
# calclark

The evaluation core of a scientific calculator: a small expression language
with exact integers and double-precision floats, a library of math
functions, and a session that remembers every result under `Out`.

## Overview

A calculator front end collects a line of text, hands it to an
[`ExpressionSession`](session::ExpressionSession), and shows either the
result or the error message. Every successful result is appended to the
session's output history, which later expressions can read as `Out[i]`.

Key features:
- Arbitrary-precision integers, IEEE double floats, strings, lists and booleans
- `**` binds tighter than unary minus: `-3**2` is `-9.0`
- Math functions `sin`, `cos`, `tan`, their inverse and hyperbolic forms,
  `log`, `log10`, `log2`, `exp`, `atan2` and `pow`
- Builtins `abs`, `float`, `int`, `len`, `max`, `min`, `str`, `sum` and `type`
- Keyword arguments: `sum([1, 2], start=10)`
- Errors that carry the pseudo-filename, line and column of the fault
- Transcript rows and a serde-friendly snapshot for persisting them

## Quick Start

```rust
use calclark::session::ExpressionSession;

let mut session = ExpressionSession::new().unwrap();

assert_eq!(session.evaluate("3 + 4").unwrap().to_string(), "7");
assert_eq!(session.evaluate("-3**2").unwrap().to_string(), "-9.0");
assert_eq!(session.evaluate("sum([1, 2.5], start=Out[0])").unwrap().to_string(), "10.5");

let err = session.evaluate("sin('x')").unwrap_err();
assert_eq!(err.to_string(), "unsupported argument of sin: string");
assert_eq!(session.history().len(), 3);
```

## Stateless evaluation

```rust
use calclark::context::Environment;
use calclark::engine::interp;

let env = Environment::standard().unwrap();
let value = interp("2 ** 10 + atan2(1, 1) * 4 / pi", &env).unwrap();
assert_eq!(value.to_string(), "1025.0");
```

## Transcript persistence

```rust
use calclark::history::{HistorySnapshot, Transcript};
use calclark::session::ExpressionSession;

let mut session = ExpressionSession::new().unwrap();
let mut transcript = Transcript::new();
for line in ["2 ** 10", "1 / 0", "Out[0] // 3"] {
    transcript.push(session.evaluate_to_equation(line));
}

let json = serde_json::to_string(&transcript.snapshot()).unwrap();
let snapshot: HistorySnapshot = serde_json::from_str(&json).unwrap();
let restored = Transcript::restore(snapshot).unwrap();
assert_eq!(restored, transcript);
assert_eq!(restored.equations()[2].answer(), Some("341.0"));
```

## Features

- `libm` (default): math functions use the `libm` crate. Without it the
  inherent `f64` methods of the standard library are used.
"#]

pub mod builtins;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod history;
pub mod lexer;
pub mod session;
pub mod types;
pub mod value;

pub use config::SessionConfig;
pub use context::Environment;
pub use engine::{interp, parse_expression};
pub use error::{ErrorCategory, ExprError};
pub use history::{Equation, HistorySnapshot, Transcript};
pub use session::{ExpressionSession, OutputHistory};
pub use value::Value;

/// Floating-point type used for all float values.
pub type Real = f64;

pub mod constants {
    use super::Real;

    pub const PI: Real = core::f64::consts::PI;
    pub const TEST_PRECISION: Real = 1e-10;
}

/// Utility macro to check if two floating point values are approximately equal
/// within a specified epsilon. Supports optional format arguments like assert_eq!.
#[macro_export]
macro_rules! assert_approx_eq {
    // Case 1: assert_approx_eq!(left, right) -> use default epsilon
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $crate::constants::TEST_PRECISION)
    };
    // Case 2: assert_approx_eq!(left, right, epsilon) -> use specified epsilon
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;
        $crate::assert_approx_eq!(
            left_val,
            right_val,
            eps,
            "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
            left_val,
            right_val,
            eps
        );
    }};
    // Case 3: assert_approx_eq!(left, right, epsilon, "format message", args...)
    ($left:expr, $right:expr, $epsilon:expr, $fmt:literal $(, $arg:expr)*) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if left_val.is_nan() && right_val.is_nan() {
            // NaN == NaN for our purposes
        } else if left_val.is_infinite()
            && right_val.is_infinite()
            && left_val.signum() == right_val.signum()
        {
            // Same-signed infinities are equal
        } else {
            assert!((left_val - right_val).abs() < eps, $fmt $(, $arg)*);
        }
    }};
}
