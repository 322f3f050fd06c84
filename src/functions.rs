//! Scientific math functions exposed to expressions.
//!
//! Every function here accepts either numeric value type, coerces it to a
//! double and returns a float. Arguments that are not numbers are rejected
//! with [`ExprError::ArgumentType`], and integers too large for a finite
//! double with [`ExprError::Coercion`]. No domain checks are made beyond what
//! the double-precision primitives do: `acos(2)` is `nan`, `log(0)` is `-inf`.
//!
//! With the default `libm` feature the primitives come from the `libm` crate;
//! without it the inherent `f64` methods of the standard library are used.

#[cfg(feature = "libm")]
use libm::{
    acos as libm_acos, acosh as libm_acosh, asin as libm_asin, asinh as libm_asinh,
    atan as libm_atan, atan2 as libm_atan2, atanh as libm_atanh, cos as libm_cos,
    cosh as libm_cosh, exp as libm_exp, log as libm_ln, log2 as libm_log2, log10 as libm_log10,
    pow as libm_pow, sin as libm_sin, sinh as libm_sinh, tan as libm_tan, tanh as libm_tanh,
};

use crate::Real;
use crate::context::EnvironmentBuilder;
use crate::error::{ExprError, Result};
use crate::types::{CallArgs, NativeFunction, Param, Signature};
use crate::value::{Value, int_to_real};
use std::rc::Rc;

const X: &[Param] = &[Param::required("x")];
const Y_X: &[Param] = &[Param::required("y"), Param::required("x")];
const X_Y: &[Param] = &[Param::required("x"), Param::required("y")];

/// Converts a numeric value to a double.
///
/// `param` names the argument in the error for functions with more than one
/// parameter.
pub fn coerce(value: &Value, function: &str, param: Option<&'static str>) -> Result<Real> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(n) => int_to_real(n),
        other => Err(ExprError::argument_type(function, param, other.type_name())),
    }
}

macro_rules! primitive {
    ($name:ident, $libm:ident, $method:ident) => {
        pub fn $name(x: Real) -> Real {
            #[cfg(feature = "libm")]
            {
                $libm(x)
            }
            #[cfg(not(feature = "libm"))]
            {
                x.$method()
            }
        }
    };
}

primitive!(acos, libm_acos, acos);
primitive!(acosh, libm_acosh, acosh);
primitive!(asin, libm_asin, asin);
primitive!(asinh, libm_asinh, asinh);
primitive!(atan, libm_atan, atan);
primitive!(atanh, libm_atanh, atanh);
primitive!(cos, libm_cos, cos);
primitive!(cosh, libm_cosh, cosh);
primitive!(sin, libm_sin, sin);
primitive!(sinh, libm_sinh, sinh);
primitive!(tan, libm_tan, tan);
primitive!(tanh, libm_tanh, tanh);
primitive!(log, libm_ln, ln);
primitive!(log10, libm_log10, log10);
primitive!(log2, libm_log2, log2);
primitive!(exp, libm_exp, exp);

/// Four-quadrant arctangent of `y / x`.
pub fn atan2(y: Real, x: Real) -> Real {
    #[cfg(feature = "libm")]
    {
        libm_atan2(y, x)
    }
    #[cfg(not(feature = "libm"))]
    {
        y.atan2(x)
    }
}

/// `x` raised to the power `y`.
pub fn pow(x: Real, y: Real) -> Real {
    #[cfg(feature = "libm")]
    {
        libm_pow(x, y)
    }
    #[cfg(not(feature = "libm"))]
    {
        x.powf(y)
    }
}

/// The double-precision primitive behind a math library entry.
#[derive(Clone, Copy)]
pub enum MathKernel {
    Unary(fn(Real) -> Real),
    Binary(fn(Real, Real) -> Real),
}

/// One entry of the math library catalog.
#[derive(Clone, Copy)]
pub struct MathFunction {
    pub name: &'static str,
    pub params: &'static [Param],
    pub kernel: MathKernel,
    pub description: &'static str,
}

impl MathFunction {
    /// Coerces the bound arguments and applies the kernel.
    pub fn apply(&self, args: &CallArgs<'_>) -> Result<Value> {
        let result = match self.kernel {
            MathKernel::Unary(f) => f(coerce(args.required(0)?, self.name, None)?),
            MathKernel::Binary(f) => {
                let a = coerce(args.required(0)?, self.name, Some(self.params[0].name))?;
                let b = coerce(args.required(1)?, self.name, Some(self.params[1].name))?;
                f(a, b)
            }
        };
        Ok(Value::Float(result))
    }

    fn to_native(self) -> NativeFunction {
        NativeFunction {
            name: self.name.to_string(),
            signature: Signature::Fixed(self.params),
            implementation: Rc::new(move |args: &CallArgs<'_>| self.apply(args)),
            description: Some(self.description),
        }
    }
}

const fn unary(name: &'static str, f: fn(Real) -> Real, description: &'static str) -> MathFunction {
    MathFunction {
        name,
        params: X,
        kernel: MathKernel::Unary(f),
        description,
    }
}

const MATH_FUNCTIONS: &[MathFunction] = &[
    unary("acos", acos, "Arc cosine of x, in radians."),
    unary("acosh", acosh, "Inverse hyperbolic cosine of x."),
    unary("asin", asin, "Arc sine of x, in radians."),
    unary("asinh", asinh, "Inverse hyperbolic sine of x."),
    unary("atan", atan, "Arc tangent of x, in radians."),
    MathFunction {
        name: "atan2",
        params: Y_X,
        kernel: MathKernel::Binary(atan2),
        description: "Arc tangent of y/x, in radians, using the signs of both to pick the quadrant.",
    },
    unary("atanh", atanh, "Inverse hyperbolic tangent of x."),
    unary("cos", cos, "Cosine of x (radians)."),
    unary("cosh", cosh, "Hyperbolic cosine of x."),
    unary("exp", exp, "e raised to the power x."),
    unary("log", log, "Natural logarithm of x."),
    unary("log10", log10, "Base-10 logarithm of x."),
    unary("log2", log2, "Base-2 logarithm of x."),
    MathFunction {
        name: "pow",
        params: X_Y,
        kernel: MathKernel::Binary(pow),
        description: "x raised to the power y.",
    },
    unary("sin", sin, "Sine of x (radians)."),
    unary("sinh", sinh, "Hyperbolic sine of x."),
    unary("tan", tan, "Tangent of x (radians)."),
    unary("tanh", tanh, "Hyperbolic tangent of x."),
];

/// The math library catalog, sorted by name.
pub fn math_functions() -> &'static [MathFunction] {
    MATH_FUNCTIONS
}

/// Finds a catalog entry by name.
pub fn math_function(name: &str) -> Option<&'static MathFunction> {
    MATH_FUNCTIONS.iter().find(|f| f.name == name)
}

/// Binds every catalog entry as a global function.
pub fn register_math_functions(builder: &mut EnvironmentBuilder) -> Result<()> {
    for function in MATH_FUNCTIONS {
        builder.register_function(function.to_native())?;
    }
    Ok(())
}
