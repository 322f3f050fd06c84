//! Type definitions for the expression parser and evaluator.
//!
//! This module contains the core data structures shared by the parser and the
//! evaluator: the Abstract Syntax Tree (AST), token kinds, operators, and the
//! representation of native functions with their parameter binding rules.

use core::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::Real;
use crate::error::{ExprError, Result};
use crate::value::Value;

/// Abstract Syntax Tree (AST) node representing an expression.
///
/// Each variant of this enum represents a different type of expression node,
/// forming a tree structure that can be evaluated to produce a [`Value`].
#[derive(Clone, Debug, PartialEq)]
pub enum AstExpr {
    /// An integer literal, kept at full precision.
    ///
    /// Examples: `42`, `0x1f`, `100000000000000000000000`
    Int(BigInt),

    /// A floating point literal.
    ///
    /// Examples: `3.14`, `.5`, `1e-3`
    Float(Real),

    /// A string literal with escapes already resolved.
    Str(String),

    /// A reference to a name in the environment.
    ///
    /// Examples: `pi`, `Out`, `sin`
    Identifier(String),

    /// A list literal.
    ///
    /// Examples: `[]`, `[1, 2.5, 3]`
    List(Vec<AstExpr>),

    /// Indexing into a list or string.
    ///
    /// Examples: `Out[0]`, `Out[-1]`, `[1, 2][1]`
    Index {
        /// The indexed expression
        target: Box<AstExpr>,
        /// The expression for the index
        index: Box<AstExpr>,
    },

    /// A call with positional and keyword arguments.
    ///
    /// Examples: `sin(x)`, `sum([1, 2], start=10)`
    Call {
        /// The expression producing the function
        callee: Box<AstExpr>,
        /// Arguments in source order, positional before keyword
        args: Vec<Argument>,
    },

    /// A prefix operator.
    Unary {
        op: UnaryOp,
        operand: Box<AstExpr>,
    },

    /// An arithmetic or comparison operator.
    Binary {
        op: BinaryOp,
        left: Box<AstExpr>,
        right: Box<AstExpr>,
    },

    /// A logical operation with short-circuit evaluation.
    ///
    /// `a and b` evaluates `b` only if `a` is truthy; `a or b` evaluates `b`
    /// only if `a` is falsy. The result is the last operand evaluated, not a
    /// coerced boolean.
    LogicalOp {
        op: LogicalOperator,
        left: Box<AstExpr>,
        right: Box<AstExpr>,
    },

    /// Expressions separated by `;`. Evaluates to the value of the last one.
    Sequence(Vec<AstExpr>),
}

/// A single argument in a call expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument {
    Positional(AstExpr),
    Keyword { name: String, value: AstExpr },
}

/// Prefix operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "not ",
        }
    }
}

/// Infix arithmetic and comparison operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "//" => BinaryOp::FloorDiv,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

/// Defines the type of logical operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// Classifies the kind of token produced during lexical analysis.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// An integer literal.
    Int,

    /// A floating point literal.
    Float,

    /// A quoted string literal.
    String,

    /// A name such as `sin`, `Out` or `pi`.
    Identifier,

    /// A reserved word: `and`, `or`, `not`.
    Keyword,

    /// An operator such as `+`, `**`, `//`, `<=`.
    Operator,

    /// An opening delimiter `(` or `[`.
    Open,

    /// A closing delimiter `)` or `]`.
    Close,

    /// `,` between items or `;` between statements.
    Separator,

    /// `=` introducing a keyword argument value.
    Assign,

    /// An error token representing invalid input.
    Error,
}

/// A parameter of a native function.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// How a native function binds its call arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signature {
    /// Named parameters, fillable positionally or by keyword.
    Fixed(&'static [Param]),
    /// Any number (at least `min`) of positional arguments, no keywords.
    Variadic { min: usize },
}

/// The signature of a native function implementation.
pub type NativeImpl = Rc<dyn Fn(&CallArgs<'_>) -> Result<Value>>;

/// A Rust function callable from expressions.
///
/// Native functions are stored in the environment and surface in expressions
/// as ordinary values, so `f = sin` style aliasing is not needed: `sin(x)`
/// looks up `sin` and calls the resulting function value.
#[derive(Clone)]
pub struct NativeFunction {
    /// The name of the function as it appears in expressions and error messages.
    pub name: String,

    /// Parameter binding rules.
    pub signature: Signature,

    /// The implementation, receiving the bound arguments.
    pub implementation: NativeImpl,

    /// Optional description of what the function does.
    pub description: Option<&'static str>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl NativeFunction {
    /// Binds the arguments of a call to the parameters and runs the implementation.
    pub fn call(&self, positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<Value> {
        let args = self.bind(positional, keywords)?;
        (self.implementation)(&args)
    }

    fn bind(&self, positional: Vec<Value>, keywords: Vec<(String, Value)>) -> Result<CallArgs<'_>> {
        match self.signature {
            Signature::Variadic { min } => {
                if let Some((keyword, _)) = keywords.into_iter().next() {
                    return Err(ExprError::UnexpectedKeyword {
                        name: self.name.clone(),
                        keyword,
                    });
                }
                if positional.len() < min {
                    return Err(ExprError::InvalidFunctionCall {
                        name: self.name.clone(),
                        expected: min,
                        found: positional.len(),
                    });
                }
                Ok(CallArgs {
                    function: &self.name,
                    params: &[],
                    values: positional.into_iter().map(Some).collect(),
                })
            }
            Signature::Fixed(params) => {
                if positional.len() > params.len() {
                    return Err(ExprError::InvalidFunctionCall {
                        name: self.name.clone(),
                        expected: params.len(),
                        found: positional.len(),
                    });
                }
                let mut values: Vec<Option<Value>> = vec![None; params.len()];
                for (slot, value) in values.iter_mut().zip(positional) {
                    *slot = Some(value);
                }
                for (keyword, value) in keywords {
                    let Some(idx) = params.iter().position(|p| p.name == keyword) else {
                        return Err(ExprError::UnexpectedKeyword {
                            name: self.name.clone(),
                            keyword,
                        });
                    };
                    if values[idx].is_some() {
                        return Err(ExprError::DuplicateArgument {
                            name: self.name.clone(),
                            param: keyword,
                        });
                    }
                    values[idx] = Some(value);
                }
                if let Some(missing) = params
                    .iter()
                    .zip(&values)
                    .find(|(param, value)| param.required && value.is_none())
                {
                    return Err(ExprError::MissingArgument {
                        name: self.name.clone(),
                        param: missing.0.name,
                    });
                }
                Ok(CallArgs {
                    function: &self.name,
                    params,
                    values,
                })
            }
        }
    }
}

/// Arguments of a call after binding, in parameter order.
///
/// Optional parameters that were not supplied are absent.
#[derive(Debug)]
pub struct CallArgs<'a> {
    function: &'a str,
    params: &'static [Param],
    values: Vec<Option<Value>>,
}

impl CallArgs<'_> {
    /// Name of the function being called.
    pub fn function(&self) -> &str {
        self.function
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument bound to parameter `index`, if supplied.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The argument bound to a required parameter.
    pub fn required(&self, index: usize) -> Result<&Value> {
        self.get(index).ok_or_else(|| ExprError::MissingArgument {
            name: self.function.to_string(),
            param: self.params.get(index).map(|p| p.name).unwrap_or("args"),
        })
    }

    /// All supplied arguments in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().flatten()
    }
}
