//! Error types and handling for the calclark crate.
//!
//! Every failure that can happen while tokenizing, parsing or evaluating an
//! expression is represented by a variant of [`ExprError`]. Callers that only
//! need the coarse classification (argument type, coercion, syntax, name or
//! runtime failure) can use [`ExprError::category`].

use core::fmt;

use thiserror::Error;

/// Result type used throughout the crate.
///
/// This is a convenience type alias that uses the `ExprError` type for the error variant.
pub type Result<T> = core::result::Result<T, ExprError>;

/// A position inside an evaluated source fragment.
///
/// Lines and columns are 1-based; the file is the session's pseudo-filename
/// (`<expr>` unless configured otherwise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Computes the line and column of a byte offset into `source`.
    pub fn from_offset(file: &str, source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let mut line = 1;
        let mut column = 1;
        for (idx, c) in source.char_indices() {
            if idx >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self {
            file: file.to_string(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Coarse classification of an [`ExprError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A math function received a value that is not a number.
    ArgumentType,
    /// A number could not be represented as a finite double.
    Coercion,
    /// The source text does not conform to the grammar.
    Syntax,
    /// An identifier is not bound in the environment.
    Name,
    /// Any other failure raised during evaluation.
    Runtime,
}

/// Error type for expression parsing and evaluation.
///
/// The `Display` output of each variant is the message shown to the user,
/// verbatim, when an evaluation fails.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// The tokenizer met a character sequence it cannot turn into a token.
    #[error("{location}: {message}")]
    Tokenizer { location: Location, message: String },

    /// The parser met an unexpected token or an incomplete expression.
    #[error("{location}: syntax error: {message}")]
    Syntax { location: Location, message: String },

    /// A closing bracket without a matching opening bracket, or the reverse.
    #[error("{location}: unmatched '{found}'")]
    UnmatchedBracket { location: Location, found: String },

    /// The source is longer than the configured limit.
    #[error("{file}: expression too long: {len} bytes (maximum is {max})")]
    ExpressionTooLong { file: String, len: usize, max: usize },

    /// The expression nests deeper than the configured parser limit.
    #[error("{location}: expression too complex: exceeded maximum nesting depth of {max_depth}")]
    RecursionLimit { location: Location, max_depth: usize },

    /// An identifier is not bound in the environment.
    #[error("name '{name}' is not defined")]
    UnknownVariable { name: String },

    /// A math function received an argument that is neither an int nor a float.
    ///
    /// `param` names the offending parameter for functions taking more than
    /// one argument.
    #[error("{}", argument_type_message(function, *param, type_name))]
    ArgumentType {
        function: String,
        param: Option<&'static str>,
        type_name: &'static str,
    },

    /// An integer whose magnitude has no finite double representation.
    #[error("int too large to convert to float: {digits} decimal digits")]
    Coercion { digits: usize },

    /// Wrong number of positional arguments.
    #[error("{name}() accepts {expected} positional argument(s) but got {found}")]
    InvalidFunctionCall {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A required parameter was not supplied.
    #[error("{name}() missing required argument '{param}'")]
    MissingArgument { name: String, param: &'static str },

    /// A keyword argument that matches no parameter.
    #[error("{name}() got an unexpected keyword argument '{keyword}'")]
    UnexpectedKeyword { name: String, keyword: String },

    /// A parameter supplied both positionally and by keyword, or twice by keyword.
    #[error("{name}() got multiple values for parameter '{param}'")]
    DuplicateArgument { name: String, param: String },

    /// Call of a value that is not a function.
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: &'static str },

    /// An operator applied to operand types it does not support.
    #[error("unsupported binary operation: {left} {op} {right}")]
    UnsupportedBinaryOperation {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// A prefix operator applied to an operand type it does not support.
    #[error("unsupported unary operation: {op}{operand}")]
    UnsupportedUnaryOperation {
        op: &'static str,
        operand: &'static str,
    },

    /// Ordering comparison between values that have no order.
    #[error("unsupported comparison: {left} {op} {right}")]
    UnsupportedComparison {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Division or modulo with a zero divisor.
    #[error("{0}")]
    DivideByZero(&'static str),

    /// Index outside the bounds of a sequence.
    #[error("index out of range (index is {index}, but sequence has {len} elements)")]
    IndexOutOfBounds { index: String, len: usize },

    /// Indexing a value that is not a sequence.
    #[error("type '{type_name}' is not indexable")]
    NotIndexable { type_name: &'static str },

    /// Indexing with something other than an int.
    #[error("got {type_name} for sequence index, want int")]
    InvalidIndex { type_name: &'static str },

    /// A builtin received an argument of the right type but an unusable value.
    #[error("{function}: {message}")]
    InvalidValue { function: String, message: String },

    /// A builtin received an argument of an unsupported type.
    #[error("{function}: got {type_name}, want {expected}")]
    WrongType {
        function: String,
        expected: &'static str,
        type_name: &'static str,
    },

    /// Two environment bindings with the same name.
    #[error("duplicate binding for '{name}'")]
    DuplicateBinding { name: String },

    /// A fixed-capacity table is full.
    #[error("capacity exceeded for {0}")]
    CapacityExceeded(&'static str),

    /// A binding name longer than the fixed-capacity name buffer.
    #[error("name too long for binding table: '{0}'")]
    NameTooLong(String),

    /// General-purpose error for any other error conditions.
    #[error("{0}")]
    Other(String),
}

fn argument_type_message(function: &str, param: Option<&str>, type_name: &str) -> String {
    match param {
        Some(param) => format!("unsupported argument {param} of {function}: {type_name}"),
        None => format!("unsupported argument of {function}: {type_name}"),
    }
}

impl ExprError {
    /// Maps the error onto the calculator's error taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExprError::ArgumentType { .. } => ErrorCategory::ArgumentType,
            ExprError::Coercion { .. } => ErrorCategory::Coercion,
            ExprError::Tokenizer { .. }
            | ExprError::Syntax { .. }
            | ExprError::UnmatchedBracket { .. }
            | ExprError::ExpressionTooLong { .. }
            | ExprError::RecursionLimit { .. } => ErrorCategory::Syntax,
            ExprError::UnknownVariable { .. } => ErrorCategory::Name,
            _ => ErrorCategory::Runtime,
        }
    }

    pub fn argument_type(
        function: impl Into<String>,
        param: Option<&'static str>,
        type_name: &'static str,
    ) -> Self {
        ExprError::ArgumentType {
            function: function.into(),
            param,
            type_name,
        }
    }

    pub fn invalid_value(function: impl Into<String>, message: impl Into<String>) -> Self {
        ExprError::InvalidValue {
            function: function.into(),
            message: message.into(),
        }
    }
}
