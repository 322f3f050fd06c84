//! Long-lived evaluation sessions and their output history.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, debug_span};

use crate::config::SessionConfig;
use crate::constants;
use crate::context::{Environment, EnvironmentBuilder};
use crate::engine::parse_expression_with_config;
use crate::error::Result;
use crate::eval::eval_ast;
use crate::history::Equation;
use crate::value::{ListRef, Value};

/// Name under which the output history is visible to expressions.
pub const OUT: &str = "Out";

/// Name of the π constant.
pub const PI: &str = "pi";

/// Append-only list of a session's successful results.
///
/// Clones share the same underlying list. Expressions see it as the list
/// bound to `Out`; they have no operation that can modify it.
#[derive(Debug, Clone, Default)]
pub struct OutputHistory {
    items: ListRef,
}

impl OutputHistory {
    pub fn new() -> Self {
        Self {
            items: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Appends `value` and returns the value as stored.
    ///
    /// If `value` contains this history list itself, the stored value holds a
    /// snapshot of the list's current contents in its place, so the history
    /// never contains itself.
    pub(crate) fn push(&self, value: Value) -> Value {
        let stored = value.detach_from(&self.items);
        self.items.borrow_mut().push(stored.clone());
        stored
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// The `index`-th result, counting from zero.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// A copy of all results in evaluation order.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    /// The history as an expression value, sharing identity with this list.
    pub fn as_value(&self) -> Value {
        Value::List(Rc::clone(&self.items))
    }
}

/// An evaluation environment plus the history of what was computed in it.
///
/// The environment binds `pi`, `Out`, the language builtins and the math
/// library. It is built once when the session is created and never changes;
/// each successful [`evaluate`](Self::evaluate) appends its result to `Out`.
///
/// A session is single-threaded: it holds reference-counted values and is
/// neither `Send` nor `Sync`, and `evaluate` takes `&mut self`, so calls are
/// serialized by construction.
///
/// # Examples
///
/// ```
/// use calclark::session::ExpressionSession;
///
/// let mut session = ExpressionSession::new().unwrap();
/// assert_eq!(session.evaluate("3 + 4").unwrap().to_string(), "7");
/// assert_eq!(session.evaluate("Out[0] * 2").unwrap().to_string(), "14");
/// assert!(session.evaluate("sin('x')").is_err());
/// assert_eq!(session.history().len(), 2);
/// ```
#[derive(Debug)]
pub struct ExpressionSession {
    config: SessionConfig,
    env: Environment,
    history: OutputHistory,
}

impl ExpressionSession {
    /// Creates a session with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Creates a session whose diagnostics and limits follow `config`.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        let history = OutputHistory::new();
        let mut builder = EnvironmentBuilder::new();
        builder
            .with_universe()?
            .register_constant(PI, constants::PI)?
            .bind_history(OUT, &history)?
            .with_math_library()?;
        let env = builder.build();
        debug!(bindings = env.len(), file = %config.file_name, "session ready");
        Ok(Self {
            config,
            env,
            history,
        })
    }

    /// Parses and evaluates `source`, recording a successful result in `Out`.
    ///
    /// On failure the error is returned as is and `Out` is left unchanged.
    pub fn evaluate(&mut self, source: &str) -> Result<Value> {
        let span = debug_span!("evaluate", out_len = self.history.len());
        let _guard = span.enter();

        let outcome = parse_expression_with_config(source, &self.config)
            .and_then(|ast| eval_ast(&ast, &self.env));
        match outcome {
            Ok(value) => {
                let stored = self.history.push(value);
                debug!(result = %stored, "evaluated");
                Ok(stored)
            }
            Err(err) => {
                debug!(error = %err, category = ?err.category(), "evaluation failed");
                Err(err)
            }
        }
    }

    /// Evaluates `source` and wraps the outcome as a transcript row.
    pub fn evaluate_to_equation(&mut self, source: &str) -> Equation {
        match self.evaluate(source) {
            Ok(value) => Equation::answered(source, value.to_string()),
            Err(err) => Equation::failed(source, err.to_string()),
        }
    }

    /// The results recorded so far, as seen through `Out`.
    pub fn history(&self) -> &OutputHistory {
        &self.history
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ExprError};

    #[test]
    fn test_out_grows_only_on_success() {
        let mut session = ExpressionSession::new().unwrap();
        session.evaluate("1 + 1").unwrap();
        assert!(session.evaluate("1 +").is_err());
        assert!(session.evaluate("undefined").is_err());
        session.evaluate("2 * 3").unwrap();

        assert_eq!(session.history().to_vec(), vec![Value::int(2), Value::int(6)]);
        assert_eq!(session.evaluate("Out[1] - Out[0]").unwrap(), Value::int(4));
        assert_eq!(session.evaluate("len(Out)").unwrap(), Value::int(3));
    }

    #[test]
    fn test_out_is_shared_by_identity() {
        let session = ExpressionSession::new().unwrap();
        let Some(Value::List(bound)) = session.environment().lookup(OUT) else {
            panic!("Out should be bound to a list");
        };
        let Value::List(history) = session.history().as_value() else {
            panic!("history should be a list");
        };
        assert!(Rc::ptr_eq(&bound, &history));
    }

    #[test]
    fn test_evaluating_out_stores_a_snapshot() {
        let mut session = ExpressionSession::new().unwrap();
        session.evaluate("1").unwrap();
        let value = session.evaluate("Out").unwrap();
        assert_eq!(value.to_string(), "[1]");
        session.evaluate("[Out, 2]").unwrap();

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.evaluate("Out[1]").unwrap().to_string(), "[1]");
        assert_eq!(session.evaluate("Out[2]").unwrap().to_string(), "[[1, [1]], 2]");
    }

    #[test]
    fn test_math_argument_error_leaves_out_unchanged() {
        let mut session = ExpressionSession::new().unwrap();
        session.evaluate("2").unwrap();
        let err = session.evaluate("log10('ten')").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ArgumentType);
        assert!(err.to_string().contains("log10"));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_config_file_name_in_errors() {
        let config = SessionConfig::default().with_file_name("<calc>");
        let mut session = ExpressionSession::with_config(config).unwrap();
        let err = session.evaluate("(1").unwrap_err();
        assert!(matches!(err, ExprError::UnmatchedBracket { ref location, .. } if location.file == "<calc>"));
        assert_eq!(session.config().file_name, "<calc>");
    }

    #[test]
    fn test_evaluate_to_equation() {
        let mut session = ExpressionSession::new().unwrap();
        let ok = session.evaluate_to_equation("3**2");
        assert_eq!(ok.expression(), "3**2");
        assert_eq!(ok.answer(), Some("9.0"));
        assert!(!ok.is_exception());

        let failed = session.evaluate_to_equation("foo");
        assert!(failed.is_exception());
        assert_eq!(failed.exception(), Some("name 'foo' is not defined"));
        assert_eq!(session.history().len(), 1);
    }
}
