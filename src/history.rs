//! Transcript rows and their persisted form.
//!
//! A calculator front end shows one [`Equation`] per submitted expression:
//! either the answer's display string or the error message. A [`Transcript`]
//! keeps those rows in order and numbers the answers the way `Out` does.
//! [`HistorySnapshot`] is the flat, serializable layout (three parallel
//! arrays) used to save a transcript and rebuild it later without evaluating
//! anything again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of one submitted expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Display string of the value the expression produced.
    Answer(String),
    /// Message of the error the expression raised.
    Exception(String),
}

/// One transcript row: an expression and what it evaluated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    expression: String,
    outcome: Outcome,
}

impl Equation {
    pub fn answered(expression: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            outcome: Outcome::Answer(answer.into()),
        }
    }

    pub fn failed(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            outcome: Outcome::Exception(message.into()),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.outcome, Outcome::Exception(_))
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Answer(answer) => Some(answer),
            Outcome::Exception(_) => None,
        }
    }

    pub fn exception(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Exception(message) => Some(message),
            Outcome::Answer(_) => None,
        }
    }

    /// The answer or the error message, whichever this row holds.
    pub fn answer_or_exception(&self) -> &str {
        match &self.outcome {
            Outcome::Answer(text) | Outcome::Exception(text) => text,
        }
    }
}

/// A transcript row together with its position in `Out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a> {
    /// Index of the answer in `Out`; `None` for exception rows.
    pub out_index: Option<usize>,
    pub equation: &'a Equation,
}

/// The ordered list of rows shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    equations: Vec<Equation>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, equation: Equation) {
        self.equations.push(equation);
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    /// Rows in order, answers numbered consecutively from zero.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.equations.iter().scan(0, |next_out, equation| {
            let out_index = if equation.is_exception() {
                None
            } else {
                *next_out += 1;
                Some(*next_out - 1)
            };
            Some(Row {
                out_index,
                equation,
            })
        })
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::from_equations(&self.equations)
    }

    /// Rebuilds a transcript from its saved form.
    pub fn restore(snapshot: HistorySnapshot) -> Result<Self, SnapshotError> {
        Ok(Self {
            equations: snapshot.into_equations()?,
        })
    }
}

impl From<Vec<Equation>> for Transcript {
    fn from(equations: Vec<Equation>) -> Self {
        Self { equations }
    }
}

/// Errors raised when restoring a [`HistorySnapshot`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error(
        "history snapshot arrays differ in length: {expressions} expressions, {types} types, {answers} answers"
    )]
    LengthMismatch {
        expressions: usize,
        types: usize,
        answers: usize,
    },
}

/// Persisted transcript layout: three parallel arrays.
///
/// `types[i]` is `true` when row `i` is an exception, in which case
/// `answer_or_exception[i]` holds the error message instead of an answer.
///
/// ```
/// use calclark::history::{Equation, HistorySnapshot};
///
/// let rows = vec![Equation::answered("3+4", "7"), Equation::failed("foo", "name 'foo' is not defined")];
/// let snapshot = HistorySnapshot::from_equations(&rows);
/// assert_eq!(snapshot.types, vec![false, true]);
///
/// let json = serde_json::to_string(&snapshot).unwrap();
/// let restored: HistorySnapshot = serde_json::from_str(&json).unwrap();
/// assert_eq!(restored.into_equations().unwrap(), rows);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub expressions: Vec<String>,
    pub types: Vec<bool>,
    pub answer_or_exception: Vec<String>,
}

impl HistorySnapshot {
    pub fn from_equations(equations: &[Equation]) -> Self {
        Self {
            expressions: equations.iter().map(|e| e.expression.clone()).collect(),
            types: equations.iter().map(Equation::is_exception).collect(),
            answer_or_exception: equations
                .iter()
                .map(|e| e.answer_or_exception().to_string())
                .collect(),
        }
    }

    /// Reconstructs the rows, rejecting arrays of unequal length.
    pub fn into_equations(self) -> Result<Vec<Equation>, SnapshotError> {
        let len = self.expressions.len();
        if self.types.len() != len || self.answer_or_exception.len() != len {
            return Err(SnapshotError::LengthMismatch {
                expressions: len,
                types: self.types.len(),
                answers: self.answer_or_exception.len(),
            });
        }
        Ok(self
            .expressions
            .into_iter()
            .zip(self.types)
            .zip(self.answer_or_exception)
            .map(|((expression, is_exception), text)| {
                if is_exception {
                    Equation::failed(expression, text)
                } else {
                    Equation::answered(expression, text)
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_number_answers_like_out() {
        let transcript = Transcript::from(vec![
            Equation::answered("1", "1"),
            Equation::failed("1 +", "syntax error"),
            Equation::answered("2", "2"),
        ]);
        let indices: Vec<_> = transcript.rows().map(|row| row.out_index).collect();
        assert_eq!(indices, vec![Some(0), None, Some(1)]);
    }

    #[test]
    fn test_exception_with_empty_message_stays_an_exception() {
        let rows = vec![Equation::failed("x", "")];
        let restored = HistorySnapshot::from_equations(&rows).into_equations().unwrap();
        assert!(restored[0].is_exception());
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let snapshot = HistorySnapshot {
            expressions: vec!["1".into(), "2".into()],
            types: vec![false],
            answer_or_exception: vec!["1".into(), "2".into()],
        };
        let err = Transcript::restore(snapshot).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::LengthMismatch {
                expressions: 2,
                types: 1,
                answers: 2
            }
        );
    }
}
