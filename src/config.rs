//! Session configuration.

use serde::{Deserialize, Serialize};

/// Pseudo-filename used in diagnostics for evaluated fragments.
pub const DEFAULT_FILE_NAME: &str = "<expr>";

/// Longest accepted source fragment, in bytes.
pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 10_000;

/// Deepest accepted syntax tree.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 256;

/// Limits and naming applied when parsing and evaluating source fragments.
///
/// ```
/// use calclark::config::SessionConfig;
///
/// let config: SessionConfig = serde_json::from_str(r#"{ "max_recursion_depth": 64 }"#).unwrap();
/// assert_eq!(config.file_name, "<expr>");
/// assert_eq!(config.max_recursion_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name reported in syntax error locations.
    pub file_name: String,
    /// Inputs longer than this are rejected before tokenizing.
    pub max_expression_length: usize,
    /// Maximum nesting depth of the parsed expression.
    pub max_recursion_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl SessionConfig {
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_max_expression_length(mut self, len: usize) -> Self {
        self.max_expression_length = len;
        self
    }
}
