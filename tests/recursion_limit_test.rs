//! Tests for the parser's nesting and length limits
//!
//! Evaluation recurses over nested subexpressions, so these limits are what
//! keep deeply nested input from overflowing the stack. Flat operator chains
//! do not count as nesting.

use calclark::config::{DEFAULT_MAX_EXPRESSION_LENGTH, DEFAULT_MAX_RECURSION_DEPTH, SessionConfig};
use calclark::engine::{parse_expression, parse_expression_with_config};
use calclark::error::{ErrorCategory, ExprError};
use calclark::session::ExpressionSession;

#[test]
fn test_nesting_within_limit_evaluates() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH / 2;
    let expr = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let mut session = ExpressionSession::new().unwrap();
    assert_eq!(session.evaluate(&expr).unwrap().to_string(), "1");
}

#[test]
fn test_long_flat_chains_evaluate_under_default_config() {
    let mut session = ExpressionSession::new().unwrap();

    let sum = vec!["1"; 1000].join("+");
    assert_eq!(session.evaluate(&sum).unwrap().to_string(), "1000");

    let mixed = vec!["2 * 3 - 5"; 1000].join(" + ");
    assert_eq!(session.evaluate(&mixed).unwrap().to_string(), "1000");

    let falsy = vec!["0"; 1000].join(" or ");
    assert_eq!(session.evaluate(&format!("{falsy} or 'last'")).unwrap().to_string(), "last");
    let truthy = vec!["1"; 1000].join(" and ");
    assert_eq!(session.evaluate(&format!("{truthy} and 0")).unwrap().to_string(), "0");
    assert_eq!(session.evaluate(&format!("0 and {truthy}")).unwrap().to_string(), "0");
}

#[test]
fn test_recursion_depth_limit() {
    let depth = DEFAULT_MAX_RECURSION_DEPTH * 4;
    let expr = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let error = parse_expression(&expr).unwrap_err();
    match error {
        ExprError::RecursionLimit { max_depth, .. } => {
            assert_eq!(max_depth, DEFAULT_MAX_RECURSION_DEPTH);
        }
        other => panic!("expected a recursion limit error, got {other:?}"),
    }
    assert_eq!(
        parse_expression(&expr).unwrap_err().category(),
        ErrorCategory::Syntax
    );
}

#[test]
fn test_deep_unary_and_postfix_chains_are_bounded() {
    let config = SessionConfig::default().with_max_recursion_depth(32);
    let unary = format!("{}1", "-".repeat(100));
    assert!(matches!(
        parse_expression_with_config(&unary, &config),
        Err(ExprError::RecursionLimit { .. })
    ));

    let indexing = format!("Out{}", "[0]".repeat(100));
    assert!(matches!(
        parse_expression_with_config(&indexing, &config),
        Err(ExprError::RecursionLimit { .. })
    ));

    let power = vec!["2"; 100].join("**");
    assert!(matches!(
        parse_expression_with_config(&power, &config),
        Err(ExprError::RecursionLimit { .. })
    ));
}

#[test]
fn test_session_uses_configured_limits() {
    let config = SessionConfig::default()
        .with_max_recursion_depth(8)
        .with_max_expression_length(64);
    let mut session = ExpressionSession::with_config(config).unwrap();

    assert!(session.evaluate("((((1))))").is_ok());
    assert!(matches!(
        session.evaluate("((((((((((1))))))))))"),
        Err(ExprError::RecursionLimit { max_depth: 8, .. })
    ));
    assert!(matches!(
        session.evaluate(&"1+".repeat(40)),
        Err(ExprError::ExpressionTooLong { max: 64, .. })
    ));
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_default_expression_length_limit() {
    let expr = "1".repeat(DEFAULT_MAX_EXPRESSION_LENGTH + 1);
    let err = parse_expression(&expr).unwrap_err();
    assert!(matches!(err, ExprError::ExpressionTooLong { .. }));
    assert!(err.to_string().starts_with("<expr>: expression too long"));
    assert!(err.to_string().contains(&format!("{} bytes", DEFAULT_MAX_EXPRESSION_LENGTH + 1)));

    // The limit counts bytes, so multi-byte characters fill it sooner
    let config = SessionConfig::default().with_max_expression_length(8);
    let err = parse_expression_with_config("'ééééé'", &config).unwrap_err();
    assert!(matches!(err, ExprError::ExpressionTooLong { len: 12, max: 8, .. }));
}
