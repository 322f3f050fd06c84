use calclark::functions::{self, MathKernel, math_function, math_functions};
use calclark::{Real, Value, assert_approx_eq};

use test_helpers::{eval, eval_float, new_session};

/// A point inside the domain of every single-argument function.
fn sample_input(name: &str) -> Real {
    match name {
        "acos" | "asin" | "atanh" => 0.5,
        "acosh" => 2.5,
        _ => 3.0,
    }
}

#[test]
fn test_every_single_argument_function_matches_its_primitive() {
    for function in math_functions() {
        let MathKernel::Unary(primitive) = function.kernel else {
            continue;
        };
        let x = sample_input(function.name);
        let expected = primitive(x);
        assert_approx_eq!(
            eval_float(&format!("{}({})", function.name, x)),
            expected,
            1e-12,
            "{} disagrees with its primitive",
            function.name
        );
    }
}

#[test]
fn test_int_and_float_arguments_agree() {
    for function in math_functions() {
        if !matches!(function.kernel, MathKernel::Unary(_)) {
            continue;
        }
        let from_int = eval_float(&format!("{}(1)", function.name));
        let from_float = eval_float(&format!("{}(1.0)", function.name));
        if from_int.is_nan() {
            assert!(from_float.is_nan(), "{}", function.name);
        } else {
            assert_eq!(from_int, from_float, "{}", function.name);
        }
    }
}

#[test]
fn test_two_argument_functions() {
    assert_approx_eq!(eval_float("pow(2, 10)"), 1024.0);
    assert_approx_eq!(eval_float("pow(x=9, y=0.5)"), 3.0);
    assert_approx_eq!(eval_float("atan2(1, 1)"), core::f64::consts::FRAC_PI_4);
    assert_approx_eq!(eval_float("atan2(y=0, x=-1)"), core::f64::consts::PI);
    assert_approx_eq!(eval_float("atan2(-1, -1)"), -3.0 * core::f64::consts::FRAC_PI_4);
    assert_eq!(functions::atan2(0.0, 1.0), 0.0);
    assert_eq!(functions::pow(3.0, 2.0), 9.0);
}

#[test]
fn test_no_domain_validation() {
    assert!(eval_float("acos(2)").is_nan());
    assert!(eval_float("log(-1)").is_nan());
    assert_eq!(eval_float("log10(0)"), Real::NEG_INFINITY);
    assert_eq!(eval_float("exp(1000)"), Real::INFINITY);
}

#[test]
fn test_non_numeric_arguments_name_the_function() {
    let mut session = new_session();
    for function in math_functions() {
        let call = match function.kernel {
            MathKernel::Unary(_) => format!("{}('a')", function.name),
            MathKernel::Binary(_) => format!("{}(1, None)", function.name),
        };
        let err = session.evaluate(&call).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains(function.name),
            "{call}: message {message:?} should name the function"
        );
        assert!(message.contains("unsupported argument"), "{message}");
    }
    assert!(session.history().is_empty());
}

#[test]
fn test_booleans_are_not_numbers() {
    assert!(eval("sin(True)").is_err());
}

#[test]
fn test_catalog_lookup() {
    let log2 = math_function("log2").expect("log2 is in the catalog");
    assert_eq!(log2.params.len(), 1);
    assert!(!log2.description.is_empty());
    assert!(math_function("sqrt").is_none());

    let pow = math_function("pow").expect("pow is in the catalog");
    let names: Vec<_> = pow.params.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["x", "y"]);
    let atan2 = math_function("atan2").expect("atan2 is in the catalog");
    let names: Vec<_> = atan2.params.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["y", "x"]);

    let Value::Function(f) = eval("exp").unwrap() else {
        panic!("exp should be a function value");
    };
    assert!(f.description.is_some());
}
