#![allow(missing_docs)]

use proptest::prelude::*;
use sombra_filter::query::builder::param;
use sombra_filter::query::{BinaryOp, Expr, Translator, Value};

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        "[a-z ]{0,10}".prop_map(Value::String),
        "[A-Z][a-z]{1,6}".prop_map(Value::Enum),
    ]
}

fn arb_comparison() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Eq),
        Just(BinaryOp::Ne),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Le),
        Just(BinaryOp::Gt),
        Just(BinaryOp::Ge),
    ]
}

fn arb_predicate() -> impl Strategy<Value = Expr> {
    let leaf = ("[a-z]{1,8}", arb_comparison(), arb_value())
        .prop_map(|(field, op, value)| Expr::binary(op, param("p").field(field), Expr::from(value)));
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.and(r)),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l.or(r)),
            inner.prop_map(|e| !e),
        ]
    })
}

proptest! {
    #[test]
    fn comparison_is_wrapped_with_its_token(
        field in "[a-z]{1,8}",
        op in arb_comparison(),
        value in any::<i64>(),
    ) {
        let expr = Expr::binary(op, param("p").field(field.clone()), Expr::constant(value));
        let text = Translator::new().translate(&expr).unwrap();
        let token = op.token().unwrap();
        prop_assert_eq!(text, format!("(p.{field} {token} {value})"));
    }

    #[test]
    fn translation_is_deterministic(expr in arb_predicate()) {
        let translator = Translator::new();
        let first = translator.translate(&expr).unwrap();
        let second = translator.translate(&expr).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn parentheses_balance_outside_string_literals(expr in arb_predicate()) {
        let text = Translator::new().translate(&expr).unwrap();
        let mut depth = 0_i64;
        let mut in_string = false;
        for ch in text.chars() {
            match ch {
                '\'' => in_string = !in_string,
                '(' if !in_string => depth += 1,
                ')' if !in_string => depth -= 1,
                _ => {}
            }
            prop_assert!(depth >= 0);
        }
        prop_assert_eq!(depth, 0);
    }
}
