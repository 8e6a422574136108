#![allow(missing_docs)]

use std::sync::Arc;

use serde_json::json;
use sombra_filter::query::builder::{call, list, param};
use sombra_filter::query::{
    parse_predicate, AccessorResolver, BinaryOp, Captured, Expr, ParseOptions, Resolved,
    Translator, UnaryOp, Value,
};
use sombra_filter::FilterError;
use time::macros::datetime;

fn options() -> ParseOptions {
    ParseOptions::default().with_collection("addresses")
}

fn translate_text(src: &str) -> String {
    let predicate = parse_predicate(src, &options()).expect("parse predicate");
    Translator::new()
        .translate_predicate(&predicate)
        .expect("translate predicate")
}

#[test]
fn person_filter_with_quantifier() {
    let p = param("p");
    let tree = p
        .clone()
        .field("firstName")
        .equals("yaser")
        .and(
            p.clone()
                .items("addresses")
                .any("a", |a| a.field("city").eq(p.field("lastName"))),
        );
    let expected =
        "(p.firstName = 'yaser' and size([a in p.addresses where (a.city = p.lastName)]) > 0)";
    assert_eq!(Translator::new().translate(&tree).unwrap(), expected);
    assert_eq!(
        translate_text(
            r#"p => p.firstName.equals("yaser") && p.addresses.any(a => a.city == p.lastName)"#
        ),
        expected
    );
}

#[test]
fn equality_operator_is_always_parenthesized() {
    assert_eq!(
        translate_text(r#"p.firstName == "yaser" && p.grade >= 3"#),
        "((p.firstName = 'yaser') and (p.grade >= 3))"
    );
}

#[test]
fn null_comparisons() {
    assert_eq!(translate_text("p.middleName == null"), "(p.middleName is null)");
    assert_eq!(
        translate_text("p.middleName != null || !p.active"),
        "((p.middleName is not null) or not (p.active))"
    );
}

#[test]
fn string_constants_are_not_escaped() {
    assert_eq!(translate_text(r#"p.name == "it's""#), "(p.name = 'it's')");
}

#[test]
fn date_constants_render_iso_like() {
    let tree = param("p")
        .field("birthDate")
        .lt(Value::DateTime(datetime!(2008-07-10 9:05:03)));
    assert_eq!(
        Translator::new().translate(&tree).unwrap(),
        "(p.birthDate < '2008-07-10T09:05:03')"
    );
    assert_eq!(
        translate_text("p.birthDate >= date(2008, 7, 10, 9, 5, 3)"),
        "(p.birthDate >= '2008-07-10T09:05:03')"
    );
}

#[test]
fn collection_methods_without_lambda() {
    assert_eq!(translate_text("p.addresses.count() > 2"), "(size(p.addresses) > 2)");
    assert_eq!(translate_text("p.addresses.any()"), "size(p.addresses) > 0");
    assert_eq!(
        translate_text("p.addresses.last() != 'x'"),
        "(p.addresses[size(p.addresses)-1..size(p.addresses)][0] <> 'x')"
    );
}

#[test]
fn count_with_lambda_filters_first() {
    assert_eq!(
        translate_text("p.addresses.count(a => a.zip == 1) > 0"),
        "(size([a in p.addresses where (a.zip = 1)]) > 0)"
    );
}

#[test]
fn list_membership() {
    let tree = call("contains", vec![list(["a", "b"]), param("p").field("tag")]);
    assert_eq!(
        Translator::new().translate(&tree).unwrap(),
        "p.tag In ['a','b'] "
    );
}

#[test]
fn string_methods_use_infix_keywords() {
    assert_eq!(
        translate_text("p.name.startsWith('ya') && p.name.endsWith('er')"),
        "(p.name Starts With 'ya' and p.name Ends With 'er')"
    );
    assert_eq!(translate_text("p.name.contains('as')"), "p.name Contains 'as'");
}

#[test]
fn translation_is_repeatable() {
    let env = Captured::new(json!({"limits": {"grade": 4}}));
    let predicate = parse_predicate(
        "p.grade > $limits.grade && p.addresses.any(a => a.city == 'Tehran')",
        &options().with_captures(env),
    )
    .unwrap();
    let translator = Translator::new();
    let first = translator.translate_predicate(&predicate).unwrap();
    let second = translator.translate_predicate(&predicate).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        "((p.grade > 4) and size([a in p.addresses where (a.city = 'Tehran')]) > 0)"
    );
}

struct Request {
    filter: Filter,
}

struct Filter {
    owner: String,
}

#[test]
fn captured_paths_resolve_outermost_first() {
    let resolver = AccessorResolver::new()
        .field::<Request, _>("filter", |req| {
            Resolved::captured(Filter {
                owner: req.filter.owner.clone(),
            })
        })
        .field::<Filter, _>("owner", |filter| Resolved::value(filter.owner.as_str()));
    let request = Request {
        filter: Filter {
            owner: "sara".to_owned(),
        },
    };
    let tree = param("p").field("owner").eq(Expr::member(
        Expr::member(Expr::captured(request), "filter"),
        "owner",
    ));
    let translator = Translator::new().with_resolver(Arc::new(resolver));
    assert_eq!(translator.translate(&tree).unwrap(), "(p.owner = 'sara')");
}

#[test]
fn captured_path_ending_on_composite_fails() {
    let env = Captured::new(json!({"limits": {"grade": 4}}));
    let tree = Expr::binary(
        BinaryOp::Eq,
        param("p").field("grade"),
        Expr::member(Expr::Captured(env), "limits"),
    );
    assert!(matches!(
        Translator::new().translate(&tree),
        Err(FilterError::UnresolvedPath { .. })
    ));
}

#[test]
fn unsupported_operators_are_reported() {
    let negate = Expr::unary(UnaryOp::Negate, param("p").field("grade"));
    assert_eq!(
        Translator::new().translate(&negate),
        Err(FilterError::unsupported("negate"))
    );
    let add = Expr::binary(BinaryOp::Add, param("p").field("grade"), Expr::constant(1));
    assert!(matches!(
        Translator::new().translate(&add),
        Err(FilterError::UnsupportedOperator { .. })
    ));
    let unknown = param("p").field("name").contains("x").and(Expr::method(
        param("p").field("name"),
        "toUpper",
        vec![],
    ));
    assert!(matches!(
        Translator::new().translate(&unknown),
        Err(FilterError::UnsupportedOperator { .. })
    ));
}
