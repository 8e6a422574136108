#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sombra_filter::query::functions::{CURRENT_USER, PERSIAN_DATE};
use sombra_filter::query::{
    parse_predicate, ContextProvider, FunctionRegistry, ParseOptions, StaticContext, Translator,
    Value,
};
use sombra_filter::FilterError;

fn builtins() -> Translator {
    let context = StaticContext::new().with(CURRENT_USER, "ali");
    Translator::new().with_registry(FunctionRegistry::with_builtins(Arc::new(context)))
}

fn translate(translator: &Translator, src: &str) -> Result<String, FilterError> {
    let options = ParseOptions::default().with_collection("tags");
    let predicate = parse_predicate(src, &options).expect("parse predicate");
    translator.translate_predicate(&predicate)
}

#[test]
fn between_in_static_and_extension_form() {
    let translator = builtins();
    assert_eq!(
        translate(&translator, "between(p.grade, 1, 5)").unwrap(),
        "p.grade between [1,5]"
    );
    assert_eq!(
        translate(&translator, "p.grade.between(1, 5) && p.ok == true").unwrap(),
        "(p.grade between [1,5] and (p.ok = true))"
    );
}

#[test]
fn persian_date_literal() {
    assert_eq!(
        translate(&builtins(), "p.birthDate >= pdate('1370/07/01')").unwrap(),
        "(p.birthDate >= '1991-09-23T00:00:00')"
    );
    assert!(matches!(
        translate(&builtins(), "p.birthDate >= pdate('1402/12/30')"),
        Err(FilterError::MalformedTree(_))
    ));
}

struct CountingContext {
    calls: AtomicUsize,
}

impl ContextProvider for CountingContext {
    fn lookup(&self, _key: &str) -> Option<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Value::Int(1))
    }
}

#[test]
fn current_user_consults_context_and_emits_nothing() {
    let context = Arc::new(CountingContext {
        calls: AtomicUsize::new(0),
    });
    let translator =
        Translator::new().with_registry(FunctionRegistry::with_builtins(context.clone()));
    assert_eq!(
        translate(&translator, "p.owner == currentUser()").unwrap(),
        "(p.owner = )"
    );
    assert_eq!(context.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn registry_takes_precedence_over_collection_rules() {
    let registry = FunctionRegistry::new().with_fn("any", |emitter, args| {
        emitter.append("exists(");
        emitter.visit(&args[0])?;
        emitter.append(")");
        Ok(())
    });
    let translator = Translator::new().with_registry(registry);
    assert_eq!(
        translate(&translator, "p.tags.any(t => t == 'x')").unwrap(),
        "exists(p.tags)"
    );
    assert_eq!(
        translate(&Translator::new(), "p.tags.any(t => t == 'x')").unwrap(),
        "size([t in p.tags where (t = 'x')]) > 0"
    );
}

#[test]
fn unregistered_static_call_is_unsupported() {
    assert!(matches!(
        translate(&Translator::new(), "between(p.grade, 1, 5)"),
        Err(FilterError::UnsupportedOperator { .. })
    ));
    assert!(translate(&builtins(), &format!("{PERSIAN_DATE}('1400/01/01') == p.d")).is_ok());
}

#[test]
fn translator_is_shareable_across_threads() {
    let translator = Arc::new(builtins());
    let handles: Vec<_> = (0..4)
        .map(|grade| {
            let translator = Arc::clone(&translator);
            std::thread::spawn(move || {
                translate(&translator, &format!("p.grade.between({grade}, 9)")).unwrap()
            })
        })
        .collect();
    for (grade, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            format!("p.grade between [{grade},9]")
        );
    }
}
