//! Integration tests for pipe chains and the built-in pipe functions.

use std::collections::HashMap;

use loclang::{args, BuildErrorKind, Localization, PipeError, PipeRegistry, Primitive, Value};

fn loaded(source: &str) -> Localization {
    let loc = Localization::builder().build();
    loc.load("test", source, "pipes.lang").unwrap();
    loc
}

fn build(template: &str, args: &loclang::TemplateArguments) -> Result<String, loclang::BuildError> {
    let loc = loaded(&format!("[t]\n{template}"));
    loc.resource("test", "t", args)
}

fn object(pairs: &[(&str, Value)]) -> Value {
    let mut map = HashMap::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    Value::Object(map)
}

#[test]
fn pipes_apply_in_declaration_order() {
    assert_eq!(
        build("{{ bar | toUpperCase }}", &args! { "bar" => "bar" }).unwrap(),
        "BAR"
    );
    assert_eq!(
        build(
            "{{ bar | toUpperCase | toLowerCase }}",
            &args! { "bar" => "BaR" }
        )
        .unwrap(),
        "bar"
    );
}

#[test]
fn unregistered_pipe_is_an_error_naming_it() {
    let err = build("{{ bar | nonExistantFn }}", &args! { "bar" => "bar" }).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::UnknownPipeFunction);
    assert!(err.message.contains("Pipe function 'nonExistantFn' does not exist"));
}

#[test]
fn unregistered_pipe_suggests_a_close_name() {
    let err = build("{{ bar | toUperCase }}", &args! { "bar" => "bar" }).unwrap_err();
    assert!(err.message.contains("Did you mean 'toUpperCase'?"));
}

#[test]
fn pipes_run_on_absent_values() {
    // `default` exists precisely to replace an absent value...
    assert_eq!(
        build("{{? bar | default('none') }}", &args! {}).unwrap(),
        "none"
    );
    // ...while string pipes fail on one.
    let err = build("{{? bar | toUpperCase }}", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::PipeFailed);
    assert!(err.message.contains("toUpperCase"));
    assert!(err.message.contains("undefined"));
}

#[test]
fn default_passes_present_values_through() {
    assert_eq!(
        build("{{ bar | default('none') }}", &args! { "bar" => "set" }).unwrap(),
        "set"
    );
}

#[test]
fn include_results_can_be_piped() {
    let loc = loaded("[inner]\nfoo{{ bar }}baz\n[outer]\n{{> inner | toUpperCase }}");
    assert_eq!(
        loc.resource("test", "outer", &args! { "bar" => "bar" }).unwrap(),
        "FOOBARBAZ"
    );
}

#[test]
fn match_arguments_can_be_piped() {
    let loc = loaded("[m]\nfoo{{# bar | toUpperCase : 'FOO' => 'BAR' }}baz");
    assert_eq!(
        loc.resource("test", "m", &args! { "bar" => "foo" }).unwrap(),
        "fooBARbaz"
    );
}

#[test]
fn string_builtins() {
    let a = args! { "s" => "bar" };
    assert_eq!(build("{{ s | capitalize }}", &a).unwrap(), "Bar");
    assert_eq!(build("{{ s | repeat(3) }}", &a).unwrap(), "barbarbar");
    assert_eq!(build("{{ s | padStart(5, '@') }}", &a).unwrap(), "@@bar");
    assert_eq!(build("{{ s | padEnd(5, '@') }}", &a).unwrap(), "bar@@");
    assert_eq!(build("{{ s | prepend('foo') }}", &a).unwrap(), "foobar");
    assert_eq!(build("{{ s | concat('a', 1) }}", &a).unwrap(), "bara1");
    assert_eq!(build("{{ s | slice(0, 2) }}", &a).unwrap(), "ba");
    assert_eq!(build("{{ s | slice(-2) }}", &a).unwrap(), "ar");
    assert_eq!(build("{{ s | length }}", &a).unwrap(), "3");

    let ws = args! { "s" => "  bar  " };
    assert_eq!(build("{{ s | trim }}", &ws).unwrap(), "bar");
    assert_eq!(build("x{{ s | trimLeft }}", &ws).unwrap(), "xbar");
    // Trailing output whitespace is trimmed by the builder, so inspect
    // trimRight through a concat.
    assert_eq!(build("{{ s | trimRight | concat('!') }}", &ws).unwrap(), "  bar!");
}

#[test]
fn replace_builtins_use_patterns() {
    let a = args! { "s" => "foo" };
    assert_eq!(build("{{ s | replace('o', '0') }}", &a).unwrap(), "f00");
    assert_eq!(build("{{ s | replaceOnce('o', '0') }}", &a).unwrap(), "f0o");

    let b = args! { "s" => "a1b22c" };
    assert_eq!(build("{{ s | replace('[0-9]+', '-') }}", &b).unwrap(), "a-b-c");
}

#[test]
fn truncate_builtin() {
    let a = args! { "s" => "foo bar baz" };
    assert_eq!(build("{{ s | truncate(10) }}", &a).unwrap(), "foo bar...");
    assert_eq!(build("{{ s | truncate(20) }}", &a).unwrap(), "foo bar baz");
    assert_eq!(build("{{ s | truncate(5, '~') }}", &a).unwrap(), "foo ~");
}

#[test]
fn normalize_whitespace_builtin() {
    let a = args! { "s" => "foo        \n\n\nbar\n    \n    \nbaz" };
    assert_eq!(
        build("{{ s | normalizeWhitespace }}", &a).unwrap(),
        "foo bar baz"
    );
}

#[test]
fn numeric_builtins() {
    let a = args! { "n" => 20 };
    assert_eq!(build("{{ n | add(5) }}", &a).unwrap(), "25");
    assert_eq!(build("{{ n | subtract(2) }}", &a).unwrap(), "18");
    assert_eq!(build("{{ n | multiplyBy(5) }}", &a).unwrap(), "100");
    assert_eq!(build("{{ n | divideBy(2) }}", &a).unwrap(), "10");

    let f = args! { "n" => 10.5 };
    assert_eq!(build("{{ n | floor }}", &f).unwrap(), "10");
    assert_eq!(build("{{ n | ceil }}", &f).unwrap(), "11");
    assert_eq!(build("{{ n | divideBy(2) }}", &f).unwrap(), "5.25");
}

#[test]
fn clamping_builtins_keep_their_established_quirks() {
    // `max` caps at the bound, `min` floors at the bound.
    assert_eq!(build("{{ n | max(10) }}", &args! { "n" => 20 }).unwrap(), "10");
    assert_eq!(build("{{ n | min(10) }}", &args! { "n" => 5 }).unwrap(), "10");
    // `clamp` with low < high resolves to the high bound.
    assert_eq!(
        build("{{ n | clamp(10, 100) }}", &args! { "n" => 20 }).unwrap(),
        "100"
    );
}

#[test]
fn array_builtins() {
    let a = args! { "arr" => vec!["foo", "bar", "baz", "baz"] };
    assert_eq!(build("{{ arr | first }}", &a).unwrap(), "foo");
    assert_eq!(build("{{ arr | length }}", &a).unwrap(), "4");
    assert_eq!(build("{{ arr | join }}", &a).unwrap(), "foo,bar,baz,baz");
    assert_eq!(build("{{ arr | join('+') }}", &a).unwrap(), "foo+bar+baz+baz");
    assert_eq!(build("{{ arr | unique | join }}", &a).unwrap(), "foo,bar,baz");
    assert_eq!(build("{{ arr | slice(1, 3) | join }}", &a).unwrap(), "bar,baz");

    let s = args! { "s" => "a,b,c" };
    assert_eq!(build("{{ s | split(',') | length }}", &s).unwrap(), "3");
}

#[test]
fn object_builtins() {
    let a = args! {
        "o" => object(&[("x", Value::from("y"))]),
        "rows" => Value::Array(vec![
            object(&[("foo", Value::from("baz")), ("keep", Value::from(true))]),
            object(&[("foo", Value::from("bar")), ("keep", Value::from(false))]),
        ])
    };
    assert_eq!(build("{{ o | pick('x') }}", &a).unwrap(), "y");
    assert_eq!(
        build("{{ rows | select('foo') | join(', ') }}", &a).unwrap(),
        "baz, bar"
    );
    assert_eq!(
        build("{{ rows | where('keep') | select('foo') | join }}", &a).unwrap(),
        "baz"
    );
    assert_eq!(
        build("{{ rows | where('foo', 'bar') | length }}", &a).unwrap(),
        "1"
    );
}

#[test]
fn inspect_builtin() {
    let a = args! { "o" => object(&[("a", Value::from(1))]) };
    assert_eq!(build("{{ o | inspect }}", &a).unwrap(), "{ a: 1 }");

    let nested = args! {
        "o" => object(&[("a", object(&[("b", Value::from(1))]))])
    };
    assert_eq!(build("{{ o | inspect }}", &nested).unwrap(), "{ a: { b: 1 } }");
    assert_eq!(build("{{ o | inspect(0) }}", &nested).unwrap(), "{ a: [Object] }");

    let arr = args! { "v" => Value::Array(vec![Value::from(1), Value::from("a")]) };
    assert_eq!(build("{{ v | inspect }}", &arr).unwrap(), "[ 1, 'a' ]");
}

#[test]
fn custom_pipe_functions_can_be_registered() {
    fn wrap(value: &Value, _args: &[Primitive]) -> Result<Value, PipeError> {
        Ok(Value::String(format!("<{value}>")))
    }

    let loc = loaded("[t]\n{{ s | wrap }}");
    assert!(!loc.has_pipe_function("wrap"));
    loc.add_pipe_function("wrap", wrap);
    assert!(loc.has_pipe_function("wrap"));
    assert!(loc.get_pipe_function("wrap").is_some());

    assert_eq!(
        loc.resource("test", "t", &args! { "s" => "x" }).unwrap(),
        "<x>"
    );
}

#[test]
fn registry_is_seeded_with_builtins() {
    let registry = PipeRegistry::with_builtins();
    for ident in [
        "default",
        "toUpperCase",
        "toLowerCase",
        "capitalize",
        "repeat",
        "padStart",
        "padEnd",
        "trim",
        "trimLeft",
        "trimRight",
        "concat",
        "slice",
        "prepend",
        "split",
        "length",
        "replace",
        "replaceOnce",
        "truncate",
        "normalizeWhitespace",
        "max",
        "min",
        "add",
        "subtract",
        "multiplyBy",
        "divideBy",
        "floor",
        "ceil",
        "clamp",
        "first",
        "join",
        "unique",
        "pick",
        "select",
        "where",
        "inspect",
    ] {
        assert!(registry.has(ident), "missing builtin pipe '{ident}'");
    }
    assert!(!registry.has("nope"));
}

#[test]
fn pipe_errors_carry_the_pipe_location() {
    let err = build("{{ n | add('x') }}", &args! { "n" => 1 }).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::PipeFailed);
    let span = err.span.expect("span");
    assert_eq!(span.line, 2);
}
