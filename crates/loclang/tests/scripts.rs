//! Integration tests for script templates and the default expression
//! engine.

use std::collections::HashMap;

use loclang::{args, BuildErrorKind, Localization, Value};

fn loaded(source: &str) -> Localization {
    let loc = Localization::builder().build();
    loc.load("test", source, "scripts.lang").unwrap();
    loc
}

#[test]
fn script_yields_a_literal_expression() {
    let loc = loaded("[t]\nfoo{{! 'bar' !}}baz");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foobarbaz");
}

#[test]
fn explicit_return_yields_the_value() {
    let loc = loaded("[t]\nfoo{{! return 'bar'; !}}baz");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foobarbaz");
}

#[test]
fn script_reads_arguments_with_dollar_names() {
    let loc = loaded("[t]\nfoo{{! $bar !}}baz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => "bar" }).unwrap(),
        "foobarbaz"
    );
    // Absent arguments read as undefined, producing no value at all.
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foobaz");
}

#[test]
fn script_supports_conditionals() {
    let loc = loaded("[t]\nfoo{{! $bar ? 'bar' : 'baz' !}}baz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => true }).unwrap(),
        "foobarbaz"
    );
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => false }).unwrap(),
        "foobazbaz"
    );
}

#[test]
fn script_supports_statements_and_if() {
    let source = "[t]\nfoo{{!\nif ($bar) { return 'yes' }\nreturn 'no'\n!}}baz";
    let loc = loaded(source);
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => true }).unwrap(),
        "fooyesbaz"
    );
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => 1 }).unwrap(),
        "fooyesbaz"
    );
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foonobaz");
}

#[test]
fn script_operators_follow_value_semantics() {
    let loc = loaded("[t]\n{{! 1 + 2 * 3 !}}");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "7");

    let concat = loaded("[t]\n{{! 'n=' + (1 + 2) !}}");
    assert_eq!(concat.resource("test", "t", &args! {}).unwrap(), "n=3");

    let eq = loaded("[t]\n{{! $n == 3 ? 'three' : 'other' !}}");
    assert_eq!(
        eq.resource("test", "t", &args! { "n" => 3 }).unwrap(),
        "three"
    );
    assert_eq!(
        eq.resource("test", "t", &args! { "n" => "3" }).unwrap(),
        "other"
    );
}

#[test]
fn script_forwards_to_other_resources() {
    let loc = loaded("[inner]\nfoo{{? bar }}baz\n[outer]\nfoo{{! res.inner() !}}baz");
    assert_eq!(
        loc.resource("test", "outer", &args! {}).unwrap(),
        "foofoobazbaz"
    );
    assert_eq!(
        loc.resource("test", "outer", &args! { "bar" => "bar" }).unwrap(),
        "foofoobarbazbaz"
    );
}

#[test]
fn script_forwarding_can_override_arguments() {
    let loc = loaded("[inner]\n{{ name }}\n[outer]\n{{! res.inner($override) !}}");
    let mut other = HashMap::new();
    other.insert("name".to_string(), Value::from("x"));
    assert_eq!(
        loc.resource("test", "outer", &args! { "override" => Value::Object(other) })
            .unwrap(),
        "x"
    );
}

#[test]
fn script_returning_undefined_contributes_nothing() {
    let loc = loaded("[t]\nfoo{{! undefined !}}baz");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foobaz");
}

#[test]
fn isolated_script_collapses_its_blank_line() {
    let loc = loaded("[t]\nfoo\n{{! $bar !}}\nbaz");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foo\nbaz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => "" }).unwrap(),
        "foo\n\nbaz"
    );
}

#[test]
fn script_cycle_through_include_is_an_error() {
    let loc = loaded("[a]\nx{{! res.b() !}}\n[b]\ny{{> a }}");
    let err = loc.resource("test", "a", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::ScriptFailed);
    assert!(err.message.contains("cannot refer to any previous parent"));
}

#[test]
fn script_self_reference_is_an_error() {
    let loc = loaded("[a]\nx{{! res.a() !}}");
    let err = loc.resource("test", "a", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::ScriptFailed);
    assert!(err.message.contains("cannot refer to any previous parent"));
}

#[test]
fn script_errors_point_at_the_script() {
    let loc = loaded("[a]\nx{{! res.missing() !}}");
    // Forwarding to a key that does not exist builds the placeholder, so
    // use an include cycle to observe error attribution instead.
    assert_eq!(loc.resource("test", "a", &args! {}).unwrap(), "xtest::default::default::missing");

    let cyclic = loaded("[a]\nx{{! res.a() !}}");
    let err = cyclic.resource("test", "a", &args! {}).unwrap_err();
    let span = err.span.expect("span");
    assert_eq!(span.container, "scripts.lang");
    assert_eq!(span.line, 2);
}

#[test]
fn script_compile_errors_fail_the_load() {
    let loc = Localization::builder().build();
    let err = loc
        .load("test", "[bad]\nfoo{{! $ !}}baz", "scripts.lang")
        .unwrap_err();
    assert!(err.message.contains("Error compiling script template"));
    // Nothing from the failed file is registered.
    assert!(!loc.resource_exists("test", "bad"));
}

#[test]
fn script_compile_errors_remap_to_the_lang_line() {
    let loc = Localization::builder().build();
    let err = loc
        .load("test", "[bad]\nfoo{{!\n\n$ \n!}}baz", "scripts.lang")
        .unwrap_err();
    // The `$` sits on source line 4: script opens on line 2, error on
    // body line 3.
    assert_eq!(err.line, 4);
}

#[test]
fn scripts_in_included_resources_share_the_call_chain() {
    // outer includes mid; mid's script builds leaf; leaf includes outer,
    // which is already in the chain.
    let source = "[leaf]\nz{{> outer }}\n[mid]\ny{{! res.leaf() !}}\n[outer]\nx{{> mid }}";
    let loc = loaded(source);
    let err = loc.resource("test", "outer", &args! {}).unwrap_err();
    assert!(err.message.contains("cannot refer to any previous parent"));
}
