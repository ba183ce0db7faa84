//! Integration tests for `##!` argument type declarations.

use loclang::{args, BuildErrorKind, Localization, Value};

fn loaded(source: &str) -> Localization {
    let loc = Localization::builder().build();
    loc.load("test", source, "args.lang").unwrap();
    loc
}

#[test]
fn accepts_a_correctly_typed_argument() {
    let loc = loaded("[t]\n##! bar: string\nfoo{{ bar }}baz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => "bar" }).unwrap(),
        "foobarbaz"
    );
}

#[test]
fn missing_required_argument_is_an_error() {
    let loc = loaded("[t]\n##! bar: string\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::ArgumentType);
    assert!(err.message.contains("Expected type 'string', got undefined"));
}

#[test]
fn wrongly_typed_argument_is_an_error() {
    let loc = loaded("[t]\n##! bar: string\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! { "bar" => 1 }).unwrap_err();
    assert!(err.message.contains("Expected type 'string', got number"));
}

#[test]
fn validation_errors_point_at_the_declaration() {
    let loc = loaded("[t]\n##! bar: string\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! {}).unwrap_err();
    let span = err.span.expect("span");
    assert_eq!(span.container, "args.lang");
    assert_eq!(span.line, 2);
}

#[test]
fn accepts_a_correct_array_argument() {
    let loc = loaded("[t]\n##! bar: string[]\nfoo{{ bar | join('') }}baz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => vec!["b", "a", "r"] })
            .unwrap(),
        "foobarbaz"
    );
}

#[test]
fn non_array_for_array_type_is_an_error() {
    let loc = loaded("[t]\n##! bar: string[]\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! { "bar" => "bar" }).unwrap_err();
    assert!(err.message.contains("Expected array type, got string"));
}

#[test]
fn wrong_element_type_in_array_is_an_error() {
    let loc = loaded("[t]\n##! bar: string[]\nfoo{{ bar }}baz");
    let err = loc
        .resource("test", "t", &args! { "bar" => vec![1, 2, 3] })
        .unwrap_err();
    assert!(err.message.contains("Expected type 'string' in array, got number"));
}

#[test]
fn optional_argument_may_be_absent() {
    let loc = loaded("[t]\n##! bar?: string\nfoo{{? bar }}baz");
    assert_eq!(loc.resource("test", "t", &args! {}).unwrap(), "foobaz");
}

#[test]
fn present_optional_argument_is_still_validated() {
    let loc = loaded("[t]\n##! bar?: string\nfoo{{? bar }}baz");
    let err = loc.resource("test", "t", &args! { "bar" => 1 }).unwrap_err();
    assert!(err.message.contains("Expected type 'string', got number"));
}

#[test]
fn any_accepts_every_present_value() {
    let loc = loaded("[t]\n##! bar: any\nfoo{{ bar }}baz");
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => "bar" }).unwrap(),
        "foobarbaz"
    );
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => 1 }).unwrap(),
        "foo1baz"
    );
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => true }).unwrap(),
        "footruebaz"
    );
}

#[test]
fn any_still_requires_presence() {
    let loc = loaded("[t]\n##! bar: any\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! {}).unwrap_err();
    assert!(err.message.contains("Expected type 'any', got undefined"));
}

#[test]
fn any_array_accepts_mixed_elements() {
    let loc = loaded("[t]\n##! bar: any[]\nfoo{{ bar | join('') }}baz");
    let mixed = Value::Array(vec![Value::from(1), Value::from(true), Value::from("three")]);
    assert_eq!(
        loc.resource("test", "t", &args! { "bar" => mixed }).unwrap(),
        "foo1truethreebaz"
    );
}

#[test]
fn declarations_on_separate_comments_all_apply() {
    let source = "[t]\n##! foo: string\n{{ foo }}{{ bar }}\n##! bar: number";
    let loc = loaded(source);
    assert_eq!(
        loc.resource("test", "t", &args! { "foo" => "a", "bar" => 2 })
            .unwrap(),
        "a2"
    );
    let err = loc.resource("test", "t", &args! { "foo" => "a" }).unwrap_err();
    assert!(err.message.contains("Expected type 'number', got undefined"));
}

#[test]
fn boolean_declarations_validate() {
    let loc = loaded("[t]\n##! on: boolean\n{{ on }}");
    assert_eq!(
        loc.resource("test", "t", &args! { "on" => false }).unwrap(),
        "false"
    );
    let err = loc.resource("test", "t", &args! { "on" => "yes" }).unwrap_err();
    assert!(err.message.contains("Expected type 'boolean', got string"));
}
