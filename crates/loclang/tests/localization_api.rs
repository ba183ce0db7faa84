//! Integration tests for the public registry API: languages, fallback,
//! paths, keys, and accessors.

use loclang::{args, BuildErrorKind, Localization, ResourcePath};

fn loaded(source: &str) -> Localization {
    let loc = Localization::builder().build();
    loc.load("test", source, "api.lang").unwrap();
    loc
}

#[test]
fn resource_exists_checks_the_exact_path() {
    let loc = loaded("[a]\nbody");
    assert!(loc.resource_exists("test", "a"));
    assert!(!loc.resource_exists("test", "b"));
    assert!(!loc.resource_exists("other", "a"));
}

#[test]
fn unknown_language_is_an_error() {
    let loc = loaded("[a]\nbody");
    let err = loc.resource("nope", "a", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::UnknownLanguage);
    assert!(err.message.contains("No language 'nope' has been loaded"));
}

#[test]
fn unknown_key_resolves_to_the_placeholder() {
    let loc = loaded("[a]\nbody");
    assert_eq!(
        loc.resource("test", "missing", &args! {}).unwrap(),
        "test::default::default::missing"
    );
    assert_eq!(
        loc.resource(("test", "cat", "sub"), "missing", &args! {}).unwrap(),
        "test::cat::sub::missing"
    );
}

#[test]
fn fallback_language_is_consulted_for_missing_keys() {
    let loc = loaded("[a]\nprimary");
    loc.load("fb", "[a]\nfallback a\n[b]\nfallback b", "fb.lang").unwrap();

    // Before a fallback is set, missing keys resolve to the placeholder.
    assert_eq!(
        loc.resource("test", "b", &args! {}).unwrap(),
        "test::default::default::b"
    );

    loc.set_fallback_language("fb");
    assert_eq!(loc.fallback_language().as_deref(), Some("fb"));

    // Present keys still resolve from the primary language.
    assert_eq!(loc.resource("test", "a", &args! {}).unwrap(), "primary");
    // Missing keys now resolve from the fallback.
    assert_eq!(loc.resource("test", "b", &args! {}).unwrap(), "fallback b");
    // Keys missing from both still yield the placeholder.
    assert_eq!(
        loc.resource("test", "c", &args! {}).unwrap(),
        "test::default::default::c"
    );
}

#[test]
fn fallback_is_not_consulted_by_resource_exists() {
    let loc = loaded("[a]\nprimary");
    loc.load("fb", "[b]\nfallback", "fb.lang").unwrap();
    loc.set_fallback_language("fb");
    assert!(!loc.resource_exists("test", "b"));
    assert!(loc.resource_exists("fb", "b"));
}

#[test]
fn categories_and_subcategories_address_separate_resources() {
    let source = "[one]\ndefault one\n[cat:one]\ncategory one\n[cat(sub):one]\nsubcategory one";
    let loc = loaded(source);
    assert_eq!(loc.resource("test", "one", &args! {}).unwrap(), "default one");
    assert_eq!(
        loc.resource(("test", "cat"), "one", &args! {}).unwrap(),
        "category one"
    );
    assert_eq!(
        loc.resource(("test", "cat", "sub"), "one", &args! {}).unwrap(),
        "subcategory one"
    );
}

#[test]
fn keys_returns_load_order() {
    let loc = loaded("[b]\n1\n[a]\n2\n[cat:c]\n3");
    assert_eq!(loc.keys("test"), vec!["b", "a"]);
    assert_eq!(loc.keys(("test", "cat")), vec!["c"]);
    assert_eq!(loc.keys("nope"), Vec::<String>::new());
    assert_eq!(loc.keys(("test", "nope")), Vec::<String>::new());
}

#[test]
fn reloading_a_key_replaces_it_and_keeps_its_position() {
    let loc = loaded("[a]\nfirst\n[b]\nsecond");
    loc.load("test", "[a]\nreplaced", "api2.lang").unwrap();
    assert_eq!(loc.resource("test", "a", &args! {}).unwrap(), "replaced");
    assert_eq!(loc.keys("test"), vec!["a", "b"]);
}

#[test]
fn later_loads_append_new_keys() {
    let loc = loaded("[a]\n1");
    loc.load("test", "[b]\n2", "api2.lang").unwrap();
    assert_eq!(loc.keys("test"), vec!["a", "b"]);
}

#[test]
fn load_reports_the_resource_count() {
    let loc = Localization::builder().build();
    let count = loc.load("test", "[a]\n1\n[b]\n2\n[c]\n3", "api.lang").unwrap();
    assert_eq!(count, 3);
}

#[test]
fn accessor_builds_like_resource() {
    let loc = loaded("[a]\nfoo{{ bar }}baz");
    let accessor = loc.accessor("test");
    assert_eq!(accessor.path(), &ResourcePath::new("test"));
    assert_eq!(
        accessor.get("a", &args! { "bar" => "bar" }).unwrap(),
        "foobarbaz"
    );
    assert_eq!(
        accessor.get("missing", &args! {}).unwrap(),
        "test::default::default::missing"
    );
}

#[test]
fn accessors_are_cached_per_path() {
    let loc = loaded("[a]\nbody");
    let first = loc.accessor(("test", "cat"));
    let second = loc.accessor(("test", "cat"));
    assert_eq!(first.path(), second.path());
    // Both observe resources loaded after their creation.
    loc.load("test", "[cat:late]\nlate body", "api2.lang").unwrap();
    assert_eq!(first.get("late", &args! {}).unwrap(), "late body");
    assert_eq!(second.get("late", &args! {}).unwrap(), "late body");
}

#[test]
fn clear_removes_all_loaded_resources() {
    let loc = loaded("[a]\nbody");
    let accessor = loc.accessor("test");
    loc.clear();
    assert!(!loc.resource_exists("test", "a"));
    assert_eq!(loc.keys("test"), Vec::<String>::new());

    // The language itself is gone, for accessors too.
    let err = loc.resource("test", "a", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::UnknownLanguage);
    let err = accessor.get("a", &args! {}).unwrap_err();
    assert_eq!(err.kind, BuildErrorKind::UnknownLanguage);

    // Pipes survive a clear.
    assert!(loc.has_pipe_function("toUpperCase"));
}

#[test]
fn clones_share_the_registry() {
    let loc = Localization::builder().build();
    let clone = loc.clone();
    clone.load("test", "[a]\nbody", "api.lang").unwrap();
    assert_eq!(loc.resource("test", "a", &args! {}).unwrap(), "body");
}

#[test]
fn builder_accepts_a_fallback_language() {
    let loc = Localization::builder().fallback_language("fb").build();
    loc.load("fb", "[a]\nfallback", "fb.lang").unwrap();
    loc.load("test", "[b]\nprimary", "api.lang").unwrap();
    assert_eq!(loc.resource("test", "a", &args! {}).unwrap(), "fallback");
}

#[test]
fn build_errors_render_location_and_call_site() {
    let loc = loaded("[t]\n##! bar: string\nfoo{{ bar }}baz");
    let err = loc.resource("test", "t", &args! {}).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("Expected type 'string', got undefined"));
    assert!(rendered.contains("at api.lang:2:"));
    assert!(rendered.contains("called from"));
}
