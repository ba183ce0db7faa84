//! Integration tests for file and directory loading.

use std::fs;

use loclang::{args, LoadError, Localization};

#[test]
fn loads_a_single_lang_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("strings.lang");
    fs::write(&file, "[greeting]\nhello").unwrap();

    let loc = Localization::builder().build();
    let count = loc.load_file("en", &file).unwrap();
    assert_eq!(count, 1);
    assert_eq!(loc.resource("en", "greeting", &args! {}).unwrap(), "hello");
}

#[test]
fn missing_file_is_an_io_error() {
    let loc = Localization::builder().build();
    let err = loc.load_file("en", "/definitely/not/here.lang").unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn parse_failures_register_nothing_from_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.lang");
    fs::write(&file, "[ok]\nbody\n[broken]\nfoo{{>}}").unwrap();

    let loc = Localization::builder().build();
    let err = loc.load_file("en", &file).unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
    assert!(!loc.resource_exists("en", "ok"));
}

#[test]
fn loads_a_directory_recursively() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.lang"), "[a]\nfrom a").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a lang file").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.lang"), "[b]\nfrom b\n[cat:c]\nfrom c").unwrap();

    let loc = Localization::builder().build();
    let count = loc.load_directory("en", dir.path()).unwrap();
    assert_eq!(count, 3);
    assert_eq!(loc.resource("en", "a", &args! {}).unwrap(), "from a");
    assert_eq!(loc.resource("en", "b", &args! {}).unwrap(), "from b");
    assert_eq!(loc.resource(("en", "cat"), "c", &args! {}).unwrap(), "from c");
}

#[test]
fn file_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("named.lang");
    fs::write(&file, "[a]\n[b]\nbody").unwrap();

    let loc = Localization::builder().build();
    let err = loc.load_file("en", &file).unwrap_err();
    let LoadError::Parse(parse) = err else {
        panic!("expected a parse error");
    };
    assert!(parse.container.ends_with("named.lang"));
}
