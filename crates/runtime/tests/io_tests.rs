//! File I/O builtins: slurp, spit, load-file
//!
//! Driven through the language against a tempfile-backed directory so
//! nothing leaks into the working tree.

use ruse_runtime::{ErrorKind, Interp};

fn eval_in(interp: &mut Interp, source: &str) -> String {
    let value = interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("eval of {:?} failed: {}", source, e));
    interp.pr_str_value(&value).expect("print")
}

fn eval_err_in(interp: &mut Interp, source: &str) -> ErrorKind {
    match interp.eval_str(source) {
        Ok(_) => panic!("expected error from {:?}", source),
        Err(e) => e.kind,
    }
}

#[test]
fn test_spit_slurp_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("note.txt");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    eval_in(&mut interp, &format!("(spit \"{}\" \"line one\\nline two\")", path));
    assert_eq!(
        eval_in(&mut interp, &format!("(slurp \"{}\")", path)),
        "\"line one\\nline two\""
    );
}

#[test]
fn test_spit_overwrites_by_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("note.txt");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    eval_in(&mut interp, &format!("(spit \"{}\" \"first\")", path));
    eval_in(&mut interp, &format!("(spit \"{}\" \"second\")", path));
    assert_eq!(
        eval_in(&mut interp, &format!("(slurp \"{}\")", path)),
        "\"second\""
    );
}

#[test]
fn test_spit_append_option() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("log.txt");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    eval_in(&mut interp, &format!("(spit \"{}\" \"a\")", path));
    eval_in(&mut interp, &format!("(spit \"{}\" \"b\" :append true)", path));
    eval_in(&mut interp, &format!("(spit \"{}\" \"c\" :append true)", path));
    assert_eq!(
        eval_in(&mut interp, &format!("(slurp \"{}\")", path)),
        "\"abc\""
    );
}

#[test]
fn test_spit_prints_non_strings_in_display_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("value.txt");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    eval_in(&mut interp, &format!("(spit \"{}\" [1 :two \"three\"])", path));
    // Display mode: strings raw, keywords with their colon.
    assert_eq!(
        eval_in(&mut interp, &format!("(slurp \"{}\")", path)),
        "\"[1 :two three]\""
    );
}

#[test]
fn test_slurp_missing_file_is_value_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.txt");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    assert_eq!(
        eval_err_in(&mut interp, &format!("(slurp \"{}\")", path)),
        ErrorKind::Value
    );
}

#[test]
fn test_load_file_evaluates_forms() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lib.clj");
    std::fs::write(&path, "(def loaded-answer 41)\n(inc loaded-answer)\n")
        .expect("write source file");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    // Returns the last form's value, and its defs stay interned.
    assert_eq!(
        eval_in(&mut interp, &format!("(load-file \"{}\")", path)),
        "42"
    );
    assert_eq!(eval_in(&mut interp, "loaded-answer"), "41");
}

#[test]
fn test_load_file_missing_is_value_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.clj");
    let path = path.to_str().expect("utf8 temp path");
    let mut interp = Interp::new().expect("bootstrap");
    assert_eq!(
        eval_err_in(&mut interp, &format!("(load-file \"{}\")", path)),
        ErrorKind::Value
    );
}
