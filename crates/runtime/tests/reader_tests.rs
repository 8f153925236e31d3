//! Reader behavior: literals, reader macros, errors, and the pr-str
//! round-trip property

use ruse_runtime::{ErrorKind, Interp};

fn eval_to(source: &str) -> String {
    let mut interp = Interp::new().expect("bootstrap");
    let value = interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("eval of {:?} failed: {}", source, e));
    interp.pr_str_value(&value).expect("print")
}

fn eval_err(source: &str) -> ErrorKind {
    let mut interp = Interp::new().expect("bootstrap");
    match interp.eval_str(source) {
        Ok(v) => panic!(
            "expected error from {:?}, got {}",
            source,
            interp.pr_str_value(&v).unwrap_or_default()
        ),
        Err(e) => e.kind,
    }
}

#[test]
fn test_numeric_literals() {
    assert_eq!(eval_to("42"), "42");
    assert_eq!(eval_to("-17"), "-17");
    assert_eq!(eval_to("+8"), "8");
    assert_eq!(eval_to("0x1F"), "31");
    assert_eq!(eval_to("017"), "15");
    assert_eq!(eval_to("2.5"), "2.5");
    assert_eq!(eval_to("1e3"), "1000.0");
    assert_eq!(eval_to("-0x10"), "-16");
}

#[test]
fn test_integer_overflow_is_read_error() {
    assert_eq!(eval_err("99999999999999999999999"), ErrorKind::Read);
}

#[test]
fn test_string_escapes() {
    assert_eq!(eval_to(r#""a\nb""#), "\"a\\nb\"");
    assert_eq!(eval_to(r#""tab\there""#), "\"tab\\there\"");
    assert_eq!(eval_to(r#""A""#), "\"A\"");
}

#[test]
fn test_char_literals() {
    assert_eq!(eval_to(r"\a"), r"\a");
    assert_eq!(eval_to(r"\newline"), r"\newline");
    assert_eq!(eval_to(r"\space"), r"\space");
    assert_eq!(eval_to(r"\A"), r"\A");
}

#[test]
fn test_comments_and_commas_are_whitespace() {
    assert_eq!(eval_to("[1, 2, 3] ; trailing comment"), "[1 2 3]");
    assert_eq!(eval_to("; leading\n7"), "7");
}

#[test]
fn test_collection_literals() {
    assert_eq!(eval_to("'(1 2 3)"), "(1 2 3)");
    assert_eq!(eval_to("[1 [2] 3]"), "[1 [2] 3]");
    assert_eq!(eval_to("{:a 1}"), "{:a 1}");
    assert_eq!(eval_to("#{1}"), "#{1}");
}

#[test]
fn test_odd_map_literal_is_read_error() {
    assert_eq!(eval_err("{:a 1 :b}"), ErrorKind::Read);
}

#[test]
fn test_duplicate_set_literal_is_read_error() {
    assert_eq!(eval_err("#{1 2 1}"), ErrorKind::Read);
}

#[test]
fn test_quote_and_var_quote() {
    assert_eq!(eval_to("'x"), "x");
    assert_eq!(eval_to("'ns/x"), "ns/x");
    assert_eq!(eval_to("#'inc"), "#'clojure.core/inc");
}

#[test]
fn test_discard_macro() {
    assert_eq!(eval_to("[1 #_2 3]"), "[1 3]");
    assert_eq!(eval_to("[#_ #_ 1 2 3]"), "[3]");
}

#[test]
fn test_metadata_shorthands() {
    assert_eq!(eval_to("(meta (with-meta [1] {:doc \"d\"}))"), "{:doc \"d\"}");
    assert_eq!(eval_to("(meta '^:flag sym)"), "{:flag true}");
    assert_eq!(eval_to("(:tag (meta '^String s))"), "String");
}

#[test]
fn test_auto_namespaced_keywords() {
    assert_eq!(eval_to("::kw"), ":user/kw");
    assert_eq!(
        eval_to("(require '[clojure.string :as str]) ::str/trim"),
        ":clojure.string/trim"
    );
}

#[test]
fn test_deref_reader_macro() {
    assert_eq!(eval_to("@(atom 41)"), "41");
}

#[test]
fn test_unmatched_delimiter_is_read_error() {
    assert_eq!(eval_err(")"), ErrorKind::Read);
    assert_eq!(eval_err("(+ 1"), ErrorKind::Read);
    assert_eq!(eval_err("\"open"), ErrorKind::Read);
}

#[test]
fn test_tagged_literal_without_reader_errors() {
    assert_eq!(eval_err("#inst \"2024-01-01\""), ErrorKind::Read);
}

#[test]
fn test_tagged_literal_with_data_reader() {
    let src = "(binding [*data-readers* {'inst identity}] (eval (read-string \"#inst \\\"2024-01-01\\\"\")))";
    assert_eq!(eval_to(src), "\"2024-01-01\"");
}

/// Spec property: pr-str output re-reads to an equal value for printable
/// data.
#[test]
fn test_pr_str_round_trip() {
    let corpus = [
        "nil",
        "true",
        "42",
        "-3.5",
        "\\a",
        "\"str with \\\" quote\"",
        ":kw",
        ":ns/kw",
        "'sym",
        "'(1 2 (3 4))",
        "[1 [2 [3]] \"s\"]",
        "{:a 1 :b {:c [2]}}",
        "#{1 2 3}",
        "'(nil true false)",
    ];
    for source in corpus {
        let mut interp = Interp::new().expect("bootstrap");
        let value = interp.eval_str(source).expect("eval");
        let printed = interp.pr_str_value(&value).expect("print");
        let reread = interp
            .eval_str(&format!("(quote {})", printed))
            .unwrap_or_else(|e| panic!("re-read of {} failed: {}", printed, e));
        assert!(
            interp.equiv(&value, &reread).unwrap(),
            "round trip failed for {} -> {}",
            source,
            printed
        );
    }
}
