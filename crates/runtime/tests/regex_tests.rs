//! Regex surface through the language

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
        Ok(_) => panic!("expected error from {:?}", source),
        Err(e) => e.kind,
    }
}

#[test]
fn test_regex_literal_prints_readably() {
    assert_eq!(eval_to(r#"#"\d+""#), r#"#"\d+""#);
}

#[test]
fn test_re_find_without_groups_returns_string() {
    assert_eq!(eval_to(r#"(re-find #"\d+" "abc123def")"#), "\"123\"");
    assert_eq!(eval_to(r#"(re-find #"\d+" "no digits")"#), "nil");
}

#[test]
fn test_re_find_with_groups_returns_vector() {
    assert_eq!(
        eval_to(r#"(re-find #"(a+)(b+)" "xaabby")"#),
        r#"["aabb" "aa" "bb"]"#
    );
    assert_eq!(
        eval_to(r#"(re-find #"(a)|(b)" "b")"#),
        r#"["b" nil "b"]"#
    );
}

#[test]
fn test_re_matches_is_anchored() {
    assert_eq!(eval_to(r#"(re-matches #"\d+" "123")"#), "\"123\"");
    assert_eq!(eval_to(r#"(re-matches #"\d+" "123x")"#), "nil");
}

#[test]
fn test_re_seq() {
    assert_eq!(
        eval_to(r#"(re-seq #"[a-z]\d" "a1 b2 c3")"#),
        "(\"a1\" \"b2\" \"c3\")"
    );
    assert_eq!(eval_to(r#"(re-seq #"z" "abc")"#), "nil");
}

#[test]
fn test_matcher_stateful_iteration() {
    assert_eq!(
        eval_to(
            r#"(def m (re-matcher #"\d+" "1 22 333"))
               [(re-find m) (re-find m) (re-find m) (re-find m)]"#
        ),
        r#"["1" "22" "333" nil]"#
    );
}

#[test]
fn test_re_groups_after_matcher_find() {
    assert_eq!(
        eval_to(
            r#"(def m (re-matcher #"(\d)(\d)" "ab12"))
               (re-find m)
               (re-groups m)"#
        ),
        r#"["12" "1" "2"]"#
    );
}

#[test]
fn test_single_shot_does_not_advance() {
    assert_eq!(
        eval_to(r#"(def p #"\d+") [(re-find p "a1") (re-find p "a1")]"#),
        r#"["1" "1"]"#
    );
}

#[test]
fn test_re_pattern_from_string() {
    assert_eq!(eval_to(r#"(re-find (re-pattern "a+") "caat")"#), "\"aa\"");
    assert_eq!(eval_err(r#"(re-pattern "(oops")"#), ErrorKind::Value);
}

#[test]
fn test_character_classes_and_anchors() {
    assert_eq!(eval_to(r#"(re-matches #"^\w+$" "word")"#), "\"word\"");
    assert_eq!(eval_to(r#"(re-find #"[^aeiou]+" "aeioux")"#), "\"x\"");
    assert_eq!(eval_to(r#"(re-find #"a{2,3}" "aaaa")"#), "\"aaa\"");
    assert_eq!(eval_to(r#"(re-find #"a+?" "aaa")"#), "\"a\"");
    assert_eq!(eval_to(r#"(re-find #"(?:ab)+" "ababx")"#), "\"abab\"");
}

#[test]
fn test_string_split_with_regex() {
    assert_eq!(
        eval_to(r#"(clojure.string/split "a1b22c" #"\d+")"#),
        r#"["a" "b" "c"]"#
    );
    assert_eq!(
        eval_to(r#"(clojure.string/replace "a1b2" #"\d" "_")"#),
        "\"a_b_\""
    );
}
