//! Error kinds, throw/try/catch/finally, propagation

use ruse_runtime::{ErrorKind, Interp};

fn eval_to(source: &str) -> String {
    let mut interp = Interp::new().expect("bootstrap");
    let value = interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("eval of {:?} failed: {}", source, e));
    interp.pr_str_value(&value).expect("print")
}

fn eval_err(source: &str) -> ruse_runtime::Error {
    let mut interp = Interp::new().expect("bootstrap");
    match interp.eval_str(source) {
        Ok(_) => panic!("expected error from {:?}", source),
        Err(e) => e,
    }
}

#[test]
fn test_error_kinds() {
    assert_eq!(eval_err("(inc 1 2)").kind, ErrorKind::Arity);
    assert_eq!(eval_err("(inc \"x\")").kind, ErrorKind::Type);
    assert_eq!(eval_err("(/ 1 0)").kind, ErrorKind::Arithmetic);
    assert_eq!(eval_err("(nth [1 2] 9)").kind, ErrorKind::Index);
    assert_eq!(eval_err("(recur 1)").kind, ErrorKind::Analyze);
    assert_eq!(eval_err("(re-pattern \"(unclosed\")").kind, ErrorKind::Value);
    assert_eq!(eval_err("(throw :oops)").kind, ErrorKind::UserException);
}

#[test]
fn test_arity_error_message_names_the_fn() {
    let e = eval_err("((fn add3 [a b c] (+ a b c)) 1)");
    assert_eq!(e.kind, ErrorKind::Arity);
    assert!(e.message.contains("add3"), "message was: {}", e.message);
}

#[test]
fn test_throw_carries_the_value() {
    let e = eval_err("(throw {:code 7})");
    assert_eq!(e.kind, ErrorKind::UserException);
    assert!(e.thrown.is_some());
}

#[test]
fn test_catch_by_type_keyword() {
    assert_eq!(
        eval_to("(try (throw :boom) (catch :keyword e [:caught e]))"),
        "[:caught :boom]"
    );
    assert_eq!(
        eval_to("(try (throw {:type :my-error :detail 1}) (catch :my-error e (:detail e)))"),
        "1"
    );
}

#[test]
fn test_catch_default_matches_anything() {
    assert_eq!(
        eval_to("(try (throw 42) (catch :default e (inc e)))"),
        "43"
    );
}

#[test]
fn test_catch_class_symbol_matches_runtime_errors() {
    assert_eq!(
        eval_to("(try (/ 1 0) (catch Exception e (:type e)))"),
        ":arithmetic-error"
    );
    assert_eq!(
        eval_to("(try (inc \"s\") (catch Exception e (:type e)))"),
        ":type-error"
    );
}

#[test]
fn test_unmatched_catch_propagates() {
    let e = eval_err("(try (throw :a) (catch :integer e e))");
    assert_eq!(e.kind, ErrorKind::UserException);
}

#[test]
fn test_finally_runs_on_all_paths() {
    assert_eq!(
        eval_to(
            "(def log (atom [])) \
             (try (swap! log conj :body) :ok (finally (swap! log conj :fin))) \
             @log"
        ),
        "[:body :fin]"
    );
    assert_eq!(
        eval_to(
            "(def log (atom [])) \
             (try (try (throw :x) (finally (swap! log conj :inner-fin))) \
                  (catch :keyword e (swap! log conj :caught))) \
             @log"
        ),
        "[:inner-fin :caught]"
    );
}

#[test]
fn test_catch_value_is_try_result() {
    assert_eq!(eval_to("(try (throw :x) (catch :keyword e :recovered))"), ":recovered");
    assert_eq!(eval_to("(try :no-throw (catch :keyword e :recovered))"), ":no-throw");
}

#[test]
fn test_rethrow_from_catch() {
    let e = eval_err("(try (throw :a) (catch :keyword e (throw :b)))");
    assert_eq!(e.kind, ErrorKind::UserException);
    assert_eq!(
        e.thrown.map(|v| format!("{:?}", v)),
        Some(":b".to_string())
    );
}

#[test]
fn test_reader_error_aborts_only_current_form() {
    // Driver semantics: a reader error surfaces, but prior forms have
    // already evaluated.
    let mut interp = Interp::new().expect("bootstrap");
    assert!(interp.eval_str("(def survived 1) (]").is_err());
    let value = interp.eval_str("survived").expect("prior form evaluated");
    assert_eq!(interp.pr_str_value(&value).unwrap(), "1");
}

#[test]
fn test_ex_info_shape() {
    assert_eq!(
        eval_to(
            "(try (throw (ex-info \"bad\" {:id 3})) \
                  (catch :ex-info e [(ex-message e) (:id (ex-data e))]))"
        ),
        "[\"bad\" 3]"
    );
}

#[test]
fn test_case_without_match_is_value_error() {
    assert_eq!(eval_err("(case 5 1 :one 2 :two)").kind, ErrorKind::Value);
    assert_eq!(eval_to("(case 5 1 :one :fallback)"), ":fallback");
    assert_eq!(eval_to("(case 2 (1 2) :low (3 4) :high)"), ":low");
}

#[test]
fn test_interop_forms_rejected() {
    assert_eq!(eval_err("(new Object)").kind, ErrorKind::Analyze);
    assert_eq!(eval_err("(. x method)").kind, ErrorKind::Analyze);
}
