//! Namespace and var semantics: resolution, refers, aliases, dynamic
//! bindings

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
fn test_user_is_default_and_refers_core() {
    assert_eq!(eval_to("*ns*"), "user");
    // inc is referred from clojure.core, not interned in user.
    assert_eq!(eval_to("(contains? (ns-interns 'user) 'inc)"), "false");
    assert_eq!(eval_to("(contains? (ns-refers 'user) 'inc)"), "true");
}

#[test]
fn test_def_interns_in_current_ns() {
    assert_eq!(eval_to("(def x 1) (contains? (ns-interns 'user) 'x)"), "true");
}

#[test]
fn test_in_ns_switches_and_refers_core() {
    assert_eq!(
        eval_to("(in-ns 'scratch) (def y 9) (+ y 1)"),
        "10"
    );
    assert_eq!(eval_to("(in-ns 'other) *ns*"), "other");
}

#[test]
fn test_qualified_resolution_across_namespaces() {
    assert_eq!(
        eval_to("(in-ns 'a.b) (def shared 7) (in-ns 'user) a.b/shared"),
        "7"
    );
}

#[test]
fn test_unknown_namespace_is_namespace_not_found() {
    assert_eq!(eval_err("no.such.ns/thing"), ErrorKind::NamespaceNotFound);
}

#[test]
fn test_unresolved_symbol_is_analyze_error() {
    assert_eq!(eval_err("completely-unknown"), ErrorKind::Analyze);
}

#[test]
fn test_alias_resolution() {
    assert_eq!(
        eval_to("(alias 's 'clojure.string) (s/upper-case \"x\")"),
        "\"X\""
    );
    assert_eq!(
        eval_to("(alias 's 'clojure.string) (get (ns-aliases 'user) 's)"),
        "clojure.string"
    );
}

#[test]
fn test_require_refer() {
    assert_eq!(
        eval_to("(require '[clojure.string :refer [trim]]) (trim \"  x  \")"),
        "\"x\""
    );
    assert_eq!(
        eval_to("(require '[clojure.math :refer :all]) (floor 1.5)"),
        "1.0"
    );
}

#[test]
fn test_ns_macro() {
    assert_eq!(
        eval_to("(ns my.app (:require [clojure.string :as str])) (str/join \"-\" [1 2])"),
        "\"1-2\""
    );
}

#[test]
fn test_var_metadata() {
    assert_eq!(
        eval_to("(def answered \"the answer\" 42) (:doc (meta #'answered))"),
        "\"the answer\""
    );
    assert_eq!(eval_to("(def v 1) (:name (meta #'v))"), "v");
    assert_eq!(eval_to("(def v 1) (:ns (meta #'v))"), "user");
    assert_eq!(
        eval_to("(def ^:dynamic *d* 1) (:dynamic (meta #'*d*))"),
        "true"
    );
}

#[test]
fn test_dynamic_binding_stack() {
    assert_eq!(
        eval_to(
            "(def ^:dynamic *level* 0) \
             (binding [*level* 1] \
               (binding [*level* 2] *level*))"
        ),
        "2"
    );
    assert_eq!(
        eval_to(
            "(def ^:dynamic *level* 0) \
             [(binding [*level* 1] (binding [*level* 2] nil) *level*) *level*]"
        ),
        "[1 0]"
    );
}

#[test]
fn test_push_bindings_rejects_non_dynamic() {
    assert_eq!(
        eval_err("(def plain 1) (push-thread-bindings {#'plain 2})"),
        ErrorKind::Value
    );
}

#[test]
fn test_thread_bound_p() {
    assert_eq!(
        eval_to(
            "(def ^:dynamic *a* 1) \
             [(thread-bound? #'*a*) (binding [*a* 2] (thread-bound? #'*a*))]"
        ),
        "[false true]"
    );
}

#[test]
fn test_set_bang_on_thread_bound_var() {
    assert_eq!(
        eval_to(
            "(def ^:dynamic *x* 1) \
             [(binding [*x* 2] (set! *x* 3) *x*) *x*]"
        ),
        "[3 1]"
    );
    assert_eq!(
        eval_err("(def ^:dynamic *x* 1) (set! *x* 9)"),
        ErrorKind::Value
    );
}

#[test]
fn test_alter_var_root() {
    assert_eq!(eval_to("(def counter 10) (alter-var-root #'counter + 5) counter"), "15");
}

#[test]
fn test_unbound_var_deref_fails() {
    assert_eq!(eval_err("(def declared-only) declared-only"), ErrorKind::Value);
}

#[test]
fn test_declare_forward_reference() {
    assert_eq!(
        eval_to(
            "(declare pong) \
             (defn ping [n] (if (zero? n) :done (pong (dec n)))) \
             (defn pong [n] (ping n)) \
             (ping 4)"
        ),
        ":done"
    );
}

#[test]
fn test_intern_and_resolve() {
    assert_eq!(eval_to("(intern 'user 'made 3) made"), "3");
    assert_eq!(eval_to("(var-get (resolve 'inc))"), "#<builtin inc>");
    assert_eq!(eval_to("(resolve 'nope)"), "nil");
}

#[test]
fn test_refer_conflict_with_local_intern() {
    // A locally interned var blocks a refer of the same name.
    assert_eq!(
        eval_err(
            "(in-ns 'taken) (def trim 1) (require '[clojure.string :refer [trim]])"
        ),
        ErrorKind::Value
    );
}
