//! Macros: defmacro, syntax-quote, gensyms, macroexpand

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
fn test_defmacro_and_expansion() {
    assert_eq!(
        eval_to(
            "(defmacro unless [test then] `(if ~test nil ~then)) \
             (unless false :ran)"
        ),
        ":ran"
    );
}

#[test]
fn test_macro_defined_then_used_next_form() {
    // Each top-level form evaluates before the next is analyzed, so the
    // macro flag is visible immediately.
    assert_eq!(
        eval_to("(defmacro twice [form] `(do ~form ~form)) (def a (atom 0)) (twice (swap! a inc)) @a"),
        "2"
    );
}

#[test]
fn test_syntax_quote_qualifies_resolvable_symbols() {
    assert_eq!(eval_to("`inc"), "clojure.core/inc");
    assert_eq!(eval_to("`undefined-thing"), "user/undefined-thing");
    assert_eq!(eval_to("`if"), "if");
}

#[test]
fn test_syntax_quote_collections() {
    assert_eq!(eval_to("`[1 ~(+ 1 1)]"), "[1 2]");
    assert_eq!(eval_to("`#{~(+ 1 2)}"), "#{3}");
    assert_eq!(eval_to("`{:k ~(* 2 2)}"), "{:k 4}");
    assert_eq!(eval_to("`(1 ~@[2 3] 4)"), "(1 2 3 4)");
}

#[test]
fn test_unquote_splicing_outside_collection_is_value_error() {
    assert_eq!(eval_err("`~@[1 2]"), ErrorKind::Value);
}

#[test]
fn test_unquote_outside_syntax_quote_is_rejected() {
    assert_eq!(eval_err("~x"), ErrorKind::Analyze);
}

#[test]
fn test_gensym_suffix_is_stable_within_form() {
    // Both x# occurrences expand to the same generated symbol, so the
    // let body resolves.
    assert_eq!(
        eval_to(
            "(defmacro stash [v] `(let [x# ~v] [x# x#])) \
             (stash 5)"
        ),
        "[5 5]"
    );
}

#[test]
fn test_gensym_suffix_differs_across_forms() {
    assert_eq!(eval_to("(= (str (first `(x#))) (str (first `(x#))))"), "false");
}

#[test]
fn test_gensym_builtin_is_monotonic() {
    assert_eq!(eval_to("(= (gensym) (gensym))"), "false");
    assert_eq!(eval_to("(not= (str (gensym \"p\")) (str (gensym \"p\")))"), "true");
}

#[test]
fn test_macroexpand_1_single_step() {
    assert_eq!(
        eval_to("(macroexpand-1 '(when true 1))"),
        "(if true (do 1) nil)"
    );
    // Not a macro call: unchanged.
    assert_eq!(eval_to("(macroexpand-1 '(inc 1))"), "(inc 1)");
    assert_eq!(eval_to("(macroexpand-1 :kw)"), ":kw");
}

#[test]
fn test_macroexpand_reaches_fixed_point() {
    assert_eq!(
        eval_to("(macroexpand '(-> 1 inc inc))"),
        "(inc (inc 1))"
    );
}

#[test]
fn test_runaway_macro_is_value_error() {
    // Each expansion step grows the form, so no fixed point exists
    // within the iteration bound.
    assert_eq!(
        eval_err(
            "(defmacro grow [x] `(grow (inc ~x))) (macroexpand '(grow 1))"
        ),
        ErrorKind::Value
    );
}

#[test]
fn test_self_reproducing_expansion_is_a_fixed_point() {
    assert_eq!(
        eval_to("(defmacro same [x] `(same ~x)) (str (macroexpand '(same 1)))"),
        "\"(user/same 1)\""
    );
}

#[test]
fn test_nested_quote_in_syntax_quote() {
    assert_eq!(eval_to("`'x"), "(quote user/x)");
}

#[test]
fn test_anon_fn_inside_macro() {
    assert_eq!(
        eval_to(
            "(defmacro call-with-five [f] `(~f 5)) (call-with-five #(+ % 1))"
        ),
        "6"
    );
}

#[test]
fn test_prelude_binding_macro() {
    assert_eq!(
        eval_to(
            "(def ^:dynamic *depth* 0) \
             [(binding [*depth* 5] *depth*) *depth*]"
        ),
        "[5 0]"
    );
}

#[test]
fn test_binding_restores_on_throw() {
    assert_eq!(
        eval_to(
            "(def ^:dynamic *mode* :root) \
             (try (binding [*mode* :inner] (throw :boom)) (catch :keyword e nil)) \
             *mode*"
        ),
        ":root"
    );
}
