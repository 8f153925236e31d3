//! End-to-end scenarios: source string in, pr-str of the final value out

use ruse_runtime::Interp;

fn eval_to(source: &str) -> String {
    let mut interp = Interp::new().expect("bootstrap");
    let value = interp
        .eval_str(source)
        .unwrap_or_else(|e| panic!("eval of {:?} failed: {}", source, e));
    interp.pr_str_value(&value).expect("print")
}

#[test]
fn test_variadic_addition() {
    assert_eq!(eval_to("(+ 1 2 3)"), "6");
}

#[test]
fn test_let_with_dependent_bindings() {
    assert_eq!(eval_to("(let [x 10 y (* x 2)] (+ x y))"), "30");
}

#[test]
fn test_recursive_fn_through_var() {
    assert_eq!(
        eval_to(
            "(def f (fn [n] (if (< n 2) n (+ (f (- n 1)) (f (- n 2)))))) (f 10)"
        ),
        "55"
    );
}

#[test]
fn test_atom_with_dotimes() {
    assert_eq!(
        eval_to("(let [a (atom 0)] (dotimes [_ 5] (swap! a inc)) @a)"),
        "5"
    );
}

#[test]
fn test_regex_group_capture() {
    assert_eq!(
        eval_to(r#"(re-find #"(\d+)-(\d+)" "x12-34y")"#),
        r#"["12-34" "12" "34"]"#
    );
}

#[test]
fn test_multimethod_dispatch_on_keyword() {
    assert_eq!(
        eval_to(
            "(defmulti area :shape) \
             (defmethod area :circle [s] (* 3.14 (:r s) (:r s))) \
             (area {:shape :circle :r 2})"
        ),
        "12.56"
    );
}

#[test]
fn test_transient_build() {
    assert_eq!(
        eval_to("(persistent! (reduce conj! (transient []) [1 2 3]))"),
        "[1 2 3]"
    );
}

#[test]
fn test_syntax_quote_in_user_ns() {
    assert_eq!(eval_to("`(a ~(+ 1 2) ~@[3 4])"), "(user/a 3 3 4)");
}

#[test]
fn test_fibonacci_loop_recur() {
    assert_eq!(
        eval_to(
            "(loop [a 0 b 1 n 10] (if (zero? n) a (recur b (+ a b) (dec n))))"
        ),
        "55"
    );
}

#[test]
fn test_anonymous_fn_sugar() {
    assert_eq!(eval_to("(#(* % %) 7)"), "49");
    assert_eq!(eval_to("(#(+ %1 %2) 3 4)"), "7");
    assert_eq!(eval_to("(apply #(apply + %&) [1 2 3])"), "6");
}

#[test]
fn test_keyword_and_collection_invocation() {
    assert_eq!(eval_to("(:a {:a 1})"), "1");
    assert_eq!(eval_to("(:missing {:a 1} :fallback)"), ":fallback");
    assert_eq!(eval_to("({:a 1} :a)"), "1");
    assert_eq!(eval_to("([10 20 30] 1)"), "20");
    assert_eq!(eval_to("(#{:x :y} :x)"), ":x");
}

#[test]
fn test_higher_order_prelude_fns() {
    assert_eq!(eval_to("(mapv inc [1 2 3])"), "[2 3 4]");
    assert_eq!(eval_to("(doall (map + [1 2] [10 20]))"), "(11 22)");
    assert_eq!(eval_to("(doall (filter even? (range 10)))"), "(0 2 4 6 8)");
    assert_eq!(eval_to("(doall (take 3 (iterate inc 5)))"), "(5 6 7)");
    assert_eq!(eval_to("(reduce + 0 (range 101))"), "5050");
}

#[test]
fn test_infinite_seq_is_lazy() {
    assert_eq!(eval_to("(doall (take 5 (range)))"), "(0 1 2 3 4)");
    assert_eq!(eval_to("(doall (take 3 (repeat :x)))"), "(:x :x :x)");
}

#[test]
fn test_closure_captures_definition_frame() {
    assert_eq!(
        eval_to("(def adder (let [n 2] (fn [x] (+ x n)))) (adder 40)"),
        "42"
    );
    assert_eq!(
        eval_to(
            "(defn counter [] (let [state (atom 0)] (fn [] (swap! state inc)))) \
             (def c1 (counter)) (def c2 (counter)) \
             [(c1) (c1) (c2)]"
        ),
        "[1 2 1]"
    );
}

#[test]
fn test_threading_macros() {
    assert_eq!(eval_to("(-> 5 inc (* 2))"), "12");
    assert_eq!(eval_to("(->> (range 5) (map inc) (reduce +))"), "15");
}

#[test]
fn test_cond_and_boolean_macros() {
    assert_eq!(eval_to("(cond false 1 nil 2 :else 3)"), "3");
    assert_eq!(eval_to("(and 1 2 3)"), "3");
    assert_eq!(eval_to("(and 1 nil 3)"), "nil");
    assert_eq!(eval_to("(or nil false 7)"), "7");
    assert_eq!(eval_to("(or nil false)"), "false");
}

#[test]
fn test_string_and_math_namespaces() {
    assert_eq!(
        eval_to("(clojure.string/upper-case \"abc\")"),
        "\"ABC\""
    );
    assert_eq!(
        eval_to(
            "(require '[clojure.string :as str]) (str/join \", \" [1 2 3])"
        ),
        "\"1, 2, 3\""
    );
    assert_eq!(eval_to("(clojure.math/floor 2.9)"), "2.0");
    assert_eq!(eval_to("(clojure.math/pow 2 10)"), "1024.0");
}

#[test]
fn test_left_to_right_side_effect_order() {
    assert_eq!(
        eval_to(
            "(def log (atom [])) \
             (defn note [x] (swap! log conj x) x) \
             (+ (note 1) (note 2) (note 3)) \
             @log"
        ),
        "[1 2 3]"
    );
}

#[test]
fn test_str_concatenation_modes() {
    assert_eq!(eval_to("(str \"a\" nil 1 \\b :kw)"), "\"a1b:kw\"");
    assert_eq!(eval_to("(pr-str \"a\")"), "\"\\\"a\\\"\"");
    assert_eq!(eval_to("(str 6.0)"), "\"6.0\"");
}
