//! Lazy seqs, delays, atoms, volatiles, chunks, reduce/Reduced

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
fn test_lazy_seq_realizes_once() {
    assert_eq!(
        eval_to(
            "(def hits (atom 0)) \
             (def s (lazy-seq (swap! hits inc) (list 1 2))) \
             [(first s) (first s) (doall s) @hits]"
        ),
        "[1 1 (1 2) 1]"
    );
}

#[test]
fn test_lazy_seq_defers_work() {
    assert_eq!(
        eval_to(
            "(def hits (atom 0)) \
             (def s (map (fn [x] (swap! hits inc) x) [1 2 3])) \
             (def before @hits) \
             (first s) \
             [before @hits]"
        ),
        "[0 1]"
    );
}

#[test]
fn test_seq_first_rest_next() {
    assert_eq!(eval_to("(first [1 2 3])"), "1");
    assert_eq!(eval_to("(rest [1 2 3])"), "(2 3)");
    assert_eq!(eval_to("(rest [1])"), "()");
    assert_eq!(eval_to("(next [1])"), "nil");
    assert_eq!(eval_to("(seq [])"), "nil");
    assert_eq!(eval_to("(seq nil)"), "nil");
    assert_eq!(eval_to("(first nil)"), "nil");
}

#[test]
fn test_seq_over_maps_sets_strings() {
    assert_eq!(eval_to("(first (seq {:a 1}))"), "[:a 1]");
    assert_eq!(eval_to("(doall (seq \"ab\"))"), r"(\a \b)");
    assert_eq!(eval_to("(count (seq #{1 2 3}))"), "3");
}

#[test]
fn test_cons_cells() {
    assert_eq!(eval_to("(cons 1 [2 3])"), "(1 2 3)");
    assert_eq!(eval_to("(cons 1 nil)"), "(1)");
    assert_eq!(eval_to("(first (cons 1 (lazy-seq (list 2))))"), "1");
}

#[test]
fn test_vector_seq_is_chunked() {
    assert_eq!(eval_to("(chunked-seq? (seq (vec (range 100))))"), "true");
    assert_eq!(eval_to("(count (chunk-first (seq (vec (range 100)))))"), "32");
}

#[test]
fn test_chunk_buffer_lifecycle() {
    assert_eq!(
        eval_to(
            "(def b (chunk-buffer 4)) \
             (chunk-append b 1) \
             (chunk-append b 2) \
             (doall (chunk-cons (chunk b) nil))"
        ),
        "(1 2)"
    );
    // Second finalize is a value-error.
    assert_eq!(
        eval_err("(def b (chunk-buffer 2)) (chunk b) (chunk b)"),
        ErrorKind::Value
    );
}

#[test]
fn test_delay_memoizes_success() {
    assert_eq!(
        eval_to(
            "(def hits (atom 0)) \
             (def d (delay (swap! hits inc) :value)) \
             [(realized? d) @d @d (realized? d) @hits]"
        ),
        "[false :value :value true 1]"
    );
}

#[test]
fn test_delay_memoizes_failure() {
    assert_eq!(
        eval_to(
            "(def hits (atom 0)) \
             (def d (delay (swap! hits inc) (throw :bad))) \
             (def first-err (try @d (catch :keyword e e))) \
             (def second-err (try @d (catch :keyword e e))) \
             [first-err second-err @hits]"
        ),
        "[:bad :bad 1]"
    );
}

#[test]
fn test_force_on_non_delay_is_identity() {
    assert_eq!(eval_to("(force 5)"), "5");
    assert_eq!(eval_to("(force (delay 5))"), "5");
}

#[test]
fn test_atom_swap_and_cas() {
    assert_eq!(eval_to("(def a (atom 1)) (swap! a + 10 100) @a"), "111");
    assert_eq!(eval_to("(def a (atom 1)) (swap-vals! a inc)"), "[1 2]");
    assert_eq!(eval_to("(def a (atom 1)) (reset-vals! a 9)"), "[1 9]");
    assert_eq!(
        eval_to("(def a (atom 1)) [(compare-and-set! a 1 2) @a (compare-and-set! a 1 3) @a]"),
        "[true 2 false 2]"
    );
}

#[test]
fn test_volatile() {
    assert_eq!(
        eval_to("(def v (volatile! 0)) (vswap! v inc) (vswap! v + 10) @v"),
        "11"
    );
    assert_eq!(eval_to("(def v (volatile! 0)) (vreset! v 5) @v"), "5");
}

#[test]
fn test_reduce_short_circuits_on_reduced() {
    assert_eq!(
        eval_to(
            "(def seen (atom [])) \
             (def result (reduce (fn [acc x] (swap! seen conj x) \
                                   (if (> acc 5) (reduced :big) (+ acc x))) \
                                 0 [1 2 3 4 5 6 7 8 9])) \
             [result (count @seen)]"
        ),
        "[:big 5]"
    );
    assert_eq!(eval_to("(reduced? (reduced 1))"), "true");
    assert_eq!(eval_to("(unreduced (reduced 1))"), "1");
    assert_eq!(eval_to("(unreduced 2)"), "2");
}

#[test]
fn test_reduce_arities() {
    assert_eq!(eval_to("(reduce + [1 2 3])"), "6");
    assert_eq!(eval_to("(reduce + [])"), "0");
    assert_eq!(eval_to("(reduce + 10 [1 2])"), "13");
    assert_eq!(eval_to("(reduce-kv (fn [acc k v] (+ acc v)) 0 {:a 1 :b 2})"), "3");
}

#[test]
fn test_equality_forces_lazy_seqs() {
    assert_eq!(eval_to("(= (map inc [1 2]) [2 3])"), "true");
    assert_eq!(eval_to("(= [2 3] (map inc [1 2]))"), "true");
    assert_eq!(eval_to("(= (map inc [1 2]) (list 2 3))"), "true");
}

#[test]
fn test_loop_rebinds_in_place() {
    assert_eq!(
        eval_to("(loop [acc [] n 0] (if (< n 5) (recur (conj acc n) (inc n)) acc))"),
        "[0 1 2 3 4]"
    );
}

#[test]
fn test_recur_in_fn_tail() {
    assert_eq!(
        eval_to("(defn countdown [n] (if (pos? n) (recur (dec n)) :done)) (countdown 10000)"),
        ":done"
    );
}

#[test]
fn test_variadic_fn_and_recur() {
    assert_eq!(
        eval_to("(defn sum [acc & xs] (if (seq xs) (recur (+ acc (first xs)) (next xs)) acc)) (sum 0 1 2 3)"),
        "6"
    );
    assert_eq!(eval_to("((fn [a & bs] [a bs]) 1)"), "[1 nil]");
    assert_eq!(eval_to("((fn [a & bs] [a (doall bs)]) 1 2 3)"), "[1 (2 3)]");
}

#[test]
fn test_multi_arity_fn() {
    assert_eq!(
        eval_to(
            "(defn greet ([] :none) ([x] [:one x]) ([x & more] :many)) \
             [(greet) (greet 1) (greet 1 2 3)]"
        ),
        "[:none [:one 1] :many]"
    );
}
