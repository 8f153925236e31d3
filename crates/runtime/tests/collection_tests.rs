//! Collection semantics through the language: persistence, equality,
//! hashing, transient lifecycle

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
fn test_persistent_vector_non_mutation() {
    assert_eq!(
        eval_to(
            "(def v [1 2 3]) \
             (def w (conj v 4)) \
             [v w (count v) (count w)]"
        ),
        "[[1 2 3] [1 2 3 4] 3 4]"
    );
}

#[test]
fn test_persistent_map_non_mutation() {
    assert_eq!(
        eval_to(
            "(def m {:a 1}) \
             (def m2 (assoc m :b 2)) \
             (def m3 (dissoc m2 :a)) \
             [m m2 m3]"
        ),
        "[{:a 1} {:a 1, :b 2} {:b 2}]"
    );
}

#[test]
fn test_vector_ops() {
    assert_eq!(eval_to("(nth [10 20 30] 1)"), "20");
    assert_eq!(eval_to("(assoc [1 2 3] 0 :x)"), "[:x 2 3]");
    assert_eq!(eval_to("(pop [1 2 3])"), "[1 2]");
    assert_eq!(eval_to("(peek [1 2 3])"), "3");
    assert_eq!(eval_to("(subvec [0 1 2 3 4] 1 3)"), "[1 2]");
    assert_eq!(eval_err("(nth [1] 5)"), ErrorKind::Index);
    assert_eq!(eval_to("(nth [1] 5 :missing)"), ":missing");
}

#[test]
fn test_large_vector_trie() {
    assert_eq!(
        eval_to("(def big (vec (range 2000))) [(count big) (nth big 1999) (nth big 1024)]"),
        "[2000 1999 1024]"
    );
}

#[test]
fn test_map_array_to_hamt_transition() {
    // More than eight entries forces the HAMT representation; lookups
    // and counts must be unaffected.
    assert_eq!(
        eval_to(
            "(def m (zipmap (range 100) (range 100 200))) \
             [(count m) (get m 0) (get m 99) (get m 100)]"
        ),
        "[100 100 199 nil]"
    );
}

#[test]
fn test_small_map_preserves_insertion_order() {
    assert_eq!(eval_to("{:z 1 :a 2 :m 3}"), "{:z 1, :a 2, :m 3}");
}

#[test]
fn test_map_and_set_equality_ignores_order() {
    assert_eq!(eval_to("(= {:a 1 :b 2} {:b 2 :a 1})"), "true");
    assert_eq!(eval_to("(= #{1 2 3} #{3 2 1})"), "true");
    assert_eq!(eval_to("(= (hash {:a 1 :b 2}) (hash {:b 2 :a 1}))"), "true");
}

#[test]
fn test_sequential_cross_type_equality() {
    assert_eq!(eval_to("(= [1 2] '(1 2))"), "true");
    assert_eq!(eval_to("(= [1 2] '(1 2 3))"), "false");
    assert_eq!(eval_to("(= (hash [1 2]) (hash '(1 2)))"), "true");
}

#[test]
fn test_numeric_cross_type_equality() {
    assert_eq!(eval_to("(= 1 1.0)"), "true");
    assert_eq!(eval_to("(== 1 1.0)"), "true");
    assert_eq!(eval_to("(= {1 :a} {1.0 :a})"), "true");
}

#[test]
fn test_equal_values_share_hash() {
    assert_eq!(eval_to("(= (hash 1) (hash 1.0))"), "true");
    assert_eq!(eval_to("(= (hash [1 2 3]) (hash (doall (map inc [0 1 2]))))"), "true");
}

#[test]
fn test_set_membership() {
    assert_eq!(eval_to("(contains? #{:a :b} :a)"), "true");
    assert_eq!(eval_to("(disj #{:a :b} :a)"), "#{:b}");
    assert_eq!(eval_to("(conj #{:a} :b :b)"), "#{:a :b}");
}

#[test]
fn test_transient_vector_lifecycle() {
    assert_eq!(
        eval_to(
            "(def t (transient [1 2])) \
             (conj! t 3) \
             (assoc! t 0 :x) \
             (persistent! t)"
        ),
        "[:x 2 3]"
    );
}

#[test]
fn test_transient_map_and_set() {
    assert_eq!(
        eval_to(
            "(persistent! (-> (transient {}) (assoc! :a 1) (assoc! :b 2) (dissoc! :a)))"
        ),
        "{:b 2}"
    );
    assert_eq!(
        eval_to("(persistent! (-> (transient #{}) (conj! 1) (conj! 2) (disj! 1)))"),
        "#{2}"
    );
}

#[test]
fn test_transient_consumed_after_persistent() {
    assert_eq!(
        eval_err("(def t (transient [])) (persistent! t) (conj! t 1)"),
        ErrorKind::Value
    );
    assert_eq!(
        eval_err("(def t (transient {})) (persistent! t) (persistent! t)"),
        ErrorKind::Value
    );
}

#[test]
fn test_transient_source_unaffected() {
    assert_eq!(
        eval_to(
            "(def v (vec (range 50))) \
             (def w (persistent! (reduce (fn [t i] (assoc! t i 0)) (transient v) (range 50)))) \
             [(nth v 10) (nth w 10)]"
        ),
        "[10 0]"
    );
}

#[test]
fn test_get_in_update_in() {
    assert_eq!(eval_to("(get-in {:a {:b 1}} [:a :b])"), "1");
    assert_eq!(eval_to("(assoc-in {:a {:b 1}} [:a :c] 2)"), "{:a {:b 1, :c 2}}");
    assert_eq!(eval_to("(update {:n 1} :n inc)"), "{:n 2}");
    assert_eq!(eval_to("(update-in {:a {:n 1}} [:a :n] + 10)"), "{:a {:n 11}}");
}

#[test]
fn test_merge_and_select_keys() {
    assert_eq!(eval_to("(merge {:a 1} {:b 2} nil {:a 3})"), "{:a 3, :b 2}");
    assert_eq!(eval_to("(select-keys {:a 1 :b 2 :c 3} [:a :c])"), "{:a 1, :c 3}");
}

#[test]
fn test_sort_and_friends() {
    assert_eq!(eval_to("(sort [3 1 2])"), "(1 2 3)");
    assert_eq!(eval_to("(sort (fn [a b] (> a b)) [1 3 2])"), "(3 2 1)");
    assert_eq!(eval_to("(sort-by count [[1 2] [1] [1 2 3]])"), "([1] [1 2] [1 2 3])");
    assert_eq!(eval_to("(distinct [1 2 1 3 2])"), "(1 2 3)");
    assert_eq!(eval_to("(frequencies [:a :b :a])"), "{:a 2, :b 1}");
}

#[test]
fn test_keyword_lookup_depth() {
    assert_eq!(eval_to("(:b {:a 1} 42)"), "42");
    assert_eq!(eval_to("(get nil :x :d)"), ":d");
    assert_eq!(eval_to("(get \"abc\" 1)"), "\\b");
}
