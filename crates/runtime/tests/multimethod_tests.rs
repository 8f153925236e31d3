//! Multimethod dispatch: exact, hierarchy, preferences, defaults, cache
//! invalidation

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
fn test_exact_dispatch() {
    assert_eq!(
        eval_to(
            "(defmulti speak :animal) \
             (defmethod speak :dog [_] \"woof\") \
             (defmethod speak :cat [_] \"meow\") \
             [(speak {:animal :dog}) (speak {:animal :cat})]"
        ),
        "[\"woof\" \"meow\"]"
    );
}

#[test]
fn test_default_method() {
    assert_eq!(
        eval_to(
            "(defmulti speak :animal) \
             (defmethod speak :default [_] \"...\") \
             (speak {:animal :fish})"
        ),
        "\"...\""
    );
}

#[test]
fn test_no_method_is_value_error() {
    assert_eq!(
        eval_err("(defmulti speak :animal) (speak {:animal :fish})"),
        ErrorKind::Value
    );
}

#[test]
fn test_custom_default_dispatch_value() {
    assert_eq!(
        eval_to(
            "(defmulti speak :animal :default :fallback) \
             (defmethod speak :fallback [_] :generic) \
             (speak {:animal :fish})"
        ),
        ":generic"
    );
}

#[test]
fn test_hierarchy_dispatch() {
    assert_eq!(
        eval_to(
            "(derive :dog :mammal) \
             (defmulti kind identity) \
             (defmethod kind :mammal [_] :warm) \
             (kind :dog)"
        ),
        ":warm"
    );
}

#[test]
fn test_isa_relation() {
    assert_eq!(eval_to("(isa? :a :a)"), "true");
    assert_eq!(eval_to("(derive :dog :mammal) (isa? :dog :mammal)"), "true");
    assert_eq!(
        eval_to("(derive :dog :mammal) (derive :mammal :animal) (isa? :dog :animal)"),
        "true"
    );
    assert_eq!(
        eval_to("(derive :dog :mammal) (isa? [:dog :dog] [:mammal :mammal])"),
        "true"
    );
    assert_eq!(eval_to("(isa? [:a] [:a :b])"), "false");
}

#[test]
fn test_parents_ancestors_descendants() {
    assert_eq!(
        eval_to("(derive :dog :mammal) (derive :mammal :animal) (parents :dog)"),
        "#{:mammal}"
    );
    assert_eq!(
        eval_to(
            "(derive :dog :mammal) (derive :mammal :animal) \
             (= (ancestors :dog) #{:mammal :animal})"
        ),
        "true"
    );
    assert_eq!(
        eval_to(
            "(derive :dog :mammal) (derive :cat :mammal) \
             (= (descendants :mammal) #{:dog :cat})"
        ),
        "true"
    );
}

#[test]
fn test_underive() {
    assert_eq!(
        eval_to("(derive :dog :mammal) (underive :dog :mammal) (isa? :dog :mammal)"),
        "false"
    );
}

#[test]
fn test_cyclic_derive_is_value_error() {
    assert_eq!(
        eval_err("(derive :a :b) (derive :b :a)"),
        ErrorKind::Value
    );
    assert_eq!(eval_err("(derive :a :a)"), ErrorKind::Value);
}

#[test]
fn test_local_hierarchy_is_pure() {
    assert_eq!(
        eval_to(
            "(def h (derive (make-hierarchy) :dog :mammal)) \
             [(isa? h :dog :mammal) (isa? :dog :mammal)]"
        ),
        "[true false]"
    );
}

#[test]
fn test_ambiguous_dispatch_is_value_error() {
    assert_eq!(
        eval_err(
            "(derive :rect :shape) (derive :rect :quad) \
             (defmulti draw identity) \
             (defmethod draw :shape [_] :shape) \
             (defmethod draw :quad [_] :quad) \
             (draw :rect)"
        ),
        ErrorKind::Value
    );
}

#[test]
fn test_prefer_method_resolves_ambiguity() {
    assert_eq!(
        eval_to(
            "(derive :rect :shape) (derive :rect :quad) \
             (defmulti draw identity) \
             (defmethod draw :shape [_] :shape) \
             (defmethod draw :quad [_] :quad) \
             (prefer-method draw :quad :shape) \
             (draw :rect)"
        ),
        ":quad"
    );
}

#[test]
fn test_method_added_after_cache_fill_is_found() {
    // A cached :default selection must be invalidated by add-method.
    assert_eq!(
        eval_to(
            "(defmulti speak identity) \
             (defmethod speak :default [_] :generic) \
             (def before (speak :dog)) \
             (defmethod speak :dog [_] :woof) \
             [before (speak :dog)]"
        ),
        "[:generic :woof]"
    );
}

#[test]
fn test_hierarchy_edit_invalidates_cache() {
    assert_eq!(
        eval_to(
            "(defmulti kind identity) \
             (defmethod kind :mammal [_] :warm) \
             (defmethod kind :default [_] :unknown) \
             (def before (kind :dog)) \
             (derive :dog :mammal) \
             [before (kind :dog)]"
        ),
        "[:unknown :warm]"
    );
}

#[test]
fn test_remove_method() {
    assert_eq!(
        eval_to(
            "(defmulti speak identity) \
             (defmethod speak :dog [_] :woof) \
             (defmethod speak :default [_] :generic) \
             (remove-method speak :dog) \
             (speak :dog)"
        ),
        ":generic"
    );
}

#[test]
fn test_methods_map() {
    assert_eq!(
        eval_to(
            "(defmulti speak identity) \
             (defmethod speak :dog [_] :woof) \
             (count (methods speak))"
        ),
        "1"
    );
}

#[test]
fn test_dispatch_on_vector_of_args() {
    assert_eq!(
        eval_to(
            "(defmulti pair (fn [a b] [a b])) \
             (defmethod pair [:x :y] [a b] :exact) \
             (pair :x :y)"
        ),
        ":exact"
    );
}

#[test]
fn test_protocols() {
    assert_eq!(
        eval_to(
            "(defprotocol Sized (size-of [x])) \
             (extend-type :vector Sized (size-of [v] (count v))) \
             (extend-type :string Sized (size-of [s] (count s))) \
             [(size-of [1 2 3]) (size-of \"abcd\") (satisfies? Sized [1]) (satisfies? Sized 5)]"
        ),
        "[3 4 true false]"
    );
}

#[test]
fn test_protocol_missing_impl_is_value_error() {
    assert_eq!(
        eval_err("(defprotocol P (m [x])) (m 42)"),
        ErrorKind::Value
    );
}
