//! Bootstrap: builtin registration tables, dynamic vars, prelude load
//!
//! Registration is table-driven: one (name, fn) table per builtin
//! module, installed into its namespace, followed by the pre-defined
//! dynamic vars and the embedded prelude (the part of clojure.core
//! written in the language itself). The `user` namespace is created
//! last so it refers every public core var, including prelude
//! definitions.

use tracing::debug;

use crate::error::Result;
use crate::interp::{Interp, CORE_NS};
use crate::namespace::Namespace;
use crate::support::make_builtin;
use crate::value::{BuiltinImpl, Value};
use crate::{
    arithmetic, atom_ops, coll_ops, core_ops, io_ops, meta_ops, multi_ops, multimethod, ns_ops,
    regex_ops, seq_ops, string_ops, math_ops,
};

/// The half of clojure.core written in the language itself.
const PRELUDE: &str = include_str!("../clj/core.clj");

type Table = &'static [(&'static str, BuiltinImpl)];

const CORE_FNS: Table = &[
    // arithmetic / comparison
    ("+", arithmetic::add),
    ("-", arithmetic::subtract),
    ("*", arithmetic::multiply),
    ("/", arithmetic::divide),
    ("quot", arithmetic::quot),
    ("rem", arithmetic::rem_op),
    ("mod", arithmetic::mod_op),
    ("inc", arithmetic::inc),
    ("dec", arithmetic::dec),
    ("max", arithmetic::max_op),
    ("min", arithmetic::min_op),
    ("abs", arithmetic::abs),
    ("=", arithmetic::eq),
    ("not=", arithmetic::not_eq),
    ("==", arithmetic::num_eq),
    ("<", arithmetic::lt),
    ("<=", arithmetic::le),
    (">", arithmetic::gt),
    (">=", arithmetic::ge),
    ("zero?", arithmetic::zero_p),
    ("pos?", arithmetic::pos_p),
    ("neg?", arithmetic::neg_p),
    ("even?", arithmetic::even_p),
    ("odd?", arithmetic::odd_p),
    ("number?", arithmetic::number_p),
    ("integer?", arithmetic::integer_p),
    ("float?", arithmetic::float_p),
    ("int", arithmetic::int_cast),
    ("long", arithmetic::int_cast),
    ("double", arithmetic::double_cast),
    ("rand", arithmetic::rand),
    // identity / naming / predicates
    ("identity", core_ops::identity),
    ("not", core_ops::not),
    ("boolean", core_ops::boolean),
    ("str", core_ops::str_op),
    ("subs", core_ops::subs),
    ("name", core_ops::name),
    ("namespace", core_ops::namespace),
    ("symbol", core_ops::symbol),
    ("keyword", core_ops::keyword),
    ("find-keyword", core_ops::find_keyword),
    ("gensym", core_ops::gensym),
    ("char", core_ops::char_op),
    ("hash", core_ops::hash),
    ("identical?", core_ops::identical_p),
    ("nil?", core_ops::nil_p),
    ("some?", core_ops::some_p),
    ("true?", core_ops::true_p),
    ("false?", core_ops::false_p),
    ("boolean?", core_ops::boolean_p),
    ("string?", core_ops::string_p),
    ("char?", core_ops::char_p),
    ("symbol?", core_ops::symbol_p),
    ("keyword?", core_ops::keyword_p),
    ("list?", core_ops::list_p),
    ("vector?", core_ops::vector_p),
    ("map?", core_ops::map_p),
    ("set?", core_ops::set_p),
    ("var?", core_ops::var_p),
    ("delay?", core_ops::delay_p),
    ("volatile?", core_ops::volatile_p),
    ("coll?", core_ops::coll_p),
    ("seq?", core_ops::seq_p),
    ("sequential?", core_ops::sequential_p),
    ("associative?", core_ops::associative_p),
    ("counted?", core_ops::counted_p),
    ("fn?", core_ops::fn_p),
    ("ifn?", core_ops::ifn_p),
    ("type", core_ops::type_op),
    // collections
    ("list", coll_ops::list),
    ("vector", coll_ops::vector),
    ("vec", coll_ops::vec),
    ("hash-map", coll_ops::hash_map),
    ("array-map", coll_ops::array_map),
    ("hash-set", coll_ops::hash_set),
    ("set", coll_ops::set),
    ("conj", coll_ops::conj),
    ("cons", coll_ops::cons),
    ("count", coll_ops::count),
    ("nth", coll_ops::nth),
    ("get", coll_ops::get),
    ("assoc", coll_ops::assoc),
    ("dissoc", coll_ops::dissoc),
    ("disj", coll_ops::disj),
    ("contains?", coll_ops::contains_p),
    ("find", coll_ops::find),
    ("keys", coll_ops::keys),
    ("vals", coll_ops::vals),
    ("peek", coll_ops::peek),
    ("pop", coll_ops::pop),
    ("subvec", coll_ops::subvec),
    ("empty", coll_ops::empty),
    ("empty?", coll_ops::empty_p),
    ("not-empty", coll_ops::not_empty),
    ("merge", coll_ops::merge),
    ("select-keys", coll_ops::select_keys),
    ("zipmap", coll_ops::zipmap),
    ("get-in", coll_ops::get_in),
    ("assoc-in", coll_ops::assoc_in),
    ("update", coll_ops::update),
    ("update-in", coll_ops::update_in),
    ("transient", coll_ops::transient),
    ("persistent!", coll_ops::persistent_bang),
    ("conj!", coll_ops::conj_bang),
    ("assoc!", coll_ops::assoc_bang),
    ("dissoc!", coll_ops::dissoc_bang),
    ("disj!", coll_ops::disj_bang),
    ("pop!", coll_ops::pop_bang),
    // sequences
    ("seq", seq_ops::seq),
    ("first", seq_ops::first),
    ("rest", seq_ops::rest),
    ("next", seq_ops::next),
    ("second", seq_ops::second),
    ("last", seq_ops::last),
    ("butlast", seq_ops::butlast),
    ("reverse", seq_ops::reverse),
    ("concat", seq_ops::concat),
    ("into", seq_ops::into),
    ("apply", seq_ops::apply),
    ("reduce", seq_ops::reduce),
    ("reduce-kv", seq_ops::reduce_kv),
    ("reduced", seq_ops::reduced),
    ("reduced?", seq_ops::reduced_p),
    ("ensure-reduced", seq_ops::ensure_reduced),
    ("unreduced", seq_ops::unreduced),
    ("compare", seq_ops::compare),
    ("sort", seq_ops::sort),
    ("sort-by", seq_ops::sort_by),
    ("distinct", seq_ops::distinct),
    ("frequencies", seq_ops::frequencies),
    ("group-by", seq_ops::group_by),
    ("mapv", seq_ops::mapv),
    ("filterv", seq_ops::filterv),
    ("every?", seq_ops::every_p),
    ("not-every?", seq_ops::not_every_p),
    ("some", seq_ops::some),
    ("not-any?", seq_ops::not_any_p),
    ("interleave", seq_ops::interleave),
    ("interpose", seq_ops::interpose),
    ("partition", seq_ops::partition),
    ("doall", seq_ops::doall),
    ("dorun", seq_ops::dorun),
    ("run!", seq_ops::run_bang),
    ("-lazy-seq", seq_ops::lazy_seq_star),
    ("chunk-buffer", seq_ops::chunk_buffer),
    ("chunk-append", seq_ops::chunk_append),
    ("chunk", seq_ops::chunk),
    ("chunk-cons", seq_ops::chunk_cons),
    ("chunk-first", seq_ops::chunk_first),
    ("chunk-rest", seq_ops::chunk_rest),
    ("chunk-next", seq_ops::chunk_next),
    ("chunked-seq?", seq_ops::chunked_seq_p),
    // reference cells
    ("atom", atom_ops::atom),
    ("deref", atom_ops::deref),
    ("reset!", atom_ops::reset_bang),
    ("swap!", atom_ops::swap_bang),
    ("swap-vals!", atom_ops::swap_vals_bang),
    ("reset-vals!", atom_ops::reset_vals_bang),
    ("compare-and-set!", atom_ops::compare_and_set_bang),
    ("volatile!", atom_ops::volatile_bang),
    ("vreset!", atom_ops::vreset_bang),
    ("vswap!", atom_ops::vswap_bang),
    ("-delay", atom_ops::delay_star),
    ("force", atom_ops::force),
    ("realized?", atom_ops::realized_p),
    // metadata / protocols
    ("meta", meta_ops::meta),
    ("with-meta", meta_ops::with_meta),
    ("vary-meta", meta_ops::vary_meta),
    ("alter-meta!", meta_ops::alter_meta_bang),
    ("reset-meta!", meta_ops::reset_meta_bang),
    ("-make-protocol", meta_ops::make_protocol),
    ("-protocol-fn", meta_ops::protocol_fn),
    ("-extend-type", meta_ops::extend_type_impl),
    ("satisfies?", meta_ops::satisfies_p),
    // multimethods / hierarchy
    ("-make-multi", multi_ops::make_multi),
    ("-add-method", multi_ops::add_method),
    ("remove-method", multi_ops::remove_method),
    ("remove-all-methods", multi_ops::remove_all_methods),
    ("methods", multi_ops::methods),
    ("get-method", multi_ops::get_method),
    ("prefer-method", multi_ops::prefer_method),
    ("prefers", multi_ops::prefers),
    ("make-hierarchy", multi_ops::make_hierarchy),
    ("derive", multi_ops::derive),
    ("underive", multi_ops::underive),
    ("isa?", multi_ops::isa_p),
    ("parents", multi_ops::parents),
    ("ancestors", multi_ops::ancestors),
    ("descendants", multi_ops::descendants),
    // namespaces / vars
    ("create-ns", ns_ops::create_ns),
    ("find-ns", ns_ops::find_ns),
    ("all-ns", ns_ops::all_ns),
    ("in-ns", ns_ops::in_ns),
    ("ns-name", ns_ops::ns_name),
    ("intern", ns_ops::intern),
    ("resolve", ns_ops::resolve),
    ("ns-resolve", ns_ops::ns_resolve),
    ("find-var", ns_ops::find_var),
    ("ns-interns", ns_ops::ns_interns),
    ("ns-refers", ns_ops::ns_refers),
    ("ns-publics", ns_ops::ns_publics),
    ("ns-map", ns_ops::ns_map),
    ("ns-aliases", ns_ops::ns_aliases),
    ("alias", ns_ops::alias),
    ("refer", ns_ops::refer),
    ("require", ns_ops::require),
    ("var-get", ns_ops::var_get),
    ("var-set", ns_ops::var_set),
    ("alter-var-root", ns_ops::alter_var_root),
    ("push-thread-bindings", ns_ops::push_thread_bindings),
    ("pop-thread-bindings", ns_ops::pop_thread_bindings),
    ("thread-bound?", ns_ops::thread_bound_p),
    ("bound?", ns_ops::bound_p),
    // printing / io / eval
    ("pr-str", io_ops::pr_str_op),
    ("prn-str", io_ops::prn_str_op),
    ("print-str", io_ops::print_str_op),
    ("println-str", io_ops::println_str_op),
    ("pr", io_ops::pr),
    ("prn", io_ops::prn),
    ("print", io_ops::print_op),
    ("println", io_ops::println_op),
    ("newline", io_ops::newline),
    ("flush", io_ops::flush),
    ("slurp", io_ops::slurp),
    ("spit", io_ops::spit),
    ("read-string", io_ops::read_string),
    ("load-string", io_ops::load_string),
    ("load-file", io_ops::load_file),
    ("eval", io_ops::eval),
    ("macroexpand", io_ops::macroexpand),
    ("macroexpand-1", io_ops::macroexpand_1),
    ("ex-info", io_ops::ex_info),
    ("ex-message", io_ops::ex_message),
    ("ex-data", io_ops::ex_data),
    // regex
    ("re-pattern", regex_ops::re_pattern),
    ("re-matcher", regex_ops::re_matcher),
    ("re-find", regex_ops::re_find),
    ("re-matches", regex_ops::re_matches),
    ("re-seq", regex_ops::re_seq),
    ("re-groups", regex_ops::re_groups),
];

/// Builtin macros: vars flagged :macro whose value is a builtin taking
/// unevaluated forms.
const CORE_MACROS: Table = &[
    ("ns", ns_ops::ns_macro),
    ("defmulti", multi_ops::defmulti_macro),
    ("defmethod", multi_ops::defmethod_macro),
    ("defprotocol", meta_ops::defprotocol_macro),
    ("extend-type", meta_ops::extend_type_macro),
];

const STRING_FNS: Table = &[
    ("upper-case", string_ops::upper_case),
    ("lower-case", string_ops::lower_case),
    ("capitalize", string_ops::capitalize),
    ("trim", string_ops::trim),
    ("triml", string_ops::triml),
    ("trimr", string_ops::trimr),
    ("trim-newline", string_ops::trim_newline),
    ("blank?", string_ops::blank_p),
    ("starts-with?", string_ops::starts_with_p),
    ("ends-with?", string_ops::ends_with_p),
    ("includes?", string_ops::includes_p),
    ("index-of", string_ops::index_of),
    ("last-index-of", string_ops::last_index_of),
    ("join", string_ops::join),
    ("split", string_ops::split),
    ("split-lines", string_ops::split_lines),
    ("replace", string_ops::replace),
    ("replace-first", string_ops::replace_first),
    ("reverse", string_ops::reverse),
    ("re-quote-replacement", string_ops::re_quote_replacement),
    ("escape", string_ops::escape),
];

const MATH_FNS: Table = &[
    ("floor", math_ops::floor),
    ("ceil", math_ops::ceil),
    ("round", math_ops::round),
    ("sqrt", math_ops::sqrt),
    ("cbrt", math_ops::cbrt),
    ("pow", math_ops::pow),
    ("exp", math_ops::exp),
    ("log", math_ops::log),
    ("log10", math_ops::log10),
    ("sin", math_ops::sin),
    ("cos", math_ops::cos),
    ("tan", math_ops::tan),
    ("asin", math_ops::asin),
    ("acos", math_ops::acos),
    ("atan", math_ops::atan),
];

const EDN_FNS: Table = &[("read-string", io_ops::read_string)];

/// The pre-defined dynamic vars of spec and their initial root values.
fn dynamic_vars(interp: &mut Interp) -> Vec<(&'static str, Value)> {
    vec![
        ("*ns*", Value::simple_symbol(CORE_NS)),
        ("*file*", Value::Nil),
        ("*command-line-args*", Value::Nil),
        ("*e", Value::Nil),
        ("*flush-on-newline*", Value::Bool(true)),
        ("*print-dup*", Value::Bool(false)),
        ("*print-length*", Value::Nil),
        ("*print-level*", Value::Nil),
        ("*print-meta*", Value::Bool(false)),
        ("*print-namespace-maps*", Value::Bool(true)),
        ("*print-readably*", Value::Bool(true)),
        ("*read-eval*", Value::Bool(true)),
        ("*data-readers*", Value::map(ruse_core::PersistentMap::new())),
        ("*default-data-reader-fn*", Value::Nil),
        ("*source-path*", Value::Nil),
        ("*unchecked-math*", Value::Bool(false)),
        ("*out*", interp.intern_keyword(None, "stdout")),
        ("*err*", interp.intern_keyword(None, "stderr")),
        ("*in*", interp.intern_keyword(None, "stdin")),
    ]
}

fn install_table(ns: &Namespace, table: Table) {
    for &(name, func) in table {
        let var = ns.intern(name);
        var.bind_root(make_builtin(name, func));
    }
}

pub fn install(interp: &mut Interp) -> Result<()> {
    let core = interp
        .find_ns(CORE_NS)
        .ok_or_else(|| crate::error::Error::eval("clojure.core namespace missing"))?;
    debug!(fns = CORE_FNS.len(), "registering core builtins");
    install_table(&core, CORE_FNS);
    for &(name, func) in CORE_MACROS {
        let var = core.intern(name);
        var.bind_root(make_builtin(name, func));
        var.macro_flag.set(true);
    }
    for (name, value) in dynamic_vars(interp) {
        let var = core.intern(name);
        var.bind_root(value);
        var.dynamic.set(true);
    }
    let hierarchy_var = core.intern(multi_ops::GLOBAL_HIERARCHY);
    hierarchy_var.bind_root(multimethod::make_hierarchy());

    let string_ns = interp.create_ns("clojure.string");
    install_table(&string_ns, STRING_FNS);
    let math_ns = interp.create_ns("clojure.math");
    install_table(&math_ns, MATH_FNS);
    let pi = math_ns.intern("PI");
    pi.bind_root(Value::Float(std::f64::consts::PI));
    let e = math_ns.intern("E");
    e.bind_root(Value::Float(std::f64::consts::E));
    let edn_ns = interp.create_ns("clojure.edn");
    install_table(&edn_ns, EDN_FNS);

    // The prelude evaluates inside clojure.core, so its defs land there.
    debug!("loading prelude");
    interp.eval_str(PRELUDE)?;

    // user refers every public core var and starts as current.
    interp.in_ns("user")?;
    Ok(())
}
