//! Namespace and var builtins
//!
//! Namespaces surface in the language as their name symbols (there is no
//! namespace variant in the value model); every builtin here accepts a
//! symbol or string where Clojure takes a namespace object.
//!
//! require only wires up pre-loaded namespaces: it sets aliases and
//! refers but never loads code from disk.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::namespace::Namespace;
use crate::support::{exact_arity, min_arity, range_arity};
use crate::value::{Symbol, Value};
use ruse_core::PersistentMap;

fn ns_name_of(op: &str, v: &Value) -> Result<String> {
    match v {
        Value::Symbol(s) if s.ns.is_none() => Ok(s.name.to_string()),
        Value::Str(s) => Ok(s.to_string()),
        other => Err(Error::type_err(op, "a namespace symbol", other)),
    }
}

fn the_ns(interp: &Interp, op: &str, v: &Value) -> Result<Rc<Namespace>> {
    let name = ns_name_of(op, v)?;
    interp
        .find_ns(&name)
        .ok_or_else(|| Error::ns_not_found(&name))
}

pub fn create_ns(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("create-ns", args, 1)?;
    let name = ns_name_of("create-ns", &args[0])?;
    interp.create_ns(&name);
    Ok(Value::simple_symbol(&name))
}

pub fn find_ns(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("find-ns", args, 1)?;
    let name = ns_name_of("find-ns", &args[0])?;
    Ok(match interp.find_ns(&name) {
        Some(_) => Value::simple_symbol(&name),
        None => Value::Nil,
    })
}

pub fn all_ns(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("all-ns", args, 0)?;
    let mut names = interp.ns_names();
    names.sort();
    Ok(Value::list_from(
        names.iter().map(|n| Value::simple_symbol(n)).collect(),
    ))
}

pub fn in_ns(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("in-ns", args, 1)?;
    let name = ns_name_of("in-ns", &args[0])?;
    interp.in_ns(&name)?;
    Ok(Value::simple_symbol(&name))
}

pub fn ns_name(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-name", args, 1)?;
    let ns = the_ns(interp, "ns-name", &args[0])?;
    Ok(Value::simple_symbol(&ns.name))
}

pub fn intern(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("intern", args, 2, 3)?;
    let ns = the_ns(interp, "intern", &args[0])?;
    let sym = args[1].expect_symbol("intern")?;
    let var = ns.intern(&sym.name);
    if let Some(value) = args.get(2) {
        var.bind_root(value.clone());
    }
    Ok(Value::Var(var))
}

pub fn resolve(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("resolve", args, 1)?;
    let sym = args[0].expect_symbol("resolve")?;
    Ok(interp
        .maybe_resolve(sym)
        .map(Value::Var)
        .unwrap_or(Value::Nil))
}

pub fn ns_resolve(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-resolve", args, 2)?;
    let ns = the_ns(interp, "ns-resolve", &args[0])?;
    let sym = args[1].expect_symbol("ns-resolve")?;
    Ok(interp
        .resolve_in(&ns, sym)
        .ok()
        .map(Value::Var)
        .unwrap_or(Value::Nil))
}

pub fn find_var(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("find-var", args, 1)?;
    let sym = args[0].expect_symbol("find-var")?;
    if sym.ns.is_none() {
        return Err(Error::value("find-var: symbol must be namespace-qualified"));
    }
    Ok(interp
        .maybe_resolve(sym)
        .map(Value::Var)
        .unwrap_or(Value::Nil))
}

fn var_map(pairs: Vec<(String, Rc<crate::namespace::Var>)>) -> Value {
    let mut entries = PersistentMap::new();
    for (name, var) in pairs {
        entries = entries.assoc(Value::simple_symbol(&name), Value::Var(var));
    }
    Value::map(entries)
}

pub fn ns_interns(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-interns", args, 1)?;
    let ns = the_ns(interp, "ns-interns", &args[0])?;
    Ok(var_map(ns.interns_snapshot()))
}

pub fn ns_refers(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-refers", args, 1)?;
    let ns = the_ns(interp, "ns-refers", &args[0])?;
    Ok(var_map(ns.refers_snapshot()))
}

pub fn ns_publics(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-publics", args, 1)?;
    let ns = the_ns(interp, "ns-publics", &args[0])?;
    Ok(var_map(
        ns.interns_snapshot()
            .into_iter()
            .filter(|(_, var)| !var.private.get())
            .collect(),
    ))
}

/// interns merged over refers.
pub fn ns_map(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-map", args, 1)?;
    let ns = the_ns(interp, "ns-map", &args[0])?;
    let mut pairs = ns.refers_snapshot();
    pairs.extend(ns.interns_snapshot());
    Ok(var_map(pairs))
}

pub fn ns_aliases(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ns-aliases", args, 1)?;
    let ns = the_ns(interp, "ns-aliases", &args[0])?;
    let mut entries = PersistentMap::new();
    for (alias, target) in ns.aliases_snapshot() {
        entries = entries.assoc(
            Value::simple_symbol(&alias),
            Value::simple_symbol(&target),
        );
    }
    Ok(Value::map(entries))
}

pub fn alias(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("alias", args, 2)?;
    let alias_sym = args[0].expect_symbol("alias")?;
    let target = the_ns(interp, "alias", &args[1])?;
    interp
        .current_ns()
        .add_alias(&alias_sym.name, target.name.clone());
    Ok(Value::Nil)
}

pub fn refer(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("refer", args, 1)?;
    let source = the_ns(interp, "refer", &args[0])?;
    // Options: :only [syms], default all publics.
    let mut only: Option<Vec<String>> = None;
    let mut i = 1;
    while i < args.len() {
        match (&args[i], args.get(i + 1)) {
            (Value::Keyword(k), Some(v)) if k.ns.is_none() && &*k.name == "only" => {
                let syms = interp.seq_to_vec(v)?;
                let mut names = Vec::new();
                for s in syms {
                    names.push(s.expect_symbol("refer")?.name.to_string());
                }
                only = Some(names);
                i += 2;
            }
            _ => {
                return Err(Error::value("refer: expected :only [syms...]"));
            }
        }
    }
    let current = interp.current_ns();
    for (name, var) in source.interns_snapshot() {
        if var.private.get() {
            continue;
        }
        if let Some(only) = &only {
            if !only.contains(&name) {
                continue;
            }
        }
        current.refer(&name, var)?;
    }
    Ok(Value::Nil)
}

/// require for pre-loaded namespaces: processes quoted libspecs, wiring
/// aliases and refers per :as / :refer options.
pub fn require(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("require", args, 1)?;
    for spec in args {
        require_libspec(interp, spec)?;
    }
    Ok(Value::Nil)
}

fn require_libspec(interp: &mut Interp, spec: &Value) -> Result<()> {
    match spec {
        Value::Symbol(s) => {
            the_ns(interp, "require", &Value::simple_symbol(&s.name))?;
            Ok(())
        }
        Value::Vector(v) => {
            let items: Vec<Value> = v.items.iter().cloned().collect();
            let Some(lib) = items.first() else {
                return Err(Error::value("require: empty libspec"));
            };
            let source = the_ns(interp, "require", lib)?;
            let mut i = 1;
            while i < items.len() {
                let option = items[i].expect_keyword("require")?;
                let Some(value) = items.get(i + 1) else {
                    return Err(Error::value(format!(
                        "require: missing value for option :{}",
                        option.name
                    )));
                };
                match &*option.name {
                    "as" => {
                        let alias_sym = value.expect_symbol("require")?;
                        interp
                            .current_ns()
                            .add_alias(&alias_sym.name, source.name.clone());
                    }
                    "refer" => match value {
                        Value::Keyword(k) if k.ns.is_none() && &*k.name == "all" => {
                            let current = interp.current_ns();
                            for (name, var) in source.interns_snapshot() {
                                if !var.private.get() {
                                    current.refer(&name, var)?;
                                }
                            }
                        }
                        coll => {
                            let syms = interp.seq_to_vec(coll)?;
                            let current = interp.current_ns();
                            for s in syms {
                                let sym = s.expect_symbol("require")?;
                                let var = source.lookup(&sym.name).ok_or_else(|| {
                                    Error::value(format!(
                                        "require: {}/{} not found",
                                        source.name, sym.name
                                    ))
                                })?;
                                current.refer(&sym.name, var)?;
                            }
                        }
                    },
                    other => {
                        return Err(Error::value(format!(
                            "require: unsupported option :{}",
                            other
                        )))
                    }
                }
                i += 2;
            }
            Ok(())
        }
        other => Err(Error::type_err("require", "a symbol or libspec vector", other)),
    }
}

/// The ns macro (registered with the macro flag): switches namespace and
/// lowers :require clauses onto the require builtin.
pub fn ns_macro(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("ns", args, 1)?;
    let name = args[0].expect_symbol("ns")?;
    let mut forms = vec![Value::list_from(vec![
        Value::simple_symbol("in-ns"),
        Value::list_from(vec![
            Value::simple_symbol("quote"),
            Value::symbol(Symbol::simple(&name.name)),
        ]),
    ])];
    for clause in &args[1..] {
        let items = match clause {
            Value::List(l) => l.items.iter().cloned().collect::<Vec<_>>(),
            other => {
                return Err(Error::type_err("ns", "a reference clause list", other))
            }
        };
        let Some(Value::Keyword(kind)) = items.first() else {
            return Err(Error::value("ns: clause must start with a keyword"));
        };
        match &*kind.name {
            "require" => {
                let mut call = vec![Value::simple_symbol("require")];
                for libspec in &items[1..] {
                    call.push(Value::list_from(vec![
                        Value::simple_symbol("quote"),
                        libspec.clone(),
                    ]));
                }
                forms.push(Value::list_from(call));
            }
            other => {
                return Err(Error::value(format!("ns: unsupported clause :{}", other)))
            }
        }
    }
    let mut do_form = vec![Value::simple_symbol("do")];
    do_form.extend(forms);
    Ok(Value::list_from(do_form))
}

// -- vars -------------------------------------------------------------------

pub fn var_get(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("var-get", args, 1)?;
    match &args[0] {
        Value::Var(var) => interp.deref_var(var),
        other => Err(Error::type_err("var-get", "a var", other)),
    }
}

pub fn var_set(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("var-set", args, 2)?;
    match &args[0] {
        Value::Var(var) => interp.set_var(var, args[1].clone()),
        other => Err(Error::type_err("var-set", "a var", other)),
    }
}

/// Atomically rebind a var's root through a function of the old root.
pub fn alter_var_root(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("alter-var-root", args, 2)?;
    match &args[0] {
        Value::Var(var) => {
            let old = var.root()?;
            let mut call_args = vec![old];
            call_args.extend(args[2..].iter().cloned());
            let f = args[1].clone();
            let new = interp.apply(&f, call_args)?;
            var.bind_root(new.clone());
            Ok(new)
        }
        other => Err(Error::type_err("alter-var-root", "a var", other)),
    }
}

pub fn push_thread_bindings(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("push-thread-bindings", args, 1)?;
    let m = args[0].expect_map("push-thread-bindings")?;
    let mut entries = Vec::with_capacity(m.entries.len());
    for (k, v) in m.entries.iter() {
        match k {
            Value::Var(var) => entries.push((var.clone(), v.clone())),
            other => {
                return Err(Error::type_err(
                    "push-thread-bindings",
                    "a var key",
                    other,
                ))
            }
        }
    }
    interp.push_bindings(entries)?;
    Ok(Value::Nil)
}

pub fn pop_thread_bindings(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("pop-thread-bindings", args, 0)?;
    interp.pop_bindings()?;
    Ok(Value::Nil)
}

pub fn thread_bound_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("thread-bound?", args, 1)?;
    for arg in args {
        match arg {
            Value::Var(var) => {
                if !interp.thread_bound(var) {
                    return Ok(Value::Bool(false));
                }
            }
            other => return Err(Error::type_err("thread-bound?", "a var", other)),
        }
    }
    Ok(Value::Bool(true))
}

pub fn bound_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("bound?", args, 1)?;
    for arg in args {
        match arg {
            Value::Var(var) => {
                if !var.is_bound() && !interp.thread_bound(var) {
                    return Ok(Value::Bool(false));
                }
            }
            other => return Err(Error::type_err("bound?", "a var", other)),
        }
    }
    Ok(Value::Bool(true))
}
