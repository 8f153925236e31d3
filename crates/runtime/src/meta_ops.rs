//! Metadata and protocol builtins
//!
//! Metadata is per-object and immutable except on vars and atoms, whose
//! meta cells mutate in place. Protocols dispatch a method on the first
//! argument's type keyword; defprotocol and extend-type are builtin
//! macros lowering onto the -make-protocol / -protocol-fn /
//! -extend-type constructors.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::support::{exact_arity, min_arity};
use crate::value::{ProtocolFnVal, ProtocolVal, Value};
use ruse_core::PersistentMap;

pub fn meta(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("meta", args, 1)?;
    Ok(args[0].meta())
}

pub fn with_meta(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("with-meta", args, 2)?;
    args[0].with_meta(args[1].clone())
}

pub fn vary_meta(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("vary-meta", args, 2)?;
    let old_meta = args[0].meta();
    let mut call_args = vec![old_meta];
    call_args.extend(args[2..].iter().cloned());
    let f = args[1].clone();
    let new_meta = interp.apply(&f, call_args)?;
    args[0].with_meta(new_meta)
}

pub fn alter_meta_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("alter-meta!", args, 2)?;
    let old_meta = match &args[0] {
        Value::Var(var) => var.user_meta(),
        Value::Atom(a) => a.meta.borrow().clone(),
        other => return Err(Error::type_err("alter-meta!", "a var or atom", other)),
    };
    let mut call_args = vec![old_meta];
    call_args.extend(args[2..].iter().cloned());
    let f = args[1].clone();
    let new_meta = interp.apply(&f, call_args)?;
    match &args[0] {
        Value::Var(var) => var.set_user_meta(new_meta.clone()),
        Value::Atom(a) => *a.meta.borrow_mut() = new_meta.clone(),
        _ => {}
    }
    Ok(new_meta)
}

pub fn reset_meta_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reset-meta!", args, 2)?;
    match &args[0] {
        Value::Var(var) => var.set_user_meta(args[1].clone()),
        Value::Atom(a) => *a.meta.borrow_mut() = args[1].clone(),
        other => return Err(Error::type_err("reset-meta!", "a var or atom", other)),
    }
    Ok(args[1].clone())
}

// -- protocols --------------------------------------------------------------

pub fn make_protocol(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("-make-protocol", args, 2)?;
    let name = args[0].expect_symbol("-make-protocol")?;
    let methods = interp.seq_to_vec(&args[1])?;
    let mut method_names = Vec::with_capacity(methods.len());
    for m in methods {
        method_names.push(m.expect_symbol("-make-protocol")?.name.clone());
    }
    Ok(Value::Protocol(Rc::new(ProtocolVal {
        name: name.name.clone(),
        methods: method_names,
        impls: RefCell::new(PersistentMap::new()),
    })))
}

pub fn protocol_fn(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("-protocol-fn", args, 2)?;
    let protocol = match &args[0] {
        Value::Protocol(p) => p.clone(),
        other => return Err(Error::type_err("-protocol-fn", "a protocol", other)),
    };
    let name = args[1].expect_symbol("-protocol-fn")?;
    Ok(Value::ProtocolFn(Rc::new(ProtocolFnVal {
        name: name.name.clone(),
        protocol,
    })))
}

pub fn extend_type_impl(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("-extend-type", args, 3)?;
    let protocol = match &args[0] {
        Value::Protocol(p) => p.clone(),
        other => return Err(Error::type_err("-extend-type", "a protocol", other)),
    };
    args[1].expect_keyword("-extend-type")?;
    args[2].expect_map("-extend-type")?;
    let updated = protocol
        .impls
        .borrow()
        .assoc(args[1].clone(), args[2].clone());
    *protocol.impls.borrow_mut() = updated;
    Ok(Value::Nil)
}

pub fn satisfies_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("satisfies?", args, 2)?;
    let protocol = match &args[0] {
        Value::Protocol(p) => p.clone(),
        other => return Err(Error::type_err("satisfies?", "a protocol", other)),
    };
    let type_key = interp.intern_keyword(None, args[1].type_name());
    let result = protocol.impls.borrow().contains_key(&type_key);
    Ok(Value::Bool(result))
}

/// defprotocol macro: (defprotocol Name (method [args] doc?) ...)
/// lowers to a protocol def plus one protocol-fn def per method.
pub fn defprotocol_macro(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("defprotocol", args, 1)?;
    let name = args[0].expect_symbol("defprotocol")?;
    let mut method_names = Vec::new();
    for sig in &args[1..] {
        let items = match sig {
            Value::List(l) => l.items.iter().cloned().collect::<Vec<_>>(),
            Value::Str(_) => continue, // docstring position
            other => return Err(Error::type_err("defprotocol", "a method signature", other)),
        };
        let Some(m) = items.first() else {
            return Err(Error::value("defprotocol: empty method signature"));
        };
        method_names.push(m.expect_symbol("defprotocol")?.name.clone());
    }
    let _ = interp;
    let quoted_methods = Value::list_from(vec![
        Value::simple_symbol("quote"),
        Value::list_from(
            method_names
                .iter()
                .map(|m| Value::simple_symbol(m))
                .collect(),
        ),
    ]);
    let mut forms = vec![Value::list_from(vec![
        Value::simple_symbol("def"),
        Value::simple_symbol(&name.name),
        Value::list_from(vec![
            Value::simple_symbol("-make-protocol"),
            Value::list_from(vec![
                Value::simple_symbol("quote"),
                Value::simple_symbol(&name.name),
            ]),
            quoted_methods,
        ]),
    ])];
    for m in &method_names {
        forms.push(Value::list_from(vec![
            Value::simple_symbol("def"),
            Value::simple_symbol(m),
            Value::list_from(vec![
                Value::simple_symbol("-protocol-fn"),
                Value::simple_symbol(&name.name),
                Value::list_from(vec![
                    Value::simple_symbol("quote"),
                    Value::simple_symbol(m),
                ]),
            ]),
        ]));
    }
    let mut do_form = vec![Value::simple_symbol("do")];
    do_form.extend(forms);
    Ok(Value::list_from(do_form))
}

/// extend-type macro: (extend-type :type Proto (m [x] body) ...) lowers
/// to -extend-type with a method-name -> fn map.
pub fn extend_type_macro(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("extend-type", args, 2)?;
    args[0].expect_keyword("extend-type")?;
    let mut map_form = vec![Value::simple_symbol("hash-map")];
    for method in &args[2..] {
        let items = match method {
            Value::List(l) => l.items.iter().cloned().collect::<Vec<_>>(),
            other => return Err(Error::type_err("extend-type", "a method body", other)),
        };
        let Some(m) = items.first() else {
            return Err(Error::value("extend-type: empty method body"));
        };
        let method_name = m.expect_symbol("extend-type")?;
        map_form.push(Value::list_from(vec![
            Value::simple_symbol("quote"),
            Value::simple_symbol(&method_name.name),
        ]));
        let mut fn_form = vec![Value::simple_symbol("fn")];
        fn_form.extend(items[1..].iter().cloned());
        map_form.push(Value::list_from(fn_form));
    }
    Ok(Value::list_from(vec![
        Value::simple_symbol("-extend-type"),
        args[1].clone(),
        args[0].clone(),
        Value::list_from(map_form),
    ]))
}
