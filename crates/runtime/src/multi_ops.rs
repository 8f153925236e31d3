//! Multimethod builtins and the defmulti/defmethod macros
//!
//! defmulti and defmethod are builtin macros lowering onto -make-multi
//! and -add-method; the hierarchy builtins (derive, isa?, ancestors...)
//! operate on the global hierarchy var unless given an explicit
//! hierarchy map.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::multimethod::{self, MultiFnVal};
use crate::support::{exact_arity, min_arity, range_arity};
use crate::value::Value;

pub const GLOBAL_HIERARCHY: &str = "global-hierarchy";

fn as_multi(op: &str, v: &Value) -> Result<Rc<MultiFnVal>> {
    match v {
        Value::MultiFn(mf) => Ok(mf.clone()),
        other => Err(Error::type_err(op, "a multimethod", other)),
    }
}

/// (-make-multi 'name dispatch-fn :default default-val?)
pub fn make_multi(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("-make-multi", args, 2)?;
    let name = args[0].expect_symbol("-make-multi")?;
    let dispatch_fn = args[1].clone();
    let mut default_dispatch = interp.intern_keyword(None, "default");
    let mut i = 2;
    while i < args.len() {
        let option = args[i].expect_keyword("-make-multi")?;
        let Some(value) = args.get(i + 1) else {
            return Err(Error::value(format!(
                "-make-multi: missing value for option :{}",
                option.name
            )));
        };
        match &*option.name {
            "default" => default_dispatch = value.clone(),
            other => {
                return Err(Error::value(format!(
                    "-make-multi: unsupported option :{}",
                    other
                )))
            }
        }
        i += 2;
    }
    let hierarchy_var = interp.core_var(GLOBAL_HIERARCHY).ok();
    Ok(Value::MultiFn(Rc::new(MultiFnVal::new(
        name.name.clone(),
        dispatch_fn,
        default_dispatch,
        hierarchy_var,
    ))))
}

pub fn add_method(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("-add-method", args, 3)?;
    let mf = as_multi("-add-method", &args[0])?;
    mf.add_method(args[1].clone(), args[2].clone());
    Ok(args[0].clone())
}

pub fn remove_method(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("remove-method", args, 2)?;
    let mf = as_multi("remove-method", &args[0])?;
    mf.remove_method(&args[1]);
    Ok(args[0].clone())
}

pub fn remove_all_methods(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("remove-all-methods", args, 1)?;
    let mf = as_multi("remove-all-methods", &args[0])?;
    *mf.methods.borrow_mut() = ruse_core::PersistentMap::new();
    mf.reset_cache();
    Ok(args[0].clone())
}

pub fn methods(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("methods", args, 1)?;
    let mf = as_multi("methods", &args[0])?;
    Ok(Value::map(mf.methods_map()))
}

pub fn get_method(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("get-method", args, 2)?;
    let mf = as_multi("get-method", &args[0])?;
    match multimethod::find_method(interp, &mf, &args[1]) {
        Ok(method) => Ok(method),
        Err(_) => Ok(Value::Nil),
    }
}

pub fn prefer_method(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("prefer-method", args, 3)?;
    let mf = as_multi("prefer-method", &args[0])?;
    multimethod::add_preference(interp, &mf, args[1].clone(), args[2].clone())?;
    Ok(args[0].clone())
}

pub fn prefers(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("prefers", args, 1)?;
    let mf = as_multi("prefers", &args[0])?;
    let result = mf.prefers.borrow().clone();
    Ok(Value::map(result))
}

// -- hierarchy --------------------------------------------------------------

pub fn make_hierarchy(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("make-hierarchy", args, 0)?;
    Ok(multimethod::make_hierarchy())
}

fn global_hierarchy(interp: &Interp) -> Result<Value> {
    let var = interp.core_var(GLOBAL_HIERARCHY)?;
    var.root()
}

/// (derive tag parent) mutates the global hierarchy; (derive h tag
/// parent) is pure.
pub fn derive(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("derive", args, 2, 3)?;
    if args.len() == 2 {
        let h = global_hierarchy(interp)?;
        let updated = multimethod::derive(&h, &args[0], &args[1])?;
        interp.core_var(GLOBAL_HIERARCHY)?.bind_root(updated);
        Ok(Value::Nil)
    } else {
        multimethod::derive(&args[0], &args[1], &args[2])
    }
}

pub fn underive(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("underive", args, 2, 3)?;
    if args.len() == 2 {
        let h = global_hierarchy(interp)?;
        let updated = multimethod::underive(&h, &args[0], &args[1])?;
        interp.core_var(GLOBAL_HIERARCHY)?.bind_root(updated);
        Ok(Value::Nil)
    } else {
        multimethod::underive(&args[0], &args[1], &args[2])
    }
}

pub fn isa_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("isa?", args, 2, 3)?;
    let (hierarchy, child, parent) = if args.len() == 3 {
        (args[0].clone(), &args[1], &args[2])
    } else {
        (global_hierarchy(interp)?, &args[0], &args[1])
    };
    Ok(Value::Bool(multimethod::isa(
        interp, &hierarchy, child, parent,
    )?))
}

fn tag_set(tags: Vec<Value>) -> Value {
    if tags.is_empty() {
        Value::Nil
    } else {
        Value::set(ruse_core::PersistentSet::from_items(tags))
    }
}

pub fn parents(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("parents", args, 1, 2)?;
    let (hierarchy, tag) = if args.len() == 2 {
        (args[0].clone(), &args[1])
    } else {
        (global_hierarchy(interp)?, &args[0])
    };
    Ok(tag_set(multimethod::parents_of(&hierarchy, tag)))
}

pub fn ancestors(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("ancestors", args, 1, 2)?;
    let (hierarchy, tag) = if args.len() == 2 {
        (args[0].clone(), &args[1])
    } else {
        (global_hierarchy(interp)?, &args[0])
    };
    Ok(tag_set(multimethod::ancestors_of(&hierarchy, tag)))
}

pub fn descendants(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("descendants", args, 1, 2)?;
    let (hierarchy, tag) = if args.len() == 2 {
        (args[0].clone(), &args[1])
    } else {
        (global_hierarchy(interp)?, &args[0])
    };
    Ok(tag_set(multimethod::descendants_of(&hierarchy, tag)))
}

// -- macros -----------------------------------------------------------------

/// (defmulti name dispatch-fn options...) lowers to
/// (def name (-make-multi 'name dispatch-fn options...)).
pub fn defmulti_macro(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("defmulti", args, 2)?;
    let name = args[0].expect_symbol("defmulti")?;
    let mut make = vec![
        Value::simple_symbol("-make-multi"),
        Value::list_from(vec![
            Value::simple_symbol("quote"),
            Value::simple_symbol(&name.name),
        ]),
        args[1].clone(),
    ];
    make.extend(args[2..].iter().cloned());
    Ok(Value::list_from(vec![
        Value::simple_symbol("def"),
        Value::simple_symbol(&name.name),
        Value::list_from(make),
    ]))
}

/// (defmethod multifn dispatch-value [params] body...) lowers to
/// (-add-method multifn dispatch-value (fn [params] body...)).
pub fn defmethod_macro(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("defmethod", args, 3)?;
    let mut fn_form = vec![Value::simple_symbol("fn")];
    fn_form.extend(args[2..].iter().cloned());
    Ok(Value::list_from(vec![
        Value::simple_symbol("-add-method"),
        args[0].clone(),
        args[1].clone(),
        Value::list_from(fn_form),
    ]))
}
