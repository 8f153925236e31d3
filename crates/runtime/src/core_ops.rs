//! Core builtins: identity, predicates, naming, conversion
//!
//! The type predicates mirror the value model's discriminants; `str` is
//! the display-mode concatenation (nil prints as empty, strings raw).

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::printer;
use crate::support::{exact_arity, range_arity};
use crate::value::{Symbol, Value};
use std::rc::Rc;

pub fn identity(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("identity", args, 1)?;
    Ok(args[0].clone())
}

pub fn not(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

pub fn boolean(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("boolean", args, 1)?;
    Ok(Value::Bool(args[0].is_truthy()))
}

/// Display-mode concatenation: (str) is "", nil contributes nothing.
pub fn str_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        if matches!(arg, Value::Nil) {
            continue;
        }
        out.push_str(&printer::display_str(interp, arg)?);
    }
    Ok(Value::string(out))
}

pub fn subs(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("subs", args, 2, 3)?;
    let s = args[0].expect_str("subs")?;
    let chars: Vec<char> = s.chars().collect();
    let start = args[1].expect_int("subs")?;
    let end = match args.get(2) {
        Some(e) => e.expect_int("subs")?,
        None => chars.len() as i64,
    };
    if start < 0 || end < start || end as usize > chars.len() {
        return Err(Error::index(start, chars.len()));
    }
    let out: String = chars[start as usize..end as usize].iter().collect();
    Ok(Value::string(out))
}

pub fn name(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("name", args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Str(s.clone())),
        Value::Symbol(s) => Ok(Value::string(&*s.name)),
        Value::Keyword(k) => Ok(Value::string(&*k.name)),
        other => Err(Error::type_err("name", "a string, symbol, or keyword", other)),
    }
}

pub fn namespace(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("namespace", args, 1)?;
    let ns = match &args[0] {
        Value::Symbol(s) => s.ns.clone(),
        Value::Keyword(k) => k.ns.clone(),
        other => {
            return Err(Error::type_err("namespace", "a symbol or keyword", other))
        }
    };
    Ok(ns.map(|n| Value::string(&*n)).unwrap_or(Value::Nil))
}

pub fn symbol(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("symbol", args, 1, 2)?;
    if args.len() == 2 {
        let ns = args[0].expect_str("symbol")?;
        let name = args[1].expect_str("symbol")?;
        return Ok(Value::symbol(Symbol::qualified(ns, name)));
    }
    match &args[0] {
        Value::Symbol(_) => Ok(args[0].clone()),
        Value::Str(s) => Ok(Value::symbol(Symbol::parse(s))),
        Value::Keyword(k) => Ok(Value::Symbol(Rc::new(Symbol {
            ns: k.ns.clone(),
            name: k.name.clone(),
            meta: None,
        }))),
        other => Err(Error::type_err("symbol", "a string or keyword", other)),
    }
}

pub fn keyword(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("keyword", args, 1, 2)?;
    if args.len() == 2 {
        let ns = args[0].expect_str("keyword")?.to_string();
        let name = args[1].expect_str("keyword")?.to_string();
        return Ok(interp.intern_keyword(Some(&ns), &name));
    }
    match &args[0] {
        Value::Keyword(_) => Ok(args[0].clone()),
        Value::Str(s) => {
            let sym = Symbol::parse(s);
            let ns = sym.ns.as_deref().map(str::to_string);
            Ok(interp.intern_keyword(ns.as_deref(), &sym.name))
        }
        Value::Symbol(s) => {
            let ns = s.ns.as_deref().map(str::to_string);
            let name = s.name.to_string();
            Ok(interp.intern_keyword(ns.as_deref(), &name))
        }
        other => Err(Error::type_err("keyword", "a string or symbol", other)),
    }
}

/// Interning-table lookup without allocating.
pub fn find_keyword(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("find-keyword", args, 1, 2)?;
    let (ns, name) = if args.len() == 2 {
        (
            Some(args[0].expect_str("find-keyword")?.to_string()),
            args[1].expect_str("find-keyword")?.to_string(),
        )
    } else {
        match &args[0] {
            Value::Str(s) => {
                let sym = Symbol::parse(s);
                (sym.ns.as_deref().map(str::to_string), sym.name.to_string())
            }
            Value::Symbol(s) => (
                s.ns.as_deref().map(str::to_string),
                s.name.to_string(),
            ),
            other => return Err(Error::type_err("find-keyword", "a string or symbol", other)),
        }
    };
    Ok(interp
        .find_keyword(ns.as_deref(), &name)
        .unwrap_or(Value::Nil))
}

pub fn gensym(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("gensym", args, 0, 1)?;
    let prefix = match args.first() {
        Some(v) => v.expect_str("gensym")?.to_string(),
        None => "G__".to_string(),
    };
    Ok(Value::symbol(interp.gensym(&prefix)))
}

pub fn char_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("char", args, 1)?;
    match &args[0] {
        Value::Char(c) => Ok(Value::Char(*c)),
        Value::Int(n) => {
            let code = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    Error::arithmetic(format!("char: {} is not a valid codepoint", n))
                })?;
            Ok(Value::Char(code))
        }
        other => Err(Error::type_err("char", "an int or char", other)),
    }
}

pub fn hash(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("hash", args, 1)?;
    Ok(Value::Int(interp.hash_forcing(&args[0])? as i64))
}

/// Reference identity (or scalar sameness).
pub fn identical_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("identical?", args, 2)?;
    let same = match (&args[0], &args[1]) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
        (Value::Symbol(a), Value::Symbol(b)) => Rc::ptr_eq(a, b),
        (Value::Keyword(a), Value::Keyword(b)) => Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Vector(a), Value::Vector(b)) => Rc::ptr_eq(a, b),
        (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
        (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b),
        (Value::Atom(a), Value::Atom(b)) => Rc::ptr_eq(a, b),
        (Value::Fn(a), Value::Fn(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
        (Value::Var(a), Value::Var(b)) => Rc::ptr_eq(a, b),
        _ => false,
    };
    Ok(Value::Bool(same))
}

macro_rules! type_predicate {
    ($fn_name:ident, $builtin_name:literal, $pattern:pat) => {
        pub fn $fn_name(interp: &mut Interp, args: &[Value]) -> Result<Value> {
            let _ = interp;
            exact_arity($builtin_name, args, 1)?;
            Ok(Value::Bool(matches!(&args[0], $pattern)))
        }
    };
}

type_predicate!(nil_p, "nil?", Value::Nil);
type_predicate!(true_p, "true?", Value::Bool(true));
type_predicate!(false_p, "false?", Value::Bool(false));
type_predicate!(boolean_p, "boolean?", Value::Bool(_));
type_predicate!(string_p, "string?", Value::Str(_));
type_predicate!(char_p, "char?", Value::Char(_));
type_predicate!(symbol_p, "symbol?", Value::Symbol(_));
type_predicate!(keyword_p, "keyword?", Value::Keyword(_));
type_predicate!(list_p, "list?", Value::List(_));
type_predicate!(vector_p, "vector?", Value::Vector(_));
type_predicate!(map_p, "map?", Value::Map(_));
type_predicate!(set_p, "set?", Value::Set(_));
type_predicate!(var_p, "var?", Value::Var(_));
type_predicate!(delay_p, "delay?", Value::Delay(_));
type_predicate!(volatile_p, "volatile?", Value::Volatile(_));

pub fn some_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("some?", args, 1)?;
    Ok(Value::Bool(!matches!(args[0], Value::Nil)))
}

pub fn coll_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("coll?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::List(_) | Value::Vector(_) | Value::Map(_) | Value::Set(_) | Value::Cons(_)
            | Value::LazySeq(_)
            | Value::ChunkedCons(_)
    )))
}

pub fn seq_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("seq?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::List(_) | Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_)
    )))
}

pub fn sequential_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("sequential?", args, 1)?;
    Ok(Value::Bool(args[0].is_sequential()))
}

pub fn associative_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("associative?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Map(_) | Value::Vector(_)
    )))
}

pub fn counted_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("counted?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::List(_) | Value::Vector(_) | Value::Map(_) | Value::Set(_)
    )))
}

pub fn fn_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("fn?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Fn(_) | Value::Builtin(_) | Value::MultiFn(_) | Value::ProtocolFn(_)
    )))
}

/// Anything invokable, including keywords and collections.
pub fn ifn_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("ifn?", args, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Fn(_)
            | Value::Builtin(_)
            | Value::MultiFn(_)
            | Value::ProtocolFn(_)
            | Value::Keyword(_)
            | Value::Symbol(_)
            | Value::Map(_)
            | Value::Set(_)
            | Value::Vector(_)
            | Value::Var(_)
    )))
}

/// The value's runtime type as a keyword.
pub fn type_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("type", args, 1)?;
    Ok(interp.intern_keyword(None, args[0].type_name()))
}
