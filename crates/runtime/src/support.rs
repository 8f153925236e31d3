//! Shared helpers for builtin implementations

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::value::Value;
use ruse_core::{PersistentList, PersistentMap};
use std::rc::Rc;

pub(crate) fn exact_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::arity(name, args.len()));
    }
    Ok(())
}

pub(crate) fn min_arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() < n {
        return Err(Error::arity(name, args.len()));
    }
    Ok(())
}

pub(crate) fn range_arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(Error::arity(name, args.len()));
    }
    Ok(())
}

/// conj semantics per collection type: lists prepend, vectors append,
/// maps take [k v] entries or merge maps, sets add.
pub(crate) fn conj_value(interp: &mut Interp, coll: &Value, item: Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::list(PersistentList::new().cons(item))),
        Value::List(l) => Ok(Value::list(l.items.cons(item))),
        Value::Vector(v) => Ok(Value::vector(v.items.push(item))),
        Value::Set(s) => Ok(Value::set(s.items.conj(item))),
        Value::Map(m) => match &item {
            Value::Vector(pair) if pair.items.len() == 2 => {
                let k = pair.items.get(0).cloned().unwrap_or(Value::Nil);
                let v = pair.items.get(1).cloned().unwrap_or(Value::Nil);
                Ok(Value::map(m.entries.assoc(k, v)))
            }
            Value::Map(other) => {
                let mut entries = m.entries.clone();
                for (k, v) in other.entries.iter() {
                    entries = entries.assoc(k.clone(), v.clone());
                }
                Ok(Value::map(entries))
            }
            other => Err(Error::type_err(
                "conj",
                "a [key value] entry for a map",
                other,
            )),
        },
        Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
            Ok(interp.cons_value(item, coll.clone()))
        }
        other => Err(Error::type_err("conj", "a collection", other)),
    }
}

/// get semantics: maps by key, sets by membership, vectors/strings by
/// index, transients supported, anything else misses.
pub(crate) fn get_value(coll: &Value, key: &Value, default: Value) -> Result<Value> {
    match coll {
        Value::Map(m) => Ok(m.entries.get(key).cloned().unwrap_or(default)),
        Value::Set(s) => Ok(if s.items.contains(key) {
            key.clone()
        } else {
            default
        }),
        Value::Vector(v) => match key {
            Value::Int(i) if *i >= 0 => {
                Ok(v.items.get(*i as usize).cloned().unwrap_or(default))
            }
            _ => Ok(default),
        },
        Value::Str(s) => match key {
            Value::Int(i) if *i >= 0 => Ok(s
                .chars()
                .nth(*i as usize)
                .map(Value::Char)
                .unwrap_or(default)),
            _ => Ok(default),
        },
        Value::TransientMap(t) => match &*t.builder.borrow() {
            Some(builder) => Ok(builder.get(key).cloned().unwrap_or(default)),
            None => Err(Error::value("transient used after persistent!")),
        },
        Value::TransientVector(t) => match &*t.builder.borrow() {
            Some(builder) => match key {
                Value::Int(i) if *i >= 0 => {
                    Ok(builder.get(*i as usize).cloned().unwrap_or(default))
                }
                _ => Ok(default),
            },
            None => Err(Error::value("transient used after persistent!")),
        },
        Value::TransientSet(t) => match &*t.builder.borrow() {
            Some(builder) => Ok(if builder.contains(key) {
                key.clone()
            } else {
                default
            }),
            None => Err(Error::value("transient used after persistent!")),
        },
        _ => Ok(default),
    }
}

pub(crate) fn assoc_value(coll: &Value, key: Value, value: Value) -> Result<Value> {
    match coll {
        Value::Nil => Ok(Value::map(PersistentMap::from_pairs(vec![(key, value)]))),
        Value::Map(m) => Ok(Value::map(m.entries.assoc(key, value))),
        Value::Vector(v) => {
            let i = key.expect_int("assoc on a vector")?;
            if i < 0 {
                return Err(Error::index(i, v.items.len()));
            }
            match v.items.assoc(i as usize, value) {
                Some(updated) => Ok(Value::vector(updated)),
                None => Err(Error::index(i, v.items.len())),
            }
        }
        other => Err(Error::type_err("assoc", "a map or vector", other)),
    }
}

/// Build a map from flat key/value arguments.
pub(crate) fn map_from_flat(name: &str, args: &[Value]) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::value(format!(
            "{}: expected an even number of arguments, got {}",
            name,
            args.len()
        )));
    }
    let mut entries = PersistentMap::new();
    for kv in args.chunks(2) {
        entries = entries.assoc(kv[0].clone(), kv[1].clone());
    }
    Ok(Value::map(entries))
}

pub(crate) fn make_builtin(
    name: &'static str,
    func: crate::value::BuiltinImpl,
) -> Value {
    Value::Builtin(Rc::new(crate::value::BuiltinFn { name, func }))
}
