//! Collection builtins: constructors, access, update, transients
//!
//! Transient builders live in an Option slot; persistent! takes the
//! builder out, and every later operation on the consumed cell is a
//! value-error.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::support::{
    assoc_value, conj_value, exact_arity, get_value, map_from_flat, min_arity, range_arity,
};
use crate::value::{TransientCell, Value};
use ruse_core::{PersistentMap, PersistentSet, PersistentVector};

pub fn list(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    Ok(Value::list_from(args.to_vec()))
}

pub fn vector(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    Ok(Value::vector_from(args.to_vec()))
}

pub fn vec(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("vec", args, 1)?;
    match &args[0] {
        Value::Vector(_) => Ok(args[0].clone()),
        Value::Nil => Ok(Value::vector_from(Vec::new())),
        other => Ok(Value::vector_from(interp.seq_to_vec(other)?)),
    }
}

pub fn hash_map(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    map_from_flat("hash-map", args)
}

pub fn array_map(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    map_from_flat("array-map", args)
}

pub fn hash_set(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    Ok(Value::set(PersistentSet::from_items(args.to_vec())))
}

/// (set coll) - a set of the collection's elements.
pub fn set(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("set", args, 1)?;
    let items = match &args[0] {
        Value::Nil => Vec::new(),
        other => interp.seq_to_vec(other)?,
    };
    Ok(Value::set(PersistentSet::from_items(items)))
}

pub fn conj(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Ok(Value::vector_from(Vec::new()));
    }
    let mut coll = args[0].clone();
    for item in &args[1..] {
        coll = conj_value(interp, &coll, item.clone())?;
    }
    Ok(coll)
}

pub fn cons(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("cons", args, 2)?;
    Ok(interp.cons_value(args[0].clone(), args[1].clone()))
}

pub fn count(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("count", args, 1)?;
    Ok(Value::Int(interp.count_value(&args[0])? as i64))
}

pub fn nth(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("nth", args, 2, 3)?;
    let i = args[1].expect_int("nth")?;
    interp.nth_value(&args[0], i, args.get(2).cloned())
}

pub fn get(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("get", args, 2, 3)?;
    get_value(&args[0], &args[1], args.get(2).cloned().unwrap_or(Value::Nil))
}

pub fn assoc(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("assoc", args, 3)?;
    if args.len() % 2 != 1 {
        return Err(Error::value("assoc: expected key/value pairs"));
    }
    let mut coll = args[0].clone();
    for kv in args[1..].chunks(2) {
        coll = assoc_value(&coll, kv[0].clone(), kv[1].clone())?;
    }
    Ok(coll)
}

pub fn dissoc(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("dissoc", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(m) => {
            let mut entries = m.entries.clone();
            for k in &args[1..] {
                entries = entries.dissoc(k);
            }
            Ok(Value::map(entries))
        }
        other => Err(Error::type_err("dissoc", "a map", other)),
    }
}

pub fn disj(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("disj", args, 1)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Set(s) => {
            let mut items = s.items.clone();
            for k in &args[1..] {
                items = items.disj(k);
            }
            Ok(Value::set(items))
        }
        other => Err(Error::type_err("disj", "a set", other)),
    }
}

pub fn contains_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("contains?", args, 2)?;
    let found = match &args[0] {
        Value::Map(m) => m.entries.contains_key(&args[1]),
        Value::Set(s) => s.items.contains(&args[1]),
        Value::Vector(v) => match &args[1] {
            Value::Int(i) => *i >= 0 && (*i as usize) < v.items.len(),
            _ => false,
        },
        Value::Str(s) => match &args[1] {
            Value::Int(i) => *i >= 0 && (*i as usize) < s.chars().count(),
            _ => false,
        },
        Value::Nil => false,
        other => return Err(Error::type_err("contains?", "an associative collection", other)),
    };
    Ok(Value::Bool(found))
}

pub fn find(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("find", args, 2)?;
    match &args[0] {
        Value::Map(m) => Ok(match m.entries.get(&args[1]) {
            Some(v) => Value::vector_from(vec![args[1].clone(), v.clone()]),
            None => Value::Nil,
        }),
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::type_err("find", "a map", other)),
    }
}

pub fn keys(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("keys", args, 1)?;
    match &args[0] {
        Value::Map(m) => {
            let ks: Vec<Value> = m.entries.iter().map(|(k, _)| k.clone()).collect();
            Ok(if ks.is_empty() {
                Value::Nil
            } else {
                Value::list_from(ks)
            })
        }
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::type_err("keys", "a map", other)),
    }
}

pub fn vals(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("vals", args, 1)?;
    match &args[0] {
        Value::Map(m) => {
            let vs: Vec<Value> = m.entries.iter().map(|(_, v)| v.clone()).collect();
            Ok(if vs.is_empty() {
                Value::Nil
            } else {
                Value::list_from(vs)
            })
        }
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::type_err("vals", "a map", other)),
    }
}

/// peek: last of a vector, first of a list.
pub fn peek(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("peek", args, 1)?;
    match &args[0] {
        Value::Vector(v) => Ok(v.items.last().cloned().unwrap_or(Value::Nil)),
        Value::List(l) => Ok(l.items.first().cloned().unwrap_or(Value::Nil)),
        Value::Nil => Ok(Value::Nil),
        other => Err(Error::type_err("peek", "a vector or list", other)),
    }
}

/// pop: drop-last of a vector, rest of a list; empty is an error.
pub fn pop(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("pop", args, 1)?;
    match &args[0] {
        Value::Vector(v) => v
            .items
            .pop()
            .map(Value::vector)
            .ok_or_else(|| Error::value("pop: empty vector")),
        Value::List(l) => {
            if l.items.is_empty() {
                Err(Error::value("pop: empty list"))
            } else {
                Ok(Value::list(l.items.rest()))
            }
        }
        other => Err(Error::type_err("pop", "a vector or list", other)),
    }
}

pub fn subvec(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("subvec", args, 2, 3)?;
    let v = match &args[0] {
        Value::Vector(v) => v,
        other => return Err(Error::type_err("subvec", "a vector", other)),
    };
    let start = args[1].expect_int("subvec")?;
    let end = match args.get(2) {
        Some(e) => e.expect_int("subvec")?,
        None => v.items.len() as i64,
    };
    if start < 0 || end < start || end as usize > v.items.len() {
        return Err(Error::index(start, v.items.len()));
    }
    let mut items = Vec::with_capacity((end - start) as usize);
    for i in start..end {
        items.push(v.items.get(i as usize).cloned().unwrap_or(Value::Nil));
    }
    Ok(Value::vector_from(items))
}

/// empty: the same collection type with no elements.
pub fn empty(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("empty", args, 1)?;
    Ok(match &args[0] {
        Value::List(_) | Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
            Value::empty_list()
        }
        Value::Vector(_) => Value::vector(PersistentVector::new()),
        Value::Map(_) => Value::map(PersistentMap::new()),
        Value::Set(_) => Value::set(PersistentSet::new()),
        _ => Value::Nil,
    })
}

pub fn empty_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("empty?", args, 1)?;
    Ok(Value::Bool(matches!(interp.seq(&args[0])?, Value::Nil)))
}

pub fn not_empty(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("not-empty", args, 1)?;
    if matches!(interp.seq(&args[0])?, Value::Nil) {
        Ok(Value::Nil)
    } else {
        Ok(args[0].clone())
    }
}

pub fn merge(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    let mut entries: Option<PersistentMap<Value, Value>> = None;
    for arg in args {
        match arg {
            Value::Nil => {}
            Value::Map(m) => {
                let mut acc = entries.unwrap_or_default();
                for (k, v) in m.entries.iter() {
                    acc = acc.assoc(k.clone(), v.clone());
                }
                entries = Some(acc);
            }
            other => return Err(Error::type_err("merge", "a map", other)),
        }
    }
    Ok(entries.map(Value::map).unwrap_or(Value::Nil))
}

pub fn select_keys(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("select-keys", args, 2)?;
    let mut out = PersistentMap::new();
    let wanted = interp.seq_to_vec(&args[1])?;
    if let Value::Map(m) = &args[0] {
        for k in wanted {
            if let Some(v) = m.entries.get(&k) {
                out = out.assoc(k, v.clone());
            }
        }
    }
    Ok(Value::map(out))
}

pub fn zipmap(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("zipmap", args, 2)?;
    let ks = interp.seq_to_vec(&args[0])?;
    let vs = interp.seq_to_vec(&args[1])?;
    let mut entries = PersistentMap::new();
    for (k, v) in ks.into_iter().zip(vs) {
        entries = entries.assoc(k, v);
    }
    Ok(Value::map(entries))
}

pub fn get_in(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("get-in", args, 2, 3)?;
    let path = interp.seq_to_vec(&args[1])?;
    let mut current = args[0].clone();
    for key in path {
        current = get_value(&current, &key, Value::Nil)?;
        if matches!(current, Value::Nil) {
            break;
        }
    }
    if matches!(current, Value::Nil) {
        Ok(args.get(2).cloned().unwrap_or(Value::Nil))
    } else {
        Ok(current)
    }
}

pub fn assoc_in(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("assoc-in", args, 3)?;
    let path = interp.seq_to_vec(&args[1])?;
    if path.is_empty() {
        return Err(Error::value("assoc-in: empty key path"));
    }
    assoc_in_path(&args[0], &path, args[2].clone())
}

fn assoc_in_path(coll: &Value, path: &[Value], value: Value) -> Result<Value> {
    if path.len() == 1 {
        return assoc_value(coll, path[0].clone(), value);
    }
    let inner = get_value(coll, &path[0], Value::Nil)?;
    let updated = assoc_in_path(&inner, &path[1..], value)?;
    assoc_value(coll, path[0].clone(), updated)
}

pub fn update(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("update", args, 3)?;
    let old = get_value(&args[0], &args[1], Value::Nil)?;
    let mut call_args = vec![old];
    call_args.extend(args[3..].iter().cloned());
    let f = args[2].clone();
    let new = interp.apply(&f, call_args)?;
    assoc_value(&args[0], args[1].clone(), new)
}

pub fn update_in(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("update-in", args, 3)?;
    let path = interp.seq_to_vec(&args[1])?;
    if path.is_empty() {
        return Err(Error::value("update-in: empty key path"));
    }
    let old = {
        let mut current = args[0].clone();
        for key in &path {
            current = get_value(&current, key, Value::Nil)?;
        }
        current
    };
    let mut call_args = vec![old];
    call_args.extend(args[3..].iter().cloned());
    let f = args[2].clone();
    let new = interp.apply(&f, call_args)?;
    assoc_in_path(&args[0], &path, new)
}

// -- transients -------------------------------------------------------------

pub fn transient(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("transient", args, 1)?;
    Ok(match &args[0] {
        Value::Vector(v) => {
            Value::TransientVector(Rc::new(TransientCell::new(v.items.transient())))
        }
        Value::Map(m) => Value::TransientMap(Rc::new(TransientCell::new(m.entries.transient()))),
        Value::Set(s) => Value::TransientSet(Rc::new(TransientCell::new(s.items.transient()))),
        other => return Err(Error::type_err("transient", "a vector, map, or set", other)),
    })
}

fn consumed() -> Error {
    Error::value("transient used after persistent!")
}

pub fn persistent_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("persistent!", args, 1)?;
    match &args[0] {
        Value::TransientVector(t) => {
            let builder = t.builder.borrow_mut().take().ok_or_else(consumed)?;
            Ok(Value::vector(builder.persistent()))
        }
        Value::TransientMap(t) => {
            let builder = t.builder.borrow_mut().take().ok_or_else(consumed)?;
            Ok(Value::map(builder.persistent()))
        }
        Value::TransientSet(t) => {
            let builder = t.builder.borrow_mut().take().ok_or_else(consumed)?;
            Ok(Value::set(builder.persistent()))
        }
        other => Err(Error::type_err("persistent!", "a transient", other)),
    }
}

pub fn conj_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("conj!", args, 1)?;
    match &args[0] {
        Value::TransientVector(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for item in &args[1..] {
                builder.push(item.clone());
            }
        }
        Value::TransientSet(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for item in &args[1..] {
                builder.conj(item.clone());
            }
        }
        Value::TransientMap(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for item in &args[1..] {
                match item {
                    Value::Vector(pair) if pair.items.len() == 2 => {
                        let k = pair.items.get(0).cloned().unwrap_or(Value::Nil);
                        let v = pair.items.get(1).cloned().unwrap_or(Value::Nil);
                        builder.assoc(k, v);
                    }
                    other => {
                        return Err(Error::type_err("conj!", "a [key value] entry", other))
                    }
                }
            }
        }
        other => return Err(Error::type_err("conj!", "a transient", other)),
    }
    Ok(args[0].clone())
}

pub fn assoc_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("assoc!", args, 3)?;
    if args.len() % 2 != 1 {
        return Err(Error::value("assoc!: expected key/value pairs"));
    }
    match &args[0] {
        Value::TransientMap(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for kv in args[1..].chunks(2) {
                builder.assoc(kv[0].clone(), kv[1].clone());
            }
        }
        Value::TransientVector(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for kv in args[1..].chunks(2) {
                let i = kv[0].expect_int("assoc!")?;
                if i < 0 || !builder.assoc(i as usize, kv[1].clone()) {
                    return Err(Error::index(i, builder.len()));
                }
            }
        }
        other => return Err(Error::type_err("assoc!", "a transient map or vector", other)),
    }
    Ok(args[0].clone())
}

pub fn dissoc_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("dissoc!", args, 1)?;
    match &args[0] {
        Value::TransientMap(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for k in &args[1..] {
                builder.dissoc(k);
            }
            Ok(args[0].clone())
        }
        other => Err(Error::type_err("dissoc!", "a transient map", other)),
    }
}

pub fn disj_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("disj!", args, 1)?;
    match &args[0] {
        Value::TransientSet(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            for k in &args[1..] {
                builder.disj(k);
            }
            Ok(args[0].clone())
        }
        other => Err(Error::type_err("disj!", "a transient set", other)),
    }
}

pub fn pop_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("pop!", args, 1)?;
    match &args[0] {
        Value::TransientVector(t) => {
            let mut slot = t.builder.borrow_mut();
            let builder = slot.as_mut().ok_or_else(consumed)?;
            builder
                .pop()
                .ok_or_else(|| Error::value("pop!: empty transient vector"))?;
            Ok(args[0].clone())
        }
        other => Err(Error::type_err("pop!", "a transient vector", other)),
    }
}
