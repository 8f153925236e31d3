//! Strict sequence builtins
//!
//! The lazy half of the seq library (map, filter, range, take, ...) is
//! defined in the embedded prelude over lazy-seq; these are the strict
//! primitives the prelude and the syntax-quote expansion build on.
//! reduce honors the Reduced wrapper for early termination.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::seq::{ArrayChunk, ChunkBufferCell, ChunkedConsVal, LazySeq, CHUNK_SIZE};
use crate::support::{conj_value, exact_arity, min_arity, range_arity};
use crate::value::Value;

pub fn seq(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("seq", args, 1)?;
    interp.seq(&args[0])
}

pub fn first(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("first", args, 1)?;
    interp.first(&args[0])
}

pub fn rest(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("rest", args, 1)?;
    interp.rest(&args[0])
}

pub fn next(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("next", args, 1)?;
    interp.next(&args[0])
}

pub fn second(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("second", args, 1)?;
    let rest = interp.rest(&args[0])?;
    interp.first(&rest)
}

pub fn last(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("last", args, 1)?;
    match &args[0] {
        Value::Vector(v) => Ok(v.items.last().cloned().unwrap_or(Value::Nil)),
        other => {
            let items = interp.seq_to_vec(other)?;
            Ok(items.last().cloned().unwrap_or(Value::Nil))
        }
    }
}

pub fn butlast(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("butlast", args, 1)?;
    let mut items = interp.seq_to_vec(&args[0])?;
    if items.len() <= 1 {
        return Ok(Value::Nil);
    }
    items.pop();
    Ok(Value::list_from(items))
}

pub fn reverse(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("reverse", args, 1)?;
    let mut items = interp.seq_to_vec(&args[0])?;
    items.reverse();
    Ok(Value::list_from(items))
}

/// Eager concatenation of any number of seqables.
pub fn concat(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut out = Vec::new();
    for arg in args {
        if matches!(arg, Value::Nil) {
            continue;
        }
        out.extend(interp.seq_to_vec(arg)?);
    }
    Ok(Value::list_from(out))
}

pub fn into(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("into", args, 1, 2)?;
    let to = args.first().cloned().unwrap_or(Value::Nil);
    let Some(from) = args.get(1) else {
        return Ok(to);
    };
    let items = interp.seq_to_vec(from)?;
    let mut coll = to;
    for item in items {
        coll = conj_value(interp, &coll, item)?;
    }
    Ok(coll)
}

pub fn apply(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("apply", args, 2)?;
    let f = args[0].clone();
    let mut call_args: Vec<Value> = args[1..args.len() - 1].to_vec();
    call_args.extend(interp.seq_to_vec(&args[args.len() - 1])?);
    interp.apply(&f, call_args)
}

pub fn reduce(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("reduce", args, 2, 3)?;
    let f = args[0].clone();
    let (mut acc, items) = if args.len() == 2 {
        let items = interp.seq_to_vec(&args[1])?;
        match items.split_first() {
            None => return interp.apply(&f, vec![]),
            Some((first, rest)) => (first.clone(), rest.to_vec()),
        }
    } else {
        (args[1].clone(), interp.seq_to_vec(&args[2])?)
    };
    for item in items {
        acc = interp.apply(&f, vec![acc, item])?;
        if let Value::Reduced(inner) = &acc {
            return Ok((**inner).clone());
        }
    }
    Ok(acc)
}

pub fn reduce_kv(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("reduce-kv", args, 3)?;
    let f = args[0].clone();
    let mut acc = args[1].clone();
    let entries: Vec<(Value, Value)> = match &args[2] {
        Value::Map(m) => m.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Vector(v) => v
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (Value::Int(i as i64), item.clone()))
            .collect(),
        Value::Nil => Vec::new(),
        other => return Err(Error::type_err("reduce-kv", "a map or vector", other)),
    };
    for (k, v) in entries {
        acc = interp.apply(&f, vec![acc, k, v])?;
        if let Value::Reduced(inner) = &acc {
            return Ok((**inner).clone());
        }
    }
    Ok(acc)
}

pub fn reduced(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reduced", args, 1)?;
    Ok(Value::Reduced(Rc::new(args[0].clone())))
}

pub fn reduced_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reduced?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Reduced(_))))
}

pub fn ensure_reduced(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("ensure-reduced", args, 1)?;
    Ok(match &args[0] {
        Value::Reduced(_) => args[0].clone(),
        other => Value::Reduced(Rc::new(other.clone())),
    })
}

pub fn unreduced(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("unreduced", args, 1)?;
    Ok(match &args[0] {
        Value::Reduced(inner) => (**inner).clone(),
        other => other.clone(),
    })
}

// -- ordering ---------------------------------------------------------------

/// Total order over the comparable scalar subset.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Result<Ordering> {
    let ord = match (a, b) {
        (Value::Nil, Value::Nil) => Some(Ordering::Equal),
        (Value::Nil, _) => Some(Ordering::Less),
        (_, Value::Nil) => Some(Ordering::Greater),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Char(x), Value::Char(y)) => Some(x.cmp(y)),
        (Value::Keyword(x), Value::Keyword(y)) => {
            Some((x.ns.as_deref(), &*x.name).cmp(&(y.ns.as_deref(), &*y.name)))
        }
        (Value::Symbol(x), Value::Symbol(y)) => {
            Some((x.ns.as_deref(), &*x.name).cmp(&(y.ns.as_deref(), &*y.name)))
        }
        (Value::Vector(x), Value::Vector(y)) => {
            let mut ord = Ordering::Equal;
            for (xa, ya) in x.items.iter().zip(y.items.iter()) {
                ord = compare_values(xa, ya)?;
                if ord != Ordering::Equal {
                    break;
                }
            }
            Some(if ord == Ordering::Equal {
                x.items.len().cmp(&y.items.len())
            } else {
                ord
            })
        }
        _ if a.is_number() && b.is_number() => {
            let x = a.expect_number("compare")?;
            let y = b.expect_number("compare")?;
            x.partial_cmp(&y)
        }
        _ => None,
    };
    ord.ok_or_else(|| {
        Error::value(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))
    })
}

pub fn compare(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("compare", args, 2)?;
    Ok(Value::Int(match compare_values(&args[0], &args[1])? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

fn sort_with(
    interp: &mut Interp,
    comparator: Option<Value>,
    mut items: Vec<Value>,
) -> Result<Vec<Value>> {
    // Insertion-friendly explicit sort so comparator errors can
    // propagate (sort_by with a fallible key would otherwise panic).
    let mut error = None;
    items.sort_by(|a, b| {
        if error.is_some() {
            return Ordering::Equal;
        }
        let ord = match &comparator {
            None => compare_values(a, b),
            Some(f) => interp
                .apply(&f.clone(), vec![a.clone(), b.clone()])
                .and_then(|v| match v {
                    Value::Int(n) => Ok(n.cmp(&0)),
                    Value::Bool(true) => Ok(Ordering::Less),
                    Value::Bool(false) => Ok(Ordering::Greater),
                    other => Err(Error::type_err("sort", "an int or bool comparator result", &other)),
                }),
        };
        match ord {
            Ok(o) => o,
            Err(e) => {
                error = Some(e);
                Ordering::Equal
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(items),
    }
}

pub fn sort(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("sort", args, 1, 2)?;
    let (comparator, coll) = if args.len() == 2 {
        (Some(args[0].clone()), &args[1])
    } else {
        (None, &args[0])
    };
    let items = interp.seq_to_vec(coll)?;
    Ok(Value::list_from(sort_with(interp, comparator, items)?))
}

pub fn sort_by(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("sort-by", args, 2, 3)?;
    let keyfn = args[0].clone();
    let (comparator, coll) = if args.len() == 3 {
        (Some(args[1].clone()), &args[2])
    } else {
        (None, &args[1])
    };
    let items = interp.seq_to_vec(coll)?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let key = interp.apply(&keyfn, vec![item.clone()])?;
        keyed.push(Value::vector_from(vec![key, item]));
    }
    let sorted = match comparator {
        None => sort_with(interp, None, keyed)?,
        Some(f) => {
            // Wrap the comparator to compare keys.
            let mut error = None;
            let mut keyed = keyed;
            keyed.sort_by(|a, b| {
                if error.is_some() {
                    return Ordering::Equal;
                }
                let (ka, kb) = match (a, b) {
                    (Value::Vector(x), Value::Vector(y)) => (
                        x.items.get(0).cloned().unwrap_or(Value::Nil),
                        y.items.get(0).cloned().unwrap_or(Value::Nil),
                    ),
                    _ => (Value::Nil, Value::Nil),
                };
                match interp.apply(&f.clone(), vec![ka, kb]).and_then(|v| match v {
                    Value::Int(n) => Ok(n.cmp(&0)),
                    Value::Bool(true) => Ok(Ordering::Less),
                    Value::Bool(false) => Ok(Ordering::Greater),
                    other => Err(Error::type_err(
                        "sort-by",
                        "an int or bool comparator result",
                        &other,
                    )),
                }) {
                    Ok(o) => o,
                    Err(e) => {
                        error = Some(e);
                        Ordering::Equal
                    }
                }
            });
            if let Some(e) = error {
                return Err(e);
            }
            keyed
        }
    };
    let out: Vec<Value> = sorted
        .into_iter()
        .map(|pair| match pair {
            Value::Vector(x) => x.items.get(1).cloned().unwrap_or(Value::Nil),
            _ => Value::Nil,
        })
        .collect();
    Ok(Value::list_from(out))
}

pub fn distinct(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("distinct", args, 1)?;
    let items = interp.seq_to_vec(&args[0])?;
    let mut seen = ruse_core::PersistentSet::new();
    let mut out = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen = seen.conj(item.clone());
            out.push(item);
        }
    }
    Ok(Value::list_from(out))
}

pub fn frequencies(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("frequencies", args, 1)?;
    let items = interp.seq_to_vec(&args[0])?;
    let mut counts = ruse_core::PersistentMap::new();
    for item in items {
        let n = match counts.get(&item) {
            Some(Value::Int(n)) => n + 1,
            _ => 1,
        };
        counts = counts.assoc(item, Value::Int(n));
    }
    Ok(Value::map(counts))
}

pub fn group_by(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("group-by", args, 2)?;
    let f = args[0].clone();
    let items = interp.seq_to_vec(&args[1])?;
    let mut groups = ruse_core::PersistentMap::new();
    for item in items {
        let key = interp.apply(&f, vec![item.clone()])?;
        let bucket = match groups.get(&key) {
            Some(Value::Vector(v)) => v.items.push(item),
            _ => ruse_core::PersistentVector::from_vec(vec![item]),
        };
        groups = groups.assoc(key, Value::vector(bucket));
    }
    Ok(Value::map(groups))
}

pub fn mapv(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("mapv", args, 2)?;
    let f = args[0].clone();
    let colls: Vec<Vec<Value>> = args[1..]
        .iter()
        .map(|c| interp.seq_to_vec(c))
        .collect::<Result<Vec<_>>>()?;
    let len = colls.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = colls.iter().map(|c| c[i].clone()).collect();
        out.push(interp.apply(&f, call_args)?);
    }
    Ok(Value::vector_from(out))
}

pub fn filterv(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("filterv", args, 2)?;
    let f = args[0].clone();
    let items = interp.seq_to_vec(&args[1])?;
    let mut out = Vec::new();
    for item in items {
        if interp.apply(&f, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::vector_from(out))
}

pub fn every_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("every?", args, 2)?;
    let f = args[0].clone();
    for item in interp.seq_to_vec(&args[1])? {
        if !interp.apply(&f, vec![item])?.is_truthy() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn not_every_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let all = every_p(interp, args)?;
    Ok(Value::Bool(!all.is_truthy()))
}

pub fn some(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("some", args, 2)?;
    let f = args[0].clone();
    for item in interp.seq_to_vec(&args[1])? {
        let result = interp.apply(&f, vec![item])?;
        if result.is_truthy() {
            return Ok(result);
        }
    }
    Ok(Value::Nil)
}

pub fn not_any_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let found = some(interp, args)?;
    Ok(Value::Bool(!found.is_truthy()))
}

pub fn interleave(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("interleave", args, 1)?;
    let colls: Vec<Vec<Value>> = args
        .iter()
        .map(|c| interp.seq_to_vec(c))
        .collect::<Result<Vec<_>>>()?;
    let len = colls.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len * colls.len());
    for i in 0..len {
        for coll in &colls {
            out.push(coll[i].clone());
        }
    }
    Ok(Value::list_from(out))
}

pub fn interpose(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("interpose", args, 2)?;
    let items = interp.seq_to_vec(&args[1])?;
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(args[0].clone());
        }
        out.push(item);
    }
    Ok(Value::list_from(out))
}

pub fn partition(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("partition", args, 2, 3)?;
    let n = args[0].expect_int("partition")?;
    if n <= 0 {
        return Err(Error::value("partition: size must be positive"));
    }
    let (step, coll) = if args.len() == 3 {
        (args[1].expect_int("partition")?, &args[2])
    } else {
        (n, &args[1])
    };
    if step <= 0 {
        return Err(Error::value("partition: step must be positive"));
    }
    let items = interp.seq_to_vec(coll)?;
    let mut out = Vec::new();
    let mut start = 0usize;
    while start + n as usize <= items.len() {
        out.push(Value::list_from(
            items[start..start + n as usize].to_vec(),
        ));
        start += step as usize;
    }
    Ok(Value::list_from(out))
}

/// Realize a lazy seq fully, returning it.
pub fn doall(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("doall", args, 1)?;
    let _ = interp.seq_to_vec(&args[0])?;
    Ok(args[0].clone())
}

/// Realize for side effects, returning nil.
pub fn dorun(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("dorun", args, 1)?;
    let _ = interp.seq_to_vec(&args[0])?;
    Ok(Value::Nil)
}

pub fn run_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("run!", args, 2)?;
    let f = args[0].clone();
    for item in interp.seq_to_vec(&args[1])? {
        interp.apply(&f, vec![item])?;
    }
    Ok(Value::Nil)
}

/// Internal constructor behind the lazy-seq macro: wraps a zero-arg fn.
pub fn lazy_seq_star(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("-lazy-seq", args, 1)?;
    Ok(Value::LazySeq(Rc::new(LazySeq::new(args[0].clone()))))
}

// -- chunk layer ------------------------------------------------------------

pub fn chunk_buffer(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk-buffer", args, 1)?;
    let capacity = args[0].expect_int("chunk-buffer")?;
    if capacity < 0 {
        return Err(Error::value("chunk-buffer: negative capacity"));
    }
    Ok(Value::ChunkBuffer(Rc::new(ChunkBufferCell::new(
        (capacity as usize).min(CHUNK_SIZE),
    ))))
}

pub fn chunk_append(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk-append", args, 2)?;
    match &args[0] {
        Value::ChunkBuffer(buf) => {
            buf.append(args[1].clone())?;
            Ok(Value::Nil)
        }
        other => Err(Error::type_err("chunk-append", "a chunk buffer", other)),
    }
}

pub fn chunk(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk", args, 1)?;
    match &args[0] {
        Value::ChunkBuffer(buf) => Ok(Value::Chunk(Rc::new(buf.finalize()?))),
        other => Err(Error::type_err("chunk", "a chunk buffer", other)),
    }
}

pub fn chunk_cons(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk-cons", args, 2)?;
    match &args[0] {
        Value::Chunk(chunk) => Ok(Value::ChunkedCons(Rc::new(ChunkedConsVal {
            chunk: chunk.clone(),
            rest: args[1].clone(),
            meta: None,
        }))),
        other => Err(Error::type_err("chunk-cons", "a chunk", other)),
    }
}

pub fn chunk_first(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk-first", args, 1)?;
    match &args[0] {
        Value::ChunkedCons(cc) => Ok(Value::Chunk(Rc::new(ArrayChunk::new(
            cc.chunk.items().to_vec(),
        )))),
        other => Err(Error::type_err("chunk-first", "a chunked cons", other)),
    }
}

pub fn chunk_rest(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunk-rest", args, 1)?;
    match &args[0] {
        Value::ChunkedCons(cc) => Ok(if matches!(cc.rest, Value::Nil) {
            Value::empty_list()
        } else {
            cc.rest.clone()
        }),
        other => Err(Error::type_err("chunk-rest", "a chunked cons", other)),
    }
}

pub fn chunk_next(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("chunk-next", args, 1)?;
    match &args[0] {
        Value::ChunkedCons(cc) => {
            let rest = cc.rest.clone();
            interp.seq(&rest)
        }
        other => Err(Error::type_err("chunk-next", "a chunked cons", other)),
    }
}

pub fn chunked_seq_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("chunked-seq?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::ChunkedCons(_))))
}
