//! The seq protocol: seq/first/rest/next over every seqable
//!
//! Realizing a lazy seq may run user code (the thunk), so these live on
//! `Interp`. Vectors seq as chunked conses (32-element blocks straight
//! from the trie leaves); maps seq as [k v] entry vectors; strings as
//! chars.
//!
//! `rest` never forces the tail it returns; `next` is rest + seq, which
//! realizes exactly one more step.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::seq::{ArrayChunk, ChunkedConsVal, ConsVal, LazySeq};
use crate::value::{hash_value, Value};

impl Interp {
    /// nil for empty, otherwise a seq over the collection's elements.
    pub fn seq(&mut self, v: &Value) -> Result<Value> {
        match v {
            Value::Nil => Ok(Value::Nil),
            Value::List(l) => {
                if l.items.is_empty() {
                    Ok(Value::Nil)
                } else {
                    Ok(v.clone())
                }
            }
            Value::Cons(_) => Ok(v.clone()),
            Value::ChunkedCons(cc) => {
                if cc.chunk.is_empty() {
                    let rest = cc.rest.clone();
                    self.seq(&rest)
                } else {
                    Ok(v.clone())
                }
            }
            Value::LazySeq(ls) => {
                let ls = ls.clone();
                self.force_lazy(&ls)
            }
            Value::Vector(vec) => {
                if vec.items.is_empty() {
                    return Ok(Value::Nil);
                }
                // Chain the trie's 32-element blocks, last block first.
                let mut rest = Value::Nil;
                let mut starts = Vec::new();
                let mut i = 0;
                while i < vec.items.len() {
                    let (chunk, start) = vec.items.chunk_for(i);
                    starts.push(start);
                    i = start + chunk.len();
                }
                for start in starts.into_iter().rev() {
                    let (chunk, _) = vec.items.chunk_for(start);
                    rest = Value::ChunkedCons(Rc::new(ChunkedConsVal {
                        chunk: Rc::new(ArrayChunk::new(chunk.to_vec())),
                        rest,
                        meta: None,
                    }));
                }
                Ok(rest)
            }
            Value::Map(m) => {
                if m.entries.is_empty() {
                    return Ok(Value::Nil);
                }
                let entries: Vec<Value> = m
                    .entries
                    .iter()
                    .map(|(k, v)| Value::vector_from(vec![k.clone(), v.clone()]))
                    .collect();
                Ok(Value::list_from(entries))
            }
            Value::Set(s) => {
                if s.items.is_empty() {
                    return Ok(Value::Nil);
                }
                Ok(Value::list_from(s.items.iter().cloned().collect()))
            }
            Value::Str(s) => {
                if s.is_empty() {
                    return Ok(Value::Nil);
                }
                Ok(Value::list_from(s.chars().map(Value::Char).collect()))
            }
            other => Err(Error::type_err("seq", "a seqable collection", other)),
        }
    }

    /// Realize a lazy seq: run the thunk once, normalize through nested
    /// lazy seqs, memoize permanently.
    pub fn force_lazy(&mut self, ls: &Rc<LazySeq>) -> Result<Value> {
        if let Some(realized) = ls.realized_value() {
            return Ok(realized);
        }
        let thunk = ls.thunk.borrow_mut().take();
        let thunk = thunk.ok_or_else(|| {
            Error::eval("lazy-seq realization re-entered its own thunk")
        })?;
        let produced = self.apply(&thunk, vec![])?;
        let seq = self.seq(&produced)?;
        ls.set_realized(seq.clone());
        Ok(seq)
    }

    pub fn first(&mut self, v: &Value) -> Result<Value> {
        match self.seq(v)? {
            Value::Nil => Ok(Value::Nil),
            Value::List(l) => Ok(l.items.first().cloned().unwrap_or(Value::Nil)),
            Value::Cons(c) => Ok(c.first.clone()),
            Value::ChunkedCons(cc) => Ok(cc.chunk.nth(0).cloned().unwrap_or(Value::Nil)),
            other => Err(Error::eval(format!(
                "seq produced a non-seq {}",
                other.type_name()
            ))),
        }
    }

    /// The seq minus its first element; empty in, empty list out. Never
    /// forces the returned tail.
    pub fn rest(&mut self, v: &Value) -> Result<Value> {
        match self.seq(v)? {
            Value::Nil => Ok(Value::empty_list()),
            Value::List(l) => Ok(Value::list(l.items.rest())),
            Value::Cons(c) => {
                if matches!(c.rest, Value::Nil) {
                    Ok(Value::empty_list())
                } else {
                    Ok(c.rest.clone())
                }
            }
            Value::ChunkedCons(cc) => {
                if cc.chunk.len() > 1 {
                    Ok(Value::ChunkedCons(Rc::new(ChunkedConsVal {
                        chunk: Rc::new(cc.chunk.drop_first()),
                        rest: cc.rest.clone(),
                        meta: None,
                    })))
                } else if matches!(cc.rest, Value::Nil) {
                    Ok(Value::empty_list())
                } else {
                    Ok(cc.rest.clone())
                }
            }
            other => Err(Error::eval(format!(
                "seq produced a non-seq {}",
                other.type_name()
            ))),
        }
    }

    /// rest + seq: nil when exhausted, otherwise a non-empty seq.
    pub fn next(&mut self, v: &Value) -> Result<Value> {
        let rest = self.rest(v)?;
        self.seq(&rest)
    }

    /// Fully realize a seqable into a Vec. Diverges on infinite seqs, as
    /// eager consumption must.
    pub fn seq_to_vec(&mut self, v: &Value) -> Result<Vec<Value>> {
        // Fast paths that avoid building seq cells.
        match v {
            Value::Vector(vec) => return Ok(vec.items.iter().cloned().collect()),
            Value::List(l) => return Ok(l.items.iter().cloned().collect()),
            _ => {}
        }
        let mut out = Vec::new();
        let mut cur = self.seq(v)?;
        loop {
            match cur {
                Value::Nil => return Ok(out),
                Value::List(ref l) => {
                    out.extend(l.items.iter().cloned());
                    return Ok(out);
                }
                Value::Cons(ref c) => {
                    out.push(c.first.clone());
                    let rest = c.rest.clone();
                    cur = self.seq(&rest)?;
                }
                Value::ChunkedCons(ref cc) => {
                    out.extend(cc.chunk.items().iter().cloned());
                    let rest = cc.rest.clone();
                    cur = self.seq(&rest)?;
                }
                ref other => {
                    return Err(Error::eval(format!(
                        "seq produced a non-seq {}",
                        other.type_name()
                    )))
                }
            }
        }
    }

    /// Realize at most `n` elements of a seqable. Used by the printer so
    /// a *print-length* limit bounds realization of infinite seqs.
    pub fn seq_take(&mut self, v: &Value, n: usize) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut cur = self.seq(v)?;
        while !matches!(cur, Value::Nil) && out.len() < n {
            out.push(self.first(&cur)?);
            let rest = self.rest(&cur)?;
            cur = self.seq(&rest)?;
        }
        Ok(out)
    }

    /// Element count; O(1) for counted collections, realizes seqs.
    pub fn count_value(&mut self, v: &Value) -> Result<usize> {
        match v {
            Value::Nil => Ok(0),
            Value::List(l) => Ok(l.items.len()),
            Value::Vector(vec) => Ok(vec.items.len()),
            Value::Map(m) => Ok(m.entries.len()),
            Value::Set(s) => Ok(s.items.len()),
            Value::Str(s) => Ok(s.chars().count()),
            Value::Chunk(c) => Ok(c.len()),
            Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
                Ok(self.seq_to_vec(v)?.len())
            }
            other => Err(Error::type_err("count", "a countable collection", other)),
        }
    }

    /// Language-level `=`: like the pure PartialEq but realizes lazy
    /// seqs, so `(= (map inc [1 2]) [2 3])` holds.
    pub fn equiv(&mut self, a: &Value, b: &Value) -> Result<bool> {
        let a_seqish = a.is_sequential();
        let b_seqish = b.is_sequential();
        if a_seqish && b_seqish {
            let mut left = a.clone();
            let mut right = b.clone();
            loop {
                let ls = self.seq(&left)?;
                let rs = self.seq(&right)?;
                match (&ls, &rs) {
                    (Value::Nil, Value::Nil) => return Ok(true),
                    (Value::Nil, _) | (_, Value::Nil) => return Ok(false),
                    _ => {}
                }
                let lf = self.first(&ls)?;
                let rf = self.first(&rs)?;
                if !self.equiv(&lf, &rf)? {
                    return Ok(false);
                }
                left = self.rest(&ls)?;
                right = self.rest(&rs)?;
            }
        }
        if a_seqish != b_seqish {
            return Ok(false);
        }
        match (a, b) {
            (Value::Map(ma), Value::Map(mb)) => {
                if ma.entries.len() != mb.entries.len() {
                    return Ok(false);
                }
                for (k, va) in ma.entries.iter() {
                    match mb.entries.get(k) {
                        Some(vb) => {
                            if !self.equiv(va, &vb.clone())? {
                                return Ok(false);
                            }
                        }
                        None => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(a == b),
        }
    }

    /// Language-level hash, realizing lazy seqs first.
    pub fn hash_forcing(&mut self, v: &Value) -> Result<u32> {
        if v.is_sequential() {
            let items = self.seq_to_vec(v)?;
            let hashes: Result<Vec<u32>> =
                items.iter().map(|x| self.hash_forcing(x)).collect();
            return Ok(ruse_core::hash_ordered(hashes?));
        }
        Ok(hash_value(v))
    }

    /// Positional access with index checking.
    pub fn nth_value(&mut self, coll: &Value, i: i64, fallback: Option<Value>) -> Result<Value> {
        let miss = |i: i64, n: usize, fallback: Option<Value>| match fallback {
            Some(d) => Ok(d),
            None => Err(Error::index(i, n)),
        };
        if i < 0 {
            return miss(i, 0, fallback);
        }
        let idx = i as usize;
        match coll {
            Value::Vector(v) => match v.items.get(idx) {
                Some(item) => Ok(item.clone()),
                None => miss(i, v.items.len(), fallback),
            },
            Value::Str(s) => match s.chars().nth(idx) {
                Some(c) => Ok(Value::Char(c)),
                None => miss(i, s.chars().count(), fallback),
            },
            Value::Nil => miss(i, 0, fallback),
            Value::List(_) | Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
                let mut cur = coll.clone();
                let mut remaining = idx;
                loop {
                    let s = self.seq(&cur)?;
                    if matches!(s, Value::Nil) {
                        return miss(i, idx - remaining, fallback);
                    }
                    if remaining == 0 {
                        return self.first(&s);
                    }
                    remaining -= 1;
                    cur = self.rest(&s)?;
                }
            }
            other => Err(Error::type_err("nth", "an indexed collection", other)),
        }
    }

    /// Build a cons cell onto an existing seqable.
    pub fn cons_value(&mut self, first: Value, rest: Value) -> Value {
        Value::Cons(Rc::new(ConsVal {
            first,
            rest,
            meta: None,
        }))
    }
}
