//! Value: what the language talks about
//!
//! A single tagged enum covers every runtime object; hot paths (equality,
//! truthiness, arithmetic) branch directly on the discriminant. Heap
//! payloads sit behind `Rc`, so cloning a Value is a pointer bump and
//! structural sharing falls out of the collection library.
//!
//! Equality is the language's `=`: structural for collections, numeric
//! across integer/float, (ns, name) for symbols and keywords, identity
//! for reference cells and callables. Metadata never participates in
//! equality or hashing. Hashing folds with the Murmur3 mixers from
//! ruse-core so equal values hash equally regardless of representation
//! (`[1 2]` vs `'(1 2)`).

use std::cell::RefCell;
use std::rc::Rc;

use ruse_core::{
    hash::{hash_long, hash_string},
    hash_ordered, hash_unordered, PersistentList, PersistentMap, PersistentSet, PersistentVector,
    TransientMap, TransientSet, TransientVector,
};

use crate::analyzer::FnProto;
use crate::cell::{AtomCell, DelayCell, VolatileCell};
use crate::env::Frame;
use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::multimethod::MultiFnVal;
use crate::namespace::Var;
use crate::regex::{MatcherCell, Pattern};
use crate::seq::{ArrayChunk, ChunkBufferCell, ChunkedConsVal, ConsVal, LazySeq};

/// Optional metadata: `None` or a Map value.
pub type Meta = Option<Rc<Value>>;

#[derive(Clone)]
pub struct Symbol {
    pub ns: Option<Rc<str>>,
    pub name: Rc<str>,
    pub meta: Meta,
}

impl Symbol {
    pub fn simple(name: &str) -> Symbol {
        Symbol {
            ns: None,
            name: Rc::from(name),
            meta: None,
        }
    }

    pub fn qualified(ns: &str, name: &str) -> Symbol {
        Symbol {
            ns: Some(Rc::from(ns)),
            name: Rc::from(name),
            meta: None,
        }
    }

    /// Parse `ns/name` syntax. A lone `/` is the division symbol.
    pub fn parse(text: &str) -> Symbol {
        match text.find('/') {
            Some(idx) if text.len() > 1 => {
                let (ns, name) = text.split_at(idx);
                Symbol::qualified(ns, &name[1..])
            }
            _ => Symbol::simple(text),
        }
    }
}

#[derive(Clone)]
pub struct Keyword {
    pub ns: Option<Rc<str>>,
    pub name: Rc<str>,
}

pub struct ListVal {
    pub items: PersistentList<Value>,
    pub meta: Meta,
}

pub struct VectorVal {
    pub items: PersistentVector<Value>,
    pub meta: Meta,
}

pub struct MapVal {
    pub entries: PersistentMap<Value, Value>,
    pub meta: Meta,
}

pub struct SetVal {
    pub items: PersistentSet<Value>,
    pub meta: Meta,
}

/// A closure: compiled prototype + captured lexical frame + defining ns.
pub struct FnVal {
    pub proto: Rc<FnProto>,
    pub env: Option<Rc<Frame>>,
    pub ns_name: Rc<str>,
    pub meta: Meta,
}

pub type BuiltinImpl = fn(&mut Interp, &[Value]) -> Result<Value>;

pub struct BuiltinFn {
    pub name: &'static str,
    pub func: BuiltinImpl,
}

/// A protocol: named method set plus per-type implementations.
pub struct ProtocolVal {
    pub name: Rc<str>,
    pub methods: Vec<Rc<str>>,
    /// type keyword -> {method-name-symbol -> fn}
    pub impls: RefCell<PersistentMap<Value, Value>>,
}

/// One method of a protocol; dispatches on the first argument's type.
pub struct ProtocolFnVal {
    pub name: Rc<str>,
    pub protocol: Rc<ProtocolVal>,
}

/// A consumable transient builder slot. `persistent!` takes the builder
/// out; every later operation observes the emptied cell and fails with a
/// value-error.
pub struct TransientCell<T> {
    pub builder: RefCell<Option<T>>,
}

impl<T> TransientCell<T> {
    pub fn new(builder: T) -> TransientCell<T> {
        TransientCell {
            builder: RefCell::new(Some(builder)),
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(Rc<str>),
    Symbol(Rc<Symbol>),
    Keyword(Rc<Keyword>),
    List(Rc<ListVal>),
    Vector(Rc<VectorVal>),
    Map(Rc<MapVal>),
    Set(Rc<SetVal>),
    LazySeq(Rc<LazySeq>),
    Cons(Rc<ConsVal>),
    Chunk(Rc<ArrayChunk>),
    ChunkedCons(Rc<ChunkedConsVal>),
    ChunkBuffer(Rc<ChunkBufferCell>),
    Atom(Rc<AtomCell>),
    Volatile(Rc<VolatileCell>),
    Delay(Rc<DelayCell>),
    Reduced(Rc<Value>),
    Fn(Rc<FnVal>),
    Builtin(Rc<BuiltinFn>),
    ProtocolFn(Rc<ProtocolFnVal>),
    MultiFn(Rc<MultiFnVal>),
    Var(Rc<Var>),
    Regex(Rc<Pattern>),
    Matcher(Rc<MatcherCell>),
    Protocol(Rc<ProtocolVal>),
    TransientVector(Rc<TransientCell<TransientVector<Value>>>),
    TransientMap(Rc<TransientCell<TransientMap<Value, Value>>>),
    TransientSet(Rc<TransientCell<TransientSet<Value>>>),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn symbol(sym: Symbol) -> Value {
        Value::Symbol(Rc::new(sym))
    }

    pub fn simple_symbol(name: &str) -> Value {
        Value::Symbol(Rc::new(Symbol::simple(name)))
    }

    pub fn keyword(ns: Option<&str>, name: &str) -> Value {
        Value::Keyword(Rc::new(Keyword {
            ns: ns.map(Rc::from),
            name: Rc::from(name),
        }))
    }

    pub fn list(items: PersistentList<Value>) -> Value {
        Value::List(Rc::new(ListVal { items, meta: None }))
    }

    pub fn list_from(items: Vec<Value>) -> Value {
        Value::list(PersistentList::from_vec(items))
    }

    pub fn empty_list() -> Value {
        Value::list(PersistentList::new())
    }

    pub fn vector(items: PersistentVector<Value>) -> Value {
        Value::Vector(Rc::new(VectorVal { items, meta: None }))
    }

    pub fn vector_from(items: Vec<Value>) -> Value {
        Value::vector(PersistentVector::from_vec(items))
    }

    pub fn map(entries: PersistentMap<Value, Value>) -> Value {
        Value::Map(Rc::new(MapVal {
            entries,
            meta: None,
        }))
    }

    pub fn set(items: PersistentSet<Value>) -> Value {
        Value::Set(Rc::new(SetVal { items, meta: None }))
    }

    /// nil and false are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::LazySeq(_) => "lazy-seq",
            Value::Cons(_) => "cons",
            Value::Chunk(_) => "chunk",
            Value::ChunkedCons(_) => "chunked-cons",
            Value::ChunkBuffer(_) => "chunk-buffer",
            Value::Atom(_) => "atom",
            Value::Volatile(_) => "volatile",
            Value::Delay(_) => "delay",
            Value::Reduced(_) => "reduced",
            Value::Fn(_) => "fn",
            Value::Builtin(_) => "fn",
            Value::ProtocolFn(_) => "fn",
            Value::MultiFn(_) => "multi-fn",
            Value::Var(_) => "var",
            Value::Regex(_) => "regex",
            Value::Matcher(_) => "matcher",
            Value::Protocol(_) => "protocol",
            Value::TransientVector(_) => "transient-vector",
            Value::TransientMap(_) => "transient-map",
            Value::TransientSet(_) => "transient-set",
        }
    }

    /// True for ordered collections that compare element-wise with each
    /// other (spec: sequential collections with equal element sequences
    /// are equal, so `[1 2] = '(1 2)`).
    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Vector(_) | Value::Cons(_) | Value::LazySeq(_)
                | Value::ChunkedCons(_)
        )
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn meta(&self) -> Value {
        let meta = match self {
            Value::Symbol(s) => &s.meta,
            Value::List(l) => &l.meta,
            Value::Vector(v) => &v.meta,
            Value::Map(m) => &m.meta,
            Value::Set(s) => &s.meta,
            Value::Fn(f) => &f.meta,
            Value::Cons(c) => &c.meta,
            Value::ChunkedCons(c) => &c.meta,
            Value::Atom(a) => return a.meta.borrow().clone(),
            Value::Var(v) => return v.meta_map(),
            _ => return Value::Nil,
        };
        match meta {
            Some(m) => (**m).clone(),
            None => Value::Nil,
        }
    }

    /// A copy of this value carrying the given metadata map (or nil).
    pub fn with_meta(&self, meta: Value) -> Result<Value> {
        let meta = if matches!(meta, Value::Nil) {
            None
        } else {
            Some(Rc::new(meta))
        };
        Ok(match self {
            Value::Symbol(s) => Value::Symbol(Rc::new(Symbol {
                ns: s.ns.clone(),
                name: s.name.clone(),
                meta,
            })),
            Value::List(l) => Value::List(Rc::new(ListVal {
                items: l.items.clone(),
                meta,
            })),
            Value::Vector(v) => Value::Vector(Rc::new(VectorVal {
                items: v.items.clone(),
                meta,
            })),
            Value::Map(m) => Value::Map(Rc::new(MapVal {
                entries: m.entries.clone(),
                meta,
            })),
            Value::Set(s) => Value::Set(Rc::new(SetVal {
                items: s.items.clone(),
                meta,
            })),
            Value::Fn(f) => Value::Fn(Rc::new(FnVal {
                proto: f.proto.clone(),
                env: f.env.clone(),
                ns_name: f.ns_name.clone(),
                meta,
            })),
            Value::Cons(c) => Value::Cons(Rc::new(ConsVal {
                first: c.first.clone(),
                rest: c.rest.clone(),
                meta,
            })),
            other => {
                return Err(Error::type_err(
                    "with-meta",
                    "a value supporting metadata",
                    other,
                ))
            }
        })
    }

    pub fn expect_int(&self, op: &str) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Error::type_err(op, "integer", other)),
        }
    }

    pub fn expect_number(&self, op: &str) -> Result<f64> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            other => Err(Error::type_err(op, "number", other)),
        }
    }

    pub fn expect_str(&self, op: &str) -> Result<&Rc<str>> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Error::type_err(op, "string", other)),
        }
    }

    pub fn expect_keyword(&self, op: &str) -> Result<&Rc<Keyword>> {
        match self {
            Value::Keyword(k) => Ok(k),
            other => Err(Error::type_err(op, "keyword", other)),
        }
    }

    pub fn expect_symbol(&self, op: &str) -> Result<&Rc<Symbol>> {
        match self {
            Value::Symbol(s) => Ok(s),
            other => Err(Error::type_err(op, "symbol", other)),
        }
    }

    pub fn expect_map(&self, op: &str) -> Result<&Rc<MapVal>> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(Error::type_err(op, "map", other)),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The readable printer needs an Interp (lazy seqs, print vars);
        // Debug stays shallow and is only used in error plumbing.
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Char(c) => write!(f, "\\{}", c),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => match &s.ns {
                Some(ns) => write!(f, "{}/{}", ns, s.name),
                None => write!(f, "{}", s.name),
            },
            Value::Keyword(k) => match &k.ns {
                Some(ns) => write!(f, ":{}/{}", ns, k.name),
                None => write!(f, ":{}", k.name),
            },
            other => write!(f, "#<{}>", other.type_name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

/// Element sequence of a realized sequential value, for equality and
/// hashing. Unrealized lazy tails terminate the walk (callers that need
/// full fidelity force the seq first; see Interp::equiv).
fn sequential_elements(v: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    let mut cur = v.clone();
    loop {
        match cur {
            Value::List(l) => {
                out.extend(l.items.iter().cloned());
                return out;
            }
            Value::Vector(vec) => {
                out.extend(vec.items.iter().cloned());
                return out;
            }
            Value::Cons(c) => {
                out.push(c.first.clone());
                cur = c.rest.clone();
            }
            Value::ChunkedCons(cc) => {
                out.extend(cc.chunk.items().iter().cloned());
                cur = cc.rest.clone();
            }
            Value::LazySeq(ls) => match ls.realized_value() {
                Some(inner) => cur = inner,
                None => {
                    // Sentinel: unrealized tail participates by identity.
                    out.push(Value::LazySeq(ls));
                    return out;
                }
            },
            Value::Nil => return out,
            other => {
                out.push(other);
                return out;
            }
        }
    }
}

fn rc_ptr<T>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as usize
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // Numeric equality crosses the int/float divide.
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a.ns == b.ns && a.name == b.name,
            (Value::Keyword(a), Value::Keyword(b)) => a.ns == b.ns && a.name == b.name,
            (Value::Map(a), Value::Map(b)) => {
                if a.entries.len() != b.entries.len() {
                    return false;
                }
                a.entries
                    .iter()
                    .all(|(k, v)| b.entries.get(k).is_some_and(|bv| bv == v))
            }
            (Value::Set(a), Value::Set(b)) => {
                a.items.len() == b.items.len() && a.items.iter().all(|x| b.items.contains(x))
            }
            (Value::LazySeq(a), Value::LazySeq(b))
                if a.realized_value().is_none() || b.realized_value().is_none() =>
            {
                rc_ptr(a) == rc_ptr(b)
            }
            (a, b) if a.is_sequential() && b.is_sequential() => {
                // An unrealized LazySeq tail compares by identity through
                // its sentinel element.
                let left = sequential_elements(a);
                let right = sequential_elements(b);
                left.len() == right.len() && left.iter().zip(&right).all(|(x, y)| x == y)
            }
            (Value::Atom(a), Value::Atom(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Volatile(a), Value::Volatile(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Delay(a), Value::Delay(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Reduced(a), Value::Reduced(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Fn(a), Value::Fn(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Builtin(a), Value::Builtin(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::ProtocolFn(a), Value::ProtocolFn(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::MultiFn(a), Value::MultiFn(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Var(a), Value::Var(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Regex(a), Value::Regex(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Matcher(a), Value::Matcher(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Protocol(a), Value::Protocol(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::Chunk(a), Value::Chunk(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::ChunkBuffer(a), Value::ChunkBuffer(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::TransientVector(a), Value::TransientVector(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::TransientMap(a), Value::TransientMap(b)) => rc_ptr(a) == rc_ptr(b),
            (Value::TransientSet(a), Value::TransientSet(b)) => rc_ptr(a) == rc_ptr(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// The language-level hash. Consistent with `=`: integral floats hash as
/// their integer value, sequentials hash by element order regardless of
/// concrete representation, maps and sets hash order-independently.
pub fn hash_value(v: &Value) -> u32 {
    match v {
        Value::Nil => 0,
        Value::Bool(false) => 1237,
        Value::Bool(true) => 1231,
        Value::Int(n) => hash_long(*n),
        Value::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64
            {
                hash_long(*f as i64)
            } else {
                hash_long(f.to_bits() as i64)
            }
        }
        Value::Char(c) => hash_long(*c as i64),
        Value::Str(s) => hash_string(s),
        Value::Symbol(s) => hash_name(s.ns.as_deref(), &s.name, 0x9e37),
        Value::Keyword(k) => hash_name(k.ns.as_deref(), &k.name, 0x7f4a_7c15),
        Value::Map(m) => hash_unordered(
            m.entries
                .iter()
                .map(|(k, v)| hash_ordered([hash_value(k), hash_value(v)])),
        ),
        Value::Set(s) => hash_unordered(s.items.iter().map(hash_value)),
        Value::LazySeq(ls) if ls.realized_value().is_none() => hash_long(rc_ptr(ls) as i64),
        Value::List(_) | Value::Vector(_) | Value::Cons(_) | Value::ChunkedCons(_)
        | Value::LazySeq(_) => hash_ordered(sequential_elements(v).iter().map(hash_value)),
        Value::Atom(a) => hash_long(rc_ptr(a) as i64),
        Value::Volatile(c) => hash_long(rc_ptr(c) as i64),
        Value::Delay(c) => hash_long(rc_ptr(c) as i64),
        Value::Reduced(c) => hash_long(rc_ptr(c) as i64),
        Value::Fn(c) => hash_long(rc_ptr(c) as i64),
        Value::Builtin(c) => hash_long(rc_ptr(c) as i64),
        Value::ProtocolFn(c) => hash_long(rc_ptr(c) as i64),
        Value::MultiFn(c) => hash_long(rc_ptr(c) as i64),
        Value::Var(c) => hash_long(rc_ptr(c) as i64),
        Value::Regex(c) => hash_long(rc_ptr(c) as i64),
        Value::Matcher(c) => hash_long(rc_ptr(c) as i64),
        Value::Protocol(c) => hash_long(rc_ptr(c) as i64),
        Value::Chunk(c) => hash_long(rc_ptr(c) as i64),
        Value::ChunkBuffer(c) => hash_long(rc_ptr(c) as i64),
        Value::TransientVector(c) => hash_long(rc_ptr(c) as i64),
        Value::TransientMap(c) => hash_long(rc_ptr(c) as i64),
        Value::TransientSet(c) => hash_long(rc_ptr(c) as i64),
    }
}

fn hash_name(ns: Option<&str>, name: &str, seed: u32) -> u32 {
    let base = match ns {
        Some(ns) => hash_string(ns) ^ hash_string(name),
        None => hash_string(name),
    };
    base.wrapping_add(seed)
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(hash_value(self));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_vec(items: &[i64]) -> Value {
        Value::vector_from(items.iter().map(|n| Value::Int(*n)).collect())
    }

    fn int_list(items: &[i64]) -> Value {
        Value::list_from(items.iter().map(|n| Value::Int(*n)).collect())
    }

    #[test]
    fn test_numeric_cross_equality() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_eq!(hash_value(&Value::Int(1)), hash_value(&Value::Float(1.0)));
    }

    #[test]
    fn test_vector_list_equality() {
        assert_eq!(int_vec(&[1, 2, 3]), int_list(&[1, 2, 3]));
        assert_ne!(int_vec(&[1, 2, 3]), int_list(&[1, 2]));
        assert_eq!(
            hash_value(&int_vec(&[1, 2, 3])),
            hash_value(&int_list(&[1, 2, 3]))
        );
    }

    #[test]
    fn test_map_entry_order_irrelevant() {
        let a = Value::map(
            PersistentMap::from_pairs(vec![
                (Value::keyword(None, "a"), Value::Int(1)),
                (Value::keyword(None, "b"), Value::Int(2)),
            ]),
        );
        let b = Value::map(
            PersistentMap::from_pairs(vec![
                (Value::keyword(None, "b"), Value::Int(2)),
                (Value::keyword(None, "a"), Value::Int(1)),
            ]),
        );
        assert_eq!(a, b);
        assert_eq!(hash_value(&a), hash_value(&b));
    }

    #[test]
    fn test_keyword_symbol_distinct() {
        let kw = Value::keyword(None, "x");
        let sym = Value::simple_symbol("x");
        assert_ne!(kw, sym);
        assert_ne!(hash_value(&kw), hash_value(&sym));
    }

    #[test]
    fn test_meta_ignored_by_equality() {
        let plain = Value::simple_symbol("x");
        let tagged = plain
            .with_meta(Value::map(PersistentMap::from_pairs(vec![(
                Value::keyword(None, "doc"),
                Value::string("docs"),
            )])))
            .unwrap();
        assert_eq!(plain, tagged);
        assert_eq!(hash_value(&plain), hash_value(&tagged));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::empty_list().is_truthy());
    }

    #[test]
    fn test_symbol_parse() {
        let s = Symbol::parse("clojure.core/map");
        assert_eq!(s.ns.as_deref(), Some("clojure.core"));
        assert_eq!(&*s.name, "map");
        let d = Symbol::parse("/");
        assert!(d.ns.is_none());
        assert_eq!(&*d.name, "/");
    }
}
