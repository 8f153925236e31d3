//! Multimethods: dispatch-value based method selection
//!
//! A MultiFn owns its dispatch fn, a methods map, a prefer table, an
//! optional hierarchy var, and a dispatch cache. Selection: exact match,
//! then isa?-based candidates resolved through the prefer table, then
//! the :default method. Mutating methods or preferences invalidates the
//! cache, as does a change of the hierarchy value.
//!
//! The hierarchy is a plain map {:parents {child #{parent ...}},
//! :ancestors ..., :descendants ...}; derive/underive rebuild the
//! transitive views from the parents relation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::namespace::Var;
use crate::value::Value;
use ruse_core::{PersistentMap, PersistentSet};

pub struct MultiFnVal {
    pub name: Rc<str>,
    pub dispatch_fn: Value,
    pub default_dispatch: Value,
    pub hierarchy_var: Option<Rc<Var>>,
    pub methods: RefCell<PersistentMap<Value, Value>>,
    /// dispatch value -> set of dispatch values it is preferred over
    pub prefers: RefCell<PersistentMap<Value, Value>>,
    cache: RefCell<HashMap<Value, Value>>,
    cached_hierarchy: RefCell<Value>,
}

impl MultiFnVal {
    pub fn new(
        name: Rc<str>,
        dispatch_fn: Value,
        default_dispatch: Value,
        hierarchy_var: Option<Rc<Var>>,
    ) -> MultiFnVal {
        MultiFnVal {
            name,
            dispatch_fn,
            default_dispatch,
            hierarchy_var,
            methods: RefCell::new(PersistentMap::new()),
            prefers: RefCell::new(PersistentMap::new()),
            cache: RefCell::new(HashMap::new()),
            cached_hierarchy: RefCell::new(Value::Nil),
        }
    }

    pub fn reset_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn add_method(&self, dispatch_value: Value, method: Value) {
        let updated = self.methods.borrow().assoc(dispatch_value, method);
        *self.methods.borrow_mut() = updated;
        self.reset_cache();
    }

    pub fn remove_method(&self, dispatch_value: &Value) {
        let updated = self.methods.borrow().dissoc(dispatch_value);
        *self.methods.borrow_mut() = updated;
        self.reset_cache();
    }

    pub fn methods_map(&self) -> PersistentMap<Value, Value> {
        self.methods.borrow().clone()
    }
}

pub fn invoke_multi(interp: &mut Interp, mf: &Rc<MultiFnVal>, args: Vec<Value>) -> Result<Value> {
    let dispatch_fn = mf.dispatch_fn.clone();
    let dispatch_value = interp.apply(&dispatch_fn, args.clone())?;
    let method = find_method(interp, mf, &dispatch_value)?;
    interp.apply(&method, args)
}

fn current_hierarchy(interp: &Interp, mf: &MultiFnVal) -> Value {
    mf.hierarchy_var
        .as_ref()
        .and_then(|var| interp.deref_var(var).ok())
        .unwrap_or(Value::Nil)
}

pub fn find_method(interp: &mut Interp, mf: &Rc<MultiFnVal>, dispatch_value: &Value) -> Result<Value> {
    let hierarchy = current_hierarchy(interp, mf);
    // A hierarchy edit (derive!) invalidates every cached selection.
    if *mf.cached_hierarchy.borrow() != hierarchy {
        mf.reset_cache();
        *mf.cached_hierarchy.borrow_mut() = hierarchy.clone();
    }
    if let Some(cached) = mf.cache.borrow().get(dispatch_value) {
        return Ok(cached.clone());
    }
    let method = select_method(interp, mf, &hierarchy, dispatch_value)?;
    mf.cache
        .borrow_mut()
        .insert(dispatch_value.clone(), method.clone());
    Ok(method)
}

fn select_method(
    interp: &mut Interp,
    mf: &Rc<MultiFnVal>,
    hierarchy: &Value,
    dispatch_value: &Value,
) -> Result<Value> {
    let methods = mf.methods.borrow().clone();
    if let Some(method) = methods.get(dispatch_value) {
        return Ok(method.clone());
    }
    // Candidates reachable through the hierarchy.
    let mut candidates: Vec<(Value, Value)> = Vec::new();
    for (k, method) in methods.iter() {
        if isa(interp, hierarchy, dispatch_value, k)? {
            candidates.push((k.clone(), method.clone()));
        }
    }
    match candidates.len() {
        0 => {}
        1 => return Ok(candidates.remove(0).1),
        _ => {
            // Resolve via preferences: find a candidate dominating all
            // others.
            let mut best = candidates[0].clone();
            for candidate in &candidates[1..] {
                if dominates(interp, mf, hierarchy, &candidate.0, &best.0)? {
                    best = candidate.clone();
                }
            }
            for candidate in &candidates {
                if candidate.0 == best.0 {
                    continue;
                }
                if !dominates(interp, mf, hierarchy, &best.0, &candidate.0)? {
                    return Err(Error::value(format!(
                        "multimethod {}: ambiguous dispatch for {:?} between {:?} and {:?}",
                        mf.name, dispatch_value, best.0, candidate.0
                    )));
                }
            }
            return Ok(best.1);
        }
    }
    if let Some(default) = methods.get(&mf.default_dispatch) {
        return Ok(default.clone());
    }
    Err(Error::value(format!(
        "multimethod {}: no method for dispatch value {:?}",
        mf.name, dispatch_value
    )))
}

fn dominates(
    interp: &mut Interp,
    mf: &Rc<MultiFnVal>,
    hierarchy: &Value,
    a: &Value,
    b: &Value,
) -> Result<bool> {
    Ok(prefers_over(interp, mf, hierarchy, a, b)? || isa(interp, hierarchy, a, b)?)
}

/// a is preferred over b directly, over an ancestor of b, or through one
/// of a's own ancestors.
fn prefers_over(
    interp: &mut Interp,
    mf: &Rc<MultiFnVal>,
    hierarchy: &Value,
    a: &Value,
    b: &Value,
) -> Result<bool> {
    let prefer_table = mf.prefers.borrow().clone();
    if let Some(Value::Set(preferred)) = prefer_table.get(a) {
        if preferred.items.contains(b) {
            return Ok(true);
        }
        for b_ancestor in ancestors_of(hierarchy, b) {
            if preferred.items.contains(&b_ancestor) {
                return Ok(true);
            }
        }
    }
    for a_ancestor in ancestors_of(hierarchy, a) {
        if prefers_over(interp, mf, hierarchy, &a_ancestor, b)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The isa? relation: equality, pairwise vector isa?, or hierarchy
/// ancestry.
pub fn isa(interp: &mut Interp, hierarchy: &Value, child: &Value, parent: &Value) -> Result<bool> {
    if interp.equiv(child, parent)? {
        return Ok(true);
    }
    if let (Value::Vector(c), Value::Vector(p)) = (child, parent) {
        if c.items.len() == p.items.len() {
            for (cv, pv) in c.items.iter().zip(p.items.iter()) {
                if !isa(interp, hierarchy, cv, pv)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        return Ok(false);
    }
    Ok(ancestors_of(hierarchy, child).contains(parent))
}

fn hierarchy_submap(hierarchy: &Value, key: &str) -> PersistentMap<Value, Value> {
    if let Value::Map(h) = hierarchy {
        if let Some(Value::Map(sub)) = h.entries.get(&Value::keyword(None, key)) {
            return sub.entries.clone();
        }
    }
    PersistentMap::new()
}

pub fn ancestors_of(hierarchy: &Value, tag: &Value) -> Vec<Value> {
    match hierarchy_submap(hierarchy, "ancestors").get(tag) {
        Some(Value::Set(s)) => s.items.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn parents_of(hierarchy: &Value, tag: &Value) -> Vec<Value> {
    match hierarchy_submap(hierarchy, "parents").get(tag) {
        Some(Value::Set(s)) => s.items.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

pub fn descendants_of(hierarchy: &Value, tag: &Value) -> Vec<Value> {
    match hierarchy_submap(hierarchy, "descendants").get(tag) {
        Some(Value::Set(s)) => s.items.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

/// An empty hierarchy value.
pub fn make_hierarchy() -> Value {
    Value::map(PersistentMap::from_pairs(vec![
        (Value::keyword(None, "parents"), Value::map(PersistentMap::new())),
        (Value::keyword(None, "ancestors"), Value::map(PersistentMap::new())),
        (
            Value::keyword(None, "descendants"),
            Value::map(PersistentMap::new()),
        ),
    ]))
}

/// derive: add a (tag, parent) edge, rejecting self- and cyclic
/// derivations, and rebuild the transitive views.
pub fn derive(hierarchy: &Value, tag: &Value, parent: &Value) -> Result<Value> {
    if tag == parent {
        return Err(Error::value("derive: tag and parent must differ"));
    }
    if ancestors_of(hierarchy, tag).contains(parent) {
        return Ok(hierarchy.clone());
    }
    if ancestors_of(hierarchy, parent).contains(tag) {
        return Err(Error::value(format!(
            "derive: cyclic derivation, {:?} already has {:?} as an ancestor",
            parent, tag
        )));
    }
    let mut parents = hierarchy_submap(hierarchy, "parents");
    let existing = match parents.get(tag) {
        Some(Value::Set(s)) => s.items.clone(),
        _ => PersistentSet::new(),
    };
    parents = parents.assoc(tag.clone(), Value::set(existing.conj(parent.clone())));
    Ok(rebuild_from_parents(parents))
}

/// underive: drop the (tag, parent) edge if present.
pub fn underive(hierarchy: &Value, tag: &Value, parent: &Value) -> Result<Value> {
    let mut parents = hierarchy_submap(hierarchy, "parents");
    if let Some(Value::Set(s)) = parents.get(tag) {
        let shrunk = s.items.disj(parent);
        parents = if shrunk.is_empty() {
            parents.dissoc(tag)
        } else {
            parents.assoc(tag.clone(), Value::set(shrunk))
        };
    }
    Ok(rebuild_from_parents(parents))
}

/// Recompute :ancestors and :descendants from the parents relation. The
/// maps are small, so a full rebuild keeps the edit operations obviously
/// correct.
fn rebuild_from_parents(parents: PersistentMap<Value, Value>) -> Value {
    let mut ancestors: PersistentMap<Value, Value> = PersistentMap::new();
    for (tag, _) in parents.iter() {
        let mut acc = PersistentSet::new();
        let mut stack: Vec<Value> = direct_parents(&parents, tag);
        while let Some(p) = stack.pop() {
            if acc.contains(&p) {
                continue;
            }
            stack.extend(direct_parents(&parents, &p));
            acc = acc.conj(p);
        }
        if !acc.is_empty() {
            ancestors = ancestors.assoc(tag.clone(), Value::set(acc));
        }
    }
    let mut descendants: PersistentMap<Value, Value> = PersistentMap::new();
    for (tag, ancestor_set) in ancestors.iter() {
        if let Value::Set(ancs) = ancestor_set {
            for ancestor in ancs.items.iter() {
                let existing = match descendants.get(ancestor) {
                    Some(Value::Set(s)) => s.items.clone(),
                    _ => PersistentSet::new(),
                };
                descendants =
                    descendants.assoc(ancestor.clone(), Value::set(existing.conj(tag.clone())));
            }
        }
    }
    Value::map(PersistentMap::from_pairs(vec![
        (Value::keyword(None, "parents"), Value::map(parents)),
        (Value::keyword(None, "ancestors"), Value::map(ancestors)),
        (Value::keyword(None, "descendants"), Value::map(descendants)),
    ]))
}

fn direct_parents(parents: &PersistentMap<Value, Value>, tag: &Value) -> Vec<Value> {
    match parents.get(tag) {
        Some(Value::Set(s)) => s.items.iter().cloned().collect(),
        _ => Vec::new(),
    }
}

/// prefer-method: record that `preferred` wins over `other`, rejecting a
/// contradiction with an existing preference.
pub fn add_preference(
    interp: &mut Interp,
    mf: &Rc<MultiFnVal>,
    preferred: Value,
    other: Value,
) -> Result<()> {
    let hierarchy = current_hierarchy(interp, mf);
    if prefers_over(interp, mf, &hierarchy, &other, &preferred)? {
        return Err(Error::value(format!(
            "prefer-method: preference conflict, {:?} is already preferred over {:?}",
            other, preferred
        )));
    }
    let table = mf.prefers.borrow().clone();
    let existing = match table.get(&preferred) {
        Some(Value::Set(s)) => s.items.clone(),
        _ => PersistentSet::new(),
    };
    let updated = table.assoc(preferred, Value::set(existing.conj(other)));
    *mf.prefers.borrow_mut() = updated;
    mf.reset_cache();
    Ok(())
}
