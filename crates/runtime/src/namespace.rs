//! Namespaces and vars
//!
//! A namespace owns its interned vars and tracks refers (vars owned
//! elsewhere, imported under a local name) and aliases (short names for
//! other namespaces). Aliases store the target namespace *name*, not a
//! pointer; lookup goes through the interpreter's namespace table, which
//! keeps the var/namespace graph acyclic.
//!
//! Vars are mutable named bindings: the root slot is replaced in place,
//! and dynamic vars can be shadowed by the interpreter's binding-frame
//! stack.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ruse_core::PersistentMap;

use crate::error::{Error, Result};
use crate::value::Value;

pub struct Var {
    pub ns_name: Rc<str>,
    pub name: Rc<str>,
    root: RefCell<Value>,
    bound: Cell<bool>,
    /// User metadata map (:doc, :arglists, :added, :file, :line, ...).
    meta: RefCell<Value>,
    pub dynamic: Cell<bool>,
    pub macro_flag: Cell<bool>,
    pub private: Cell<bool>,
}

impl Var {
    pub fn new(ns_name: Rc<str>, name: Rc<str>) -> Var {
        Var {
            ns_name,
            name,
            root: RefCell::new(Value::Nil),
            bound: Cell::new(false),
            meta: RefCell::new(Value::Nil),
            dynamic: Cell::new(false),
            macro_flag: Cell::new(false),
            private: Cell::new(false),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.ns_name, self.name)
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    pub fn root(&self) -> Result<Value> {
        if !self.bound.get() {
            return Err(Error::value(format!(
                "var {} is unbound",
                self.qualified_name()
            )));
        }
        Ok(self.root.borrow().clone())
    }

    pub fn bind_root(&self, value: Value) {
        *self.root.borrow_mut() = value;
        self.bound.set(true);
    }

    pub fn user_meta(&self) -> Value {
        self.meta.borrow().clone()
    }

    pub fn set_user_meta(&self, meta: Value) {
        *self.meta.borrow_mut() = meta;
    }

    /// Merge one key into the user metadata map.
    pub fn assoc_meta(&self, key: Value, value: Value) {
        let mut meta = self.meta.borrow_mut();
        let entries = match &*meta {
            Value::Map(m) => m.entries.assoc(key, value),
            _ => PersistentMap::from_pairs(vec![(key, value)]),
        };
        *meta = Value::map(entries);
    }

    /// Synthetic metadata view: struct fields merged over user metadata.
    pub fn meta_map(&self) -> Value {
        let mut entries = match &*self.meta.borrow() {
            Value::Map(m) => m.entries.clone(),
            _ => PersistentMap::new(),
        };
        entries = entries.assoc(
            Value::keyword(None, "name"),
            Value::simple_symbol(&self.name),
        );
        entries = entries.assoc(
            Value::keyword(None, "ns"),
            Value::simple_symbol(&self.ns_name),
        );
        if self.macro_flag.get() {
            entries = entries.assoc(Value::keyword(None, "macro"), Value::Bool(true));
        }
        if self.dynamic.get() {
            entries = entries.assoc(Value::keyword(None, "dynamic"), Value::Bool(true));
        }
        if self.private.get() {
            entries = entries.assoc(Value::keyword(None, "private"), Value::Bool(true));
        }
        Value::map(entries)
    }
}

pub struct Namespace {
    pub name: Rc<str>,
    interns: RefCell<HashMap<String, Rc<Var>>>,
    refers: RefCell<HashMap<String, Rc<Var>>>,
    /// alias -> target namespace name
    aliases: RefCell<HashMap<String, Rc<str>>>,
    pub meta: RefCell<Value>,
}

impl Namespace {
    pub fn new(name: Rc<str>) -> Namespace {
        Namespace {
            name,
            interns: RefCell::new(HashMap::new()),
            refers: RefCell::new(HashMap::new()),
            aliases: RefCell::new(HashMap::new()),
            meta: RefCell::new(Value::Nil),
        }
    }

    /// Intern a var under `name`, creating it if absent. Idempotent.
    pub fn intern(&self, name: &str) -> Rc<Var> {
        if let Some(var) = self.interns.borrow().get(name) {
            return var.clone();
        }
        let var = Rc::new(Var::new(self.name.clone(), Rc::from(name)));
        self.interns
            .borrow_mut()
            .insert(name.to_string(), var.clone());
        var
    }

    pub fn find_intern(&self, name: &str) -> Option<Rc<Var>> {
        self.interns.borrow().get(name).cloned()
    }

    /// Resolution inside this namespace: interns shadow refers.
    pub fn lookup(&self, name: &str) -> Option<Rc<Var>> {
        self.find_intern(name)
            .or_else(|| self.refers.borrow().get(name).cloned())
    }

    /// Import a var owned by another namespace. An existing refer is
    /// overwritten silently; a locally interned var of the same name
    /// rejects the refer.
    pub fn refer(&self, name: &str, var: Rc<Var>) -> Result<()> {
        if self.interns.borrow().contains_key(name) {
            return Err(Error::value(format!(
                "refer: {} already interned in {}",
                name, self.name
            )));
        }
        self.refers.borrow_mut().insert(name.to_string(), var);
        Ok(())
    }

    pub fn add_alias(&self, alias: &str, target: Rc<str>) {
        self.aliases.borrow_mut().insert(alias.to_string(), target);
    }

    pub fn alias_target(&self, alias: &str) -> Option<Rc<str>> {
        self.aliases.borrow().get(alias).cloned()
    }

    pub fn interns_snapshot(&self) -> Vec<(String, Rc<Var>)> {
        self.interns
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn refers_snapshot(&self) -> Vec<(String, Rc<Var>)> {
        self.refers
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn aliases_snapshot(&self) -> Vec<(String, Rc<str>)> {
        self.aliases
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_idempotent() {
        let ns = Namespace::new(Rc::from("user"));
        let v1 = ns.intern("x");
        let v2 = ns.intern("x");
        assert!(Rc::ptr_eq(&v1, &v2));
        assert_eq!(v1.qualified_name(), "user/x");
    }

    #[test]
    fn test_unbound_var_errors() {
        let ns = Namespace::new(Rc::from("user"));
        let v = ns.intern("x");
        assert!(v.root().is_err());
        v.bind_root(Value::Int(1));
        assert_eq!(v.root().unwrap(), Value::Int(1));
    }

    #[test]
    fn test_refer_conflict_policy() {
        let core = Namespace::new(Rc::from("clojure.core"));
        let user = Namespace::new(Rc::from("user"));
        let core_var = core.intern("map");
        // Plain refer works and can be overwritten silently.
        user.refer("map", core_var.clone()).unwrap();
        user.refer("map", core_var.clone()).unwrap();
        // A local intern blocks the refer.
        user.intern("special");
        let other = core.intern("special");
        assert!(user.refer("special", other).is_err());
    }

    #[test]
    fn test_interns_shadow_refers() {
        let core = Namespace::new(Rc::from("clojure.core"));
        let user = Namespace::new(Rc::from("user"));
        let core_var = core.intern("inc");
        user.refer("inc", core_var).unwrap();
        let local = user.intern("inc");
        let found = user.lookup("inc").unwrap();
        assert!(Rc::ptr_eq(&found, &local));
    }

    #[test]
    fn test_var_meta_map_merges_flags() {
        let ns = Namespace::new(Rc::from("user"));
        let v = ns.intern("d");
        v.dynamic.set(true);
        v.assoc_meta(Value::keyword(None, "doc"), Value::string("a doc"));
        let meta = v.meta_map();
        let m = meta.expect_map("test").unwrap();
        assert_eq!(
            m.entries.get(&Value::keyword(None, "dynamic")),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            m.entries.get(&Value::keyword(None, "doc")),
            Some(&Value::string("a doc"))
        );
    }
}
