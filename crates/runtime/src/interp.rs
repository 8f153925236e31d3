//! The interpreter: process-wide runtime state and the driver pipeline
//!
//! Owns the namespace table, the dynamic-binding frame stack, the keyword
//! interner, and the gensym counter. All of this state is created at
//! construction and torn down with the value; nothing lives in statics.
//!
//! The driver methods walk the full pipeline: source text → Reader →
//! Form → Analyzer → Node → Evaluator → Value, one top-level form at a
//! time (each form is evaluated before the next is read, so a form can
//! define a macro used by its successor).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::error::{Error, Result};
use crate::namespace::{Namespace, Var};
use crate::reader::{Form, FormKind, Reader};
use crate::value::{Keyword, Symbol, Value};

pub const CORE_NS: &str = "clojure.core";

pub struct Interp {
    namespaces: HashMap<String, Rc<Namespace>>,
    current_ns: Rc<Namespace>,
    /// Dynamic binding frames, innermost last. Each entry shadows the
    /// var's root for the frame's lifetime; set! writes the cell.
    bindings: Vec<Vec<(Rc<Var>, RefCell<Value>)>>,
    keywords: HashMap<String, Rc<Keyword>>,
    gensym_counter: u64,
    /// The value most recently thrown by user code, for catch bindings
    /// and the REPL's *e.
    pub last_thrown: Option<Value>,
}

impl Interp {
    /// A fully bootstrapped runtime: builtin namespaces registered,
    /// prelude loaded, current namespace `user`.
    pub fn new() -> Result<Interp> {
        let core = Rc::new(Namespace::new(Rc::from(CORE_NS)));
        let mut interp = Interp {
            namespaces: HashMap::new(),
            current_ns: core.clone(),
            bindings: Vec::new(),
            keywords: HashMap::new(),
            gensym_counter: 0,
            last_thrown: None,
        };
        interp.namespaces.insert(CORE_NS.to_string(), core);
        crate::bootstrap::install(&mut interp)?;
        Ok(interp)
    }

    // -- namespaces ---------------------------------------------------------

    pub fn find_ns(&self, name: &str) -> Option<Rc<Namespace>> {
        self.namespaces.get(name).cloned()
    }

    pub fn ns_names(&self) -> Vec<String> {
        self.namespaces.keys().cloned().collect()
    }

    pub fn create_ns(&mut self, name: &str) -> Rc<Namespace> {
        if let Some(ns) = self.namespaces.get(name) {
            return ns.clone();
        }
        debug!(ns = name, "creating namespace");
        let ns = Rc::new(Namespace::new(Rc::from(name)));
        self.namespaces.insert(name.to_string(), ns.clone());
        ns
    }

    pub fn current_ns(&self) -> Rc<Namespace> {
        self.current_ns.clone()
    }

    pub fn set_current_ns(&mut self, ns: Rc<Namespace>) {
        self.current_ns = ns;
    }

    /// Switch to (creating if needed) the named namespace, auto-referring
    /// the public vars of clojure.core into a fresh one.
    pub fn in_ns(&mut self, name: &str) -> Result<Rc<Namespace>> {
        let fresh = self.find_ns(name).is_none();
        let ns = self.create_ns(name);
        if fresh && name != CORE_NS {
            self.refer_core_publics(&ns);
        }
        self.current_ns = ns.clone();
        // *ns* tracks the current namespace as a symbol.
        if let Ok(var) = self.core_var("*ns*") {
            var.bind_root(Value::simple_symbol(name));
        }
        Ok(ns)
    }

    pub fn refer_core_publics(&self, ns: &Namespace) {
        if let Some(core) = self.find_ns(CORE_NS) {
            for (name, var) in core.interns_snapshot() {
                if !var.private.get() {
                    // Locally interned names win; ignore those conflicts.
                    let _ = ns.refer(&name, var);
                }
            }
        }
    }

    /// Resolve a symbol to a var using the current namespace: qualified
    /// symbols go through aliases then the namespace table; unqualified
    /// through interns then refers.
    pub fn resolve(&self, sym: &Symbol) -> Result<Rc<Var>> {
        self.resolve_in(&self.current_ns.clone(), sym)
    }

    pub fn resolve_in(&self, ns: &Rc<Namespace>, sym: &Symbol) -> Result<Rc<Var>> {
        match &sym.ns {
            Some(ns_part) => {
                let target_name = ns
                    .alias_target(ns_part)
                    .unwrap_or_else(|| ns_part.clone());
                let target = self
                    .find_ns(&target_name)
                    .ok_or_else(|| Error::ns_not_found(&target_name))?;
                target.lookup(&sym.name).ok_or_else(|| {
                    Error::analyze(format!(
                        "unable to resolve symbol {}/{}",
                        target_name, sym.name
                    ))
                })
            }
            None => ns.lookup(&sym.name).ok_or_else(|| {
                Error::analyze(format!("unable to resolve symbol {}", sym.name))
            }),
        }
    }

    pub fn maybe_resolve(&self, sym: &Symbol) -> Option<Rc<Var>> {
        self.resolve(sym).ok()
    }

    /// The var for a clojure.core name. Bootstrap guarantees existence,
    /// so a miss is an internal error.
    pub fn core_var(&self, name: &str) -> Result<Rc<Var>> {
        self.find_ns(CORE_NS)
            .and_then(|core| core.lookup(name))
            .ok_or_else(|| Error::eval(format!("core var {} missing", name)))
    }

    // -- keywords and gensyms -----------------------------------------------

    /// Interned keyword: same (ns, name) always yields the same cell.
    pub fn intern_keyword(&mut self, ns: Option<&str>, name: &str) -> Value {
        let key = match ns {
            Some(ns) => format!("{}/{}", ns, name),
            None => name.to_string(),
        };
        if let Some(kw) = self.keywords.get(&key) {
            return Value::Keyword(kw.clone());
        }
        let kw = Rc::new(Keyword {
            ns: ns.map(Rc::from),
            name: Rc::from(name),
        });
        self.keywords.insert(key, kw.clone());
        Value::Keyword(kw)
    }

    /// Presence check without allocating a new keyword.
    pub fn find_keyword(&self, ns: Option<&str>, name: &str) -> Option<Value> {
        let key = match ns {
            Some(ns) => format!("{}/{}", ns, name),
            None => name.to_string(),
        };
        self.keywords.get(&key).map(|kw| Value::Keyword(kw.clone()))
    }

    pub fn next_gensym_id(&mut self) -> u64 {
        self.gensym_counter += 1;
        self.gensym_counter
    }

    pub fn gensym(&mut self, prefix: &str) -> Symbol {
        let id = self.next_gensym_id();
        Symbol::simple(&format!("{}{}", prefix, id))
    }

    // -- dynamic bindings ---------------------------------------------------

    /// Push a binding frame. Every var must be dynamic.
    pub fn push_bindings(&mut self, entries: Vec<(Rc<Var>, Value)>) -> Result<()> {
        for (var, _) in &entries {
            if !var.dynamic.get() {
                return Err(Error::value(format!(
                    "cannot bind non-dynamic var {}",
                    var.qualified_name()
                )));
            }
        }
        self.bindings.push(
            entries
                .into_iter()
                .map(|(var, value)| (var, RefCell::new(value)))
                .collect(),
        );
        Ok(())
    }

    pub fn pop_bindings(&mut self) -> Result<()> {
        self.bindings
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::value("pop-thread-bindings: no binding frame to pop"))
    }

    fn binding_cell(&self, var: &Rc<Var>) -> Option<&RefCell<Value>> {
        for frame in self.bindings.iter().rev() {
            for (bound_var, cell) in frame {
                if Rc::ptr_eq(bound_var, var) {
                    return Some(cell);
                }
            }
        }
        None
    }

    pub fn thread_bound(&self, var: &Rc<Var>) -> bool {
        self.binding_cell(var).is_some()
    }

    /// Deref respecting dynamic bindings: most recent frame entry wins,
    /// falling back to the root.
    pub fn deref_var(&self, var: &Rc<Var>) -> Result<Value> {
        if var.dynamic.get() {
            if let Some(cell) = self.binding_cell(var) {
                return Ok(cell.borrow().clone());
            }
        }
        var.root()
    }

    /// set! on a thread-bound dynamic var replaces the innermost binding.
    pub fn set_var(&mut self, var: &Rc<Var>, value: Value) -> Result<Value> {
        match self.binding_cell(var) {
            Some(cell) => {
                *cell.borrow_mut() = value.clone();
                Ok(value)
            }
            None => Err(Error::value(format!(
                "set!: var {} is not thread-bound",
                var.qualified_name()
            ))),
        }
    }

    /// Value of a clojure.core dynamic var, nil when unbound. Used by the
    /// printer and reader for *print-length*-style knobs.
    pub fn dynamic_value(&self, name: &str) -> Value {
        self.find_ns(CORE_NS)
            .and_then(|core| core.lookup(name))
            .and_then(|var| self.deref_var(&var).ok())
            .unwrap_or(Value::Nil)
    }

    // -- driver -------------------------------------------------------------

    pub fn read_forms(&mut self, source: &str) -> Result<Vec<Form>> {
        let mut reader = Reader::new(source);
        let mut forms = Vec::new();
        while let Some(form) = reader.read_form(self)? {
            forms.push(form);
        }
        Ok(forms)
    }

    /// Analyze and evaluate one top-level form. A top-level `(do ...)`
    /// evaluates its children as successive top-level forms, so a macro
    /// defined inside it is visible to its siblings.
    pub fn eval_form(&mut self, form: &Form) -> Result<Value> {
        if let FormKind::List(items) = &form.kind {
            if let Some(head) = items.first() {
                if matches!(&head.kind, FormKind::Symbol(s) if s.ns.is_none() && &*s.name == "do")
                {
                    let mut result = Value::Nil;
                    for child in &items[1..] {
                        result = self.eval_form(child)?;
                    }
                    return Ok(result);
                }
            }
        }
        let node = Analyzer::new(self).analyze_top(form)?;
        self.eval_root(&node)
    }

    /// Evaluate every form in `source`, returning the last value.
    pub fn eval_str(&mut self, source: &str) -> Result<Value> {
        let mut reader = Reader::new(source);
        let mut result = Value::Nil;
        while let Some(form) = reader.read_form(self)? {
            result = self.eval_form(&form)?;
        }
        Ok(result)
    }

    /// Readable print of a value, as the pr-str builtin would produce.
    pub fn pr_str_value(&mut self, value: &Value) -> Result<String> {
        crate::printer::pr_str(self, value)
    }
}
