//! Evaluator: tree-walking interpretation of Node trees
//!
//! Arguments and let bindings evaluate strictly left-to-right. recur is a
//! sentinel (`Flow::Recur`) consumed by the nearest loop frame or fn
//! body; the analyzer guarantees it cannot escape a tail position, so the
//! sentinel never leaks into user-visible values. Non-self tail calls are
//! not optimized and consume host stack.

use std::rc::Rc;

use crate::analyzer::{CatchClause, CatchFilter, Node};
use crate::env::Frame;
use crate::error::{Error, ErrorKind, Result};
use crate::interp::Interp;
use crate::multimethod;
use crate::value::{FnVal, Value};
use ruse_core::{PersistentMap, PersistentSet};

enum Flow {
    Value(Value),
    Recur(Vec<Value>),
}

type Env = Option<Rc<Frame>>;

impl Interp {
    pub fn eval_root(&mut self, node: &Node) -> Result<Value> {
        self.eval_node(node, &None)
    }

    /// Evaluate in non-tail position; a recur sentinel here is an
    /// internal error (the analyzer rejects user code that could cause
    /// one).
    fn eval_node(&mut self, node: &Node, env: &Env) -> Result<Value> {
        match self.eval_flow(node, env)? {
            Flow::Value(v) => Ok(v),
            Flow::Recur(_) => Err(Error::eval("recur escaped its loop target")),
        }
    }

    fn eval_body(&mut self, body: &[Node], env: &Env) -> Result<Flow> {
        if body.is_empty() {
            return Ok(Flow::Value(Value::Nil));
        }
        for node in &body[..body.len() - 1] {
            self.eval_node(node, env)?;
        }
        self.eval_flow(&body[body.len() - 1], env)
    }

    fn eval_flow(&mut self, node: &Node, env: &Env) -> Result<Flow> {
        match node {
            Node::Const(v) => Ok(Flow::Value(v.clone())),
            Node::Local(name) => {
                let value = env
                    .as_ref()
                    .and_then(|frame| frame.lookup(name))
                    .ok_or_else(|| Error::eval(format!("unbound local {}", name)))?;
                Ok(Flow::Value(value))
            }
            Node::VarRef(var) => Ok(Flow::Value(self.deref_var(var)?)),
            Node::If { test, then, els } => {
                let test_value = self.eval_node(test, env)?;
                if test_value.is_truthy() {
                    self.eval_flow(then, env)
                } else {
                    match els {
                        Some(els) => self.eval_flow(els, env),
                        None => Ok(Flow::Value(Value::Nil)),
                    }
                }
            }
            Node::Do(body) => self.eval_body(body, env),
            Node::Let { bindings, body } => {
                // A fresh frame per binding, so closures created by an
                // earlier init cannot see later bindings.
                let mut current = env.clone();
                for (name, init) in bindings {
                    let value = self.eval_node(init, &current)?;
                    let frame = Frame::child(current);
                    frame.bind(name.clone(), value);
                    current = Some(frame);
                }
                self.eval_body(body, &current)
            }
            Node::Loop { bindings, body } => {
                let frame = Frame::child(env.clone());
                for (name, init) in bindings {
                    // Like let: each init sees the previous bindings.
                    let value = {
                        let loop_env = Some(frame.clone());
                        self.eval_node(init, &loop_env)?
                    };
                    frame.bind(name.clone(), value);
                }
                let loop_env = Some(frame.clone());
                loop {
                    match self.eval_body(body, &loop_env)? {
                        Flow::Value(v) => return Ok(Flow::Value(v)),
                        Flow::Recur(values) => frame.rebind_all(values),
                    }
                }
            }
            Node::Recur(args) => {
                let values = args
                    .iter()
                    .map(|a| self.eval_node(a, env))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Flow::Recur(values))
            }
            Node::MakeFn(proto) => {
                let ns_name = self.current_ns().name.clone();
                Ok(Flow::Value(Value::Fn(Rc::new(FnVal {
                    proto: proto.clone(),
                    env: env.clone(),
                    ns_name,
                    meta: None,
                }))))
            }
            Node::Invoke { f, args, line, col } => {
                let callee = self.eval_node(f, env)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(self.eval_node(a, env)?);
                }
                let result = self
                    .apply(&callee, arg_values)
                    .map_err(|e| e.with_pos(*line, *col))?;
                Ok(Flow::Value(result))
            }
            Node::Def {
                var,
                init,
                meta,
                macro_flag,
            } => {
                if let Some(init) = init {
                    let value = self.eval_node(init, env)?;
                    var.bind_root(value);
                }
                if *macro_flag {
                    var.macro_flag.set(true);
                }
                if let Some(meta) = meta {
                    let meta_value = self.eval_node(meta, env)?;
                    if let Value::Map(m) = &meta_value {
                        for (k, v) in m.entries.iter() {
                            if let Value::Keyword(kw) = k {
                                if kw.ns.is_none() {
                                    match &*kw.name {
                                        "dynamic" => var.dynamic.set(v.is_truthy()),
                                        "private" => var.private.set(v.is_truthy()),
                                        "macro" => var.macro_flag.set(v.is_truthy()),
                                        _ => {}
                                    }
                                }
                            }
                            var.assoc_meta(k.clone(), v.clone());
                        }
                    }
                }
                Ok(Flow::Value(Value::Var(var.clone())))
            }
            Node::SetBang { var, expr } => {
                let value = self.eval_node(expr, env)?;
                Ok(Flow::Value(self.set_var(var, value)?))
            }
            Node::Throw(expr) => {
                let value = self.eval_node(expr, env)?;
                self.last_thrown = Some(value.clone());
                Err(Error::user(
                    value.clone(),
                    format!("thrown value: {:?}", value),
                ))
            }
            Node::Try {
                body,
                catches,
                finally,
            } => {
                let result = self.eval_try(body, catches, env);
                if let Some(finally) = finally {
                    // finally runs on every exit path; its own error
                    // supersedes the pending result.
                    for node in finally {
                        self.eval_node(node, env)?;
                    }
                }
                Ok(Flow::Value(result?))
            }
            Node::Case {
                expr,
                clauses,
                default,
            } => {
                let value = self.eval_node(expr, env)?;
                for (constants, branch) in clauses {
                    if constants.iter().any(|c| *c == value) {
                        return self.eval_flow(branch, env);
                    }
                }
                match default {
                    Some(default) => self.eval_flow(default, env),
                    None => Err(Error::value(format!(
                        "no matching case clause for {:?}",
                        value
                    ))),
                }
            }
            Node::VectorLit(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_node(item, env)?);
                }
                Ok(Flow::Value(Value::vector_from(out)))
            }
            Node::MapLit(pairs) => {
                let mut entries = PersistentMap::new();
                for (k, v) in pairs {
                    let k = self.eval_node(k, env)?;
                    let v = self.eval_node(v, env)?;
                    entries = entries.assoc(k, v);
                }
                Ok(Flow::Value(Value::map(entries)))
            }
            Node::SetLit(items) => {
                let mut set = PersistentSet::new();
                for item in items {
                    set = set.conj(self.eval_node(item, env)?);
                }
                Ok(Flow::Value(Value::set(set)))
            }
            Node::WithMeta { expr, meta } => {
                let value = self.eval_node(expr, env)?;
                let meta = self.eval_node(meta, env)?;
                Ok(Flow::Value(value.with_meta(meta)?))
            }
        }
    }

    fn eval_try(&mut self, body: &[Node], catches: &[CatchClause], env: &Env) -> Result<Value> {
        let mut result = Value::Nil;
        let mut error = None;
        for node in body {
            match self.eval_node(node, env) {
                Ok(v) => result = v,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }
        let Some(error) = error else {
            return Ok(result);
        };
        for catch in catches {
            if catch_matches(&catch.filter, &error) {
                let bound = catch_binding_value(self, &error);
                let frame = Frame::child(env.clone());
                frame.bind(catch.binding.clone(), bound);
                let catch_env = Some(frame);
                let mut value = Value::Nil;
                for node in &catch.body {
                    value = self.eval_node(node, &catch_env)?;
                }
                return Ok(value);
            }
        }
        Err(error)
    }

    /// Apply any callable value to evaluated arguments.
    pub fn apply(&mut self, f: &Value, args: Vec<Value>) -> Result<Value> {
        match f {
            Value::Builtin(b) => (b.func)(self, &args),
            Value::Fn(fv) => self.call_fn(&fv.clone(), args),
            Value::MultiFn(mf) => multimethod::invoke_multi(self, &mf.clone(), args),
            Value::Keyword(_) | Value::Symbol(_) => {
                if args.is_empty() || args.len() > 2 {
                    return Err(Error::arity(f.type_name(), args.len()));
                }
                let default = args.get(1).cloned().unwrap_or(Value::Nil);
                lookup_in(&args[0], f, default)
            }
            Value::Map(m) => {
                if args.is_empty() || args.len() > 2 {
                    return Err(Error::arity("map", args.len()));
                }
                let default = args.get(1).cloned().unwrap_or(Value::Nil);
                Ok(m.entries.get(&args[0]).cloned().unwrap_or(default))
            }
            Value::Set(s) => {
                if args.len() != 1 {
                    return Err(Error::arity("set", args.len()));
                }
                Ok(if s.items.contains(&args[0]) {
                    args[0].clone()
                } else {
                    Value::Nil
                })
            }
            Value::Vector(v) => {
                if args.len() != 1 {
                    return Err(Error::arity("vector", args.len()));
                }
                let i = args[0].expect_int("vector invoke")?;
                if i < 0 || i as usize >= v.items.len() {
                    return Err(Error::index(i, v.items.len()));
                }
                Ok(v.items.get(i as usize).cloned().unwrap_or(Value::Nil))
            }
            Value::Var(var) => {
                let value = self.deref_var(var)?;
                self.apply(&value, args)
            }
            Value::ProtocolFn(pf) => {
                let Some(receiver) = args.first() else {
                    return Err(Error::arity(&pf.name, 0));
                };
                let type_key = Value::keyword(None, receiver.type_name());
                let protocol = &pf.protocol;
                let impls = protocol.impls.borrow();
                let method = impls
                    .get(&type_key)
                    .and_then(|methods| match methods {
                        Value::Map(m) => {
                            m.entries.get(&Value::simple_symbol(&pf.name)).cloned()
                        }
                        _ => None,
                    })
                    .ok_or_else(|| {
                        Error::value(format!(
                            "no implementation of {}.{} for type {}",
                            protocol.name,
                            pf.name,
                            receiver.type_name()
                        ))
                    })?;
                drop(impls);
                self.apply(&method, args)
            }
            other => Err(Error::type_err("invoke", "a callable value", other)),
        }
    }

    fn call_fn(&mut self, fv: &Rc<FnVal>, args: Vec<Value>) -> Result<Value> {
        let fn_name = fv
            .proto
            .name
            .as_deref()
            .unwrap_or("fn")
            .to_string();
        let arity = fv
            .proto
            .select_arity(args.len())
            .ok_or_else(|| Error::arity(&fn_name, args.len()))?;
        // Outer frame binds the fn's own name for self-recursion.
        let name_frame = Frame::child(fv.env.clone());
        if let Some(name) = &fv.proto.name {
            name_frame.bind(name.clone(), Value::Fn(fv.clone()));
        }
        let params_frame = Frame::child(Some(name_frame));
        for (i, param) in arity.params.iter().enumerate() {
            params_frame.bind(param.clone(), args[i].clone());
        }
        if let Some(rest_name) = &arity.rest {
            let rest_args = &args[arity.params.len()..];
            let rest_value = if rest_args.is_empty() {
                Value::Nil
            } else {
                Value::list_from(rest_args.to_vec())
            };
            params_frame.bind(rest_name.clone(), rest_value);
        }
        let env = Some(params_frame.clone());
        loop {
            match self.eval_body(&arity.body, &env)? {
                Flow::Value(v) => return Ok(v),
                Flow::Recur(values) => params_frame.rebind_all(values),
            }
        }
    }
}

/// Keyword/symbol lookup into a collection (the `(:k m)` calling sugar).
fn lookup_in(coll: &Value, key: &Value, default: Value) -> Result<Value> {
    match coll {
        Value::Map(m) => Ok(m.entries.get(key).cloned().unwrap_or(default)),
        Value::Set(s) => Ok(if s.items.contains(key) {
            key.clone()
        } else {
            default
        }),
        Value::Nil => Ok(default),
        Value::TransientMap(t) => match &*t.builder.borrow() {
            Some(builder) => Ok(builder.get(key).cloned().unwrap_or(default)),
            None => Err(Error::value("transient used after persistent!")),
        },
        _ => Ok(default),
    }
}

fn catch_matches(filter: &CatchFilter, error: &Error) -> bool {
    match filter {
        CatchFilter::Default | CatchFilter::AnyError => true,
        CatchFilter::TypeKeyword(kw) => {
            if error.kind == ErrorKind::UserException {
                match &error.thrown {
                    Some(thrown) => {
                        let type_kw = Value::keyword(None, thrown.type_name());
                        if *kw == type_kw {
                            return true;
                        }
                        // Map payloads may carry an explicit :type tag.
                        if let Value::Map(m) = thrown {
                            if let Some(tag) =
                                m.entries.get(&Value::keyword(None, "type"))
                            {
                                return tag == kw;
                            }
                        }
                        false
                    }
                    None => false,
                }
            } else {
                matches!(kw, Value::Keyword(k) if k.ns.is_none() && *k.name == *error.kind.label())
            }
        }
    }
}

/// What the catch clause binds: the thrown value for user throws, a
/// kind/message map for runtime errors.
fn catch_binding_value(interp: &mut Interp, error: &Error) -> Value {
    match &error.thrown {
        Some(thrown) => thrown.clone(),
        None => {
            let entries = PersistentMap::from_pairs(vec![
                (
                    Value::keyword(None, "type"),
                    interp.intern_keyword(None, error.kind.label()),
                ),
                (
                    Value::keyword(None, "message"),
                    Value::string(error.message.as_str()),
                ),
            ]);
            Value::map(entries)
        }
    }
}
