//! Analyzer: Form trees to Node trees
//!
//! Recognizes special forms by unqualified head symbol, resolves symbols
//! to lexical locals or vars, expands macros in place (a macro-marked var
//! in operator position is applied to the unevaluated argument forms and
//! the result re-analyzed), and rejects misuse (`recur` outside a tail
//! position, odd binding vectors) with analyze-errors carrying source
//! positions.
//!
//! `def` interns its var at analysis time, so a fn body can refer to the
//! var being defined (self-recursion through the global).

use std::rc::Rc;

use tracing::trace;

use crate::error::{Error, ErrorKind, Result};
use crate::interp::Interp;
use crate::namespace::Var;
use crate::reader::{Form, FormKind};
use crate::regex::Pattern;
use crate::syntax_quote;
use crate::value::{Symbol, Value};
use ruse_core::{PersistentMap, PersistentSet};

/// Iteration bound shared by the analyzer's expansion loop and the
/// macroexpand builtin; hitting it means a runaway macro.
pub const MACRO_EXPANSION_LIMIT: usize = 1000;

pub enum Node {
    Const(Value),
    Local(Rc<str>),
    VarRef(Rc<Var>),
    If {
        test: Box<Node>,
        then: Box<Node>,
        els: Option<Box<Node>>,
    },
    Do(Vec<Node>),
    Let {
        bindings: Vec<(Rc<str>, Node)>,
        body: Vec<Node>,
    },
    Loop {
        bindings: Vec<(Rc<str>, Node)>,
        body: Vec<Node>,
    },
    Recur(Vec<Node>),
    MakeFn(Rc<FnProto>),
    Invoke {
        f: Box<Node>,
        args: Vec<Node>,
        line: u32,
        col: u32,
    },
    Def {
        var: Rc<Var>,
        init: Option<Box<Node>>,
        meta: Option<Box<Node>>,
        macro_flag: bool,
    },
    SetBang {
        var: Rc<Var>,
        expr: Box<Node>,
    },
    Throw(Box<Node>),
    Try {
        body: Vec<Node>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Node>>,
    },
    Case {
        expr: Box<Node>,
        clauses: Vec<(Vec<Value>, Node)>,
        default: Option<Box<Node>>,
    },
    VectorLit(Vec<Node>),
    MapLit(Vec<(Node, Node)>),
    SetLit(Vec<Node>),
    WithMeta {
        expr: Box<Node>,
        meta: Box<Node>,
    },
}

pub struct CatchClause {
    pub filter: CatchFilter,
    pub binding: Rc<str>,
    pub body: Vec<Node>,
}

pub enum CatchFilter {
    /// `:default` - matches anything
    Default,
    /// A keyword: matches the thrown value's type keyword (or its :type
    /// entry for map payloads), or the error kind label for runtime
    /// errors.
    TypeKeyword(Value),
    /// A class-position symbol (Exception, Throwable, ...): matches any
    /// error.
    AnyError,
}

/// Compiled function prototype: one body per arity, optional variadic.
pub struct FnProto {
    pub name: Option<Rc<str>>,
    pub arities: Vec<FnArity>,
}

pub struct FnArity {
    pub params: Vec<Rc<str>>,
    pub rest: Option<Rc<str>>,
    pub body: Vec<Node>,
}

impl FnProto {
    /// The arity matching an argument count: exact fixed match first,
    /// then the variadic fallback.
    pub fn select_arity(&self, argc: usize) -> Option<&FnArity> {
        self.arities
            .iter()
            .find(|a| a.rest.is_none() && a.params.len() == argc)
            .or_else(|| {
                self.arities
                    .iter()
                    .find(|a| a.rest.is_some() && argc >= a.params.len())
            })
    }
}

#[derive(Clone)]
struct Ctx {
    locals: Vec<Rc<str>>,
    /// Binding count of the innermost recur target, if any.
    recur_arity: Option<usize>,
    in_tail: bool,
}

impl Ctx {
    fn top() -> Ctx {
        Ctx {
            locals: Vec::new(),
            recur_arity: None,
            in_tail: false,
        }
    }

    fn non_tail(&self) -> Ctx {
        Ctx {
            locals: self.locals.clone(),
            recur_arity: self.recur_arity,
            in_tail: false,
        }
    }

    fn tail(&self) -> Ctx {
        Ctx {
            locals: self.locals.clone(),
            recur_arity: self.recur_arity,
            in_tail: true,
        }
    }

    fn has_local(&self, name: &str) -> bool {
        self.locals.iter().any(|l| **l == *name)
    }
}

pub struct Analyzer<'i> {
    interp: &'i mut Interp,
}

impl<'i> Analyzer<'i> {
    pub fn new(interp: &'i mut Interp) -> Analyzer<'i> {
        Analyzer { interp }
    }

    pub fn analyze_top(&mut self, form: &Form) -> Result<Node> {
        self.analyze(form, &Ctx::top())
    }

    fn analyze(&mut self, form: &Form, ctx: &Ctx) -> Result<Node> {
        match &form.kind {
            FormKind::Nil => Ok(Node::Const(Value::Nil)),
            FormKind::Bool(b) => Ok(Node::Const(Value::Bool(*b))),
            FormKind::Int(n) => Ok(Node::Const(Value::Int(*n))),
            FormKind::Float(f) => Ok(Node::Const(Value::Float(*f))),
            FormKind::Char(c) => Ok(Node::Const(Value::Char(*c))),
            FormKind::Str(s) => Ok(Node::Const(Value::string(s.as_str()))),
            FormKind::Keyword(kw) => Ok(Node::Const(kw.clone())),
            FormKind::Const(v) => Ok(Node::Const(v.clone())),
            FormKind::Symbol(sym) => self.analyze_symbol(sym, form, ctx),
            FormKind::List(items) => self.analyze_list(form, items, ctx),
            FormKind::Vector(items) => {
                let nodes = items
                    .iter()
                    .map(|f| self.analyze(f, &ctx.non_tail()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_vector(nodes))
            }
            FormKind::Map(items) => {
                let mut pairs = Vec::with_capacity(items.len() / 2);
                for kv in items.chunks(2) {
                    let k = self.analyze(&kv[0], &ctx.non_tail())?;
                    let v = self.analyze(&kv[1], &ctx.non_tail())?;
                    pairs.push((k, v));
                }
                Ok(fold_map(pairs))
            }
            FormKind::Set(items) => {
                let nodes = items
                    .iter()
                    .map(|f| self.analyze(f, &ctx.non_tail()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_set(nodes))
            }
            FormKind::Quote(inner) => {
                let v = form_to_value(self.interp, inner)?;
                Ok(Node::Const(v))
            }
            FormKind::SyntaxQuote(inner) => {
                let expanded = syntax_quote::expand(self.interp, inner)?;
                self.analyze(&expanded, ctx)
            }
            FormKind::Unquote(_) => Err(Error::analyze("unquote outside of syntax-quote")
                .with_pos(form.line, form.col)),
            FormKind::UnquoteSplicing(_) => {
                Err(Error::new(ErrorKind::Value, "unquote-splicing outside of syntax-quote")
                    .with_pos(form.line, form.col))
            }
            FormKind::Deref(inner) => {
                let deref_var = self.interp.core_var("deref")?;
                let arg = self.analyze(inner, &ctx.non_tail())?;
                Ok(Node::Invoke {
                    f: Box::new(Node::VarRef(deref_var)),
                    args: vec![arg],
                    line: form.line,
                    col: form.col,
                })
            }
            FormKind::VarQuote(inner) => match &inner.kind {
                FormKind::Symbol(sym) => {
                    let var = self
                        .interp
                        .resolve(sym)
                        .map_err(|e| e.with_pos(form.line, form.col))?;
                    Ok(Node::Const(Value::Var(var)))
                }
                _ => Err(Error::analyze("var-quote expects a symbol")
                    .with_pos(form.line, form.col)),
            },
            FormKind::Meta(meta, target) => {
                let target_node = self.analyze(target, &ctx.non_tail())?;
                let meta_node = self.analyze(meta, &ctx.non_tail())?;
                if let (Node::Const(t), Node::Const(m)) = (&target_node, &meta_node) {
                    if let Ok(tagged) = t.with_meta(m.clone()) {
                        return Ok(Node::Const(tagged));
                    }
                }
                Ok(Node::WithMeta {
                    expr: Box::new(target_node),
                    meta: Box::new(meta_node),
                })
            }
            FormKind::Regex(src) => {
                let pattern =
                    Pattern::compile(src).map_err(|e| e.with_pos(form.line, form.col))?;
                Ok(Node::Const(Value::Regex(Rc::new(pattern))))
            }
            FormKind::Tagged(tag, inner) => {
                let v = apply_data_reader(self.interp, tag, inner)
                    .map_err(|e| e.with_pos(form.line, form.col))?;
                Ok(Node::Const(v))
            }
        }
    }

    fn analyze_symbol(&mut self, sym: &Rc<Symbol>, form: &Form, ctx: &Ctx) -> Result<Node> {
        if sym.ns.is_none() {
            if ctx.has_local(&sym.name) {
                return Ok(Node::Local(sym.name.clone()));
            }
            if &*sym.name == "&" {
                return Err(Error::analyze("& outside of a parameter vector")
                    .with_pos(form.line, form.col));
            }
        }
        let var = self
            .interp
            .resolve(sym)
            .map_err(|e| e.with_pos(form.line, form.col))?;
        Ok(Node::VarRef(var))
    }

    fn analyze_list(&mut self, form: &Form, items: &[Form], ctx: &Ctx) -> Result<Node> {
        if items.is_empty() {
            return Ok(Node::Const(Value::empty_list()));
        }
        // Macro expansion loop: expand while the head resolves to a
        // macro-marked var.
        let mut current: Option<Form> = None;
        for _ in 0..MACRO_EXPANSION_LIMIT {
            if let Some(f) = &current {
                if !matches!(&f.kind, FormKind::List(expanded) if !expanded.is_empty()) {
                    // Expansion produced a non-list (or empty list):
                    // analyze it directly.
                    let f = f.clone();
                    return self.analyze(&f, ctx);
                }
            }
            let (head, rest): (&Form, &[Form]) = match &current {
                None => (&items[0], &items[1..]),
                Some(f) => match &f.kind {
                    FormKind::List(expanded_items) => {
                        (&expanded_items[0], &expanded_items[1..])
                    }
                    _ => unreachable!("non-list expansion handled above"),
                },
            };
            if let FormKind::Symbol(sym) = &head.kind {
                if sym.ns.is_none() && !ctx.has_local(&sym.name) {
                    if let Some(node) = self.analyze_special(&sym.name, form, rest, ctx)? {
                        return Ok(node);
                    }
                }
                let shadowed = sym.ns.is_none() && ctx.has_local(&sym.name);
                if !shadowed {
                    if let Some(var) = self.interp.maybe_resolve(sym) {
                        if var.macro_flag.get() {
                            trace!(macro_name = %var.qualified_name(), "expanding macro");
                            let expanded = expand_macro_call(self.interp, &var, rest, form)?;
                            current = Some(expanded);
                            continue;
                        }
                    }
                }
            }
            // Not a macro call: plain invoke.
            let all: Vec<Form> = match &current {
                None => items.to_vec(),
                Some(f) => match &f.kind {
                    FormKind::List(expanded_items) => expanded_items.clone(),
                    _ => unreachable!("non-list handled above"),
                },
            };
            let f_node = self.analyze(&all[0], &ctx.non_tail())?;
            let args = all[1..]
                .iter()
                .map(|a| self.analyze(a, &ctx.non_tail()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Node::Invoke {
                f: Box::new(f_node),
                args,
                line: form.line,
                col: form.col,
            });
        }
        Err(Error::value(format!(
            "macro expansion exceeded {} iterations",
            MACRO_EXPANSION_LIMIT
        ))
        .with_pos(form.line, form.col))
    }

    /// Dispatch on special-form head symbols. Returns None when the head
    /// is not special.
    fn analyze_special(
        &mut self,
        name: &str,
        form: &Form,
        rest: &[Form],
        ctx: &Ctx,
    ) -> Result<Option<Node>> {
        let node = match name {
            "def" => self.analyze_def(form, rest, ctx, false)?,
            "defn" => self.analyze_defn(form, rest, ctx, false)?,
            "defmacro" => self.analyze_defn(form, rest, ctx, true)?,
            "fn" | "fn*" => self.analyze_fn(form, rest, ctx)?,
            "let" | "let*" => self.analyze_let(form, rest, ctx, false)?,
            "loop" | "loop*" => self.analyze_let(form, rest, ctx, true)?,
            "recur" => self.analyze_recur(form, rest, ctx)?,
            "if" => self.analyze_if(form, rest, ctx)?,
            "do" => {
                let body = self.analyze_body(rest, ctx)?;
                Node::Do(body)
            }
            "quote" => {
                let inner = rest.first().ok_or_else(|| {
                    Error::analyze("quote expects a form").with_pos(form.line, form.col)
                })?;
                Node::Const(form_to_value(self.interp, inner)?)
            }
            "var" => {
                let inner = rest.first().ok_or_else(|| {
                    Error::analyze("var expects a symbol").with_pos(form.line, form.col)
                })?;
                match &inner.kind {
                    FormKind::Symbol(sym) => {
                        let var = self
                            .interp
                            .resolve(sym)
                            .map_err(|e| e.with_pos(form.line, form.col))?;
                        Node::Const(Value::Var(var))
                    }
                    _ => {
                        return Err(Error::analyze("var expects a symbol")
                            .with_pos(form.line, form.col))
                    }
                }
            }
            "set!" => self.analyze_set(form, rest, ctx)?,
            "throw" => {
                let inner = rest.first().ok_or_else(|| {
                    Error::analyze("throw expects a value").with_pos(form.line, form.col)
                })?;
                Node::Throw(Box::new(self.analyze(inner, &ctx.non_tail())?))
            }
            "try" => self.analyze_try(form, rest, ctx)?,
            "catch" | "finally" => {
                return Err(Error::analyze(format!("{} used outside of try", name))
                    .with_pos(form.line, form.col))
            }
            "case" | "case*" => self.analyze_case(form, rest, ctx)?,
            "." | "new" | "deftype*" | "reify*" => {
                return Err(Error::analyze(format!(
                    "{} requires host interop, which this runtime does not provide",
                    name
                ))
                .with_pos(form.line, form.col))
            }
            _ => return Ok(None),
        };
        Ok(Some(node))
    }

    fn analyze_body(&mut self, forms: &[Form], ctx: &Ctx) -> Result<Vec<Node>> {
        let mut body = Vec::with_capacity(forms.len());
        for (i, f) in forms.iter().enumerate() {
            // Only the last form inherits tail position.
            let child_ctx = if i + 1 == forms.len() && ctx.in_tail {
                ctx.tail()
            } else {
                ctx.non_tail()
            };
            body.push(self.analyze(f, &child_ctx)?);
        }
        Ok(body)
    }

    fn analyze_if(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        if rest.len() < 2 || rest.len() > 3 {
            return Err(
                Error::analyze("if expects a test, a then branch, and an optional else")
                    .with_pos(form.line, form.col),
            );
        }
        let test = self.analyze(&rest[0], &ctx.non_tail())?;
        let then = self.analyze(&rest[1], ctx)?;
        let els = match rest.get(2) {
            Some(f) => Some(Box::new(self.analyze(f, ctx)?)),
            None => None,
        };
        Ok(Node::If {
            test: Box::new(test),
            then: Box::new(then),
            els,
        })
    }

    fn analyze_let(
        &mut self,
        form: &Form,
        rest: &[Form],
        ctx: &Ctx,
        is_loop: bool,
    ) -> Result<Node> {
        let bindings_form = rest.first().ok_or_else(|| {
            Error::analyze("let expects a binding vector").with_pos(form.line, form.col)
        })?;
        let binding_forms = match &bindings_form.kind {
            FormKind::Vector(items) => items,
            _ => {
                return Err(Error::analyze("let expects a binding vector")
                    .with_pos(form.line, form.col))
            }
        };
        if binding_forms.len() % 2 != 0 {
            return Err(Error::analyze("let binding vector must have an even number of forms")
                .with_pos(form.line, form.col));
        }
        let mut inner_ctx = ctx.clone();
        let mut bindings = Vec::with_capacity(binding_forms.len() / 2);
        for pair in binding_forms.chunks(2) {
            let name = expect_simple_symbol(&pair[0], "let binding")?;
            // Each init sees the bindings established before it.
            let init = self.analyze(&pair[1], &inner_ctx.non_tail())?;
            inner_ctx.locals.push(name.clone());
            bindings.push((name, init));
        }
        if is_loop {
            inner_ctx.recur_arity = Some(bindings.len());
            inner_ctx.in_tail = true;
        }
        let body = self.analyze_body(&rest[1..], &inner_ctx)?;
        Ok(if is_loop {
            Node::Loop { bindings, body }
        } else {
            Node::Let { bindings, body }
        })
    }

    fn analyze_recur(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        if !ctx.in_tail {
            return Err(Error::analyze("recur is only allowed in tail position")
                .with_pos(form.line, form.col));
        }
        let arity = ctx.recur_arity.ok_or_else(|| {
            Error::analyze("recur outside of a loop or fn").with_pos(form.line, form.col)
        })?;
        if rest.len() != arity {
            return Err(Error::analyze(format!(
                "recur expects {} args to match its target, got {}",
                arity,
                rest.len()
            ))
            .with_pos(form.line, form.col));
        }
        let args = rest
            .iter()
            .map(|f| self.analyze(f, &ctx.non_tail()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::Recur(args))
    }

    fn analyze_fn(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        let mut rest = rest;
        let name = match rest.first().map(|f| &f.kind) {
            Some(FormKind::Symbol(sym)) if sym.ns.is_none() => {
                rest = &rest[1..];
                Some(sym.name.clone())
            }
            _ => None,
        };
        // Either ([params] body...) directly or (([p] b...) ([p q] b...)).
        let arity_forms: Vec<&[Form]> = match rest.first().map(|f| &f.kind) {
            Some(FormKind::Vector(_)) => vec![rest],
            Some(FormKind::List(_)) => rest
                .iter()
                .map(|f| match &f.kind {
                    FormKind::List(items) => Ok(items.as_slice()),
                    _ => Err(Error::analyze("fn arity must be a list")
                        .with_pos(f.line, f.col)),
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(Error::analyze("fn expects a parameter vector")
                    .with_pos(form.line, form.col))
            }
        };
        let mut arities = Vec::with_capacity(arity_forms.len());
        for arity_form in arity_forms {
            arities.push(self.analyze_arity(form, arity_form, name.as_ref(), ctx)?);
        }
        let variadic_count = arities.iter().filter(|a| a.rest.is_some()).count();
        if variadic_count > 1 {
            return Err(Error::analyze("fn may have at most one variadic arity")
                .with_pos(form.line, form.col));
        }
        let mut seen = std::collections::HashSet::new();
        for a in &arities {
            if a.rest.is_none() && !seen.insert(a.params.len()) {
                return Err(Error::analyze("fn has two arities with the same arg count")
                    .with_pos(form.line, form.col));
            }
        }
        Ok(Node::MakeFn(Rc::new(FnProto { name, arities })))
    }

    fn analyze_arity(
        &mut self,
        form: &Form,
        arity: &[Form],
        fn_name: Option<&Rc<str>>,
        ctx: &Ctx,
    ) -> Result<FnArity> {
        let params_form = arity.first().ok_or_else(|| {
            Error::analyze("fn arity expects a parameter vector").with_pos(form.line, form.col)
        })?;
        let param_forms = match &params_form.kind {
            FormKind::Vector(items) => items,
            _ => {
                return Err(Error::analyze("fn arity expects a parameter vector")
                    .with_pos(params_form.line, params_form.col))
            }
        };
        let mut params = Vec::new();
        let mut rest_param = None;
        let mut saw_amp = false;
        for p in param_forms {
            let name = expect_simple_symbol(p, "fn parameter")?;
            if &*name == "&" {
                if saw_amp {
                    return Err(Error::analyze("fn parameters may have only one &")
                        .with_pos(p.line, p.col));
                }
                saw_amp = true;
                continue;
            }
            if saw_amp {
                if rest_param.is_some() {
                    return Err(Error::analyze("only one parameter may follow &")
                        .with_pos(p.line, p.col));
                }
                rest_param = Some(name);
            } else {
                params.push(name);
            }
        }
        if saw_amp && rest_param.is_none() {
            return Err(Error::analyze("& must be followed by a rest parameter")
                .with_pos(params_form.line, params_form.col));
        }
        let mut inner_ctx = ctx.clone();
        if let Some(name) = fn_name {
            inner_ctx.locals.push(name.clone());
        }
        inner_ctx.locals.extend(params.iter().cloned());
        if let Some(rest) = &rest_param {
            inner_ctx.locals.push(rest.clone());
        }
        inner_ctx.recur_arity = Some(params.len() + usize::from(rest_param.is_some()));
        inner_ctx.in_tail = true;
        let body = self.analyze_body(&arity[1..], &inner_ctx)?;
        Ok(FnArity {
            params,
            rest: rest_param,
            body,
        })
    }

    fn analyze_def(
        &mut self,
        form: &Form,
        rest: &[Form],
        ctx: &Ctx,
        macro_flag: bool,
    ) -> Result<Node> {
        let (sym_form, rest) = rest.split_first().ok_or_else(|| {
            Error::analyze("def expects a symbol").with_pos(form.line, form.col)
        })?;
        // ^meta on the name merges into the var.
        let (meta_form, sym) = match &sym_form.kind {
            FormKind::Meta(meta, target) => match &target.kind {
                FormKind::Symbol(sym) => (Some((**meta).clone()), sym.clone()),
                _ => {
                    return Err(Error::analyze("def expects a symbol")
                        .with_pos(sym_form.line, sym_form.col))
                }
            },
            FormKind::Symbol(sym) => (None, sym.clone()),
            _ => {
                return Err(Error::analyze("def expects a symbol")
                    .with_pos(sym_form.line, sym_form.col))
            }
        };
        if let Some(ns) = &sym.ns {
            if **ns != *self.interp.current_ns().name {
                return Err(Error::analyze(format!(
                    "cannot def {} outside its namespace",
                    sym.name
                ))
                .with_pos(form.line, form.col));
            }
        }
        // (def sym), (def sym init), (def sym "doc" init)
        let (doc, init_form) = match rest {
            [] => (None, None),
            [init] => (None, Some(init)),
            [doc_form, init] => match &doc_form.kind {
                FormKind::Str(doc) => (Some(doc.clone()), Some(init)),
                _ => {
                    return Err(Error::analyze("def expects (def name doc-string? init?)")
                        .with_pos(form.line, form.col))
                }
            },
            _ => {
                return Err(Error::analyze("too many arguments to def")
                    .with_pos(form.line, form.col))
            }
        };
        // Intern now so the init can refer to the var being defined.
        let var = self.interp.current_ns().intern(&sym.name);
        if let Some(doc) = doc {
            var.assoc_meta(Value::keyword(None, "doc"), Value::string(doc));
        }
        var.assoc_meta(Value::keyword(None, "line"), Value::Int(form.line as i64));
        let meta_node = match meta_form {
            Some(f) => Some(Box::new(self.analyze(&f, &ctx.non_tail())?)),
            None => None,
        };
        let init = match init_form {
            Some(f) => Some(Box::new(self.analyze(f, &ctx.non_tail())?)),
            None => None,
        };
        Ok(Node::Def {
            var,
            init,
            meta: meta_node,
            macro_flag,
        })
    }

    /// defn / defmacro sugar: (defn name doc? [params] body...) or
    /// multi-arity. Lowered to (def name doc? (fn name ...)).
    fn analyze_defn(
        &mut self,
        form: &Form,
        rest: &[Form],
        ctx: &Ctx,
        macro_flag: bool,
    ) -> Result<Node> {
        let (name_form, rest) = rest.split_first().ok_or_else(|| {
            Error::analyze("defn expects a name").with_pos(form.line, form.col)
        })?;
        let mut def_forms = vec![name_form.clone()];
        let mut fn_tail = rest;
        if let Some(first) = fn_tail.first() {
            if matches!(&first.kind, FormKind::Str(_)) && fn_tail.len() > 1 {
                def_forms.push(first.clone());
                fn_tail = &fn_tail[1..];
            }
        }
        let mut fn_items = vec![Form::at(
            FormKind::Symbol(Rc::new(Symbol::simple("fn"))),
            form,
        )];
        // Carry the name through for self-recursion and error reporting.
        if let FormKind::Symbol(_) = &strip_meta(name_form).kind {
            fn_items.push(strip_meta(name_form).clone());
        }
        fn_items.extend(fn_tail.iter().cloned());
        def_forms.push(Form::at(FormKind::List(fn_items), form));
        self.analyze_def(form, &def_forms, ctx, macro_flag)
    }

    fn analyze_set(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        if rest.len() != 2 {
            return Err(Error::analyze("set! expects a var symbol and a value")
                .with_pos(form.line, form.col));
        }
        let sym = match &rest[0].kind {
            FormKind::Symbol(sym) => sym,
            _ => {
                return Err(Error::analyze("set! target must be a symbol")
                    .with_pos(form.line, form.col))
            }
        };
        let var = self
            .interp
            .resolve(sym)
            .map_err(|e| e.with_pos(form.line, form.col))?;
        let expr = self.analyze(&rest[1], &ctx.non_tail())?;
        Ok(Node::SetBang {
            var,
            expr: Box::new(expr),
        })
    }

    fn analyze_try(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        let mut body = Vec::new();
        let mut catches = Vec::new();
        let mut finally = None;
        // recur may not cross a try boundary.
        let inner_ctx = ctx.non_tail();
        for f in rest {
            let clause = match &f.kind {
                FormKind::List(items) if !items.is_empty() => {
                    match &items[0].kind {
                        FormKind::Symbol(s) if s.ns.is_none() && &*s.name == "catch" => {
                            Some(("catch", items))
                        }
                        FormKind::Symbol(s) if s.ns.is_none() && &*s.name == "finally" => {
                            Some(("finally", items))
                        }
                        _ => None,
                    }
                }
                _ => None,
            };
            match clause {
                Some(("catch", items)) => {
                    if items.len() < 3 {
                        return Err(Error::analyze(
                            "catch expects a type filter and a binding symbol",
                        )
                        .with_pos(f.line, f.col));
                    }
                    let filter = match &items[1].kind {
                        FormKind::Keyword(kw) => {
                            let is_default = matches!(
                                kw,
                                Value::Keyword(k) if k.ns.is_none() && &*k.name == "default"
                            );
                            if is_default {
                                CatchFilter::Default
                            } else {
                                CatchFilter::TypeKeyword(kw.clone())
                            }
                        }
                        FormKind::Symbol(_) => CatchFilter::AnyError,
                        _ => {
                            return Err(Error::analyze(
                                "catch filter must be a keyword or class symbol",
                            )
                            .with_pos(items[1].line, items[1].col))
                        }
                    };
                    let binding = expect_simple_symbol(&items[2], "catch binding")?;
                    let mut catch_ctx = inner_ctx.clone();
                    catch_ctx.locals.push(binding.clone());
                    let catch_body = items[3..]
                        .iter()
                        .map(|f| self.analyze(f, &catch_ctx))
                        .collect::<Result<Vec<_>>>()?;
                    catches.push(CatchClause {
                        filter,
                        binding,
                        body: catch_body,
                    });
                }
                Some(("finally", items)) => {
                    if finally.is_some() {
                        return Err(Error::analyze("try allows only one finally clause")
                            .with_pos(f.line, f.col));
                    }
                    let fin_body = items[1..]
                        .iter()
                        .map(|f| self.analyze(f, &inner_ctx))
                        .collect::<Result<Vec<_>>>()?;
                    finally = Some(fin_body);
                }
                _ => {
                    if !catches.is_empty() || finally.is_some() {
                        return Err(Error::analyze(
                            "try body forms must precede catch/finally clauses",
                        )
                        .with_pos(f.line, f.col));
                    }
                    body.push(self.analyze(f, &inner_ctx)?);
                }
            }
        }
        Ok(Node::Try {
            body,
            catches,
            finally,
        })
    }

    fn analyze_case(&mut self, form: &Form, rest: &[Form], ctx: &Ctx) -> Result<Node> {
        let (expr_form, rest) = rest.split_first().ok_or_else(|| {
            Error::analyze("case expects an expression").with_pos(form.line, form.col)
        })?;
        let expr = self.analyze(expr_form, &ctx.non_tail())?;
        let mut clauses = Vec::new();
        let mut default = None;
        let mut i = 0;
        while i < rest.len() {
            if i + 1 == rest.len() {
                // Trailing form is the default expression.
                default = Some(Box::new(self.analyze(&rest[i], ctx)?));
                break;
            }
            let test_form = &rest[i];
            let result = self.analyze(&rest[i + 1], ctx)?;
            // A list groups several constants for one result.
            let consts = match &test_form.kind {
                FormKind::List(items) => items
                    .iter()
                    .map(|f| form_to_value(self.interp, f))
                    .collect::<Result<Vec<_>>>()?,
                _ => vec![form_to_value(self.interp, test_form)?],
            };
            clauses.push((consts, result));
            i += 2;
        }
        Ok(Node::Case {
            expr: Box::new(expr),
            clauses,
            default,
        })
    }
}

fn strip_meta(form: &Form) -> &Form {
    match &form.kind {
        FormKind::Meta(_, target) => target,
        _ => form,
    }
}

fn expect_simple_symbol(form: &Form, what: &str) -> Result<Rc<str>> {
    match &strip_meta(form).kind {
        FormKind::Symbol(sym) if sym.ns.is_none() => Ok(sym.name.clone()),
        _ => Err(
            Error::analyze(format!("{} must be an unqualified symbol", what))
                .with_pos(form.line, form.col),
        ),
    }
}

fn all_const(nodes: &[Node]) -> bool {
    nodes.iter().all(|n| matches!(n, Node::Const(_)))
}

fn fold_vector(nodes: Vec<Node>) -> Node {
    if all_const(&nodes) {
        let items = nodes
            .into_iter()
            .map(|n| match n {
                Node::Const(v) => v,
                _ => unreachable!(),
            })
            .collect();
        Node::Const(Value::vector_from(items))
    } else {
        Node::VectorLit(nodes)
    }
}

fn fold_map(pairs: Vec<(Node, Node)>) -> Node {
    if pairs.iter().all(|(k, v)| {
        matches!(k, Node::Const(_)) && matches!(v, Node::Const(_))
    }) {
        let mut entries = PersistentMap::new();
        for (k, v) in pairs {
            if let (Node::Const(k), Node::Const(v)) = (k, v) {
                entries = entries.assoc(k, v);
            }
        }
        Node::Const(Value::map(entries))
    } else {
        Node::MapLit(pairs)
    }
}

fn fold_set(nodes: Vec<Node>) -> Node {
    if all_const(&nodes) {
        let mut items = PersistentSet::new();
        for n in nodes {
            if let Node::Const(v) = n {
                items = items.conj(v);
            }
        }
        Node::Const(Value::set(items))
    } else {
        Node::SetLit(nodes)
    }
}

/// Invoke a macro var with unevaluated argument forms, producing the
/// replacement form.
fn expand_macro_call(
    interp: &mut Interp,
    var: &Rc<Var>,
    args: &[Form],
    call_form: &Form,
) -> Result<Form> {
    let macro_fn = interp.deref_var(var)?;
    let arg_values = args
        .iter()
        .map(|f| form_to_value(interp, f))
        .collect::<Result<Vec<_>>>()?;
    let result = interp.apply(&macro_fn, arg_values)?;
    value_to_form(interp, &result, call_form.line, call_form.col)
}

/// One step of macro expansion for the macroexpand-1 builtin. Returns the
/// input unchanged when the form is not a macro call.
pub fn macroexpand_1(interp: &mut Interp, form: &Value) -> Result<Value> {
    let items = match form {
        Value::List(l) => l.items.iter().cloned().collect::<Vec<_>>(),
        _ => return Ok(form.clone()),
    };
    let Some(Value::Symbol(sym)) = items.first() else {
        return Ok(form.clone());
    };
    let Some(var) = interp.maybe_resolve(sym) else {
        return Ok(form.clone());
    };
    if !var.macro_flag.get() {
        return Ok(form.clone());
    }
    let macro_fn = interp.deref_var(&var)?;
    interp.apply(&macro_fn, items[1..].to_vec())
}

/// Repeated expansion to a fixed point, bounded at
/// [`MACRO_EXPANSION_LIMIT`] iterations.
pub fn macroexpand(interp: &mut Interp, form: &Value) -> Result<Value> {
    let mut current = form.clone();
    for _ in 0..MACRO_EXPANSION_LIMIT {
        let next = macroexpand_1(interp, &current)?;
        if interp.equiv(&next, &current)? {
            return Ok(next);
        }
        current = next;
    }
    Err(Error::value(format!(
        "macroexpand exceeded {} iterations",
        MACRO_EXPANSION_LIMIT
    )))
}

/// Quoted data: a form as the value it denotes.
pub fn form_to_value(interp: &mut Interp, form: &Form) -> Result<Value> {
    Ok(match &form.kind {
        FormKind::Nil => Value::Nil,
        FormKind::Bool(b) => Value::Bool(*b),
        FormKind::Int(n) => Value::Int(*n),
        FormKind::Float(f) => Value::Float(*f),
        FormKind::Char(c) => Value::Char(*c),
        FormKind::Str(s) => Value::string(s.as_str()),
        FormKind::Symbol(sym) => Value::Symbol(sym.clone()),
        FormKind::Keyword(kw) => kw.clone(),
        FormKind::Const(v) => v.clone(),
        FormKind::List(items) => {
            let converted = items
                .iter()
                .map(|f| form_to_value(interp, f))
                .collect::<Result<Vec<_>>>()?;
            Value::list_from(converted)
        }
        FormKind::Vector(items) => {
            let converted = items
                .iter()
                .map(|f| form_to_value(interp, f))
                .collect::<Result<Vec<_>>>()?;
            Value::vector_from(converted)
        }
        FormKind::Map(items) => {
            let mut entries = PersistentMap::new();
            for kv in items.chunks(2) {
                let k = form_to_value(interp, &kv[0])?;
                let v = form_to_value(interp, &kv[1])?;
                entries = entries.assoc(k, v);
            }
            Value::map(entries)
        }
        FormKind::Set(items) => {
            let mut set = PersistentSet::new();
            for f in items {
                set = set.conj(form_to_value(interp, f)?);
            }
            Value::set(set)
        }
        FormKind::Quote(inner) => Value::list_from(vec![
            Value::simple_symbol("quote"),
            form_to_value(interp, inner)?,
        ]),
        FormKind::SyntaxQuote(inner) => {
            let expanded = syntax_quote::expand(interp, inner)?;
            form_to_value(interp, &expanded)?
        }
        FormKind::Unquote(inner) => Value::list_from(vec![
            Value::simple_symbol("unquote"),
            form_to_value(interp, inner)?,
        ]),
        FormKind::UnquoteSplicing(inner) => Value::list_from(vec![
            Value::simple_symbol("unquote-splicing"),
            form_to_value(interp, inner)?,
        ]),
        FormKind::Deref(inner) => Value::list_from(vec![
            Value::simple_symbol("deref"),
            form_to_value(interp, inner)?,
        ]),
        FormKind::VarQuote(inner) => Value::list_from(vec![
            Value::simple_symbol("var"),
            form_to_value(interp, inner)?,
        ]),
        FormKind::Meta(meta, target) => {
            let meta_value = form_to_value(interp, meta)?;
            let target_value = form_to_value(interp, target)?;
            target_value.with_meta(meta_value).unwrap_or(target_value)
        }
        FormKind::Regex(src) => Value::Regex(Rc::new(
            Pattern::compile(src).map_err(|e| e.with_pos(form.line, form.col))?,
        )),
        FormKind::Tagged(tag, inner) => apply_data_reader(interp, tag, inner)
            .map_err(|e| e.with_pos(form.line, form.col))?,
    })
}

/// Macro output back to a form for re-analysis. Opaque values embed as
/// constants.
pub fn value_to_form(interp: &mut Interp, value: &Value, line: u32, col: u32) -> Result<Form> {
    let kind = match value {
        Value::Nil => FormKind::Nil,
        Value::Bool(b) => FormKind::Bool(*b),
        Value::Int(n) => FormKind::Int(*n),
        Value::Float(f) => FormKind::Float(*f),
        Value::Char(c) => FormKind::Char(*c),
        Value::Str(s) => FormKind::Str(s.to_string()),
        Value::Symbol(sym) => FormKind::Symbol(sym.clone()),
        Value::Keyword(_) => FormKind::Keyword(value.clone()),
        Value::List(_) | Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
            let items = interp.seq_to_vec(value)?;
            let forms = items
                .iter()
                .map(|v| value_to_form(interp, v, line, col))
                .collect::<Result<Vec<_>>>()?;
            FormKind::List(forms)
        }
        Value::Vector(v) => {
            let forms = v
                .items
                .iter()
                .map(|v| value_to_form(interp, &v.clone(), line, col))
                .collect::<Result<Vec<_>>>()?;
            FormKind::Vector(forms)
        }
        Value::Map(m) => {
            let mut forms = Vec::with_capacity(m.entries.len() * 2);
            for (k, v) in m.entries.iter() {
                forms.push(value_to_form(interp, &k.clone(), line, col)?);
                forms.push(value_to_form(interp, &v.clone(), line, col)?);
            }
            FormKind::Map(forms)
        }
        Value::Set(s) => {
            let forms = s
                .items
                .iter()
                .map(|v| value_to_form(interp, &v.clone(), line, col))
                .collect::<Result<Vec<_>>>()?;
            FormKind::Set(forms)
        }
        other => FormKind::Const(other.clone()),
    };
    Ok(Form::new(kind, line, col))
}

/// Tagged literal handling: consult *data-readers*, then
/// *default-data-reader-fn*, else a read error.
fn apply_data_reader(interp: &mut Interp, tag: &str, inner: &Form) -> Result<Value> {
    let literal = form_to_value(interp, inner)?;
    let readers = interp.dynamic_value("*data-readers*");
    if let Value::Map(m) = &readers {
        let key = Value::simple_symbol(tag);
        if let Some(reader_fn) = m.entries.get(&key) {
            let reader_fn = reader_fn.clone();
            return interp.apply(&reader_fn, vec![literal]);
        }
    }
    let fallback = interp.dynamic_value("*default-data-reader-fn*");
    if fallback.is_truthy() {
        return interp.apply(&fallback, vec![Value::simple_symbol(tag), literal]);
    }
    Err(Error::new(
        ErrorKind::Read,
        format!("no reader function for tag {}", tag),
    ))
}
