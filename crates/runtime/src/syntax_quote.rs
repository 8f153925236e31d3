//! Syntax-quote lowering
//!
//! A syntax-quoted form lowers to ordinary data-construction code:
//! collections become `(seq (concat ...))` / `(vec (concat ...))` chains,
//! symbols are namespace-qualified against the current namespace (a
//! resolvable symbol takes its var's namespace), and `x#` symbols get a
//! gensym that is stable within the enclosing syntax-quote form.
//!
//! Unquote splices the expression in place; unquote-splicing splices a
//! sequence and is only legal inside a collection context.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::reader::{Form, FormKind};
use crate::value::Symbol;

/// Special-form names that stay unqualified under syntax-quote.
const SPECIAL_NAMES: &[&str] = &[
    "def", "defn", "defmacro", "fn", "fn*", "let", "let*", "loop", "loop*", "recur", "if", "do",
    "quote", "var", ".", "new", "set!", "try", "catch", "finally", "throw", "case", "case*", "&",
];

pub fn expand(interp: &mut Interp, form: &Form) -> Result<Form> {
    let mut gensyms = HashMap::new();
    expand_form(interp, form, &mut gensyms)
}

fn core_sym(name: &str, template: &Form) -> Form {
    Form::at(
        FormKind::Symbol(Rc::new(Symbol::qualified("clojure.core", name))),
        template,
    )
}

fn call(head: Form, args: Vec<Form>, template: &Form) -> Form {
    let mut items = vec![head];
    items.extend(args);
    Form::at(FormKind::List(items), template)
}

fn quoted(inner: Form, template: &Form) -> Form {
    Form::at(FormKind::Quote(Box::new(inner)), template)
}

fn expand_form(
    interp: &mut Interp,
    form: &Form,
    gensyms: &mut HashMap<String, Rc<Symbol>>,
) -> Result<Form> {
    match &form.kind {
        FormKind::Symbol(sym) => {
            let resolved = resolve_symbol(interp, sym, gensyms)?;
            Ok(quoted(
                Form::at(FormKind::Symbol(resolved), form),
                form,
            ))
        }
        FormKind::Unquote(inner) => Ok((**inner).clone()),
        FormKind::UnquoteSplicing(_) => Err(Error::value(
            "unquote-splicing must appear inside a collection under syntax-quote",
        )
        .with_pos(form.line, form.col)),
        FormKind::List(items) => {
            if items.is_empty() {
                return Ok(call(core_sym("list", form), vec![], form));
            }
            let segments = expand_segments(interp, items, gensyms, form)?;
            Ok(call(
                core_sym("seq", form),
                vec![call(core_sym("concat", form), segments, form)],
                form,
            ))
        }
        FormKind::Vector(items) => {
            let segments = expand_segments(interp, items, gensyms, form)?;
            Ok(call(
                core_sym("vec", form),
                vec![call(core_sym("concat", form), segments, form)],
                form,
            ))
        }
        FormKind::Set(items) => {
            let segments = expand_segments(interp, items, gensyms, form)?;
            Ok(call(
                core_sym("set", form),
                vec![call(core_sym("concat", form), segments, form)],
                form,
            ))
        }
        FormKind::Map(items) => {
            let segments = expand_segments(interp, items, gensyms, form)?;
            Ok(call(
                core_sym("apply", form),
                vec![
                    core_sym("hash-map", form),
                    call(core_sym("concat", form), segments, form),
                ],
                form,
            ))
        }
        FormKind::Quote(inner) => {
            let inner_expanded = expand_form(interp, inner, gensyms)?;
            let quote_sym = Form::at(
                FormKind::Symbol(Rc::new(Symbol::simple("quote"))),
                form,
            );
            let segments = vec![
                call(core_sym("list", form), vec![quoted(quote_sym, form)], form),
                call(core_sym("list", form), vec![inner_expanded], form),
            ];
            Ok(call(
                core_sym("seq", form),
                vec![call(core_sym("concat", form), segments, form)],
                form,
            ))
        }
        FormKind::SyntaxQuote(inner) => {
            // Nested syntax-quote: lower the inner form with its own
            // gensym scope, then lower the result in this scope.
            let inner_expanded = expand(interp, inner)?;
            expand_form(interp, &inner_expanded, gensyms)
        }
        FormKind::Deref(inner) => {
            let lowered = call(
                core_sym("deref", form),
                vec![(**inner).clone()],
                form,
            );
            expand_form(interp, &lowered, gensyms)
        }
        FormKind::VarQuote(inner) => {
            let var_sym = Form::at(
                FormKind::Symbol(Rc::new(Symbol::simple("var"))),
                form,
            );
            let lowered = Form::at(
                FormKind::List(vec![var_sym, (**inner).clone()]),
                form,
            );
            expand_form(interp, &lowered, gensyms)
        }
        FormKind::Meta(meta, target) => {
            let target_expanded = expand_form(interp, target, gensyms)?;
            let meta_expanded = expand_form(interp, meta, gensyms)?;
            Ok(call(
                core_sym("with-meta", form),
                vec![target_expanded, meta_expanded],
                form,
            ))
        }
        // Self-evaluating forms pass through untouched.
        _ => Ok(form.clone()),
    }
}

/// Each collection element becomes a concat segment: plain elements wrap
/// in (list ...), unquotes in (list expr), splices pass through.
fn expand_segments(
    interp: &mut Interp,
    items: &[Form],
    gensyms: &mut HashMap<String, Rc<Symbol>>,
    template: &Form,
) -> Result<Vec<Form>> {
    let mut segments = Vec::with_capacity(items.len());
    for item in items {
        match &item.kind {
            FormKind::UnquoteSplicing(inner) => segments.push((**inner).clone()),
            FormKind::Unquote(inner) => {
                segments.push(call(
                    core_sym("list", template),
                    vec![(**inner).clone()],
                    item,
                ));
            }
            _ => {
                let expanded = expand_form(interp, item, gensyms)?;
                segments.push(call(core_sym("list", template), vec![expanded], item));
            }
        }
    }
    Ok(segments)
}

fn resolve_symbol(
    interp: &mut Interp,
    sym: &Rc<Symbol>,
    gensyms: &mut HashMap<String, Rc<Symbol>>,
) -> Result<Rc<Symbol>> {
    // x# gensyms: one fresh symbol per base name per syntax-quote form.
    if sym.ns.is_none() && sym.name.ends_with('#') && sym.name.len() > 1 {
        let base = sym.name[..sym.name.len() - 1].to_string();
        if let Some(existing) = gensyms.get(&base) {
            return Ok(existing.clone());
        }
        let id = interp.next_gensym_id();
        let fresh = Rc::new(Symbol::simple(&format!("{}__{}__auto__", base, id)));
        gensyms.insert(base, fresh.clone());
        return Ok(fresh);
    }
    match &sym.ns {
        Some(ns) => {
            // Qualified: expand an alias to the full namespace name.
            let current = interp.current_ns();
            let full = current.alias_target(ns).unwrap_or_else(|| ns.clone());
            Ok(Rc::new(Symbol {
                ns: Some(full),
                name: sym.name.clone(),
                meta: None,
            }))
        }
        None => {
            if SPECIAL_NAMES.contains(&&*sym.name) {
                return Ok(sym.clone());
            }
            // A resolvable symbol qualifies to its var's namespace;
            // anything else to the current namespace.
            match interp.maybe_resolve(sym) {
                Some(var) => Ok(Rc::new(Symbol {
                    ns: Some(var.ns_name.clone()),
                    name: var.name.clone(),
                    meta: None,
                })),
                None => Ok(Rc::new(Symbol {
                    ns: Some(interp.current_ns().name.clone()),
                    name: sym.name.clone(),
                    meta: None,
                })),
            }
        }
    }
}
