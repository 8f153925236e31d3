//! Printing: readable (pr) and display (str) modes
//!
//! pr-str output round-trips through the reader for all printable data:
//! strings regain their quotes and escapes, chars their backslash names,
//! keywords their colons. Display mode is what `(str ...)` concatenates:
//! strings raw, chars raw.
//!
//! Honors *print-readably*, *print-length*, *print-level* and
//! *print-meta*. Lazy seqs realize when printed.

use std::fmt::Write;

use crate::error::Result;
use crate::interp::Interp;
use crate::value::Value;

struct PrintCfg {
    readably: bool,
    length: Option<usize>,
    level: Option<usize>,
    meta: bool,
}

fn cfg(interp: &Interp, readably: bool) -> PrintCfg {
    let readably = readably && interp.dynamic_value("*print-readably*").is_truthy();
    let length = match interp.dynamic_value("*print-length*") {
        Value::Int(n) if n >= 0 => Some(n as usize),
        _ => None,
    };
    let level = match interp.dynamic_value("*print-level*") {
        Value::Int(n) if n >= 0 => Some(n as usize),
        _ => None,
    };
    let meta = interp.dynamic_value("*print-meta*").is_truthy();
    PrintCfg {
        readably,
        length,
        level,
        meta,
    }
}

/// Readable print; must round-trip through the reader for data values.
pub fn pr_str(interp: &mut Interp, v: &Value) -> Result<String> {
    let cfg = cfg(interp, true);
    let mut out = String::new();
    write_value(interp, &mut out, v, &cfg, 0)?;
    Ok(out)
}

/// Non-readable print, the `(str ...)` flavor.
pub fn display_str(interp: &mut Interp, v: &Value) -> Result<String> {
    let cfg = cfg(interp, false);
    let mut out = String::new();
    write_value(interp, &mut out, v, &cfg, 0)?;
    Ok(out)
}

pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "##NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "##Inf" } else { "##-Inf" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e17 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn write_string_readably(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_char_readably(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\newline"),
        ' ' => out.push_str("\\space"),
        '\t' => out.push_str("\\tab"),
        '\r' => out.push_str("\\return"),
        '\u{8}' => out.push_str("\\backspace"),
        '\u{c}' => out.push_str("\\formfeed"),
        c => {
            out.push('\\');
            out.push(c);
        }
    }
}

fn write_items(
    interp: &mut Interp,
    out: &mut String,
    items: &[Value],
    cfg: &PrintCfg,
    depth: usize,
    open: &str,
    close: &str,
    pairwise: bool,
) -> Result<()> {
    out.push_str(open);
    let limit = cfg.length.unwrap_or(usize::MAX);
    let step = if pairwise { 2 } else { 1 };
    let mut printed = 0;
    let mut i = 0;
    while i < items.len() {
        if printed > 0 {
            out.push_str(if pairwise { ", " } else { " " });
        }
        if printed >= limit {
            out.push_str("...");
            break;
        }
        write_value(interp, out, &items[i], cfg, depth + 1)?;
        if pairwise && i + 1 < items.len() {
            out.push(' ');
            write_value(interp, out, &items[i + 1], cfg, depth + 1)?;
        }
        printed += 1;
        i += step;
    }
    out.push_str(close);
    Ok(())
}

fn write_value(
    interp: &mut Interp,
    out: &mut String,
    v: &Value,
    cfg: &PrintCfg,
    depth: usize,
) -> Result<()> {
    if let Some(level) = cfg.level {
        if depth > level {
            out.push('#');
            return Ok(());
        }
    }
    if cfg.meta {
        let meta = v.meta();
        if !matches!(meta, Value::Nil) {
            out.push('^');
            write_value(interp, out, &meta, cfg, depth)?;
            out.push(' ');
        }
    }
    match v {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Value::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Char(c) => {
            if cfg.readably {
                write_char_readably(out, *c);
            } else {
                out.push(*c);
            }
        }
        Value::Str(s) => {
            if cfg.readably {
                write_string_readably(out, s);
            } else {
                out.push_str(s);
            }
        }
        Value::Symbol(s) => {
            if let Some(ns) = &s.ns {
                let _ = write!(out, "{}/", ns);
            }
            out.push_str(&s.name);
        }
        Value::Keyword(k) => {
            out.push(':');
            if let Some(ns) = &k.ns {
                let _ = write!(out, "{}/", ns);
            }
            out.push_str(&k.name);
        }
        Value::List(l) => {
            let items: Vec<Value> = l.items.iter().cloned().collect();
            write_items(interp, out, &items, cfg, depth, "(", ")", false)?;
        }
        Value::Vector(vec) => {
            let items: Vec<Value> = vec.items.iter().cloned().collect();
            write_items(interp, out, &items, cfg, depth, "[", "]", false)?;
        }
        Value::Map(m) => {
            let mut items = Vec::with_capacity(m.entries.len() * 2);
            for (k, val) in m.entries.iter() {
                items.push(k.clone());
                items.push(val.clone());
            }
            write_items(interp, out, &items, cfg, depth, "{", "}", true)?;
        }
        Value::Set(s) => {
            let items: Vec<Value> = s.items.iter().cloned().collect();
            write_items(interp, out, &items, cfg, depth, "#{", "}", false)?;
        }
        Value::Cons(_) | Value::LazySeq(_) | Value::ChunkedCons(_) => {
            // Bound realization when *print-length* is set, so printing
            // an infinite seq terminates.
            let items = match cfg.length {
                Some(limit) => interp.seq_take(v, limit + 1)?,
                None => interp.seq_to_vec(v)?,
            };
            write_items(interp, out, &items, cfg, depth, "(", ")", false)?;
        }
        Value::Chunk(c) => {
            let items = c.items().to_vec();
            write_items(interp, out, &items, cfg, depth, "(", ")", false)?;
        }
        Value::ChunkBuffer(_) => out.push_str("#<chunk-buffer>"),
        Value::Atom(a) => {
            out.push_str("#<atom ");
            let inner = a.value.borrow().clone();
            write_value(interp, out, &inner, cfg, depth + 1)?;
            out.push('>');
        }
        Value::Volatile(c) => {
            out.push_str("#<volatile ");
            let inner = c.value.borrow().clone();
            write_value(interp, out, &inner, cfg, depth + 1)?;
            out.push('>');
        }
        Value::Delay(d) => {
            if d.is_realized() {
                out.push_str("#<delay realized>");
            } else {
                out.push_str("#<delay pending>");
            }
        }
        Value::Reduced(r) => {
            out.push_str("#<reduced ");
            write_value(interp, out, r, cfg, depth + 1)?;
            out.push('>');
        }
        Value::Fn(f) => {
            match &f.proto.name {
                Some(name) => {
                    let _ = write!(out, "#<fn {}/{}>", f.ns_name, name);
                }
                None => {
                    let _ = write!(out, "#<fn {}/anonymous>", f.ns_name);
                }
            };
        }
        Value::Builtin(b) => {
            let _ = write!(out, "#<builtin {}>", b.name);
        }
        Value::ProtocolFn(p) => {
            let _ = write!(out, "#<protocol-fn {}/{}>", p.protocol.name, p.name);
        }
        Value::MultiFn(m) => {
            let _ = write!(out, "#<multi-fn {}>", m.name);
        }
        Value::Var(var) => {
            let _ = write!(out, "#'{}", var.qualified_name());
        }
        Value::Regex(p) => {
            out.push_str("#\"");
            out.push_str(&p.source);
            out.push('"');
        }
        Value::Matcher(_) => out.push_str("#<matcher>"),
        Value::Protocol(p) => {
            let _ = write!(out, "#<protocol {}>", p.name);
        }
        Value::TransientVector(_) => out.push_str("#<transient-vector>"),
        Value::TransientMap(_) => out.push_str("#<transient-map>"),
        Value::TransientSet(_) => out.push_str("#<transient-set>"),
    }
    Ok(())
}
