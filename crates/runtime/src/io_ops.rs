//! Printing, file I/O, read/eval builtins
//!
//! Printing writes to stdout/stderr directly; *out*/*err*/*in* exist as
//! dynamic vars holding stream keywords for introspection. File I/O is
//! synchronous slurp/spit.

use std::io::Write;

use crate::analyzer;
use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::printer;
use crate::support::{exact_arity, min_arity, range_arity};
use crate::value::Value;

fn join_printed(
    interp: &mut Interp,
    args: &[Value],
    readably: bool,
) -> Result<String> {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let piece = if readably {
            printer::pr_str(interp, arg)?
        } else {
            printer::display_str(interp, arg)?
        };
        out.push_str(&piece);
    }
    Ok(out)
}

pub fn pr_str_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    Ok(Value::string(join_printed(interp, args, true)?))
}

pub fn prn_str_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut s = join_printed(interp, args, true)?;
    s.push('\n');
    Ok(Value::string(s))
}

pub fn print_str_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    Ok(Value::string(join_printed(interp, args, false)?))
}

pub fn println_str_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let mut s = join_printed(interp, args, false)?;
    s.push('\n');
    Ok(Value::string(s))
}

pub fn pr(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let s = join_printed(interp, args, true)?;
    print!("{}", s);
    Ok(Value::Nil)
}

pub fn prn(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let s = join_printed(interp, args, true)?;
    println!("{}", s);
    Ok(Value::Nil)
}

pub fn print_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let s = join_printed(interp, args, false)?;
    print!("{}", s);
    Ok(Value::Nil)
}

pub fn println_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let s = join_printed(interp, args, false)?;
    println!("{}", s);
    Ok(Value::Nil)
}

pub fn newline(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("newline", args, 0)?;
    println!();
    Ok(Value::Nil)
}

pub fn flush(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("flush", args, 0)?;
    std::io::stdout()
        .flush()
        .map_err(|e| Error::value(format!("flush: {}", e)))?;
    Ok(Value::Nil)
}

pub fn slurp(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("slurp", args, 1)?;
    let path = args[0].expect_str("slurp")?;
    let content = std::fs::read_to_string(&**path)
        .map_err(|e| Error::value(format!("slurp: {}: {}", path, e)))?;
    Ok(Value::string(content))
}

pub fn spit(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("spit", args, 2)?;
    let path = args[0].expect_str("spit")?.to_string();
    let content = printer::display_str(interp, &args[1])?;
    // Optional :append true
    let mut append = false;
    let mut i = 2;
    while i < args.len() {
        if let (Value::Keyword(k), Some(v)) = (&args[i], args.get(i + 1)) {
            if k.ns.is_none() && &*k.name == "append" {
                append = v.is_truthy();
            }
        }
        i += 2;
    }
    let result = if append {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(content.as_bytes()))
    } else {
        std::fs::write(&path, content.as_bytes())
    };
    result.map_err(|e| Error::value(format!("spit: {}: {}", path, e)))?;
    Ok(Value::Nil)
}

/// Read one form from a string, as data.
pub fn read_string(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("read-string", args, 1)?;
    let source = args[0].expect_str("read-string")?.to_string();
    let forms = interp.read_forms(&source)?;
    match forms.first() {
        Some(form) => analyzer::form_to_value(interp, form),
        None => Err(Error::new(
            crate::error::ErrorKind::Read,
            "read-string: no form in input",
        )),
    }
}

/// Evaluate every form in a string, returning the last value.
pub fn load_string(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("load-string", args, 1)?;
    let source = args[0].expect_str("load-string")?.to_string();
    interp.eval_str(&source)
}

pub fn load_file(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("load-file", args, 1)?;
    let path = args[0].expect_str("load-file")?.to_string();
    let source = std::fs::read_to_string(&path)
        .map_err(|e| Error::value(format!("load-file: {}: {}", path, e)))?;
    interp.eval_str(&source)
}

/// Evaluate a form value.
pub fn eval(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("eval", args, 1)?;
    let form = analyzer::value_to_form(interp, &args[0], 0, 0)?;
    interp.eval_form(&form)
}

pub fn macroexpand_1(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("macroexpand-1", args, 1)?;
    analyzer::macroexpand_1(interp, &args[0])
}

pub fn macroexpand(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("macroexpand", args, 1)?;
    analyzer::macroexpand(interp, &args[0])
}

pub fn ex_info(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("ex-info", args, 2, 2)?;
    let message = args[0].expect_str("ex-info")?;
    let entries = ruse_core::PersistentMap::from_pairs(vec![
        (
            interp.intern_keyword(None, "type"),
            interp.intern_keyword(None, "ex-info"),
        ),
        (
            interp.intern_keyword(None, "message"),
            Value::string(&**message),
        ),
        (interp.intern_keyword(None, "data"), args[1].clone()),
    ]);
    Ok(Value::map(entries))
}

pub fn ex_message(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ex-message", args, 1)?;
    crate::support::get_value(
        &args[0],
        &interp.intern_keyword(None, "message"),
        Value::Nil,
    )
}

pub fn ex_data(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("ex-data", args, 1)?;
    crate::support::get_value(&args[0], &interp.intern_keyword(None, "data"), Value::Nil)
}
