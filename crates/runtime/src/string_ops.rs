//! String operations: the clojure.string namespace
//!
//! All functions operate on immutable UTF-8 strings and return new
//! strings; indexes are character-based, matching the reader's and
//! subs's view of strings as char sequences.

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::printer;
use crate::support::{exact_arity, range_arity};
use crate::value::Value;

pub fn upper_case(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("upper-case", args, 1)?;
    Ok(Value::string(args[0].expect_str("upper-case")?.to_uppercase()))
}

pub fn lower_case(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("lower-case", args, 1)?;
    Ok(Value::string(args[0].expect_str("lower-case")?.to_lowercase()))
}

pub fn capitalize(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("capitalize", args, 1)?;
    let s = args[0].expect_str("capitalize")?;
    let mut chars = s.chars();
    let out = match chars.next() {
        None => String::new(),
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
    };
    Ok(Value::string(out))
}

pub fn trim(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("trim", args, 1)?;
    Ok(Value::string(args[0].expect_str("trim")?.trim()))
}

pub fn triml(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("triml", args, 1)?;
    Ok(Value::string(args[0].expect_str("triml")?.trim_start()))
}

pub fn trimr(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("trimr", args, 1)?;
    Ok(Value::string(args[0].expect_str("trimr")?.trim_end()))
}

pub fn trim_newline(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("trim-newline", args, 1)?;
    let s = args[0].expect_str("trim-newline")?;
    Ok(Value::string(s.trim_end_matches(['\n', '\r'])))
}

pub fn blank_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("blank?", args, 1)?;
    Ok(Value::Bool(match &args[0] {
        Value::Nil => true,
        Value::Str(s) => s.chars().all(char::is_whitespace),
        other => return Err(Error::type_err("blank?", "a string or nil", other)),
    }))
}

pub fn starts_with_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("starts-with?", args, 2)?;
    let s = args[0].expect_str("starts-with?")?;
    let prefix = args[1].expect_str("starts-with?")?;
    Ok(Value::Bool(s.starts_with(&**prefix)))
}

pub fn ends_with_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("ends-with?", args, 2)?;
    let s = args[0].expect_str("ends-with?")?;
    let suffix = args[1].expect_str("ends-with?")?;
    Ok(Value::Bool(s.ends_with(&**suffix)))
}

pub fn includes_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("includes?", args, 2)?;
    let s = args[0].expect_str("includes?")?;
    let sub = args[1].expect_str("includes?")?;
    Ok(Value::Bool(s.contains(&**sub)))
}

fn char_index_of(s: &str, needle: &str, from: usize) -> Option<usize> {
    let chars: Vec<char> = s.chars().collect();
    let needle_chars: Vec<char> = needle.chars().collect();
    if needle_chars.is_empty() {
        return Some(from.min(chars.len()));
    }
    let mut i = from;
    while i + needle_chars.len() <= chars.len() {
        if chars[i..i + needle_chars.len()] == needle_chars[..] {
            return Some(i);
        }
        i += 1;
    }
    None
}

pub fn index_of(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("index-of", args, 2, 3)?;
    let s = args[0].expect_str("index-of")?;
    let needle = match &args[1] {
        Value::Str(sub) => sub.to_string(),
        Value::Char(c) => c.to_string(),
        other => return Err(Error::type_err("index-of", "a string or char", other)),
    };
    let from = match args.get(2) {
        Some(v) => v.expect_int("index-of")?.max(0) as usize,
        None => 0,
    };
    Ok(char_index_of(s, &needle, from)
        .map(|i| Value::Int(i as i64))
        .unwrap_or(Value::Nil))
}

pub fn last_index_of(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("last-index-of", args, 2, 3)?;
    let s = args[0].expect_str("last-index-of")?;
    let needle = match &args[1] {
        Value::Str(sub) => sub.to_string(),
        Value::Char(c) => c.to_string(),
        other => return Err(Error::type_err("last-index-of", "a string or char", other)),
    };
    let limit = match args.get(2) {
        Some(v) => Some(v.expect_int("last-index-of")?.max(0) as usize),
        None => None,
    };
    let mut found = None;
    let mut from = 0;
    while let Some(i) = char_index_of(s, &needle, from) {
        if let Some(limit) = limit {
            if i > limit {
                break;
            }
        }
        found = Some(i);
        from = i + 1;
    }
    Ok(found.map(|i| Value::Int(i as i64)).unwrap_or(Value::Nil))
}

pub fn join(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    range_arity("join", args, 1, 2)?;
    let (separator, coll) = if args.len() == 2 {
        (
            printer::display_str(interp, &args[0])?,
            args[1].clone(),
        )
    } else {
        (String::new(), args[0].clone())
    };
    let items = match &coll {
        Value::Nil => Vec::new(),
        other => interp.seq_to_vec(other)?,
    };
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator);
        }
        if !matches!(item, Value::Nil) {
            out.push_str(&printer::display_str(interp, item)?);
        }
    }
    Ok(Value::string(out))
}

/// split on a regex or literal string pattern; a limit of 0 means no
/// limit and trailing empty strings are dropped, matching the original.
pub fn split(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("split", args, 2, 3)?;
    let s = args[0].expect_str("split")?.to_string();
    let limit = match args.get(2) {
        Some(v) => v.expect_int("split")?,
        None => 0,
    };
    let parts: Vec<String> = match &args[1] {
        Value::Regex(p) => split_regex(&s, &p.regex, limit),
        Value::Str(sep) => split_literal(&s, sep, limit),
        other => return Err(Error::type_err("split", "a regex or string", other)),
    };
    Ok(Value::vector_from(
        parts.into_iter().map(Value::string).collect(),
    ))
}

fn trim_trailing_empty(mut parts: Vec<String>) -> Vec<String> {
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    parts
}

fn split_regex(s: &str, re: &regex::Regex, limit: i64) -> Vec<String> {
    if limit > 0 {
        re.splitn(s, limit as usize)
            .map(str::to_string)
            .collect()
    } else {
        trim_trailing_empty(re.split(s).map(str::to_string).collect())
    }
}

fn split_literal(s: &str, sep: &str, limit: i64) -> Vec<String> {
    if sep.is_empty() {
        return s.chars().map(|c| c.to_string()).collect();
    }
    if limit > 0 {
        s.splitn(limit as usize, sep).map(str::to_string).collect()
    } else {
        trim_trailing_empty(s.split(sep).map(str::to_string).collect())
    }
}

pub fn split_lines(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("split-lines", args, 1)?;
    let s = args[0].expect_str("split-lines")?;
    Ok(Value::vector_from(
        s.lines().map(Value::string).collect(),
    ))
}

pub fn replace(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("replace", args, 3)?;
    replace_impl(interp, args, false)
}

pub fn replace_first(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("replace-first", args, 3)?;
    replace_impl(interp, args, true)
}

fn replace_impl(interp: &mut Interp, args: &[Value], first_only: bool) -> Result<Value> {
    let s = args[0].expect_str("replace")?.to_string();
    match (&args[1], &args[2]) {
        (Value::Str(from), Value::Str(to)) => Ok(Value::string(if first_only {
            s.replacen(&**from, to, 1)
        } else {
            s.replace(&**from, to)
        })),
        (Value::Char(from), Value::Char(to)) => {
            Ok(Value::string(s.replace(*from, &to.to_string())))
        }
        (Value::Regex(p), Value::Str(to)) => {
            let replaced = if first_only {
                p.regex.replacen(&s, 1, &**to)
            } else {
                p.regex.replace_all(&s, &**to)
            };
            Ok(Value::string(replaced.into_owned()))
        }
        (Value::Regex(p), f) => {
            // Function replacement: called with the match value.
            let mut out = String::new();
            let mut last = 0;
            let f = f.clone();
            for caps in p.regex.captures_iter(&s) {
                let Some(m) = caps.get(0) else { continue };
                out.push_str(&s[last..m.start()]);
                let match_value = p.match_value(&caps);
                let replacement = interp.apply(&f, vec![match_value])?;
                out.push_str(&printer::display_str(interp, &replacement)?);
                last = m.end();
                if first_only {
                    break;
                }
            }
            out.push_str(&s[last..]);
            Ok(Value::string(out))
        }
        (pattern, _) => Err(Error::type_err("replace", "a string, char, or regex", pattern)),
    }
}

pub fn reverse(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reverse", args, 1)?;
    let s = args[0].expect_str("reverse")?;
    Ok(Value::string(s.chars().rev().collect::<String>()))
}

/// Quote a replacement string so `$` has no special meaning.
pub fn re_quote_replacement(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-quote-replacement", args, 1)?;
    let s = args[0].expect_str("re-quote-replacement")?;
    Ok(Value::string(s.replace('$', "$$")))
}

/// Replace characters by a lookup map.
pub fn escape(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("escape", args, 2)?;
    let s = args[0].expect_str("escape")?.to_string();
    let cmap = args[1].clone();
    let mut out = String::new();
    for c in s.chars() {
        let replacement = crate::support::get_value(&cmap, &Value::Char(c), Value::Nil)?;
        match replacement {
            Value::Nil => out.push(c),
            other => out.push_str(&printer::display_str(interp, &other)?),
        }
    }
    Ok(Value::string(out))
}
