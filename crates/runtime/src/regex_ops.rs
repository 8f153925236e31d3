//! Regex builtins: the re-* surface
//!
//! Single-shot operations (re-find on a pattern, re-matches, re-seq)
//! never mutate anything; stateful iteration goes through an explicit
//! re-matcher.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::regex::{MatcherCell, Pattern};
use crate::support::{exact_arity, range_arity};
use crate::value::Value;

pub fn re_pattern(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-pattern", args, 1)?;
    match &args[0] {
        Value::Regex(_) => Ok(args[0].clone()),
        Value::Str(s) => Ok(Value::Regex(Rc::new(Pattern::compile(s)?))),
        other => Err(Error::type_err("re-pattern", "a string or regex", other)),
    }
}

pub fn re_matcher(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-matcher", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Regex(p), Value::Str(s)) => Ok(Value::Matcher(Rc::new(MatcherCell::new(
            p.clone(),
            s.clone(),
        )))),
        (Value::Regex(_), other) => Err(Error::type_err("re-matcher", "a string", other)),
        (other, _) => Err(Error::type_err("re-matcher", "a regex", other)),
    }
}

/// (re-find matcher) advances the matcher; (re-find regex s) is
/// single-shot.
pub fn re_find(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("re-find", args, 1, 2)?;
    if args.len() == 1 {
        return match &args[0] {
            Value::Matcher(m) => Ok(m.find_next()),
            other => Err(Error::type_err("re-find", "a matcher", other)),
        };
    }
    match (&args[0], &args[1]) {
        (Value::Regex(p), Value::Str(s)) => Ok(p
            .find_at(s, 0)
            .map(|(value, _)| value)
            .unwrap_or(Value::Nil)),
        (Value::Regex(_), other) => Err(Error::type_err("re-find", "a string", other)),
        (other, _) => Err(Error::type_err("re-find", "a regex", other)),
    }
}

/// Anchored whole-input match.
pub fn re_matches(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-matches", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Regex(p), Value::Str(s)) => Ok(p.match_entire(s).unwrap_or(Value::Nil)),
        (Value::Regex(_), other) => Err(Error::type_err("re-matches", "a string", other)),
        (other, _) => Err(Error::type_err("re-matches", "a regex", other)),
    }
}

/// All matches, left to right.
pub fn re_seq(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-seq", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Regex(p), Value::Str(s)) => {
            let mut out = Vec::new();
            let mut pos = 0;
            while let Some((value, (start, end))) = p.find_at(s, pos) {
                out.push(value);
                pos = if end == start {
                    // Empty-width match: step to avoid looping.
                    let mut next = end + 1;
                    while next < s.len() && !s.is_char_boundary(next) {
                        next += 1;
                    }
                    next
                } else {
                    end
                };
                if pos > s.len() {
                    break;
                }
            }
            Ok(if out.is_empty() {
                Value::Nil
            } else {
                Value::list_from(out)
            })
        }
        (Value::Regex(_), other) => Err(Error::type_err("re-seq", "a string", other)),
        (other, _) => Err(Error::type_err("re-seq", "a regex", other)),
    }
}

/// Groups of the matcher's most recent match.
pub fn re_groups(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("re-groups", args, 1)?;
    match &args[0] {
        Value::Matcher(m) => m.groups(),
        other => Err(Error::type_err("re-groups", "a matcher", other)),
    }
}
