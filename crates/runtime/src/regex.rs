//! Regex patterns and matchers
//!
//! Patterns compile through the regex crate - fast, safe, no
//! catastrophic backtracking. The supported syntax (classes, anchors,
//! greedy/lazy repetition, alternation, capturing and non-capturing
//! groups) passes through unchanged; constructs the crate rejects
//! (backreferences, lookaround) surface as value-errors at compile time.
//!
//! A Matcher binds a compiled pattern to an input string and iterates
//! matches statefully; an empty-width match advances the cursor one
//! character so iteration always terminates.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::Value;

pub struct Pattern {
    pub source: Rc<str>,
    pub regex: regex::Regex,
    pub group_count: usize,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Pattern> {
        let regex = regex::Regex::new(source)
            .map_err(|e| Error::value(format!("invalid regex pattern: {}", e)))?;
        let group_count = regex.captures_len() - 1;
        Ok(Pattern {
            source: Rc::from(source),
            regex,
            group_count,
        })
    }

    /// The value a successful match produces: the whole match when the
    /// pattern has no groups, otherwise [whole group1 ...] with nil for
    /// groups that did not participate.
    pub fn match_value(&self, caps: &regex::Captures<'_>) -> Value {
        let whole = caps
            .get(0)
            .map(|m| Value::string(m.as_str()))
            .unwrap_or(Value::Nil);
        if self.group_count == 0 {
            return whole;
        }
        let mut items = Vec::with_capacity(self.group_count + 1);
        items.push(whole);
        for i in 1..=self.group_count {
            items.push(
                caps.get(i)
                    .map(|m| Value::string(m.as_str()))
                    .unwrap_or(Value::Nil),
            );
        }
        Value::vector_from(items)
    }

    /// First match at or after `start`. Returns (match value, span).
    pub fn find_at(&self, input: &str, start: usize) -> Option<(Value, (usize, usize))> {
        if start > input.len() {
            return None;
        }
        let caps = self.regex.captures_at(input, start)?;
        let m = caps.get(0)?;
        Some((self.match_value(&caps), (m.start(), m.end())))
    }

    /// Anchored whole-string match (re-matches).
    pub fn match_entire(&self, input: &str) -> Option<Value> {
        let caps = self.regex.captures(input)?;
        let m = caps.get(0)?;
        if m.start() == 0 && m.end() == input.len() {
            Some(self.match_value(&caps))
        } else {
            None
        }
    }
}

pub struct MatcherState {
    pub pos: usize,
    /// Span of the most recent successful find, for re-groups.
    pub last_match: Option<(usize, usize)>,
}

/// Stateful regex iterator: pattern + input + cursor.
pub struct MatcherCell {
    pub pattern: Rc<Pattern>,
    pub input: Rc<str>,
    pub state: RefCell<MatcherState>,
}

impl MatcherCell {
    pub fn new(pattern: Rc<Pattern>, input: Rc<str>) -> MatcherCell {
        MatcherCell {
            pattern,
            input,
            state: RefCell::new(MatcherState {
                pos: 0,
                last_match: None,
            }),
        }
    }

    /// Advance to the next match, or nil past the end.
    pub fn find_next(&self) -> Value {
        let pos = self.state.borrow().pos;
        match self.pattern.find_at(&self.input, pos) {
            Some((value, (start, end))) => {
                let mut state = self.state.borrow_mut();
                state.last_match = Some((start, end));
                state.pos = if end == start {
                    // Empty-width match: step one char to avoid looping.
                    next_char_boundary(&self.input, end)
                } else {
                    end
                };
                value
            }
            None => {
                let mut state = self.state.borrow_mut();
                state.pos = self.input.len() + 1;
                Value::Nil
            }
        }
    }

    /// Groups of the most recent match, as the match value shape.
    pub fn groups(&self) -> Result<Value> {
        let (start, _) = self
            .state
            .borrow()
            .last_match
            .ok_or_else(|| Error::value("re-groups: no match found yet"))?;
        match self.pattern.find_at(&self.input, start) {
            Some((value, _)) => Ok(value),
            None => Err(Error::value("re-groups: no match found yet")),
        }
    }
}

fn next_char_boundary(s: &str, from: usize) -> usize {
    let mut i = from + 1;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_groups() {
        let p = Pattern::compile(r"(\d+)-(\d+)").unwrap();
        assert_eq!(p.group_count, 2);
        assert!(Pattern::compile(r"(unclosed").is_err());
    }

    #[test]
    fn test_match_value_shapes() {
        let no_groups = Pattern::compile(r"\d+").unwrap();
        let (v, span) = no_groups.find_at("ab123cd", 0).unwrap();
        assert_eq!(v, Value::string("123"));
        assert_eq!(span, (2, 5));

        let groups = Pattern::compile(r"(\d+)-(\d+)").unwrap();
        let (v, _) = groups.find_at("x12-34y", 0).unwrap();
        assert_eq!(
            v,
            Value::vector_from(vec![
                Value::string("12-34"),
                Value::string("12"),
                Value::string("34"),
            ])
        );
    }

    #[test]
    fn test_optional_group_is_nil() {
        let p = Pattern::compile(r"(a)(b)?").unwrap();
        let (v, _) = p.find_at("a", 0).unwrap();
        assert_eq!(
            v,
            Value::vector_from(vec![
                Value::string("a"),
                Value::string("a"),
                Value::Nil,
            ])
        );
    }

    #[test]
    fn test_match_entire() {
        let p = Pattern::compile(r"\d+").unwrap();
        assert!(p.match_entire("123").is_some());
        assert!(p.match_entire("123x").is_none());
    }

    #[test]
    fn test_matcher_iteration() {
        let p = Rc::new(Pattern::compile(r"[a-z]\d").unwrap());
        let m = MatcherCell::new(p, Rc::from("a1 b2 c3"));
        assert_eq!(m.find_next(), Value::string("a1"));
        assert_eq!(m.find_next(), Value::string("b2"));
        assert_eq!(m.find_next(), Value::string("c3"));
        assert_eq!(m.find_next(), Value::Nil);
        assert_eq!(m.find_next(), Value::Nil);
    }

    #[test]
    fn test_empty_match_advances() {
        let p = Rc::new(Pattern::compile(r"x?").unwrap());
        let m = MatcherCell::new(p, Rc::from("ab"));
        // Every position yields an empty match, but the cursor advances.
        let mut count = 0;
        while m.find_next() != Value::Nil {
            count += 1;
            assert!(count < 10, "matcher must terminate");
        }
        assert_eq!(count, 3); // positions 0, 1, 2
    }
}
