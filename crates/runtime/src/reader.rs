//! Reader: source text to Form trees
//!
//! A recursive-descent parser over a character stream. Every form keeps
//! the (line, column) of its first character for diagnostics. Whitespace
//! includes commas; `;` comments run to end of line.
//!
//! Reader macros: `'x` quote, `` `x `` syntax-quote, `~x` unquote, `~@x`
//! unquote-splicing, `@x` deref, `^m x` metadata, `#'x` var-quote, `#_x`
//! discard, `#"pat"` regex, `#{...}` set, `#(...)` anonymous fn with
//! `%`/`%n`/`%&` parameters, `#tag form` tagged literal.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::value::{Symbol, Value};

#[derive(Clone)]
pub struct Form {
    pub kind: FormKind,
    pub line: u32,
    pub col: u32,
}

impl Form {
    pub fn new(kind: FormKind, line: u32, col: u32) -> Form {
        Form { kind, line, col }
    }

    /// A synthetic form inheriting another form's position.
    pub fn at(kind: FormKind, template: &Form) -> Form {
        Form {
            kind,
            line: template.line,
            col: template.col,
        }
    }
}

#[derive(Clone)]
pub enum FormKind {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Symbol(Rc<Symbol>),
    /// Interned at read time (`::kw` resolution needs the current ns).
    Keyword(Value),
    List(Vec<Form>),
    Vector(Vec<Form>),
    /// Flat [k1 v1 k2 v2 ...]; even length enforced by the reader.
    Map(Vec<Form>),
    Set(Vec<Form>),
    Quote(Box<Form>),
    SyntaxQuote(Box<Form>),
    Unquote(Box<Form>),
    UnquoteSplicing(Box<Form>),
    Deref(Box<Form>),
    VarQuote(Box<Form>),
    /// (metadata, target)
    Meta(Box<Form>, Box<Form>),
    Regex(String),
    Tagged(String, Box<Form>),
    /// Opaque value embedded by macro expansion; never produced by the
    /// reader itself.
    Const(Value),
}

pub struct Reader {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '\'' | '`' | '~' | '@' | '^'
                | '\\'
        )
}

impl Reader {
    pub fn new(source: &str) -> Reader {
        Reader {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn err(&self, msg: impl Into<String>) -> Error {
        Error::read(msg, self.line, self.col)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' => {
                    self.advance();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Read the next form, skipping `#_` discards. None at end of input.
    pub fn read_form(&mut self, interp: &mut Interp) -> Result<Option<Form>> {
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Ok(None);
            }
            match self.read_one(interp)? {
                Some(form) => return Ok(Some(form)),
                None => continue, // discarded form
            }
        }
    }

    /// Read exactly one form; Ok(None) means a `#_` discard was consumed.
    fn read_one(&mut self, interp: &mut Interp) -> Result<Option<Form>> {
        let line = self.line;
        let col = self.col;
        let c = self.peek().ok_or_else(|| self.err("unexpected end of input"))?;
        let form = match c {
            '(' => {
                self.advance();
                let items = self.read_delimited(interp, ')')?;
                Form::new(FormKind::List(items), line, col)
            }
            '[' => {
                self.advance();
                let items = self.read_delimited(interp, ']')?;
                Form::new(FormKind::Vector(items), line, col)
            }
            '{' => {
                self.advance();
                let items = self.read_delimited(interp, '}')?;
                if items.len() % 2 != 0 {
                    return Err(Error::read(
                        "map literal must contain an even number of forms",
                        line,
                        col,
                    ));
                }
                Form::new(FormKind::Map(items), line, col)
            }
            ')' | ']' | '}' => return Err(self.err(format!("unmatched delimiter {}", c))),
            '"' => {
                let s = self.read_string()?;
                Form::new(FormKind::Str(s), line, col)
            }
            '\\' => {
                let ch = self.read_char_literal()?;
                Form::new(FormKind::Char(ch), line, col)
            }
            '\'' => {
                self.advance();
                let inner = self.read_required(interp)?;
                Form::new(FormKind::Quote(Box::new(inner)), line, col)
            }
            '`' => {
                self.advance();
                let inner = self.read_required(interp)?;
                Form::new(FormKind::SyntaxQuote(Box::new(inner)), line, col)
            }
            '~' => {
                self.advance();
                if self.peek() == Some('@') {
                    self.advance();
                    let inner = self.read_required(interp)?;
                    Form::new(FormKind::UnquoteSplicing(Box::new(inner)), line, col)
                } else {
                    let inner = self.read_required(interp)?;
                    Form::new(FormKind::Unquote(Box::new(inner)), line, col)
                }
            }
            '@' => {
                self.advance();
                let inner = self.read_required(interp)?;
                Form::new(FormKind::Deref(Box::new(inner)), line, col)
            }
            '^' => {
                self.advance();
                let meta = self.read_required(interp)?;
                let meta = normalize_meta(meta)?;
                let target = self.read_required(interp)?;
                Form::new(FormKind::Meta(Box::new(meta), Box::new(target)), line, col)
            }
            '#' => return self.read_dispatch(interp, line, col),
            ':' => {
                let kw = self.read_keyword(interp)?;
                Form::new(FormKind::Keyword(kw), line, col)
            }
            _ => {
                let token = self.read_token()?;
                self.classify_token(&token, line, col)?
            }
        };
        Ok(Some(form))
    }

    fn read_required(&mut self, interp: &mut Interp) -> Result<Form> {
        self.read_form(interp)?
            .ok_or_else(|| self.err("unexpected end of input"))
    }

    fn read_delimited(&mut self, interp: &mut Interp, close: char) -> Result<Vec<Form>> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.err(format!("unexpected end of input, expected {}", close))),
                Some(c) if c == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(_) => {
                    if let Some(form) = self.read_one(interp)? {
                        items.push(form);
                    }
                }
            }
        }
    }

    fn read_dispatch(&mut self, interp: &mut Interp, line: u32, col: u32) -> Result<Option<Form>> {
        self.advance(); // consume '#'
        match self.peek() {
            Some('{') => {
                self.advance();
                let items = self.read_delimited(interp, '}')?;
                check_set_duplicates(&items, line, col)?;
                Ok(Some(Form::new(FormKind::Set(items), line, col)))
            }
            Some('"') => {
                let pattern = self.read_regex_literal()?;
                Ok(Some(Form::new(FormKind::Regex(pattern), line, col)))
            }
            Some('\'') => {
                self.advance();
                let inner = self.read_required(interp)?;
                Ok(Some(Form::new(
                    FormKind::VarQuote(Box::new(inner)),
                    line,
                    col,
                )))
            }
            Some('_') => {
                self.advance();
                // Read and discard the next form (recursively handles
                // nested #_).
                let _ = self.read_required(interp)?;
                Ok(None)
            }
            Some('(') => {
                self.advance();
                let items = self.read_delimited(interp, ')')?;
                Ok(Some(expand_anon_fn(interp, items, line, col)?))
            }
            Some(c) if is_symbol_char(c) => {
                let tag = self.read_token()?;
                let inner = self.read_required(interp)?;
                Ok(Some(Form::new(
                    FormKind::Tagged(tag, Box::new(inner)),
                    line,
                    col,
                )))
            }
            _ => Err(self.err("unsupported dispatch macro")),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated string literal")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let esc = self
                        .advance()
                        .ok_or_else(|| self.err("unterminated string escape"))?;
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        'u' => out.push(self.read_unicode_escape()?),
                        other => {
                            return Err(self.err(format!("unsupported string escape \\{}", other)))
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let c = self
                .advance()
                .ok_or_else(|| self.err("unterminated \\u escape"))?;
            let digit = c
                .to_digit(16)
                .ok_or_else(|| self.err(format!("invalid hex digit {} in \\u escape", c)))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.err(format!("invalid codepoint \\u{:04x}", code)))
    }

    fn read_regex_literal(&mut self) -> Result<String> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err("unterminated regex literal")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    // Backslashes pass through raw except before a quote.
                    match self.advance() {
                        None => return Err(self.err("unterminated regex literal")),
                        Some('"') => out.push('"'),
                        Some(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn read_char_literal(&mut self) -> Result<char> {
        self.advance(); // backslash
        let first = self
            .advance()
            .ok_or_else(|| self.err("unterminated character literal"))?;
        // Collect trailing symbol characters to recognize named chars.
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.peek() {
            if is_symbol_char(c) && c != '#' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.chars().count() == 1 {
            return Ok(first);
        }
        match name.as_str() {
            "newline" => Ok('\n'),
            "space" => Ok(' '),
            "tab" => Ok('\t'),
            "return" => Ok('\r'),
            "backspace" => Ok('\u{8}'),
            "formfeed" => Ok('\u{c}'),
            _ if first == 'u' && name.len() == 5 => {
                let code = u32::from_str_radix(&name[1..], 16)
                    .map_err(|_| self.err(format!("invalid unicode char literal \\{}", name)))?;
                char::from_u32(code)
                    .ok_or_else(|| self.err(format!("invalid codepoint \\{}", name)))
            }
            _ => Err(self.err(format!("unsupported character literal \\{}", name))),
        }
    }

    fn read_keyword(&mut self, interp: &mut Interp) -> Result<Value> {
        self.advance(); // ':'
        let auto = self.peek() == Some(':');
        if auto {
            self.advance();
        }
        let token = self.read_token()?;
        if token.is_empty() {
            return Err(self.err("empty keyword"));
        }
        let (ns, name) = match token.find('/') {
            Some(idx) if token.len() > 1 => {
                let (ns, rest) = token.split_at(idx);
                (Some(ns.to_string()), rest[1..].to_string())
            }
            _ => (None, token),
        };
        if auto {
            let current = interp.current_ns();
            match ns {
                // ::alias/kw goes through the alias table.
                Some(alias) => match current.alias_target(&alias) {
                    Some(target) => Ok(interp.intern_keyword(Some(&target), &name)),
                    None => Err(self.err(format!("no namespace alias {} in current ns", alias))),
                },
                None => {
                    let ns_name = current.name.to_string();
                    Ok(interp.intern_keyword(Some(&ns_name), &name))
                }
            }
        } else {
            Ok(interp.intern_keyword(ns.as_deref(), &name))
        }
    }

    fn read_token(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.err("expected a token"));
        }
        Ok(out)
    }

    fn classify_token(&self, token: &str, line: u32, col: u32) -> Result<Form> {
        let kind = if token == "nil" {
            FormKind::Nil
        } else if token == "true" {
            FormKind::Bool(true)
        } else if token == "false" {
            FormKind::Bool(false)
        } else if looks_numeric(token) {
            parse_number(token).map_err(|msg| Error::read(msg, line, col))?
        } else {
            FormKind::Symbol(Rc::new(Symbol::parse(token)))
        };
        Ok(Form::new(kind, line, col))
    }
}

fn looks_numeric(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => matches!(chars.next(), Some(c) if c.is_ascii_digit()),
        _ => false,
    }
}

fn parse_number(token: &str) -> std::result::Result<FormKind, String> {
    let (sign, digits) = match token.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, token.strip_prefix('+').unwrap_or(token)),
    };
    let overflow = || format!("integer literal out of range: {}", token);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let n = i64::from_str_radix(hex, 16).map_err(|_| overflow())?;
        return Ok(FormKind::Int(sign * n));
    }
    if digits.contains('.') || digits.contains('e') || digits.contains('E') {
        let f: f64 = token
            .parse()
            .map_err(|_| format!("invalid number format: {}", token))?;
        return Ok(FormKind::Float(f));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        let n = i64::from_str_radix(&digits[1..], 8)
            .map_err(|_| format!("invalid octal literal: {}", token))?;
        return Ok(FormKind::Int(sign * n));
    }
    match digits.parse::<i64>() {
        Ok(n) => Ok(FormKind::Int(sign * n)),
        Err(_) => Err(overflow()),
    }
}

/// `^:kw` becomes `{:kw true}`, `^Tag` becomes `{:tag Tag}`, `^"s"`
/// becomes `{:tag "s"}`; a map passes through.
fn normalize_meta(meta: Form) -> Result<Form> {
    let kind = match &meta.kind {
        FormKind::Map(_) => return Ok(meta),
        FormKind::Keyword(kw) => FormKind::Map(vec![
            Form::at(FormKind::Keyword(kw.clone()), &meta),
            Form::at(FormKind::Bool(true), &meta),
        ]),
        FormKind::Symbol(sym) => FormKind::Map(vec![
            Form::at(FormKind::Keyword(Value::keyword(None, "tag")), &meta),
            Form::at(FormKind::Symbol(sym.clone()), &meta),
        ]),
        FormKind::Str(s) => FormKind::Map(vec![
            Form::at(FormKind::Keyword(Value::keyword(None, "tag")), &meta),
            Form::at(FormKind::Str(s.clone()), &meta),
        ]),
        _ => {
            return Err(Error::read(
                "metadata must be a map, keyword, symbol, or string",
                meta.line,
                meta.col,
            ))
        }
    };
    Ok(Form::at(kind, &meta))
}

/// Literal identity for read-time duplicate detection in set literals.
fn literal_key(form: &Form) -> Option<String> {
    match &form.kind {
        FormKind::Nil => Some("nil".to_string()),
        FormKind::Bool(b) => Some(format!("b{}", b)),
        FormKind::Int(n) => Some(format!("i{}", n)),
        FormKind::Float(f) => Some(format!("f{}", f)),
        FormKind::Char(c) => Some(format!("c{}", c)),
        FormKind::Str(s) => Some(format!("s{}", s)),
        FormKind::Keyword(k) => match k {
            Value::Keyword(kw) => Some(format!("k{:?}/{}", kw.ns, kw.name)),
            _ => None,
        },
        FormKind::Symbol(s) => Some(format!("y{:?}/{}", s.ns, s.name)),
        _ => None,
    }
}

fn check_set_duplicates(items: &[Form], line: u32, col: u32) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for item in items {
        if let Some(key) = literal_key(item) {
            if !seen.insert(key) {
                return Err(Error::read("duplicate key in set literal", line, col));
            }
        }
    }
    Ok(())
}

/// Rewrite `#(...)` into `(fn* [p1 ...] (...))`, replacing `%`/`%n`/`%&`.
fn expand_anon_fn(
    interp: &mut Interp,
    body: Vec<Form>,
    line: u32,
    col: u32,
) -> Result<Form> {
    let id = interp.next_gensym_id();
    let mut max_arg = 0usize;
    let mut rest_used = false;
    let mut items = Vec::with_capacity(body.len());
    for form in body {
        items.push(substitute_percents(form, id, &mut max_arg, &mut rest_used)?);
    }
    let mut params = Vec::new();
    for i in 1..=max_arg {
        params.push(Form::new(
            FormKind::Symbol(Rc::new(Symbol::simple(&format!("p{}__{}#", i, id)))),
            line,
            col,
        ));
    }
    if rest_used {
        params.push(Form::new(
            FormKind::Symbol(Rc::new(Symbol::simple("&"))),
            line,
            col,
        ));
        params.push(Form::new(
            FormKind::Symbol(Rc::new(Symbol::simple(&format!("rest__{}#", id)))),
            line,
            col,
        ));
    }
    let call = Form::new(FormKind::List(items), line, col);
    let fn_sym = Form::new(
        FormKind::Symbol(Rc::new(Symbol::simple("fn*"))),
        line,
        col,
    );
    let params = Form::new(FormKind::Vector(params), line, col);
    Ok(Form::new(
        FormKind::List(vec![fn_sym, params, call]),
        line,
        col,
    ))
}

fn substitute_percents(
    form: Form,
    id: u64,
    max_arg: &mut usize,
    rest_used: &mut bool,
) -> Result<Form> {
    let line = form.line;
    let col = form.col;
    let kind = match form.kind {
        FormKind::Symbol(sym) if sym.ns.is_none() && sym.name.starts_with('%') => {
            let name: &str = &sym.name;
            if name == "%" || name == "%1" {
                *max_arg = (*max_arg).max(1);
                FormKind::Symbol(Rc::new(Symbol::simple(&format!("p1__{}#", id))))
            } else if name == "%&" {
                *rest_used = true;
                FormKind::Symbol(Rc::new(Symbol::simple(&format!("rest__{}#", id))))
            } else if let Ok(n) = name[1..].parse::<usize>() {
                if n == 0 || n > 20 {
                    return Err(Error::read(
                        format!("invalid anonymous fn parameter {}", name),
                        line,
                        col,
                    ));
                }
                *max_arg = (*max_arg).max(n);
                FormKind::Symbol(Rc::new(Symbol::simple(&format!("p{}__{}#", n, id))))
            } else {
                FormKind::Symbol(sym)
            }
        }
        FormKind::List(items) => FormKind::List(substitute_all(items, id, max_arg, rest_used)?),
        FormKind::Vector(items) => {
            FormKind::Vector(substitute_all(items, id, max_arg, rest_used)?)
        }
        FormKind::Map(items) => FormKind::Map(substitute_all(items, id, max_arg, rest_used)?),
        FormKind::Set(items) => FormKind::Set(substitute_all(items, id, max_arg, rest_used)?),
        FormKind::Quote(inner) => FormKind::Quote(Box::new(substitute_percents(
            *inner, id, max_arg, rest_used,
        )?)),
        FormKind::Deref(inner) => FormKind::Deref(Box::new(substitute_percents(
            *inner, id, max_arg, rest_used,
        )?)),
        FormKind::Unquote(inner) => FormKind::Unquote(Box::new(substitute_percents(
            *inner, id, max_arg, rest_used,
        )?)),
        FormKind::UnquoteSplicing(inner) => FormKind::UnquoteSplicing(Box::new(
            substitute_percents(*inner, id, max_arg, rest_used)?,
        )),
        FormKind::SyntaxQuote(inner) => FormKind::SyntaxQuote(Box::new(substitute_percents(
            *inner, id, max_arg, rest_used,
        )?)),
        FormKind::Meta(meta, target) => FormKind::Meta(
            Box::new(substitute_percents(*meta, id, max_arg, rest_used)?),
            Box::new(substitute_percents(*target, id, max_arg, rest_used)?),
        ),
        other => other,
    };
    Ok(Form::new(kind, line, col))
}

fn substitute_all(
    items: Vec<Form>,
    id: u64,
    max_arg: &mut usize,
    rest_used: &mut bool,
) -> Result<Vec<Form>> {
    items
        .into_iter()
        .map(|f| substitute_percents(f, id, max_arg, rest_used))
        .collect()
}
