//! Runtime error model
//!
//! Every failure in the runtime carries a machine-readable kind plus a
//! formatted human message. User `(throw …)` additionally carries the
//! thrown value so `catch` bindings and `*e` can recover it.
//!
//! Reader and analyzer errors abort only the current top-level form; the
//! REPL driver reports them and keeps reading.

use crate::value::Value;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Wrong number of args at a call site
    Arity,
    /// Operand has the wrong runtime type
    Type,
    /// Type correct but value invalid (bad regex, consumed transient, ...)
    Value,
    /// Numeric index outside collection bounds
    Index,
    /// Divide by zero, out-of-range coercion
    Arithmetic,
    /// Special form misused, recur outside tail position, odd map literal
    Analyze,
    /// Reference to an unknown namespace
    NamespaceNotFound,
    /// Lexical or syntactic reader failure
    Read,
    /// Value thrown by user code via (throw ...)
    UserException,
    /// Internal evaluator failure
    Eval,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Arity => "arity-error",
            ErrorKind::Type => "type-error",
            ErrorKind::Value => "value-error",
            ErrorKind::Index => "index-error",
            ErrorKind::Arithmetic => "arithmetic-error",
            ErrorKind::Analyze => "analyze-error",
            ErrorKind::NamespaceNotFound => "namespace-not-found",
            ErrorKind::Read => "read-error",
            ErrorKind::UserException => "user-exception",
            ErrorKind::Eval => "eval-error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// The value thrown by user code, when kind is UserException.
    pub thrown: Option<Value>,
    /// 1-indexed (line, column) of the offending form, when known.
    pub pos: Option<(u32, u32)>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Error {
        Error {
            kind,
            message: message.into(),
            thrown: None,
            pos: None,
        }
    }

    pub fn arity(name: &str, got: usize) -> Error {
        Error::new(
            ErrorKind::Arity,
            format!("wrong number of args ({}) passed to {}", got, name),
        )
    }

    pub fn type_err(op: &str, expected: &str, got: &Value) -> Error {
        Error::new(
            ErrorKind::Type,
            format!("{}: expected {}, got {}", op, expected, got.type_name()),
        )
    }

    pub fn value(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Value, message)
    }

    pub fn index(i: i64, count: usize) -> Error {
        Error::new(
            ErrorKind::Index,
            format!("index {} out of bounds for count {}", i, count),
        )
    }

    pub fn arithmetic(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Arithmetic, message)
    }

    pub fn analyze(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Analyze, message)
    }

    pub fn ns_not_found(name: &str) -> Error {
        Error::new(
            ErrorKind::NamespaceNotFound,
            format!("namespace not found: {}", name),
        )
    }

    pub fn read(message: impl Into<String>, line: u32, col: u32) -> Error {
        Error::new(ErrorKind::Read, message).with_pos(line, col)
    }

    pub fn user(thrown: Value, message: impl Into<String>) -> Error {
        Error {
            kind: ErrorKind::UserException,
            message: message.into(),
            thrown: Some(thrown),
            pos: None,
        }
    }

    pub fn eval(message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Eval, message)
    }

    pub fn with_pos(mut self, line: u32, col: u32) -> Error {
        if self.pos.is_none() {
            self.pos = Some((line, col));
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.pos {
            Some((line, col)) => {
                write!(f, "{}: {} (at {}:{})", self.kind.label(), self.message, line, col)
            }
            None => write!(f, "{}: {}", self.kind.label(), self.message),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_label() {
        let e = Error::arity("inc", 3);
        assert_eq!(
            e.to_string(),
            "arity-error: wrong number of args (3) passed to inc"
        );
    }

    #[test]
    fn test_position_formatting() {
        let e = Error::read("unexpected )", 4, 7);
        assert_eq!(e.to_string(), "read-error: unexpected ) (at 4:7)");
    }

    #[test]
    fn test_user_exception_carries_value() {
        let e = Error::user(Value::Int(42), "thrown: 42");
        assert_eq!(e.kind, ErrorKind::UserException);
        assert!(matches!(e.thrown, Some(Value::Int(42))));
    }
}
