//! Ruse Runtime: a Clojure-dialect interpreter
//!
//! Key design principles:
//! - Value: a single tagged enum for everything the language touches,
//!   with Rc payloads for structural sharing.
//! - Pipeline: source text -> Reader (Form) -> Analyzer (Node) ->
//!   Evaluator (Value), one top-level form at a time.
//! - Namespaces own vars; the interpreter owns namespaces, the dynamic
//!   binding stack, the keyword interner, and the gensym counter.
//!
//! ```no_run
//! use ruse_runtime::Interp;
//!
//! let mut interp = Interp::new().unwrap();
//! let v = interp.eval_str("(+ 1 2 3)").unwrap();
//! assert_eq!(interp.pr_str_value(&v).unwrap(), "6");
//! ```

pub mod analyzer;
pub mod arithmetic;
pub mod atom_ops;
pub mod bootstrap;
pub mod cell;
pub mod coll_ops;
pub mod core_ops;
pub mod env;
pub mod error;
pub mod eval;
pub mod interp;
pub mod io_ops;
pub mod math_ops;
pub mod meta_ops;
pub mod multi_ops;
pub mod multimethod;
pub mod namespace;
pub mod ns_ops;
pub mod printer;
pub mod reader;
pub mod regex;
pub mod regex_ops;
pub mod seq;
pub mod seq_ops;
pub mod seq_protocol;
pub mod string_ops;
mod support;
pub mod syntax_quote;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use interp::Interp;
pub use printer::{display_str, pr_str};
pub use reader::{Form, FormKind, Reader};
pub use value::{Keyword, Symbol, Value};
