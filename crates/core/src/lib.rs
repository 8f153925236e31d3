//! Ruse Core: persistent collection primitives
//!
//! Key design principles:
//! - Collections are immutable; every update returns a new value sharing
//!   structure with the old one via `Rc`.
//! - Transient builders reuse nodes they uniquely own (`Rc::make_mut`),
//!   giving amortized-constant batch construction.
//! - No knowledge of the language value model: everything is generic over
//!   the element type, so the runtime crate decides equality and hashing.

pub mod hash;
pub mod list;
pub mod map;
pub mod set;
pub mod vector;

pub use hash::{hash_ordered, hash_unordered, mix_collection_hash};
pub use list::PersistentList;
pub use map::{PersistentMap, TransientMap};
pub use set::{PersistentSet, TransientSet};
pub use vector::{PersistentVector, TransientVector};
