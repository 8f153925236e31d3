//! Reference cells: Atom, Volatile, Delay
//!
//! The runtime is single-threaded cooperative, so the atomic contracts
//! (swap!, compare-and-set!) are satisfied by plain sequential RefCell
//! access with no locking.

use std::cell::RefCell;

use crate::error::Error;
use crate::value::Value;

/// Mutable slot plus optional metadata. The slot is replaced only through
/// the swap/reset contract.
pub struct AtomCell {
    pub value: RefCell<Value>,
    pub meta: RefCell<Value>,
}

impl AtomCell {
    pub fn new(value: Value) -> AtomCell {
        AtomCell {
            value: RefCell::new(value),
            meta: RefCell::new(Value::Nil),
        }
    }
}

/// Mutable slot without compare-and-swap semantics.
pub struct VolatileCell {
    pub value: RefCell<Value>,
}

impl VolatileCell {
    pub fn new(value: Value) -> VolatileCell {
        VolatileCell {
            value: RefCell::new(value),
        }
    }
}

/// A compute-once cell. The first deref runs the thunk and caches either
/// the result or the error; both are permanent.
pub struct DelayCell {
    pub thunk: RefCell<Option<Value>>,
    pub state: RefCell<DelayState>,
}

#[derive(Clone)]
pub enum DelayState {
    Pending,
    Realized(Value),
    Failed(Error),
}

impl DelayCell {
    pub fn new(thunk: Value) -> DelayCell {
        DelayCell {
            thunk: RefCell::new(Some(thunk)),
            state: RefCell::new(DelayState::Pending),
        }
    }

    pub fn is_realized(&self) -> bool {
        !matches!(*self.state.borrow(), DelayState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_slot() {
        let a = AtomCell::new(Value::Int(1));
        *a.value.borrow_mut() = Value::Int(2);
        assert_eq!(*a.value.borrow(), Value::Int(2));
        assert_eq!(*a.meta.borrow(), Value::Nil);
    }

    #[test]
    fn test_delay_starts_pending() {
        let d = DelayCell::new(Value::Nil);
        assert!(!d.is_realized());
        *d.state.borrow_mut() = DelayState::Realized(Value::Int(7));
        assert!(d.is_realized());
    }
}
