//! Atom, volatile, and delay builtins
//!
//! swap!/reset! satisfy the atomic contract by plain sequential
//! execution (single-threaded runtime). A delay caches its first
//! result - value or error - permanently.

use std::rc::Rc;

use crate::cell::{AtomCell, DelayCell, DelayState, VolatileCell};
use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::support::{exact_arity, min_arity};
use crate::value::Value;

pub fn atom(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("atom", args, 1)?;
    Ok(Value::Atom(Rc::new(AtomCell::new(args[0].clone()))))
}

pub fn deref(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("deref", args, 1)?;
    match &args[0] {
        Value::Atom(a) => Ok(a.value.borrow().clone()),
        Value::Volatile(v) => Ok(v.value.borrow().clone()),
        Value::Var(var) => interp.deref_var(var),
        Value::Delay(d) => force_delay(interp, d),
        Value::Reduced(r) => Ok((**r).clone()),
        other => Err(Error::type_err("deref", "a reference type", other)),
    }
}

pub fn reset_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reset!", args, 2)?;
    match &args[0] {
        Value::Atom(a) => {
            *a.value.borrow_mut() = args[1].clone();
            Ok(args[1].clone())
        }
        other => Err(Error::type_err("reset!", "an atom", other)),
    }
}

pub fn swap_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("swap!", args, 2)?;
    match &args[0] {
        Value::Atom(a) => {
            let old = a.value.borrow().clone();
            let mut call_args = vec![old];
            call_args.extend(args[2..].iter().cloned());
            let f = args[1].clone();
            let new = interp.apply(&f, call_args)?;
            *a.value.borrow_mut() = new.clone();
            Ok(new)
        }
        other => Err(Error::type_err("swap!", "an atom", other)),
    }
}

/// swap! returning [old new].
pub fn swap_vals_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("swap-vals!", args, 2)?;
    match &args[0] {
        Value::Atom(a) => {
            let old = a.value.borrow().clone();
            let mut call_args = vec![old.clone()];
            call_args.extend(args[2..].iter().cloned());
            let f = args[1].clone();
            let new = interp.apply(&f, call_args)?;
            *a.value.borrow_mut() = new.clone();
            Ok(Value::vector_from(vec![old, new]))
        }
        other => Err(Error::type_err("swap-vals!", "an atom", other)),
    }
}

pub fn reset_vals_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("reset-vals!", args, 2)?;
    match &args[0] {
        Value::Atom(a) => {
            let old = a.value.borrow().clone();
            *a.value.borrow_mut() = args[1].clone();
            Ok(Value::vector_from(vec![old, args[1].clone()]))
        }
        other => Err(Error::type_err("reset-vals!", "an atom", other)),
    }
}

pub fn compare_and_set_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("compare-and-set!", args, 3)?;
    match &args[0] {
        Value::Atom(a) => {
            let current = a.value.borrow().clone();
            if interp.equiv(&current, &args[1])? {
                *a.value.borrow_mut() = args[2].clone();
                Ok(Value::Bool(true))
            } else {
                Ok(Value::Bool(false))
            }
        }
        other => Err(Error::type_err("compare-and-set!", "an atom", other)),
    }
}

pub fn volatile_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("volatile!", args, 1)?;
    Ok(Value::Volatile(Rc::new(VolatileCell::new(args[0].clone()))))
}

pub fn vreset_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("vreset!", args, 2)?;
    match &args[0] {
        Value::Volatile(v) => {
            *v.value.borrow_mut() = args[1].clone();
            Ok(args[1].clone())
        }
        other => Err(Error::type_err("vreset!", "a volatile", other)),
    }
}

pub fn vswap_bang(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("vswap!", args, 2)?;
    match &args[0] {
        Value::Volatile(v) => {
            let old = v.value.borrow().clone();
            let mut call_args = vec![old];
            call_args.extend(args[2..].iter().cloned());
            let f = args[1].clone();
            let new = interp.apply(&f, call_args)?;
            *v.value.borrow_mut() = new.clone();
            Ok(new)
        }
        other => Err(Error::type_err("vswap!", "a volatile", other)),
    }
}

/// Internal constructor behind the delay macro: wraps a zero-arg fn.
pub fn delay_star(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("-delay", args, 1)?;
    Ok(Value::Delay(Rc::new(DelayCell::new(args[0].clone()))))
}

pub fn force(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("force", args, 1)?;
    match &args[0] {
        Value::Delay(d) => force_delay(interp, d),
        other => Ok(other.clone()),
    }
}

pub fn realized_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("realized?", args, 1)?;
    match &args[0] {
        Value::Delay(d) => Ok(Value::Bool(d.is_realized())),
        Value::LazySeq(ls) => Ok(Value::Bool(ls.realized_value().is_some())),
        other => Err(Error::type_err("realized?", "a delay or lazy seq", other)),
    }
}

fn force_delay(interp: &mut Interp, cell: &Rc<DelayCell>) -> Result<Value> {
    let state = cell.state.borrow().clone();
    match state {
        DelayState::Realized(v) => Ok(v),
        DelayState::Failed(e) => Err(e),
        DelayState::Pending => {
            let thunk = cell.thunk.borrow_mut().take().ok_or_else(|| {
                Error::eval("delay realization re-entered its own thunk")
            })?;
            match interp.apply(&thunk, vec![]) {
                Ok(v) => {
                    *cell.state.borrow_mut() = DelayState::Realized(v.clone());
                    Ok(v)
                }
                Err(e) => {
                    // The error is cached too: later derefs re-raise it.
                    *cell.state.borrow_mut() = DelayState::Failed(e.clone());
                    Err(e)
                }
            }
        }
    }
}

