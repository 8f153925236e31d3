//! Arithmetic and comparison builtins
//!
//! The numeric tower is two-story: 64-bit signed integers and IEEE
//! doubles, with float contagion. Integer overflow is an
//! arithmetic-error rather than silent wraparound, as is integer
//! division by zero. `=` is full value equality; `==` is numeric-only.

use crate::error::{Error, Result};
use crate::interp::Interp;
use crate::support::{exact_arity, min_arity, range_arity};
use crate::value::Value;

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn num(op: &str, v: &Value) -> Result<Num> {
    match v {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(Error::type_err(op, "number", other)),
    }
}

impl Num {
    fn value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(f) => Value::Float(f),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }
}

fn checked(op: &str, result: Option<i64>) -> Result<Num> {
    result
        .map(Num::Int)
        .ok_or_else(|| Error::arithmetic(format!("integer overflow in {}", op)))
}

fn add2(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked("+", x.checked_add(y)),
        _ => Ok(Num::Float(a.as_f64() + b.as_f64())),
    }
}

fn sub2(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked("-", x.checked_sub(y)),
        _ => Ok(Num::Float(a.as_f64() - b.as_f64())),
    }
}

fn mul2(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => checked("*", x.checked_mul(y)),
        _ => Ok(Num::Float(a.as_f64() * b.as_f64())),
    }
}

/// Division: exact when both ints divide evenly, float otherwise. There
/// is no ratio type in the value model.
fn div2(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(Error::arithmetic("divide by zero"));
            }
            if x % y == 0 {
                checked("/", x.checked_div(y))
            } else {
                Ok(Num::Float(x as f64 / y as f64))
            }
        }
        _ => Ok(Num::Float(a.as_f64() / b.as_f64())),
    }
}

pub fn add(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    let mut acc = Num::Int(0);
    for v in args {
        acc = add2(acc, num("+", v)?)?;
    }
    Ok(acc.value())
}

pub fn subtract(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("-", args, 1)?;
    let first = num("-", &args[0])?;
    if args.len() == 1 {
        return sub2(Num::Int(0), first).map(Num::value);
    }
    let mut acc = first;
    for v in &args[1..] {
        acc = sub2(acc, num("-", v)?)?;
    }
    Ok(acc.value())
}

pub fn multiply(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    let mut acc = Num::Int(1);
    for v in args {
        acc = mul2(acc, num("*", v)?)?;
    }
    Ok(acc.value())
}

pub fn divide(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("/", args, 1)?;
    if args.len() == 1 {
        return div2(Num::Int(1), num("/", &args[0])?).map(Num::value);
    }
    let mut acc = num("/", &args[0])?;
    for v in &args[1..] {
        acc = div2(acc, num("/", v)?)?;
    }
    Ok(acc.value())
}

pub fn quot(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("quot", args, 2)?;
    match (num("quot", &args[0])?, num("quot", &args[1])?) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(Error::arithmetic("divide by zero"));
            }
            checked("quot", x.checked_div(y)).map(Num::value)
        }
        (a, b) => Ok(Value::Float((a.as_f64() / b.as_f64()).trunc())),
    }
}

pub fn rem_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("rem", args, 2)?;
    match (num("rem", &args[0])?, num("rem", &args[1])?) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(Error::arithmetic("divide by zero"));
            }
            checked("rem", x.checked_rem(y)).map(Num::value)
        }
        (a, b) => Ok(Value::Float(a.as_f64() % b.as_f64())),
    }
}

/// Flooring modulus: result takes the sign of the divisor.
pub fn mod_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("mod", args, 2)?;
    match (num("mod", &args[0])?, num("mod", &args[1])?) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                return Err(Error::arithmetic("divide by zero"));
            }
            let r = x % y;
            if r != 0 && (r < 0) != (y < 0) {
                Ok(Value::Int(r + y))
            } else {
                Ok(Value::Int(r))
            }
        }
        (a, b) => {
            let r = a.as_f64() % b.as_f64();
            if r != 0.0 && (r < 0.0) != (b.as_f64() < 0.0) {
                Ok(Value::Float(r + b.as_f64()))
            } else {
                Ok(Value::Float(r))
            }
        }
    }
}

pub fn inc(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("inc", args, 1)?;
    add(interp, &[args[0].clone(), Value::Int(1)])
}

pub fn dec(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    exact_arity("dec", args, 1)?;
    subtract(interp, &[args[0].clone(), Value::Int(1)])
}

pub fn max_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("max", args, 1)?;
    let mut best = num("max", &args[0])?;
    for v in &args[1..] {
        let n = num("max", v)?;
        if n.as_f64() > best.as_f64() {
            best = n;
        }
    }
    Ok(best.value())
}

pub fn min_op(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("min", args, 1)?;
    let mut best = num("min", &args[0])?;
    for v in &args[1..] {
        let n = num("min", v)?;
        if n.as_f64() < best.as_f64() {
            best = n;
        }
    }
    Ok(best.value())
}

pub fn abs(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("abs", args, 1)?;
    match num("abs", &args[0])? {
        Num::Int(n) => checked("abs", n.checked_abs()).map(Num::value),
        Num::Float(f) => Ok(Value::Float(f.abs())),
    }
}

/// Full value equality, variadic.
pub fn eq(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    min_arity("=", args, 1)?;
    for pair in args.windows(2) {
        if !interp.equiv(&pair[0], &pair[1])? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn not_eq(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let all_equal = eq(interp, args)?;
    Ok(Value::Bool(!all_equal.is_truthy()))
}

/// Numeric-only equality.
pub fn num_eq(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    min_arity("==", args, 1)?;
    for pair in args.windows(2) {
        let a = num("==", &pair[0])?;
        let b = num("==", &pair[1])?;
        if a.as_f64() != b.as_f64() {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn compare_chain(
    name: &str,
    args: &[Value],
    keep: fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    min_arity(name, args, 1)?;
    for pair in args.windows(2) {
        let a = num(name, &pair[0])?.as_f64();
        let b = num(name, &pair[1])?.as_f64();
        let ord = a
            .partial_cmp(&b)
            .ok_or_else(|| Error::arithmetic(format!("{}: cannot compare NaN", name)))?;
        if !keep(ord) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub fn lt(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    compare_chain("<", args, |o| o == std::cmp::Ordering::Less)
}

pub fn le(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    compare_chain("<=", args, |o| o != std::cmp::Ordering::Greater)
}

pub fn gt(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    compare_chain(">", args, |o| o == std::cmp::Ordering::Greater)
}

pub fn ge(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    compare_chain(">=", args, |o| o != std::cmp::Ordering::Less)
}

pub fn zero_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("zero?", args, 1)?;
    Ok(Value::Bool(num("zero?", &args[0])?.as_f64() == 0.0))
}

pub fn pos_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("pos?", args, 1)?;
    Ok(Value::Bool(num("pos?", &args[0])?.as_f64() > 0.0))
}

pub fn neg_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("neg?", args, 1)?;
    Ok(Value::Bool(num("neg?", &args[0])?.as_f64() < 0.0))
}

pub fn even_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("even?", args, 1)?;
    Ok(Value::Bool(args[0].expect_int("even?")? % 2 == 0))
}

pub fn odd_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("odd?", args, 1)?;
    Ok(Value::Bool(args[0].expect_int("odd?")? % 2 != 0))
}

pub fn number_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("number?", args, 1)?;
    Ok(Value::Bool(args[0].is_number()))
}

pub fn integer_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("integer?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Int(_))))
}

pub fn float_p(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("float?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Float(_))))
}

/// Numeric coercions.
pub fn int_cast(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => {
            if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Ok(Value::Int(f.trunc() as i64))
            } else {
                Err(Error::arithmetic(format!(
                    "int: value {} out of integer range",
                    f
                )))
            }
        }
        Value::Char(c) => Ok(Value::Int(*c as i64)),
        other => Err(Error::type_err("int", "a number or char", other)),
    }
}

pub fn double_cast(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("double", args, 1)?;
    Ok(Value::Float(args[0].expect_number("double")?))
}

pub fn rand(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    range_arity("rand", args, 0, 1)?;
    // Single-threaded runtime: a simple linear congruential step over a
    // cell seeded from the address of a fresh allocation would do, but
    // system time keeps successive runs different.
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let unit = (nanos as f64) / (u32::MAX as f64);
    match args.first() {
        Some(v) => Ok(Value::Float(unit * v.expect_number("rand")?)),
        None => Ok(Value::Float(unit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp() -> Interp {
        Interp::new().unwrap()
    }

    #[test]
    fn test_variadic_add() {
        let mut i = interp();
        assert_eq!(add(&mut i, &[]).unwrap(), Value::Int(0));
        assert_eq!(
            add(&mut i, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(6)
        );
        assert_eq!(
            add(&mut i, &[Value::Int(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut i = interp();
        let e = add(&mut i, &[Value::Int(i64::MAX), Value::Int(1)]).unwrap_err();
        assert_eq!(e.kind, crate::error::ErrorKind::Arithmetic);
    }

    #[test]
    fn test_division() {
        let mut i = interp();
        assert_eq!(
            divide(&mut i, &[Value::Int(6), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            divide(&mut i, &[Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Float(0.5)
        );
        assert!(divide(&mut i, &[Value::Int(1), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        let mut i = interp();
        assert_eq!(
            mod_op(&mut i, &[Value::Int(7), Value::Int(3)]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            mod_op(&mut i, &[Value::Int(-7), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            mod_op(&mut i, &[Value::Int(7), Value::Int(-3)]).unwrap(),
            Value::Int(-2)
        );
    }

    #[test]
    fn test_comparison_chains() {
        let mut i = interp();
        assert_eq!(
            lt(&mut i, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            lt(&mut i, &[Value::Int(1), Value::Int(3), Value::Int(2)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_numeric_equality_crosses_types() {
        let mut i = interp();
        assert_eq!(
            eq(&mut i, &[Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            num_eq(&mut i, &[Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(true)
        );
    }
}
