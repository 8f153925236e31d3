//! Floating-point math: the clojure.math namespace

use crate::error::Result;
use crate::interp::Interp;
use crate::support::exact_arity;
use crate::value::Value;

macro_rules! unary_math {
    ($fn_name:ident, $builtin_name:literal, $method:ident) => {
        pub fn $fn_name(interp: &mut Interp, args: &[Value]) -> Result<Value> {
            let _ = interp;
            exact_arity($builtin_name, args, 1)?;
            Ok(Value::Float(args[0].expect_number($builtin_name)?.$method()))
        }
    };
}

unary_math!(floor, "floor", floor);
unary_math!(ceil, "ceil", ceil);
unary_math!(sqrt, "sqrt", sqrt);
unary_math!(cbrt, "cbrt", cbrt);
unary_math!(exp, "exp", exp);
unary_math!(log, "log", ln);
unary_math!(log10, "log10", log10);
unary_math!(sin, "sin", sin);
unary_math!(cos, "cos", cos);
unary_math!(tan, "tan", tan);
unary_math!(asin, "asin", asin);
unary_math!(acos, "acos", acos);
unary_math!(atan, "atan", atan);

pub fn pow(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("pow", args, 2)?;
    let base = args[0].expect_number("pow")?;
    let exponent = args[1].expect_number("pow")?;
    Ok(Value::Float(base.powf(exponent)))
}

/// Round half-up to the nearest integer.
pub fn round(interp: &mut Interp, args: &[Value]) -> Result<Value> {
    let _ = interp;
    exact_arity("round", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        other => {
            let f = other.expect_number("round")?;
            Ok(Value::Int(f.round() as i64))
        }
    }
}
