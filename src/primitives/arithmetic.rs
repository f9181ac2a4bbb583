//! Integer arithmetic. Overflow wraps around.
use crate::{
    runtime::{procedure::Arity, Error, Interpreter},
    value::{Integer, Value},
};

use super::Registry;

pub(super) fn install(r: &mut Registry) {
    r.native("+", Arity::Min(0), add);
    r.native("*", Arity::Min(0), mul);
    r.native("-", Arity::Min(1), sub);
    r.native("quotient", Arity::Exact(2), quotient);
    r.native("remainder", Arity::Exact(2), remainder);
    r.native("=", Arity::Min(1), |_: &mut Interpreter, args: &[Value]| {
        compare(args, |a, b| a == b)
    });
    r.native("<", Arity::Min(1), |_: &mut Interpreter, args: &[Value]| {
        compare(args, |a, b| a < b)
    });
    r.native(">", Arity::Min(1), |_: &mut Interpreter, args: &[Value]| {
        compare(args, |a, b| a > b)
    });
}

fn integers(args: &[Value]) -> Result<Vec<Integer>, Error> {
    args.iter().map(Value::as_integer).collect()
}

fn add(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let sum = integers(args)?.into_iter().fold(0, Integer::wrapping_add);
    Ok(Value::Integer(sum))
}

fn mul(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let product = integers(args)?.into_iter().fold(1, Integer::wrapping_mul);
    Ok(Value::Integer(product))
}

fn sub(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let args = integers(args)?;
    let difference = match args.as_slice() {
        [only] => only.wrapping_neg(),
        [first, rest @ ..] => rest.iter().fold(*first, |acc, n| acc.wrapping_sub(*n)),
        [] => 0,
    };
    Ok(Value::Integer(difference))
}

// the divisor, which must not be zero
fn divisor(arg: &Value) -> Result<Integer, Error> {
    match arg.as_integer()? {
        0 => Err(Error::DivisionByZero),
        n => Ok(n),
    }
}

fn quotient(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let dividend = args[0].as_integer()?;
    Ok(Value::Integer(dividend.wrapping_div(divisor(&args[1])?)))
}

fn remainder(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let dividend = args[0].as_integer()?;
    Ok(Value::Integer(dividend.wrapping_rem(divisor(&args[1])?)))
}

/// Whether `holds` holds between every adjacent pair of arguments.
fn compare(args: &[Value], holds: fn(Integer, Integer) -> bool) -> Result<Value, Error> {
    let args = integers(args)?;
    Ok(Value::Bool(args.windows(2).all(|w| holds(w[0], w[1]))))
}
