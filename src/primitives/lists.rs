use crate::{
    runtime::{procedure::Arity, Error, Interpreter},
    value::Value,
};

use super::Registry;

pub(super) fn install(r: &mut Registry) {
    r.native("car", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(args[0].as_pair()?.car())
    });
    r.native("cdr", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(args[0].as_pair()?.cdr())
    });
    r.native("cons", Arity::Exact(2), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::cons(args[0].clone(), args[1].clone()))
    });
    r.native("set-car!", Arity::Exact(2), set_car);
    r.native("set-cdr!", Arity::Exact(2), set_cdr);
    r.native("list", Arity::Min(0), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::list(args.to_vec()))
    });
    r.native("null?", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::Bool(args[0].is_null()))
    });
}

fn set_car(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    args[0].as_pair()?.set_car(args[1].clone());
    Ok(interp.ok())
}

fn set_cdr(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    args[0].as_pair()?.set_cdr(args[1].clone());
    Ok(interp.ok())
}
