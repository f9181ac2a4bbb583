use std::{cell::Cell, io::Write as _, process::Command};

use crate::{
    runtime::{
        environment::Environment,
        procedure::{Arity, TailPrimitive},
        Error, Interpreter,
    },
    value::{Integer, Value},
};

use super::Registry;

pub(super) fn install(r: &mut Registry) {
    r.value("apply", Value::TailPrimitive(TailPrimitive::Apply));
    r.value("eval", Value::TailPrimitive(TailPrimitive::Eval));

    r.native("exit", Arity::Range(0, 1), exit);
    r.native("error", Arity::Min(1), error);
    r.native("system", Arity::Exact(1), system);

    let counter = Cell::new(1u64);
    r.native("gensym", Arity::Exact(0), move |interp: &mut Interpreter, _: &[Value]| {
        let n = counter.replace(counter.get() + 1);
        Ok(Value::Symbol(interp.gensym(format!("#:G{n}"))))
    });

    r.native("interaction-environment", Arity::Exact(0), |interp: &mut Interpreter, _: &[Value]| {
        Ok(Value::Environment(interp.global().clone()))
    });
    r.native("environment", Arity::Exact(0), |interp: &mut Interpreter, _: &[Value]| {
        tracing::debug!("building a fresh environment");
        let env = Environment::new();
        super::install(interp, &env);
        Ok(Value::Environment(env))
    });
    r.native("null-environment", Arity::Exact(0), |_: &mut Interpreter, _: &[Value]| {
        Ok(Value::Environment(Environment::new()))
    });
}

fn exit(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let Some(code) = args.first() else {
        return Err(Error::Exit(0));
    };
    let status = i32::try_from(code.as_integer()?).map_err(|_| Error::Domain {
        name: "exit",
        value: code.clone(),
    })?;
    Err(Error::Exit(status))
}

fn error(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let who = args[0].as_symbol()?.clone();
    let message = args[1..]
        .iter()
        .map(|irritant| irritant.display().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    Err(Error::UserError {
        who: Value::Symbol(who),
        message,
    })
}

fn system(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let command = args[0].as_str()?;
    // the child shares the terminal, so it must not overtake pending output
    if let Some(mut out) = interp.stdout().output() {
        _ = out.flush();
    }
    tracing::debug!(command, "running shell command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|source| Error::Io {
            context: "could not run",
            value: args[0].clone(),
            source,
        })?;
    Ok(Value::Integer(status.code().map_or(-1, Integer::from)))
}
