//! The native procedures every fresh environment starts out with
use std::rc::Rc;

use crate::{
    runtime::{
        environment::Environment,
        procedure::{Arity, NativeProcedure},
        Error, Interpreter,
    },
    value::Value,
};

mod arithmetic;
mod control;
mod io;
mod lists;
mod predicates;
mod strings;

/// Defines every primitive in `env`.
pub fn install(interpreter: &mut Interpreter, env: &Environment) {
    let mut registry = Registry {
        interpreter,
        env,
        count: 0,
    };
    arithmetic::install(&mut registry);
    lists::install(&mut registry);
    predicates::install(&mut registry);
    strings::install(&mut registry);
    io::install(&mut registry);
    control::install(&mut registry);
    tracing::debug!(count = registry.count, "installed primitives");
}

pub(crate) struct Registry<'a> {
    interpreter: &'a mut Interpreter,
    env: &'a Environment,
    count: usize,
}

impl Registry<'_> {
    pub(crate) fn native<F>(&mut self, name: &str, arity: Arity, callback: F)
    where
        F: Fn(&mut Interpreter, &[Value]) -> Result<Value, Error> + 'static,
    {
        let procedure = NativeProcedure::new(name, arity, callback);
        self.value(name, Value::Native(Rc::new(procedure)));
    }

    pub(crate) fn value(&mut self, name: &str, value: Value) {
        let name = self.interpreter.intern(name);
        self.interpreter.define_var(name, value, self.env);
        self.count += 1;
    }
}
