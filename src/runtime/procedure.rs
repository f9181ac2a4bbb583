//! Callable values
use core::fmt;

use crate::{
    heap::Allocation,
    runtime::{environment::Environment, Error, Interpreter},
    value::Value,
};

/// Procedure arity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Min(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn is_satisfied(&self, len: usize) -> bool {
        match self {
            Self::Exact(e) => *e == len,
            Self::Min(m) => *m <= len,
            Self::Range(lo, hi) => (*lo..=*hi).contains(&len),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::Min(n) => write!(f, "at least {n}"),
            Arity::Range(lo, hi) => write!(f, "between {lo} and {hi}"),
        }
    }
}

/// The body of a native procedure.
///
/// Natives run to completion on the Rust stack: they are never in tail
/// position, so anything that has to call back into Scheme without growing the
/// stack belongs in the evaluator instead (see [`TailPrimitive`]).
pub trait Callback {
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, Error>;
}

impl<F> Callback for F
where
    F: Fn(&mut Interpreter, &[Value]) -> Result<Value, Error>,
{
    fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
        self(interpreter, args)
    }
}

/// A procedure implemented in Rust, registered under a name.
pub struct NativeProcedure {
    name: Box<str>,
    arity: Arity,
    callback: Box<dyn Callback>,
    _alloc: Allocation,
}

impl NativeProcedure {
    pub fn new(name: impl Into<Box<str>>, arity: Arity, callback: impl Callback + 'static) -> Self {
        Self {
            name: name.into(),
            arity,
            callback: Box::new(callback),
            _alloc: Allocation::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
        if !self.arity.is_satisfied(args.len()) {
            return Err(Error::ProcedureArity {
                name: self.name.clone(),
                arity: self.arity,
                given: args.len(),
            });
        }
        self.callback.call(interpreter, args)
    }
}

impl fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<primitive {} {:p}>", self.name, self)
    }
}

/// Primitives whose application the evaluator performs itself, so that the
/// procedure they call (`apply`) or the expression they evaluate (`eval`) runs
/// in tail position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TailPrimitive {
    Apply,
    Eval,
}

impl TailPrimitive {
    pub fn name(self) -> &'static str {
        match self {
            TailPrimitive::Apply => "apply",
            TailPrimitive::Eval => "eval",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            TailPrimitive::Apply => Arity::Min(2),
            TailPrimitive::Eval => Arity::Exact(2),
        }
    }
}

impl fmt::Display for TailPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user procedure: parameter list, body and the environment it closes over.
pub struct Closure {
    /// a proper list of symbols, possibly ending in a rest symbol instead of `()`
    params: Value,
    body: Value,
    env: Environment,
    _alloc: Allocation,
}

impl Closure {
    pub fn new(params: Value, body: Value, env: Environment) -> Self {
        Self {
            params,
            body,
            env,
            _alloc: Allocation::new(),
        }
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use crate::{
        runtime::{Error, Interpreter},
        value::Value,
    };

    use super::{Arity, NativeProcedure};

    #[test]
    fn arity_bounds() {
        check!(Arity::Exact(2).is_satisfied(2));
        check!(!Arity::Exact(2).is_satisfied(3));
        check!(Arity::Min(1).is_satisfied(5));
        check!(!Arity::Min(1).is_satisfied(0));
        check!(Arity::Range(1, 2).is_satisfied(2));
        check!(!Arity::Range(1, 2).is_satisfied(3));
    }

    #[test]
    fn natives_check_arity_before_running() {
        let mut interp = Interpreter::new();
        let first = NativeProcedure::new("first", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| -> Result<Value, Error> {
            Ok(args[0].clone())
        });
        check!(first.call(&mut interp, &[Value::Integer(4)]).ok().map(|v| v.to_string()) == Some("4".into()));
        let_assert!(Err(Error::ProcedureArity { given, .. }) = first.call(&mut interp, &[]));
        check!(given == 0);
    }
}
