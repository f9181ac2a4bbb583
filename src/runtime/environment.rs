use core::fmt;
use std::{cell::RefCell, rc::Rc};

use crate::{
    heap::Allocation,
    runtime::Error,
    value::{Kind, Symbol, Value},
};

/// Environments define the context for execution: a frame of variable
/// bindings and up to 1 reference to a parent environment.
///
/// Cloning an environment shares the frame. Closures capture environments and
/// frames can hold closures, so a closure stored in the frame it captured keeps
/// that frame alive forever.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);

struct Frame {
    /// searched newest first, so a later `define` shadows an earlier one
    bindings: RefCell<Vec<(Symbol, Value)>>,
    parent: Option<Environment>,
    _alloc: Allocation,
}

impl Environment {
    /// A top-level environment with no bindings and no parent.
    pub fn new() -> Self {
        Self::with_bindings(vec![], None)
    }

    fn with_bindings(bindings: Vec<(Symbol, Value)>, parent: Option<Environment>) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(bindings),
            parent,
            _alloc: Allocation::new(),
        }))
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// The value bound to `name`, searching this frame and then each ancestor.
    pub fn lookup(&self, name: &Symbol) -> Result<Value, Error> {
        let mut env = self;
        loop {
            if let Some((_, value)) = env.0.bindings.borrow().iter().rev().find(|(sym, _)| sym == name) {
                return Ok(value.clone());
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => return Err(Error::UnboundVariable(name.clone())),
            }
        }
    }

    /// Adds a binding to this frame. An existing binding for the same name is
    /// shadowed rather than replaced.
    pub fn define(&self, name: Symbol, value: Value) {
        self.0.bindings.borrow_mut().push((name, value));
    }

    /// Replaces the value of the nearest existing binding of `name`, releasing
    /// the old value.
    pub fn set(&self, name: &Symbol, value: Value) -> Result<(), Error> {
        let mut env = self;
        loop {
            let old = env
                .0
                .bindings
                .borrow_mut()
                .iter_mut()
                .rev()
                .find(|(sym, _)| sym == name)
                .map(|(_, slot)| std::mem::replace(slot, value.clone()));
            if let Some(old) = old {
                drop(old);
                return Ok(());
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => return Err(Error::UnboundVariable(name.clone())),
            }
        }
    }

    /// A new child frame binding `params` to `args`.
    ///
    /// `params` is a list of symbols; if it ends in a symbol instead of `()`,
    /// that symbol collects the remaining arguments as a list.
    pub fn extend(&self, params: &Value, args: Vec<Value>) -> Result<Environment, Error> {
        let mut bindings = Vec::with_capacity(args.len());
        let mut args = args.into_iter();
        let mut params = params.clone();
        loop {
            match params {
                Value::Null => {
                    let excess = args.collect::<Vec<_>>();
                    if !excess.is_empty() {
                        return Err(Error::Arity {
                            message: "too many arguments",
                            items: Value::list(excess),
                        });
                    }
                    break;
                }
                Value::Symbol(rest) => {
                    bindings.push((rest, Value::list(args)));
                    break;
                }
                Value::Pair(pair) => {
                    let Value::Symbol(name) = pair.car() else {
                        return Err(Error::Type {
                            expected: Kind::Symbol,
                            found: pair.car(),
                        });
                    };
                    let Some(arg) = args.next() else {
                        return Err(Error::Arity {
                            message: "not enough arguments",
                            items: missing_params(Value::Pair(pair)),
                        });
                    };
                    bindings.push((name, arg));
                    params = pair.cdr();
                }
                other => {
                    return Err(Error::Type {
                        expected: Kind::Symbol,
                        found: other,
                    })
                }
            }
        }
        Ok(Self::with_bindings(bindings, Some(self.clone())))
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<environment {:p}>", Rc::as_ptr(&self.0))
    }
}

// the required parameters still unbound, without the rest parameter
fn missing_params(mut params: Value) -> Value {
    let mut missing = vec![];
    while let Value::Pair(pair) = params {
        missing.push(pair.car());
        params = pair.cdr();
    }
    Value::list(missing)
}
