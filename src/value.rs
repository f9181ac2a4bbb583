//! Representation of Scheme values
use core::fmt;
use std::{cell::RefCell, rc::Rc};

use crate::{
    heap::Allocation,
    runtime::{
        environment::Environment,
        procedure::{Closure, NativeProcedure, TailPrimitive},
        Error,
    },
};

pub use port::{Direction, InputPort, OutputPort, Port};
pub use print::Print;
pub use symbol::{Symbol, SymbolTable};

mod port;
mod print;
mod symbol;

pub type Integer = i64;

/// Type that stores all possible values!
///
/// `#t`, `#f`, `()` and the eof object are immediates: every copy of them is the
/// same singleton, they carry no count and releasing one does nothing. All the
/// `Rc` variants are counted heap objects.
#[derive(Clone, Default)]
pub enum Value {
    Bool(bool),
    // This is the value written as ()
    #[default]
    Null,
    Eof,
    Char(char),
    Integer(Integer),
    Pair(Rc<Pair>),
    Symbol(Symbol),
    Native(Rc<NativeProcedure>),
    // apply and eval, which the evaluator runs in tail position itself
    TailPrimitive(TailPrimitive),
    Closure(Rc<Closure>),
    String(Rc<SchemeString>),
    Port(Rc<Port>),
    Environment(Environment),
}

/// The tag of a value, as reported in type errors.
///
/// `Procedure`, `Port` and `List` are unions: [`Value::kind`] never returns
/// them, but [`Value::is`] accepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    EmptyList,
    EndOfFile,
    Character,
    Integer,
    Pair,
    List,
    Symbol,
    Procedure,
    String,
    Port,
    InputPort,
    OutputPort,
    Environment,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Boolean => "boolean",
            Kind::EmptyList => "empty list",
            Kind::EndOfFile => "eof object",
            Kind::Character => "character",
            Kind::Integer => "integer",
            Kind::Pair => "pair",
            Kind::List => "list",
            Kind::Symbol => "symbol",
            Kind::Procedure => "procedure",
            Kind::String => "string",
            Kind::Port => "port",
            Kind::InputPort => "input port",
            Kind::OutputPort => "output port",
            Kind::Environment => "environment",
        };
        f.write_str(name)
    }
}

impl Value {
    pub const TRUE: Value = Value::Bool(true);
    pub const FALSE: Value = Value::Bool(false);
    /// What `if` without an alternative, `(cond)` and friends evaluate to.
    pub const UNSPECIFIED: Value = Value::Bool(false);

    pub fn cons(car: Value, cdr: Value) -> Self {
        Value::Pair(Rc::new(Pair::new(car, cdr)))
    }

    pub fn string(text: impl Into<Box<str>>) -> Self {
        Value::String(Rc::new(SchemeString::new(text)))
    }

    /// Builds a proper list.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        Self::list_with_tail(items, Value::Null)
    }

    /// Builds a list ending in `tail` instead of `()`.
    pub fn list_with_tail<I>(items: I, tail: Value) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(tail, |cdr, car| Value::cons(car, cdr))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Boolean,
            Value::Null => Kind::EmptyList,
            Value::Eof => Kind::EndOfFile,
            Value::Char(_) => Kind::Character,
            Value::Integer(_) => Kind::Integer,
            Value::Pair(_) => Kind::Pair,
            Value::Symbol(_) => Kind::Symbol,
            Value::Native(_) | Value::TailPrimitive(_) | Value::Closure(_) => Kind::Procedure,
            Value::String(_) => Kind::String,
            Value::Port(port) => match port.direction() {
                Direction::Input => Kind::InputPort,
                Direction::Output => Kind::OutputPort,
            },
            Value::Environment(_) => Kind::Environment,
        }
    }

    /// Non-fatal type check, for predicates.
    pub fn is(&self, kind: Kind) -> bool {
        match kind {
            Kind::Port => matches!(self, Value::Port(_)),
            Kind::List => self.to_vec().is_some(),
            kind => self.kind() == kind,
        }
    }

    /// Fatal type check: a mismatch names both the expected and the actual kind.
    pub fn check(&self, kind: Kind) -> Result<(), Error> {
        if self.is(kind) {
            Ok(())
        } else {
            Err(self.type_error(kind))
        }
    }

    /// Everything except `#f` counts as true.
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Result<Integer, Error> {
        match self {
            Value::Integer(int) => Ok(*int),
            _ => Err(self.type_error(Kind::Integer)),
        }
    }

    pub fn as_char(&self) -> Result<char, Error> {
        match self {
            Value::Char(chr) => Ok(*chr),
            _ => Err(self.type_error(Kind::Character)),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            Value::String(string) => Ok(string.as_str()),
            _ => Err(self.type_error(Kind::String)),
        }
    }

    pub fn as_symbol(&self) -> Result<&Symbol, Error> {
        match self {
            Value::Symbol(sym) => Ok(sym),
            _ => Err(self.type_error(Kind::Symbol)),
        }
    }

    pub fn as_pair(&self) -> Result<&Rc<Pair>, Error> {
        match self {
            Value::Pair(pair) => Ok(pair),
            _ => Err(self.type_error(Kind::Pair)),
        }
    }

    pub fn as_list(&self) -> Result<Vec<Value>, Error> {
        self.to_vec().ok_or_else(|| self.type_error(Kind::List))
    }

    pub fn as_port(&self) -> Result<&Rc<Port>, Error> {
        match self {
            Value::Port(port) => Ok(port),
            _ => Err(self.type_error(Kind::Port)),
        }
    }

    pub fn as_environment(&self) -> Result<&Environment, Error> {
        match self {
            Value::Environment(env) => Ok(env),
            _ => Err(self.type_error(Kind::Environment)),
        }
    }

    fn type_error(&self, expected: Kind) -> Error {
        Error::Type {
            expected,
            found: self.clone(),
        }
    }

    /// `car` of a pair as a new reference, `None` for anything else.
    pub fn car(&self) -> Option<Value> {
        match self {
            Value::Pair(pair) => Some(pair.car()),
            _ => None,
        }
    }

    pub fn cdr(&self) -> Option<Value> {
        match self {
            Value::Pair(pair) => Some(pair.cdr()),
            _ => None,
        }
    }

    /// Collects the elements of a proper list, or `None` if this is not one.
    pub fn to_vec(&self) -> Option<Vec<Value>> {
        let mut items = vec![];
        let mut rest = self.clone();
        loop {
            match rest {
                Value::Null => return Some(items),
                Value::Pair(pair) => {
                    items.push(pair.car());
                    rest = pair.cdr();
                }
                _ => return None,
            }
        }
    }

    /// Identity comparison (`eq?`). Immediates compare by value; counted objects by address.
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) | (Value::Eof, Value::Eof) => true,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Symbol(a), Value::Symbol(b)) => a.ptr_eq(b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::TailPrimitive(a), Value::TailPrimitive(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            (Value::Port(a), Value::Port(b)) => Rc::ptr_eq(a, b),
            (Value::Environment(a), Value::Environment(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// The number of owners of a counted object, `None` for immediates.
    pub fn ref_count(&self) -> Option<usize> {
        match self {
            Value::Bool(_)
            | Value::Null
            | Value::Eof
            | Value::Char(_)
            | Value::Integer(_)
            | Value::TailPrimitive(_) => None,
            Value::Pair(pair) => Some(Rc::strong_count(pair)),
            Value::Symbol(sym) => Some(sym.ref_count()),
            Value::Native(native) => Some(Rc::strong_count(native)),
            Value::Closure(closure) => Some(Rc::strong_count(closure)),
            Value::String(string) => Some(Rc::strong_count(string)),
            Value::Port(port) => Some(Rc::strong_count(port)),
            Value::Environment(env) => Some(env.ref_count()),
        }
    }

    /// Human-readable rendering, as `display` prints it.
    pub fn display(&self) -> Print<'_> {
        Print::new(self, true)
    }

    /// Machine-readable rendering, as `write` prints it.
    pub fn write(&self) -> Print<'_> {
        Print::new(self, false)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Value::Integer(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Value::Symbol(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write().fmt(f)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.write())
    }
}

/// A mutable cons cell owning its car and cdr.
pub struct Pair {
    car: RefCell<Value>,
    cdr: RefCell<Value>,
    _alloc: Allocation,
}

impl Pair {
    pub fn new(car: Value, cdr: Value) -> Self {
        Self {
            car: RefCell::new(car),
            cdr: RefCell::new(cdr),
            _alloc: Allocation::new(),
        }
    }

    pub fn car(&self) -> Value {
        self.car.borrow().clone()
    }

    pub fn cdr(&self) -> Value {
        self.cdr.borrow().clone()
    }

    /// Installs `value`, releasing the previous car.
    pub fn set_car(&self, value: Value) {
        let old = self.car.replace(value);
        drop(old);
    }

    /// Installs `value`, releasing the previous cdr.
    pub fn set_cdr(&self, value: Value) {
        let old = self.cdr.replace(value);
        drop(old);
    }
}

impl Drop for Pair {
    // Unlink the cdr chain iteratively, so releasing a long list can't overflow the stack.
    fn drop(&mut self) {
        let mut next = std::mem::take(self.cdr.get_mut());
        while let Value::Pair(pair) = next {
            match Rc::try_unwrap(pair) {
                Ok(mut pair) => next = std::mem::take(pair.cdr.get_mut()),
                Err(_) => break,
            }
        }
    }
}

/// An immutable string object.
pub struct SchemeString {
    text: Box<str>,
    _alloc: Allocation,
}

impl SchemeString {
    pub fn new(text: impl Into<Box<str>>) -> Self {
        Self {
            text: text.into(),
            _alloc: Allocation::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use crate::{heap::live_objects, runtime::Error};

    use super::{Kind, SymbolTable, Value};

    #[test]
    fn releasing_a_pair_releases_its_children() {
        let baseline = live_objects();
        let inner = Value::cons(Value::string("car"), Value::Integer(2));
        let outer = Value::cons(inner.clone(), Value::list([Value::string("a"), Value::Null]));
        check!(live_objects() == baseline + 6);
        check!(inner.ref_count() == Some(2));
        drop(inner);
        drop(outer);
        check!(live_objects() == baseline);
    }

    #[test]
    fn mutation_releases_the_overwritten_value() {
        let baseline = live_objects();
        let pair = Value::cons(Value::string("old"), Value::Null);
        let_assert!(Value::Pair(cell) = &pair);
        cell.set_car(Value::Integer(1));
        check!(live_objects() == baseline + 1);
        let shared = Value::string("shared");
        cell.set_cdr(shared.clone());
        check!(shared.ref_count() == Some(2));
        cell.set_cdr(Value::Null);
        check!(shared.ref_count() == Some(1));
        drop(pair);
        drop(shared);
        check!(live_objects() == baseline);
    }

    #[test]
    fn long_lists_are_released_without_recursion() {
        let baseline = live_objects();
        let list = Value::list((0..200_000).map(Value::Integer).collect::<Vec<_>>());
        check!(live_objects() == baseline + 200_000);
        drop(list);
        check!(live_objects() == baseline);
    }

    #[test]
    fn cycles_are_never_released() {
        let baseline = live_objects();
        let pair = Value::cons(Value::Integer(1), Value::Null);
        let_assert!(Value::Pair(cell) = &pair);
        cell.set_cdr(pair.clone());
        drop(pair);
        check!(live_objects() == baseline + 1);
    }

    #[test]
    fn singletons_are_not_counted() {
        check!(Value::TRUE.ref_count().is_none());
        check!(Value::Null.ref_count().is_none());
        check!(Value::Eof.ref_count().is_none());
        check!(Value::Null.is_eq(&Value::Null));
    }

    #[test]
    fn type_checks() {
        let mut symbols = SymbolTable::new();
        let sym = Value::Symbol(symbols.intern("x"));
        check!(sym.is(Kind::Symbol));
        check!(!sym.is(Kind::Integer));
        let_assert!(Err(Error::Type { expected, found }) = sym.check(Kind::Integer));
        check!(expected == Kind::Integer);
        check!(found.is_eq(&sym));
        check!(Value::Integer(3).as_integer().ok() == Some(3));
    }

    #[test]
    fn proper_lists_collect() {
        let list = Value::list([Value::Integer(1), Value::Integer(2)]);
        check!(list.to_vec().map(|v| v.len()) == Some(2));
        let dotted = Value::list_with_tail([Value::Integer(1)], Value::Integer(2));
        check!(dotted.to_vec().is_none());
        check!(!Value::FALSE.is_true());
        check!(Value::Null.is_true());
    }
}
