pub mod heap;
pub mod lexer;
pub mod primitives;
pub mod reader;
pub mod runtime;
pub mod value;

pub use reader::{ReadError, ReadErrorKind, Reader};
pub use runtime::{
    environment::Environment,
    procedure::{Arity, NativeProcedure},
    Error, Interpreter,
};
pub use value::{Kind, Value};
