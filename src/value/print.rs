//! Rendering values as text
use core::fmt::{self, Write as _};

use super::{Port, Value};

/// A value paired with a rendering mode.
///
/// Display mode writes strings and characters raw; write mode quotes strings,
/// names characters and is what errors print.
#[derive(Clone, Copy)]
pub struct Print<'a> {
    value: &'a Value,
    display: bool,
}

impl<'a> Print<'a> {
    pub(super) fn new(value: &'a Value, display: bool) -> Self {
        Self { value, display }
    }

    fn with<'b>(&self, value: &'b Value) -> Print<'b> {
        Print {
            value,
            display: self.display,
        }
    }
}

fn write_char_literal(f: &mut fmt::Formatter<'_>, chr: char) -> fmt::Result {
    match chr {
        ' ' => write!(f, r"#\space"),
        '\n' => write!(f, r"#\newline"),
        '\t' => write!(f, r"#\tab"),
        '\r' => write!(f, r"#\return"),
        '\0' => write!(f, r"#\null"),
        '\x07' => write!(f, r"#\alarm"),
        '\x08' => write!(f, r"#\backspace"),
        '\x1b' => write!(f, r"#\escape"),
        '\x7f' => write!(f, r"#\delete"),
        c if c.is_control() => write!(f, r"#\x{:x}", c as u32),
        c => write!(f, r"#\{c}"),
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_char('"')?;
    for chr in text.chars() {
        match chr {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\x07' => f.write_str("\\a")?,
            '\x08' => f.write_str("\\b")?,
            c if c.is_control() => write!(f, "\\x{:x};", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl fmt::Display for Print<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Bool(true) => write!(f, "#t"),
            Value::Bool(false) => write!(f, "#f"),
            Value::Null => write!(f, "()"),
            Value::Eof => write!(f, "#<eof>"),
            Value::Char(c) if self.display => f.write_char(*c),
            Value::Char(c) => write_char_literal(f, *c),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Symbol(sym) => write!(f, "{sym}"),
            Value::String(s) if self.display => f.write_str(s.as_str()),
            Value::String(s) => write_string_literal(f, s.as_str()),
            Value::Native(native) => write!(f, "#<primitive {}>", native.name()),
            Value::TailPrimitive(prim) => write!(f, "#<procedure {prim}>"),
            Value::Closure(closure) => {
                write!(f, "#<closure {}>", self.with(closure.params()))
            }
            Value::Port(port) => {
                write!(f, "#<{}-port", port.direction())?;
                if port.is_closed() {
                    write!(f, " closed")?;
                }
                write!(f, ">")
            }
            Value::Environment(_) => write!(f, "#<environment>"),
            Value::Pair(pair) => {
                // walk the cdr chain in a loop; only cars recurse
                write!(f, "(")?;
                write!(f, "{}", self.with(&pair.car()))?;
                let mut rest = pair.cdr();
                loop {
                    match rest {
                        Value::Null => break,
                        Value::Pair(next) => {
                            write!(f, " {}", self.with(&next.car()))?;
                            rest = next.cdr();
                        }
                        tail => {
                            write!(f, " . {}", self.with(&tail))?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Input(port) => write!(f, "{:?}", port.borrow()),
            Port::Output(port) => write!(f, "{:?}", port.borrow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::value::{SymbolTable, Value};

    #[test]
    fn atoms() {
        check!(Value::TRUE.to_string() == "#t");
        check!(Value::Null.to_string() == "()");
        check!(Value::Eof.to_string() == "#<eof>");
        check!(Value::Integer(-42).to_string() == "-42");
        check!(Value::Char(' ').to_string() == r"#\space");
        check!(Value::Char('a').to_string() == r"#\a");
        check!(Value::Char('a').display().to_string() == "a");
    }

    #[test]
    fn strings_are_quoted_only_when_written() {
        let s = Value::string("say \"hi\"\n");
        check!(s.write().to_string() == r#""say \"hi\"\n""#);
        check!(s.display().to_string() == "say \"hi\"\n");
    }

    #[test]
    fn lists_and_dotted_pairs() {
        let mut symbols = SymbolTable::new();
        let list = Value::list([
            Value::Symbol(symbols.intern("a")),
            Value::list([Value::Integer(1), Value::string("b")]),
        ]);
        check!(list.to_string() == r#"(a (1 "b"))"#);
        check!(list.display().to_string() == "(a (1 b))");
        let dotted = Value::list_with_tail(
            [Value::Integer(1), Value::Integer(2)],
            Value::Integer(3),
        );
        check!(dotted.to_string() == "(1 2 . 3)");
    }
}
