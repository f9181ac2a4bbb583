use crate::{
    runtime::{procedure::Arity, Interpreter},
    value::{Kind, Value},
};

use super::Registry;

const TYPE_PREDICATES: &[(&str, Kind)] = &[
    ("boolean?", Kind::Boolean),
    ("char?", Kind::Character),
    ("integer?", Kind::Integer),
    ("pair?", Kind::Pair),
    ("symbol?", Kind::Symbol),
    ("procedure?", Kind::Procedure),
    ("string?", Kind::String),
    ("port?", Kind::Port),
    ("eof-object?", Kind::EndOfFile),
    ("input-port?", Kind::InputPort),
    ("output-port?", Kind::OutputPort),
];

pub(super) fn install(r: &mut Registry) {
    for &(name, kind) in TYPE_PREDICATES {
        r.native(name, Arity::Exact(1), move |_: &mut Interpreter, args: &[Value]| {
            Ok(Value::Bool(args[0].is(kind)))
        });
    }
    r.native("eq?", Arity::Exact(2), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::Bool(args[0].is_eq(&args[1])))
    });
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::runtime::Interpreter;

    fn eval(src: &str) -> String {
        match Interpreter::new().eval_str(src) {
            Ok(value) => value.to_string(),
            Err(err) => format!("error: {err}"),
        }
    }

    #[test]
    fn type_predicates() {
        check!(eval("(boolean? #f)") == "#t");
        check!(eval("(boolean? '())") == "#f");
        check!(eval("(char? #\\a)") == "#t");
        check!(eval("(integer? 1)") == "#t");
        check!(eval("(pair? '())") == "#f");
        check!(eval("(symbol? 'a)") == "#t");
        check!(eval("(string? \"a\")") == "#t");
        check!(eval("(procedure? car)") == "#t");
        check!(eval("(procedure? apply)") == "#t");
        check!(eval("(procedure? (lambda () 1))") == "#t");
        check!(eval("(procedure? 'car)") == "#f");
    }

    #[test]
    fn port_predicates() {
        check!(eval("(port? (interaction-environment))") == "#f");
        check!(eval("(define p (open-input-file \"Cargo.toml\")) (list (port? p) (input-port? p) (output-port? p))") == "(#t #t #f)");
        check!(eval("(eof-object? (read-char (open-input-file \"/dev/null\")))") == "#t");
    }

    #[test]
    fn identity() {
        check!(eval("(eq? 'a 'a)") == "#t");
        check!(eval("(eq? 1 1)") == "#t");
        check!(eval("(eq? '() '())") == "#t");
        check!(eval("(eq? (cons 1 2) (cons 1 2))") == "#f");
        check!(eval("(define p (cons 1 2)) (eq? p p)") == "#t");
        check!(eval("(eq? \"a\" \"a\")") == "#f");
    }
}
