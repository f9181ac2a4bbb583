//! The evaluator and the interpreter state it runs against
use std::{io::Write as _, path::Path, rc::Rc};

use crate::{
    primitives,
    reader::{self, ReadError, Reader},
    value::{InputPort, Kind, OutputPort, Port, Symbol, SymbolTable, Value},
};

pub mod derived;
pub mod environment;
pub mod procedure;
pub mod special_forms;

use environment::Environment;
use procedure::{Arity, Closure, TailPrimitive};
use special_forms::{Keywords, SpecialForm};

/// Everything that can stop an evaluation.
///
/// None of these are recoverable from Scheme: an error unwinds to whoever
/// called [`Interpreter::eval`], which reports it and gives up.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("type error: expected {expected}, got {found}")]
    Type { expected: Kind, found: Value },
    #[error("unbound variable: {0}")]
    UnboundVariable(Symbol),
    /// argument count mismatch when applying a closure
    #[error("{message}: {items}")]
    Arity { message: &'static str, items: Value },
    /// argument count mismatch when calling a native procedure
    #[error("{name} expects {arity} argument(s), got {given}")]
    ProcedureArity {
        name: Box<str>,
        arity: Arity,
        given: usize,
    },
    #[error("malformed special form: {0}")]
    MalformedSpecialForm(Value),
    #[error("not a procedure: {0}")]
    NotAProcedure(Value),
    #[error("cannot evaluate {0}")]
    BadExpression(Value),
    #[error("division by zero")]
    DivisionByZero,
    #[error("{name}: argument out of range: {value}")]
    Domain { name: &'static str, value: Value },
    #[error("{context} {value}: {source}")]
    Io {
        context: &'static str,
        value: Value,
        #[source]
        source: std::io::Error,
    },
    #[error("port has been closed: {0}")]
    ClosedPort(Value),
    #[error(transparent)]
    Read(#[from] ReadError),
    /// raised by the `error` primitive
    #[error("error in {who}: {message}")]
    UserError { who: Value, message: String },
    /// raised by the `exit` primitive
    #[error("exit with status {0}")]
    Exit(i32),
    #[error("illegal state: {0} must be applied by the evaluator")]
    IllegalState(TailPrimitive),
}

impl Error {
    /// The status a driver should exit with after reporting this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Exit(code) => *code,
            _ => 1,
        }
    }
}

/// Interpreter state: the symbol table, the global environment and the
/// standard ports.
pub struct Interpreter {
    symbols: SymbolTable,
    keywords: Keywords,
    global: Environment,
    stdin: Rc<Port>,
    stdout: Rc<Port>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter reading from stdin and writing to stdout.
    pub fn new() -> Self {
        Self::with_ports(
            InputPort::new(std::io::BufReader::new(std::io::stdin())),
            OutputPort::stdout(),
        )
    }

    /// An interpreter whose standard ports are `input` and `output`, with every
    /// primitive installed in its global environment.
    pub fn with_ports(input: InputPort, output: OutputPort) -> Self {
        let mut symbols = SymbolTable::new();
        let keywords = Keywords::new(&mut symbols);
        let mut interpreter = Self {
            symbols,
            keywords,
            global: Environment::new(),
            stdin: Rc::new(Port::from(input)),
            stdout: Rc::new(Port::from(output)),
        };
        let global = interpreter.global.clone();
        primitives::install(&mut interpreter, &global);
        interpreter
    }

    pub fn global(&self) -> &Environment {
        &self.global
    }

    pub fn symbols(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn intern(&mut self, name: impl AsRef<str>) -> Symbol {
        self.symbols.intern(name)
    }

    /// A fresh symbol that no name can reach.
    pub fn gensym(&self, name: impl AsRef<str>) -> Symbol {
        self.symbols.gensym(name)
    }

    /// The acknowledgement mutators answer with.
    pub fn ok(&self) -> Value {
        Value::Symbol(self.keywords.ok.clone())
    }

    pub fn stdin(&self) -> &Rc<Port> {
        &self.stdin
    }

    pub fn stdout(&self) -> &Rc<Port> {
        &self.stdout
    }

    /// Binds `name` in the global environment.
    pub fn define(&mut self, name: impl AsRef<str>, value: Value) {
        let name = self.intern(name);
        self.global.define(name, value);
    }

    pub fn define_var(&self, name: Symbol, value: Value, env: &Environment) {
        env.define(name, value);
    }

    /// Reads every datum in `src`.
    pub fn read_str(&mut self, src: &str) -> Result<Vec<Value>, ReadError> {
        let mut reader = Reader::new(src);
        let mut data = vec![];
        while let Some(datum) = reader.read(&mut self.symbols)? {
            data.push(datum);
        }
        Ok(data)
    }

    /// Evaluates every datum in `src` in the global environment, returning the
    /// value of the last one.
    pub fn eval_str(&mut self, src: &str) -> Result<Value, Error> {
        let mut result = Value::UNSPECIFIED;
        for datum in self.read_str(src)? {
            result = self.eval(datum, self.global.clone())?;
        }
        Ok(result)
    }

    /// Evaluates each datum of the file at `path` in the global environment,
    /// displaying each result on the standard output port.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading");
        let port = Port::open_input_file(path).map_err(|source| Error::Io {
            context: "could not load",
            value: Value::string(path.display().to_string()),
            source,
        })?;
        let Some(mut input) = port.input() else {
            return Ok(());
        };

        let mut count = 0usize;
        loop {
            let datum = reader::read(&mut input, &mut self.symbols)?;
            if let Value::Eof = datum {
                break;
            }
            let result = self.eval(datum, self.global.clone())?;
            self.print_line(&result.display().to_string())?;
            count += 1;
        }
        tracing::debug!(path = %path.display(), count, "loaded");
        Ok(())
    }

    fn print_line(&self, text: &str) -> Result<(), Error> {
        let port = Value::Port(self.stdout.clone());
        let Some(mut out) = self.stdout.output() else {
            return Err(Error::Type {
                expected: Kind::OutputPort,
                found: port,
            });
        };
        writeln!(out, "{text}").map_err(|source| Error::Io {
            context: "could not write to",
            value: port,
            source,
        })
    }

    /// Evaluates `expr` in `env`.
    ///
    /// Forms in tail position (the branches of `if`, the last form of `begin`,
    /// closure bodies, whatever `apply` and `eval` hand over, and the rewrites of
    /// derived forms) replace the current expression and environment and go
    /// round the loop again instead of recursing, so tail calls run in
    /// constant stack.
    pub fn eval(&mut self, mut expr: Value, mut env: Environment) -> Result<Value, Error> {
        'eval: loop {
            let pair = match &expr {
                Value::Symbol(name) => return env.lookup(name),
                Value::Pair(pair) => pair.clone(),
                Value::Null => return Err(Error::BadExpression(Value::Null)),
                _ => return Ok(expr.clone()),
            };

            let form = match pair.car() {
                Value::Symbol(head) => self.keywords.special_form(&head),
                _ => None,
            };
            match form {
                Some(SpecialForm::Quote) => match operands(&expr)?.as_slice() {
                    [datum] => return Ok(datum.clone()),
                    _ => return Err(Error::MalformedSpecialForm(expr)),
                },
                Some(SpecialForm::Define) => return self.eval_define(&expr, &env),
                Some(SpecialForm::SetBang) => {
                    let operands = operands(&expr)?;
                    let [Value::Symbol(name), value] = operands.as_slice() else {
                        return Err(Error::MalformedSpecialForm(expr));
                    };
                    let value = self.eval(value.clone(), env.clone())?;
                    env.set(name, value)?;
                    return Ok(self.ok());
                }
                Some(SpecialForm::If) => {
                    let (test, consequent, alternative) = match operands(&expr)?.as_slice() {
                        [test, consequent] => (test.clone(), consequent.clone(), None),
                        [test, consequent, alternative] => {
                            (test.clone(), consequent.clone(), Some(alternative.clone()))
                        }
                        _ => return Err(Error::MalformedSpecialForm(expr)),
                    };
                    if self.eval(test, env.clone())?.is_true() {
                        expr = consequent;
                    } else if let Some(alternative) = alternative {
                        expr = alternative;
                    } else {
                        return Ok(Value::UNSPECIFIED);
                    }
                    continue 'eval;
                }
                Some(SpecialForm::Lambda) => {
                    let operands = operands(&expr)?;
                    let Some((params, body)) = operands.split_first() else {
                        return Err(Error::MalformedSpecialForm(expr));
                    };
                    return self.make_closure(&expr, params, body, &env);
                }
                Some(SpecialForm::Begin) => {
                    let mut body = operands(&expr)?;
                    let Some(last) = body.pop() else {
                        return Ok(Value::UNSPECIFIED);
                    };
                    for form in body {
                        self.eval(form, env.clone())?;
                    }
                    expr = last;
                    continue 'eval;
                }
                Some(SpecialForm::Cond) => {
                    expr = derived::cond(&expr, &self.keywords, &self.symbols)?;
                    continue 'eval;
                }
                Some(SpecialForm::Let) => {
                    expr = derived::let_(&expr, &self.keywords)?;
                    continue 'eval;
                }
                Some(SpecialForm::And) => {
                    expr = derived::and(&expr, &self.keywords)?;
                    continue 'eval;
                }
                Some(SpecialForm::Or) => {
                    expr = derived::or(&expr, &self.keywords, &self.symbols)?;
                    continue 'eval;
                }
                None => {}
            }

            // application
            let Some(operands) = pair.cdr().to_vec() else {
                return Err(Error::BadExpression(expr));
            };
            let mut procedure = self.eval(pair.car(), env.clone())?;
            let mut args = Vec::with_capacity(operands.len());
            for operand in operands {
                args.push(self.eval(operand, env.clone())?);
            }

            loop {
                match procedure {
                    Value::TailPrimitive(prim) if !prim.arity().is_satisfied(args.len()) => {
                        return Err(Error::ProcedureArity {
                            name: prim.name().into(),
                            arity: prim.arity(),
                            given: args.len(),
                        });
                    }
                    Value::TailPrimitive(TailPrimitive::Apply) => {
                        // (apply f a ... list): spread the last argument
                        let mut rest = args.split_off(1);
                        let spread = rest.pop().unwrap_or_default().as_list()?;
                        rest.extend(spread);
                        procedure = args.pop().unwrap_or_default();
                        args = rest;
                    }
                    Value::TailPrimitive(TailPrimitive::Eval) => {
                        let mut args = args.into_iter();
                        let (code, target) = (args.next(), args.next());
                        env = target.unwrap_or_default().as_environment()?.clone();
                        expr = code.unwrap_or_default();
                        continue 'eval;
                    }
                    Value::Closure(closure) => {
                        env = closure.env().extend(closure.params(), args)?;
                        expr = closure.body().clone();
                        continue 'eval;
                    }
                    procedure => return self.call_primitive(&procedure, &args),
                }
            }
        }
    }

    /// A non-tail call of a native procedure.
    ///
    /// `apply` and `eval` never get here: the evaluator runs them itself.
    fn call_primitive(&mut self, procedure: &Value, args: &[Value]) -> Result<Value, Error> {
        match procedure {
            Value::Native(native) => native.call(self, args),
            Value::TailPrimitive(prim) => Err(Error::IllegalState(*prim)),
            other => Err(Error::NotAProcedure(other.clone())),
        }
    }

    fn eval_define(&mut self, form: &Value, env: &Environment) -> Result<Value, Error> {
        let operands = operands(form)?;
        let malformed = || Error::MalformedSpecialForm(form.clone());
        let (name, value) = match operands.as_slice() {
            // (define name [expr])
            [Value::Symbol(name)] => (name.clone(), Value::UNSPECIFIED),
            [Value::Symbol(name), expr] => (name.clone(), self.eval(expr.clone(), env.clone())?),
            // (define (name . params) body ...)
            [Value::Pair(target), body @ ..] if !body.is_empty() => {
                let Value::Symbol(name) = target.car() else {
                    return Err(malformed());
                };
                (name, self.make_closure(form, &target.cdr(), body, env)?)
            }
            _ => return Err(malformed()),
        };
        env.define(name.clone(), value);
        Ok(Value::Symbol(name))
    }

    fn make_closure(
        &self,
        form: &Value,
        params: &Value,
        body: &[Value],
        env: &Environment,
    ) -> Result<Value, Error> {
        if body.is_empty() || !valid_params(params) {
            return Err(Error::MalformedSpecialForm(form.clone()));
        }
        let body = derived::sequence(&self.keywords, body.to_vec());
        Ok(Value::Closure(Rc::new(Closure::new(
            params.clone(),
            body,
            env.clone(),
        ))))
    }
}

/// The operands of a special form, which must be a proper list.
fn operands(form: &Value) -> Result<Vec<Value>, Error> {
    form.cdr()
        .and_then(|rest| rest.to_vec())
        .ok_or_else(|| Error::MalformedSpecialForm(form.clone()))
}

// symbols, optionally ending in a rest symbol
fn valid_params(params: &Value) -> bool {
    let mut params = params.clone();
    loop {
        match params {
            Value::Null | Value::Symbol(_) => return true,
            Value::Pair(pair) if matches!(pair.car(), Value::Symbol(_)) => params = pair.cdr(),
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use arbitrary::Arbitrary;
    use arbtest::arbtest;
    use assert2::{check, let_assert};

    use crate::{
        heap::live_objects,
        value::{InputPort, OutputPort, Value},
    };

    use super::{Error, Interpreter};

    fn eval(src: &str) -> Result<Value, Error> {
        Interpreter::new().eval_str(src)
    }

    fn written(src: &str) -> String {
        match eval(src) {
            Ok(value) => value.to_string(),
            Err(err) => format!("error: {err}"),
        }
    }

    #[test]
    fn self_evaluating() {
        check!(written("42") == "42");
        check!(written("\"hi\"") == "\"hi\"");
        check!(written(r"#\a") == r"#\a");
        check!(written("#t") == "#t");
        check!(written("'(1 . 2)") == "(1 . 2)");
        let_assert!(Err(Error::BadExpression(_)) = eval("()"));
    }

    #[test]
    fn special_forms() {
        check!(written("(if #f 1)") == "#f");
        check!(written("(if 0 'yes 'no)") == "yes");
        check!(written("(begin 1 2 3)") == "3");
        check!(written("(define x 10) (set! x 20) x") == "20");
        check!(written("(define x 1)") == "x");
        check!(written("(define x 1) (set! x 2)") == "OK");
        check!(written("(define (square x) (* x x)) (square 5)") == "25");
        check!(written("((lambda (x) (define y 2) (+ x y)) 1)") == "3");
        check!(written("(lambda (a . b) a)") == "#<closure (a . b)>");
    }

    #[test]
    fn malformed_special_forms_print_the_form() {
        check!(written("(quote 1 2)") == "error: malformed special form: (quote 1 2)");
        check!(written("(if)") == "error: malformed special form: (if)");
        check!(written("(lambda (1) 1)") == "error: malformed special form: (lambda (1) 1)");
        check!(written("(lambda (x))") == "error: malformed special form: (lambda (x))");
        check!(written("(set! 1 2)") == "error: malformed special form: (set! 1 2)");
        check!(written("(define)") == "error: malformed special form: (define)");
    }

    #[test]
    fn errors() {
        check!(written("(set! y 1)") == "error: unbound variable: y");
        check!(written("(5 1)") == "error: not a procedure: 5");
        check!(written("((lambda (a b) a) 1)") == "error: not enough arguments: (b)");
        check!(written("((lambda (a b) a) 1 2 3)") == "error: too many arguments: (3)");
        check!(written("(car 1 2)") == "error: car expects exactly 1 argument(s), got 2");
        check!(written("(car 1)") == "error: type error: expected pair, got 1");
    }

    #[test]
    fn keywords_cannot_be_shadowed() {
        check!(written("(define (f if) (if if 1 2)) (f #f)") == "2");
    }

    #[test]
    fn apply_and_eval() {
        check!(written("(apply + '(1 2 3))") == "6");
        check!(written("(apply + 1 2 '(3))") == "6");
        check!(written("(eval '(+ 1 2) (interaction-environment))") == "3");
        check!(written("(eval 'car (null-environment))") == "error: unbound variable: car");
        check!(written("(apply + 1)") == "error: type error: expected list, got 1");
        check!(written("(eval 1)") == "error: eval expects exactly 2 argument(s), got 1");
        check!(written("apply") == "#<procedure apply>");
    }

    #[test]
    fn tail_calls_run_in_constant_stack() {
        let src = "
            (define (loop n acc) (if (= n 0) acc (loop (- n 1) (+ acc 1))))
            (loop 100000 0)";
        check!(written(src) == "100000");

        let src = "
            (define (even? n) (if (= n 0) #t (odd? (- n 1))))
            (define (odd? n) (if (= n 0) #f (even? (- n 1))))
            (even? 100001)";
        check!(written(src) == "#f");

        let src = "
            (define (count n) (cond ((= n 0) 'done) (else (apply count (list (- n 1))))))
            (count 100000)";
        check!(written(src) == "done");

        let src = "
            (define (count n) (and #t (or #f (if (= n 0) 'done (eval (list 'count (- n 1)) (interaction-environment))))))
            (count 100000)";
        check!(written(src) == "done");

        let src = "
            (define (count n) (let ((m (- n 1))) (begin (if (= m 0) 'done (count m)))))
            (count 100000)";
        check!(written(src) == "done");
    }

    #[test]
    fn evaluation_releases_what_it_allocates() {
        let mut interp = Interpreter::new();
        let src = "
            (define (build n acc) (if (= n 0) acc (build (- n 1) (cons n acc))))
            (define (walk l) (if (null? l) 'done (walk (cdr l))))";
        interp.eval_str(src).unwrap();
        let baseline = live_objects();
        let result = interp.eval_str("(walk (build 1000 '()))").unwrap();
        check!(result.to_string() == "done");
        drop(result);
        check!(live_objects() == baseline);
    }

    #[test]
    fn host_bindings_and_captured_output() {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut interp = Interpreter::with_ports(InputPort::from_source(""), OutputPort::new(sink.clone()));
        interp.define("answer", Value::Integer(42));
        let name = interp.intern("other");
        let global = interp.global().clone();
        interp.define_var(name, Value::string("value"), &global);
        interp.eval_str("(display answer) (write other) (newline)").unwrap();
        check!(sink.lock().unwrap().as_slice() == b"42\"value\"\n");
    }

    #[derive(Debug, Clone, Copy, Arbitrary)]
    enum Operand {
        False,
        Int(i8),
    }

    impl Operand {
        fn source(self) -> String {
            match self {
                Operand::False => "#f".into(),
                Operand::Int(n) => n.to_string(),
            }
        }

        fn truthy(self) -> Option<i8> {
            match self {
                Operand::False => None,
                Operand::Int(n) => Some(n),
            }
        }
    }

    #[test]
    fn and_or_pick_the_deciding_operand() {
        arbtest(|u| {
            let operands: Vec<Operand> = u.arbitrary()?;
            let joined = operands.iter().map(|op| op.source()).collect::<Vec<_>>().join(" ");

            let expected_and = match operands.last() {
                None => "#t".to_string(),
                Some(_) if operands.iter().any(|op| op.truthy().is_none()) => "#f".to_string(),
                Some(last) => last.source(),
            };
            check!(written(&format!("(and {joined})")) == expected_and);

            let expected_or = operands
                .iter()
                .find_map(|op| op.truthy())
                .map_or("#f".to_string(), |n| n.to_string());
            check!(written(&format!("(or {joined})")) == expected_or);
            Ok(())
        });
    }

    #[test]
    fn exit_codes() {
        let_assert!(Err(err) = eval("(exit 3)"));
        check!(err.exit_code() == 3);
        let_assert!(Err(err) = eval("(car '())"));
        check!(err.exit_code() == 1);
    }
}
