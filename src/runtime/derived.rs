//! Rewrites of the derived forms `cond`, `let`, `and` and `or` into primitive syntax.
//!
//! Each rewrite only expands the outermost form: what is left of a `cond`, `and`
//! or `or` comes back as a smaller form of the same kind, and the evaluator
//! expands it when (and if) it gets there. Nothing is cached, so a form inside
//! a loop body is rewritten every time it is evaluated.
//!
//! Temporaries are fresh uninterned symbols, so they never capture a user's
//! variable even though the rewrites are not otherwise hygienic.
use crate::{
    runtime::{special_forms::Keywords, Error},
    value::{SymbolTable, Value},
};

/// The operands of `form`, which must be a proper list.
fn operands(form: &Value) -> Result<Vec<Value>, Error> {
    form.cdr()
        .and_then(|rest| rest.to_vec())
        .ok_or_else(|| Error::MalformedSpecialForm(form.clone()))
}

/// `body` as one expression, wrapping it in `begin` when needed.
pub(crate) fn sequence(keywords: &Keywords, mut body: Vec<Value>) -> Value {
    match body.len() {
        0 => Value::UNSPECIFIED,
        1 => body.pop().unwrap_or(Value::UNSPECIFIED),
        _ => Value::cons(Value::Symbol(keywords.begin.clone()), Value::list(body)),
    }
}

fn temporary(symbols: &SymbolTable) -> Value {
    Value::Symbol(symbols.gensym("temp"))
}

// (let ((temp value)) body)
fn bind_temporary(keywords: &Keywords, temp: &Value, value: Value, body: Value) -> Value {
    Value::list([
        Value::Symbol(keywords.let_.clone()),
        Value::list([Value::list([temp.clone(), value])]),
        body,
    ])
}

fn if_(keywords: &Keywords, test: Value, consequent: Value, alternative: Value) -> Value {
    Value::list([Value::Symbol(keywords.if_.clone()), test, consequent, alternative])
}

pub(crate) fn cond(form: &Value, keywords: &Keywords, symbols: &SymbolTable) -> Result<Value, Error> {
    let clauses = operands(form)?;
    let Some((clause, rest)) = clauses.split_first() else {
        return Ok(Value::UNSPECIFIED);
    };
    let malformed = || Error::MalformedSpecialForm(form.clone());

    let clause = clause.to_vec().filter(|c| !c.is_empty()).ok_or_else(malformed)?;
    let (test, body) = (&clause[0], &clause[1..]);
    let rest = Value::cons(Value::Symbol(keywords.cond.clone()), Value::list(rest.to_vec()));

    if matches!(test, Value::Symbol(sym) if *sym == keywords.else_) {
        return Ok(sequence(keywords, body.to_vec()));
    }
    match body {
        [] => {
            let temp = temporary(symbols);
            Ok(bind_temporary(
                keywords,
                &temp,
                test.clone(),
                if_(keywords, temp.clone(), temp.clone(), rest),
            ))
        }
        [Value::Symbol(arrow), receiver] if *arrow == keywords.arrow => {
            let temp = temporary(symbols);
            let call = Value::list([receiver.clone(), temp.clone()]);
            Ok(bind_temporary(
                keywords,
                &temp,
                test.clone(),
                if_(keywords, temp.clone(), call, rest),
            ))
        }
        [Value::Symbol(arrow), ..] if *arrow == keywords.arrow => Err(malformed()),
        body => Ok(if_(keywords, test.clone(), sequence(keywords, body.to_vec()), rest)),
    }
}

pub(crate) fn let_(form: &Value, keywords: &Keywords) -> Result<Value, Error> {
    let malformed = || Error::MalformedSpecialForm(form.clone());
    let operands = operands(form)?;
    let Some((bindings, body)) = operands.split_first() else {
        return Err(malformed());
    };
    if body.is_empty() {
        return Err(malformed());
    }

    let bindings = bindings.to_vec().ok_or_else(malformed)?;
    let mut params = Vec::with_capacity(bindings.len());
    let mut args = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match binding.to_vec().as_deref() {
            Some([name @ Value::Symbol(_), init]) => {
                params.push(name.clone());
                args.push(init.clone());
            }
            _ => return Err(malformed()),
        }
    }

    let lambda = Value::cons(
        Value::Symbol(keywords.lambda.clone()),
        Value::cons(Value::list(params), Value::list(body.to_vec())),
    );
    Ok(Value::cons(lambda, Value::list(args)))
}

pub(crate) fn and(form: &Value, keywords: &Keywords) -> Result<Value, Error> {
    let operands = operands(form)?;
    Ok(match operands.split_first() {
        None => Value::TRUE,
        Some((only, [])) => only.clone(),
        Some((first, rest)) => {
            let rest = Value::cons(Value::Symbol(keywords.and.clone()), Value::list(rest.to_vec()));
            if_(keywords, first.clone(), rest, Value::FALSE)
        }
    })
}

pub(crate) fn or(form: &Value, keywords: &Keywords, symbols: &SymbolTable) -> Result<Value, Error> {
    let operands = operands(form)?;
    Ok(match operands.split_first() {
        None => Value::FALSE,
        Some((only, [])) => only.clone(),
        Some((first, rest)) => {
            let rest = Value::cons(Value::Symbol(keywords.or.clone()), Value::list(rest.to_vec()));
            let temp = temporary(symbols);
            bind_temporary(
                keywords,
                &temp,
                first.clone(),
                if_(keywords, temp.clone(), temp.clone(), rest),
            )
        }
    })
}
