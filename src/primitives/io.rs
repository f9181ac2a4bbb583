//! Ports: opening, closing, reading and writing
use std::{io::Write as _, rc::Rc};

use crate::{
    reader,
    runtime::{procedure::Arity, Error, Interpreter},
    value::{Kind, Port, Value},
};

use super::Registry;

pub(super) fn install(r: &mut Registry) {
    r.native("open-input-file", Arity::Exact(1), open_input_file);
    r.native("close-input-file", Arity::Exact(1), close_port);
    r.native("read-char", Arity::Range(0, 1), read_char);
    r.native("unread-char", Arity::Range(1, 2), unread_char);
    r.native("read", Arity::Range(0, 1), read);
    r.native("load", Arity::Exact(1), load);

    r.native("open-output-file", Arity::Range(1, 2), open_output_file);
    r.native("close-output-file", Arity::Exact(1), close_port);
    r.native("write-char", Arity::Range(1, 2), |interp: &mut Interpreter, args: &[Value]| {
        let text = args[0].as_char()?.to_string();
        write_to(interp, args.get(1), &text)
    });
    r.native("write", Arity::Range(1, 2), |interp: &mut Interpreter, args: &[Value]| {
        let text = args[0].write().to_string();
        write_to(interp, args.get(1), &text)
    });
    r.native("display", Arity::Range(1, 2), |interp: &mut Interpreter, args: &[Value]| {
        let text = args[0].display().to_string();
        write_to(interp, args.get(1), &text)
    });
    r.native("newline", Arity::Range(0, 1), |interp: &mut Interpreter, args: &[Value]| {
        write_to(interp, args.first(), "\n")
    });
}

/// The port an I/O primitive works on: `arg` if given, otherwise the
/// standard port in the direction `kind` names. It must be open.
fn port_arg(interp: &Interpreter, arg: Option<&Value>, kind: Kind) -> Result<(Value, Rc<Port>), Error> {
    let value = match arg {
        Some(arg) => arg.clone(),
        None if kind == Kind::InputPort => Value::Port(interp.stdin().clone()),
        None => Value::Port(interp.stdout().clone()),
    };
    value.check(kind)?;
    let port = value.as_port()?.clone();
    if port.is_closed() {
        return Err(Error::ClosedPort(value));
    }
    Ok((value, port))
}

fn io_error<'a>(context: &'static str, value: &'a Value) -> impl FnOnce(std::io::Error) -> Error + 'a {
    move |source| Error::Io {
        context,
        value: value.clone(),
        source,
    }
}

// `text` is rendered before the port is borrowed, since printing a port
// inspects it
fn write_to(interp: &mut Interpreter, arg: Option<&Value>, text: &str) -> Result<Value, Error> {
    let (value, port) = port_arg(interp, arg, Kind::OutputPort)?;
    if let Some(mut out) = port.output() {
        out.write_all(text.as_bytes())
            .map_err(io_error("could not write to", &value))?;
    }
    Ok(interp.ok())
}

fn open_input_file(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let path = args[0].as_str()?;
    let port = Port::open_input_file(path).map_err(io_error("could not open", &args[0]))?;
    Ok(Value::Port(Rc::new(port)))
}

fn open_output_file(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let path = args[0].as_str()?;
    let overwrite = Value::Symbol(interp.intern("OVERWRITE"));
    let append = args.get(1).is_some_and(|mode| !mode.is_eq(&overwrite));
    let port = Port::open_output_file(path, append).map_err(io_error("could not open", &args[0]))?;
    Ok(Value::Port(Rc::new(port)))
}

// either direction; closing twice is not an error
fn close_port(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    if args[0].as_port()?.close() {
        Ok(interp.ok())
    } else {
        Ok(Value::Symbol(interp.intern("ALREADY-CLOSED")))
    }
}

fn read_char(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let (value, port) = port_arg(interp, args.first(), Kind::InputPort)?;
    let Some(mut input) = port.input() else {
        return Ok(Value::Eof);
    };
    let chr = input.read_char().map_err(io_error("could not read from", &value))?;
    Ok(chr.map_or(Value::Eof, Value::Char))
}

fn unread_char(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let chr = args[0].as_char()?;
    let (value, port) = port_arg(interp, args.get(1), Kind::InputPort)?;
    if let Some(mut input) = port.input() {
        input.unread_char(chr).map_err(io_error("could not read from", &value))?;
    }
    Ok(interp.ok())
}

fn read(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let (_, port) = port_arg(interp, args.first(), Kind::InputPort)?;
    let Some(mut input) = port.input() else {
        return Ok(Value::Eof);
    };
    Ok(reader::read(&mut input, interp.symbols())?)
}

fn load(interp: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    interp.load(args[0].as_str()?)?;
    Ok(Value::Symbol(interp.intern("PROGRAM-LOADED")))
}
