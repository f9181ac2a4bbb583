//! Characters, strings, symbols and the conversions between them
use crate::{
    runtime::{procedure::Arity, Error, Interpreter},
    value::{Integer, Value},
};

use super::Registry;

pub(super) fn install(r: &mut Registry) {
    r.native("integer->char", Arity::Exact(1), integer_to_char);
    r.native("char->integer", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::Integer(Integer::from(u32::from(args[0].as_char()?))))
    });
    r.native("number->string", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::string(args[0].as_integer()?.to_string()))
    });
    r.native("string->number", Arity::Range(1, 2), string_to_number);
    r.native("string->symbol", Arity::Exact(1), |interp: &mut Interpreter, args: &[Value]| {
        let name = args[0].as_str()?;
        Ok(Value::Symbol(interp.intern(name)))
    });
    r.native("symbol->string", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        Ok(Value::string(args[0].as_symbol()?.name()))
    });
    r.native("string-append", Arity::Exact(2), |_: &mut Interpreter, args: &[Value]| {
        let (a, b) = (args[0].as_str()?, args[1].as_str()?);
        Ok(Value::string(format!("{a}{b}")))
    });
    r.native("string-length", Arity::Exact(1), |_: &mut Interpreter, args: &[Value]| {
        let len = args[0].as_str()?.chars().count();
        Ok(Value::Integer(len as Integer))
    });
}

fn integer_to_char(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let code = args[0].as_integer()?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Char)
        .ok_or_else(|| Error::Domain {
            name: "integer->char",
            value: args[0].clone(),
        })
}

fn string_to_number(_: &mut Interpreter, args: &[Value]) -> Result<Value, Error> {
    let text = args[0].as_str()?;
    let radix = match args.get(1) {
        Some(radix) => radix.as_integer()?,
        None => 10,
    };
    let radix = u32::try_from(radix)
        .ok()
        .filter(|radix| (2..=36).contains(radix))
        .ok_or_else(|| Error::Domain {
            name: "string->number",
            value: args[1].clone(),
        })?;
    Ok(parse_prefix(text, radix).map_or(Value::FALSE, Value::Integer))
}

/// Parses the longest integer prefix of `text` after leading whitespace, an
/// optional sign and, in base 16, an optional `0x`. Out of range values
/// saturate. `None` if no digit was found.
fn parse_prefix(text: &str, radix: u32) -> Option<Integer> {
    let text = text.trim_start();
    let (negative, text) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let text = match text.get(..2) {
        Some("0x" | "0X") if radix == 16 && text[2..].starts_with(|c: char| c.is_digit(16)) => {
            &text[2..]
        }
        _ => text,
    };

    let mut digits = text.chars().map_while(|c| c.to_digit(radix)).peekable();
    digits.peek()?;
    let saturated = if negative { Integer::MIN } else { Integer::MAX };
    let value = digits.try_fold(0 as Integer, |acc, digit| {
        let digit = Integer::from(digit);
        let acc = acc.checked_mul(Integer::from(radix))?;
        if negative {
            acc.checked_sub(digit)
        } else {
            acc.checked_add(digit)
        }
    });
    Some(value.unwrap_or(saturated))
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use crate::runtime::Interpreter;

    use super::parse_prefix;

    fn eval(src: &str) -> String {
        match Interpreter::new().eval_str(src) {
            Ok(value) => value.to_string(),
            Err(err) => format!("error: {err}"),
        }
    }

    #[test]
    fn integer_prefixes() {
        check!(parse_prefix("42", 10) == Some(42));
        check!(parse_prefix("  -17abc", 10) == Some(-17));
        check!(parse_prefix("+8", 10) == Some(8));
        check!(parse_prefix("ff", 16) == Some(255));
        check!(parse_prefix("0xff", 16) == Some(255));
        check!(parse_prefix("0x", 16) == Some(0));
        check!(parse_prefix("102", 2) == Some(2));
        check!(parse_prefix("abc", 10) == None);
        check!(parse_prefix("-", 10) == None);
        check!(parse_prefix("", 10) == None);
        check!(parse_prefix("99999999999999999999", 10) == Some(i64::MAX));
    }

    #[test]
    fn conversions() {
        check!(eval("(string->number \"12\")") == "12");
        check!(eval("(string->number \"z\")") == "#f");
        check!(eval("(string->number \"777\" 8)") == "511");
        check!(eval("(string->number \"1\" 1)") == "error: string->number: argument out of range: 1");
        check!(eval("(number->string -5)") == "\"-5\"");
        check!(eval("(char->integer #\\A)") == "65");
        check!(eval("(integer->char 955)") == "#\\λ");
        check!(eval("(integer->char -1)") == "error: integer->char: argument out of range: -1");
        check!(eval("(symbol->string 'abc)") == "\"abc\"");
        check!(eval("(eq? (string->symbol \"abc\") 'abc)") == "#t");
    }

    #[test]
    fn strings() {
        check!(eval("(string-append \"foo\" \"bar\")") == "\"foobar\"");
        check!(eval("(string-length \"λx\")") == "2");
        check!(eval("(string-append \"a\" 'b)") == "error: type error: expected string, got b");
    }
}
