pub use logos::Span;
use logos::{Lexer, Logos};

use crate::value::Integer;

fn process_piped_ident(lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    // strip the surrounding pipes
    let slice = lexer.slice();
    let inner = &slice[1..slice.len() - 1];
    unescape(inner, || LexerError::MalformedIdentifier)
}

fn process_string(lexer: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    // Our string syntax is described by /"([^\\"]|\\[abtnr"\\|]|\\[ \t]*(\r|\n|\r\n)[ \t]*|\\x[0-9a-fA-f]+;)*"/
    // We use a more permissive version of this on the Logos side, so that errors are neater.
    let slice = lexer.slice();
    unescape(&slice[1..slice.len() - 1], || LexerError::MalformedString)
}

fn unterminated_string(_: &mut Lexer<Token>) -> Result<Box<str>, LexerError> {
    Err(LexerError::UnterminatedString)
}

// Resolves the escapes shared by strings and piped identifiers
fn unescape<F>(text: &str, on_malformed: F) -> Result<Box<str>, LexerError>
where
    F: Fn() -> LexerError,
{
    let mut built = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(chr) = chars.next() {
        if chr != '\\' {
            built.push(chr);
            continue;
        }
        match chars.next() {
            Some('a') => built.push('\x07'),
            Some('b') => built.push('\x08'),
            Some('t') => built.push('\t'),
            Some('n') => built.push('\n'),
            Some('r') => built.push('\r'),
            Some(c @ ('\\' | '"' | '|')) => built.push(c),
            Some('x' | 'X') => built.push(read_hex_escape(&mut chars, &on_malformed)?),
            // line continuation: \<intraline whitespace>*<line ending><intraline whitespace>*
            Some(c @ (' ' | '\t' | '\r' | '\n')) => {
                let mut seen_newline = c == '\n';
                while let Some(&c @ (' ' | '\t' | '\r' | '\n')) = chars.peek() {
                    if c == '\n' {
                        if seen_newline {
                            break;
                        }
                        seen_newline = true;
                    }
                    _ = chars.next();
                }
                if !seen_newline {
                    return Err(on_malformed());
                }
            }
            _ => return Err(on_malformed()),
        }
    }
    Ok(built.into_boxed_str())
}

// reads hex escapes in the form `[0-9a-fA-F]+;` (the x already consumed) and outputs the corresponding character
fn read_hex_escape<F>(
    iter: &mut std::iter::Peekable<impl Iterator<Item = char>>,
    on_malformed: F,
) -> Result<char, LexerError>
where
    F: Fn() -> LexerError,
{
    let mut char_code = 0u32;
    let mut digits = 0;
    loop {
        match iter.next() {
            Some(';') if digits > 0 => break,
            Some(c) => {
                let digit = c.to_digit(16).ok_or_else(&on_malformed)?;
                char_code = char_code
                    .checked_mul(16)
                    .and_then(|code| code.checked_add(digit))
                    .ok_or(LexerError::CharacterTooBig)?;
                digits += 1;
            }
            None => return Err(on_malformed()),
        }
    }
    char::from_u32(char_code).ok_or(LexerError::InvalidCodepoint(char_code))
}

fn process_named_character(lexer: &mut Lexer<Token>) -> Result<char, LexerError> {
    // skip the #\ at the front
    let name = &lexer.slice()[2..];
    let chr = match name {
        "alarm" => '\x07',
        "backspace" => '\x08',
        "delete" => '\x7f',
        "escape" => '\x1b',
        "newline" => '\n',
        "null" => '\x00',
        "return" => '\r',
        "space" => ' ',
        "tab" => '\t',
        _ => return Err(LexerError::InvalidCharacterName(Box::from(name))),
    };
    Ok(chr)
}

fn process_hex_character(lexer: &mut Lexer<Token>) -> Result<char, LexerError> {
    // Skip the #\x
    let digits = &lexer.slice()[3..];
    let value = u32::from_str_radix(digits, 16).map_err(|_| LexerError::CharacterTooBig)?;
    char::from_u32(value).ok_or(LexerError::InvalidCodepoint(value))
}

fn process_integer(lexer: &mut Lexer<Token>) -> Result<Integer, LexerError> {
    lexer
        .slice()
        .parse()
        .map_err(|_| LexerError::NumberTooBig)
}

// Nested comments aren't regex-friendly, so scan for the matching `|#` by hand
fn skip_block_comment(lexer: &mut Lexer<Token>) -> Result<(), LexerError> {
    let rest = lexer.remainder();
    let mut depth = 1usize;
    let mut chars = rest.char_indices().peekable();
    while let Some((at, chr)) = chars.next() {
        match (chr, chars.peek()) {
            ('|', Some((_, '#'))) => {
                _ = chars.next();
                depth -= 1;
                if depth == 0 {
                    lexer.bump(at + 2);
                    return Ok(());
                }
            }
            ('#', Some((_, '|'))) => {
                _ = chars.next();
                depth += 1;
            }
            _ => {}
        }
    }
    lexer.bump(rest.len());
    Err(LexerError::UnterminatedComment)
}

fn invalid_directive(lexer: &mut Lexer<Token>) -> Result<Directive, LexerError> {
    Err(LexerError::InvalidDirective(Box::from(&lexer.slice()[2..])))
}

#[derive(thiserror::Error, Debug, PartialEq, Clone, Default)]
pub enum LexerError {
    #[default]
    #[error("invalid token encountered")]
    Invalid,
    #[error("malformed identifier")]
    MalformedIdentifier,
    #[error("character literal too big")]
    CharacterTooBig,
    #[error("invalid Unicode codepoint: {0}")]
    InvalidCodepoint(u32),
    #[error("invalid directive: {0}")]
    InvalidDirective(Box<str>),
    #[error("invalid character name: {0}")]
    InvalidCharacterName(Box<str>),
    #[error("malformed string")]
    MalformedString,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("number literal too big")]
    NumberTooBig,
}

impl LexerError {
    /// Whether more input could still turn this into a valid token.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::UnterminatedString | Self::UnterminatedComment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub enum Directive {
    FoldCase,
    NoFoldCase,
}

/// Tokens are lexed from some source, owning whatever text they carry.
#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(error = LexerError)]
#[logos(skip r"([ \t\r\n\f]+|;[^\n]*)")]
pub enum Token {
    #[token("#|", skip_block_comment)]
    BlockComment,
    #[token("#;")]
    DatumComment,
    #[regex("(?i)#!fold-case", |_| Directive::FoldCase)]
    #[regex("(?i)#!no-fold-case", |_| Directive::NoFoldCase)]
    #[regex(r"(?i)#![a-z0-9\-]+", invalid_directive)]
    Directive(Directive),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("'")]
    Quote,
    #[token(".")]
    Dot,
    #[regex(r#"[a-zA-Z!$%&*/:<=>?^_~][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*"#, |l| Box::from(l.slice()))]
    #[regex(r#"\|([^|\\]|\\(.|\n))*\|"#, process_piped_ident)]
    #[token("+", |l| Box::from(l.slice()))]
    #[token("-", |l| Box::from(l.slice()))]
    #[regex(r"[-+][a-zA-Z!$%&*/:<=>?^_~+\-@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    #[regex(r"[-+]\.[a-zA-Z!$%&*/:<=>?^_~+\-.@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    #[regex(r"\.[a-zA-Z!$%&*/:<=>?^_~+\-.@][0-9a-zA-Z!$%&*/:<=>?^_~+\-.@]*", |l| Box::from(l.slice()))]
    Identifier(Box<str>),
    #[regex("(?i)#t(rue)?", |_| true)]
    #[regex("(?i)#f(alse)?", |_| false)]
    Boolean(bool),
    #[regex(r"#\\.", callback = |l| l.slice().chars().nth(2).ok_or(LexerError::Invalid))]
    #[regex(r"#\\[a-zA-Z]+", priority = 2, callback = process_named_character)]
    #[regex(r"(?i)#\\x[0-9a-f]+", callback = process_hex_character)]
    Character(char),
    #[regex(r#""([^"\\]|\\(.|\n))*""#, process_string)]
    #[regex(r#""([^"\\]|\\(.|\n))*"#, unterminated_string)]
    String(Box<str>),
    #[regex(r"[+-]?[0-9]+", process_integer)]
    Integer(Integer),
}

impl Token {
    pub fn lexer(source: &str) -> Lexer<Self> {
        <Self as Logos>::lexer(source)
    }
}
