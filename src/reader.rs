//! Turning text into data
use icu_casemap::CaseMapper;
use logos::Lexer;

use crate::{
    lexer::{Directive, LexerError, Span, Token},
    value::{InputPort, SymbolTable, Value},
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReadErrorKind {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected `)`")]
    UnexpectedCloseParen,
    #[error("unexpected `.`")]
    MisplacedDot,
    #[error("could not read from input port: {0}")]
    Io(String),
}

/// A reader error, with the byte span of the source it was found at.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub span: Span,
}

impl ReadError {
    fn new(kind: impl Into<ReadErrorKind>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            span,
        }
    }

    /// Whether more input could complete the datum being read.
    pub fn is_incomplete(&self) -> bool {
        match &self.kind {
            ReadErrorKind::UnexpectedEof => true,
            ReadErrorKind::Lexer(err) => err.is_incomplete(),
            _ => false,
        }
    }
}

/// Reads data one at a time from a string.
pub struct Reader<'src> {
    lexer: Lexer<'src, Token>,
    peeked: Option<(Result<Token, LexerError>, Span)>,
    /// end of the last token taken
    offset: usize,
    fold_case: bool,
}

impl<'src> Reader<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            lexer: Token::lexer(src),
            peeked: None,
            offset: 0,
            fold_case: false,
        }
    }

    /// Starts with identifier case folding on or off, as a previous
    /// `#!fold-case` left it.
    pub fn with_fold_case(mut self, fold_case: bool) -> Self {
        self.fold_case = fold_case;
        self
    }

    pub fn fold_case(&self) -> bool {
        self.fold_case
    }

    /// How much of the source has been consumed.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The next datum, or `None` once only whitespace and comments remain.
    pub fn read(&mut self, symbols: &mut SymbolTable) -> Result<Option<Value>, ReadError> {
        self.skip_trivia(symbols)?;
        let Some((token, span)) = self.next_token() else {
            return Ok(None);
        };
        let token = token.map_err(|err| ReadError::new(err, span.clone()))?;
        let datum = match token {
            Token::LParen => self.read_list(symbols)?,
            Token::RParen => return Err(ReadError::new(ReadErrorKind::UnexpectedCloseParen, span)),
            Token::Dot => return Err(ReadError::new(ReadErrorKind::MisplacedDot, span)),
            Token::Quote => {
                let quoted = self.read_required(symbols)?;
                Value::list([Value::Symbol(symbols.intern("quote")), quoted])
            }
            Token::Identifier(name) if self.fold_case => {
                Value::Symbol(symbols.intern(CaseMapper::new().fold_string(&name)))
            }
            Token::Identifier(name) => Value::Symbol(symbols.intern(name)),
            Token::Boolean(b) => Value::Bool(b),
            Token::Character(c) => Value::Char(c),
            Token::String(s) => Value::string(s),
            Token::Integer(n) => Value::Integer(n),
            // consumed by skip_trivia
            Token::BlockComment | Token::DatumComment | Token::Directive(_) => {
                return Err(ReadError::new(LexerError::Invalid, span))
            }
        };
        Ok(Some(datum))
    }

    fn read_required(&mut self, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
        self.read(symbols)?.ok_or_else(|| self.eof())
    }

    fn read_list(&mut self, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
        let mut items = vec![];
        loop {
            self.skip_trivia(symbols)?;
            match self.peek_token() {
                None => return Err(self.eof()),
                Some((Ok(Token::RParen), _)) => {
                    _ = self.next_token();
                    return Ok(Value::list(items));
                }
                Some((Ok(Token::Dot), span)) => {
                    let span = span.clone();
                    _ = self.next_token();
                    if items.is_empty() {
                        return Err(ReadError::new(ReadErrorKind::MisplacedDot, span));
                    }
                    let tail = self.read_required(symbols)?;
                    self.skip_trivia(symbols)?;
                    return match self.next_token() {
                        Some((Ok(Token::RParen), _)) => Ok(Value::list_with_tail(items, tail)),
                        Some((_, span)) => Err(ReadError::new(ReadErrorKind::MisplacedDot, span)),
                        None => Err(self.eof()),
                    };
                }
                Some(_) => items.push(self.read_required(symbols)?),
            }
        }
    }

    // directives, block comments and datum comments
    fn skip_trivia(&mut self, symbols: &mut SymbolTable) -> Result<(), ReadError> {
        loop {
            match self.peek_token() {
                Some((Ok(Token::Directive(directive)), _)) => {
                    let fold_case = *directive == Directive::FoldCase;
                    self.fold_case = fold_case;
                }
                Some((Ok(Token::BlockComment), _)) => {}
                Some((Ok(Token::DatumComment), _)) => {
                    _ = self.next_token();
                    self.read_required(symbols)?;
                    continue;
                }
                _ => return Ok(()),
            }
            _ = self.next_token();
        }
    }

    fn peek_token(&mut self) -> Option<&(Result<Token, LexerError>, Span)> {
        if self.peeked.is_none() {
            let token = self.lexer.next()?;
            self.peeked = Some((token, self.lexer.span()));
        }
        self.peeked.as_ref()
    }

    fn next_token(&mut self) -> Option<(Result<Token, LexerError>, Span)> {
        let next = match self.peeked.take() {
            Some(peeked) => peeked,
            None => (self.lexer.next()?, self.lexer.span()),
        };
        self.offset = next.1.end;
        Some(next)
    }

    fn eof(&self) -> ReadError {
        let end = self.lexer.source().len();
        ReadError::new(ReadErrorKind::UnexpectedEof, end..end)
    }
}

/// Reads one datum from `port`, pulling more lines from it until the datum is
/// complete. Returns the eof object once the port runs dry.
///
/// Spans in errors are relative to the text pending in the port.
pub fn read(port: &mut InputPort, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
    let io_error = |err: std::io::Error| ReadError::new(ReadErrorKind::Io(err.to_string()), 0..0);
    loop {
        let (result, consumed, fold_case) = {
            let mut reader = Reader::new(port.pending()).with_fold_case(port.fold_case);
            let result = reader.read(symbols);
            (result, reader.offset(), reader.fold_case())
        };
        match result {
            Ok(Some(datum)) => {
                port.consume(consumed);
                port.fold_case = fold_case;
                return Ok(datum);
            }
            Ok(None) => {
                port.consume(port.pending().len());
                port.fold_case = fold_case;
                if !port.fill().map_err(io_error)? {
                    return Ok(Value::Eof);
                }
            }
            Err(err) if err.is_incomplete() => {
                // Keep what is pending and retry once another line has arrived
                if !port.fill().map_err(io_error)? {
                    port.consume(port.pending().len());
                    return Err(err);
                }
            }
            Err(err) => {
                port.consume(err.span.end);
                return Err(err);
            }
        }
    }
}
