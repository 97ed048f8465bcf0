//! Error types for the three failure domains of the interpreter pipeline.
//!
//! Hand-written `Display`/`Error` impls rather than a derive-macro crate:
//! each error is small and the messages are part of the user-facing
//! contract, so spelling them out explicitly keeps the wording under
//! direct control.

use std::fmt;

use crate::token::Token;

/// An error raised while turning source text into tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for LexError {}

/// An error raised while building the AST from a token stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub token: Token,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            token,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.message, self.token.line, self.token.column
        )
    }
}

impl std::error::Error for ParseError {}

/// An error raised while evaluating the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }

    pub fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for RuntimeError {}

/// Unified error for call sites (the import loader, `main`) that can hit
/// any of the three failure domains.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(LexError),
    Parse(ParseError),
    Runtime(RuntimeError),
}

impl Error {
    pub fn position(&self) -> (usize, usize) {
        match self {
            Error::Lex(e) => (e.line, e.column),
            Error::Parse(e) => (e.token.line, e.token.column),
            Error::Runtime(e) => (e.line, e.column),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Lex(e) => &e.message,
            Error::Parse(e) => &e.message,
            Error::Runtime(e) => &e.message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(e) => e.fmt(f),
            Error::Parse(e) => e.fmt(f),
            Error::Runtime(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexError> for Error {
    fn from(value: LexError) -> Self {
        Error::Lex(value)
    }
}

impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Error::Parse(value)
    }
}

impl From<RuntimeError> for Error {
    fn from(value: RuntimeError) -> Self {
        Error::Runtime(value)
    }
}
