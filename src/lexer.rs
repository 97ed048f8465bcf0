//! Single-pass lexer: a `start`/`current` cursor pair over the source
//! characters plus running `line`/`column` counters, with one `lex_*`
//! helper per lexeme shape. `%` gets its own dedicated branch rather than
//! falling through to another operator, and block comments nest.

use log::trace;

use crate::error::LexError;
use crate::token::{keyword, Literal, Token, TokenKind};

pub struct Lexer {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

type LexResult<T> = Result<T, LexError>;

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    pub fn lex(mut self) -> LexResult<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.lex_one()?;
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn advance_match(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, line, column));
    }

    fn push_literal(&mut self, kind: TokenKind, literal: Literal, line: usize, column: usize) {
        let lexeme = self.lexeme();
        self.tokens
            .push(Token::new(kind, lexeme, line, column).with_literal(literal));
    }

    fn lex_one(&mut self) -> LexResult<()> {
        let start_line = self.line;
        let start_col = self.column;
        let c = self.advance();

        match c {
            ' ' | '\r' => {
                self.column += 1;
                Ok(())
            }
            '\t' => {
                self.column += 3;
                Ok(())
            }
            '\n' => {
                self.line += 1;
                self.column = 1;
                Ok(())
            }
            '+' => self.emit_at(TokenKind::Plus, start_line, start_col),
            '-' => self.emit_at(TokenKind::Minus, start_line, start_col),
            '*' => self.emit_at(TokenKind::Star, start_line, start_col),
            '%' => self.emit_at(TokenKind::Percent, start_line, start_col),
            '&' => self.emit_at(TokenKind::And, start_line, start_col),
            '|' => self.emit_at(TokenKind::Or, start_line, start_col),
            '(' => self.emit_at(TokenKind::ParenLeft, start_line, start_col),
            ')' => self.emit_at(TokenKind::ParenRight, start_line, start_col),
            '{' => self.emit_at(TokenKind::BraceLeft, start_line, start_col),
            '}' => self.emit_at(TokenKind::BraceRight, start_line, start_col),
            '[' => self.emit_at(TokenKind::BracketLeft, start_line, start_col),
            ']' => self.emit_at(TokenKind::BracketRight, start_line, start_col),
            ',' => self.emit_at(TokenKind::Comma, start_line, start_col),
            '.' => self.emit_at(TokenKind::Dot, start_line, start_col),
            ';' => self.emit_at(TokenKind::Semicolon, start_line, start_col),
            '<' => {
                let kind = if self.advance_match('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.emit_at(kind, start_line, start_col)
            }
            '>' => {
                let kind = if self.advance_match('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.emit_at(kind, start_line, start_col)
            }
            '=' => {
                let kind = if self.advance_match('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equals
                };
                self.emit_at(kind, start_line, start_col)
            }
            '!' => {
                let kind = if self.advance_match('=') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                };
                self.emit_at(kind, start_line, start_col)
            }
            '/' => self.lex_slash(start_line, start_col),
            '"' | '\'' => self.lex_string(c, start_line, start_col),
            '0'..='9' => self.lex_number(start_line, start_col),
            c if c.is_ascii_alphabetic() => self.lex_identifier(start_line, start_col),
            other => Err(LexError::new(
                "Invalid Character",
                start_line,
                start_col,
            )
            .with_char(other)),
        }
    }

    fn emit_at(&mut self, kind: TokenKind, line: usize, column: usize) -> LexResult<()> {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, line, column));
        self.column += self.current - self.start;
        Ok(())
    }

    fn lex_slash(&mut self, line: usize, col: usize) -> LexResult<()> {
        if self.advance_match('/') {
            while self.peek().is_some_and(|c| c != '\n') {
                self.advance();
            }
            self.column += self.current - self.start;
            return Ok(());
        }
        if self.advance_match('*') {
            return self.lex_block_comment(line, col);
        }
        self.emit_at(TokenKind::Slash, line, col)
    }

    fn lex_block_comment(&mut self, line: usize, col: usize) -> LexResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => {
                    return Err(LexError::new("Unterminated block comment", line, col));
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    self.column += 2;
                    depth += 1;
                }
                Some('*') if self.peek_next() == Some('/') => {
                    self.advance();
                    self.advance();
                    self.column += 2;
                    depth -= 1;
                }
                Some(_) => {
                    self.advance();
                    self.column += 1;
                }
            }
        }
        Ok(())
    }

    fn lex_string(&mut self, quote: char, line: usize, col: usize) -> LexResult<()> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(LexError::new("Unterminated string", line, col)),
                Some('\n') => {
                    return Err(LexError::new(
                        "Unterminated string (literal newline)",
                        line,
                        col,
                    ))
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek_next() == Some('n') => {
                    self.advance();
                    self.advance();
                    value.push('\n');
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }
        self.push_literal(TokenKind::String, Literal::Str(value), line, col);
        self.column += self.current - self.start;
        Ok(())
    }

    fn lex_number(&mut self, line: usize, col: usize) -> LexResult<()> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = self.lexeme();
        let value: f64 = text
            .parse()
            .map_err(|_| LexError::new(format!("Invalid number '{text}'"), line, col))?;
        self.push_literal(TokenKind::Number, Literal::Number(value), line, col);
        self.column += self.current - self.start;
        Ok(())
    }

    fn lex_identifier(&mut self, line: usize, col: usize) -> LexResult<()> {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = self.lexeme();
        let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
        trace!("lexed '{text}' as {kind:?}");
        self.push(kind, line, col);
        self.column += self.current - self.start;
        Ok(())
    }
}

impl LexError {
    fn with_char(self, c: char) -> Self {
        Self {
            message: format!("{}: '{c}'", self.message),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .lex()
            .expect("lex should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_percent_without_fallthrough() {
        assert_eq!(
            kinds("5 % 2"),
            vec![
                TokenKind::Number,
                TokenKind::Percent,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_two_char_operators_before_single_char_prefixes() {
        assert_eq!(
            kinds("<= >= == !="),
            vec![
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn decodes_newline_escape_in_strings() {
        let tokens = Lexer::new("\"a\\nb\"").lex().unwrap();
        assert_eq!(
            tokens[0].literal,
            Some(Literal::Str("a\nb".to_string()))
        );
    }

    #[test]
    fn nested_block_comments_balance() {
        let tokens = Lexer::new("/* outer /* inner */ still outer */ 1").lex().unwrap();
        assert_eq!(kinds_of(&tokens), vec![TokenKind::Number, TokenKind::Eof]);
    }

    fn kinds_of(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        assert!(Lexer::new("/* never closed").lex().is_err());
    }

    #[test]
    fn line_and_column_tracking_resets_on_newline() {
        let tokens = Lexer::new("a\nb").lex().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 1);
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert_eq!(
            kinds("fn var if else while for loop return nil true false break continue import NaN infinity in"),
            vec![
                TokenKind::Fn,
                TokenKind::Var,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Loop,
                TokenKind::Return,
                TokenKind::Nil,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Import,
                TokenKind::Nan,
                TokenKind::Infinity,
                TokenKind::In,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn invalid_character_is_a_lex_error() {
        let err = Lexer::new("@").lex().unwrap_err();
        assert!(err.message.contains("Invalid Character"));
    }

    #[test]
    fn token_lexeme_matches_source_slice() {
        let source = "var count = 42;";
        let tokens = Lexer::new(source).lex().unwrap();
        for token in &tokens {
            if token.kind == TokenKind::Eof {
                continue;
            }
            assert!(source.contains(&token.lexeme));
        }
    }
}
