//! Parser state: a cursor over the token stream.
//!
//! The grammar is predictive with at most two tokens of lookahead, so the
//! state is a plain index with `peek`/`advance`/`expect`. The one place
//! that genuinely needs to try-and-back-off (recognising the start of a
//! CASE arm) uses `position`/`restore`.

use thiserror::Error;

use crate::lexer::{Token, TokenKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at {line}:{col}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        col: usize,
    },

    #[error("expected {expected}, found end of input")]
    UnexpectedEof { expected: String },

    #[error("RETURN outside a FUNCTION at {line}:{col}")]
    ReturnOutsideFunction { line: usize, col: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct ParseState {
    tokens: Vec<Token>,
    index: usize,
}

impl ParseState {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.index < self.tokens.len()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    /// One token past the next, for the few two-token decisions.
    pub fn peek2_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index + 1).map(|token| &token.kind)
    }

    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn restore(&mut self, position: usize) {
        self.index = position;
    }

    pub fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Consume the next token if it matches.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance().expect("checked token must be present"))
        } else {
            Err(self.error_expected(kind.describe()))
        }
    }

    pub fn expect_identifier(&mut self) -> ParseResult<i64> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(id)) => {
                let id = *id;
                self.index += 1;
                Ok(id)
            }
            _ => Err(self.error_expected("an identifier")),
        }
    }

    /// An error describing what the grammar wanted at the current token.
    pub fn error_expected(&self, expected: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.into(),
                found: token.kind.describe(),
                line: token.line,
                col: token.col,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.into(),
            },
        }
    }
}
