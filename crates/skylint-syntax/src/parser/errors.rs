//! Parse error types.

use crate::tokenizer::{LexError, Position, TokenKind};
use thiserror::Error;

/// A single syntax problem, with the conventional generated-parser message
/// shape: `syntax error: unexpected <token>, expecting <A> or <B>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {message}")]
pub struct SyntaxError {
    pub pos: Position,
    pub message: String,
}

impl SyntaxError {
    /// At most this many expected tokens are suggested, matching the
    /// conventional generated-parser error format.
    pub const MAX_EXPECTED: usize = 4;

    pub(crate) fn unexpected(pos: Position, got: TokenKind, expected: &[TokenKind]) -> SyntaxError {
        let mut message = format!("syntax error: unexpected {}", got);
        for (i, kind) in expected.iter().take(Self::MAX_EXPECTED).enumerate() {
            if i == 0 {
                message.push_str(", expecting ");
            } else {
                message.push_str(" or ");
            }
            message.push_str(kind.describe());
        }
        SyntaxError { pos, message }
    }
}

/// A failed parse. Carries every syntax problem found before the parser gave
/// up; no tree is produced for the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{}", .0[0])]
    Syntax(Vec<SyntaxError>),
}

impl ParseError {
    /// The position of the first error.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.pos,
            ParseError::Syntax(errors) => errors[0].pos,
        }
    }

    /// The message of the first error, without the position prefix.
    pub fn message(&self) -> String {
        match self {
            ParseError::Lex(e) => e.kind.to_string(),
            ParseError::Syntax(errors) => errors[0].message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
