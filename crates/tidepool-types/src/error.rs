use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A syntax error produced by the lexer or parser.
///
/// One submission produces at most one syntax error: shell input is a
/// single line typed by a user, so the first error aborts the rewrite
/// pass rather than feeding an error-recovery loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxError {
    /// Human-readable error message.
    pub message: String,
    /// Source location of the offending token or character.
    pub span: Span,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error at {}: {}", self.span, self.message)
    }
}

impl std::error::Error for SyntaxError {}
