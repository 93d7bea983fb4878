//! Tidepool lexer: converts submitted source text into a token stream.

pub mod lexer;
pub mod token;

pub use lexer::Lexer;
pub use token::{Token, TokenKind, ALL_KEYWORDS};
