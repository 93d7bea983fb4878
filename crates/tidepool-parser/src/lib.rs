//! tidepool parser: converts a token stream into a rewritable syntax tree.

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::Parser;

use tidepool_lexer::Lexer;
use tidepool_types::{Result, Tree};

/// Lex and parse one shell submission.
pub fn parse_source(source: &str) -> Result<Tree> {
    let tokens = Lexer::new(source).lex()?;
    Parser::new(source, tokens).parse()
}
