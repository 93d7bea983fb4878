//! Core lexer: converts submitted source text to a token stream.
//!
//! Features:
//! - Both string quote styles with the usual escapes
//! - Numbers with fraction and exponent parts, including `.5`
//! - `//` and `/* */` comments stripped
//! - Maximal-munch operators (`===` before `==` before `=`)
//!
//! The lexer fails fast: shell input is one user-typed submission, so
//! the first bad character aborts the pass instead of feeding an
//! error-recovery loop.

use tidepool_types::{Span, SyntaxError};

use crate::token::{Token, TokenKind};

/// The tidepool lexer.
///
/// Converts source text into a vector of [`Token`]s ending with
/// [`TokenKind::Eof`], or the first [`SyntaxError`] encountered.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer over the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
        }
    }

    /// Lex the entire source into a token stream.
    pub fn lex(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    fn error(&self, message: impl Into<String>, start: usize) -> SyntaxError {
        SyntaxError::new(message, self.span_from(start))
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace (newlines included) and comments.
    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error("unterminated block comment", start));
                            }
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_trivia()?;

        let start = self.pos;
        if self.at_end() {
            return Ok(Token::new(TokenKind::Eof, Span::point(start as u32)));
        }

        let ch = self.advance().ok_or_else(|| {
            // Unreachable after the at_end check; kept to avoid unwrap.
            self.error("unexpected end of input", start)
        })?;

        let kind = match ch {
            b'"' | b'\'' => return self.scan_string(ch, start),
            b'0'..=b'9' => return self.scan_number(start),
            b'.' => {
                if matches!(self.peek(), Some(b'0'..=b'9')) {
                    return self.scan_number(start);
                }
                TokenKind::Dot
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => return Ok(self.scan_identifier(start)),

            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semi,
            b':' => TokenKind::Colon,
            b'?' => TokenKind::Question,

            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::NotEqEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'+' => match self.peek() {
                Some(b'+') => {
                    self.advance();
                    TokenKind::PlusPlus
                }
                Some(b'=') => {
                    self.advance();
                    TokenKind::PlusAssign
                }
                _ => TokenKind::Plus,
            },
            b'-' => match self.peek() {
                Some(b'-') => {
                    self.advance();
                    TokenKind::MinusMinus
                }
                Some(b'=') => {
                    self.advance();
                    TokenKind::MinusAssign
                }
                _ => TokenKind::Minus,
            },
            b'*' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            b'/' => {
                // Comments were consumed by skip_trivia, so this is division.
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    return Err(self.error("unexpected character '&'", start));
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(self.error("unexpected character '|'", start));
                }
            }

            _ => {
                return Err(self.error(
                    format!("unexpected character '{}'", ch.escape_ascii()),
                    start,
                ));
            }
        };

        Ok(Token::new(kind, self.span_from(start)))
    }

    // ─────────────────────────────────────────────────────────────
    // Numbers
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: usize) -> Result<Token, SyntaxError> {
        // Integer part (may be empty for `.5`-style literals).
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }

        // Fraction.
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }

        // Exponent.
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                lookahead = 2;
            }
            if matches!(self.peek_at(lookahead), Some(b'0'..=b'9')) {
                for _ in 0..=lookahead {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }

        let span = self.span_from(start);
        let text = std::str::from_utf8(&self.source[start..self.pos])
            .map_err(|_| self.error("invalid number literal", start))?;
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("invalid number literal '{text}'"), start))?;

        Ok(Token::new(TokenKind::Number(value), span))
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start);
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));
        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // Strings
    // ─────────────────────────────────────────────────────────────

    fn scan_string(&mut self, quote: u8, start: usize) -> Result<Token, SyntaxError> {
        // Collected as bytes so multibyte UTF-8 sequences pass through
        // untouched; the quote, backslash and newline bytes this loop
        // inspects are ASCII and cannot occur inside a sequence.
        let mut value = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal", start)),
                Some(b'\n') => return Err(self.error("unterminated string literal", start)),
                Some(ch) if ch == quote => break,
                Some(b'\\') => {
                    let escaped = self
                        .advance()
                        .ok_or_else(|| self.error("unterminated string literal", start))?;
                    match escaped {
                        b'n' => value.push(b'\n'),
                        b't' => value.push(b'\t'),
                        b'r' => value.push(b'\r'),
                        b'b' => value.push(0x08),
                        b'f' => value.push(0x0C),
                        b'v' => value.push(0x0B),
                        b'0' => value.push(0),
                        // Unknown escapes resolve to the escaped character
                        // itself, matching the host language.
                        other => value.push(other),
                    }
                }
                Some(ch) => value.push(ch),
            }
        }
        let value = String::from_utf8(value)
            .map_err(|_| self.error("invalid UTF-8 in string literal", start))?;
        Ok(Token::new(TokenKind::Str(value), self.span_from(start)))
    }
}
