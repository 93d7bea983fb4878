//! Core parser infrastructure: token cursor, expect helpers, depth guards.

use tidepool_lexer::{Token, TokenKind};
use tidepool_types::{NodeId, Result, Span, SyntaxError, Tree, TreeBuilder};

/// Maximum expression nesting depth.
pub(crate) const MAX_EXPR_DEPTH: u32 = 64;

/// Maximum statement nesting depth.
pub(crate) const MAX_STMT_DEPTH: u32 = 64;

/// The tidepool parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Tree`].
/// Fails fast: shell input is a single interactive submission, so the
/// first error aborts the parse instead of driving recovery.
pub struct Parser {
    /// The token stream, ending with `Eof`.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Arena under construction. Nodes are added children-first, which
    /// gives the tree its bottom-up id order.
    pub(crate) builder: TreeBuilder,
    /// Byte length of the source, for the root span.
    source_end: u32,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    /// Current statement nesting depth.
    pub(crate) stmt_depth: u32,
    /// Current function nesting depth. `return` is rejected at depth 0.
    pub(crate) fn_depth: u32,
    /// Current loop nesting depth. `break`/`continue` are rejected at
    /// depth 0. Reset inside function bodies.
    pub(crate) loop_depth: u32,
}

impl Parser {
    /// Create a new parser from source text and its token stream.
    pub fn new(source: &str, tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: TreeBuilder::new(source),
            source_end: source.len() as u32,
            expr_depth: 0,
            stmt_depth: 0,
            fn_depth: 0,
            loop_depth: 0,
        }
    }

    /// Parse the token stream into a [`Tree`].
    pub fn parse(mut self) -> Result<Tree> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
        }
        let span = Span::new(0, self.source_end);
        let root = self
            .builder
            .add(tidepool_types::NodeKind::Program, span, statements);
        Ok(self.builder.build(root))
    }

    // ── Token cursor ──────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(0)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect helpers ────────────────────────────────────────────────

    /// Expect a specific token kind; consume and return it, or error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Result<Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(format!(
                "expected '{}', got '{}'",
                expected,
                self.peek_kind()
            )))
        }
    }

    /// Expect an identifier token; return its name and span.
    pub(crate) fn expect_ident(&mut self) -> Result<(String, Span)> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            other => Err(self.error_at_current(format!("expected identifier, got '{other}'"))),
        }
    }

    // ── Errors & guards ───────────────────────────────────────────────

    /// Build a syntax error located at the current token.
    pub(crate) fn error_at_current(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.current_span())
    }

    /// Bump the expression depth, erroring past the cap.
    pub(crate) fn enter_expr(&mut self) -> Result<()> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            return Err(self.error_at_current(format!(
                "expression nesting exceeds the maximum depth of {MAX_EXPR_DEPTH}"
            )));
        }
        Ok(())
    }

    /// Bump the statement depth, erroring past the cap.
    pub(crate) fn enter_stmt(&mut self) -> Result<()> {
        self.stmt_depth += 1;
        if self.stmt_depth > MAX_STMT_DEPTH {
            return Err(self.error_at_current(format!(
                "statement nesting exceeds the maximum depth of {MAX_STMT_DEPTH}"
            )));
        }
        Ok(())
    }

    /// Node span for a construct that began at `start`: runs through the
    /// end of the last consumed token. Computed from token positions, not
    /// child spans, so wrapping parentheses are never lost.
    pub(crate) fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.previous_span().end)
    }

    /// Convenience wrapper over the builder.
    pub(crate) fn add(
        &mut self,
        kind: tidepool_types::NodeKind,
        span: Span,
        children: Vec<NodeId>,
    ) -> NodeId {
        self.builder.add(kind, span, children)
    }
}
