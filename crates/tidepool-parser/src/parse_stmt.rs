//! Statement parsing.
//!
//! Statement spans include a trailing `;` when one is present; the
//! rewrite stage relies on this so a statement-level replacement
//! swallows the original terminator. The one exception is a `var`
//! declaration in a `for` header, whose `;` belongs to the header.

use tidepool_lexer::TokenKind;
use tidepool_types::{NodeId, NodeKind, Result};

use crate::parser::Parser;

impl Parser {
    /// Parse one statement.
    pub(crate) fn parse_statement(&mut self) -> Result<NodeId> {
        self.enter_stmt()?;
        let result = self.parse_statement_inner();
        self.stmt_depth -= 1;
        result
    }

    fn parse_statement_inner(&mut self) -> Result<NodeId> {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break_continue(NodeKind::Break, "break"),
            TokenKind::Continue => self.parse_break_continue(NodeKind::Continue, "continue"),
            TokenKind::Semi => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Empty, span, vec![]))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `var a = 1, b;` with the trailing `;` consumed here.
    fn parse_var_statement(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let declarators = self.parse_var_declarators()?;
        self.eat(&TokenKind::Semi);
        Ok(self.add(NodeKind::VarDecl, self.span_from(start), declarators))
    }

    /// The declarator list of a `var` statement, without a terminator.
    /// Shared with the `for` header, which owns its own `;`.
    fn parse_var_declarators(&mut self) -> Result<Vec<NodeId>> {
        self.expect(&TokenKind::Var)?;
        let mut declarators = Vec::new();
        loop {
            let (name, name_span) = self.expect_ident()?;
            let start = name_span.start;
            let ident = self.add(NodeKind::Ident(name), name_span, vec![]);
            let children = if self.eat(&TokenKind::Assign) {
                let init = self.parse_assignment()?;
                vec![ident, init]
            } else {
                vec![ident]
            };
            declarators.push(self.add(NodeKind::VarDeclarator, self.span_from(start), children));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(declarators)
    }

    /// `function name(params) { ... }`
    ///
    /// The name and parameters are stored as payloads on the node, with
    /// the body block as the only child.
    fn parse_function_declaration(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::Function)?;
        let (name, _) = self.expect_ident()?;
        let params = self.parse_param_list()?;
        let body = self.parse_function_body()?;
        Ok(self.add(
            NodeKind::FunctionDecl { name, params },
            self.span_from(start),
            vec![body],
        ))
    }

    /// `( ident, ident, ... )`, names only.
    pub(crate) fn parse_param_list(&mut self) -> Result<Vec<String>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, _) = self.expect_ident()?;
                params.push(name);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    /// A function body block. `return` becomes legal inside; loop depth
    /// starts fresh so a stray `break` cannot target an outer loop.
    pub(crate) fn parse_function_body(&mut self) -> Result<NodeId> {
        self.fn_depth += 1;
        let saved_loop_depth = self.loop_depth;
        self.loop_depth = 0;
        let result = self.parse_block();
        self.loop_depth = saved_loop_depth;
        self.fn_depth -= 1;
        result
    }

    /// `{ statements }`, braces included in the span.
    pub(crate) fn parse_block(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error_at_current("expected '}', got end of input"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.add(NodeKind::Block, self.span_from(start), statements))
    }

    /// `if (test) consequent [else alternate]`
    fn parse_if(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        let consequent = self.parse_statement()?;
        let mut children = vec![test, consequent];
        if self.eat(&TokenKind::Else) {
            children.push(self.parse_statement()?);
        }
        Ok(self.add(NodeKind::If, self.span_from(start), children))
    }

    /// `for (init; test; update) body` with every clause optional.
    fn parse_for(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        let mut children = Vec::new();
        let has_init = !self.check(&TokenKind::Semi);
        if has_init {
            if self.check(&TokenKind::Var) {
                let decl_start = self.current_span().start;
                let declarators = self.parse_var_declarators()?;
                children.push(self.add(
                    NodeKind::VarDecl,
                    self.span_from(decl_start),
                    declarators,
                ));
            } else {
                children.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::Semi)?;

        let has_test = !self.check(&TokenKind::Semi);
        if has_test {
            children.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::Semi)?;

        let has_update = !self.check(&TokenKind::RParen);
        if has_update {
            children.push(self.parse_expression()?);
        }
        self.expect(&TokenKind::RParen)?;

        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        children.push(body?);

        Ok(self.add(
            NodeKind::For {
                has_init,
                has_test,
                has_update,
            },
            self.span_from(start),
            children,
        ))
    }

    /// `while (test) body`
    fn parse_while(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        Ok(self.add(NodeKind::While, self.span_from(start), vec![test, body?]))
    }

    /// `do body while (test);`
    fn parse_do_while(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::Do)?;
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        let body = body?;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RParen)?;
        self.eat(&TokenKind::Semi);
        Ok(self.add(NodeKind::DoWhile, self.span_from(start), vec![body, test]))
    }

    /// `return [expr];`, only legal inside a function body.
    fn parse_return(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        if self.fn_depth == 0 {
            return Err(self.error_at_current("'return' outside of a function"));
        }
        self.expect(&TokenKind::Return)?;
        let mut children = Vec::new();
        if !matches!(
            self.peek_kind(),
            TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
        ) {
            children.push(self.parse_expression()?);
        }
        self.eat(&TokenKind::Semi);
        Ok(self.add(NodeKind::Return, self.span_from(start), children))
    }

    /// `break;` / `continue;`, only legal inside a loop.
    fn parse_break_continue(&mut self, kind: NodeKind, name: &str) -> Result<NodeId> {
        let start = self.current_span().start;
        if self.loop_depth == 0 {
            return Err(self.error_at_current(format!("'{name}' outside of a loop")));
        }
        self.advance();
        self.eat(&TokenKind::Semi);
        Ok(self.add(kind, self.span_from(start), vec![]))
    }

    /// An expression used as a statement, with its optional `;`.
    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let expr = self.parse_expression()?;
        self.eat(&TokenKind::Semi);
        Ok(self.add(NodeKind::ExpressionStmt, self.span_from(start), vec![expr]))
    }
}
