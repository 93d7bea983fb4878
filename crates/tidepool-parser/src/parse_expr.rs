//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 10. `,` (sequence)
//! 9. `=`, `+=`, `-=`, `*=`, `/=`, `%=` (right-assoc)
//! 8. `?:`
//! 7. `||`
//! 6. `&&`
//! 5. `==`, `===`, `!=`, `!==`
//! 4. `<`, `<=`, `>`, `>=`
//! 3. `+`, `-` then `*`, `/`, `%`
//! 2. prefix `!`, `-`, `+`, `typeof`, `++`, `--`; postfix `++`, `--`
//! 1. `new`, call `()`, member `.` / `[]`

use tidepool_lexer::TokenKind;
use tidepool_types::{AssignOp, BinaryOp, LogicalOp, NodeId, NodeKind, Result, UnaryOp, UpdateOp};

use crate::parser::Parser;

impl Parser {
    // ── Entry points ──────────────────────────────────────────────────

    /// Parse a full expression, comma sequence included. Used where the
    /// grammar allows a sequence: expression statements, `for` clauses,
    /// and parenthesized expressions.
    pub(crate) fn parse_expression(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(&TokenKind::Comma) {
            parts.push(self.parse_assignment()?);
        }
        Ok(self.add(NodeKind::Sequence, self.span_from(start), parts))
    }

    /// Parse a single expression without crossing a `,`. Used for call
    /// arguments, array elements, property values, and initializers.
    pub(crate) fn parse_assignment(&mut self) -> Result<NodeId> {
        self.enter_expr()?;
        let result = self.parse_assignment_inner();
        self.expr_depth -= 1;
        result
    }

    // ── Precedence chain ──────────────────────────────────────────────

    fn parse_assignment_inner(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let left = self.parse_conditional()?;

        let op = match self.peek_kind() {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::AddAssign,
            TokenKind::MinusAssign => AssignOp::SubAssign,
            TokenKind::StarAssign => AssignOp::MulAssign,
            TokenKind::SlashAssign => AssignOp::DivAssign,
            TokenKind::PercentAssign => AssignOp::RemAssign,
            _ => return Ok(left),
        };
        self.check_target(left, "assignment")?;
        self.advance();
        // Right-associative: `a = b = c` is `a = (b = c)`.
        let value = self.parse_assignment()?;
        Ok(self.add(
            NodeKind::Assign(op),
            self.span_from(start),
            vec![left, value],
        ))
    }

    /// `test ? consequent : alternate`
    fn parse_conditional(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let test = self.parse_logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(self.add(
            NodeKind::Conditional,
            self.span_from(start),
            vec![test, consequent, alternate],
        ))
    }

    fn parse_logical_or(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_logical_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_logical_and()?;
            left = self.add(
                NodeKind::Logical(LogicalOp::Or),
                self.span_from(start),
                vec![left, right],
            );
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.add(
                NodeKind::Logical(LogicalOp::And),
                self.span_from(start),
                vec![left, right],
            );
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::EqEqEq => BinaryOp::StrictEq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::NotEqEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.add(NodeKind::Binary(op), self.span_from(start), vec![left, right]);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.add(NodeKind::Binary(op), self.span_from(start), vec![left, right]);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.add(NodeKind::Binary(op), self.span_from(start), vec![left, right]);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.add(NodeKind::Binary(op), self.span_from(start), vec![left, right]);
        }
        Ok(left)
    }

    /// Prefix operators, right-associative.
    fn parse_unary(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::TypeOf => Some(UnaryOp::TypeOf),
            TokenKind::PlusPlus => {
                return self.parse_prefix_update(UpdateOp::Increment);
            }
            TokenKind::MinusMinus => {
                return self.parse_prefix_update(UpdateOp::Decrement);
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(self.add(NodeKind::Unary(op), self.span_from(start), vec![operand]))
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_prefix_update(&mut self, op: UpdateOp) -> Result<NodeId> {
        let start = self.current_span().start;
        self.advance();
        let target = self.parse_unary()?;
        self.check_target(target, "update")?;
        Ok(self.add(
            NodeKind::Update { op, prefix: true },
            self.span_from(start),
            vec![target],
        ))
    }

    /// Postfix `++` / `--`.
    fn parse_postfix(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let expr = self.parse_call_member()?;
        let op = match self.peek_kind() {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.check_target(expr, "update")?;
        self.advance();
        Ok(self.add(
            NodeKind::Update { op, prefix: false },
            self.span_from(start),
            vec![expr],
        ))
    }

    // ── Calls, members, new ───────────────────────────────────────────

    /// Left-associative chain of calls, dot access, and index access.
    fn parse_call_member(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            expr = match self.peek_kind() {
                TokenKind::Dot => self.parse_dot_access(expr, start)?,
                TokenKind::LBracket => self.parse_index_access(expr, start)?,
                TokenKind::LParen => {
                    let mut children = vec![expr];
                    children.extend(self.parse_arguments()?);
                    self.add(NodeKind::Call, self.span_from(start), children)
                }
                _ => return Ok(expr),
            };
        }
    }

    /// `new Callee(args)`. The callee is a member chain; calls bind to
    /// the `new` itself, so `new a.b(x).c()` constructs `a.b` and then
    /// invokes `.c()` on the result. Argument parentheses are optional,
    /// `new F` constructs with no arguments.
    fn parse_new(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::New)?;
        let member_start = self.current_span().start;
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            callee = match self.peek_kind() {
                TokenKind::Dot => self.parse_dot_access(callee, member_start)?,
                TokenKind::LBracket => self.parse_index_access(callee, member_start)?,
                _ => break,
            };
        }
        let mut children = vec![callee];
        if self.check(&TokenKind::LParen) {
            children.extend(self.parse_arguments()?);
        }
        Ok(self.add(NodeKind::New, self.span_from(start), children))
    }

    /// `.name`: the property name is a payload, not a node.
    fn parse_dot_access(&mut self, object: NodeId, start: u32) -> Result<NodeId> {
        self.expect(&TokenKind::Dot)?;
        let (name, _) = self.expect_ident()?;
        Ok(self.add(
            NodeKind::Member {
                property: Some(name),
            },
            self.span_from(start),
            vec![object],
        ))
    }

    /// `[expr]`: computed access keeps the property as a child.
    fn parse_index_access(&mut self, object: NodeId, start: u32) -> Result<NodeId> {
        self.expect(&TokenKind::LBracket)?;
        let property = self.parse_expression()?;
        self.expect(&TokenKind::RBracket)?;
        Ok(self.add(
            NodeKind::Member { property: None },
            self.span_from(start),
            vec![object, property],
        ))
    }

    /// `( arg, arg, ... )` for calls and `new`.
    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    // ── Primary ───────────────────────────────────────────────────────

    fn parse_primary(&mut self) -> Result<NodeId> {
        match self.peek_kind().clone() {
            TokenKind::Number(value) => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Number(value), span, vec![]))
            }
            TokenKind::Str(value) => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Str(value), span, vec![]))
            }
            TokenKind::True => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Bool(true), span, vec![]))
            }
            TokenKind::False => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Bool(false), span, vec![]))
            }
            TokenKind::Null => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Null, span, vec![]))
            }
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok(self.add(NodeKind::Ident(name), span, vec![]))
            }
            TokenKind::LParen => {
                // No dedicated paren node: the parentheses live in the
                // enclosing node's gaps and come back in rendering.
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Function => self.parse_function_expression(),
            other => Err(self.error_at_current(format!("expected expression, got '{other}'"))),
        }
    }

    /// `[a, b, c]`, trailing comma tolerated.
    fn parse_array(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(self.add(NodeKind::Array, self.span_from(start), elements))
    }

    /// `{key: value, "key": value}`, trailing comma tolerated. Keys are
    /// payloads on the `Property` nodes; their source text (quotes
    /// included) lives in the gap before the value child.
    fn parse_object(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::LBrace)?;
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let prop_start = self.current_span().start;
            let key = match self.peek_kind().clone() {
                TokenKind::Ident(name) => {
                    self.advance();
                    name
                }
                TokenKind::Str(value) => {
                    self.advance();
                    value
                }
                other => {
                    return Err(
                        self.error_at_current(format!("expected property key, got '{other}'"))
                    );
                }
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_assignment()?;
            properties.push(self.add(
                NodeKind::Property { key },
                self.span_from(prop_start),
                vec![value],
            ));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(self.add(NodeKind::Object, self.span_from(start), properties))
    }

    /// `function [name](params) { ... }` in expression position.
    fn parse_function_expression(&mut self) -> Result<NodeId> {
        let start = self.current_span().start;
        self.expect(&TokenKind::Function)?;
        let name = match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let params = self.parse_param_list()?;
        let body = self.parse_function_body()?;
        Ok(self.add(
            NodeKind::FunctionExpr { name, params },
            self.span_from(start),
            vec![body],
        ))
    }

    // ── Target validation ─────────────────────────────────────────────

    /// Assignment and update targets must be identifiers or members.
    fn check_target(&self, id: NodeId, what: &str) -> Result<()> {
        match self.builder.kind(id) {
            NodeKind::Ident(_) | NodeKind::Member { .. } => Ok(()),
            _ => Err(self.error_at_current(format!("invalid {what} target"))),
        }
    }
}
