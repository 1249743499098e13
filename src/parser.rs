//! Recursive-descent statement parser with precedence-climbing expressions.
//!
//! Errors are recorded in the shared [`Diagnostics`] collector and never
//! abort the parse: a failed [`Parser::expect`] returns a sentinel token and
//! parsing continues from the current position, so downstream code must
//! tolerate partially-built subtrees.

use crate::ast::*;
use crate::diagnostics::Diagnostics;
use crate::tokens::{Span, Token, TokenKind};

const DIAG_SOURCE: &str = "parser";

#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    /// Currently unused by the parser; reserved for a future strict grammar
    /// subset. Kept so the façade's option surface is stable.
    pub strict_mode: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { strict_mode: false }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
    #[allow(dead_code)]
    options: ParserOptions,
}

/// Binary operator precedence levels, low to high. `^` binds tighter than
/// unary operators; `..` is right-associative; everything else left.
fn binary_precedence(kind: &TokenKind) -> Option<(u8, BinaryOp)> {
    Some(match kind {
        TokenKind::Or => (1, BinaryOp::Or),
        TokenKind::And => (2, BinaryOp::And),
        TokenKind::Lt => (3, BinaryOp::Lt),
        TokenKind::Gt => (3, BinaryOp::Gt),
        TokenKind::LtEq => (3, BinaryOp::LtEq),
        TokenKind::GtEq => (3, BinaryOp::GtEq),
        TokenKind::Eq => (3, BinaryOp::Eq),
        TokenKind::NotEq => (3, BinaryOp::NotEq),
        TokenKind::DotDot => (4, BinaryOp::Concat),
        TokenKind::Plus => (5, BinaryOp::Add),
        TokenKind::Minus => (5, BinaryOp::Sub),
        TokenKind::Star => (6, BinaryOp::Mul),
        TokenKind::Slash => (6, BinaryOp::Div),
        TokenKind::DSlash => (6, BinaryOp::FloorDiv),
        TokenKind::Percent => (6, BinaryOp::Mod),
        TokenKind::Caret => (8, BinaryOp::Pow),
        _ => return None,
    })
}

const UNARY_PRECEDENCE: u8 = 7;

fn is_right_associative(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Concat | BinaryOp::Pow)
}

impl Parser {
    pub fn new(tokens: Vec<Token>, options: ParserOptions) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    /// Parses an entire program: a sequence of statements up to EOF.
    pub fn parse_program(mut self) -> (Program, Diagnostics) {
        let start = self.peek(0).span;
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            let before = self.pos;
            body.push(self.parse_statement());
            if self.pos == before {
                // Guarantee forward progress on a statement that consumed
                // nothing (e.g. a completely unrecognized leading token).
                self.advance();
            }
        }
        let end = self.peek(0).span;
        let span = if body.is_empty() {
            start
        } else {
            start.merge(end)
        };
        (Program { body, span }, self.diagnostics)
    }

    // ── Token stream primitives ──────────────────────────────────────

    fn peek(&self, k: usize) -> &Token {
        let idx = (self.pos + k).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek(0).clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn previous(&self) -> &Token {
        let idx = self.pos.saturating_sub(1);
        &self.tokens[idx]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek(0).kind) == std::mem::discriminant(kind)
    }

    fn match_tok(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token if it matches `kind`; otherwise records a
    /// diagnostic and returns a sentinel token at the current position
    /// without advancing, so the caller can keep building a partial tree.
    fn expect(&mut self, kind: &TokenKind, what: &str) -> Token {
        if self.check(kind) {
            self.advance()
        } else {
            let found = self.peek(0).clone();
            self.diagnostics.error(
                format!("expected {}, found {}", what, found.kind),
                found.span,
                DIAG_SOURCE,
            );
            found
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let span = self.peek(0).span;
        self.diagnostics.error(message, span, DIAG_SOURCE);
    }

    fn ident_name(tok: &Token) -> String {
        match &tok.kind {
            TokenKind::Identifier(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn expect_identifier(&mut self) -> Identifier {
        if let TokenKind::Identifier(_) = self.peek(0).kind {
            let tok = self.advance();
            Identifier {
                name: Self::ident_name(&tok),
                span: tok.span,
            }
        } else {
            let found = self.peek(0).clone();
            self.diagnostics.error(
                format!("expected identifier, found {}", found.kind),
                found.span,
                DIAG_SOURCE,
            );
            Identifier {
                name: String::new(),
                span: found.span,
            }
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Statement {
        let stmt = match &self.peek(0).kind {
            TokenKind::Semicolon => {
                let span = self.advance().span;
                Statement::Empty(span)
            }
            TokenKind::Local => self.parse_local_or_local_function(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Repeat => self.parse_repeat(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function_declaration(false),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let span = self.advance().span;
                Statement::Break(span)
            }
            TokenKind::Do => self.parse_do(),
            TokenKind::Goto => self.parse_goto(),
            TokenKind::DoubleColon => self.parse_label(),
            _ => self.parse_assignment_or_call(),
        };
        self.match_tok(&TokenKind::Semicolon);
        stmt
    }

    fn parse_block_until(&mut self, terminators: &[TokenKind]) -> Vec<Statement> {
        let mut body = Vec::new();
        while !self.at_block_end(terminators) {
            let before = self.pos;
            body.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        body
    }

    fn at_block_end(&self, terminators: &[TokenKind]) -> bool {
        if self.check(&TokenKind::Eof) {
            return true;
        }
        terminators.iter().any(|t| self.check(t))
    }

    fn parse_local_or_local_function(&mut self) -> Statement {
        let start = self.advance().span; // `local`
        if self.check(&TokenKind::Function) {
            return self.parse_function_declaration_with_local(start, true);
        }
        let mut variables = vec![self.expect_identifier()];
        while self.match_tok(&TokenKind::Comma) {
            variables.push(self.expect_identifier());
        }
        let mut init = Vec::new();
        if self.match_tok(&TokenKind::Assign) {
            init.push(self.parse_expression());
            while self.match_tok(&TokenKind::Comma) {
                init.push(self.parse_expression());
            }
        }
        let end = init
            .last()
            .map(|e| e.span())
            .or_else(|| variables.last().map(|v| v.span))
            .unwrap_or(start);
        Statement::Local(LocalStmt {
            variables,
            init,
            span: start.merge(end),
        })
    }

    fn parse_function_declaration(&mut self, is_local: bool) -> Statement {
        let start = self.peek(0).span;
        self.parse_function_declaration_with_local(start, is_local)
    }

    fn parse_function_declaration_with_local(&mut self, start: Span, is_local: bool) -> Statement {
        self.expect(&TokenKind::Function, "'function'");
        let mut name: Expression = Expression::Identifier(self.expect_identifier());
        let mut is_method = false;
        loop {
            if self.match_tok(&TokenKind::Dot) {
                let field = self.expect_identifier();
                let span = name.span().merge(field.span);
                name = Expression::Member {
                    base: Box::new(name),
                    name: field.name,
                    computed_key: None,
                    computed: false,
                    span,
                };
            } else if self.match_tok(&TokenKind::Colon) {
                let field = self.expect_identifier();
                let span = name.span().merge(field.span);
                name = Expression::Member {
                    base: Box::new(name),
                    name: field.name,
                    computed_key: None,
                    computed: false,
                    span,
                };
                is_method = true;
                break;
            } else {
                break;
            }
        }
        let (mut params, is_vararg, body, end) = self.parse_function_body();
        if is_method {
            params.insert(
                0,
                Identifier {
                    name: "self".to_string(),
                    span: name.span(),
                },
            );
        }
        Statement::FunctionDeclaration(FunctionDeclarationStmt {
            name,
            params,
            is_vararg,
            body,
            is_local,
            span: start.merge(end),
        })
    }

    /// Parses `(params) block end`, returning the parameter list, whether
    /// the last parameter is `...`, the body, and the span of `end`.
    fn parse_function_body(&mut self) -> (Vec<Identifier>, bool, Vec<Statement>, Span) {
        self.expect(&TokenKind::LParen, "'('");
        let mut params = Vec::new();
        let mut is_vararg = false;
        if !self.check(&TokenKind::RParen) {
            loop {
                if self.check(&TokenKind::Ellipsis) {
                    self.advance();
                    is_vararg = true;
                    break;
                }
                params.push(self.expect_identifier());
                if !self.match_tok(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'");
        let body = self.parse_block_until(&[TokenKind::End]);
        let end_tok = self.expect(&TokenKind::End, "'end'");
        (params, is_vararg, body, end_tok.span)
    }

    fn parse_if(&mut self) -> Statement {
        let start = self.advance().span; // `if`
        let mut clauses = Vec::new();
        let condition = self.parse_expression();
        self.expect(&TokenKind::Then, "'then'");
        let body = self.parse_block_until(&[TokenKind::Elseif, TokenKind::Else, TokenKind::End]);
        clauses.push(IfClause { condition, body });
        while self.check(&TokenKind::Elseif) {
            self.advance();
            let condition = self.parse_expression();
            self.expect(&TokenKind::Then, "'then'");
            let body =
                self.parse_block_until(&[TokenKind::Elseif, TokenKind::Else, TokenKind::End]);
            clauses.push(IfClause { condition, body });
        }
        let else_body = if self.match_tok(&TokenKind::Else) {
            Some(self.parse_block_until(&[TokenKind::End]))
        } else {
            None
        };
        let end_tok = self.expect(&TokenKind::End, "'end'");
        Statement::If(IfStmt {
            clauses,
            else_body,
            span: start.merge(end_tok.span),
        })
    }

    fn parse_while(&mut self) -> Statement {
        let start = self.advance().span; // `while`
        let condition = self.parse_expression();
        self.expect(&TokenKind::Do, "'do'");
        let body = self.parse_block_until(&[TokenKind::End]);
        let end_tok = self.expect(&TokenKind::End, "'end'");
        Statement::While(WhileStmt {
            condition,
            body,
            span: start.merge(end_tok.span),
        })
    }

    fn parse_repeat(&mut self) -> Statement {
        let start = self.advance().span; // `repeat`
        let body = self.parse_block_until(&[TokenKind::Until]);
        self.expect(&TokenKind::Until, "'until'");
        let condition = self.parse_expression();
        let span = start.merge(condition.span());
        Statement::Repeat(RepeatStmt {
            body,
            condition,
            span,
        })
    }

    fn parse_for(&mut self) -> Statement {
        let start = self.advance().span; // `for`
        let first = self.expect_identifier();
        if self.match_tok(&TokenKind::Assign) {
            let from = self.parse_expression();
            self.expect(&TokenKind::Comma, "','");
            let to = self.parse_expression();
            let step = if self.match_tok(&TokenKind::Comma) {
                Some(self.parse_expression())
            } else {
                None
            };
            self.expect(&TokenKind::Do, "'do'");
            let body = self.parse_block_until(&[TokenKind::End]);
            let end_tok = self.expect(&TokenKind::End, "'end'");
            return Statement::ForNumeric(ForNumericStmt {
                variable: first,
                start: from,
                end: to,
                step,
                body,
                span: start.merge(end_tok.span),
            });
        }
        let mut variables = vec![first];
        while self.match_tok(&TokenKind::Comma) {
            variables.push(self.expect_identifier());
        }
        self.expect(&TokenKind::In, "'in'");
        let mut iterators = vec![self.parse_expression()];
        while self.match_tok(&TokenKind::Comma) {
            iterators.push(self.parse_expression());
        }
        self.expect(&TokenKind::Do, "'do'");
        let body = self.parse_block_until(&[TokenKind::End]);
        let end_tok = self.expect(&TokenKind::End, "'end'");
        Statement::ForGeneric(ForGenericStmt {
            variables,
            iterators,
            body,
            span: start.merge(end_tok.span),
        })
    }

    fn parse_return(&mut self) -> Statement {
        let start = self.advance().span; // `return`
        let mut arguments = Vec::new();
        let at_block_boundary = matches!(
            self.peek(0).kind,
            TokenKind::End
                | TokenKind::Else
                | TokenKind::Elseif
                | TokenKind::Until
                | TokenKind::Eof
                | TokenKind::Semicolon
        );
        if !at_block_boundary {
            arguments.push(self.parse_expression());
            while self.match_tok(&TokenKind::Comma) {
                arguments.push(self.parse_expression());
            }
        }
        let end = arguments.last().map(|e| e.span()).unwrap_or(start);
        Statement::Return(ReturnStmt {
            arguments,
            span: start.merge(end),
        })
    }

    fn parse_do(&mut self) -> Statement {
        let start = self.advance().span; // `do`
        let body = self.parse_block_until(&[TokenKind::End]);
        let end_tok = self.expect(&TokenKind::End, "'end'");
        Statement::Do(DoStmt {
            body,
            span: start.merge(end_tok.span),
        })
    }

    fn parse_goto(&mut self) -> Statement {
        let start = self.advance().span; // `goto`
        let label = self.expect_identifier();
        Statement::Goto(GotoStmt {
            label: label.name,
            span: start.merge(label.span),
        })
    }

    fn parse_label(&mut self) -> Statement {
        let start = self.advance().span; // `::`
        let name = self.expect_identifier();
        let end_tok = self.expect(&TokenKind::DoubleColon, "'::'");
        Statement::Label(LabelStmt {
            name: name.name,
            span: start.merge(end_tok.span),
        })
    }

    /// Handles the grammar ambiguity between assignment and a bare call
    /// statement: parse a comma-separated list of prefix-expressions, then
    /// decide by the next token.
    fn parse_assignment_or_call(&mut self) -> Statement {
        let start = self.peek(0).span;
        let first = self.parse_prefix_expression();
        if self.check(&TokenKind::Assign) || self.check(&TokenKind::Comma) {
            let mut targets = vec![first];
            while self.match_tok(&TokenKind::Comma) {
                targets.push(self.parse_prefix_expression());
            }
            for target in &targets {
                if !target.is_assignable() {
                    self.diagnostics.error(
                        "invalid assignment target".to_string(),
                        target.span(),
                        DIAG_SOURCE,
                    );
                }
            }
            self.expect(&TokenKind::Assign, "'='");
            let mut init = vec![self.parse_expression()];
            while self.match_tok(&TokenKind::Comma) {
                init.push(self.parse_expression());
            }
            let end = init.last().map(|e| e.span()).unwrap_or(start);
            return Statement::Assignment(AssignmentStmt {
                targets,
                init,
                span: start.merge(end),
            });
        }
        if matches!(first, Expression::Call { .. }) {
            let span = first.span();
            return Statement::Expression(ExpressionStmt {
                expression: first,
                span,
            });
        }
        self.error_here("expected statement: a call or an assignment");
        let span = first.span();
        Statement::Expression(ExpressionStmt {
            expression: first,
            span,
        })
    }

    // ── Expressions ──────────────────────────────────────────────────

    pub(crate) fn parse_expression(&mut self) -> Expression {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Expression {
        let mut left = self.parse_unary();
        loop {
            let Some((prec, op)) = binary_precedence(&self.peek(0).kind) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if is_right_associative(op) { prec } else { prec + 1 };
            let right = self.parse_binary(next_min);
            let span = left.span().merge(right.span());
            left = Expression::Binary {
                operator: op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }
        left
    }

    fn parse_unary(&mut self) -> Expression {
        let op = match &self.peek(0).kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Hash => Some(UnaryOp::Len),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            // Unary operators bind tighter than every binary operator except
            // `^`, which binds to the operand directly (`-a^b` ⇒ `-(a^b)`).
            let argument = self.parse_binary(UNARY_PRECEDENCE);
            let span = start.merge(argument.span());
            return Expression::Unary {
                operator: op,
                argument: Box::new(argument),
                span,
            };
        }
        self.parse_pow()
    }

    /// `^` is right-associative and binds tighter than unary operators, so a
    /// primary expression followed by `^` is parsed here rather than folded
    /// into `parse_unary`'s own recursion.
    fn parse_pow(&mut self) -> Expression {
        let base = self.parse_primary_with_suffixes();
        if self.check(&TokenKind::Caret) {
            self.advance();
            let exponent = self.parse_unary();
            let span = base.span().merge(exponent.span());
            return Expression::Binary {
                operator: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
                span,
            };
        }
        base
    }

    /// A prefix-expression: an identifier or parenthesized expression
    /// followed by zero or more `.name`, `[expr]`, `:name(args)`, or `(args)`
    /// suffixes. Used both as a general primary expression and, restricted
    /// to assignable targets by the caller, as an assignment/declaration LHS.
    fn parse_prefix_expression(&mut self) -> Expression {
        let mut expr = self.parse_prefix_atom();
        loop {
            expr = match &self.peek(0).kind {
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_identifier();
                    let span = expr.span().merge(field.span);
                    Expression::Member {
                        base: Box::new(expr),
                        name: field.name,
                        computed_key: None,
                        computed: false,
                        span,
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expression();
                    let end_tok = self.expect(&TokenKind::RBracket, "']'");
                    let span = expr.span().merge(end_tok.span);
                    Expression::Member {
                        base: Box::new(expr),
                        name: String::new(),
                        computed_key: Some(Box::new(key)),
                        computed: true,
                        span,
                    }
                }
                TokenKind::Colon => {
                    self.advance();
                    let method = self.expect_identifier();
                    let receiver = expr.clone();
                    let member_span = expr.span().merge(method.span);
                    let member = Expression::Member {
                        base: Box::new(expr),
                        name: method.name,
                        computed_key: None,
                        computed: false,
                        span: member_span,
                    };
                    let (mut arguments, args_span) = self.parse_call_arguments();
                    arguments.insert(0, receiver);
                    Expression::Call {
                        callee: Box::new(member),
                        arguments,
                        is_method: true,
                        span: member_span.merge(args_span),
                    }
                }
                TokenKind::LParen => {
                    let callee_span = expr.span();
                    let (arguments, args_span) = self.parse_call_arguments();
                    Expression::Call {
                        callee: Box::new(expr),
                        arguments,
                        is_method: false,
                        span: callee_span.merge(args_span),
                    }
                }
                _ => break,
            };
        }
        expr
    }

    fn parse_prefix_atom(&mut self) -> Expression {
        match &self.peek(0).kind {
            TokenKind::Identifier(_) => Expression::Identifier(self.expect_identifier()),
            TokenKind::LParen => {
                let start = self.advance().span;
                let inner = self.parse_expression();
                let end_tok = self.expect(&TokenKind::RParen, "')'");
                let span = start.merge(end_tok.span);
                // Only a call or vararg can produce more than one value, so
                // only those need a dedicated node to force truncation to
                // one. Every other expression is already single-valued, and
                // wrapping it would make the printer re-emit parens it
                // doesn't structurally need.
                if matches!(inner, Expression::Call { .. } | Expression::Vararg(_)) {
                    Expression::Paren {
                        inner: Box::new(inner),
                        span,
                    }
                } else {
                    inner
                }
            }
            _ => {
                self.error_here("expected an expression");
                let span = self.peek(0).span;
                Expression::Literal(Literal {
                    value: LiteralValue::Nil,
                    raw: "nil".to_string(),
                    span,
                })
            }
        }
    }

    fn parse_call_arguments(&mut self) -> (Vec<Expression>, Span) {
        let start = self.expect(&TokenKind::LParen, "'('").span;
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RParen) {
            arguments.push(self.parse_expression());
            while self.match_tok(&TokenKind::Comma) {
                arguments.push(self.parse_expression());
            }
        }
        let end_tok = self.expect(&TokenKind::RParen, "')'");
        (arguments, start.merge(end_tok.span))
    }

    /// Parses a primary expression (literal, identifier chain, parenthesized
    /// expression, function expression, table constructor, or vararg) with
    /// trailing suffixes applied when the atom is a prefix-expression.
    fn parse_primary_with_suffixes(&mut self) -> Expression {
        match &self.peek(0).kind {
            TokenKind::Number(_) => self.parse_number_literal(),
            TokenKind::Str(_) => self.parse_string_literal(),
            TokenKind::Boolean(_) => self.parse_bool_literal(),
            TokenKind::Nil => self.parse_nil_literal(),
            TokenKind::Ellipsis => {
                let span = self.advance().span;
                Expression::Vararg(span)
            }
            TokenKind::Function => self.parse_function_expression(),
            TokenKind::LBrace => self.parse_table_constructor(),
            TokenKind::Identifier(_) | TokenKind::LParen => self.parse_prefix_expression(),
            _ => {
                self.error_here("expected an expression");
                let span = self.peek(0).span;
                self.advance();
                Expression::Literal(Literal {
                    value: LiteralValue::Nil,
                    raw: "nil".to_string(),
                    span,
                })
            }
        }
    }

    fn parse_number_literal(&mut self) -> Expression {
        let tok = self.advance();
        let TokenKind::Number(raw) = tok.kind else {
            unreachable!()
        };
        let value = parse_number_literal_value(&raw);
        Expression::Literal(Literal {
            value,
            raw,
            span: tok.span,
        })
    }

    fn parse_string_literal(&mut self) -> Expression {
        let tok = self.advance();
        let TokenKind::Str(decoded) = tok.kind else {
            unreachable!()
        };
        Expression::Literal(Literal {
            raw: decoded.clone(),
            value: LiteralValue::Str(decoded),
            span: tok.span,
        })
    }

    fn parse_bool_literal(&mut self) -> Expression {
        let tok = self.advance();
        let TokenKind::Boolean(b) = tok.kind else {
            unreachable!()
        };
        Expression::Literal(Literal {
            raw: if b { "true" } else { "false" }.to_string(),
            value: LiteralValue::Bool(b),
            span: tok.span,
        })
    }

    fn parse_nil_literal(&mut self) -> Expression {
        let tok = self.advance();
        Expression::Literal(Literal {
            raw: "nil".to_string(),
            value: LiteralValue::Nil,
            span: tok.span,
        })
    }

    fn parse_function_expression(&mut self) -> Expression {
        let start = self.advance().span; // `function`
        let (params, is_vararg, body, end) = self.parse_function_body();
        Expression::Function {
            params,
            is_vararg,
            body,
            span: start.merge(end),
        }
    }

    fn parse_table_constructor(&mut self) -> Expression {
        let start = self.advance().span; // `{`
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            fields.push(self.parse_table_field());
            if self.check(&TokenKind::Comma) || self.check(&TokenKind::Semicolon) {
                self.advance();
            } else {
                break;
            }
        }
        let end_tok = self.expect(&TokenKind::RBrace, "'}'");
        Expression::TableConstructor {
            fields,
            span: start.merge(end_tok.span),
        }
    }

    fn parse_table_field(&mut self) -> TableField {
        if self.check(&TokenKind::LBracket) {
            self.advance();
            let key = self.parse_expression();
            self.expect(&TokenKind::RBracket, "']'");
            self.expect(&TokenKind::Assign, "'='");
            let value = self.parse_expression();
            return TableField::Computed(key, value);
        }
        if let TokenKind::Identifier(_) = self.peek(0).kind {
            if matches!(self.peek(1).kind, TokenKind::Assign) {
                let name = self.expect_identifier();
                self.advance(); // `=`
                let value = self.parse_expression();
                return TableField::Named(name, value);
            }
        }
        TableField::Array(self.parse_expression())
    }

    /// Consumes this parser, returning its collected diagnostics. Used by
    /// callers that only need diagnostics after an early return.
    #[allow(dead_code)]
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

/// Converts a NUMBER token's raw lexeme into a typed literal value. Presence
/// of `.`, a decimal exponent (`e`/`E`), or a hex-float exponent (`p`/`P`)
/// selects a float; otherwise the lexeme is parsed as an integer (decimal or
/// `0x`-prefixed hex). Malformed lexemes fall back to `0` rather than
/// panicking — the scanner already validated the grammar shape.
pub fn parse_number_literal_value(raw: &str) -> LiteralValue {
    let is_hex = raw.starts_with("0x") || raw.starts_with("0X");
    if is_hex {
        let body = &raw[2..];
        let is_float = body.contains('.') || body.contains('p') || body.contains('P');
        if is_float {
            return LiteralValue::Float(parse_hex_float(body));
        }
        return match i64::from_str_radix(body, 16) {
            Ok(v) => LiteralValue::Integer(v),
            Err(_) => {
                // Overflowing hex integer literals wrap the way Lua's
                // integer parser does; fall back to a float approximation.
                LiteralValue::Float(u64::from_str_radix(body, 16).unwrap_or(0) as f64)
            }
        };
    }
    let is_float = raw.contains('.') || raw.contains('e') || raw.contains('E');
    if is_float {
        return LiteralValue::Float(raw.parse::<f64>().unwrap_or(0.0));
    }
    match raw.parse::<i64>() {
        Ok(v) => LiteralValue::Integer(v),
        Err(_) => LiteralValue::Float(raw.parse::<f64>().unwrap_or(0.0)),
    }
}

fn parse_hex_float(body: &str) -> f64 {
    let (mantissa, exponent) = match body.split_once(['p', 'P']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (body, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let mut value = i64::from_str_radix(int_part, 16).unwrap_or(0) as f64;
    for (i, ch) in frac_part.chars().enumerate() {
        if let Some(d) = ch.to_digit(16) {
            value += d as f64 / 16f64.powi(i as i32 + 1);
        }
    }
    value * 2f64.powi(exponent)
}

/// Parses `source` into a `Program`, returning it alongside any diagnostics
/// recorded by the lexer and parser stages. This is the `parse` entry point
/// from §6 of the design; callers check `diagnostics.has_errors()` to decide
/// success.
pub fn parse(
    source: &str,
    lexer_options: crate::lexer::LexerOptions,
    parser_options: ParserOptions,
) -> (Program, Diagnostics) {
    let (tokens, mut diagnostics) = crate::lexer::Lexer::new(source, lexer_options).tokenize();
    let parser = Parser::new(tokens, parser_options);
    let (program, parser_diagnostics) = parser.parse_program();
    for entry in parser_diagnostics.into_vec() {
        diagnostics.record(entry);
    }
    (program, diagnostics)
}
