pub mod ast;

use crate::error::ErrorState;
use crate::lexer::{Token, TokenKind};
use crate::typechecker::scope::ScopeId;
use crate::typechecker::types::TypeId;
use crate::vm::value::Value;

use self::ast::*;

/// Binding strength of expression operators, weakest first. The parser
/// keeps consuming infix operators while they bind tighter than the
/// precedence it was entered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    AddSub,
    MulDiv,
    UnaryPrefixes,
    CallsAndSelectors,
    Primary,
}

/// Precedence-climbing parser over the lexed token stream. Parse errors
/// enter panic mode, which swallows further diagnostics until the parser
/// resynchronizes at the next `;`; sentinel nodes keep the tree complete
/// so later passes can still run.
pub struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    errors: &'a mut ErrorState,
    current: usize,
    panic_mode: bool,
    /// `{` only starts a composite literal where the grammar is not
    /// expecting a statement block (disabled inside if/while headers).
    allow_composite_literal: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str, errors: &'a mut ErrorState) -> Self {
        Parser {
            tokens,
            source,
            errors,
            current: 0,
            panic_mode: false,
            allow_composite_literal: true,
        }
    }

    pub fn parse(mut self) -> Vec<Statement> {
        let mut statements = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.parse_declaration() {
                statements.push(stmt);
            }
        }
        statements
    }

    // ------------------------------------------------------------------
    // Token plumbing

    fn peek(&self) -> Token {
        self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Token {
        self.tokens[(self.current + 1).min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::EndOfFile
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Token {
        if self.check(kind) {
            return self.advance();
        }
        self.push_error(message);
        self.peek()
    }

    fn push_error(&mut self, message: impl Into<String>) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(self.peek().span(), message.into());
    }

    /// Skip forward until just past the next `;` so parsing can continue
    /// with the following statement.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.peek().kind != TokenKind::EndOfFile {
            if self.peek().kind == TokenKind::Semicolon {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn infix_precedence(&self, kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Equal => Precedence::Assignment,
            TokenKind::Or => Precedence::Or,
            TokenKind::And => Precedence::And,
            TokenKind::EqualEqual | TokenKind::BangEqual => Precedence::Equality,
            TokenKind::Greater
            | TokenKind::Less
            | TokenKind::GreaterEqual
            | TokenKind::LessEqual => Precedence::Comparison,
            TokenKind::Plus | TokenKind::Minus => Precedence::AddSub,
            TokenKind::Star | TokenKind::Slash => Precedence::MulDiv,
            TokenKind::Caret => Precedence::UnaryPrefixes,
            TokenKind::LeftParen | TokenKind::Dot | TokenKind::LeftBracket => {
                Precedence::CallsAndSelectors
            }
            TokenKind::LeftBrace if self.allow_composite_literal => Precedence::Primary,
            _ => Precedence::None,
        }
    }

    fn binary_operator(kind: TokenKind) -> BinaryOperator {
        match kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            TokenKind::Star => BinaryOperator::Multiply,
            TokenKind::Slash => BinaryOperator::Divide,
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::EqualEqual => BinaryOperator::Equal,
            TokenKind::BangEqual => BinaryOperator::NotEqual,
            TokenKind::And => BinaryOperator::And,
            TokenKind::Or => BinaryOperator::Or,
            _ => unreachable!("token {kind:?} is not a binary operator"),
        }
    }

    fn operator_precedence(op: BinaryOperator) -> Precedence {
        match op {
            BinaryOperator::Add | BinaryOperator::Subtract => Precedence::AddSub,
            BinaryOperator::Multiply | BinaryOperator::Divide => Precedence::MulDiv,
            BinaryOperator::Less
            | BinaryOperator::Greater
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterEqual => Precedence::Comparison,
            BinaryOperator::Equal | BinaryOperator::NotEqual => Precedence::Equality,
            BinaryOperator::And => Precedence::And,
            BinaryOperator::Or => Precedence::Or,
        }
    }

    // ------------------------------------------------------------------
    // Statements

    fn parse_declaration(&mut self) -> Option<Statement> {
        let stmt = if self.check(TokenKind::Identifier)
            && self.peek_next().kind == TokenKind::Colon
        {
            let ident = self.advance();
            self.advance(); // ':'
            Some(self.parse_declaration_tail(ident))
        } else {
            self.parse_statement()
        };

        if self.panic_mode {
            self.synchronize();
        }
        stmt
    }

    fn parse_declaration_tail(&mut self, ident: Token) -> Statement {
        let mut decl = Declaration {
            name: ident.text(self.source).to_string(),
            type_annotation: None,
            initializer: None,
            is_constant: false,
            ty: TypeId::INVALID,
            span: ident.span(),
        };

        if !self.check(TokenKind::Equal) && !self.check(TokenKind::Colon) {
            let annotation = self.parse_type();
            if annotation.is_bad() {
                self.push_error(
                    "Expected a type here, potentially missing an equal sign before an initializer?",
                );
            }
            decl.type_annotation = Some(annotation);
        }

        if self.matches(TokenKind::Colon) {
            decl.is_constant = true;
            let init = self.parse_expression(Precedence::None);
            if init.is_bad() {
                self.push_error("Need an expression to initialize this constant declaration");
            }
            decl.initializer = Some(init);
        } else if self.matches(TokenKind::Equal) {
            decl.is_constant = false;
            let init = self.parse_expression(Precedence::None);
            if init.is_bad() {
                self.push_error(
                    "Need an expression to initialize this declaration. If you want it uninitialized, leave out the '=' sign",
                );
            }
            decl.initializer = Some(init);
        }

        if !self.panic_mode {
            self.consume(
                TokenKind::Semicolon,
                "Expected \";\" to end a previous declaration",
            );
        }

        Statement::Declaration(decl.shared())
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        if self.matches(TokenKind::If) {
            return Some(self.parse_if());
        }
        if self.matches(TokenKind::While) {
            return Some(self.parse_while());
        }
        if self.matches(TokenKind::LeftBrace) {
            return Some(Statement::Block(self.parse_block()));
        }
        if self.matches(TokenKind::Return) {
            return Some(self.parse_return());
        }

        // `print` is a built-in statement recognized by its spelling.
        if self.check(TokenKind::Identifier) && self.peek().text(self.source) == "print" {
            self.advance();
            return Some(self.parse_print());
        }

        match self.peek().kind {
            TokenKind::Identifier
            | TokenKind::LiteralString
            | TokenKind::LiteralInteger
            | TokenKind::LiteralBool
            | TokenKind::LiteralFloat
            | TokenKind::LeftParen
            | TokenKind::Bang
            | TokenKind::Minus => Some(self.parse_expression_stmt()),
            TokenKind::Semicolon => {
                let token = self.advance();
                Some(Statement::Bad { span: token.span() })
            }
            _ => {
                self.push_error("Unable to parse statement");
                None
            }
        }
    }

    fn parse_condition(&mut self) -> Expression {
        // A `{` after the condition starts the body, never a composite
        // literal.
        let saved = self.allow_composite_literal;
        self.allow_composite_literal = false;
        let condition = self.parse_expression(Precedence::None);
        self.allow_composite_literal = saved;
        condition
    }

    fn parse_if(&mut self) -> Statement {
        let span = self.previous().span();
        let condition = self.parse_condition();
        let then_branch = self
            .parse_statement()
            .unwrap_or(Statement::Bad { span: self.peek().span() });
        let else_branch = if self.matches(TokenKind::Else) {
            Some(
                self.parse_statement()
                    .unwrap_or(Statement::Bad { span: self.peek().span() }),
            )
        } else {
            None
        };
        Statement::If(Box::new(If {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn parse_while(&mut self) -> Statement {
        let span = self.previous().span();
        let condition = self.parse_condition();
        let body = self
            .parse_statement()
            .unwrap_or(Statement::Bad { span: self.peek().span() });
        Statement::While(Box::new(While {
            condition,
            body,
            span,
        }))
    }

    fn parse_block(&mut self) -> Block {
        let span = self.previous().span();
        let mut statements = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.parse_declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' to end this block");
        Block {
            statements,
            scope: ScopeId::UNSET,
            span,
            end_span: self.previous().span(),
        }
    }

    fn parse_return(&mut self) -> Statement {
        let span = self.previous().span();
        let expr = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(Precedence::None))
        };
        self.consume(
            TokenKind::Semicolon,
            "Expected \";\" at the end of this statement",
        );
        Statement::Return { expr, span }
    }

    fn parse_print(&mut self) -> Statement {
        let span = self.previous().span();
        self.consume(
            TokenKind::LeftParen,
            "Expected \"(\" following print, before the expression starts",
        );
        let expr = self.parse_expression(Precedence::None);
        self.consume(TokenKind::RightParen, "Expected \")\" to close print expression");
        self.consume(
            TokenKind::Semicolon,
            "Expected \";\" at the end of this statement",
        );
        Statement::Print { expr, span }
    }

    fn parse_expression_stmt(&mut self) -> Statement {
        let expr = self.parse_expression(Precedence::None);
        self.consume(
            TokenKind::Semicolon,
            "Expected \";\" at the end of this statement",
        );
        Statement::Expression {
            span: expr.span,
            expr,
        }
    }

    // ------------------------------------------------------------------
    // Expressions

    fn parse_expression(&mut self, prec: Precedence) -> Expression {
        let token = self.peek();
        let mut left = match token.kind {
            TokenKind::Func => self.parse_function(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::LiteralInteger => self.parse_integer_literal(),
            TokenKind::LiteralFloat => self.parse_float_literal(),
            TokenKind::LiteralBool => self.parse_bool_literal(),
            TokenKind::LeftParen => self.parse_grouping(),
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::As => self.parse_cast(),
            TokenKind::Minus | TokenKind::Bang | TokenKind::Address => self.parse_unary(),
            TokenKind::Caret => self.parse_pointer_type(),
            TokenKind::LeftBracket => self.parse_array_type(),
            // Leave the `;` for the statement parser.
            TokenKind::Semicolon => Expression::bad(token.span()),
            _ => {
                self.advance();
                Expression::bad(token.span())
            }
        };

        loop {
            let infix = self.peek();
            if prec >= self.infix_precedence(infix.kind) {
                break;
            }
            left = match infix.kind {
                TokenKind::Or
                | TokenKind::And
                | TokenKind::EqualEqual
                | TokenKind::BangEqual
                | TokenKind::Greater
                | TokenKind::Less
                | TokenKind::GreaterEqual
                | TokenKind::LessEqual
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash => self.parse_binary(left),
                TokenKind::LeftParen => self.parse_call(left),
                TokenKind::LeftBrace => self.parse_composite_literal(left),
                TokenKind::Dot => self.parse_field_selector(left),
                TokenKind::LeftBracket => self.parse_subscript(left),
                TokenKind::Equal => self.parse_assignment(left),
                TokenKind::Caret => {
                    let caret = self.advance();
                    Expression::new(ExprKind::Dereference(Box::new(left)), caret.span())
                }
                _ => {
                    self.advance();
                    Expression::bad(infix.span())
                }
            };
        }
        left
    }

    fn parse_integer_literal(&mut self) -> Expression {
        let token = self.advance();
        match token.text(self.source).parse::<i32>() {
            Ok(v) => {
                let mut expr = Expression::new(ExprKind::Literal, token.span());
                expr.ty = TypeId::I32;
                expr.is_constant = true;
                expr.constant = Value::from_i32(v);
                expr
            }
            Err(_) => {
                self.push_error(format!(
                    "Invalid integer literal '{}'",
                    token.text(self.source)
                ));
                Expression::bad(token.span())
            }
        }
    }

    fn parse_float_literal(&mut self) -> Expression {
        let token = self.advance();
        match token.text(self.source).parse::<f32>() {
            Ok(v) => {
                let mut expr = Expression::new(ExprKind::Literal, token.span());
                expr.ty = TypeId::F32;
                expr.is_constant = true;
                expr.constant = Value::from_f32(v);
                expr
            }
            Err(_) => {
                self.push_error(format!(
                    "Invalid float literal '{}'",
                    token.text(self.source)
                ));
                Expression::bad(token.span())
            }
        }
    }

    fn parse_bool_literal(&mut self) -> Expression {
        let token = self.advance();
        let mut expr = Expression::new(ExprKind::Literal, token.span());
        expr.ty = TypeId::BOOL;
        expr.is_constant = true;
        expr.constant = Value::from_bool(token.text(self.source) == "true");
        expr
    }

    fn parse_identifier(&mut self) -> Expression {
        let token = self.advance();
        Expression::new(
            ExprKind::Identifier(token.text(self.source).to_string()),
            token.span(),
        )
    }

    fn parse_grouping(&mut self) -> Expression {
        let start = self.advance();
        let saved = self.allow_composite_literal;
        self.allow_composite_literal = true;
        let inner = self.parse_expression(Precedence::None);
        self.allow_composite_literal = saved;
        self.consume(
            TokenKind::RightParen,
            "Expected a closing right parenthesis \")\", but found nothing in this expression",
        );
        Expression::new(ExprKind::Grouping(Box::new(inner)), start.span())
    }

    fn parse_unary(&mut self) -> Expression {
        let token = self.advance();
        let op = match token.kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang => UnaryOperator::Not,
            _ => UnaryOperator::AddressOf,
        };
        let operand = self.parse_expression(Precedence::UnaryPrefixes);
        Expression::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            token.span(),
        )
    }

    fn parse_cast(&mut self) -> Expression {
        let as_token = self.advance();
        self.consume(TokenKind::LeftParen, "Expected '(' before cast target type");
        let target = self.parse_type();
        self.consume(TokenKind::RightParen, "Expected ')' after cast target type");
        let operand = self.parse_expression(Precedence::UnaryPrefixes);
        Expression::new(
            ExprKind::Cast {
                target: Box::new(target),
                operand: Box::new(operand),
            },
            as_token.span(),
        )
    }

    fn parse_binary(&mut self, left: Expression) -> Expression {
        let token = self.advance();
        let op = Self::binary_operator(token.kind);
        let rhs = self.parse_expression(Self::operator_precedence(op));
        Expression::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(rhs),
            },
            token.span(),
        )
    }

    fn parse_assignment(&mut self, left: Expression) -> Expression {
        let token = self.advance();
        // Right associative: everything after `=` binds to this target.
        let value = self.parse_expression(Precedence::None);
        Expression::new(
            ExprKind::Assignment {
                target: Box::new(left),
                value: Box::new(value),
            },
            token.span(),
        )
    }

    fn parse_call(&mut self, callee: Expression) -> Expression {
        let open = self.advance();
        let saved = self.allow_composite_literal;
        self.allow_composite_literal = true;
        let mut args = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression(Precedence::None));
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.allow_composite_literal = saved;
        self.consume(
            TokenKind::RightParen,
            "Expected right parenthesis to end function call",
        );
        Expression::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            open.span(),
        )
    }

    fn parse_field_selector(&mut self, target: Expression) -> Expression {
        let dot = self.advance();
        if !self.check(TokenKind::Identifier) {
            self.push_error("Expected a field name after '.'");
            return Expression::bad(dot.span());
        }
        let field = self.advance();
        Expression::new(
            ExprKind::Selector {
                target: Box::new(target),
                select: Selector::Field(field.text(self.source).to_string()),
            },
            dot.span(),
        )
    }

    fn parse_subscript(&mut self, target: Expression) -> Expression {
        let bracket = self.advance();
        let saved = self.allow_composite_literal;
        self.allow_composite_literal = true;
        let index = self.parse_expression(Precedence::None);
        self.allow_composite_literal = saved;
        self.consume(TokenKind::RightBracket, "Expected ']' to end array subscript");
        Expression::new(
            ExprKind::Selector {
                target: Box::new(target),
                select: Selector::Index(Box::new(index)),
            },
            bracket.span(),
        )
    }

    fn parse_composite_literal(&mut self, target: Expression) -> Expression {
        let brace = self.advance();
        let saved = self.allow_composite_literal;
        self.allow_composite_literal = true;
        let mut members = vec![];
        if !self.check(TokenKind::RightBrace) {
            loop {
                // Designated members are written `.field = value`; after
                // the dot they parse as a plain assignment.
                self.matches(TokenKind::Dot);
                members.push(self.parse_expression(Precedence::None));
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.allow_composite_literal = saved;
        self.consume(
            TokenKind::RightBrace,
            "Expected '}' to end struct literal expression. Potentially you forgot a ',' between members?",
        );

        if matches!(target.kind, ExprKind::ArrayType { .. }) {
            Expression::new(
                ExprKind::ArrayLiteral {
                    element: Some(Box::new(target)),
                    elements: members,
                },
                brace.span(),
            )
        } else {
            Expression::new(
                ExprKind::StructLiteral {
                    target: Some(Box::new(target)),
                    members,
                    designated: false,
                },
                brace.span(),
            )
        }
    }

    fn parse_function(&mut self) -> Expression {
        let start = self.peek();
        let func_type = self.parse_function_type();
        if self.matches(TokenKind::LeftBrace) {
            let block = self.parse_block();
            Expression::new(
                ExprKind::Function(FunctionLiteral {
                    func_type: Box::new(func_type),
                    body: Box::new(Statement::Block(block)),
                    scope: ScopeId::UNSET,
                    declared_name: None,
                }),
                start.span(),
            )
        } else {
            func_type
        }
    }

    fn parse_function_type(&mut self) -> Expression {
        let func_token = self.advance();
        self.consume(
            TokenKind::LeftParen,
            "Expected left parenthesis to start function param list",
        );

        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                // The first item is either a bare type or the name of a
                // parameter declaration.
                let param = self.parse_type();
                let param_token = self.previous();
                if self.matches(TokenKind::Colon) {
                    if let ExprKind::Identifier(name) = &param.kind {
                        let annotation = self.parse_type();
                        let decl = Declaration {
                            name: name.clone(),
                            type_annotation: Some(annotation),
                            initializer: None,
                            is_constant: false,
                            ty: TypeId::INVALID,
                            span: param_token.span(),
                        };
                        params.push(Param::Named(decl.shared()));
                    } else {
                        self.push_error(
                            "Expected an identifier on the left side of this declaration",
                        );
                    }
                } else {
                    params.push(Param::Anonymous(param));
                }
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(
            TokenKind::RightParen,
            "Expected right parenthesis to close argument list",
        );

        let return_type = if self.matches(TokenKind::Arrow) {
            Some(Box::new(self.parse_type()))
        } else {
            None
        };

        Expression::new(
            ExprKind::FunctionType(FunctionType {
                params,
                return_type,
                scope: ScopeId::UNSET,
            }),
            func_token.span(),
        )
    }

    fn parse_struct(&mut self) -> Expression {
        let struct_token = self.advance();
        self.consume(
            TokenKind::LeftBrace,
            "Expected '{' after struct to start member declarations",
        );
        let mut members = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.parse_declaration() {
                members.push(stmt);
            }
        }
        self.consume(
            TokenKind::RightBrace,
            "Expected '}' to end member declarations of struct",
        );
        let end_span = self.previous().span();
        Expression::new(
            ExprKind::Structure(Structure {
                members,
                scope: ScopeId::UNSET,
                declared_name: None,
                end_span,
            }),
            struct_token.span(),
        )
    }

    fn parse_pointer_type(&mut self) -> Expression {
        let caret = self.advance();
        let base = self.parse_type();
        Expression::new(ExprKind::PointerType(Box::new(base)), caret.span())
    }

    fn parse_array_type(&mut self) -> Expression {
        let bracket = self.advance();
        let dimension = self.parse_expression(Precedence::None);
        self.consume(
            TokenKind::RightBracket,
            "Expected ']' following array dimension in array type declaration",
        );
        let element = self.parse_type();
        Expression::new(
            ExprKind::ArrayType {
                dimension: Box::new(dimension),
                element: Box::new(element),
            },
            bracket.span(),
        )
    }

    fn parse_type(&mut self) -> Expression {
        match self.peek().kind {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Func => self.parse_function_type(),
            TokenKind::Caret => self.parse_pointer_type(),
            TokenKind::LeftBracket => self.parse_array_type(),
            _ => Expression::bad(self.peek().span()),
        }
    }
}
