// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Recursive descent parser for module bodies.

use super::ast::*;
use super::scanner::Scanner;
use super::token::{Span, Token, TokenKind};
use crate::error::ScriptError;

type ParseResult<T> = Result<T, ScriptError>;

/// A recursive descent parser for the module body subset.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0), 1, false),
        }
    }

    /// Parses the source code into a Program.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let declaration = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::Variable(declaration))
            }
            TokenKind::Import if !self.next_is_expression_import() => self.parse_import(),
            TokenKind::Export => self.parse_export(),
            TokenKind::Throw => {
                self.advance();
                if self.current.newline_before {
                    return Err(self.error_at_current("Illegal newline after throw"));
                }
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::Throw(argument))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::Expression(expression))
            }
        }
    }

    /// `import.meta` and `import(...)` are expressions, not declarations
    fn next_is_expression_import(&self) -> bool {
        let mut lookahead = self.scanner.clone();
        matches!(
            lookahead.next_token().kind,
            TokenKind::Dot | TokenKind::LeftParen
        )
    }

    fn parse_variable_declaration(&mut self) -> ParseResult<VariableDeclaration> {
        let line = self.current.line;
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(self.error_at_current("Expected variable keyword")),
        };
        self.advance();

        let mut declarations = Vec::new();

        loop {
            let name = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };

            if kind == VariableKind::Const && init.is_none() {
                return Err(ScriptError::syntax(
                    self.previous.line,
                    "Missing initializer in const declaration",
                ));
            }

            declarations.push(VariableDeclarator { name, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration {
            kind,
            declarations,
            line,
        })
    }

    fn parse_import(&mut self) -> ParseResult<Statement> {
        let line = self.current.line;
        self.advance(); // consume 'import'

        let mut declaration = ImportDeclaration {
            source: String::new(),
            default: None,
            namespace: None,
            named: Vec::new(),
            line,
        };

        // import "module"
        if let TokenKind::String(source) = &self.current.kind {
            declaration.source = source.clone();
            self.advance();
            self.consume_semicolon()?;
            return Ok(Statement::Import(declaration));
        }

        if let TokenKind::Identifier(_) = &self.current.kind {
            declaration.default = Some(self.expect_identifier()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                return self.finish_import(declaration);
            }
        }

        match &self.current.kind {
            TokenKind::Star => {
                self.advance();
                self.expect_contextual("as")?;
                declaration.namespace = Some(self.expect_identifier()?);
            }
            TokenKind::LeftBrace => {
                self.advance();
                while !self.check(&TokenKind::RightBrace) {
                    let imported = self.expect_name()?;
                    let local = if self.check_contextual("as") {
                        self.advance();
                        self.expect_identifier()?
                    } else {
                        imported.clone()
                    };
                    declaration.named.push(ImportSpecifier { imported, local });
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expect(&TokenKind::RightBrace)?;
            }
            _ => return Err(self.unexpected()),
        }

        self.finish_import(declaration)
    }

    fn finish_import(&mut self, mut declaration: ImportDeclaration) -> ParseResult<Statement> {
        self.expect_contextual("from")?;
        declaration.source = self.expect_string()?;
        self.consume_semicolon()?;
        Ok(Statement::Import(declaration))
    }

    fn parse_export(&mut self) -> ParseResult<Statement> {
        let line = self.current.line;
        self.advance(); // consume 'export'

        let kind = match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                ExportKind::Variable(self.parse_variable_declaration()?)
            }
            TokenKind::Default => {
                self.advance();
                ExportKind::Default(self.parse_assignment()?)
            }
            TokenKind::Star => {
                self.advance();
                let alias = if self.check_contextual("as") {
                    self.advance();
                    Some(self.expect_name()?)
                } else {
                    None
                };
                self.expect_contextual("from")?;
                let source = self.expect_string()?;
                ExportKind::All { source, alias }
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut specifiers = Vec::new();
                while !self.check(&TokenKind::RightBrace) {
                    let local = self.expect_name()?;
                    let exported = if self.check_contextual("as") {
                        self.advance();
                        self.expect_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expect(&TokenKind::RightBrace)?;

                let source = if self.check_contextual("from") {
                    self.advance();
                    Some(self.expect_string()?)
                } else {
                    None
                };
                ExportKind::Named { specifiers, source }
            }
            _ => return Err(self.unexpected()),
        };

        self.consume_semicolon()?;
        Ok(Statement::Export(ExportDeclaration { kind, line }))
    }

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_equality()?;

        if self.check(&TokenKind::Equal) {
            let line = self.current.line;
            self.advance();
            if !matches!(
                target,
                Expression::Identifier(_) | Expression::Member { .. } | Expression::Computed { .. }
            ) {
                return Err(ScriptError::syntax(line, "Invalid left-hand side in assignment"));
            }
            let value = self.parse_assignment()?;
            return Ok(Expression::Assign {
                target: Box::new(target),
                value: Box::new(value),
            });
        }

        Ok(target)
    }

    fn parse_equality(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::BangEqual => BinaryOperator::NotEqual,
                TokenKind::EqualEqualEqual => BinaryOperator::StrictEqual,
                TokenKind::BangEqualEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let operator = match &self.current.kind {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Typeof => UnaryOperator::Typeof,
            _ => return self.parse_call_member(),
        };
        self.advance();
        let argument = self.parse_unary()?;
        Ok(Expression::Unary {
            operator,
            argument: Box::new(argument),
        })
    }

    fn parse_call_member(&mut self) -> ParseResult<Expression> {
        let mut expression = self.parse_primary()?;

        loop {
            match &self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_name()?;
                    expression = Expression::Member {
                        object: Box::new(expression),
                        property,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expression = Expression::Computed {
                        object: Box::new(expression),
                        property: Box::new(property),
                    };
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let mut arguments = Vec::new();
                    while !self.check(&TokenKind::RightParen) {
                        arguments.push(self.parse_assignment()?);
                        if !self.check(&TokenKind::Comma) {
                            break;
                        }
                        self.advance();
                    }
                    self.expect(&TokenKind::RightParen)?;
                    expression = Expression::Call {
                        callee: Box::new(expression),
                        arguments,
                    };
                }
                _ => break,
            }
        }

        Ok(expression)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let expression = match &self.current.kind {
            TokenKind::Number(n) => Expression::Number(*n),
            TokenKind::String(s) => Expression::String(s.clone()),
            TokenKind::True => Expression::Boolean(true),
            TokenKind::False => Expression::Boolean(false),
            TokenKind::Null => Expression::Null,
            TokenKind::Identifier(name) => Expression::Identifier(name.clone()),
            TokenKind::LeftParen => {
                self.advance();
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expression);
            }
            TokenKind::LeftBracket => return self.parse_array(),
            TokenKind::LeftBrace => return self.parse_object(),
            TokenKind::Import => {
                let line = self.current.line;
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    return Err(ScriptError::syntax(line, "Dynamic import() is not supported"));
                }
                self.expect(&TokenKind::Dot)?;
                self.expect_contextual("meta")?;
                return Ok(Expression::ImportMeta(line));
            }
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(expression)
    }

    fn parse_array(&mut self) -> ParseResult<Expression> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object(&mut self) -> ParseResult<Expression> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let shorthand = matches!(self.current.kind, TokenKind::Identifier(_));
            let key = match &self.current.kind {
                TokenKind::String(s) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                TokenKind::Number(n) => {
                    let key = crate::value::Value::Number(*n).to_string();
                    self.advance();
                    key
                }
                _ => self.expect_name()?,
            };

            let value = if self.check(&TokenKind::Colon) {
                self.advance();
                self.parse_assignment()?
            } else if shorthand {
                Expression::Identifier(key.clone())
            } else {
                return Err(self.unexpected());
            };
            properties.push((key, value));

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(properties))
    }

    // Helper methods

    fn advance(&mut self) {
        let next = self.scanner.next_token();
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn check_contextual(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(name) if name == word)
    }

    fn is_at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_contextual(&mut self, word: &str) -> ParseResult<()> {
        if self.check_contextual(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected())
        }
    }

    /// Identifier or keyword, as allowed after `.` and in export lists
    fn expect_name(&mut self) -> ParseResult<String> {
        if let Some(keyword) = self.current.kind.keyword() {
            self.advance();
            return Ok(keyword.to_string());
        }
        self.expect_identifier()
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        if let TokenKind::String(s) = &self.current.kind {
            let s = s.clone();
            self.advance();
            Ok(s)
        } else {
            Err(self.unexpected())
        }
    }

    /// Accept `;`, or an inserted one before `}`, a newline or end of input
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.is_at_end() || self.check(&TokenKind::RightBrace) || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn unexpected(&self) -> ScriptError {
        match &self.current.kind {
            TokenKind::Eof => self.error_at_current("Unexpected end of input"),
            TokenKind::Invalid(text) => {
                self.error_at_current(format!("Invalid or unexpected token '{}'", text))
            }
            other => self.error_at_current(format!("Unexpected token '{}'", other.describe())),
        }
    }

    fn error_at_current(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::syntax(self.current.line, message)
    }
}
