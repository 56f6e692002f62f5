//! Recursive-descent parser for the class-definition grammar.
//!
//! Message precedence is unary, then binary, then keyword. A parse error
//! aborts only the compilation unit it occurred in and carries the
//! position plus an expected/found pair for the driver to print.

use crate::ast::{Body, ClassDef, Expression, MethodBodyDef, MethodDef, Statement};
use crate::lexer::{Lexer, Token, TokenKind};
use core_types::{ParseError, SourcePosition};

/// Parser over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Tokenize `source` and position at its start.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_next(&self) -> &TokenKind {
        let i = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn position(&self) -> SourcePosition {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: &str, expected: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.position(),
            expected: expected.to_string(),
            found: self.peek().describe(),
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("unexpected token", what)),
        }
    }

    fn expect_operator(&mut self, op: &str) -> Result<(), ParseError> {
        match self.peek() {
            TokenKind::Operator(text) if text == op => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error("unexpected token", &format!("'{}'", op))),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if *self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error("unexpected token", what))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse a complete class definition.
    pub fn parse_class(&mut self) -> Result<ClassDef, ParseError> {
        let position = self.position();
        let name = self.expect_identifier("class name")?;
        self.expect_operator("=")?;

        let superclass = match self.peek() {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        };
        self.expect(TokenKind::LParen, "'(' opening the class body")?;

        let instance_fields = self.parse_var_list()?;
        let mut instance_methods = Vec::new();
        while !matches!(self.peek(), TokenKind::RParen | TokenKind::Separator) {
            instance_methods.push(self.parse_method()?);
        }

        let mut class_fields = Vec::new();
        let mut class_methods = Vec::new();
        if self.eat(&TokenKind::Separator) {
            class_fields = self.parse_var_list()?;
            while !matches!(self.peek(), TokenKind::RParen) {
                class_methods.push(self.parse_method()?);
            }
        }
        self.expect(TokenKind::RParen, "')' closing the class body")?;
        self.expect(TokenKind::Eof, "end of input after class body")?;

        Ok(ClassDef {
            name,
            superclass,
            instance_fields,
            instance_methods,
            class_fields,
            class_methods,
            position,
        })
    }

    fn parse_var_list(&mut self) -> Result<Vec<String>, ParseError> {
        if !matches!(self.peek(), TokenKind::Operator(op) if op == "|") {
            return Ok(Vec::new());
        }
        self.advance();
        let mut names = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Identifier(name) => {
                    names.push(name.clone());
                    self.advance();
                }
                TokenKind::Operator(op) if op == "|" => {
                    self.advance();
                    return Ok(names);
                }
                _ => return Err(self.error("malformed variable list", "identifier or '|'")),
            }
        }
    }

    fn parse_method(&mut self) -> Result<MethodDef, ParseError> {
        let position = self.position();
        let (selector, parameters) = self.parse_pattern()?;
        self.expect_operator("=")?;

        let body = if matches!(self.peek(), TokenKind::Identifier(word) if word == "primitive") {
            self.advance();
            MethodBodyDef::Primitive
        } else {
            self.expect(TokenKind::LParen, "'(' opening the method body")?;
            let body = self.parse_body()?;
            self.expect(TokenKind::RParen, "')' closing the method body")?;
            MethodBodyDef::Body(body)
        };

        Ok(MethodDef {
            selector,
            parameters,
            body,
            position,
        })
    }

    fn parse_pattern(&mut self) -> Result<(String, Vec<String>), ParseError> {
        match self.peek().clone() {
            TokenKind::Identifier(selector) => {
                self.advance();
                Ok((selector, Vec::new()))
            }
            TokenKind::Operator(op) => {
                self.advance();
                let param = self.expect_identifier("binary method parameter")?;
                Ok((op, vec![param]))
            }
            TokenKind::Keyword(_) => {
                let mut selector = String::new();
                let mut parameters = Vec::new();
                while let TokenKind::Keyword(part) = self.peek().clone() {
                    self.advance();
                    selector.push_str(&part);
                    parameters.push(self.expect_identifier("keyword method parameter")?);
                }
                Ok((selector, parameters))
            }
            _ => Err(self.error("malformed method pattern", "selector")),
        }
    }

    fn parse_body(&mut self) -> Result<Body, ParseError> {
        let locals = self.parse_var_list()?;
        let mut statements = Vec::new();
        loop {
            match self.peek() {
                TokenKind::RParen | TokenKind::RBracket | TokenKind::Eof => break,
                TokenKind::Caret => {
                    self.advance();
                    let value = self.parse_expression()?;
                    statements.push(Statement::Return(value));
                    self.eat(&TokenKind::Period);
                    // Anything after an unconditional return is
                    // unreachable; the grammar still requires the body to
                    // close here.
                    break;
                }
                _ => {
                    statements.push(Statement::Expression(self.parse_expression()?));
                    if !self.eat(&TokenKind::Period) {
                        break;
                    }
                }
            }
        }
        Ok(Body { locals, statements })
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        if let TokenKind::Identifier(name) = self.peek() {
            if *self.peek_next() == TokenKind::Assign {
                let variable = name.clone();
                self.advance();
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Expression::Assignment {
                    variable,
                    value: Box::new(value),
                });
            }
        }
        self.parse_keyword_chain()
    }

    fn parse_keyword_chain(&mut self) -> Result<Expression, ParseError> {
        let receiver = self.parse_binary_chain()?;
        if !matches!(self.peek(), TokenKind::Keyword(_)) {
            return Ok(receiver);
        }
        let mut selector = String::new();
        let mut arguments = Vec::new();
        while let TokenKind::Keyword(part) = self.peek().clone() {
            self.advance();
            selector.push_str(&part);
            arguments.push(self.parse_binary_chain()?);
        }
        Ok(Expression::Message {
            receiver: Box::new(receiver),
            selector,
            arguments,
        })
    }

    fn parse_binary_chain(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary_chain()?;
        while let TokenKind::Operator(op) = self.peek().clone() {
            self.advance();
            let right = self.parse_unary_chain()?;
            left = Expression::Message {
                receiver: Box::new(left),
                selector: op,
                arguments: vec![right],
            };
        }
        Ok(left)
    }

    fn parse_unary_chain(&mut self) -> Result<Expression, ParseError> {
        let mut receiver = self.parse_primary()?;
        while let TokenKind::Identifier(selector) = self.peek().clone() {
            self.advance();
            receiver = Expression::Message {
                receiver: Box::new(receiver),
                selector,
                arguments: Vec::new(),
            };
        }
        Ok(receiver)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Variable(name))
            }
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expression::Integer(n))
            }
            TokenKind::BigInteger(n) => {
                self.advance();
                Ok(Expression::BigInteger(n))
            }
            TokenKind::Double(d) => {
                self.advance();
                Ok(Expression::Double(d))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::Str(s))
            }
            TokenKind::Symbol(s) => {
                self.advance();
                Ok(Expression::Symbol(s))
            }
            TokenKind::ArrayStart => self.parse_literal_array(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')' closing the expression")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_block(),
            _ => Err(self.error("unexpected token in expression", "an expression")),
        }
    }

    fn parse_block(&mut self) -> Result<Expression, ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut parameters = Vec::new();
        while self.eat(&TokenKind::Colon) {
            parameters.push(self.expect_identifier("block parameter")?);
        }
        if !parameters.is_empty() {
            self.expect_operator("|")?;
        }
        let body = self.parse_body()?;
        self.expect(TokenKind::RBracket, "']' closing the block")?;
        Ok(Expression::Block { parameters, body })
    }

    fn parse_literal_array(&mut self) -> Result<Expression, ParseError> {
        self.expect(TokenKind::ArrayStart, "'#('")?;
        let mut elements = Vec::new();
        loop {
            match self.peek().clone() {
                TokenKind::RParen => {
                    self.advance();
                    return Ok(Expression::Array(elements));
                }
                TokenKind::Integer(n) => {
                    self.advance();
                    elements.push(Expression::Integer(n));
                }
                TokenKind::BigInteger(n) => {
                    self.advance();
                    elements.push(Expression::BigInteger(n));
                }
                TokenKind::Double(d) => {
                    self.advance();
                    elements.push(Expression::Double(d));
                }
                TokenKind::Str(s) => {
                    self.advance();
                    elements.push(Expression::Str(s));
                }
                TokenKind::Symbol(s) => {
                    self.advance();
                    elements.push(Expression::Symbol(s));
                }
                TokenKind::ArrayStart => elements.push(self.parse_literal_array()?),
                // Bare identifiers in a literal array are symbols, apart
                // from the constant names.
                TokenKind::Identifier(name) => {
                    self.advance();
                    elements.push(match name.as_str() {
                        "nil" | "true" | "false" => Expression::Variable(name),
                        _ => Expression::Symbol(name),
                    });
                }
                TokenKind::Keyword(_) => {
                    let mut selector = String::new();
                    while let TokenKind::Keyword(part) = self.peek().clone() {
                        self.advance();
                        selector.push_str(&part);
                    }
                    elements.push(Expression::Symbol(selector));
                }
                TokenKind::Operator(op) => {
                    self.advance();
                    elements.push(Expression::Symbol(op));
                }
                _ => return Err(self.error("malformed literal array", "a literal or ')'")),
            }
        }
    }
}
