//! Recursive-descent parser for Orbit source.
//!
//! The surface it accepts:
//!
//! ```text
//! api Geometry {
//!     type Point(x Int, y Int)
//!
//!     (Point) scaled (factor Int) (Point) {
//!         defer { log.flush() }
//!         return Point.make(x * factor, y * factor)
//!     }
//! }
//! ```
//!
//! APIs hold type definitions and methods in source order; method
//! bodies are blocks of expression statements with an optional
//! trailing `return`. Expressions are `+ - * /` arithmetic with
//! instance calls (`value.method(...)`) and static calls
//! (`Type.method(...)`).

use log::trace;

use crate::ast::{
    Api, ApiMember, BinaryExpr, Block, DeferStatement, Expression, Identifier, InstanceCall,
    IntLiteral, Method, Operator, Pair, Program, RealLiteral, ReturnStatement, Signature,
    StaticCall, TypeDef, TypeIdentifier, UnaryExpr,
};
use crate::error::OrbitError;
use crate::lexer::{Token, TokenKind};
use crate::phase::Phase;

/// Turns a token sequence into a [`Program`].
#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Parser
    }
}

impl Phase for Parser {
    type Input = Vec<Token>;
    type Output = Program;

    fn execute(&self, input: Vec<Token>) -> Result<Program, OrbitError> {
        trace!("parsing {} tokens", input.len());
        let mut cursor = Cursor {
            tokens: &input,
            index: 0,
        };
        cursor.parse_program()
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl<'t> Cursor<'t> {
    fn parse_program(&mut self) -> Result<Program, OrbitError> {
        let mut apis = Vec::new();
        while !self.at(TokenKind::Eof) {
            apis.push(self.parse_api()?);
        }
        Ok(Program { apis })
    }

    fn parse_api(&mut self) -> Result<Api, OrbitError> {
        self.expect(TokenKind::Api, "expected 'api'")?;
        let name = self.expect(TokenKind::TypeIdentifier, "expected API name")?;
        self.expect(TokenKind::LBrace, "expected '{' after API name")?;

        let mut body = Vec::new();
        while !self.at(TokenKind::RBrace) {
            match self.peek().kind {
                TokenKind::Type => body.push(ApiMember::Type(self.parse_type_def()?)),
                TokenKind::LParen => body.push(ApiMember::Method(self.parse_method()?)),
                _ => {
                    return Err(self.error("expected a type definition or a method"));
                }
            }
        }
        self.expect(TokenKind::RBrace, "expected '}' to close API body")?;

        Ok(Api {
            name: name.text.clone(),
            body,
        })
    }

    fn parse_type_def(&mut self) -> Result<TypeDef, OrbitError> {
        self.expect(TokenKind::Type, "expected 'type'")?;
        let name = self.expect(TokenKind::TypeIdentifier, "expected type name")?;
        self.expect(TokenKind::LParen, "expected '(' after type name")?;
        let properties = self.parse_pair_list()?;
        self.expect(TokenKind::RParen, "expected ')' to close property list")?;

        Ok(TypeDef {
            name: name.text.clone(),
            properties,
        })
    }

    fn parse_method(&mut self) -> Result<Method, OrbitError> {
        self.expect(TokenKind::LParen, "expected '(' before receiver type")?;
        let receiver = self.expect(TokenKind::TypeIdentifier, "expected receiver type")?;
        let receiver_type = TypeIdentifier {
            name: receiver.text.clone(),
        };
        self.expect(TokenKind::RParen, "expected ')' after receiver type")?;

        let name = self.expect(TokenKind::Identifier, "expected method name")?;
        let name = Identifier {
            name: name.text.clone(),
        };

        self.expect(TokenKind::LParen, "expected '(' before parameter list")?;
        let parameters = self.parse_pair_list()?;
        self.expect(TokenKind::RParen, "expected ')' to close parameter list")?;

        // An optional parenthesised return type precedes the body.
        let return_type = if self.at(TokenKind::LParen) {
            self.advance();
            let ty = self.expect(TokenKind::TypeIdentifier, "expected return type")?;
            let ty = TypeIdentifier {
                name: ty.text.clone(),
            };
            self.expect(TokenKind::RParen, "expected ')' after return type")?;
            Some(ty)
        } else {
            None
        };

        let body = self.parse_block()?;

        Ok(Method {
            signature: Signature {
                receiver_type,
                name,
                parameters,
                return_type,
            },
            body,
        })
    }

    fn parse_pair_list(&mut self) -> Result<Vec<Pair>, OrbitError> {
        let mut pairs = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(pairs);
        }
        loop {
            let name = self.expect(TokenKind::Identifier, "expected a name")?;
            let ty = self.expect(TokenKind::TypeIdentifier, "expected a type after name")?;
            pairs.push(Pair {
                name: Identifier {
                    name: name.text.clone(),
                },
                ty: TypeIdentifier {
                    name: ty.text.clone(),
                },
            });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(pairs)
    }

    fn parse_block(&mut self) -> Result<Block, OrbitError> {
        self.expect(TokenKind::LBrace, "expected '{'")?;

        let mut body = Vec::new();
        let mut return_statement = None;
        while !self.at(TokenKind::RBrace) {
            match self.peek().kind {
                TokenKind::Return => {
                    self.advance();
                    let value = self.parse_expression()?;
                    return_statement = Some(ReturnStatement {
                        value: Box::new(value),
                    });
                    // A return closes the block.
                    if !self.at(TokenKind::RBrace) {
                        return Err(self.error("statements after 'return' are unreachable"));
                    }
                }
                TokenKind::Defer => {
                    self.advance();
                    let block = self.parse_block()?;
                    body.push(Expression::Defer(DeferStatement { block }));
                }
                _ => body.push(self.parse_expression()?),
            }
        }
        self.expect(TokenKind::RBrace, "expected '}' to close block")?;

        Ok(Block {
            body,
            return_statement,
        })
    }

    fn parse_expression(&mut self) -> Result<Expression, OrbitError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expression, OrbitError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.peek_operator(&["+", "-"]) {
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, OrbitError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek_operator(&["*", "/"]) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, OrbitError> {
        if let Some(op) = self.peek_operator(&["+", "-"]) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary(UnaryExpr {
                op,
                operand: Box::new(operand),
            }));
        }
        self.parse_postfix()
    }

    /// Primary expression followed by any number of instance calls.
    fn parse_postfix(&mut self) -> Result<Expression, OrbitError> {
        let mut expr = self.parse_primary()?;
        while self.at(TokenKind::Dot) {
            self.advance();
            let method = self.expect(TokenKind::Identifier, "expected method name after '.'")?;
            let method = Identifier {
                name: method.text.clone(),
            };
            self.expect(TokenKind::LParen, "expected '(' after method name")?;
            let arguments = self.parse_argument_list()?;
            self.expect(TokenKind::RParen, "expected ')' to close argument list")?;
            expr = Expression::InstanceCall(InstanceCall {
                receiver: Box::new(expr),
                method,
                arguments,
            });
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression, OrbitError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = token.text.parse::<i64>().map_err(|_| {
                    OrbitError::Compilation(format!(
                        "parse error at {}: integer literal '{}' out of range",
                        token.position, token.text
                    ))
                })?;
                Ok(Expression::IntLiteral(IntLiteral { value }))
            }
            TokenKind::RealLiteral => {
                self.advance();
                let value = token.text.parse::<f64>().map_err(|_| {
                    OrbitError::Compilation(format!(
                        "parse error at {}: malformed real literal '{}'",
                        token.position, token.text
                    ))
                })?;
                Ok(Expression::RealLiteral(RealLiteral { value }))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expression::Identifier(Identifier { name: token.text }))
            }
            TokenKind::TypeIdentifier => {
                self.advance();
                let receiver = TypeIdentifier { name: token.text };
                // `Type.method(...)` is a static call; a bare type
                // name stands for the type itself.
                if self.at(TokenKind::Dot) {
                    self.advance();
                    let method =
                        self.expect(TokenKind::Identifier, "expected method name after '.'")?;
                    let method = Identifier {
                        name: method.text.clone(),
                    };
                    self.expect(TokenKind::LParen, "expected '(' after method name")?;
                    let arguments = self.parse_argument_list()?;
                    self.expect(TokenKind::RParen, "expected ')' to close argument list")?;
                    Ok(Expression::StaticCall(StaticCall {
                        receiver,
                        method,
                        arguments,
                    }))
                } else {
                    Ok(Expression::TypeIdentifier(receiver))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error("expected an expression")),
        }
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expression>, OrbitError> {
        let mut arguments = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(arguments)
    }

    fn peek_operator(&self, symbols: &[&str]) -> Option<Operator> {
        let token = self.peek();
        if token.kind == TokenKind::Operator && symbols.contains(&token.text.as_str()) {
            Some(Operator::new(token.text.clone(), token.position))
        } else {
            None
        }
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<&'t Token, OrbitError> {
        let token = &self.tokens[self.index.min(self.tokens.len() - 1)];
        if token.kind == kind {
            self.advance();
            Ok(token)
        } else {
            Err(OrbitError::Compilation(format!(
                "parse error at {}: {what}, got '{}'",
                token.position,
                if token.kind == TokenKind::Eof {
                    "end of input"
                } else {
                    token.text.as_str()
                }
            )))
        }
    }

    fn error(&self, message: &str) -> OrbitError {
        let token = self.peek();
        OrbitError::Compilation(format!(
            "parse error at {}: {message}",
            token.position
        ))
    }
}
