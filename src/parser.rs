use thiserror::Error;
use tracing::trace;

use crate::ast::{BinaryOp, Block, Expr, Program, Stmt, UnaryOp};
use crate::lexer::{LexError, Lexer, Token};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("integer literal '{0}' out of range")]
    IntLiteral(String),
    #[error("assignment target must be an identifier")]
    AssignTarget,
    #[error("{0}")]
    Syntax(String),
    #[error("{message}: {source}")]
    Context {
        message: String,
        source: Box<ParseError>,
    },
}

impl ParseError {
    fn syntax(message: impl Into<String>) -> Self {
        ParseError::Syntax(message.into())
    }

    fn context(self, message: impl Into<String>) -> Self {
        ParseError::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest = 0,
    Assign = 1,
    Equality = 2,
    Comparison = 3,
    Sum = 4,
    Product = 5,
    Prefix = 6,
    Call = 7,
}

fn precedence_of(token: &Token) -> Precedence {
    match token {
        Token::Assign => Precedence::Assign,
        Token::Eq | Token::NotEq => Precedence::Equality,
        Token::Less | Token::Greater => Precedence::Comparison,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Asterisk | Token::Slash => Precedence::Product,
        Token::LParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

/// Pratt parser over a live lexer: one current token, one token of
/// look-ahead.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    curr: Token,
    peek: Token,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self, ParseError> {
        let curr = lexer.next_token()?;
        let peek = lexer.next_token()?;
        Ok(Self { lexer, curr, peek })
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        while !self.curr_is(&Token::Eof) {
            statements.push(self.parse_statement()?);
            self.consume_semicolon()?;
            self.advance()?;
        }

        trace!(statements = statements.len(), "parsed program");
        Ok(Program::new(statements))
    }

    // Statement parsers start on the statement's first token and finish
    // on its last; `parse_program`/`parse_block` step past it.

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.curr {
            Token::Let => self.parse_let_statement(),
            Token::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_ident()?;
        self.expect(Token::Assign)?;
        self.advance()?;

        let value = self
            .parse_expression(Precedence::Lowest)
            .map_err(|err| err.context(format!("in `let {name}`")))?;

        Ok(Stmt::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?;

        let value = self
            .parse_expression(Precedence::Lowest)
            .map_err(|err| err.context("in `return`"))?;

        Ok(Stmt::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix()?;

        // A token without an infix entry sits at `Lowest`, so the loop
        // stops at semicolons, closing delimiters, block braces and EOF
        // without listing them.
        while !self.peek_is(&Token::Semicolon) && precedence < precedence_of(&self.peek) {
            self.advance()?;
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        trace!(token = %self.curr, "prefix dispatch");
        match self.curr.clone() {
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::Int(literal) => {
                let value = literal
                    .parse::<i64>()
                    .map_err(|_| ParseError::IntLiteral(literal))?;
                Ok(Expr::Int(value))
            }
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Str(text) => Ok(Expr::Str(text)),
            Token::Minus => self.parse_unary_expr(UnaryOp::Neg),
            Token::Bang => self.parse_unary_expr(UnaryOp::Not),
            Token::LParen => self.parse_grouped_expr(),
            Token::If => self.parse_if_expr(),
            Token::Fn => self.parse_function_expr(),
            other => Err(ParseError::syntax(format!(
                "no prefix parse function for {other}"
            ))),
        }
    }

    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ParseError> {
        let op = match self.curr {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Asterisk => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Less => BinaryOp::Lt,
            Token::Greater => BinaryOp::Gt,
            Token::Eq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::LParen => return self.parse_call_expr(left),
            Token::Assign => return self.parse_assign_expr(left),
            ref other => {
                return Err(ParseError::syntax(format!(
                    "no infix parse function for {other}"
                )));
            }
        };

        let precedence = precedence_of(&self.curr);
        self.advance()?;
        let right = self
            .parse_expression(precedence)
            .map_err(|err| err.context(format!("after '{op}'")))?;

        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_unary_expr(&mut self, op: UnaryOp) -> Result<Expr, ParseError> {
        self.advance()?;
        let expr = self
            .parse_expression(Precedence::Prefix)
            .map_err(|err| err.context(format!("after unary '{op}'")))?;

        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_grouped_expr(&mut self) -> Result<Expr, ParseError> {
        self.advance()?;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect(Token::RParen)?;
        Ok(expr)
    }

    fn parse_if_expr(&mut self) -> Result<Expr, ParseError> {
        self.advance()?;
        let condition = self
            .parse_expression(Precedence::Lowest)
            .map_err(|err| err.context("in `if` condition"))?;

        self.expect(Token::LBrace)?;
        let consequence = self.parse_block()?;

        // No `else` keyword: a block directly after the consequence is
        // the alternative.
        let alternative = if self.peek_is(&Token::LBrace) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_expr(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::LParen)?;
        let params = self.parse_function_params()?;
        self.expect(Token::LBrace)?;
        let body = self.parse_block()?;

        Ok(Expr::Function { params, body })
    }

    fn parse_function_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();

        if self.peek_is(&Token::RParen) {
            self.advance()?;
            return Ok(params);
        }

        params.push(self.expect_ident()?);
        while self.peek_is(&Token::Comma) {
            self.advance()?;
            params.push(self.expect_ident()?);
        }

        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_call_expr(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();

        if self.peek_is(&Token::RParen) {
            self.advance()?;
        } else {
            self.advance()?;
            args.push(self.parse_expression(Precedence::Lowest)?);

            while self.peek_is(&Token::Comma) {
                self.advance()?;
                self.advance()?;
                args.push(self.parse_expression(Precedence::Lowest)?);
            }

            self.expect(Token::RParen)?;
        }

        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_assign_expr(&mut self, target: Expr) -> Result<Expr, ParseError> {
        let Expr::Ident(name) = target else {
            return Err(ParseError::AssignTarget);
        };

        self.advance()?;
        let value = self
            .parse_expression(Precedence::Lowest)
            .map_err(|err| err.context(format!("in assignment to '{name}'")))?;

        Ok(Expr::Assign {
            name,
            value: Box::new(value),
        })
    }

    // Entered with the current token on '{'; finishes on '}'.
    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let mut statements = Vec::new();
        self.advance()?;

        while !self.curr_is(&Token::RBrace) {
            if self.curr_is(&Token::Eof) {
                return Err(ParseError::syntax("expected '}' to close block, got end of input"));
            }
            statements.push(self.parse_statement()?);
            self.consume_semicolon()?;
            self.advance()?;
        }

        Ok(statements)
    }

    fn expect(&mut self, want: Token) -> Result<(), ParseError> {
        if self.peek == want {
            self.advance()?;
            Ok(())
        } else {
            Err(ParseError::syntax(format!(
                "expected {want}, got {}",
                self.peek
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name) = self.peek.clone() {
            self.advance()?;
            Ok(name)
        } else {
            Err(ParseError::syntax(format!(
                "expected identifier, got {}",
                self.peek
            )))
        }
    }

    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.peek_is(&Token::Semicolon) {
            self.advance()?;
        }
        Ok(())
    }

    fn curr_is(&self, token: &Token) -> bool {
        &self.curr == token
    }

    fn peek_is(&self, token: &Token) -> bool {
        &self.peek == token
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.curr = std::mem::replace(&mut self.peek, self.lexer.next_token()?);
        Ok(())
    }
}
