//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons, `+`, postfix
//! (`.name`, `[index]`, `(args)`).

use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Result, ShelveError};
use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Attr(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self> {
        Ok(Self {
            source,
            tokens: Lexer::tokenize(source)?,
            pos: 0,
        })
    }

    /// Parses the whole source as one expression.
    pub fn parse(source: &str) -> Result<Expr> {
        let mut parser = Parser::new(source)?;
        let expr = parser.parse_or()?;
        match &parser.current().kind {
            TokenKind::Eof => Ok(expr),
            other => Err(parser.error(format!("unexpected {:?}", other))),
        }
    }

    fn current(&self) -> &Token {
        // The token list always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.current().kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(name) if name == word)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current().kind == TokenKind::OrOr || self.at_word("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.current().kind == TokenKind::AndAnd || self.at_word("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current().kind == TokenKind::Bang || self.at_word("not") {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_concat()?;
        let op = match &self.current().kind {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::Ident(word) if word == "in" => CmpOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_concat()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        let mut left = self.parse_postfix()?;
        while self.current().kind == TokenKind::Plus {
            self.advance();
            let right = self.parse_postfix()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    match self.advance() {
                        TokenKind::Ident(name) => expr = Expr::Attr(Box::new(expr), name),
                        _ => return Err(self.error("expected attribute name after '.'")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_or()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.current().kind == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            match self.advance() {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok(args),
                _ => return Err(self.error("expected ',' or ')' in argument list")),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            TokenKind::Str(text) => Ok(Expr::Literal(Value::String(text))),
            TokenKind::Number(n) => Ok(Expr::Literal(number(n))),
            TokenKind::Ident(word) => Ok(match word.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "none" | "None" | "null" => Expr::Literal(Value::Null),
                _ => Expr::Name(word),
            }),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Eof => Err(self.error("unexpected end of expression")),
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ShelveError {
        ShelveError::expression(self.source, message)
    }
}

/// Integral values become JSON integers so they render without a fraction.
pub(crate) fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn test_precedence() {
        let expr = Parser::parse("a or b and not c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(
                name("a"),
                Box::new(Expr::And(name("b"), Box::new(Expr::Not(name("c")))))
            )
        );
    }

    #[test]
    fn test_method_call_and_index() {
        let expr = Parser::parse("groups[0].upper()").unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                Box::new(Expr::Attr(
                    Box::new(Expr::Index(name("groups"), Box::new(Expr::Literal(Value::from(0))))),
                    "upper".to_string()
                )),
                vec![]
            )
        );
    }

    #[test]
    fn test_comparison_with_in() {
        let expr = Parser::parse("'x' in basename + extension").unwrap();
        assert_eq!(
            expr,
            Expr::Compare(
                CmpOp::In,
                Box::new(Expr::Literal(Value::from("x"))),
                Box::new(Expr::Add(name("basename"), name("extension")))
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Parser::parse("").is_err());
        assert!(Parser::parse("upper(basename").is_err());
        assert!(Parser::parse("a b").is_err());
        assert!(Parser::parse("a.").is_err());
    }
}
