//! Tokenizer for the expression language.

use crate::error::{Result, ShelveError};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Plus,
    /// `||` (the word `or` arrives as an identifier)
    OrOr,
    /// `&&`
    AndAnd,
    /// `!`
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset in the source.
    pub offset: usize,
}

pub struct Lexer<'src> {
    source: &'src str,
    rest: &'src str,
    position: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            position: 0,
        }
    }

    pub fn tokenize(source: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let offset = self.position;

        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset,
            });
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '.' if !self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.single(TokenKind::Dot)
            }
            ',' => self.single(TokenKind::Comma),
            '+' => self.single(TokenKind::Plus),
            '|' => self.pair('|', TokenKind::OrOr)?,
            '&' => self.pair('&', TokenKind::AndAnd)?,
            '=' => self.pair('=', TokenKind::EqEq)?,
            '!' => self.maybe_eq(TokenKind::Bang, TokenKind::NotEq),
            '<' => self.maybe_eq(TokenKind::Lt, TokenKind::Le),
            '>' => self.maybe_eq(TokenKind::Gt, TokenKind::Ge),
            '\'' | '"' => self.scan_string(c)?,
            c if c.is_ascii_digit() || c == '.' => self.scan_number()?,
            c if is_ident_start(c) => self.scan_ident(),
            c => return Err(self.error(format!("unexpected character '{}'", c))),
        };

        Ok(Token { kind, offset })
    }

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            let len = c.len_utf8();
            self.rest = &self.rest[len..];
            self.position += len;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Two-character operators whose characters are identical (`||`, `&&`, `==`).
    fn pair(&mut self, second: char, kind: TokenKind) -> Result<TokenKind> {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            Ok(kind)
        } else {
            Err(self.error(format!("expected '{}{}'", second, second)))
        }
    }

    fn maybe_eq(&mut self, alone: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('=') {
            self.advance();
            with_eq
        } else {
            alone
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::Str(text));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(c) => c,
                        None => return Err(self.error("unterminated string literal")),
                    };
                    self.advance();
                    text.push(escaped);
                }
                Some(c) => {
                    self.advance();
                    text.push(c);
                }
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        let start = self.position;
        let mut has_dot = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !has_dot && self.peek_char_n(1).is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.position];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn scan_ident(&mut self) -> TokenKind {
        let start = self.position;
        while self.peek_char().is_some_and(is_ident_char) {
            self.advance();
        }
        TokenKind::Ident(self.source[start..self.position].to_string())
    }

    fn error(&self, message: impl Into<String>) -> ShelveError {
        ShelveError::expression(
            self.source,
            format!("{} at offset {}", message.into(), self.position),
        )
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lex_attribute_access() {
        assert_eq!(
            kinds("property.isfile"),
            vec![
                TokenKind::Ident("property".into()),
                TokenKind::Dot,
                TokenKind::Ident("isfile".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            kinds("a == 'x' || !b && c <= 2.5"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqEq,
                TokenKind::Str("x".into()),
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Ident("b".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("c".into()),
                TokenKind::Le,
                TokenKind::Number(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\"" 'it\'s'"#),
            vec![
                TokenKind::Str("say \"hi\"".into()),
                TokenKind::Str("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_errors() {
        assert!(Lexer::tokenize("'open").is_err());
        assert!(Lexer::tokenize("a = b").is_err());
        assert!(Lexer::tokenize("a $ b").is_err());
    }
}
