//! The expression sub-language and the content templates built from it.
//!
//! Expressions read only from a per-item namespace (item data plus a few
//! derived bindings) and a fixed set of string builtins. There is no way to
//! reach the host environment from an expression.

pub mod content;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use content::{Content, Resolved, Segment};
pub use eval::{render, truthy, Scope};

use crate::error::{Result, ShelveError};
use crate::pipe::PipeItem;
use crate::services::FileSystem;
use eval::Evaluator;
use parser::{Expr, Parser};
use serde_json::Value;
use std::fmt;

/// A parsed expression and the source it came from.
#[derive(Clone)]
pub struct Expression {
    content: String,
    ast: Expr,
    ignore_exceptions: bool,
}

impl Expression {
    pub fn new(content: &str) -> Result<Self> {
        let content = content.trim().to_string();
        let ast = Parser::parse(&content)?;
        Ok(Self {
            content,
            ast,
            ignore_exceptions: false,
        })
    }

    /// Undefined names evaluate to an empty string instead of failing.
    pub fn ignoring_exceptions(mut self, ignore: bool) -> Self {
        self.ignore_exceptions = ignore;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn ignores_exceptions(&self) -> bool {
        self.ignore_exceptions
    }

    pub fn eval(&self, item: &PipeItem, fs: &dyn FileSystem) -> Result<Value> {
        let scope = Scope::new(item, fs);
        match Evaluator::new(&scope, &self.content).eval(&self.ast) {
            Err(ShelveError::Expression { .. }) if self.ignore_exceptions => {
                Ok(Value::String(String::new()))
            }
            other => other,
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self.content)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content && self.ignore_exceptions == other.ignore_exceptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::LocalFileSystem;

    #[test]
    fn test_ignore_exceptions_yields_empty_string() {
        let item = PipeItem::detached();
        let fs = LocalFileSystem::new();

        let strict = Expression::new("undefined_name").unwrap();
        assert!(matches!(
            strict.eval(&item, &fs),
            Err(ShelveError::Expression { .. })
        ));

        let lenient = strict.ignoring_exceptions(true);
        assert_eq!(lenient.eval(&item, &fs).unwrap(), Value::from(""));
    }

    #[test]
    fn test_parse_error_at_construction() {
        assert!(Expression::new("upper(").is_err());
        assert_eq!(Expression::new("  basename ").unwrap().content(), "basename");
    }
}
