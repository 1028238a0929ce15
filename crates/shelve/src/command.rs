//! What every rule and action is declared with, and how its arguments are
//! looked up.

use crate::error::{Result, ShelveError};
use crate::expr::{Content, Resolved};
use crate::pipe::{Mode, PipeItem};
use crate::services::FileSystem;
use std::collections::BTreeMap;
use std::fmt;

/// Operator tokens a rule may carry.
pub const RULE_OPERATORS: [&str; 5] = ["and", "or", "reset", "pass", "not"];
/// Operator tokens an action may carry; `and`/`or` are accepted and ignored.
pub const ACTION_OPERATORS: [&str; 4] = ["all", "reset", "and", "or"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Rule,
    Action,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Rule => "rule",
            CommandKind::Action => "action",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub content: Content,
}

impl Argument {
    pub fn new(name: impl Into<String>, content: Content) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }
}

/// Values pushed onto a command at run time by `set_defaults`, keyed by
/// argument name.
pub type ArgumentDefaults = BTreeMap<String, Resolved>;

/// The declared shape shared by rules and actions.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDecl {
    pub name: String,
    pub operator: Vec<String>,
    pub content: Content,
    pub arguments: Vec<Argument>,
    pub flags: Vec<String>,
}

impl CommandDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operator: Vec::new(),
            content: Content::default(),
            arguments: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn with_operator<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operator = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Content given as a template string.
    pub fn with_template(self, template: &str) -> Result<Self> {
        Ok(self.with_content(Content::template(template)?))
    }

    pub fn with_argument(mut self, name: &str, template: &str) -> Result<Self> {
        self.arguments
            .push(Argument::new(name, Content::template(template)?));
        Ok(self)
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_operator(&self, token: &str) -> bool {
        self.operator.iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    /// First combine mode among the operator tokens, `or` when there is none.
    pub fn mode(&self) -> Mode {
        self.operator
            .iter()
            .find_map(|t| Mode::from_token(t))
            .unwrap_or(Mode::Or)
    }

    pub fn negated(&self) -> bool {
        self.has_operator("not")
    }

    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Checks operator tokens against `allowed`.
    pub fn validate_operators(&self, kind: CommandKind, allowed: &[&str]) -> Result<()> {
        for token in &self.operator {
            if !allowed.iter().any(|a| a.eq_ignore_ascii_case(token)) {
                return Err(ShelveError::syntax(
                    format!(
                        "Invalid operator \"{}\" for {} {} (valid: {})",
                        token,
                        kind.as_str(),
                        self.name,
                        allowed.join(", ")
                    ),
                    self.to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fails the load on literal regex content with unknown flags.
    pub fn precompile(&self) -> Result<()> {
        self.content.precompile()?;
        for argument in &self.arguments {
            argument.content.precompile()?;
        }
        Ok(())
    }

    pub fn set_ignore_exceptions(&mut self, ignore: bool) {
        self.content.set_ignore_exceptions(ignore);
        for argument in &mut self.arguments {
            argument.content.set_ignore_exceptions(ignore);
        }
    }

    /// Arguments rendered as `name: content` pairs.
    pub fn arguments_summary(&self) -> String {
        self.arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.content))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CommandDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.operator.is_empty() {
            write!(f, " [{}]", self.operator.join(" "))?;
        }
        if !self.content.segments().is_empty() {
            write!(f, ": {}", self.content)?;
        }
        if !self.arguments.is_empty() {
            write!(f, " {{ {} }}", self.arguments_summary())?;
        }
        if !self.flags.is_empty() {
            write!(f, " #{}", self.flags.join(" #"))?;
        }
        Ok(())
    }
}

/// Argument lookup for one command: run-time defaults first, then the
/// declared arguments.
pub struct Args<'a> {
    decl: &'a CommandDecl,
    defaults: &'a ArgumentDefaults,
    fs: &'a dyn FileSystem,
}

impl<'a> Args<'a> {
    pub fn new(decl: &'a CommandDecl, defaults: &'a ArgumentDefaults, fs: &'a dyn FileSystem) -> Self {
        Self { decl, defaults, fs }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.defaults.contains_key(name) || self.decl.argument(name).is_some()
    }

    pub fn resolve(&self, name: &str, item: &PipeItem) -> Result<Option<Resolved>> {
        if let Some(value) = self.defaults.get(name) {
            return Ok(Some(value.clone()));
        }
        match self.decl.argument(name) {
            Some(argument) => Ok(Some(argument.content.resolve(item, self.fs)?)),
            None => Ok(None),
        }
    }

    /// The argument as text, `None` when absent or empty.
    pub fn text(&self, name: &str, item: &PipeItem) -> Result<Option<String>> {
        Ok(self
            .resolve(name, item)?
            .map(|r| r.to_string().trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// True only when the argument reads `true`.
    pub fn is_true(&self, name: &str, item: &PipeItem) -> Result<bool> {
        Ok(self
            .text(name, item)?
            .is_some_and(|t| t.eq_ignore_ascii_case("true")))
    }

    /// True only when the argument reads `false`.
    pub fn is_false(&self, name: &str, item: &PipeItem) -> Result<bool> {
        Ok(self
            .text(name, item)?
            .is_some_and(|t| t.eq_ignore_ascii_case("false")))
    }

    /// A non-negative integer argument, `default` when absent.
    pub fn count(&self, name: &str, item: &PipeItem, default: usize) -> Result<usize> {
        match self.text(name, item)? {
            None => Ok(default),
            Some(text) => text.parse::<usize>().map_err(|_| {
                ShelveError::rule(
                    &self.decl.name,
                    format!("{} must be a whole number, got \"{}\"", name, text),
                )
            }),
        }
    }
}
